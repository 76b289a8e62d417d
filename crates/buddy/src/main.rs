use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use buddy::commands;
use buddy::config::Config;

#[derive(Parser)]
#[command(name = "plant-buddy")]
#[command(about = "Plant Buddy - houseplant care guides and conversations\nIdentify a plant, look up its care, and chat with it")]
#[command(version)]
struct Cli {
  /// Config file to use instead of the usual locations
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Care instructions file (JSON array of records)
  #[arg(long, global = true)]
  care_file: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show the care guide for a plant
  Lookup {
    /// Plant name, common or scientific
    name: String,
    /// Minimum fuzzy score (0-100) for a match
    #[arg(short, long)]
    threshold: Option<u8>,
  },
  /// List plants with names similar to the one given
  Suggest {
    name: String,
    /// Maximum number of suggestions
    #[arg(short, long)]
    limit: Option<usize>,
    /// Minimum fuzzy score (0-100) for a suggestion
    #[arg(short, long)]
    threshold: Option<u8>,
  },
  /// Identify the plant in a photo and show its care guide
  Identify {
    /// Path to a JPEG or PNG image
    image: PathBuf,
    /// Keep the result in the garden under this nickname
    #[arg(short, long)]
    save: Option<String>,
  },
  /// Show the personality a plant chats with
  Profile { name: String },
  /// Chat with a plant
  Chat {
    name: String,
    /// Send one message and print the reply instead of starting a conversation
    #[arg(short, long)]
    message: Option<String>,
    /// Keep the conversation in the garden under this nickname
    #[arg(short, long)]
    save: Option<String>,
  },
  /// Manage saved plants
  Garden {
    #[command(subcommand)]
    command: GardenCommand,
  },
}

#[derive(Subcommand)]
enum GardenCommand {
  /// List saved plants
  List,
  /// Show a saved plant
  Show { nickname: String },
  /// Save a plant under a nickname
  Save {
    nickname: String,
    /// Plant name to link to a care record
    plant: String,
  },
  /// Continue the conversation stored with a saved plant
  Chat {
    nickname: String,
    /// Send one message and print the reply instead of starting a conversation
    #[arg(short, long)]
    message: Option<String>,
  },
  /// Remove a saved plant
  Remove { nickname: String },
}

fn init_logging(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("herbarium=debug,buddy=debug,info")
    } else {
      EnvFilter::new("herbarium=warn,buddy=warn,error")
    }
  });

  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
  dotenvy::dotenv().ok();
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = match &cli.config {
    Some(path) => Config::load_from_file(path)?,
    None => Config::load()?,
  }
  .with_overrides(cli.care_file);

  match cli.command {
    Commands::Lookup { name, threshold } => {
      let config = Config { resolve_threshold: threshold.unwrap_or(config.resolve_threshold), ..config };
      config.validate()?;
      commands::show_care(&config, &name)?;
    }
    Commands::Suggest { name, limit, threshold } => {
      let config = Config {
        suggest_limit: limit.unwrap_or(config.suggest_limit),
        suggest_threshold: threshold.unwrap_or(config.suggest_threshold),
        ..config
      };
      config.validate()?;
      commands::show_suggestions(&config, &name, config.suggest_limit, config.suggest_threshold)?;
    }
    Commands::Identify { image, save } => {
      commands::identify_image(&config, &image, save.as_deref()).await?;
    }
    Commands::Profile { name } => {
      commands::show_profile(&config, &name)?;
    }
    Commands::Chat { name, message, save } => {
      commands::chat(&config, &name, message.as_deref(), save.as_deref()).await?;
    }
    Commands::Garden { command } => match command {
      GardenCommand::List => commands::list_garden(&config)?,
      GardenCommand::Show { nickname } => commands::show_saved(&config, &nickname)?,
      GardenCommand::Save { nickname, plant } => commands::save_to_garden(&config, &nickname, &plant)?,
      GardenCommand::Chat { nickname, message } => {
        commands::chat_with_saved(&config, &nickname, message.as_deref()).await?
      }
      GardenCommand::Remove { nickname } => commands::remove_from_garden(&config, &nickname)?,
    },
  }

  Ok(())
}
