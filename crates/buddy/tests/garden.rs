use anyhow::Result;
use buddy::chat::ChatMessage;
use buddy::garden::{self, Garden, GardenError, SavedPlant, GARDEN_ROOT_ENV};
use herbarium::IdentificationResult;
use serial_test::serial;
use std::env;
use std::path::Path;
use tempfile::TempDir;

#[cfg(test)]
mod garden_tests {
  use super::*;

  fn setup_temp_garden_root() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    env::set_var(GARDEN_ROOT_ENV, temp_dir.path());
    temp_dir
  }

  #[test]
  #[serial]
  fn environment_root_wins_over_config() -> Result<()> {
    let temp = setup_temp_garden_root();
    let root = garden::garden_root(Some(Path::new("/configured/garden")))?;
    assert_eq!(root, temp.path());

    env::remove_var(GARDEN_ROOT_ENV);
    let root = garden::garden_root(Some(Path::new("/configured/garden")))?;
    assert_eq!(root, Path::new("/configured/garden"));
    Ok(())
  }

  #[test]
  #[serial]
  fn save_and_load_plant() -> Result<()> {
    let _temp = setup_temp_garden_root();
    let garden = Garden::locate(None)?;

    let mut plant = SavedPlant::new("Spike");
    plant.plant_name = Some("Snake Plant".to_string());
    plant.identification =
      Some(IdentificationResult::new("Dracaena trifasciata", "Snake plant", 93.5));
    plant.chat_log = vec![ChatMessage::user("Thirsty?"), ChatMessage::assistant("Never.")];

    let path = garden.save(&plant)?;
    assert!(path.ends_with("Spike.plant.yaml"));

    let loaded = garden.load("Spike")?;
    assert_eq!(loaded, plant);

    env::remove_var(GARDEN_ROOT_ENV);
    Ok(())
  }

  #[test]
  #[serial]
  fn existing_nickname_is_not_overwritten() -> Result<()> {
    let _temp = setup_temp_garden_root();
    let garden = Garden::locate(None)?;

    garden.save(&SavedPlant::new("Fern"))?;
    let err = garden.save(&SavedPlant::new("Fern")).unwrap_err();
    assert!(matches!(err, GardenError::AlreadyExists { .. }));

    env::remove_var(GARDEN_ROOT_ENV);
    Ok(())
  }

  #[test]
  #[serial]
  fn list_and_remove() -> Result<()> {
    let _temp = setup_temp_garden_root();
    let garden = Garden::locate(None)?;

    garden.save(&SavedPlant::new("Zed"))?;
    garden.save(&SavedPlant::new("Aloe Vera"))?;
    assert_eq!(garden.list()?, vec!["Aloe Vera", "Zed"]);

    garden.remove("Zed")?;
    assert_eq!(garden.list()?, vec!["Aloe Vera"]);
    assert!(matches!(garden.remove("Zed"), Err(GardenError::NotFound { .. })));

    env::remove_var(GARDEN_ROOT_ENV);
    Ok(())
  }

  #[test]
  #[serial]
  fn corrupt_file_is_reported() -> Result<()> {
    let temp = setup_temp_garden_root();
    std::fs::write(temp.path().join("Broken.plant.yaml"), "nickname: [unclosed")?;

    let garden = Garden::locate(None)?;
    assert!(matches!(garden.load("Broken"), Err(GardenError::Format(_))));

    env::remove_var(GARDEN_ROOT_ENV);
    Ok(())
  }
}
