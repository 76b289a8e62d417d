//! Herbarium - plant care records and name resolution
//!
//! Loads a care-instructions collection, maps uncertain plant identifications
//! onto it, and derives the persona a plant speaks with.

pub mod catalog;
pub mod error;
pub mod fuzzy;
pub mod personality;
pub mod record;
pub mod resolver;

pub use catalog::Catalog;
pub use error::{CatalogError, RecordError};
pub use personality::{build_profile, PersonalityProfile};
pub use record::{CareFields, CareRecord, IdentificationResult, PersonalityBlock, UNKNOWN_NAME};
pub use resolver::{resolve, resolve_detailed, suggest, MatchStage, Query, Resolution};
