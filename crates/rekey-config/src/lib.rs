//! Rekey Config
//!
//! This crate contains the serializable configuration types for rekey.
//! These types describe how the binary wires up its collaborators before
//! any credential rotation runs.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=rekey.json`)
//! - Built-in defaults when no file is given
//!
//! Every field has a default, so a partial file only overrides what it names.

mod config;
mod database;
mod error;
mod hashing;
mod rotation;

pub use config::Config;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use hashing::HashingConfig;
pub use rotation::RotationConfig;
