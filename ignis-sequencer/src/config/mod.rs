//! Launch configuration
//!
//! - `file`: serde layout of the launch file
//! - `loader`: name resolution and validation

pub mod file;
pub mod loader;

pub use loader::{load_file, parse_config, ConfigSource, EMBEDDED_CONFIG};
