//! JSON configuration loading

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::Result;

/// Parse a configuration value from a JSON string
pub fn from_json_str<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a configuration value from a JSON file
pub fn from_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let json = std::fs::read_to_string(path)?;
    from_json_str(&json)
}
