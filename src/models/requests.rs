//! Request DTOs for the cache server API
//!
//! Defines the shape of incoming query strings and form fields.

use serde::Deserialize;

/// Name of the query parameter and form field that carries the cache key
pub const FILE_NAME_PARAM: &str = "fileName";

/// Query string of `GET /cache?fileName=...`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileNameQuery {
    /// The cache key
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

impl FileNameQuery {
    /// Returns the key, or an error message if it is missing or empty.
    pub fn key(&self) -> Result<&str, String> {
        match self.file_name.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(format!("Missing required parameter '{}'", FILE_NAME_PARAM)),
        }
    }
}

/// Collects every `fileName` value of `GET /ts?fileName=a&fileName=b`.
///
/// Query strings with repeated keys are decoded as raw pairs; other
/// parameters are ignored. Every value is kept, the empty one included, so
/// each requested key gets an answer. Returns an error message if no key was
/// given.
pub fn file_names(pairs: Vec<(String, String)>) -> Result<Vec<String>, String> {
    let names: Vec<String> = pairs
        .into_iter()
        .filter(|(name, _)| name == FILE_NAME_PARAM)
        .map(|(_, value)| value)
        .collect();

    if names.is_empty() {
        Err(format!("Missing at least one '{}'", FILE_NAME_PARAM))
    } else {
        Ok(names)
    }
}
