//! Configuration document loading from disk.
//!
//! The document mirrors the command-line surface. JSON keys may use either
//! the snake_case names or the PascalCase `ServeNodes`/`ChainNodes`/`Debug`/
//! `Routes` spelling:
//!
//! ```json
//! {
//!   "ServeNodes": ["ws://:8080"],
//!   "ChainNodes": ["http://proxy:3128"],
//!   "Debug": true,
//!   "Routes": [{ "name": "socks", "ServeNodes": ["socks5://:1080"] }]
//! }
//! ```
//!
//! Unknown fields are ignored so newer documents still load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::route_set::Limits;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported config format for {path} (expected .json or .toml)")]
    UnsupportedFormat { path: PathBuf },
}

/// Raw config document, before descriptor parsing.
///
/// `None` means "not present in the document", which keeps the value that
/// came from the command line.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigDocument {
    #[serde(alias = "ServeNodes")]
    pub serve_nodes: Option<Vec<String>>,

    #[serde(alias = "ChainNodes")]
    pub chain_nodes: Option<Vec<String>>,

    #[serde(alias = "Debug")]
    pub debug: Option<bool>,

    #[serde(alias = "Routes")]
    pub routes: Option<Vec<RouteDocument>>,

    #[serde(alias = "Limits")]
    pub limits: Option<Limits>,
}

/// One additional route group.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteDocument {
    #[serde(alias = "Name")]
    pub name: Option<String>,

    #[serde(alias = "ServeNodes")]
    pub serve_nodes: Vec<String>,

    #[serde(alias = "ChainNodes")]
    pub chain_nodes: Vec<String>,
}

/// Load a config document; the format follows the file extension.
pub fn load_config(path: &Path) -> Result<ConfigDocument, ConfigLoadError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()).unwrap_or("") {
        "json" => serde_json::from_str(&content).map_err(|source| ConfigLoadError::Json {
            path: path.to_path_buf(),
            source,
        }),
        "toml" => toml::from_str(&content).map_err(|source| ConfigLoadError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(ConfigLoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
