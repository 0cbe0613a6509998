use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported document format: {0:?}")]
    UnsupportedFormat(PathBuf),

    #[error("document root must be a map, found {0}")]
    RootNotMap(&'static str),

    #[error("invalid section `{section}`: {message}")]
    InvalidSection { section: String, message: String },
}
