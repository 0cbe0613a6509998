//! Document parser strategies.
//!
//! The parser is chosen once at startup and handed to the [`ConfigLoader`]
//! (see `loader.rs`); nothing else in the workspace knows which format is in
//! use.
//!
//! [`ConfigLoader`]: crate::ConfigLoader

use std::path::Path;

use serde_json::Value;

use crate::ConfigError;

/// Turns document text into a generic value tree (maps, sequences, scalars).
pub trait DocumentParser: Send + Sync {
    fn name(&self) -> &'static str;

    fn parse(&self, text: &str) -> Result<Value, ConfigError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParser;

impl DocumentParser for JsonParser {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, text: &str) -> Result<Value, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TomlParser;

impl DocumentParser for TomlParser {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn parse(&self, text: &str) -> Result<Value, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let table: toml::Table = toml::from_str(text)?;
        Ok(serde_json::to_value(table)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Json,
    Toml,
}

impl ParserKind {
    /// Pick a parser from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn parser(self) -> Box<dyn DocumentParser> {
        match self {
            Self::Json => Box::new(JsonParser),
            Self::Toml => Box::new(TomlParser),
        }
    }
}
