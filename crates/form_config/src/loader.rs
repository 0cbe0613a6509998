use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::merge::OverlayMerge;
use crate::parser::DocumentParser;
use crate::{ConfigDocument, ConfigError};

/// Reads a base document plus overlays and merges them.
pub struct ConfigLoader {
    parser: Box<dyn DocumentParser>,
    merge: OverlayMerge,
}

impl ConfigLoader {
    pub fn new(parser: Box<dyn DocumentParser>) -> Self {
        Self {
            parser,
            merge: OverlayMerge::default(),
        }
    }

    /// Use a different identity field for keyed sequences.
    pub fn with_merge(mut self, merge: OverlayMerge) -> Self {
        self.merge = merge;
        self
    }

    pub fn parser_name(&self) -> &'static str {
        self.parser.name()
    }

    pub fn parse_text(&self, text: &str) -> Result<Value, ConfigError> {
        self.parser.parse(text)
    }

    pub fn read(&self, path: &Path) -> Result<Value, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_text(&text)
    }

    /// Load `base`, apply `overlays` in the given order and return the merged tree.
    pub fn load<P: AsRef<Path>>(&self, base: &Path, overlays: &[P]) -> Result<Value, ConfigError> {
        let mut merged = self.read(base)?;
        if merged.is_null() {
            merged = Value::Object(Default::default());
        }
        for overlay in overlays {
            let overlay = overlay.as_ref();
            let value = self.read(overlay)?;
            tracing::debug!(path = %overlay.display(), "applying overlay");
            self.merge.merge(&mut merged, &value);
        }
        tracing::info!(
            parser = self.parser.name(),
            base = %base.display(),
            overlays = overlays.len(),
            "loaded schema document"
        );
        Ok(merged)
    }

    /// Like [`load`](Self::load), then deserialize into the typed document.
    pub fn load_document<P: AsRef<Path>>(
        &self,
        base: &Path,
        overlays: &[P],
    ) -> Result<ConfigDocument, ConfigError> {
        ConfigDocument::from_value(self.load(base, overlays)?)
    }
}
