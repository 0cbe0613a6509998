//! Schema documents for the form engine.
//!
//! A schema is a tree of maps, sequences and scalars. It is read by an
//! injected [`DocumentParser`], deep-merged with overlay documents
//! ([`OverlayMerge`]) and finally viewed through the typed
//! [`ConfigDocument`] sections the engine builds forms from.

mod document;
mod errors;
mod loader;
pub mod merge;
pub mod parser;

pub use document::{
    ButtonSpec, CollectionSpec, ConditionSpec, ConfigDocument, FrameSpec, KindSpec, PopupSpec,
    RuleEffect, RuleSpec, WidgetSpec,
};
pub use errors::ConfigError;
pub use loader::ConfigLoader;
pub use merge::{OverlayMerge, merge_documents};
pub use parser::{DocumentParser, JsonParser, ParserKind, TomlParser};
