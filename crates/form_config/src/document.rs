//! Typed sections of a merged schema document.
//!
//! Field names follow the on-disk spelling (`inputtype`, `defaultval`,
//! `optionlist`, `outputdef`, `ctrlelem`, ...); the snake-case names used by the
//! engine API are accepted as aliases.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::ConfigError;

fn default_true() -> bool {
    true
}

/// The value kind as written in the document: a single kind name or a list
/// of scalar kind names for fixed-length list fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindSpec {
    Single(String),
    Tuple(Vec<String>),
}

/// Raw field descriptor (one entry of `inputwidgets`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSpec {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, alias = "kind")]
    pub inputtype: Option<KindSpec>,
    #[serde(default, alias = "default")]
    pub defaultval: Option<Value>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, alias = "label_only")]
    pub labelonly: bool,
    #[serde(default, alias = "options")]
    pub optionlist: Vec<String>,
    /// Tag name -> output key (or help text, for help tags).
    #[serde(default, alias = "tags")]
    pub outputdef: IndexMap<String, String>,
    #[serde(default, alias = "dependents")]
    pub ctrlelem: Vec<RuleSpec>,
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub tab: Option<String>,
    /// `(controller, true token, false token)` triples.
    #[serde(default)]
    pub mergedboollist: Vec<(String, String, String)>,
}

impl WidgetSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            inputtype: None,
            defaultval: None,
            visible: true,
            labelonly: false,
            optionlist: Vec::new(),
            outputdef: IndexMap::new(),
            ctrlelem: Vec::new(),
            frame: None,
            tab: None,
            mergedboollist: Vec::new(),
        }
    }
}

/// One activation rule declared on a controller field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub target: String,
    #[serde(default)]
    pub condition: Option<ConditionSpec>,
    #[serde(default)]
    pub effect: RuleEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    /// Compared against a boolean controller's value.
    Truth(bool),
    /// Membership test against a selection controller.
    Membership {
        option: String,
        #[serde(default = "default_true")]
        present: bool,
    },
}

/// What a firing rule does to its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleEffect {
    #[default]
    Enable,
    Disable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSpec {
    pub name: String,
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub toggled: bool,
    #[serde(default)]
    pub collapsible: bool,
}

/// A list of records edited through a named popup schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(alias = "popup")]
    pub popupwindow: String,
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub tab: Option<String>,
}

/// A nested schema, used by record collections or as a standalone popup form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopupSpec {
    #[serde(default, alias = "key_field")]
    pub keyfield: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "load_on_start")]
    pub loadonstart: bool,
    #[serde(default)]
    pub frames: Vec<FrameSpec>,
    #[serde(default)]
    pub inputwidgets: Vec<WidgetSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Name of a registered command.
    pub command: String,
    /// Field the command operates on, if any.
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub tab: Option<String>,
}

/// The merged schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigDocument {
    pub tabs: Vec<String>,
    pub frames: Vec<FrameSpec>,
    pub inputwidgets: Vec<WidgetSpec>,
    pub listboxpopupwindows: Vec<CollectionSpec>,
    pub popupwindow: IndexMap<String, PopupSpec>,
    pub buttons: Vec<ButtonSpec>,
}

impl ConfigDocument {
    /// Deserialize the known sections of a merged value tree. Unknown top
    /// level keys are ignored, a `null` tree is an empty document.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let mut root = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => return Err(ConfigError::RootNotMap(type_name(&other))),
        };
        Ok(Self {
            tabs: section(&mut root, "tabs")?,
            frames: section(&mut root, "frames")?,
            inputwidgets: section(&mut root, "inputwidgets")?,
            listboxpopupwindows: section(&mut root, "listboxpopupwindows")?,
            popupwindow: section(&mut root, "popupwindow")?,
            buttons: section(&mut root, "buttons")?,
        })
    }
}

fn section<T: DeserializeOwned + Default>(
    root: &mut Map<String, Value>,
    key: &str,
) -> Result<T, ConfigError> {
    match root.remove(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| ConfigError::InvalidSection {
            section: key.to_string(),
            message: e.to_string(),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}
