//! Validated form schema.
//!
//! `FormSchema` is the immutable input to [`FormDocument::build`]. It is
//! produced from a merged [`ConfigDocument`] (`from_document`) or assembled in
//! code with the builder setters.
//!
//! [`FormDocument::build`]: crate::FormDocument::build

use std::sync::Arc;

use form_config::{
    ButtonSpec, CollectionSpec, ConditionSpec, ConfigDocument, FrameSpec, KindSpec, PopupSpec,
    RuleEffect, WidgetSpec,
};
use indexmap::IndexMap;

use crate::errors::SchemaError;
use crate::kind::{MergedBoolEntry, PathMode, ScalarKind, ValueKind};
use crate::value::FieldValue;

/// Condition half of an activation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Bool controllers: fires when the controller equals this value.
    Truth(bool),
    /// Selection controllers: fires when membership of `option` in the
    /// current selection equals `present`.
    Membership { option: String, present: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    pub target: String,
    pub condition: Condition,
    pub effect: RuleEffect,
}

impl RuleDef {
    /// Enable `target` while a bool controller is true.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            condition: Condition::Truth(true),
            effect: RuleEffect::Enable,
        }
    }

    pub fn when(mut self, value: bool) -> Self {
        self.condition = Condition::Truth(value);
        self
    }

    pub fn when_selected(mut self, option: impl Into<String>, present: bool) -> Self {
        self.condition = Condition::Membership {
            option: option.into(),
            present,
        };
        self
    }

    pub fn effect(mut self, effect: RuleEffect) -> Self {
        self.effect = effect;
        self
    }

    fn from_spec(spec: &form_config::RuleSpec) -> Self {
        let condition = match &spec.condition {
            None => Condition::Truth(true),
            Some(ConditionSpec::Truth(b)) => Condition::Truth(*b),
            Some(ConditionSpec::Membership { option, present }) => Condition::Membership {
                option: option.clone(),
                present: *present,
            },
        };
        Self {
            target: spec.target.clone(),
            condition,
            effect: spec.effect,
        }
    }
}

/// Immutable description of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: ValueKind,
    pub default: Option<FieldValue>,
    pub visible: bool,
    pub label_only: bool,
    pub options: Vec<String>,
    /// Tag -> output key, or help text for help tags.
    pub tags: IndexMap<String, String>,
    pub rules: Vec<RuleDef>,
    pub frame: Option<String>,
    pub tab: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            default: None,
            visible: true,
            label_only: false,
            options: Vec::new(),
            tags: IndexMap::new(),
            rules: Vec::new(),
            frame: None,
            tab: None,
        }
    }

    /// A descriptive-only field.
    pub fn label_only(name: impl Into<String>, label: impl Into<String>) -> Self {
        let mut spec = Self::new(name, ValueKind::String);
        spec.label = label.into();
        spec.label_only = true;
        spec
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>, key: impl Into<String>) -> Self {
        self.tags.insert(tag.into(), key.into());
        self
    }

    pub fn rule(mut self, rule: RuleDef) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn in_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Key this field is exported under for `tag`.
    pub fn output_key(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn from_widget(widget: &WidgetSpec) -> Result<Self, SchemaError> {
        let kind = match (&widget.inputtype, widget.labelonly) {
            (None, true) => ValueKind::String,
            (None, false) => {
                return Err(SchemaError::MissingKind {
                    field: widget.name.clone(),
                });
            }
            (Some(kind), _) => kind_from_spec(widget, kind)?,
        };
        Ok(Self {
            name: widget.name.clone(),
            label: widget.label.clone().unwrap_or_else(|| widget.name.clone()),
            kind,
            default: widget.defaultval.as_ref().and_then(FieldValue::from_json),
            visible: widget.visible,
            label_only: widget.labelonly,
            options: widget.optionlist.clone(),
            tags: widget.outputdef.clone(),
            rules: widget.ctrlelem.iter().map(RuleDef::from_spec).collect(),
            frame: widget.frame.clone(),
            tab: widget.tab.clone(),
        })
    }
}

fn kind_from_spec(widget: &WidgetSpec, kind: &KindSpec) -> Result<ValueKind, SchemaError> {
    let unknown = |kind: &str| SchemaError::UnknownKind {
        field: widget.name.clone(),
        kind: kind.to_string(),
    };
    match kind {
        KindSpec::Tuple(names) => names
            .iter()
            .map(|name| ScalarKind::from_name(name).ok_or_else(|| unknown(name)))
            .collect::<Result<Vec<_>, _>>()
            .map(ValueKind::List),
        KindSpec::Single(name) => Ok(match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => ValueKind::Bool,
            "int" | "integer" => ValueKind::Int,
            "float" | "double" => ValueKind::Float,
            "str" | "string" | "text" if !widget.optionlist.is_empty() => ValueKind::Selection,
            "str" | "string" | "text" => ValueKind::String,
            "selection" | "choice" => ValueKind::Selection,
            "listbox" => ValueKind::ListBoxSelection,
            "filename" | "fileopen" => ValueKind::FilePath(PathMode::Open),
            "filesaveas" => ValueKind::FilePath(PathMode::SaveAs),
            "directory" | "dir" => ValueKind::FilePath(PathMode::Directory),
            "mergedboollist" => ValueKind::MergedBoolList(
                widget
                    .mergedboollist
                    .iter()
                    .map(|(c, t, f)| MergedBoolEntry::new(c, t, f))
                    .collect(),
            ),
            _ => return Err(unknown(name)),
        }),
    }
}

/// Shared shape of every record in a collection (or of a standalone popup form).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: String,
    pub title: Option<String>,
    pub key_field: String,
    pub load_on_start: bool,
    pub frames: Vec<FrameSpec>,
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// `key_field` must name a value-carrying field of `fields`.
    pub fn new(
        name: impl Into<String>,
        key_field: impl Into<String>,
        fields: Vec<FieldSpec>,
    ) -> Result<Self, SchemaError> {
        let schema = Self {
            name: name.into(),
            title: None,
            key_field: key_field.into(),
            load_on_start: false,
            frames: Vec::new(),
            fields,
        };
        schema.check_key_field()?;
        Ok(schema)
    }

    /// The key field is not checked here: a standalone popup needs none.
    /// It is checked once the schema backs a collection.
    pub fn from_popup(name: &str, popup: &PopupSpec) -> Result<Self, SchemaError> {
        let fields = popup
            .inputwidgets
            .iter()
            .map(FieldSpec::from_widget)
            .collect::<Result<Vec<_>, _>>()?;
        let key_field = match &popup.keyfield {
            Some(key) => key.clone(),
            None => fields
                .iter()
                .find(|f| !f.label_only)
                .map(|f| f.name.clone())
                .unwrap_or_default(),
        };
        Ok(Self {
            name: name.to_string(),
            title: popup.title.clone(),
            key_field,
            load_on_start: popup.loadonstart,
            frames: popup.frames.clone(),
            fields,
        })
    }

    fn check_key_field(&self) -> Result<(), SchemaError> {
        let usable = self
            .fields
            .iter()
            .any(|f| f.name == self.key_field && !f.label_only);
        if usable {
            Ok(())
        } else {
            Err(SchemaError::MissingKeyField {
                schema: self.name.clone(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDef {
    pub name: String,
    pub label: String,
    pub schema: Arc<RecordSchema>,
    pub frame: Option<String>,
    pub tab: Option<String>,
}

impl CollectionDef {
    pub fn new(name: impl Into<String>, schema: Arc<RecordSchema>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            schema,
            frame: None,
            tab: None,
        }
    }

    fn from_spec(
        spec: &CollectionSpec,
        schemas: &IndexMap<String, Arc<RecordSchema>>,
    ) -> Result<Self, SchemaError> {
        let schema = schemas
            .get(&spec.popupwindow)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownRecordSchema {
                collection: spec.name.clone(),
                schema: spec.popupwindow.clone(),
            })?;
        schema.check_key_field()?;
        Ok(Self {
            name: spec.name.clone(),
            label: spec.label.clone().unwrap_or_else(|| spec.name.clone()),
            schema,
            frame: spec.frame.clone(),
            tab: spec.tab.clone(),
        })
    }
}

/// Everything needed to build one form document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSchema {
    pub tabs: Vec<String>,
    pub frames: Vec<FrameSpec>,
    pub fields: Vec<FieldSpec>,
    pub collections: Vec<CollectionDef>,
    /// Popup schemas not backing a collection; opened as standalone forms.
    pub popups: IndexMap<String, Arc<RecordSchema>>,
    pub buttons: Vec<ButtonSpec>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab(mut self, tab: impl Into<String>) -> Self {
        self.tabs.push(tab.into());
        self
    }

    pub fn with_frame(mut self, frame: FrameSpec) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_collection(mut self, collection: CollectionDef) -> Self {
        self.collections.push(collection);
        self
    }

    pub fn with_popup(mut self, schema: RecordSchema) -> Self {
        self.popups.insert(schema.name.clone(), Arc::new(schema));
        self
    }

    pub fn with_button(mut self, button: ButtonSpec) -> Self {
        self.buttons.push(button);
        self
    }

    /// Validate descriptors of a merged document into a schema.
    pub fn from_document(doc: &ConfigDocument) -> Result<Self, SchemaError> {
        let fields = doc
            .inputwidgets
            .iter()
            .map(FieldSpec::from_widget)
            .collect::<Result<Vec<_>, _>>()?;

        let mut record_schemas = IndexMap::new();
        for (name, popup) in &doc.popupwindow {
            record_schemas.insert(name.clone(), Arc::new(RecordSchema::from_popup(name, popup)?));
        }

        let collections = doc
            .listboxpopupwindows
            .iter()
            .map(|spec| CollectionDef::from_spec(spec, &record_schemas))
            .collect::<Result<Vec<_>, _>>()?;

        let popups = record_schemas
            .into_iter()
            .filter(|(name, _)| !doc.listboxpopupwindows.iter().any(|c| &c.popupwindow == name))
            .collect();

        Ok(Self {
            tabs: doc.tabs.clone(),
            frames: doc.frames.clone(),
            fields,
            collections,
            popups,
            buttons: doc.buttons.clone(),
        })
    }

    /// Schema of the transient form used to view or edit one record.
    pub fn for_record(record: &RecordSchema) -> Self {
        Self {
            frames: record.frames.clone(),
            fields: record.fields.clone(),
            ..Self::default()
        }
    }
}

/// Frame descriptor shorthand for code-built schemas.
pub fn frame(name: impl Into<String>) -> FrameSpec {
    FrameSpec {
        name: name.into(),
        tab: None,
        parent: None,
        title: None,
        toggled: false,
        collapsible: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widget(value: serde_json::Value) -> WidgetSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn kinds_from_names() {
        let cases = [
            (json!({"name": "a", "inputtype": "bool"}), ValueKind::Bool),
            (json!({"name": "a", "inputtype": "int"}), ValueKind::Int),
            (json!({"name": "a", "inputtype": "str"}), ValueKind::String),
            (
                json!({"name": "a", "inputtype": "str", "optionlist": ["x"]}),
                ValueKind::Selection,
            ),
            (json!({"name": "a", "inputtype": "listbox"}), ValueKind::ListBoxSelection),
            (
                json!({"name": "a", "inputtype": "filesaveas"}),
                ValueKind::FilePath(PathMode::SaveAs),
            ),
            (
                json!({"name": "a", "inputtype": ["int", "float"]}),
                ValueKind::List(vec![ScalarKind::Int, ScalarKind::Float]),
            ),
        ];
        for (raw, expected) in cases {
            assert_eq!(FieldSpec::from_widget(&widget(raw)).unwrap().kind, expected);
        }
    }

    #[test]
    fn merged_bool_list_entries() {
        let spec = FieldSpec::from_widget(&widget(json!({
            "name": "periodic",
            "inputtype": "mergedboollist",
            "mergedboollist": [["px", "1", "0"], ["py", "1", "0"]]
        })))
        .unwrap();
        assert_eq!(
            spec.kind,
            ValueKind::MergedBoolList(vec![
                MergedBoolEntry::new("px", "1", "0"),
                MergedBoolEntry::new("py", "1", "0")
            ])
        );
    }

    #[test]
    fn unknown_and_missing_kinds_are_schema_errors() {
        assert_eq!(
            FieldSpec::from_widget(&widget(json!({"name": "a", "inputtype": "complex"}))),
            Err(SchemaError::UnknownKind {
                field: "a".into(),
                kind: "complex".into()
            })
        );
        assert!(matches!(
            FieldSpec::from_widget(&widget(json!({"name": "a", "inputtype": ["int", "vec3"]}))),
            Err(SchemaError::UnknownKind { .. })
        ));
        assert!(matches!(
            FieldSpec::from_widget(&widget(json!({"name": "a"}))),
            Err(SchemaError::MissingKind { .. })
        ));
        assert!(FieldSpec::from_widget(&widget(json!({"name": "a", "labelonly": true}))).is_ok());
    }

    #[test]
    fn rules_default_to_enable_on_true() {
        let spec = FieldSpec::from_widget(&widget(json!({
            "name": "c", "inputtype": "bool", "ctrlelem": [{"target": "t"}]
        })))
        .unwrap();
        assert_eq!(spec.rules, vec![RuleDef::new("t")]);
    }

    #[test]
    fn record_key_field_defaults_to_first_value_field() {
        let popup: PopupSpec = serde_json::from_value(json!({
            "inputwidgets": [
                {"name": "heading", "labelonly": true},
                {"name": "probe_name", "inputtype": "str"}
            ]
        }))
        .unwrap();
        let schema = RecordSchema::from_popup("probe", &popup).unwrap();
        assert_eq!(schema.key_field, "probe_name");
    }

    #[test]
    fn only_collection_schemas_need_a_key_field() {
        let doc = ConfigDocument::from_value(json!({
            "popupwindow": {
                "about": {"inputwidgets": [{"name": "txt", "labelonly": true}]},
                "blank": {}
            }
        }))
        .unwrap();
        let schema = FormSchema::from_document(&doc).unwrap();
        assert_eq!(schema.popups.keys().collect::<Vec<_>>(), vec!["about", "blank"]);

        let keyed = ConfigDocument::from_value(json!({
            "listboxpopupwindows": [{"name": "probes", "popupwindow": "probe"}],
            "popupwindow": {"probe": {"keyfield": "nope", "inputwidgets": [
                {"name": "heading", "labelonly": true}
            ]}}
        }))
        .unwrap();
        assert!(matches!(
            FormSchema::from_document(&keyed),
            Err(SchemaError::MissingKeyField { .. })
        ));
    }

    #[test]
    fn collections_need_known_popups() {
        let doc = ConfigDocument::from_value(json!({
            "listboxpopupwindows": [{"name": "probes", "popupwindow": "missing"}]
        }))
        .unwrap();
        assert!(matches!(
            FormSchema::from_document(&doc),
            Err(SchemaError::UnknownRecordSchema { .. })
        ));
    }

    #[test]
    fn unreferenced_popups_become_standalone() {
        let doc = ConfigDocument::from_value(json!({
            "listboxpopupwindows": [{"name": "probes", "popupwindow": "probe"}],
            "popupwindow": {
                "probe": {"inputwidgets": [{"name": "name", "inputtype": "str"}]},
                "settings": {"loadonstart": true, "inputwidgets": [{"name": "dt", "inputtype": "float"}]}
            }
        }))
        .unwrap();
        let schema = FormSchema::from_document(&doc).unwrap();
        assert_eq!(schema.collections[0].schema.name, "probe");
        assert_eq!(schema.popups.keys().collect::<Vec<_>>(), vec!["settings"]);
        assert!(schema.popups["settings"].load_on_start);
    }
}
