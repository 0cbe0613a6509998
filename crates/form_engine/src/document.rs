//! The form aggregate.
//!
//! A [`FormDocument`] is built in two phases. [`FormDocument::build`] creates
//! every field, frame and collection of the schema and checks names;
//! [`UnlinkedForm::link`] then resolves references between them (activation
//! rules, merged list controllers, button commands) and evaluates every
//! controller once so the initial enabled state is consistent.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use form_config::{ButtonSpec, FrameSpec};
use indexmap::IndexMap;

use crate::command::CommandRegistry;
use crate::control::{ActiveStateChange, ControlHandle, Observers, PathChooser, SubscriptionId};
use crate::dependency::{DependencyGraph, Target};
use crate::errors::{FieldError, SchemaError};
use crate::field::{Field, FieldInstance, FieldMut, SetOptions};
use crate::frame::FrameTable;
use crate::kind::{ControlState, ValueKind, merged_tokens, resolve_merged_tokens};
use crate::record::RecordCollection;
use crate::schema::{FormSchema, RecordSchema};
use crate::value::FieldValue;

/// A built form whose cross references are not resolved yet.
#[derive(Debug)]
pub struct UnlinkedForm {
    tabs: Vec<String>,
    fields: Vec<FieldInstance>,
    field_index: HashMap<String, usize>,
    frames: FrameTable,
    collections: IndexMap<String, RecordCollection>,
    buttons: IndexMap<String, ButtonSpec>,
    popup_schemas: IndexMap<String, Arc<RecordSchema>>,
}

pub struct FormDocument {
    tabs: Vec<String>,
    pub(crate) fields: Vec<FieldInstance>,
    field_index: HashMap<String, usize>,
    frames: FrameTable,
    collections: IndexMap<String, RecordCollection>,
    graph: DependencyGraph,
    buttons: IndexMap<String, ButtonSpec>,
    popup_schemas: IndexMap<String, Arc<RecordSchema>>,
    popups: IndexMap<String, FormDocument>,
    pub(crate) commands: Arc<CommandRegistry>,
    observers: Observers,
    status: RefCell<Vec<String>>,
}

impl fmt::Debug for FormDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormDocument")
            .field("fields", &self.fields.len())
            .field("collections", &self.collections.keys().collect::<Vec<_>>())
            .field("popups", &self.popups.keys().collect::<Vec<_>>())
            .field("status", &self.status.borrow())
            .finish_non_exhaustive()
    }
}

fn check_tab(tabs: &[String], owner: &str, tab: Option<&String>) -> Result<(), SchemaError> {
    match tab {
        Some(tab) if !tabs.is_empty() && !tabs.contains(tab) => Err(SchemaError::UnknownTab {
            owner: owner.to_string(),
            tab: tab.clone(),
        }),
        _ => Ok(()),
    }
}

impl FormDocument {
    /// Build and link with the built-in commands.
    pub fn from_schema(schema: &FormSchema) -> Result<Self, SchemaError> {
        Self::build(schema)?.link(Arc::new(CommandRegistry::with_builtins()))
    }

    /// A standalone form for one record of `schema`.
    pub fn for_record(schema: &RecordSchema) -> Result<Self, SchemaError> {
        Self::build(&FormSchema::for_record(schema))?.link(Arc::new(CommandRegistry::new()))
    }

    /// First phase: create every field, frame and collection.
    pub fn build(schema: &FormSchema) -> Result<UnlinkedForm, SchemaError> {
        let tabs = schema.tabs.clone();
        let mut frames = FrameTable::new(&schema.frames)?;
        for frame in &schema.frames {
            check_tab(&tabs, &frame.name, frame.tab.as_ref())?;
        }

        let mut fields = Vec::with_capacity(schema.fields.len());
        let mut field_index = HashMap::new();
        for spec in &schema.fields {
            if field_index.contains_key(&spec.name) {
                return Err(SchemaError::DuplicateName {
                    scope: "field",
                    name: spec.name.clone(),
                });
            }
            check_tab(&tabs, &spec.name, spec.tab.as_ref())?;
            if let Some(frame) = &spec.frame {
                let frame = frames.resolve(&spec.name, frame)?;
                frames.add_field(frame, fields.len());
            }
            field_index.insert(spec.name.clone(), fields.len());
            fields.push(FieldInstance::new(spec.clone()));
        }

        let mut collections = IndexMap::new();
        for def in &schema.collections {
            if field_index.contains_key(&def.name) || collections.contains_key(&def.name) {
                return Err(SchemaError::DuplicateName {
                    scope: "collection",
                    name: def.name.clone(),
                });
            }
            check_tab(&tabs, &def.name, def.tab.as_ref())?;
            if let Some(frame) = &def.frame {
                let frame = frames.resolve(&def.name, frame)?;
                frames.add_collection(frame, collections.len());
            }
            // Record forms are built on demand; surface their schema errors now.
            Self::for_record(&def.schema)?;
            collections.insert(def.name.clone(), RecordCollection::new(def));
        }

        for popup in schema.popups.values() {
            Self::for_record(popup)?;
        }

        let mut buttons = IndexMap::new();
        for button in &schema.buttons {
            if buttons.contains_key(&button.name) {
                return Err(SchemaError::DuplicateName {
                    scope: "button",
                    name: button.name.clone(),
                });
            }
            check_tab(&tabs, &button.name, button.tab.as_ref())?;
            if let Some(frame) = &button.frame {
                frames.resolve(&button.name, frame)?;
            }
            buttons.insert(button.name.clone(), button.clone());
        }

        Ok(UnlinkedForm {
            tabs,
            fields,
            field_index,
            frames,
            collections,
            buttons,
            popup_schemas: schema.popups.clone(),
        })
    }
}

impl UnlinkedForm {
    /// Second phase: resolve names and establish the initial enabled state.
    pub fn link(self, commands: Arc<CommandRegistry>) -> Result<FormDocument, SchemaError> {
        let Self {
            tabs,
            mut fields,
            field_index,
            frames,
            collections,
            buttons,
            popup_schemas,
        } = self;

        for ix in 0..fields.len() {
            let ValueKind::MergedBoolList(entries) = &fields[ix].spec().kind else {
                continue;
            };
            let mut controllers = Vec::with_capacity(entries.len());
            for entry in entries {
                match field_index.get(&entry.controller) {
                    Some(&c) if fields[c].spec().kind == ValueKind::Bool => controllers.push(c),
                    _ => {
                        return Err(SchemaError::InvalidMergedController {
                            field: fields[ix].name().to_string(),
                            controller: entry.controller.clone(),
                        });
                    }
                }
            }
            fields[ix].controllers = controllers;
        }

        let graph = DependencyGraph::link(&fields, &field_index, &frames)?;

        for button in buttons.values() {
            if !commands.contains(&button.command) {
                return Err(SchemaError::UnknownCommand {
                    button: button.name.clone(),
                    command: button.command.clone(),
                });
            }
            if let Some(field) = &button.field {
                if !field_index.contains_key(field) {
                    return Err(SchemaError::UnknownButtonField {
                        button: button.name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        let mut popups = IndexMap::new();
        for (name, schema) in &popup_schemas {
            if schema.load_on_start {
                popups.insert(name.clone(), FormDocument::for_record(schema)?);
            }
        }

        let mut doc = FormDocument {
            tabs,
            fields,
            field_index,
            frames,
            collections,
            graph,
            buttons,
            popup_schemas,
            popups,
            commands,
            observers: Observers::default(),
            status: RefCell::new(Vec::new()),
        };
        for controller in doc.graph.controllers() {
            doc.evaluate(controller);
        }
        tracing::debug!(
            fields = doc.fields.len(),
            collections = doc.collections.len(),
            popups = doc.popups.len(),
            "form linked"
        );
        Ok(doc)
    }
}

impl FormDocument {
    fn index_of(&self, name: &str) -> Result<usize, FieldError> {
        self.field_index
            .get(name)
            .copied()
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))
    }

    pub fn field(&self, name: &str) -> Result<Field<'_>, FieldError> {
        let index = self.index_of(name)?;
        Ok(Field { doc: self, index })
    }

    pub fn field_mut(&mut self, name: &str) -> Result<FieldMut<'_>, FieldError> {
        let index = self.index_of(name)?;
        Ok(FieldMut { doc: self, index })
    }

    /// Every field in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = Field<'_>> {
        (0..self.fields.len()).map(move |index| Field { doc: self, index })
    }

    /// Lenient read: unknown names and unreadable controls are reported and
    /// read as `None`.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        match self.index_of(name) {
            Ok(ix) => self.get_index(ix),
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    pub fn try_get(&self, name: &str) -> Result<Option<FieldValue>, FieldError> {
        self.try_get_index(self.index_of(name)?)
    }

    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
        options: SetOptions,
    ) -> Result<(), FieldError> {
        match self.index_of(name) {
            Ok(ix) => self.set_index(ix, value.into(), options),
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.field_index
            .get(name)
            .is_some_and(|ix| self.is_active_index(*ix))
    }

    /// Field name to value for every field that holds one.
    pub fn values(&self) -> IndexMap<String, FieldValue> {
        (0..self.fields.len())
            .filter(|ix| !self.fields[*ix].spec().label_only)
            .filter_map(|ix| Some((self.fields[ix].name().to_string(), self.get_index(ix)?)))
            .collect()
    }

    /// Force every field back to its declared default.
    pub fn reset_defaults(&mut self) {
        for field in &mut self.fields {
            field.reset();
        }
        for controller in self.graph.controllers() {
            self.evaluate(controller);
        }
    }

    /// Recovered errors, oldest first.
    pub fn status(&self) -> Vec<String> {
        self.status.borrow().clone()
    }

    pub fn clear_status(&self) {
        self.status.borrow_mut().clear();
    }

    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    pub fn frames(&self) -> impl Iterator<Item = &FrameSpec> {
        self.frames.specs()
    }

    pub fn buttons(&self) -> impl Iterator<Item = &ButtonSpec> {
        self.buttons.values()
    }

    pub fn collection(&self, name: &str) -> Option<&RecordCollection> {
        self.collections.get(name)
    }

    pub fn collection_mut(&mut self, name: &str) -> Option<&mut RecordCollection> {
        self.collections.get_mut(name)
    }

    pub fn collections(&self) -> impl Iterator<Item = &RecordCollection> {
        self.collections.values()
    }

    /// A popup form that has already been opened (or was loaded on start).
    pub fn popup(&self, name: &str) -> Option<&FormDocument> {
        self.popups.get(name)
    }

    /// Open a standalone popup form, building it on first use. The form keeps
    /// its state between openings.
    pub fn open_popup(&mut self, name: &str) -> Result<&mut FormDocument, SchemaError> {
        let schema = self
            .popup_schemas
            .get(name)
            .ok_or_else(|| SchemaError::UnknownPopup(name.to_string()))?;
        match self.popups.entry(name.to_string()) {
            indexmap::map::Entry::Occupied(entry) => Ok(entry.into_mut()),
            indexmap::map::Entry::Vacant(entry) => {
                tracing::debug!(popup = name, "building popup form");
                Ok(entry.insert(FormDocument::for_record(schema)?))
            }
        }
    }

    /// Handle for the control of a visible, value-carrying field.
    pub fn control_handle(&self, name: &str) -> Option<ControlHandle> {
        let ix = *self.field_index.get(name)?;
        let spec = self.fields[ix].spec();
        (spec.visible && !spec.label_only).then_some(ControlHandle(ix))
    }

    /// A user edit coming back from a control. Never forced.
    pub fn set_from_control(
        &mut self,
        handle: ControlHandle,
        value: impl Into<FieldValue>,
    ) -> Result<(), FieldError> {
        self.set_index(handle.0, value.into(), SetOptions::default())
    }

    pub fn display_text(&self, handle: ControlHandle) -> String {
        self.display_text_index(handle.0)
    }

    /// Called whenever a field's enabled state flips.
    pub fn subscribe(&mut self, callback: impl Fn(&ActiveStateChange) + 'static) -> SubscriptionId {
        self.observers.subscribe(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Ask `chooser` for a new path for a file path field. Only the field's
    /// text changes; returns the chosen path, or `None` if cancelled.
    pub fn choose_path(
        &mut self,
        name: &str,
        chooser: &dyn PathChooser,
    ) -> Result<Option<PathBuf>, FieldError> {
        let ix = self.index_of(name)?;
        let ValueKind::FilePath(mode) = self.fields[ix].spec().kind else {
            return Err(FieldError::WrongKind {
                field: name.to_string(),
                expected: "file path",
            });
        };
        let current = self.fields[ix].state().display_text();
        let Some(path) = chooser.choose(mode, &current) else {
            return Ok(None);
        };
        self.set_index(
            ix,
            FieldValue::Text(path.display().to_string()),
            SetOptions::default(),
        )?;
        Ok(Some(path))
    }

    pub(crate) fn report(&self, err: &dyn fmt::Display) {
        tracing::warn!(%err, "form error");
        self.status.borrow_mut().push(err.to_string());
    }

    pub(crate) fn get_index(&self, ix: usize) -> Option<FieldValue> {
        match self.try_get_index(ix) {
            Ok(value) => value,
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    pub(crate) fn try_get_index(&self, ix: usize) -> Result<Option<FieldValue>, FieldError> {
        let field = &self.fields[ix];
        if field.spec().label_only {
            return Ok(None);
        }
        if let ValueKind::MergedBoolList(entries) = &field.spec().kind {
            let values: Vec<bool> = field
                .controllers
                .iter()
                .map(|c| matches!(self.fields[*c].state(), ControlState::Toggle(true)))
                .collect();
            let tokens = merged_tokens(entries, &values);
            return Ok(Some(FieldValue::List(
                tokens.into_iter().map(FieldValue::Text).collect(),
            )));
        }
        field.read().map_err(|source| FieldError::Coercion {
            field: field.name().to_string(),
            source,
        })
    }

    pub(crate) fn is_active_index(&self, ix: usize) -> bool {
        let field = &self.fields[ix];
        if field.spec().label_only {
            false
        } else if field.is_merged() {
            true
        } else {
            field.is_enabled() && field.state().has_content()
        }
    }

    pub(crate) fn display_text_index(&self, ix: usize) -> String {
        let field = &self.fields[ix];
        if field.is_merged() {
            self.get_index(ix)
                .map(|value| field.spec().kind.format(&value))
                .unwrap_or_default()
        } else {
            field.state().display_text()
        }
    }

    pub(crate) fn set_index(
        &mut self,
        ix: usize,
        value: FieldValue,
        options: SetOptions,
    ) -> Result<(), FieldError> {
        let result = self.write_index(ix, &value, options);
        match &result {
            Ok(()) => tracing::debug!(field = self.fields[ix].name(), %value, "field set"),
            Err(err) => self.report(err),
        }
        result
    }

    fn write_index(&mut self, ix: usize, value: &FieldValue, options: SetOptions) -> Result<(), FieldError> {
        let field = &self.fields[ix];
        if field.spec().label_only {
            return Err(FieldError::LabelOnly(field.name().to_string()));
        }

        if let ValueKind::MergedBoolList(entries) = &field.spec().kind {
            let values = resolve_merged_tokens(entries, &value.to_tokens()).map_err(|source| {
                FieldError::Coercion {
                    field: field.name().to_string(),
                    source,
                }
            })?;
            let controllers = field.controllers.clone();
            // All or nothing: a disabled controller rejects the whole write.
            if !options.force_change {
                if let Some(c) = controllers.iter().find(|c| !self.fields[**c].is_enabled()) {
                    return Err(FieldError::Disabled {
                        field: self.fields[*c].name().to_string(),
                    });
                }
            }
            for (c, value) in controllers.iter().zip(values) {
                self.fields[*c].write(ControlState::Toggle(value), options.force_change)?;
            }
            for c in controllers {
                self.evaluate(c);
            }
            return Ok(());
        }

        let state = field.coerce(value)?;
        self.fields[ix].write(state, options.force_change)?;
        self.evaluate(ix);
        Ok(())
    }

    /// Apply every rule of `controller` for its current value. One hop only.
    pub(crate) fn evaluate(&mut self, controller: usize) {
        if !self.graph.is_controller(controller) {
            return;
        }
        let value = self.fields[controller].read().ok().flatten();
        let effects: Vec<(Target, bool)> = self
            .graph
            .edges_from(controller)
            .map(|edge| (edge.target, edge.target_enabled(value.as_ref())))
            .collect();

        for (target, enabled) in effects {
            match target {
                Target::Field(ix) => self.set_enabled_index(ix, enabled),
                Target::Frame(frame) => {
                    let (fields, collections) = self.frames.members(frame);
                    for ix in fields {
                        self.set_enabled_index(ix, enabled);
                    }
                    for ix in collections {
                        if let Some((_, collection)) = self.collections.get_index_mut(ix) {
                            collection.set_enabled(enabled);
                        }
                    }
                }
            }
        }
    }

    fn set_enabled_index(&mut self, ix: usize, enabled: bool) {
        if self.fields[ix].set_enabled(enabled) {
            let change = ActiveStateChange {
                target: self.fields[ix].name().to_string(),
                enabled,
            };
            tracing::debug!(field = %change.target, enabled, "active state changed");
            self.observers.notify(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, RuleDef, frame};

    fn controlled() -> FormSchema {
        FormSchema::new()
            .with_field(
                FieldSpec::new("use_limit", ValueKind::Bool)
                    .default_value(false)
                    .rule(RuleDef::new("limit")),
            )
            .with_field(FieldSpec::new("limit", ValueKind::Int).default_value(10))
    }

    #[test]
    fn link_evaluates_controllers_once() {
        let doc = FormDocument::from_schema(&controlled()).unwrap();
        assert!(!doc.field("limit").unwrap().is_enabled());
        assert!(!doc.is_active("limit"));
        assert_eq!(doc.get("limit"), Some(FieldValue::Int(10)));
    }

    #[test]
    fn label_only_fields_hold_no_value() {
        let schema = FormSchema::new().with_field(FieldSpec::label_only("note", "Read me"));
        let mut doc = FormDocument::from_schema(&schema).unwrap();
        assert_eq!(doc.get("note"), None);
        assert!(!doc.is_active("note"));
        assert!(doc.control_handle("note").is_none());
        assert_eq!(
            doc.set("note", "x", SetOptions::default()),
            Err(FieldError::LabelOnly("note".into()))
        );
        assert!(doc.values().is_empty());
    }

    #[test]
    fn unknown_names_are_reported() {
        let mut doc = FormDocument::from_schema(&controlled()).unwrap();
        assert_eq!(doc.get("missing"), None);
        assert!(doc.set("missing", 1, SetOptions::default()).is_err());
        assert_eq!(doc.status().len(), 2);
        doc.clear_status();
        assert!(doc.status().is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let schema = FormSchema::new()
            .with_field(FieldSpec::new("a", ValueKind::Int))
            .with_field(FieldSpec::new("a", ValueKind::Float));
        assert!(matches!(
            FormDocument::build(&schema),
            Err(SchemaError::DuplicateName { scope: "field", .. })
        ));
    }

    #[test]
    fn unknown_tab_is_rejected_only_when_tabs_are_declared() {
        let mut field = FieldSpec::new("a", ValueKind::Int);
        field.tab = Some("Main".into());
        assert!(FormDocument::build(&FormSchema::new().with_field(field.clone())).is_ok());
        assert!(matches!(
            FormDocument::build(&FormSchema::new().with_tab("Other").with_field(field)),
            Err(SchemaError::UnknownTab { .. })
        ));
    }

    #[test]
    fn merged_controllers_must_be_bool_fields() {
        use crate::kind::MergedBoolEntry;
        let schema = FormSchema::new()
            .with_field(FieldSpec::new("a", ValueKind::Int))
            .with_field(FieldSpec::new(
                "flags",
                ValueKind::MergedBoolList(vec![MergedBoolEntry::new("a", "X", "")]),
            ));
        assert!(matches!(
            FormDocument::build(&schema).unwrap().link(Arc::new(CommandRegistry::new())),
            Err(SchemaError::InvalidMergedController { .. })
        ));
    }

    #[test]
    fn control_handles_funnel_edits_back() {
        let mut doc = FormDocument::from_schema(&controlled()).unwrap();
        let toggle = doc.control_handle("use_limit").unwrap();
        let limit = doc.control_handle("limit").unwrap();
        assert!(doc.set_from_control(limit, "12").is_err());
        doc.set_from_control(toggle, "t").unwrap();
        doc.set_from_control(limit, "12.7").unwrap();
        assert_eq!(doc.display_text(limit), "12");
        assert_eq!(doc.display_text(toggle), "True");
    }

    #[test]
    fn hidden_fields_have_no_control() {
        let schema = FormSchema::new().with_field(FieldSpec::new("a", ValueKind::Int).hidden());
        let doc = FormDocument::from_schema(&schema).unwrap();
        assert!(doc.control_handle("a").is_none());
    }

    #[test]
    fn frame_targets_cover_collections() {
        use crate::schema::{CollectionDef, RecordSchema};
        let record = RecordSchema::new("item", "name", vec![FieldSpec::new("name", ValueKind::String)])
            .unwrap();
        let mut items = CollectionDef::new("items", Arc::new(record));
        items.frame = Some("box".into());
        let schema = FormSchema::new()
            .with_frame(frame("box"))
            .with_field(
                FieldSpec::new("enable_box", ValueKind::Bool).rule(RuleDef::new("box")),
            )
            .with_collection(items);
        let mut doc = FormDocument::from_schema(&schema).unwrap();
        assert!(!doc.collection("items").unwrap().is_enabled());
        doc.set("enable_box", true, SetOptions::default()).unwrap();
        assert!(doc.collection("items").unwrap().is_enabled());
    }
}
