//! Field instances: one schema-bound unit of state.
//!
//! `FieldInstance` owns the control state and enabled flag. Reads and writes
//! that need the rest of the form (merged lists reading their controllers,
//! rule propagation after a write) go through the [`Field`] / [`FieldMut`]
//! handles handed out by the [`FormDocument`].

use std::sync::Arc;

use crate::document::FormDocument;
use crate::errors::{CoercionError, FieldError};
use crate::kind::ControlState;
use crate::schema::FieldSpec;
use crate::value::FieldValue;

/// Options for a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Write even if an activation rule has disabled the field. The disabled
    /// state is restored afterwards.
    pub force_change: bool,
}

impl SetOptions {
    pub fn forced() -> Self {
        Self { force_change: true }
    }
}

#[derive(Debug, Clone)]
pub struct FieldInstance {
    spec: Arc<FieldSpec>,
    state: ControlState,
    enabled: bool,
    /// Controller indices of a merged list, resolved at link time.
    pub(crate) controllers: Vec<usize>,
}

impl FieldInstance {
    pub(crate) fn new(spec: FieldSpec) -> Self {
        let state = spec.kind.initial_state();
        let mut field = Self {
            spec: Arc::new(spec),
            state,
            enabled: true,
            controllers: Vec::new(),
        };
        field.apply_default();
        field
    }

    /// Defaults that do not coerce are kept as raw control text, the same as a
    /// widget showing whatever the schema author wrote. The next read reports it.
    fn apply_default(&mut self) {
        let Some(default) = self.spec.default.clone() else {
            return;
        };
        match self.spec.kind.coerce(&default, &self.spec.options) {
            Ok(state) => self.state = state,
            Err(err) => {
                tracing::warn!(field = %self.spec.name, %err, "default value does not match field kind");
                if let ControlState::Text(_) = self.state {
                    self.state = ControlState::Text(default.to_string());
                }
            }
        }
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn is_merged(&self) -> bool {
        matches!(self.state, ControlState::Derived)
    }

    pub(crate) fn state(&self) -> &ControlState {
        &self.state
    }

    /// Returns true if the flag changed.
    pub(crate) fn set_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.enabled != enabled;
        self.enabled = enabled;
        changed
    }

    pub(crate) fn read(&self) -> Result<Option<FieldValue>, CoercionError> {
        self.spec.kind.read(&self.state, &self.spec.options)
    }

    pub(crate) fn coerce(&self, value: &FieldValue) -> Result<ControlState, FieldError> {
        self.spec
            .kind
            .coerce(value, &self.spec.options)
            .map_err(|source| FieldError::Coercion {
                field: self.spec.name.clone(),
                source,
            })
    }

    /// Store an already coerced state. A forced write to a disabled control
    /// goes through and leaves the control disabled.
    pub(crate) fn write(&mut self, state: ControlState, force: bool) -> Result<(), FieldError> {
        if !self.enabled && !force {
            return Err(FieldError::Disabled {
                field: self.spec.name.clone(),
            });
        }
        self.state = state;
        Ok(())
    }

    /// Reset to the declared default, or to an empty control.
    pub(crate) fn reset(&mut self) {
        self.state = self.spec.kind.initial_state();
        self.apply_default();
    }
}

/// Read access to one field of a form.
#[derive(Clone, Copy)]
pub struct Field<'a> {
    pub(crate) doc: &'a FormDocument,
    pub(crate) index: usize,
}

impl<'a> Field<'a> {
    fn instance(&self) -> &'a FieldInstance {
        &self.doc.fields[self.index]
    }

    pub fn spec(&self) -> &'a FieldSpec {
        self.instance().spec()
    }

    pub fn name(&self) -> &'a str {
        self.instance().name()
    }

    /// The current value, or `None` if the field is empty, label-only or its
    /// control holds something that does not parse (reported, not raised).
    pub fn get(&self) -> Option<FieldValue> {
        self.doc.get_index(self.index)
    }

    /// Like [`get`](Self::get) but surfaces coercion failures.
    pub fn try_get(&self) -> Result<Option<FieldValue>, FieldError> {
        self.doc.try_get_index(self.index)
    }

    pub fn is_active(&self) -> bool {
        self.doc.is_active_index(self.index)
    }

    pub fn is_enabled(&self) -> bool {
        self.instance().is_enabled()
    }

    /// What the field's control would display.
    pub fn display_text(&self) -> String {
        self.doc.display_text_index(self.index)
    }
}

/// Write access to one field of a form.
pub struct FieldMut<'a> {
    pub(crate) doc: &'a mut FormDocument,
    pub(crate) index: usize,
}

impl FieldMut<'_> {
    pub fn as_field(&self) -> Field<'_> {
        Field {
            doc: &*self.doc,
            index: self.index,
        }
    }

    pub fn get(&self) -> Option<FieldValue> {
        self.as_field().get()
    }

    pub fn is_active(&self) -> bool {
        self.as_field().is_active()
    }

    /// Write a value. Rejected writes leave the prior value intact, are
    /// reported to the form status and returned as an error.
    pub fn set(&mut self, value: impl Into<FieldValue>, options: SetOptions) -> Result<(), FieldError> {
        self.doc.set_index(self.index, value.into(), options)
    }
}
