//! Form state engine.
//!
//! Typed fields bound to a [`FormSchema`], activation rules between them,
//! keyed record collections and export/import by output tag. Rendering is
//! left to the host, which talks to a [`FormDocument`] through control
//! handles and active-state subscriptions.

mod command;
mod control;
mod dependency;
mod document;
mod errors;
mod field;
mod frame;
pub mod kind;
mod projection;
mod record;
mod schema;
pub mod value;

pub use command::{CommandContext, CommandFn, CommandRegistry, PULL_VALUES, RESET_DEFAULTS};
pub use control::{ActiveStateChange, ControlHandle, PathChooser, SubscriptionId};
pub use document::{FormDocument, UnlinkedForm};
pub use errors::{CoercionError, CollectionError, CommandError, FieldError, SchemaError};
pub use field::{Field, FieldInstance, FieldMut, SetOptions};
pub use form_config::{ButtonSpec, FrameSpec, RuleEffect};
pub use kind::{MergedBoolEntry, PathMode, ScalarKind, ValueKind};
pub use record::{Record, RecordCollection, RecordEdit};
pub use schema::{CollectionDef, Condition, FieldSpec, FormSchema, RecordSchema, RuleDef, frame};
pub use value::FieldValue;
