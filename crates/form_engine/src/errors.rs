use thiserror::Error;

/// A malformed schema. Fatal: the form is not built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("duplicate {scope} name `{name}`")]
    DuplicateName { scope: &'static str, name: String },

    #[error("field `{field}` has no value kind")]
    MissingKind { field: String },

    #[error("field `{field}`: unknown value kind `{kind}`")]
    UnknownKind { field: String, kind: String },

    #[error("`{owner}` references unknown frame `{frame}`")]
    UnknownFrame { owner: String, frame: String },

    #[error("frame `{frame}` is its own ancestor")]
    FrameCycle { frame: String },

    #[error("`{owner}` references unknown tab `{tab}`")]
    UnknownTab { owner: String, tab: String },

    #[error("collection `{collection}` references unknown popup schema `{schema}`")]
    UnknownRecordSchema { collection: String, schema: String },

    #[error("no popup schema named `{0}`")]
    UnknownPopup(String),

    #[error("record schema `{schema}` has no usable key field")]
    MissingKeyField { schema: String },

    #[error("rule on `{controller}` targets unknown field or frame `{target}`")]
    UnresolvedTarget { controller: String, target: String },

    #[error("rule on `{controller}`: {reason}")]
    InvalidRule { controller: String, reason: String },

    #[error("dependency cycle between `{first}` and `{second}`")]
    DependencyCycle { first: String, second: String },

    #[error("merged list `{field}` references `{controller}`, which is not a bool field")]
    InvalidMergedController { field: String, controller: String },

    #[error("button `{button}` uses unregistered command `{command}`")]
    UnknownCommand { button: String, command: String },

    #[error("button `{button}` references unknown field `{field}`")]
    UnknownButtonField { button: String, field: String },
}

/// A value that does not fit the field's kind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("`{0}` is not a boolean")]
    InvalidBool(String),

    #[error("`{text}` is not a valid {kind}")]
    InvalidNumber { kind: &'static str, text: String },

    #[error("`{value}` is not one of {options:?}")]
    NotAnOption { value: String, options: Vec<String> },

    #[error("token `{token}` matches neither `{expected_true}` nor `{expected_false}`")]
    TokenMismatch {
        token: String,
        expected_true: String,
        expected_false: String,
    },

    #[error("expected {expected} elements, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("cannot use {value} as a {kind} value")]
    Unsupported { kind: &'static str, value: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("field `{0}` is label-only and holds no value")]
    LabelOnly(String),

    #[error("field `{field}` is disabled by an activation rule")]
    Disabled { field: String },

    #[error("field `{field}` is not a {expected} field")]
    WrongKind { field: String, expected: &'static str },

    #[error("field `{field}`: {source}")]
    Coercion {
        field: String,
        #[source]
        source: CoercionError,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectionError {
    #[error("a record named `{0}` already exists")]
    Collision(String),

    #[error("no record named `{0}`")]
    UnknownRecord(String),

    #[error("record has no value for key field `{field}`")]
    MissingKey { field: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("unknown button `{0}`")]
    UnknownButton(String),

    #[error("command `{0}` is not registered")]
    UnknownCommand(String),

    #[error("command `{command}` failed: {message}")]
    Failed { command: String, message: String },

    #[error(transparent)]
    Field(#[from] FieldError),
}
