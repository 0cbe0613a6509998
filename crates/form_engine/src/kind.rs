//! Value kinds and their coercion rules.
//!
//! Every field stores what its control would hold (entry text, a toggle, a
//! selection) in a [`ControlState`]. Writes coerce a [`FieldValue`] into that
//! state, reads parse the state back into a typed value. Entry-style kinds
//! keep text so that a control holding unparsable text surfaces as a read
//! error instead of being silently repaired.

use crate::errors::CoercionError;
use crate::value::{FieldValue, split_delimited};

/// Element kinds allowed inside a fixed-length list field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    String,
}

/// Which chooser a file path field pairs with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathMode {
    #[default]
    Open,
    SaveAs,
    Directory,
}

/// One boolean controller contributing a token to a merged list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedBoolEntry {
    pub controller: String,
    pub true_token: String,
    pub false_token: String,
}

impl MergedBoolEntry {
    pub fn new(
        controller: impl Into<String>,
        true_token: impl Into<String>,
        false_token: impl Into<String>,
    ) -> Self {
        Self {
            controller: controller.into(),
            true_token: true_token.into(),
            false_token: false_token.into(),
        }
    }

    fn token(&self, value: bool) -> &str {
        if value { &self.true_token } else { &self.false_token }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
    FilePath(PathMode),
    Selection,
    ListBoxSelection,
    /// Fixed-length list, one rule per position.
    List(Vec<ScalarKind>),
    /// Tokens derived from boolean controller fields.
    MergedBoolList(Vec<MergedBoolEntry>),
}

/// What a field's control currently holds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ControlState {
    Toggle(bool),
    Text(String),
    Choice(Option<String>),
    Choices(Vec<String>),
    Entries(Vec<String>),
    /// Merged lists hold nothing of their own.
    Derived,
}

impl ControlState {
    /// Whether the control holds something a read can turn into a value.
    pub(crate) fn has_content(&self) -> bool {
        match self {
            Self::Toggle(_) | Self::Derived => true,
            Self::Text(s) => !s.trim().is_empty(),
            Self::Choice(choice) => choice.is_some(),
            Self::Choices(items) => !items.is_empty(),
            Self::Entries(items) => !items.is_empty() && items.iter().all(|s| !s.trim().is_empty()),
        }
    }

    /// Text as a widget would display it.
    pub(crate) fn display_text(&self) -> String {
        match self {
            Self::Toggle(b) => FieldValue::Bool(*b).to_string(),
            Self::Text(s) => s.clone(),
            Self::Choice(choice) => choice.clone().unwrap_or_default(),
            Self::Choices(items) | Self::Entries(items) => items.join(" "),
            Self::Derived => String::new(),
        }
    }
}

impl ScalarKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Some(Self::Bool),
            "int" | "integer" => Some(Self::Int),
            "float" | "double" => Some(Self::Float),
            "str" | "string" | "text" => Some(Self::String),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
        }
    }

    /// Canonical control text for one element.
    fn coerce(self, value: &FieldValue) -> Result<String, CoercionError> {
        let canonical = match (self, value) {
            (Self::Bool, FieldValue::Text(s)) => FieldValue::Bool(parse_bool(s)?),
            (Self::Bool, FieldValue::Bool(b)) => FieldValue::Bool(*b),
            (Self::Bool, FieldValue::Int(i @ (0 | 1))) => FieldValue::Bool(*i == 1),
            (Self::Int, FieldValue::Text(s)) => FieldValue::Int(parse_int(s)?),
            (Self::Int, FieldValue::Int(i)) => FieldValue::Int(*i),
            (Self::Int, FieldValue::Float(x)) => FieldValue::Int(truncate(*x, &x.to_string())?),
            (Self::Float, FieldValue::Text(s)) => FieldValue::Float(parse_float(s)?),
            (Self::Float, FieldValue::Int(i)) => FieldValue::Float(*i as f64),
            (Self::Float, FieldValue::Float(x)) => FieldValue::Float(*x),
            (Self::String, FieldValue::Text(s)) => FieldValue::Text(strip_quotes(s).to_string()),
            (Self::String, FieldValue::List(_)) => {
                return Err(unsupported(self.name(), value));
            }
            (Self::String, other) => FieldValue::Text(other.to_string()),
            (_, other) => return Err(unsupported(self.name(), other)),
        };
        Ok(canonical.to_string())
    }

    fn read(self, text: &str) -> Result<FieldValue, CoercionError> {
        Ok(match self {
            Self::Bool => FieldValue::Bool(parse_bool(text)?),
            Self::Int => FieldValue::Int(parse_int(text)?),
            Self::Float => FieldValue::Float(parse_float(text)?),
            Self::String => FieldValue::Text(text.to_string()),
        })
    }
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::FilePath(_) => "file path",
            Self::Selection => "selection",
            Self::ListBoxSelection => "list box selection",
            Self::List(_) => "list",
            Self::MergedBoolList(_) => "merged bool list",
        }
    }

    /// Only these kinds may declare activation rules.
    pub fn is_controller(&self) -> bool {
        matches!(self, Self::Bool | Self::Selection | Self::ListBoxSelection)
    }

    pub(crate) fn initial_state(&self) -> ControlState {
        match self {
            Self::Bool => ControlState::Toggle(false),
            Self::Int | Self::Float | Self::String | Self::FilePath(_) => {
                ControlState::Text(String::new())
            }
            Self::Selection => ControlState::Choice(None),
            Self::ListBoxSelection => ControlState::Choices(Vec::new()),
            Self::List(kinds) => ControlState::Entries(vec![String::new(); kinds.len()]),
            Self::MergedBoolList(_) => ControlState::Derived,
        }
    }

    /// Coerce `value` into control state without touching any field.
    ///
    /// Merged lists are written through their controllers, see
    /// [`resolve_merged_tokens`].
    pub(crate) fn coerce(
        &self,
        value: &FieldValue,
        options: &[String],
    ) -> Result<ControlState, CoercionError> {
        match self {
            Self::Bool => match value {
                FieldValue::Bool(b) => Ok(ControlState::Toggle(*b)),
                FieldValue::Text(s) => Ok(ControlState::Toggle(parse_bool(s)?)),
                FieldValue::Int(i @ (0 | 1)) => Ok(ControlState::Toggle(*i == 1)),
                other => Err(unsupported(self.name(), other)),
            },
            Self::Int => Ok(ControlState::Text(ScalarKind::Int.coerce(value)?)),
            Self::Float => Ok(ControlState::Text(ScalarKind::Float.coerce(value)?)),
            Self::String | Self::FilePath(_) => {
                Ok(ControlState::Text(ScalarKind::String.coerce(value)?))
            }
            Self::Selection => {
                let choice = match value {
                    FieldValue::Text(s) => strip_quotes(s).to_string(),
                    FieldValue::List(_) => return Err(unsupported(self.name(), value)),
                    other => other.to_string(),
                };
                ensure_option(&choice, options)?;
                Ok(ControlState::Choice(Some(choice)))
            }
            Self::ListBoxSelection => {
                let wanted = value.to_tokens();
                for item in &wanted {
                    ensure_option(item, options)?;
                }
                let selected = options
                    .iter()
                    .filter(|option| wanted.contains(option))
                    .cloned()
                    .collect();
                Ok(ControlState::Choices(selected))
            }
            Self::List(kinds) => {
                let items: Vec<FieldValue> = match value {
                    FieldValue::List(items) => items.clone(),
                    FieldValue::Text(s) => {
                        split_delimited(s).into_iter().map(FieldValue::Text).collect()
                    }
                    other => vec![other.clone()],
                };
                if items.len() != kinds.len() {
                    return Err(CoercionError::Arity {
                        expected: kinds.len(),
                        found: items.len(),
                    });
                }
                let entries = kinds
                    .iter()
                    .zip(&items)
                    .map(|(kind, item)| kind.coerce(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ControlState::Entries(entries))
            }
            Self::MergedBoolList(_) => Ok(ControlState::Derived),
        }
    }

    /// Read the typed value out of a control. `Ok(None)` means the control is
    /// empty rather than malformed.
    pub(crate) fn read(
        &self,
        state: &ControlState,
        options: &[String],
    ) -> Result<Option<FieldValue>, CoercionError> {
        match (self, state) {
            (Self::Bool, ControlState::Toggle(b)) => Ok(Some(FieldValue::Bool(*b))),
            (Self::String | Self::FilePath(_), ControlState::Text(s)) => {
                Ok(Some(ScalarKind::String.read(s)?))
            }
            (Self::Int | Self::Float, ControlState::Text(s)) if s.trim().is_empty() => Ok(None),
            (Self::Int, ControlState::Text(s)) => Ok(Some(ScalarKind::Int.read(s)?)),
            (Self::Float, ControlState::Text(s)) => Ok(Some(ScalarKind::Float.read(s)?)),
            (Self::Selection, ControlState::Choice(None)) => Ok(None),
            (Self::Selection, ControlState::Choice(Some(choice))) => {
                ensure_option(choice, options)?;
                Ok(Some(FieldValue::Text(choice.clone())))
            }
            (Self::ListBoxSelection, ControlState::Choices(items)) => {
                for item in items {
                    ensure_option(item, options)?;
                }
                Ok(Some(FieldValue::List(
                    items.iter().cloned().map(FieldValue::Text).collect(),
                )))
            }
            (Self::List(_), ControlState::Entries(items))
                if items.iter().any(|s| s.trim().is_empty()) =>
            {
                Ok(None)
            }
            (Self::List(kinds), ControlState::Entries(items)) => {
                let values = kinds
                    .iter()
                    .zip(items)
                    .map(|(kind, text)| kind.read(text))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(FieldValue::List(values)))
            }
            (_, state) => Err(CoercionError::Unsupported {
                kind: self.name(),
                value: format!("{state:?}"),
            }),
        }
    }

    /// Parse text the way the field's control would.
    pub fn parse(&self, text: &str, options: &[String]) -> Result<Option<FieldValue>, CoercionError> {
        let state = self.coerce(&FieldValue::Text(text.to_string()), options)?;
        self.read(&state, options)
    }

    /// Display text for a value of this kind.
    pub fn format(&self, value: &FieldValue) -> String {
        self.format_elements(value).join(" ")
    }

    /// Each element formatted on its own; joining is up to the caller.
    pub fn format_elements(&self, value: &FieldValue) -> Vec<String> {
        match (self, value) {
            (
                Self::List(_) | Self::ListBoxSelection | Self::MergedBoolList(_),
                FieldValue::List(items),
            ) => items.iter().map(ToString::to_string).collect(),
            (_, value) => vec![value.to_string()],
        }
    }
}

/// Tokens for the current controller values, empty tokens dropped.
pub fn merged_tokens(entries: &[MergedBoolEntry], values: &[bool]) -> Vec<String> {
    entries
        .iter()
        .zip(values)
        .map(|(entry, value)| entry.token(*value))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Controller values for a token list.
///
/// If any entry has an empty token the tokens are matched by membership,
/// in any order; otherwise they are matched position by position and every
/// token must equal one of its entry's two tokens.
pub fn resolve_merged_tokens(
    entries: &[MergedBoolEntry],
    tokens: &[String],
) -> Result<Vec<bool>, CoercionError> {
    let by_membership = entries
        .iter()
        .any(|e| e.true_token.is_empty() || e.false_token.is_empty());

    if by_membership {
        return Ok(entries
            .iter()
            .map(|e| {
                if !e.true_token.is_empty() {
                    tokens.contains(&e.true_token)
                } else if !e.false_token.is_empty() {
                    !tokens.contains(&e.false_token)
                } else {
                    false
                }
            })
            .collect());
    }

    if tokens.len() != entries.len() {
        return Err(CoercionError::Arity {
            expected: entries.len(),
            found: tokens.len(),
        });
    }
    entries
        .iter()
        .zip(tokens)
        .map(|(e, token)| {
            if *token == e.true_token {
                Ok(true)
            } else if *token == e.false_token {
                Ok(false)
            } else {
                Err(CoercionError::TokenMismatch {
                    token: token.clone(),
                    expected_true: e.true_token.clone(),
                    expected_false: e.false_token.clone(),
                })
            }
        })
        .collect()
}

pub fn parse_bool(text: &str) -> Result<bool, CoercionError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(CoercionError::InvalidBool(text.to_string())),
    }
}

/// Integers tolerate float text (`"3.0"`), truncating toward zero.
pub fn parse_int(text: &str) -> Result<i64, CoercionError> {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(i);
    }
    let x = parse_float(trimmed).map_err(|_| CoercionError::InvalidNumber {
        kind: "int",
        text: text.to_string(),
    })?;
    truncate(x, text)
}

pub fn parse_float(text: &str) -> Result<f64, CoercionError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| CoercionError::InvalidNumber {
            kind: "float",
            text: text.to_string(),
        })
}

fn truncate(x: f64, text: &str) -> Result<i64, CoercionError> {
    if x.is_finite() && x.abs() < i64::MAX as f64 {
        Ok(x.trunc() as i64)
    } else {
        Err(CoercionError::InvalidNumber {
            kind: "int",
            text: text.to_string(),
        })
    }
}

/// Strip one pair of matching outer quotes. Surrounding whitespace is
/// content, so `" 'a' "` is returned unchanged.
pub fn strip_quotes(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn ensure_option(value: &str, options: &[String]) -> Result<(), CoercionError> {
    if options.iter().any(|option| option == value) {
        Ok(())
    } else {
        Err(CoercionError::NotAnOption {
            value: value.to_string(),
            options: options.to_vec(),
        })
    }
}

fn unsupported(kind: &'static str, value: &FieldValue) -> CoercionError {
    CoercionError::Unsupported {
        kind,
        value: format!("{value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bool_parse_rules() {
        for t in ["true", "T", " 1 ", "TRUE"] {
            assert_eq!(parse_bool(t), Ok(true), "{t}");
        }
        for f in ["false", "f", "0", "False"] {
            assert_eq!(parse_bool(f), Ok(false), "{f}");
        }
        assert!(matches!(parse_bool("yes"), Err(CoercionError::InvalidBool(_))));
    }

    #[test]
    fn int_tolerates_float_text() {
        assert_eq!(parse_int("3.0"), Ok(3));
        assert_eq!(parse_int("-2.9"), Ok(-2));
        assert_eq!(parse_int("42"), Ok(42));
        assert!(parse_int("abc").is_err());
        assert!(parse_int("inf").is_err());
    }

    #[test]
    fn string_quotes_are_stripped() {
        let kind = ValueKind::String;
        assert_eq!(kind.parse("'abc'", &[]), Ok(Some("abc".into())));
        assert_eq!(kind.parse("\"a b\"", &[]), Ok(Some("a b".into())));
        assert_eq!(kind.parse("it's", &[]), Ok(Some("it's".into())));
        assert_eq!(kind.parse("\"'x'\"", &[]), Ok(Some("'x'".into())));
    }

    #[test]
    fn quote_stripping_keeps_surrounding_whitespace() {
        assert_eq!(strip_quotes("'a b'"), "a b");
        assert_eq!(strip_quotes(" 'a' "), " 'a' ");
        assert_eq!(strip_quotes("  plain "), "  plain ");
        assert_eq!(strip_quotes("'"), "'");
    }

    #[test]
    fn format_parse_round_trip_for_every_kind() {
        let options = opts(&["a", "b", "c"]);
        let cases: Vec<(ValueKind, &str)> = vec![
            (ValueKind::Bool, "True"),
            (ValueKind::Int, "3.0"),
            (ValueKind::Float, "0.25"),
            (ValueKind::String, "'quoted'"),
            (ValueKind::FilePath(PathMode::Directory), "/tmp/out"),
            (ValueKind::Selection, "b"),
            (ValueKind::ListBoxSelection, "c a"),
            (
                ValueKind::List(vec![ScalarKind::Int, ScalarKind::Float, ScalarKind::Bool]),
                "1, 2.5; t",
            ),
        ];
        for (kind, text) in cases {
            let value = kind.parse(text, &options).unwrap().unwrap();
            let formatted = kind.format(&value);
            let reparsed = kind.parse(&formatted, &options).unwrap().unwrap();
            assert_eq!(kind.format(&reparsed), formatted, "{kind:?}");
            assert_eq!(reparsed, value, "{kind:?}");
        }
    }

    #[test]
    fn selection_must_be_an_option() {
        let options = opts(&["x", "y"]);
        assert!(matches!(
            ValueKind::Selection.parse("z", &options),
            Err(CoercionError::NotAnOption { .. })
        ));
        assert!(matches!(
            ValueKind::ListBoxSelection.parse("x z", &options),
            Err(CoercionError::NotAnOption { .. })
        ));
    }

    #[test]
    fn listbox_selection_follows_option_order() {
        let options = opts(&["a", "b", "c"]);
        let state = ValueKind::ListBoxSelection
            .coerce(&FieldValue::from(vec!["c", "a"]), &options)
            .unwrap();
        assert_eq!(state, ControlState::Choices(vec!["a".into(), "c".into()]));
    }

    #[test]
    fn list_checks_arity_and_element_kinds() {
        let kind = ValueKind::List(vec![ScalarKind::Int, ScalarKind::Int]);
        assert_eq!(
            kind.coerce(&FieldValue::from("1 2 3"), &[]),
            Err(CoercionError::Arity { expected: 2, found: 3 })
        );
        assert!(kind.coerce(&FieldValue::from(vec!["1", "x"]), &[]).is_err());
        assert_eq!(
            kind.coerce(&FieldValue::from(vec![1, 2]), &[]),
            Ok(ControlState::Entries(vec!["1".into(), "2".into()]))
        );
    }

    #[test]
    fn empty_controls_read_as_absent() {
        assert_eq!(ValueKind::Int.read(&ControlState::Text(String::new()), &[]), Ok(None));
        assert_eq!(ValueKind::Selection.read(&ControlState::Choice(None), &[]), Ok(None));
        assert!(ValueKind::Int.read(&ControlState::Text("x1".into()), &[]).is_err());
    }

    #[test]
    fn merged_tokens_by_membership() {
        let entries = vec![MergedBoolEntry::new("a", "X", ""), MergedBoolEntry::new("b", "Y", "")];
        assert_eq!(merged_tokens(&entries, &[true, false]), vec!["X"]);
        assert_eq!(
            resolve_merged_tokens(&entries, &["Y".to_string()]),
            Ok(vec![false, true])
        );
    }

    #[test]
    fn merged_tokens_by_position() {
        let entries = vec![MergedBoolEntry::new("a", "1", "0"), MergedBoolEntry::new("b", "1", "0")];
        assert_eq!(merged_tokens(&entries, &[true, false]), vec!["1", "0"]);
        let tokens = vec!["0".to_string(), "1".to_string()];
        assert_eq!(resolve_merged_tokens(&entries, &tokens), Ok(vec![false, true]));
        let bad = vec!["0".to_string(), "2".to_string()];
        assert!(matches!(
            resolve_merged_tokens(&entries, &bad),
            Err(CoercionError::TokenMismatch { .. })
        ));
    }
}
