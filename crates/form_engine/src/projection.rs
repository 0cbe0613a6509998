//! Export and import of field values keyed by an output tag rather than by
//! field name. This is the data interchange surface of a form.

use indexmap::IndexMap;

use crate::document::FormDocument;
use crate::field::SetOptions;
use crate::value::FieldValue;

impl FormDocument {
    fn tagged(&self, tag: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
        let tag = tag.to_string();
        self.fields.iter().enumerate().filter_map(move |(ix, field)| {
            let spec = field.spec();
            if spec.label_only {
                return None;
            }
            spec.output_key(&tag).map(|key| (ix, key))
        })
    }

    /// Output key to value for every field declaring `tag`. With
    /// `only_active`, disabled and empty fields are left out.
    pub fn project_by_tag(&self, tag: &str, only_active: bool) -> IndexMap<String, FieldValue> {
        self.tagged(tag)
            .filter(|(ix, _)| !only_active || self.is_active_index(*ix))
            .filter_map(|(ix, key)| Some((key.to_string(), self.get_index(ix)?)))
            .collect()
    }

    /// Force each value into the field whose output key for `tag` matches.
    /// Returns the entries no field claimed. Values that fail to coerce are
    /// reported and skipped.
    pub fn import_by_tag(
        &mut self,
        tag: &str,
        values: &IndexMap<String, FieldValue>,
    ) -> IndexMap<String, FieldValue> {
        let targets: IndexMap<String, usize> = self
            .tagged(tag)
            .map(|(ix, key)| (key.to_string(), ix))
            .collect();

        let mut unmatched = IndexMap::new();
        for (key, value) in values {
            match targets.get(key) {
                Some(&ix) => {
                    let _ = self.set_index(ix, value.clone(), SetOptions::forced());
                }
                None => {
                    unmatched.insert(key.clone(), value.clone());
                }
            }
        }
        tracing::debug!(tag, imported = values.len() - unmatched.len(), "tagged import");
        unmatched
    }

    /// Output key to the help text stored under `help_tag`, for every field
    /// declaring `output_tag`. Fields without help map to an empty string.
    pub fn help_by_tag(&self, output_tag: &str, help_tag: &str) -> IndexMap<String, String> {
        self.tagged(output_tag)
            .map(|(ix, key)| {
                let help = self.fields[ix].spec().tags.get(help_tag).cloned();
                (key.to_string(), help.unwrap_or_default())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::kind::ValueKind;
    use crate::schema::{FieldSpec, FormSchema, RuleDef};

    fn schema() -> FormSchema {
        FormSchema::new()
            .with_field(FieldSpec::label_only("intro", "Inputs").tag("amr", "intro"))
            .with_field(
                FieldSpec::new("use_max_level", ValueKind::Bool)
                    .default_value(true)
                    .rule(RuleDef::new("max_level"))
                    .tag("amr", "amr.use_max_level"),
            )
            .with_field(
                FieldSpec::new("max_level", ValueKind::Int)
                    .default_value(3)
                    .tag("amr", "amr.max_level")
                    .tag("help", "Finest refinement level"),
            )
            .with_field(FieldSpec::new("comment", ValueKind::String).tag("amr", "amr.comment"))
    }

    #[test]
    fn only_active_skips_disabled_and_empty_fields() {
        let mut doc = FormDocument::from_schema(&schema()).unwrap();
        assert_eq!(
            doc.project_by_tag("amr", true),
            IndexMap::from([
                ("amr.use_max_level".to_string(), FieldValue::Bool(true)),
                ("amr.max_level".to_string(), FieldValue::Int(3)),
            ])
        );

        doc.set("use_max_level", false, SetOptions::default()).unwrap();
        let active = doc.project_by_tag("amr", true);
        assert!(!active.contains_key("amr.max_level"));

        let all = doc.project_by_tag("amr", false);
        assert_eq!(all.get("amr.max_level"), Some(&FieldValue::Int(3)));
        assert_eq!(all.get("amr.comment"), Some(&FieldValue::from("")));
        assert!(!all.contains_key("intro"));
    }

    #[test]
    fn import_returns_unclaimed_entries() {
        let mut doc = FormDocument::from_schema(&schema()).unwrap();
        let input = IndexMap::from([
            ("amr.max_level".to_string(), FieldValue::from("5")),
            ("amr.unknown".to_string(), FieldValue::Int(1)),
        ]);
        let rest = doc.import_by_tag("amr", &input);
        assert_eq!(
            rest,
            IndexMap::from([("amr.unknown".to_string(), FieldValue::Int(1))])
        );
        assert_eq!(doc.get("max_level"), Some(FieldValue::Int(5)));
    }

    #[test]
    fn help_defaults_to_empty() {
        let doc = FormDocument::from_schema(&schema()).unwrap();
        assert_eq!(
            doc.help_by_tag("amr", "help"),
            IndexMap::from([
                ("amr.use_max_level".to_string(), String::new()),
                ("amr.max_level".to_string(), "Finest refinement level".to_string()),
                ("amr.comment".to_string(), String::new()),
            ])
        );
    }
}
