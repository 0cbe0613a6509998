use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use form_config::{ConfigDocument, ConfigLoader, ParserKind};
use form_engine::{FieldValue, FormDocument, FormSchema, Record, SetOptions};
use indexmap::IndexMap;
use serde_json::Value;

use crate::cli::Cli;

/// Everything `formctl` does short of printing: load and merge the schema,
/// build the form, apply assignments, records and button presses, then export.
pub fn run(cli: &Cli) -> Result<Value> {
    let parser = ParserKind::from_path(&cli.schema)?.parser();
    let loader = ConfigLoader::new(parser);
    let merged = loader
        .load(&cli.schema, &cli.overlays)
        .wrap_err("failed to load schema")?;
    if cli.print_merged {
        return Ok(merged);
    }

    let document = ConfigDocument::from_value(merged)?;
    let schema = FormSchema::from_document(&document).wrap_err("invalid schema")?;
    let mut form = FormDocument::from_schema(&schema).wrap_err("invalid schema")?;

    for (field, text) in &cli.assignments {
        form.set(field, text.as_str(), SetOptions::default())
            .wrap_err_with(|| format!("cannot set `{field}`"))?;
    }
    for (collection, json) in &cli.records {
        let record: Record = serde_json::from_str(json)
            .wrap_err_with(|| format!("record for `{collection}` is not a JSON object"))?;
        let records = form
            .collection_mut(collection)
            .ok_or_else(|| eyre!("no collection named `{collection}`"))?;
        let key = records
            .add(record)
            .wrap_err_with(|| format!("cannot add record to `{collection}`"))?;
        tracing::debug!(%collection, %key, "record added");
    }
    for button in &cli.buttons {
        form.press(button)
            .wrap_err_with(|| format!("button `{button}` failed"))?;
    }

    let output = match (&cli.tag, &cli.help_tag) {
        (Some(tag), Some(help_tag)) => serde_json::to_value(form.help_by_tag(tag, help_tag))?,
        (Some(tag), None) => serde_json::to_value(export_tagged(&form, tag, !cli.all)?)?,
        (None, _) => serde_json::to_value(form.values())?,
    };

    let status = form.status();
    if !status.is_empty() {
        tracing::warn!(count = status.len(), "form reported recovered errors");
    }
    Ok(output)
}

/// Tagged fields of the form followed by every collection's tagged records.
/// `only_active` applies to the form's own fields; records always export
/// their active fields only.
fn export_tagged(form: &FormDocument, tag: &str, only_active: bool) -> Result<IndexMap<String, FieldValue>> {
    let mut out = form.project_by_tag(tag, only_active);
    for collection in form.collections() {
        let dumped = collection
            .dump_tagged(tag)
            .wrap_err_with(|| format!("cannot export collection `{}`", collection.name()))?;
        out.extend(dumped);
    }
    Ok(out)
}
