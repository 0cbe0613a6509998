use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "formctl",
    version,
    about = "Load a form schema, fill it in and export its values"
)]
pub struct Cli {
    /// Schema document (.json or .toml)
    #[arg(long, value_name = "FILE")]
    pub schema: PathBuf,

    /// Overlay merged onto the schema, in the order given
    #[arg(long = "overlay", value_name = "FILE")]
    pub overlays: Vec<PathBuf>,

    /// Set a field before exporting (text is parsed by the field's kind)
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    pub assignments: Vec<(String, String)>,

    /// Add a record to a collection, given as a JSON object of field values
    #[arg(long = "record", value_name = "COLLECTION=JSON", value_parser = parse_assignment)]
    pub records: Vec<(String, String)>,

    /// Press a button, after all assignments
    #[arg(long = "press", value_name = "BUTTON")]
    pub buttons: Vec<String>,

    /// Export by output tag instead of by field name
    #[arg(long)]
    pub tag: Option<String>,

    /// Include disabled and empty fields in a tagged export. Collection
    /// records always export their active fields only
    #[arg(long, requires = "tag")]
    pub all: bool,

    /// Print the help text stored under this tag instead of values
    #[arg(long, value_name = "TAG", requires = "tag")]
    pub help_tag: Option<String>,

    /// Print the merged schema document and exit
    #[arg(long)]
    pub print_merged: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    let (field, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{arg}`"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in `{arg}`"));
    }
    Ok((field.to_string(), value.to_string()))
}
