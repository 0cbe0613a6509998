//! Integration tests for layered schema loading:
//! - base + overlays read from disk and merged in order
//! - JSON and TOML strategies selected from the file extension
//! - empty overlay files are no-ops

use std::fs;
use std::path::{Path, PathBuf};

use form_config::{ConfigError, ConfigLoader, ParserKind};
use pretty_assertions::assert_eq;
use serde_json::json;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

#[test]
fn base_and_overlays_merge_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = write(
        dir.path(),
        "base.json",
        r#"{
            "tabs": ["Domain"],
            "frames": [{"name": "f1", "tab": "Domain"}],
            "inputwidgets": [{"name": "nx", "inputtype": "int", "defaultval": 8}]
        }"#,
    );
    let first = write(
        dir.path(),
        "first.json",
        r#"{"frames": [{"name": "f1", "title": "Mesh"}], "tabs": ["Physics"]}"#,
    );
    let second = write(
        dir.path(),
        "second.json",
        r#"{"inputwidgets": [{"name": "nx", "defaultval": 16}, {"name": "ny", "inputtype": "int"}]}"#,
    );

    let loader = ConfigLoader::new(ParserKind::from_path(&base).unwrap().parser());
    let merged = loader.load(&base, &[first, second]).expect("load");

    assert_eq!(
        merged,
        json!({
            "tabs": ["Domain", "Physics"],
            "frames": [{"name": "f1", "tab": "Domain", "title": "Mesh"}],
            "inputwidgets": [
                {"name": "nx", "inputtype": "int", "defaultval": 16},
                {"name": "ny", "inputtype": "int"}
            ]
        })
    );
}

#[test]
fn toml_documents_load_into_typed_sections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = write(
        dir.path(),
        "base.toml",
        r#"
tabs = ["Domain"]

[[inputwidgets]]
name = "use_mesh"
inputtype = "bool"
defaultval = true

[[inputwidgets.ctrlelem]]
target = "nx"

[[inputwidgets]]
name = "nx"
inputtype = "int"
defaultval = 8
"#,
    );
    let empty = write(dir.path(), "empty.toml", "");

    let loader = ConfigLoader::new(ParserKind::from_path(&base).unwrap().parser());
    assert_eq!(loader.parser_name(), "toml");
    let doc = loader.load_document(&base, &[empty]).expect("load document");

    assert_eq!(doc.tabs, vec!["Domain".to_string()]);
    assert_eq!(doc.inputwidgets.len(), 2);
    assert_eq!(doc.inputwidgets[0].ctrlelem[0].target, "nx");
    assert_eq!(doc.inputwidgets[1].defaultval, Some(json!(8)));
}

#[test]
fn missing_file_reports_path() {
    let loader = ConfigLoader::new(ParserKind::Json.parser());
    let err = loader
        .load::<&Path>(Path::new("/definitely/not/here.json"), &[])
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
