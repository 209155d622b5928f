use std::path::Path;

use tablespec_core::{ColumnType, DefaultValue, ResolveError, SchemaTag};
use tablespec_db::{LoadError, ProjectConfig, SourceKind, Workspace};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn write_sources(dir: &Path) {
    write(
        dir,
        "setup.json",
        r#"{
            "actions": {"execute": "create", "create": ["CANOTA", "STATUS"], "delete": ["CANOTA"]},
            "db": {"name": "sales"},
            "tables": [
                {"name": "CANOTA", "schema": "sales", "id_fields": ["id_corte"]},
                {"name": "STATUS", "schema": "sales"},
                {"name": "AUDIT", "schema": "sales",
                 "additional_columns": [{"name": "at", "type": "TEXT", "default": "CURRENT_TIMESTAMP"}],
                 "skip_columns": ["amount"]}
            ]
        }"#,
    );
    write(
        dir,
        "data_tables_schemas.json",
        r#"{
            "schemas": {
                "common": {"columns": [{"name": "id_corte", "type": "INTEGER", "pk": true}]},
                "options": ["sales", "stock"],
                "sales": {"columns": [{"name": "amount", "type": "REAL"}]},
                "draft": {"columns": [{"name": "ignored"}]}
            }
        }"#,
    );
    write(
        dir,
        "helpers.json",
        r#"{"schemas": {"tables": {"STATUS": {
            "columns": [{"name": "code", "type": "TEXT", "pk": true}],
            "values": [{"code": "A"}]
        }}}}"#,
    );
}

// ---------------------------------------------------------------------------
// Config file
// ---------------------------------------------------------------------------

#[test]
fn test_config_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tablespec.yml");

    let config = ProjectConfig {
        helper_schemas: Some("helpers.json".into()),
        busy_timeout_ms: Some(250),
        ..ProjectConfig::default()
    };
    config.save(&path).unwrap();

    let loaded = ProjectConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tablespec.yml", "registry: [unterminated");

    let err = Workspace::from_config_file(dir.path().join("tablespec.yml")).unwrap_err();
    assert!(matches!(err, LoadError::Yaml(_)));
}

// ---------------------------------------------------------------------------
// Workspace loading
// ---------------------------------------------------------------------------

#[test]
fn test_workspace_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path());
    write(
        dir.path(),
        "tablespec.yml",
        "helper_schemas: helpers.json\nbusy_timeout_ms: 500\n",
    );

    let workspace = Workspace::from_config_file(dir.path().join("tablespec.yml")).unwrap();
    assert!(workspace.issues().is_empty());
    assert_eq!(
        workspace.busy_timeout(),
        Some(std::time::Duration::from_millis(500))
    );
    assert_eq!(workspace.database_file(), dir.path().join("sales.db"));

    let registry = workspace.registry();
    assert_eq!(registry.action(), Some("create"));
    assert_eq!(registry.table_list("create"), ["CANOTA", "STATUS"]);
    assert_eq!(registry.table_list("delete"), ["CANOTA"]);
    assert!(registry.table_list("rebuild").is_empty());

    let store = workspace.store();
    assert!(store.data_schema("sales").is_some());
    // "stock" is listed but not defined; "draft" is defined but not listed.
    assert!(store.data_schema("stock").is_none());
    assert!(store.data_schema("draft").is_none());
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path());

    let workspace = Workspace::from_config_file(dir.path().join("tablespec.yml")).unwrap();
    assert!(workspace.issues().is_empty());
    // Helper catalog is disabled by default, so STATUS resolves as a data table.
    let spec = workspace.resolver().resolve("STATUS").unwrap();
    assert_eq!(spec.schema, SchemaTag::Variant("sales".into()));
}

#[test]
fn test_missing_registry_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path());
    std::fs::remove_file(dir.path().join("setup.json")).unwrap();

    let workspace = Workspace::from_config_file(dir.path().join("tablespec.yml")).unwrap();
    assert_eq!(workspace.issues().len(), 1);
    assert_eq!(workspace.issues()[0].source, SourceKind::Registry);
    assert_eq!(workspace.registry().action(), None);
    assert_eq!(
        workspace.resolver().resolve("CANOTA").unwrap_err(),
        ResolveError::UnknownTable("CANOTA".into())
    );
}

// ---------------------------------------------------------------------------
// Resolution over loaded files
// ---------------------------------------------------------------------------

#[test]
fn test_resolution_from_loaded_files() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path());
    write(dir.path(), "tablespec.yml", "helper_schemas: helpers.json\n");

    let workspace = Workspace::from_config_file(dir.path().join("tablespec.yml")).unwrap();
    let resolver = workspace.resolver();

    let canota = resolver.resolve("CANOTA").unwrap();
    assert_eq!(canota.id_fields, vec!["id_corte".to_string()]);
    let names: Vec<&str> = canota.table_columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id_corte", "amount"]);

    let status = resolver.resolve("STATUS").unwrap();
    assert!(status.is_helper());
    assert_eq!(status.values.len(), 1);

    let audit = resolver.resolve("AUDIT").unwrap();
    let names: Vec<&str> = audit.table_columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id_corte", "at"]);
    assert_eq!(audit.table_columns[1].column_type, ColumnType::Text);
    assert_eq!(
        audit.table_columns[1].default,
        Some(DefaultValue::CurrentTimestamp)
    );
}

#[test]
fn test_metadata_keys_do_not_discard_sources() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "setup.json",
        r#"{
            "actions": {"execute": "create", "note": "x", "create": ["CANOTA"]},
            "tables": [{"name": "CANOTA", "schema": "sales"}]
        }"#,
    );
    write(
        dir.path(),
        "data_tables_schemas.json",
        r#"{
            "schemas": {
                "version": "2",
                "common": {"columns": [{"name": "id_corte", "type": "INTEGER", "pk": true}]},
                "options": ["sales"],
                "sales": {"columns": [{"name": "amount", "type": "REAL"}]}
            }
        }"#,
    );

    let workspace = Workspace::load(&ProjectConfig::default().resolve_paths(dir.path()));
    assert!(workspace.issues().is_empty(), "{:?}", workspace.issues());
    assert_eq!(workspace.registry().table_list("create"), ["CANOTA"]);
    let spec = workspace.resolver().resolve("CANOTA").unwrap();
    assert_eq!(spec.table_columns.len(), 2);
}
