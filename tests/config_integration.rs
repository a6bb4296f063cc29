//! Integration tests for configuration loading and connecting database links.

use pretty_assertions::assert_eq;
use sledgehammer::prelude::*;
use std::time::Duration;

#[test]
fn test_connect_registers_every_link() {
    let config = SledgeConfig::from_str(
        r#"
        [databases.default]
        url = "sqlite::memory:"

        [databases.reports]
        url = "sqlite::memory:"
        log_limit = 5

        [debug]
        slow_query_threshold = 250
        "#,
    )
    .unwrap();

    let databases = sledgehammer::connect(&config).unwrap();
    assert_eq!(databases.links(), vec!["default", "reports"]);

    let reports = databases.get("reports").unwrap();
    assert_eq!(reports.settings().log_limit, 5);
    assert_eq!(
        reports.settings().slow_query_threshold,
        Duration::from_millis(250)
    );
    assert_eq!(reports.driver_name(), "sqlite");
}

#[test]
fn test_connect_rejects_other_drivers() {
    let config = SledgeConfig::from_str(
        r#"
        [databases.default]
        url = "postgres://localhost/app"
        "#,
    )
    .unwrap();

    let err = sledgehammer::connect(&config).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    assert!(err.message.contains("default"));
}

#[test]
fn test_file_database_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("app.db");
    let config_path = dir.path().join("sledge.toml");
    std::fs::write(
        &config_path,
        format!(
            "[databases.default]\nurl = \"sqlite://{}\"\n",
            db_path.display()
        ),
    )
    .unwrap();

    let config = SledgeConfig::from_file(&config_path).unwrap();
    {
        let databases = sledgehammer::connect(&config).unwrap();
        let db = databases.default_database().unwrap();
        db.query("CREATE TABLE notes (id INTEGER, body TEXT)").unwrap();
        db.query("INSERT INTO notes VALUES (1, 'first'), (2, 'second')")
            .unwrap();
    }

    let databases = sledgehammer::connect(&config).unwrap();
    let notes = DatabaseCollection::new(
        SqlBuilder::new().select("body").from("notes").unwrap(),
        &databases,
    )
    .where_(Conditions::all([("id", 2)]))
    .unwrap();
    assert_eq!(
        notes.get_query().unwrap().to_sql().unwrap(),
        "SELECT body FROM notes WHERE id = 2"
    );
    assert_eq!(
        notes.select("body", KeySelector::Reindex).unwrap().values().unwrap(),
        vec![Value::from("second")]
    );
}

#[test]
fn test_environment_override_before_connect() {
    let config = SledgeConfig::from_str(
        r#"
        [databases.default]
        url = "postgres://prod/app"

        [environments.test.databases.default]
        url = "sqlite::memory:"

        [environments.test.debug]
        log_queries = false
        "#,
    )
    .unwrap()
    .with_environment("test");

    let databases = sledgehammer::connect(&config).unwrap();
    let db = databases.default_database().unwrap();
    db.query("SELECT 1").unwrap();
    assert!(db.last_query().is_none());
}

#[test]
fn test_missing_config_file() {
    let err = SledgeConfig::from_file("/nonexistent/sledge.toml").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
}

#[test]
fn test_init_logging_validates_debug_section() {
    let config = SledgeConfig::from_str("[debug]\nlog_format = \"xml\"\n").unwrap();
    let err = sledgehammer::init_logging(&config).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    assert!(err.message.contains("xml"));

    let config = SledgeConfig::from_str("[debug]\nlog_format = \"compact\"\n").unwrap();
    assert!(sledgehammer::init_logging(&config).is_ok());
}
