use super::settings::Settings;
use super::{RouteSettings, load_config_from};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_config(dir: &TempDir, toml: &str) -> PathBuf {
    fs::write(dir.path().join("default.toml"), toml).expect("write config file");
    dir.path().join("default")
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 3001);
    assert_eq!(settings.server.allowed_origins, vec!["*"]);
    assert_eq!(settings.server.bind_addr(), "0.0.0.0:3001");
    assert_eq!(settings.relay.max_connections, 1000);
    assert_eq!(
        settings.relay.routes,
        vec![RouteSettings {
            inbound: "quiz_elapsed".to_string(),
            outbound: "mentor_elapsed".to_string(),
        }]
    );
    assert_eq!(settings.logging.level, "info");
    assert!(!settings.logging.json);
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    let cfg = load_config_from(Path::new("does/not/exist")).expect("load_config failed");
    assert_eq!(cfg.server.port, 3001);
    assert_eq!(cfg.relay.routes.len(), 1);
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = write_config(
        &tmp,
        r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            allowed_origins = ["http://localhost:8000"]

            [relay]
            max_connections = 10

            [[relay.routes]]
            inbound = "quiz_elapsed"
            outbound = "mentor_elapsed"

            [[relay.routes]]
            inbound = "quiz_finished"
            outbound = "mentor_finished"

            [logging]
            level = "debug"
            json = true
        "#,
    );

    let cfg = load_config_from(&path).expect("load_config failed");
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.allowed_origins, vec!["http://localhost:8000"]);
    assert_eq!(cfg.relay.max_connections, 10);
    assert_eq!(cfg.relay.routes.len(), 2);
    assert_eq!(cfg.relay.routes[1].outbound, "mentor_finished");
    assert_eq!(cfg.logging.level, "debug");
    assert!(cfg.logging.json);
}

#[test]
#[serial]
fn partial_file_keeps_remaining_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = write_config(
        &tmp,
        r#"
            [server]
            port = 4100
        "#,
    );

    let cfg = load_config_from(&path).expect("load_config failed");
    assert_eq!(cfg.server.port, 4100);
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.allowed_origins, vec!["*"]);
    assert_eq!(cfg.relay.max_connections, 1000);
    assert_eq!(cfg.logging.level, "info");
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = write_config(
        &tmp,
        r#"
            [server]
            port = 9000
        "#,
    );

    temp_env::with_vars(
        [
            ("RELAY__SERVER__PORT", Some("4000")),
            (
                "RELAY__SERVER__ALLOWED_ORIGINS",
                Some("http://a.test,http://b.test"),
            ),
            ("RELAY__RELAY__MAX_CONNECTIONS", Some("2")),
        ],
        || {
            let cfg = load_config_from(&path).expect("load_config failed");
            assert_eq!(cfg.server.port, 4000);
            assert_eq!(
                cfg.server.allowed_origins,
                vec!["http://a.test", "http://b.test"]
            );
            assert_eq!(cfg.relay.max_connections, 2);
        },
    );
}

#[test]
#[serial]
fn invalid_value_is_an_error() {
    temp_env::with_var("RELAY__SERVER__PORT", Some("not-a-port"), || {
        assert!(load_config_from(Path::new("does/not/exist")).is_err());
    });
}
