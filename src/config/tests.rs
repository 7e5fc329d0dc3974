use std::env;
use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use super::load_config;
use super::settings::Settings;

/// Run `f` with the current dir set to a fresh temp dir holding `files`.
fn in_temp_dir<F: FnOnce()>(files: &[(&str, &str)], f: F) {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");
    for (path, contents) in files {
        if let Some(parent) = std::path::Path::new(path).parent() {
            fs::create_dir_all(parent).expect("create config dir");
        }
        fs::write(path, contents).expect("write config file");
    }
    f();
    env::set_current_dir(orig).expect("restore cwd");
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.wait.default_timeout_ms, 5000);
    assert_eq!(settings.hits.ga4.include, r"google.*collect\?v=2");
    assert_eq!(settings.hits.ga3.exclude.len(), 2);
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    in_temp_dir(&[], || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg, Settings::default());
    });
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let toml = r#"
        [wait]
        default_timeout_ms = 1500

        [hits.ga4]
        include = "analytics\\.example\\.com/g/collect"

        [logging]
        level = "debug"
    "#;
    in_temp_dir(&[("config/default.toml", toml)], || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.wait.default_timeout_ms, 1500);
        assert_eq!(cfg.hits.ga4.include, r"analytics\.example\.com/g/collect");
        // untouched parts keep their defaults
        assert_eq!(cfg.hits.ga4.exclude, Settings::default().hits.ga4.exclude);
        assert_eq!(cfg.hits.ga3, Settings::default().hits.ga3);
        assert_eq!(cfg.logging.level, "debug");
    });
}

#[test]
#[serial]
fn load_config_env_overrides_file() {
    let toml = r#"
        [wait]
        default_timeout_ms = 1500
    "#;
    in_temp_dir(&[("config/default.toml", toml)], || {
        temp_env::with_vars(
            [
                ("PAGESUB_WAIT__DEFAULT_TIMEOUT_MS", Some("250")),
                ("PAGESUB_LOGGING__LEVEL", Some("warn")),
            ],
            || {
                let cfg = load_config().expect("load_config failed");
                assert_eq!(cfg.wait.default_timeout_ms, 250);
                assert_eq!(cfg.logging.level, "warn");
            },
        );
    });
}
