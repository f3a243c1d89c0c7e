use capturekit_config::{
    CaptureSettings, ConfigError, SettingsDiscovery, SettingsLoader, SettingsOverrides,
};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

const PREFIX: &str = "CAPTUREKIT_IT_";

fn loader(global: &TempDir, project: &TempDir) -> SettingsLoader {
    SettingsLoader::with_discovery(SettingsDiscovery::with_directories(
        Some(global.path().to_path_buf()),
        Some(project.path().to_path_buf()),
    ))
    .env_prefix(PREFIX)
}

fn clear_env() {
    for key in ["DATE_FORMAT", "DEBUG", "TIME_FORMAT", "MAX_RESOLUTION_STEPS"] {
        std::env::remove_var(format!("{PREFIX}{key}"));
    }
}

#[test]
#[serial]
fn test_defaults_when_nothing_is_configured() {
    clear_env();
    let global = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    let settings = loader(&global, &project)
        .load(&SettingsOverrides::default())
        .unwrap();
    assert_eq!(settings, CaptureSettings::default());
}

#[test]
#[serial]
fn test_project_file_overrides_global_file() {
    clear_env();
    let global = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    fs::write(
        global.path().join("settings.toml"),
        "date_format = \"DD/MM/YYYY\"\ntime_format = \"HH:mm\"\n",
    )
    .unwrap();
    fs::write(
        project.path().join("settings.yaml"),
        "date_format: YYYY.MM.DD\ndebug: true\n",
    )
    .unwrap();

    let settings = loader(&global, &project)
        .load(&SettingsOverrides::default())
        .unwrap();
    assert_eq!(settings.date_format, "YYYY.MM.DD");
    assert_eq!(settings.time_format, "HH:mm");
    assert!(settings.debug);
}

#[test]
#[serial]
fn test_env_overrides_files_and_cli_overrides_env() {
    clear_env();
    let global = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("settings.json"),
        r#"{"date_format": "from-file", "time_format": "from-file"}"#,
    )
    .unwrap();
    std::env::set_var(format!("{PREFIX}DATE_FORMAT"), "from-env");
    std::env::set_var(format!("{PREFIX}TIME_FORMAT"), "from-env");
    std::env::set_var(format!("{PREFIX}MAX_RESOLUTION_STEPS"), "12");

    let overrides = SettingsOverrides {
        time_format: Some("from-cli".to_string()),
        ..Default::default()
    };
    let settings = loader(&global, &project).load(&overrides).unwrap();
    clear_env();

    assert_eq!(settings.date_format, "from-env");
    assert_eq!(settings.time_format, "from-cli");
    assert_eq!(settings.max_resolution_steps, 12);
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    clear_env();
    let global = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("settings.toml"), "date_format = [unclosed").unwrap();

    let result = loader(&global, &project).load(&SettingsOverrides::default());
    assert!(matches!(result, Err(ConfigError::Settings { .. })));
}
