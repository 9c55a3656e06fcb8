//! `YamlConfigStore` tests against a temporary config file.
//!
//! These tests mutate `AMIBAKE_CONFIG` and are serialized with `serial_test`.

#![allow(clippy::expect_used, clippy::unwrap_used, unsafe_code)]

use amibake_cli::application::ports::ConfigStore;
use amibake_cli::application::services::config_service;
use amibake_cli::domain::{ConfigError, DeviceWait};
use amibake_cli::infra::config::{CONFIG_ENV, YamlConfigStore};
use serial_test::serial;
use tempfile::TempDir;

fn point_at_temp_config() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("nested").join("config.yaml");
    // SAFETY: every test touching CONFIG_ENV is #[serial].
    unsafe { std::env::set_var(CONFIG_ENV, &path) };
    (dir, path)
}

#[test]
#[serial]
fn missing_file_yields_defaults_without_creating_it() {
    let (_dir, path) = point_at_temp_config();
    let config = YamlConfigStore.load().unwrap();
    assert_eq!(config.build_host.image_id, "ami-2d18e35a");
    assert_eq!(config.volume.device, "/dev/sdh");
    assert_eq!(config.image.kernel_id, "aki-52a34525");
    assert!(!path.exists());
    assert_eq!(YamlConfigStore.path().unwrap(), path);
}

#[test]
#[serial]
fn set_value_persists_and_reloads() {
    let (_dir, path) = point_at_temp_config();
    config_service::set_config_value(&YamlConfigStore, "volume.size_gib", "4").unwrap();
    config_service::set_config_value(&YamlConfigStore, "volume.device_wait", "fixed").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("size_gib: 4"), "got:\n{content}");

    let config = YamlConfigStore.load().unwrap();
    assert_eq!(config.volume.size_gib, 4);
    assert_eq!(config.volume.device_wait, DeviceWait::Fixed);
    assert_eq!(config.build_host.instance_type, "t1.micro");
}

#[cfg(unix)]
#[test]
#[serial]
fn saved_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, path) = point_at_temp_config();
    config_service::set_config_value(&YamlConfigStore, "image.name_prefix", "site").unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
#[serial]
fn invalid_value_leaves_file_untouched() {
    let (_dir, path) = point_at_temp_config();
    let err = config_service::set_config_value(&YamlConfigStore, "volume.size_gib", "lots")
        .unwrap_err();
    assert!(err.downcast_ref::<ConfigError>().is_some(), "got {err:?}");
    assert!(!path.exists());
}

#[test]
#[serial]
fn empty_file_means_defaults() {
    let (_dir, path) = point_at_temp_config();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "\n").unwrap();
    let config = YamlConfigStore.load().unwrap();
    assert_eq!(config.polling.instance_timeout_secs, 600);
}

#[test]
#[serial]
fn malformed_yaml_is_an_error() {
    let (_dir, path) = point_at_temp_config();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "volume: [not, a, map\n").unwrap();
    let err = YamlConfigStore.load().unwrap_err();
    assert!(err.to_string().contains("cannot parse"), "got {err}");
}
