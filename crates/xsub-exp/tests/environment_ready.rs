use std::collections::BTreeMap;

use tempfile::tempdir;
use xsub_core::errors::XsubError;
use xsub_exp::{EnvironmentConfig, EnvironmentProvisioner, FsEnvironment, STORAGE_ROOT_VAR};

#[test]
fn default_environment_is_ready() {
    let env = FsEnvironment::new(EnvironmentConfig::default());
    env.ensure_ready().expect("ready");
    assert!(env.child_env().is_empty());
}

#[test]
fn cache_dirs_are_created_under_storage_root() {
    let dir = tempdir().expect("tmp dir");
    let absolute = dir.path().join("abs-cache");
    let env = FsEnvironment::new(EnvironmentConfig {
        storage_root: Some(dir.path().to_path_buf()),
        cache_dirs: vec!["cache/torch".into(), absolute.clone()],
        variables: BTreeMap::from([("TORCH_HOME".to_string(), "/scratch/torch".to_string())]),
    });
    env.ensure_ready().expect("ready");
    assert!(dir.path().join("cache/torch").is_dir());
    assert!(absolute.is_dir());

    let child = env.child_env();
    assert_eq!(child["TORCH_HOME"], "/scratch/torch");
    assert_eq!(child[STORAGE_ROOT_VAR], dir.path().display().to_string());
}

#[test]
fn check_only_environment_creates_nothing() {
    let dir = tempdir().expect("tmp dir");
    let env = FsEnvironment::new(EnvironmentConfig {
        storage_root: Some(dir.path().to_path_buf()),
        cache_dirs: vec!["cache/torch".into()],
        ..EnvironmentConfig::default()
    })
    .check_only();
    env.ensure_ready().expect("ready");
    assert!(!dir.path().join("cache").exists());

    let missing = FsEnvironment::new(EnvironmentConfig {
        storage_root: Some(dir.path().join("not-mounted")),
        ..EnvironmentConfig::default()
    })
    .check_only();
    assert_eq!(
        missing.ensure_ready().expect_err("missing root").info().code,
        "storage_root_missing"
    );
}

#[test]
fn missing_storage_root_is_an_environment_error() {
    let dir = tempdir().expect("tmp dir");
    let env = FsEnvironment::new(EnvironmentConfig {
        storage_root: Some(dir.path().join("not-mounted")),
        ..EnvironmentConfig::default()
    });
    let err = env.ensure_ready().expect_err("missing root");
    assert!(matches!(err, XsubError::Environment(_)));
    assert_eq!(err.info().code, "storage_root_missing");
}

#[test]
fn invalid_variable_names_are_rejected() {
    let env = FsEnvironment::new(EnvironmentConfig {
        variables: BTreeMap::from([("A=B".to_string(), "x".to_string())]),
        ..EnvironmentConfig::default()
    });
    assert_eq!(
        env.ensure_ready().expect_err("bad name").info().code,
        "variable_name_invalid"
    );
}
