use std::path::Path;

use sesh_core::Value;
use sesh_runner::{Config, Session};
use sesh_store::{FileStore, Store, StoreError};

fn config_in(dir: &Path) -> Config {
    Config::new(dir.join("state.json"))
}

/// Open, run, drop: one full process invocation.
fn invoke(cfg: &Config, code: &str) -> anyhow::Result<()> {
    let session = Session::open(cfg)?;
    session.run(code)
}

fn stored_env(cfg: &Config) -> sesh_core::Environment {
    FileStore::new(cfg.state_file.clone()).load().unwrap()
}

#[test]
fn first_invocation_starts_from_an_empty_environment() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());

    invoke(&cfg, "x = 5").unwrap();

    let env = stored_env(&cfg);
    assert_eq!(env.len(), 1);
    assert_eq!(env.get("x"), Some(&Value::Int(5)));
}

#[test]
fn bindings_survive_and_mutate_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());

    invoke(&cfg, "x = 5").unwrap();
    invoke(&cfg, "x = x + 1").unwrap();

    assert_eq!(stored_env(&cfg).get("x"), Some(&Value::Int(6)));
}

#[test]
fn deletions_persist_too() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());

    invoke(&cfg, "x = 1\ny = 2").unwrap();
    invoke(&cfg, "del x").unwrap();

    let env = stored_env(&cfg);
    assert!(!env.contains("x"));
    assert_eq!(env.get("y"), Some(&Value::Int(2)));
}

#[test]
fn execution_error_does_not_persist_partial_mutations() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());

    invoke(&cfg, "x = 1").unwrap();
    // The first statement mutates, the second fails; nothing may be saved.
    invoke(&cfg, "x = 2\nboom").unwrap_err();

    assert_eq!(stored_env(&cfg).get("x"), Some(&Value::Int(1)));
}

#[test]
fn corrupt_snapshot_aborts_before_executing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());
    std::fs::write(&cfg.state_file, b"garbage").unwrap();

    let err = invoke(&cfg, "x = 1").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::CorruptSnapshot { .. })
    ));
    // The bad snapshot is reported, never overwritten.
    assert_eq!(std::fs::read(&cfg.state_file).unwrap(), b"garbage");
}

#[test]
fn unserializable_binding_fails_the_save_and_keeps_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());

    invoke(&cfg, "x = 1").unwrap();
    let before = std::fs::read(&cfg.state_file).unwrap();

    let err = invoke(&cfg, "f = len").unwrap_err();
    match err.downcast_ref::<StoreError>() {
        Some(StoreError::UnserializableValue { name, .. }) => assert_eq!(name, "f"),
        other => panic!("expected an unserializable-value error, got {:?}", other),
    }

    assert_eq!(std::fs::read(&cfg.state_file).unwrap(), before);
}

#[test]
fn lenient_session_skips_what_it_cannot_keep() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config_in(dir.path());
    cfg.lenient = true;

    invoke(&cfg, "x = 1\nf = len").unwrap();

    let env = stored_env(&cfg);
    assert_eq!(env.get("x"), Some(&Value::Int(1)));
    assert!(!env.contains("f"));
}

#[test]
fn concurrent_open_is_refused_while_the_lock_is_held() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());

    let held = Session::open(&cfg).unwrap();
    let err = Session::open(&cfg).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::SessionLocked { .. })
    ));

    drop(held);
    Session::open(&cfg).unwrap();
}

#[test]
fn lock_is_released_after_a_failed_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path());

    invoke(&cfg, "boom").unwrap_err();
    invoke(&cfg, "x = 1").unwrap();
}
