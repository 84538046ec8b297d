//! Connection manager and configuration tests.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use skysync::cli::commands::load_config;
use skysync::config::ConfigOverrides;
use skysync::manifest::InitEtcdSpec;
use skysync::{ConnError, ConnState, ConnectionManager, ConnectionSettings, MemoryKv};

use common::{cert_dir, create_config};

// ============================================================================
// initialize
// ============================================================================

#[tokio::test]
async fn initialize_with_missing_cert_dir_fails_with_cert_load() {
    let manager = ConnectionManager::new();
    let settings = ConnectionSettings::new(
        vec!["127.0.0.1:2379".to_string()],
        "/nonexistent/skysync/pki",
    );

    let err = manager.initialize(&settings).await.unwrap_err();
    match err {
        ConnError::CertLoad { path, .. } => {
            assert!(path.ends_with("healthcheck-client.crt"));
        }
        other => panic!("expected CertLoad, got {:?}", other),
    }
    assert_eq!(manager.check_ready().await, Err(ConnError::NotInitialized));
}

#[tokio::test]
async fn initialize_with_missing_ca_fails_with_cert_load() {
    let dir = cert_dir();
    std::fs::remove_file(dir.path().join("ca.crt")).unwrap();

    let manager = ConnectionManager::new();
    let settings = ConnectionSettings::new(vec!["127.0.0.1:2379".to_string()], dir.path());

    match manager.initialize(&settings).await {
        Err(ConnError::CertLoad { path, .. }) => assert!(path.ends_with("ca.crt")),
        other => panic!("expected CertLoad, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_initialize_keeps_previous_handle() {
    let manager = ConnectionManager::new();
    let kv = Arc::new(MemoryKv::new());
    manager.install(kv);

    let dir = cert_dir();
    let settings = ConnectionSettings::from_init_conf("", dir.path());

    let err = manager.initialize(&settings).await.unwrap_err();
    assert!(matches!(err, ConnError::Dial { .. }));

    let handle = manager.handle().unwrap();
    assert_eq!(handle.generation(), 1);
    assert_eq!(handle.backend().name(), "memory");
    assert_eq!(manager.check_ready().await, Ok(true));
}

#[tokio::test]
async fn init_etcd_spec_flows_into_settings() {
    let dir = cert_dir();
    let spec = InitEtcdSpec {
        init_conf: " , ".to_string(),
        cert_dir: dir.path().display().to_string(),
    };

    let settings = spec.connection_settings();
    assert!(settings.endpoints.is_empty());

    let manager = ConnectionManager::new();
    assert!(matches!(
        manager.initialize(&settings).await,
        Err(ConnError::Dial { .. })
    ));
}

// ============================================================================
// Handle replacement
// ============================================================================

#[tokio::test]
async fn handle_taken_before_replacement_keeps_working() {
    use skysync::RecordStore;

    let manager = ConnectionManager::new();
    let old = Arc::new(MemoryKv::new());
    manager.install(old.clone());

    let held = manager.ready_handle().await.unwrap();
    let replacement = Arc::new(MemoryKv::with_state(ConnState::Connecting));
    manager.install(replacement);

    assert!(manager.ready_handle().await.is_err());

    let store = RecordStore::new(held, Duration::from_secs(1));
    store.put("/skydns/a/", b"v").await.unwrap();
    assert_eq!(old.peek("/skydns/a/"), Some(b"v".to_vec()));
}

#[tokio::test]
async fn not_ready_error_names_the_state() {
    let manager = ConnectionManager::new();
    manager.install(Arc::new(MemoryKv::with_state(ConnState::Shutdown)));

    let err = manager.check_ready().await.unwrap_err();
    assert!(err.is_readiness_failure());
    assert_eq!(err.to_string(), "client connection not ready: SHUTDOWN");
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn load_config_applies_overrides() {
    let file = create_config(
        r#"
[etcd]
endpoints = ["10.0.0.1:2379"]
cert_dir = "/etc/kubernetes/pki/etcd"
request_timeout_ms = 2500

[telemetry]
log_level = "warn"
"#,
    );

    let config = load_config(
        file.path(),
        &ConfigOverrides {
            log_level: None,
            endpoints: Some("10.0.0.2:2379, 10.0.0.3:2379".to_string()),
            cert_dir: Some("/tmp/pki".to_string()),
        },
    )
    .unwrap();

    assert_eq!(config.etcd.endpoints, vec!["10.0.0.2:2379", "10.0.0.3:2379"]);
    assert_eq!(config.etcd.request_timeout(), Duration::from_millis(2500));
    assert_eq!(config.telemetry.log_level, "warn");

    let settings = config.etcd.connection_settings();
    assert_eq!(settings.cert_dir, Path::new("/tmp/pki"));
}

#[test]
fn load_config_rejects_blank_endpoint_override() {
    let file = create_config("[etcd]\nendpoints = [\"a:2379\"]\ncert_dir = \"/pki\"\n");
    let overrides = ConfigOverrides {
        endpoints: Some(" , ".to_string()),
        ..Default::default()
    };
    assert!(load_config(file.path(), &overrides).is_err());
}

#[test]
fn load_config_reports_missing_file() {
    let err = load_config(Path::new("/nonexistent/skysync.toml"), &ConfigOverrides::default())
        .unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
