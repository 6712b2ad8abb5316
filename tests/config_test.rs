//! Configuration files feeding a bridge.

use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use bridge_core::config::{BridgeConfig, ConfigManager};
use bridge_core::constants::methods;
use bridge_core::execution::CommandArguments;
use bridge_core::test_helpers::{RecordingFlowLauncher, RecordingNotificationSink, ReplyCollector};
use bridge_core::MethodBridge;

#[test]
fn test_bridge_uses_configured_picker() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("bridge.toml"),
        r#"
pending_timeout_ms = 60000
spawn_deadline_tasks = false

[picker]
request_token = 2024
chooser_title = "Choose a photo"
"#,
    )
    .expect("write config");

    let manager = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
        .expect("config loads");
    assert_eq!(manager.config().pending_timeout(), Duration::from_secs(60));

    let launcher = Arc::new(RecordingFlowLauncher::new());
    let bridge = MethodBridge::from_config_manager(
        &manager,
        Arc::clone(&launcher) as _,
        Arc::new(RecordingNotificationSink::new()),
    )
    .expect("bridge builds");

    let replies = ReplyCollector::new();
    bridge.invoke(methods::PICK_IMAGE, CommandArguments::new(), replies.callback());

    let request = launcher.last_request().expect("picker launched");
    assert_eq!(request.request_token, 2024);
    assert!(bridge.slot().is_pending(2024));
    assert_eq!(bridge.continuations().pending_timeout(), Duration::from_secs(60));
}

#[test]
fn test_environment_overlay_applies() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("bridge.toml"), "pending_timeout_ms = 60000\n").expect("write base");
    fs::write(
        dir.path().join("bridge.production.toml"),
        "[dispatch]\nenable_history = false\n",
    )
    .expect("write overlay");

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "production")
            .expect("config loads");

    assert_eq!(manager.environment(), "production");
    assert_eq!(manager.config().pending_timeout_ms, 60_000);
    assert!(!manager.config().dispatch.enable_history);
    assert_eq!(manager.config().picker, BridgeConfig::default().picker);
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("bridge.toml"),
        "[picker]\ndata_type_filter = \"\"\n",
    )
    .expect("write config");

    let result = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
    assert!(result.is_err());
}
