//! 설정 파일 → 파이프라인 설정 와이어링 통합 테스트.

use std::sync::Arc;
use std::time::Duration;
use streamprobe_app::ConfigOverrides;
use streamprobe_core::config::AppConfig;
use streamprobe_core::config_manager::ConfigManager;
use streamprobe_network::http_sink::HttpMetricsSink;
use streamprobe_player::simulated::ScriptedEngineFactory;
use streamprobe_player::{MetricsPipeline, PipelineSettings};
use tempfile::TempDir;

#[test]
fn config_defaults_are_valid() {
    let config = AppConfig::default_config();

    assert!(!config.server.base_url.is_empty());
    assert!(!config.experiment.experiment_id.is_empty());
    assert_eq!(config.experiment.protocol, "dash");
    assert_eq!(config.sample_interval(), Duration::from_secs(5));
    assert!(config.player.status_log_capacity > 0);
}

#[test]
fn manager_creates_file_then_overrides_apply() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf").join("config.json");

    let manager = ConfigManager::with_path(path.clone()).unwrap();
    assert!(path.exists());

    let overrides = ConfigOverrides {
        experiment: Some("exp_cli".to_string()),
        ..Default::default()
    };
    let config = overrides.apply(manager.get());
    assert_eq!(config.experiment.experiment_id, "exp_cli");

    let settings = PipelineSettings::from_config(&config);
    assert_eq!(settings.experiment_id, "exp_cli");
    assert_eq!(settings.sample_interval, config.sample_interval());
}

#[test]
fn saved_config_is_reloaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let mut manager = ConfigManager::with_path(path.clone()).unwrap();
    manager.set("player.sample_interval_ms", "2500").unwrap();

    let reloaded = ConfigManager::with_path(path).unwrap();
    let settings = PipelineSettings::from_config(&reloaded.get());
    assert_eq!(settings.sample_interval, Duration::from_millis(2500));
}

#[tokio::test]
async fn pipeline_wires_from_config() {
    let config = AppConfig::default_config();
    let sink = Arc::new(HttpMetricsSink::new(&config.server.base_url).unwrap());
    let factory = Arc::new(ScriptedEngineFactory::new(vec![]));

    let mut pipeline = MetricsPipeline::new(
        PipelineSettings::from_config(&config),
        factory.clone(),
        None,
        sink,
    );
    pipeline.initialize("http://media.local/a.mpd");

    assert!(pipeline.is_active());
    assert!(pipeline.subscription_count() > 0);
    assert_eq!(factory.created().len(), 1);

    assert!(pipeline.teardown());
    assert!(factory.latest().unwrap().is_destroyed());
}
