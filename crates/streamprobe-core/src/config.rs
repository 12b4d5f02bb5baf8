//! 애플리케이션 설정 구조체.
//!
//! 수집 서버 URL, 실험 ID, 샘플링 주기, 프로비저닝 대상 등
//! 런타임 설정을 정의한다. [`crate::config_manager::ConfigManager`]가 JSON 파일로 로드/저장한다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 수집 서버 URL 환경 변수
pub const ENV_SERVER_URL: &str = "STATS_SERVER_URL";

/// 실험 ID 환경 변수
pub const ENV_EXPERIMENT_ID: &str = "EXPERIMENT_ID";

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 수집 서버 설정
    pub server: ServerConfig,
    /// 실험 설정
    pub experiment: ExperimentConfig,
    /// 플레이어 계측 설정
    #[serde(default)]
    pub player: PlayerConfig,
    /// 문서 저장소 프로비저닝 설정
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// 수집 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 메트릭 제출 기본 URL (`{base_url}/api/submit`)
    pub base_url: String,
}

/// 실험 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// 실험 식별자 (세션 동안 고정)
    pub experiment_id: String,
    /// 계측 대상 프로토콜 리터럴
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

/// 플레이어 계측 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// 주기 샘플러 간격 (밀리초)
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// 초기화 직후 자동 재생
    #[serde(default = "default_true")]
    pub autoplay: bool,
    /// 상태 보드 로그 보관 줄 수
    #[serde(default = "default_status_log_capacity")]
    pub status_log_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            autoplay: true,
            status_log_capacity: default_status_log_capacity(),
        }
    }
}

/// 문서 저장소 프로비저닝 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// 논리 DB 이름
    #[serde(default = "default_database")]
    pub database: String,
    /// 생성할 사용자 이름
    #[serde(default = "default_db_user")]
    pub username: String,
    /// 생성할 사용자 비밀번호
    #[serde(default = "default_db_user")]
    pub password: String,
    /// 메트릭 컬렉션 이름
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            username: default_db_user(),
            password: default_db_user(),
            collection: default_collection(),
        }
    }
}

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:8000".to_string(),
            },
            experiment: ExperimentConfig {
                experiment_id: "default_experiment".to_string(),
                protocol: default_protocol(),
            },
            player: PlayerConfig::default(),
            provisioning: ProvisioningConfig::default(),
        }
    }

    /// 조회 함수로 `STATS_SERVER_URL`, `EXPERIMENT_ID` 오버라이드 적용 (빈 값은 무시)
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.trim().is_empty()) {
            self.server.base_url = url;
        }
        if let Some(id) = lookup(ENV_EXPERIMENT_ID).filter(|v| !v.trim().is_empty()) {
            self.experiment.experiment_id = id;
        }
    }

    /// 주기 샘플러 간격을 Duration으로 반환
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.player.sample_interval_ms)
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_protocol() -> String {
    crate::models::metric::DEFAULT_PROTOCOL.to_string()
}

fn default_sample_interval_ms() -> u64 {
    5_000
}

fn default_status_log_capacity() -> usize {
    100
}

fn default_database() -> String {
    "testbed".to_string()
}

fn default_db_user() -> String {
    "starlink".to_string()
}

fn default_collection() -> String {
    "metrics".to_string()
}
