//! # streamprobe-app
//!
//! `streamprobe` 실행 파일의 명령 구현.
//!
//! - [`replay`]: 트레이스 재생 + 메트릭 전송
//! - [`provisioning`]: 문서 저장소 프로비저닝
//! - [`lifecycle`]: 종료 신호
//! - [`tally`]: 전송 레코드 집계

pub mod lifecycle;
pub mod provisioning;
pub mod replay;
pub mod tally;

use streamprobe_core::config::AppConfig;

/// 명령줄에서 덮어쓰는 설정값
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub experiment: Option<String>,
    pub sample_interval_ms: Option<u64>,
}

impl ConfigOverrides {
    /// 지정된 값만 덮어쓴 설정 반환
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(server) = &self.server {
            config.server.base_url = server.clone();
        }
        if let Some(experiment) = &self.experiment {
            config.experiment.experiment_id = experiment.clone();
        }
        if let Some(ms) = self.sample_interval_ms {
            config.player.sample_interval_ms = ms;
        }
        config
    }
}
