//! 재생 트레이스.
//!
//! JSON으로 기술된 시간순 엔진 알림을 스크립트 엔진에 재생한다.
//!
//! ```json
//! {
//!   "target": "http://media/manifest.mpd",
//!   "duration_secs": 60.0,
//!   "bitrates": [400000, 800000, 1600000],
//!   "events": [
//!     { "at_ms": 0,    "event": { "kind": "stream_initialized" } },
//!     { "at_ms": 1200, "event": { "kind": "playback_stalled" } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use streamprobe_core::error::CoreError;
use streamprobe_core::models::engine::{EngineEvent, PlaybackState};
use streamprobe_core::ports::player_engine::BitrateInfo;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::simulated::{bitrate_ladder, ScriptedEngine, SimulatedVideo};

/// 트레이스 한 단계
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// 재생 시작 기준 발행 시각 (ms)
    pub at_ms: u64,
    pub event: EngineEvent,
}

/// 재생 트레이스
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackTrace {
    /// 매니페스트 URL
    pub target: String,
    /// 미디어 길이 (초, 없으면 NaN 보고)
    #[serde(default)]
    pub duration_secs: Option<f64>,
    /// 비디오 품질 사다리 (bps)
    #[serde(default)]
    pub bitrates: Vec<u64>,
    #[serde(default)]
    pub events: Vec<TraceStep>,
}

impl PlaybackTrace {
    /// 파일에서 로드
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CoreError> {
        let trace: Self = serde_json::from_str(content)?;
        trace.validate()?;
        Ok(trace)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.target.trim().is_empty() {
            return Err(CoreError::validation("target", "비어 있음"));
        }
        if let Some(d) = self.duration_secs {
            if !d.is_finite() || d < 0.0 {
                return Err(CoreError::validation("duration_secs", "0 이상의 유한수여야 함"));
            }
        }
        for pair in self.events.windows(2) {
            if pair[1].at_ms < pair[0].at_ms {
                return Err(CoreError::validation(
                    "events",
                    format!("at_ms 역순: {} → {}", pair[0].at_ms, pair[1].at_ms),
                ));
            }
        }
        Ok(())
    }

    /// 마지막 단계까지의 시간
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.events.last().map(|s| s.at_ms).unwrap_or(0))
    }

    pub fn ladder(&self) -> Vec<BitrateInfo> {
        bitrate_ladder(&self.bitrates)
    }

    /// 트레이스 길이를 가진 시뮬레이션 비디오
    pub fn video(&self) -> SimulatedVideo {
        SimulatedVideo::new(self.duration_secs)
    }
}

/// 재생 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// 발행한 단계 수
    pub steps: usize,
    /// 호출된 핸들러 수 합계
    pub deliveries: usize,
    /// 종료 신호로 중단됨
    pub interrupted: bool,
}

/// 트레이스 재생
///
/// 각 단계 시각까지 대기한 뒤 비디오 상태를 갱신하고 알림을 발행한다.
/// 종료 신호가 오면 남은 단계를 버리고 반환한다.
pub async fn replay(
    trace: &PlaybackTrace,
    engine: &ScriptedEngine,
    video: &SimulatedVideo,
    mut shutdown: watch::Receiver<bool>,
) -> ReplayOutcome {
    let start = Instant::now();
    let mut outcome = ReplayOutcome::default();

    info!("트레이스 재생 시작: {} ({}단계)", trace.target, trace.events.len());

    for step in &trace.events {
        let deadline = start + Duration::from_millis(step.at_ms);
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            _ = wait_for_shutdown(&mut shutdown) => {
                outcome.interrupted = true;
                break;
            }
        }

        drive_video(video, &step.event);
        outcome.deliveries += engine.fire(&step.event);
        outcome.steps += 1;
        debug!("트레이스 단계 {}: {:?}", step.at_ms, step.event.kind());
    }

    info!(
        "트레이스 재생 종료: {}단계 발행{}",
        outcome.steps,
        if outcome.interrupted { " (중단)" } else { "" }
    );
    outcome
}

/// 알림에 맞춰 비디오 재생 상태 갱신
fn drive_video(video: &SimulatedVideo, event: &EngineEvent) {
    match event {
        EngineEvent::PlaybackStarted => video.play(),
        EngineEvent::PlaybackStalled | EngineEvent::PlaybackEnded => video.pause(),
        EngineEvent::PlaybackStateChanged { state: Some(state) } => match state {
            PlaybackState::Playing => video.play(),
            PlaybackState::Paused | PlaybackState::Waiting | PlaybackState::Ended => {
                video.pause()
            }
            _ => {}
        },
        _ => {}
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // 송신측이 사라지면 종료 신호는 오지 않는다
            std::future::pending::<()>().await;
        }
    }
}
