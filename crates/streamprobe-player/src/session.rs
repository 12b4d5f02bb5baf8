//! 세션 컨텍스트.
//!
//! 플레이어 초기화마다 새로 생성되고 다음 초기화 시 대체된다.
//! 핸들러는 동기적으로 추적값을 갱신하고, 전송 시점에 값을 읽는다 (last-writer-wins).

use streamprobe_core::models::engine::PlaybackState;

/// 로그 대상인 쌍(pair) 전환
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairedTransition {
    /// playing → paused
    Paused,
    /// paused → playing
    Resumed,
}

/// 세션 컨텍스트
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    /// 메트릭 제출 기본 URL
    pub server_endpoint: String,
    /// 실험 식별자
    pub experiment_id: String,
    /// 현재 재생 타깃 (매니페스트 URL)
    pub current_media_id: String,
    /// 마지막 버퍼 레벨 (초)
    pub last_buffer_level: f64,
    /// 마지막 비트레이트 (bps)
    pub last_bitrate: u64,
    /// 감지된 정지 횟수
    pub rebuffer_count: u64,
    /// 마지막 재생 상태
    pub last_playback_state: PlaybackState,
}

impl SessionContext {
    pub fn new(
        server_endpoint: impl Into<String>,
        experiment_id: impl Into<String>,
        media_id: impl Into<String>,
    ) -> Self {
        Self {
            server_endpoint: server_endpoint.into(),
            experiment_id: experiment_id.into(),
            current_media_id: media_id.into(),
            last_buffer_level: 0.0,
            last_bitrate: 0,
            rebuffer_count: 0,
            last_playback_state: PlaybackState::Unknown,
        }
    }

    /// 버퍼 레벨 갱신 (음수/NaN은 0으로)
    pub fn record_buffer_level(&mut self, level: f64) {
        self.last_buffer_level = if level.is_finite() { level.max(0.0) } else { 0.0 };
    }

    pub fn record_bitrate(&mut self, bitrate: u64) {
        self.last_bitrate = bitrate;
    }

    /// 정지 1회 기록 후 증가된 카운트 반환
    pub fn record_stall(&mut self) -> u64 {
        self.rebuffer_count = self.rebuffer_count.saturating_add(1);
        self.rebuffer_count
    }

    /// 새 재생 상태 기록
    ///
    /// 이전 상태와 비교해 쌍 전환 여부를 판단한 뒤 덮어쓴다.
    pub fn record_state(&mut self, new_state: PlaybackState) -> Option<PairedTransition> {
        let transition = match (&self.last_playback_state, &new_state) {
            (PlaybackState::Playing, PlaybackState::Paused) => Some(PairedTransition::Paused),
            (PlaybackState::Paused, PlaybackState::Playing) => Some(PairedTransition::Resumed),
            _ => None,
        };
        self.last_playback_state = new_state;
        transition
    }
}
