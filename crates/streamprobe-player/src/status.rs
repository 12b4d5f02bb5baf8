//! 플레이어 상태 보드.
//!
//! 상태 줄, 최근 이벤트 로그, 표시용 메트릭(비트레이트, 버퍼, 재생 속도, 누락 프레임).
//! 렌더링은 하지 않는다. 모든 로그 줄은 `tracing`에도 남긴다.

use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use tracing::info;

/// 표시 메트릭 키: 현재 비트레이트 ("800 kbps")
pub const DISPLAY_CURRENT_BITRATE: &str = "current_bitrate";
/// 표시 메트릭 키: 버퍼 레벨 ("2.50s")
pub const DISPLAY_BUFFER_LEVEL: &str = "buffer_level";
/// 표시 메트릭 키: 재생 속도 ("1.00x")
pub const DISPLAY_PLAYBACK_RATE: &str = "playback_rate";
/// 표시 메트릭 키: 누락 프레임 수
pub const DISPLAY_DROPPED_FRAMES: &str = "dropped_frames";

/// 상태 보드 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: String,
    pub log: Vec<String>,
    pub metrics: BTreeMap<String, String>,
}

#[derive(Default)]
struct BoardState {
    status: String,
    log: VecDeque<String>,
    metrics: BTreeMap<String, String>,
}

/// 상태 보드
pub struct StatusBoard {
    capacity: usize,
    state: Mutex<BoardState>,
}

impl StatusBoard {
    /// 최근 `capacity`줄만 보관하는 보드 생성
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(BoardState::default()),
        }
    }

    pub fn set_status(&self, status: impl Into<String>) {
        self.state.lock().status = status.into();
    }

    /// 로그 한 줄 추가
    pub fn log_event(&self, line: impl Into<String>) {
        let line = line.into();
        info!("[player] {line}");

        let mut state = self.state.lock();
        if state.log.len() == self.capacity {
            state.log.pop_front();
        }
        state.log.push_back(line);
    }

    pub fn update_metric(&self, key: &str, value: impl Into<String>) {
        self.state.lock().metrics.insert(key.to_string(), value.into());
    }

    pub fn status(&self) -> String {
        self.state.lock().status.clone()
    }

    pub fn metric(&self, key: &str) -> Option<String> {
        self.state.lock().metrics.get(key).cloned()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.lock();
        StatusSnapshot {
            status: state.status.clone(),
            log: state.log.iter().cloned().collect(),
            metrics: state.metrics.clone(),
        }
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(100)
    }
}
