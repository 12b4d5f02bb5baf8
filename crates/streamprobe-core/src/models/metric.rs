//! 메트릭 레코드 모델.
//!
//! 이벤트 1회 발생당 하나씩 생성되어 `POST /api/submit`으로 전송되는 단위.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 계측 대상 전송 프로토콜 (고정 리터럴)
pub const DEFAULT_PROTOCOL: &str = "dash";

/// 이벤트별 페이로드 (필드명 → 스칼라 값)
pub type Payload = serde_json::Map<String, Value>;

/// 메트릭 이벤트 유형 (고정 열거)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricEventType {
    /// 스트림 준비 완료
    StreamInitialized,
    /// 세그먼트 요청 시작
    FragmentLoadingStarted,
    /// 세그먼트 수신 완료
    FragmentLoadingCompleted,
    /// 새 품질 레벨 렌더링
    QualityChangeRendered,
    /// 버퍼 점유량 보고
    BufferLevelUpdated,
    /// 재생 상태 전환
    PlaybackStateChanged,
    /// 엔진 에러
    PlaybackError,
    /// 재생 정지 (리버퍼링)
    RebufferEvent,
    /// 첫 프레임 렌더링 / 정지 후 재개
    PlaybackStarted,
    /// 스트림 종료
    PlaybackEnded,
    /// 주기 샘플러 (5초)
    PeriodicMetrics,
}

impl MetricEventType {
    /// 모든 이벤트 유형
    pub const ALL: [MetricEventType; 11] = [
        Self::StreamInitialized,
        Self::FragmentLoadingStarted,
        Self::FragmentLoadingCompleted,
        Self::QualityChangeRendered,
        Self::BufferLevelUpdated,
        Self::PlaybackStateChanged,
        Self::PlaybackError,
        Self::RebufferEvent,
        Self::PlaybackStarted,
        Self::PlaybackEnded,
        Self::PeriodicMetrics,
    ];

    /// 직렬화 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreamInitialized => "stream_initialized",
            Self::FragmentLoadingStarted => "fragment_loading_started",
            Self::FragmentLoadingCompleted => "fragment_loading_completed",
            Self::QualityChangeRendered => "quality_change_rendered",
            Self::BufferLevelUpdated => "buffer_level_updated",
            Self::PlaybackStateChanged => "playback_state_changed",
            Self::PlaybackError => "playback_error",
            Self::RebufferEvent => "rebuffer_event",
            Self::PlaybackStarted => "playback_started",
            Self::PlaybackEnded => "playback_ended",
            Self::PeriodicMetrics => "periodic_metrics",
        }
    }

    /// 이 유형의 페이로드가 가져야 하는 필드 목록
    pub fn payload_fields(&self) -> &'static [&'static str] {
        match self {
            Self::StreamInitialized | Self::PlaybackStarted => &["mpd_url"],
            Self::FragmentLoadingStarted => &["type", "url", "media_type"],
            Self::FragmentLoadingCompleted => &[
                "type",
                "url",
                "quality",
                "media_type",
                "start_time",
                "duration",
            ],
            Self::QualityChangeRendered => &["old_quality", "new_quality", "bitrate"],
            Self::BufferLevelUpdated => &["buffer_level", "media_type"],
            Self::PlaybackStateChanged => &["old_state", "new_state"],
            Self::PlaybackError => &["error_code", "error_message", "error_data"],
            Self::RebufferEvent => &["rebuffer_count", "buffer_level", "current_bitrate"],
            Self::PlaybackEnded => &["total_rebuffers"],
            Self::PeriodicMetrics => &[
                "current_time",
                "duration",
                "playback_rate",
                "dropped_frames",
                "buffer_level",
                "current_bitrate",
            ],
        }
    }
}

impl fmt::Display for MetricEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 수집 서버 전송 단위
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// 실험 식별자 (세션 내 고정)
    pub experiment_id: String,
    /// 전송 시각 (epoch 초, 밀리초 정밀도)
    pub timestamp: f64,
    /// 이벤트 유형
    pub event_type: MetricEventType,
    /// 전송 프로토콜 리터럴
    pub protocol: String,
    /// 전송 시점의 미디어 ID 스냅샷
    pub video_id: String,
    /// 이벤트별 페이로드 (비어 있을 수 있으나 생략되지 않음)
    #[serde(default)]
    pub payload: Payload,
}

impl MetricRecord {
    /// 페이로드 필드 조회
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

/// 벽시계 시각을 epoch 초(밀리초 정밀도)로 변환
pub fn epoch_seconds(now: DateTime<Utc>) -> f64 {
    now.timestamp_millis() as f64 / 1000.0
}

/// (필드명, 값) 목록으로 페이로드 생성
pub fn payload_from<I>(fields: I) -> Payload
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
