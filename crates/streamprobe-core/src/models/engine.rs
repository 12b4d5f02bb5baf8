//! 재생 엔진 이벤트 모델.
//!
//! 적응형 스트리밍 엔진이 발행하는 알림을 타입으로 표현한다.
//! 엔진이 채우지 않을 수 있는 필드는 모두 `Option`이다.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 엔진이 구독을 받는 이벤트 이름
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEventKind {
    StreamInitialized,
    FragmentLoadingStarted,
    FragmentLoadingCompleted,
    QualityChangeRendered,
    BufferLevelUpdated,
    PlaybackStateChanged,
    Error,
    PlaybackStalled,
    PlaybackStarted,
    PlaybackEnded,
}

impl EngineEventKind {
    /// 파이프라인이 구독하는 고정 이벤트 집합
    pub const ALL: [EngineEventKind; 10] = [
        Self::StreamInitialized,
        Self::FragmentLoadingStarted,
        Self::FragmentLoadingCompleted,
        Self::QualityChangeRendered,
        Self::BufferLevelUpdated,
        Self::PlaybackStateChanged,
        Self::Error,
        Self::PlaybackStalled,
        Self::PlaybackStarted,
        Self::PlaybackEnded,
    ];
}

/// 미디어 트랙 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Text,
    /// 엔진이 보고한 알 수 없는 트랙
    #[serde(other)]
    Other,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// 거친(coarse) 재생 상태
///
/// 엔진 문자열을 그대로 보존하기 위해 문자열로 직렬화한다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlaybackState {
    #[default]
    Unknown,
    Playing,
    Paused,
    Seeking,
    Waiting,
    Ended,
    /// 그 외 엔진 고유 상태
    Other(String),
}

impl PlaybackState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "unknown",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Seeking => "seeking",
            Self::Waiting => "waiting",
            Self::Ended => "ended",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for PlaybackState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "unknown" => Self::Unknown,
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "seeking" => Self::Seeking,
            "waiting" => Self::Waiting,
            "ended" => Self::Ended,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for PlaybackState {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<PlaybackState> for String {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 세그먼트 요청 정보
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentRequest {
    /// 요청 종류 (예: "MediaSegment", "InitializationSegment")
    #[serde(rename = "type")]
    pub request_type: Option<String>,
    /// 세그먼트 URL
    pub url: Option<String>,
    /// 트랙 종류
    pub media_type: Option<MediaType>,
    /// 미디어 타임라인 시작 시각 (초)
    pub start_time: Option<f64>,
    /// 세그먼트 길이 (초)
    pub duration: Option<f64>,
}

/// 엔진이 보고한 에러 객체
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineError {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<Value>,
}

/// 엔진 알림
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    StreamInitialized,
    FragmentLoadingStarted {
        request: Option<FragmentRequest>,
    },
    FragmentLoadingCompleted {
        request: Option<FragmentRequest>,
    },
    QualityChangeRendered {
        media_type: Option<MediaType>,
        old_quality: Option<u32>,
        new_quality: Option<u32>,
    },
    BufferLevelUpdated {
        media_type: Option<MediaType>,
        buffer_level: Option<f64>,
    },
    PlaybackStateChanged {
        state: Option<PlaybackState>,
    },
    Error {
        error: Option<EngineError>,
    },
    PlaybackStalled,
    PlaybackStarted,
    PlaybackEnded,
}

impl EngineEvent {
    /// 이 알림이 전달되는 구독 이벤트 이름
    pub fn kind(&self) -> EngineEventKind {
        match self {
            Self::StreamInitialized => EngineEventKind::StreamInitialized,
            Self::FragmentLoadingStarted { .. } => EngineEventKind::FragmentLoadingStarted,
            Self::FragmentLoadingCompleted { .. } => EngineEventKind::FragmentLoadingCompleted,
            Self::QualityChangeRendered { .. } => EngineEventKind::QualityChangeRendered,
            Self::BufferLevelUpdated { .. } => EngineEventKind::BufferLevelUpdated,
            Self::PlaybackStateChanged { .. } => EngineEventKind::PlaybackStateChanged,
            Self::Error { .. } => EngineEventKind::Error,
            Self::PlaybackStalled => EngineEventKind::PlaybackStalled,
            Self::PlaybackStarted => EngineEventKind::PlaybackStarted,
            Self::PlaybackEnded => EngineEventKind::PlaybackEnded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn playback_state_keeps_engine_strings() {
        let known: PlaybackState = serde_json::from_value(json!("paused")).unwrap();
        assert_eq!(known, PlaybackState::Paused);

        let custom: PlaybackState = serde_json::from_value(json!("buffering")).unwrap();
        assert_eq!(custom, PlaybackState::Other("buffering".to_string()));
        assert_eq!(serde_json::to_value(&custom).unwrap(), json!("buffering"));
    }

    #[test]
    fn engine_event_tagged_by_kind() {
        let raw = json!({
            "kind": "quality_change_rendered",
            "media_type": "video",
            "old_quality": 0,
            "new_quality": 1
        });
        let event: EngineEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.kind(), EngineEventKind::QualityChangeRendered);
        assert!(matches!(
            event,
            EngineEvent::QualityChangeRendered {
                new_quality: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn missing_optional_fields_are_none() {
        let event: EngineEvent =
            serde_json::from_value(json!({ "kind": "buffer_level_updated" })).unwrap();
        assert_eq!(
            event,
            EngineEvent::BufferLevelUpdated {
                media_type: None,
                buffer_level: None
            }
        );
    }

    #[test]
    fn unknown_media_type_maps_to_other() {
        let mt: MediaType = serde_json::from_value(json!("image")).unwrap();
        assert_eq!(mt, MediaType::Other);
    }
}
