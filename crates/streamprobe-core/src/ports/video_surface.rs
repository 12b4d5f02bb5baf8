//! 비디오 표면 포트.
//!
//! 주기 샘플러가 읽는 재생 중 비디오 상태.

/// 프레임 품질 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoPlaybackQuality {
    /// 누락된 프레임 수
    pub dropped_video_frames: u64,
    /// 전체 디코딩 프레임 수
    pub total_video_frames: u64,
}

/// 비디오 요소
pub trait VideoSurface: Send + Sync {
    /// 재생 속도 (1.0 = 정상)
    fn playback_rate(&self) -> f64;

    /// 현재 재생 위치 (초)
    fn current_time(&self) -> f64;

    /// 전체 길이 (초, 메타데이터 로드 전에는 NaN 가능)
    fn duration(&self) -> f64;

    /// 프레임 품질 통계 (지원하지 않으면 `None`)
    fn playback_quality(&self) -> Option<VideoPlaybackQuality> {
        None
    }
}
