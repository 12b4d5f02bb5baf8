//! 적응형 스트리밍 재생 엔진 포트.
//!
//! 엔진 자체는 블랙박스다. 파이프라인은 아래 기능 표면만 사용한다:
//! 이벤트 구독/해제, 타깃 초기화, 해제(teardown), 현재 품질 조회, 비트레이트 목록 조회.

use std::sync::Arc;

use crate::models::engine::{EngineEvent, EngineEventKind, MediaType};

/// 구독 식별자 (엔진 인스턴스 내 고유)
pub type SubscriptionId = u64;

/// 엔진 알림 핸들러
pub type EngineHandler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// 품질 레벨별 비트레이트 정보
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitrateInfo {
    /// 품질 인덱스
    pub quality_index: u32,
    /// 비트레이트 (bps)
    pub bitrate: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// 재생 엔진 인스턴스
///
/// 핸들러 안에서 조회 메서드를 다시 호출할 수 있어야 하므로
/// 모든 메서드는 `&self`를 받고 구현체가 내부 가변성을 관리한다.
pub trait PlayerEngine: Send + Sync {
    /// 재생 타깃(매니페스트)에 바인딩
    fn initialize(&self, target: &str, autoplay: bool);

    /// 이벤트 구독
    fn on(&self, kind: EngineEventKind, handler: EngineHandler) -> SubscriptionId;

    /// 구독 해제 (없는 ID는 무시)
    fn off(&self, kind: EngineEventKind, id: SubscriptionId);

    /// 인스턴스 해제. 이후 알림을 발행하지 않는다.
    fn destroy(&self);

    /// 현재 품질 인덱스 (지원하지 않으면 `None`)
    fn quality_for(&self, media_type: MediaType) -> Option<u32>;

    /// 품질 레벨별 비트레이트 목록 (지원하지 않으면 `None`)
    fn bitrate_info_list_for(&self, media_type: MediaType) -> Option<Vec<BitrateInfo>>;
}

/// 엔진 인스턴스 생성기
pub trait PlayerEngineFactory: Send + Sync {
    fn create(&self) -> Arc<dyn PlayerEngine>;
}
