//! 인스턴스별 구독 테이블.
//!
//! 해제 시 이 인스턴스가 등록한 핸들러만 정확히 해제하기 위해
//! (이벤트, 구독 ID) 바인딩을 명시적으로 보관한다.

use std::sync::Arc;
use streamprobe_core::models::engine::EngineEventKind;
use streamprobe_core::ports::player_engine::{EngineHandler, PlayerEngine, SubscriptionId};
use tracing::debug;

/// 구독 테이블
pub struct SubscriptionTable {
    engine: Arc<dyn PlayerEngine>,
    bindings: Vec<(EngineEventKind, SubscriptionId)>,
}

impl SubscriptionTable {
    pub fn new(engine: Arc<dyn PlayerEngine>) -> Self {
        Self {
            engine,
            bindings: Vec::new(),
        }
    }

    /// 핸들러 등록 후 바인딩 기록
    pub fn bind(&mut self, kind: EngineEventKind, handler: EngineHandler) -> SubscriptionId {
        let id = self.engine.on(kind, handler);
        self.bindings.push((kind, id));
        id
    }

    /// 모든 바인딩 해제, 해제한 개수 반환
    pub fn unbind_all(&mut self) -> usize {
        let count = self.bindings.len();
        for (kind, id) in self.bindings.drain(..) {
            self.engine.off(kind, id);
        }
        if count > 0 {
            debug!("구독 {count}개 해제");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Drop for SubscriptionTable {
    fn drop(&mut self) {
        self.unbind_all();
    }
}
