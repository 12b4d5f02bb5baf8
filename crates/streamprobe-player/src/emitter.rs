//! 세션 단위 레코드 생성기.
//!
//! 세션 컨텍스트 잠금 안에서 추적값 갱신 → 레코드 생성 → 디스패치를 한 번에 수행한다.
//! 해제(`deactivate`) 이후에는 어떤 레코드도 내보내지 않는다.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use streamprobe_core::models::metric::{epoch_seconds, MetricEventType, MetricRecord, Payload};

use crate::dispatcher::MetricDispatcher;
use crate::session::SessionContext;

/// 세션 컨텍스트 스냅샷으로 레코드 생성
pub fn build_record(
    ctx: &SessionContext,
    protocol: &str,
    event_type: MetricEventType,
    payload: Payload,
    now: DateTime<Utc>,
) -> MetricRecord {
    MetricRecord {
        experiment_id: ctx.experiment_id.clone(),
        timestamp: epoch_seconds(now),
        event_type,
        protocol: protocol.to_string(),
        video_id: ctx.current_media_id.clone(),
        payload,
    }
}

/// 세션 레코드 생성기
pub struct SessionEmitter {
    context: Arc<Mutex<SessionContext>>,
    dispatcher: Arc<MetricDispatcher>,
    protocol: String,
    active: AtomicBool,
}

impl SessionEmitter {
    pub fn new(
        context: SessionContext,
        dispatcher: Arc<MetricDispatcher>,
        protocol: impl Into<String>,
    ) -> Self {
        Self {
            context: Arc::new(Mutex::new(context)),
            dispatcher,
            protocol: protocol.into(),
            active: AtomicBool::new(true),
        }
    }

    /// 현재 컨텍스트 값으로 레코드 전송
    pub fn emit(&self, event_type: MetricEventType, payload: Payload) -> bool {
        self.emit_with(|_| Some((event_type, payload)))
    }

    /// 컨텍스트를 갱신하고, 반환된 (유형, 페이로드)가 있으면 전송
    ///
    /// 비활성 세션이면 `update`를 호출하지 않고 `false`를 반환한다.
    pub fn emit_with<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut SessionContext) -> Option<(MetricEventType, Payload)>,
    {
        let mut ctx = self.context.lock();
        if !self.active.load(Ordering::Acquire) {
            return false;
        }
        let Some((event_type, payload)) = update(&mut ctx) else {
            return false;
        };
        let record = build_record(&ctx, &self.protocol, event_type, payload, Utc::now());
        self.dispatcher.dispatch(record);
        true
    }

    /// 세션 비활성화
    ///
    /// 컨텍스트 잠금을 잡고 전환하므로, 반환 이후 진행 중인 전송은 없다.
    pub fn deactivate(&self) {
        let _ctx = self.context.lock();
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// 컨텍스트 복제본
    pub fn snapshot(&self) -> SessionContext {
        self.context.lock().clone()
    }
}
