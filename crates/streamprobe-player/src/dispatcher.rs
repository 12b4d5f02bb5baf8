//! 비차단 메트릭 디스패처.
//!
//! 레코드를 관찰자 채널에 발행한 뒤 전송을 별도 태스크로 넘긴다.
//! 호출자는 응답을 기다리지 않는다. 전송 실패는 로그만 남기고 삼킨다 (재시도 없음).
//! 진행 중 전송은 [`SubmitTracker`]가 세며, 종료 직전 `drain`으로 기다릴 수 있다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamprobe_core::models::metric::MetricRecord;
use streamprobe_core::ports::metrics_sink::MetricsSink;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, warn};

/// 진행 중 전송 추적기
#[derive(Debug, Default)]
pub struct SubmitTracker {
    pending: AtomicUsize,
    idle: Notify,
}

impl SubmitTracker {
    /// 아직 끝나지 않은 전송 수
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn begin(self: &Arc<Self>) -> InFlight {
        self.pending.fetch_add(1, Ordering::SeqCst);
        InFlight(self.clone())
    }

    /// 진행 중 전송이 모두 끝날 때까지 대기 (최대 `timeout`)
    ///
    /// 제한 시간 안에 비었으면 `true`. 새 전송을 막지는 않는다.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait_idle = async {
            loop {
                let notified = self.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.pending() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait_idle).await.is_ok()
    }
}

/// 전송 태스크 하나의 수명 (태스크가 끝나거나 버려지면 감소)
struct InFlight(Arc<SubmitTracker>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// 메트릭 디스패처
pub struct MetricDispatcher {
    sink: Arc<dyn MetricsSink>,
    /// 생성 시점의 런타임 (엔진이 런타임 밖 스레드에서 콜백해도 전송 가능)
    runtime: Option<Handle>,
    /// 전송 직전 레코드 관찰 채널
    event_tx: Option<broadcast::Sender<MetricRecord>>,
    tracker: Arc<SubmitTracker>,
}

impl MetricDispatcher {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            sink,
            runtime: Handle::try_current().ok(),
            event_tx: None,
            tracker: Arc::new(SubmitTracker::default()),
        }
    }

    /// 여러 디스패처가 공유할 추적기 설정
    pub fn with_tracker(mut self, tracker: Arc<SubmitTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> &Arc<SubmitTracker> {
        &self.tracker
    }

    /// 관찰자 채널 설정
    pub fn with_event_tx(mut self, event_tx: Option<broadcast::Sender<MetricRecord>>) -> Self {
        self.event_tx = event_tx;
        self
    }

    /// 레코드 전송 (즉시 반환)
    pub fn dispatch(&self, record: MetricRecord) {
        if let Some(tx) = &self.event_tx {
            // 구독자가 없으면 Err, 무시
            let _ = tx.send(record.clone());
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!("tokio 런타임 없음, 메트릭 전송 생략: {}", record.event_type);
            return;
        };

        debug!("메트릭 디스패치: {} ({})", record.event_type, record.video_id);
        let sink = self.sink.clone();
        let in_flight = self.tracker.begin();
        runtime.spawn(async move {
            let _in_flight = in_flight;
            if let Err(e) = sink.submit(&record).await {
                warn!("메트릭 전송 실패 ({}): {e}", record.event_type);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, FailingSink, RecordingSink, SlowSink};
    use streamprobe_core::models::metric::MetricEventType;

    #[tokio::test]
    async fn dispatch_publishes_then_submits() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, mut rx) = broadcast::channel(8);
        let dispatcher = MetricDispatcher::new(sink.clone()).with_event_tx(Some(tx));

        dispatcher.dispatch(record(MetricEventType::PlaybackStarted, "v"));

        // 발행은 동기, 전송은 태스크
        assert_eq!(rx.try_recv().unwrap().event_type, MetricEventType::PlaybackStarted);
        assert!(sink.records().is_empty());

        crate::testing::settle().await;
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let sink = Arc::new(FailingSink::default());
        let dispatcher = MetricDispatcher::new(sink.clone());

        dispatcher.dispatch(record(MetricEventType::PlaybackStarted, "v"));
        dispatcher.dispatch(record(MetricEventType::PlaybackEnded, "v"));
        crate::testing::settle().await;

        assert_eq!(sink.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_in_flight_submits() {
        let sink = Arc::new(SlowSink::new(Duration::from_millis(300)));
        let dispatcher = MetricDispatcher::new(sink.clone());

        dispatcher.dispatch(record(MetricEventType::PlaybackStarted, "v"));
        dispatcher.dispatch(record(MetricEventType::PlaybackEnded, "v"));
        assert_eq!(dispatcher.tracker().pending(), 2);

        assert!(dispatcher.tracker().drain(Duration::from_secs(1)).await);
        assert_eq!(dispatcher.tracker().pending(), 0);
        assert_eq!(sink.records().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_gives_up_after_timeout() {
        let sink = Arc::new(SlowSink::new(Duration::from_secs(60)));
        let dispatcher = MetricDispatcher::new(sink.clone());

        dispatcher.dispatch(record(MetricEventType::PlaybackStarted, "v"));
        assert!(!dispatcher.tracker().drain(Duration::from_millis(10)).await);
        assert_eq!(dispatcher.tracker().pending(), 1);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn failed_submits_still_leave_tracker() {
        let sink = Arc::new(FailingSink::default());
        let tracker = Arc::new(SubmitTracker::default());
        let first = MetricDispatcher::new(sink.clone()).with_tracker(tracker.clone());
        let second = MetricDispatcher::new(sink.clone()).with_tracker(tracker.clone());

        first.dispatch(record(MetricEventType::PlaybackStarted, "a"));
        second.dispatch(record(MetricEventType::PlaybackStarted, "b"));

        assert!(tracker.drain(Duration::from_secs(1)).await);
        assert_eq!(sink.attempts(), 2);
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn without_runtime_only_publishes() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, mut rx) = broadcast::channel(8);
        let dispatcher = MetricDispatcher::new(sink.clone()).with_event_tx(Some(tx));

        dispatcher.dispatch(record(MetricEventType::PlaybackEnded, "v"));
        assert!(rx.try_recv().is_ok());
        assert!(sink.records().is_empty());
        assert_eq!(dispatcher.tracker().pending(), 0);
    }
}
