//! 테스트용 싱크와 헬퍼.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use streamprobe_core::error::CoreError;
use streamprobe_core::models::metric::{MetricEventType, MetricRecord, Payload};
use streamprobe_core::ports::metrics_sink::MetricsSink;

/// 받은 레코드를 보관하는 싱크
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<MetricRecord>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<MetricRecord> {
        self.records.lock().clone()
    }

    pub fn of_type(&self, event_type: MetricEventType) -> Vec<MetricRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn submit(&self, record: &MetricRecord) -> Result<(), CoreError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// 항상 전송 실패하는 싱크
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSink for FailingSink {
    async fn submit(&self, _record: &MetricRecord) -> Result<(), CoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Network("connection refused".to_string()))
    }
}

/// 지연 후 기록하는 싱크
pub struct SlowSink {
    delay: Duration,
    inner: RecordingSink,
}

impl SlowSink {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: RecordingSink::default(),
        }
    }

    pub fn records(&self) -> Vec<MetricRecord> {
        self.inner.records()
    }
}

#[async_trait]
impl MetricsSink for SlowSink {
    async fn submit(&self, record: &MetricRecord) -> Result<(), CoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.submit(record).await
    }
}

/// 고정 값 레코드
pub fn record(event_type: MetricEventType, video_id: &str) -> MetricRecord {
    MetricRecord {
        experiment_id: "exp".to_string(),
        timestamp: 1_700_000_000.0,
        event_type,
        protocol: "dash".to_string(),
        video_id: video_id.to_string(),
        payload: Payload::new(),
    }
}

/// 스폰된 전송 태스크가 끝날 때까지 양보
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
