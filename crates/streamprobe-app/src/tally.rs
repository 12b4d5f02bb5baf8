//! 전송 레코드 집계.
//!
//! 파이프라인 관찰 채널을 구독해 이벤트 유형별 건수를 센다.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use streamprobe_core::models::metric::{MetricEventType, MetricRecord};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

/// 이벤트 유형별 건수
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTally {
    counts: BTreeMap<&'static str, u64>,
    /// 채널 지연으로 놓친 레코드 수
    missed: u64,
}

impl EventTally {
    pub fn record(&mut self, event_type: MetricEventType) {
        *self.counts.entry(event_type.as_str()).or_insert(0) += 1;
    }

    pub fn count(&self, event_type: MetricEventType) -> u64 {
        self.counts.get(event_type.as_str()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// 표 형태 요약
    pub fn render(&self) -> String {
        let mut out = String::new();
        for event_type in MetricEventType::ALL {
            let _ = writeln!(out, "{:<28} {:>6}", event_type.as_str(), self.count(event_type));
        }
        let _ = writeln!(out, "{:<28} {:>6}", "total", self.total());
        if self.missed > 0 {
            let _ = writeln!(out, "{:<28} {:>6}", "missed", self.missed);
        }
        out
    }
}

/// 채널이 닫힐 때까지 집계하는 태스크 시작
pub fn spawn(mut rx: broadcast::Receiver<MetricRecord>) -> JoinHandle<EventTally> {
    tokio::spawn(async move {
        let mut tally = EventTally::default();
        loop {
            match rx.recv().await {
                Ok(record) => tally.record(record.event_type),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("집계 지연: {n}건 누락");
                    tally.missed += n;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tally
    })
}
