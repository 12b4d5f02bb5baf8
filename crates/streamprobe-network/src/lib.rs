//! # streamprobe-network
//!
//! 메트릭 수집 서버와의 HTTP 통신 어댑터.
//! `MetricsSink` 포트를 reqwest로 구현한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use streamprobe_network::http_sink::HttpMetricsSink;
//!
//! let sink = HttpMetricsSink::new("http://localhost:8000")?;
//! sink.submit(&record).await?;
//! ```

pub mod http_sink;
