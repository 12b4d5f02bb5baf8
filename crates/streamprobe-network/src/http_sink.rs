//! HTTP 메트릭 제출 클라이언트.
//!
//! `MetricsSink` 포트 구현. `POST {base_url}/api/submit`에 JSON 본문 전송.
//! 재시도와 타임아웃은 두지 않는다. 응답 본문은 읽지 않는다.

use async_trait::async_trait;
use streamprobe_core::error::CoreError;
use streamprobe_core::models::metric::MetricRecord;
use streamprobe_core::ports::metrics_sink::MetricsSink;
use tracing::debug;

/// 제출 엔드포인트 경로
pub const SUBMIT_PATH: &str = "/api/submit";

/// 메트릭 제출 클라이언트 (`MetricsSink` 포트 구현)
pub struct HttpMetricsSink {
    client: reqwest::Client,
    submit_url: String,
}

impl HttpMetricsSink {
    /// 새 제출 클라이언트 생성
    ///
    /// `base_url`은 절대 http(s) URL이어야 한다.
    pub fn new(base_url: &str) -> Result<Self, CoreError> {
        let base = base_url.trim_end_matches('/');
        let parsed = url::Url::parse(base)
            .map_err(|e| CoreError::Config(format!("수집 서버 URL 파싱 실패: {base}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "지원하지 않는 URL 스킴: {}",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            submit_url: format!("{base}{SUBMIT_PATH}"),
        })
    }

    /// 제출 URL
    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }
}

#[async_trait]
impl MetricsSink for HttpMetricsSink {
    async fn submit(&self, record: &MetricRecord) -> Result<(), CoreError> {
        // .json()이 Content-Type: application/json을 설정한다
        let resp = self
            .client
            .post(&self.submit_url)
            .json(record)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("메트릭 전송 실패: {e}")))?;

        // 4xx/5xx는 전송 성공과 구분하지 않는다
        debug!(
            "메트릭 전송 완료: {} → HTTP {}",
            record.event_type,
            resp.status().as_u16()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use streamprobe_core::models::metric::{payload_from, MetricEventType};

    fn sample_record() -> MetricRecord {
        MetricRecord {
            experiment_id: "exp_001".to_string(),
            timestamp: 1_700_000_000.5,
            event_type: MetricEventType::RebufferEvent,
            protocol: "dash".to_string(),
            video_id: "http://media/manifest.mpd".to_string(),
            payload: payload_from([
                ("rebuffer_count", json!(1)),
                ("buffer_level", json!(0.0)),
                ("current_bitrate", json!(800_000)),
            ]),
        }
    }

    #[test]
    fn submit_url_joins_path() {
        let sink = HttpMetricsSink::new("http://localhost:8000/").unwrap();
        assert_eq!(sink.submit_url(), "http://localhost:8000/api/submit");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            HttpMetricsSink::new("not a url"),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            HttpMetricsSink::new("ftp://stats"),
            Err(CoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn posts_json_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/submit")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "experiment_id": "exp_001",
                "event_type": "rebuffer_event",
                "protocol": "dash",
                "video_id": "http://media/manifest.mpd",
                "payload": { "rebuffer_count": 1, "current_bitrate": 800000 }
            })))
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;

        let sink = HttpMetricsSink::new(&server.url()).unwrap();
        let result = sink.submit(&sample_record()).await;
        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_not_distinguished() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/submit")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let sink = HttpMetricsSink::new(&server.url()).unwrap();
        assert!(sink.submit(&sample_record()).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let sink = HttpMetricsSink::new("http://127.0.0.1:1").unwrap();
        let err = sink.submit(&sample_record()).await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
        assert!(err.to_string().contains("네트워크"));
    }
}
