//! 메트릭 전송 포트.
//!
//! 구현: `streamprobe-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::metric::MetricRecord;

/// 메트릭 수집 엔드포인트
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// 레코드 1건 전송
    ///
    /// 전송 계층 실패만 `Err`로 보고한다. 서버 응답 상태는 구분하지 않는다.
    async fn submit(&self, record: &MetricRecord) -> Result<(), CoreError>;
}
