//! STREAMPROBE 도메인 모델.
//!
//! 수집 서버로 전송되는 메트릭 레코드, 재생 엔진이 발행하는 이벤트,
//! 문서 저장소 프로비저닝 계획을 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod engine;
pub mod metric;
pub mod provisioning;
