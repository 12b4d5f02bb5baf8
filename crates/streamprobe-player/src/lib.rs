//! # streamprobe-player
//!
//! 적응형 스트리밍 재생 엔진 계측 파이프라인.
//! 엔진 알림을 구독해 메트릭 레코드로 정규화하고, 세션 컨텍스트를 붙여
//! fire-and-forget으로 수집 서버에 전송한다. 5초 주기 샘플러가 비디오 상태를 보고한다.
//!
//! ## 모듈
//! - `pipeline`: 초기화/해제 라이프사이클 (`MetricsPipeline`)
//! - `session`: 세션 컨텍스트와 가변 추적값
//! - `handlers`: 엔진 알림 → (이벤트 유형, 페이로드) 변환
//! - `emitter`: 레코드 생성 + 디스패치
//! - `dispatcher`: 비차단 전송 (실패는 로그만)
//! - `subscriptions`: 인스턴스별 구독 테이블
//! - `sampler`: 취소 가능한 주기 샘플러
//! - `status`: 상태 줄/이벤트 로그/표시 메트릭
//! - `simulated`: 스크립트 엔진, 시뮬레이션 비디오
//! - `trace`: 재생 트레이스 로드/재생

pub mod dispatcher;
pub mod emitter;
pub mod handlers;
pub mod pipeline;
pub mod sampler;
pub mod session;
pub mod simulated;
pub mod status;
pub mod subscriptions;
pub mod trace;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{MetricsPipeline, PipelineSettings};
