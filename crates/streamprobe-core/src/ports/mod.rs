//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! 각 어댑터 crate가 이 trait들을 구현하며,
//! `streamprobe-app`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! 재생 엔진/비디오 표면은 콜백 기반 동기 인터페이스이고,
//! 네트워크/저장소 포트는 `async_trait`을 사용한다.

pub mod document_store;
pub mod metrics_sink;
pub mod player_engine;
pub mod video_surface;
