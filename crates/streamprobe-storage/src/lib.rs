//! # streamprobe-storage
//!
//! 메트릭 저장용 문서 저장소 프로비저닝.
//! 사용자 1명, 컬렉션 1개, 인덱스 목록을 선언적으로 생성한다.
//!
//! - `provisioner`: 계획 검증 후 순서대로 실행
//! - `sqlite_store`: rusqlite 기반 `DocumentStoreAdmin` 구현
//! - `mongo_script`: 문서 DB 셸 초기화 스크립트 렌더러

mod migration;
pub mod mongo_script;
pub mod provisioner;
pub mod sqlite_store;

pub use mongo_script::MongoInitScript;
pub use provisioner::{provision, ProvisioningReport};
pub use sqlite_store::SqliteDocumentStore;
