//! 문서 저장소 관리 포트.
//!
//! 구현: `streamprobe-storage` crate (rusqlite, 초기화 스크립트 렌더러)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::provisioning::{IndexSpec, UserGrant};

/// 프로비저닝 대상 문서 저장소
#[async_trait]
pub trait DocumentStoreAdmin: Send + Sync {
    /// 자격증명 생성 (이미 있으면 갱신)
    async fn create_user(&self, database: &str, grant: &UserGrant) -> Result<(), CoreError>;

    /// 컬렉션 생성 (이미 있으면 no-op)
    async fn create_collection(&self, database: &str, collection: &str)
        -> Result<(), CoreError>;

    /// 인덱스 생성 후 인덱스 이름 반환 (이미 있으면 no-op)
    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> Result<String, CoreError>;
}
