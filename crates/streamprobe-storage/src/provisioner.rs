//! 프로비저닝 실행기.
//!
//! 순서: 계획 검증 → 사용자 → 컬렉션 → 인덱스.
//! 첫 실패에서 중단하고 에러를 그대로 반환한다.

use serde::Serialize;
use streamprobe_core::error::CoreError;
use streamprobe_core::models::provisioning::ProvisioningPlan;
use streamprobe_core::ports::document_store::DocumentStoreAdmin;
use tracing::info;

/// 프로비저닝 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningReport {
    pub database: String,
    pub user: String,
    pub collection: String,
    /// 생성된 인덱스 이름 (계획 순서)
    pub indexes: Vec<String>,
}

/// 계획을 저장소에 적용
pub async fn provision(
    admin: &dyn DocumentStoreAdmin,
    plan: &ProvisioningPlan,
) -> Result<ProvisioningReport, CoreError> {
    plan.validate()?;

    admin.create_user(&plan.database, &plan.user).await?;
    admin
        .create_collection(&plan.database, &plan.collection)
        .await?;

    let mut indexes = Vec::with_capacity(plan.indexes.len());
    for index in &plan.indexes {
        let name = admin
            .create_index(&plan.database, &plan.collection, index)
            .await?;
        indexes.push(name);
    }

    info!(
        "프로비저닝 완료: db={}, user={}, collection={}, 인덱스 {}개",
        plan.database,
        plan.user.user,
        plan.collection,
        indexes.len()
    );

    Ok(ProvisioningReport {
        database: plan.database.clone(),
        user: plan.user.user.clone(),
        collection: plan.collection.clone(),
        indexes,
    })
}
