//! 문서 저장소 프로비저닝 계획.
//!
//! 환경 기동 시 1회 실행되는 선언적 설정: 사용자 1명, 컬렉션 1개, 인덱스 3개.

use serde::{Deserialize, Serialize};

use crate::config::ProvisioningConfig;
use crate::error::CoreError;

/// DB 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseRole {
    Read,
    ReadWrite,
    DbAdmin,
}

impl DatabaseRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ReadWrite => "readWrite",
            Self::DbAdmin => "dbAdmin",
        }
    }
}

/// 특정 DB에 대한 역할 부여
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: DatabaseRole,
    pub db: String,
}

/// 자격증명 + 역할 목록
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGrant {
    pub user: String,
    pub password: String,
    pub roles: Vec<RoleGrant>,
}

/// 인덱스 정렬 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// 문서 저장소 표기 (1 / -1)
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// 인덱스 키 한 개
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    pub field: String,
    pub order: SortOrder,
}

/// 인덱스 정의 (키 순서 유지)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub keys: Vec<IndexKey>,
}

impl IndexSpec {
    /// 오름차순 키 목록으로 인덱스 생성
    pub fn ascending(fields: &[&str]) -> Self {
        Self {
            keys: fields
                .iter()
                .map(|f| IndexKey {
                    field: (*f).to_string(),
                    order: SortOrder::Ascending,
                })
                .collect(),
        }
    }

    /// 관례적 인덱스 이름 (예: `experiment_id_1_timestamp_1`)
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("{}_{}", k.field, k.order.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// 프로비저닝 계획
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningPlan {
    /// 논리 DB 이름
    pub database: String,
    /// 생성할 사용자
    pub user: UserGrant,
    /// 생성할 컬렉션
    pub collection: String,
    /// 컬렉션 인덱스
    pub indexes: Vec<IndexSpec>,
}

impl ProvisioningPlan {
    /// 설정에서 계획 생성
    ///
    /// 사용자는 대상 DB에 `readWrite`만 부여받는다.
    pub fn from_config(config: &ProvisioningConfig) -> Self {
        Self {
            database: config.database.clone(),
            user: UserGrant {
                user: config.username.clone(),
                password: config.password.clone(),
                roles: vec![RoleGrant {
                    role: DatabaseRole::ReadWrite,
                    db: config.database.clone(),
                }],
            },
            collection: config.collection.clone(),
            indexes: vec![
                IndexSpec::ascending(&["experiment_id", "timestamp"]),
                IndexSpec::ascending(&["event_type"]),
                IndexSpec::ascending(&["timestamp"]),
            ],
        }
    }

    /// 계획 유효성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.database.trim().is_empty() {
            return Err(CoreError::validation("database", "비어 있음"));
        }
        if self.collection.trim().is_empty() {
            return Err(CoreError::validation("collection", "비어 있음"));
        }
        if self.user.user.trim().is_empty() {
            return Err(CoreError::validation("user", "비어 있음"));
        }
        if self.user.roles.is_empty() {
            return Err(CoreError::validation("roles", "역할이 하나 이상 필요"));
        }

        for (i, index) in self.indexes.iter().enumerate() {
            if index.keys.is_empty() {
                return Err(CoreError::validation(
                    format!("indexes[{i}]"),
                    "키가 하나 이상 필요",
                ));
            }
            let mut seen = std::collections::HashSet::new();
            for key in &index.keys {
                if !seen.insert(key.field.as_str()) {
                    return Err(CoreError::validation(
                        format!("indexes[{i}]"),
                        format!("중복 필드: {}", key.field),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn default_plan_matches_testbed_layout() {
        let plan = ProvisioningPlan::from_config(&AppConfig::default_config().provisioning);
        assert_eq!(plan.database, "testbed");
        assert_eq!(plan.collection, "metrics");
        assert_eq!(plan.user.roles[0].role, DatabaseRole::ReadWrite);
        assert_eq!(plan.user.roles[0].db, "testbed");

        let names: Vec<String> = plan.indexes.iter().map(IndexSpec::name).collect();
        assert_eq!(
            names,
            vec!["experiment_id_1_timestamp_1", "event_type_1", "timestamp_1"]
        );
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn duplicate_index_field_rejected() {
        let mut plan = ProvisioningPlan::from_config(&AppConfig::default_config().provisioning);
        plan.indexes
            .push(IndexSpec::ascending(&["timestamp", "timestamp"]));
        let err = plan.validate().unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn empty_collection_rejected() {
        let mut plan = ProvisioningPlan::from_config(&AppConfig::default_config().provisioning);
        plan.collection = " ".to_string();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn role_serializes_camel_case() {
        let json = serde_json::to_string(&DatabaseRole::ReadWrite).unwrap();
        assert_eq!(json, "\"readWrite\"");
    }
}
