//! 문서 DB 초기화 스크립트 렌더러.
//!
//! `DocumentStoreAdmin` 호출을 셸 초기화 스크립트 문장으로 기록한다.
//! 컨테이너 최초 기동 시 실행되는 init 스크립트를 만들 때 사용한다.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use streamprobe_core::error::CoreError;
use streamprobe_core::models::provisioning::{IndexSpec, UserGrant};
use streamprobe_core::ports::document_store::DocumentStoreAdmin;
use tracing::info;

/// 스크립트 마지막 줄에서 출력하는 완료 메시지
pub const COMPLETION_MESSAGE: &str = "initialization complete";

#[derive(Default)]
struct ScriptState {
    current_db: Option<String>,
    statements: Vec<String>,
}

/// 초기화 스크립트 빌더
#[derive(Default)]
pub struct MongoInitScript {
    state: Mutex<ScriptState>,
}

/// JS 문자열 리터럴 (JSON 이스케이프)
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

impl MongoInitScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// 대상 DB 전환 문장을 필요할 때만 추가
    fn push(&self, database: &str, statement: String) {
        let mut state = self.state.lock();
        if state.current_db.as_deref() != Some(database) {
            state
                .statements
                .push(format!("db = db.getSiblingDB({});", js_string(database)));
            state.current_db = Some(database.to_string());
        }
        state.statements.push(statement);
    }

    /// 지금까지 기록된 스크립트 전체
    pub fn render(&self) -> String {
        let state = self.state.lock();
        let mut out = String::from("// streamprobe document store initialization\n");
        for statement in &state.statements {
            out.push_str(statement);
            out.push('\n');
        }
        out.push_str(&format!("print({});\n", js_string(COMPLETION_MESSAGE)));
        out
    }

    /// 렌더링 결과를 파일로 저장
    pub fn write_to(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        info!("초기화 스크립트 저장: {}", path.display());
        Ok(())
    }

    pub fn statement_count(&self) -> usize {
        self.state.lock().statements.len()
    }
}

#[async_trait]
impl DocumentStoreAdmin for MongoInitScript {
    async fn create_user(&self, database: &str, grant: &UserGrant) -> Result<(), CoreError> {
        // 필드 순서 유지를 위해 직접 조립
        let roles = grant
            .roles
            .iter()
            .map(|r| {
                format!(
                    "{{ role: {}, db: {} }}",
                    js_string(r.role.as_str()),
                    js_string(&r.db)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        self.push(
            database,
            format!(
                "db.createUser({{ user: {}, pwd: {}, roles: [{roles}] }});",
                js_string(&grant.user),
                js_string(&grant.password)
            ),
        );
        Ok(())
    }

    async fn create_collection(&self, database: &str, collection: &str) -> Result<(), CoreError> {
        self.push(
            database,
            format!("db.createCollection({});", js_string(collection)),
        );
        Ok(())
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> Result<String, CoreError> {
        if index.keys.is_empty() {
            return Err(CoreError::validation("index", "키가 하나 이상 필요"));
        }
        // 키 순서 유지를 위해 직접 조립
        let keys = index
            .keys
            .iter()
            .map(|k| format!("{}: {}", js_string(&k.field), k.order.as_i32()))
            .collect::<Vec<_>>()
            .join(", ");
        let name = index.name();

        self.push(
            database,
            format!(
                "db.getCollection({}).createIndex({{ {keys} }}, {{ name: {} }});",
                js_string(collection),
                js_string(&name)
            ),
        );
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamprobe_core::models::provisioning::{DatabaseRole, RoleGrant};

    #[tokio::test]
    async fn renders_statements_in_call_order() {
        let script = MongoInitScript::new();
        script
            .create_user(
                "testbed",
                &UserGrant {
                    user: "starlink".to_string(),
                    password: "starlink".to_string(),
                    roles: vec![RoleGrant {
                        role: DatabaseRole::ReadWrite,
                        db: "testbed".to_string(),
                    }],
                },
            )
            .await
            .unwrap();
        script.create_collection("testbed", "metrics").await.unwrap();
        let name = script
            .create_index(
                "testbed",
                "metrics",
                &IndexSpec::ascending(&["experiment_id", "timestamp"]),
            )
            .await
            .unwrap();
        assert_eq!(name, "experiment_id_1_timestamp_1");

        let expected = concat!(
            "// streamprobe document store initialization\n",
            "db = db.getSiblingDB(\"testbed\");\n",
            "db.createUser({ user: \"starlink\", pwd: \"starlink\", roles: [{ role: \"readWrite\", db: \"testbed\" }] });\n",
            "db.createCollection(\"metrics\");\n",
            "db.getCollection(\"metrics\").createIndex({ \"experiment_id\": 1, \"timestamp\": 1 }, { name: \"experiment_id_1_timestamp_1\" });\n",
            "print(\"initialization complete\");\n",
        );
        assert_eq!(script.render(), expected);
    }

    #[tokio::test]
    async fn switches_database_only_when_changed() {
        let script = MongoInitScript::new();
        script.create_collection("a", "x").await.unwrap();
        script.create_collection("a", "y").await.unwrap();
        script.create_collection("b", "x").await.unwrap();
        assert_eq!(script.statement_count(), 5);
        assert_eq!(script.render().matches("getSiblingDB").count(), 2);
    }

    #[tokio::test]
    async fn quotes_are_escaped() {
        let script = MongoInitScript::new();
        script.create_collection("db", "we\"ird").await.unwrap();
        assert!(script.render().contains(r#"db.createCollection("we\"ird");"#));
    }

    #[test]
    fn write_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init").join("mongo-init.js");
        MongoInitScript::new().write_to(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("print(\"initialization complete\");\n"));
    }
}
