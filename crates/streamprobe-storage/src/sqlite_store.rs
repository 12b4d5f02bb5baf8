//! SQLite 문서 저장소 어댑터.
//!
//! `DocumentStoreAdmin` 포트 구현. 컬렉션은 메트릭 레코드 컬럼을 가진 테이블이 되고,
//! 자격증명은 카탈로그 테이블에 SHA-256 다이제스트로 기록된다.
//! 모든 생성 연산은 멱등이다.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use streamprobe_core::error::CoreError;
use streamprobe_core::models::provisioning::{IndexSpec, SortOrder, UserGrant};
use streamprobe_core::ports::document_store::DocumentStoreAdmin;
use tracing::{debug, info};

use crate::migration;

/// 인덱스로 쓸 수 있는 컬렉션 컬럼
pub const INDEXABLE_COLUMNS: [&str; 6] = [
    "experiment_id",
    "timestamp",
    "event_type",
    "protocol",
    "video_id",
    "stored_at",
];

/// 비밀번호 SHA-256 다이제스트 (hex)
pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 컬렉션 테이블 이름 (`{database}.{collection}`)
pub fn table_name(database: &str, collection: &str) -> String {
    format!("{database}.{collection}")
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite 문서 저장소
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// 파일 기반 저장소 열기
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        info!("SQLite 문서 저장소 초기화: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 인메모리 저장소 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))
    }

    /// 카탈로그에서 컬렉션 테이블 조회
    fn collection_table(
        conn: &Connection,
        database: &str,
        collection: &str,
    ) -> Result<Option<String>, CoreError> {
        conn.query_row(
            "SELECT table_name FROM collections WHERE database = ?1 AND name = ?2",
            params![database, collection],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CoreError::Storage(format!("컬렉션 조회 실패: {e}")))
    }

    fn require_collection(
        conn: &Connection,
        database: &str,
        collection: &str,
    ) -> Result<String, CoreError> {
        Self::collection_table(conn, database, collection)?.ok_or_else(|| {
            CoreError::Storage(format!("컬렉션 없음: {database}.{collection}"))
        })
    }

    /// 카탈로그에 기록된 인덱스 이름 (생성 순)
    pub fn index_names(&self, database: &str, collection: &str) -> Result<Vec<String>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM collection_indexes
                 WHERE database = ?1 AND collection = ?2 ORDER BY rowid",
            )
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let names = stmt
            .query_map(params![database, collection], |row| row.get(0))
            .map_err(|e| CoreError::Storage(format!("인덱스 조회 실패: {e}")))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| CoreError::Storage(format!("인덱스 조회 실패: {e}")))?;
        Ok(names)
    }

    /// 컬렉션 테이블에 실제로 존재하는 SQLite 인덱스 수
    pub fn physical_index_count(&self, database: &str, collection: &str) -> Result<usize, CoreError> {
        let conn = self.lock()?;
        let table = Self::require_collection(&conn, database, collection)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'index' AND tbl_name = ?1 AND name NOT LIKE 'sqlite_autoindex%'",
                params![table],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::Storage(format!("인덱스 조회 실패: {e}")))?;
        Ok(count.max(0) as usize)
    }

    /// DB에 등록된 사용자 목록
    pub fn users(&self, database: &str) -> Result<Vec<String>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT user FROM grants WHERE database = ?1 ORDER BY user")
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;
        let users = stmt
            .query_map(params![database], |row| row.get(0))
            .map_err(|e| CoreError::Storage(format!("사용자 조회 실패: {e}")))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| CoreError::Storage(format!("사용자 조회 실패: {e}")))?;
        Ok(users)
    }

    /// 비밀번호 확인 (사용자가 없으면 `false`)
    pub fn verify_password(
        &self,
        database: &str,
        user: &str,
        password: &str,
    ) -> Result<bool, CoreError> {
        let conn = self.lock()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT password_sha256 FROM grants WHERE database = ?1 AND user = ?2",
                params![database, user],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CoreError::Storage(format!("사용자 조회 실패: {e}")))?;
        Ok(stored.is_some_and(|digest| digest == password_digest(password)))
    }
}

#[async_trait]
impl DocumentStoreAdmin for SqliteDocumentStore {
    async fn create_user(&self, database: &str, grant: &UserGrant) -> Result<(), CoreError> {
        let roles = serde_json::to_string(&grant.roles)?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO grants (database, user, password_sha256, roles, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(database, user) DO UPDATE SET
                password_sha256 = excluded.password_sha256,
                roles = excluded.roles",
            params![
                database,
                grant.user,
                password_digest(&grant.password),
                roles,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| CoreError::Storage(format!("사용자 생성 실패: {e}")))?;

        debug!("사용자 생성: {}@{database}", grant.user);
        Ok(())
    }

    async fn create_collection(&self, database: &str, collection: &str) -> Result<(), CoreError> {
        let table = table_name(database, collection);
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 시작 실패: {e}")))?;

        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                experiment_id TEXT NOT NULL,
                timestamp REAL NOT NULL,
                event_type TEXT NOT NULL,
                protocol TEXT NOT NULL,
                video_id TEXT NOT NULL,
                payload TEXT NOT NULL DEFAULT '{{}}',
                stored_at TEXT NOT NULL
            );",
            quote_ident(&table)
        ))
        .map_err(|e| CoreError::Storage(format!("컬렉션 테이블 생성 실패: {e}")))?;

        tx.execute(
            "INSERT OR IGNORE INTO collections (database, name, table_name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![database, collection, table, Utc::now().to_rfc3339()],
        )
        .map_err(|e| CoreError::Storage(format!("컬렉션 등록 실패: {e}")))?;

        tx.commit()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 커밋 실패: {e}")))?;

        debug!("컬렉션 생성: {table}");
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
        for key in &index.keys {
            if !INDEXABLE_COLUMNS.contains(&key.field.as_str()) {
                return Err(CoreError::validation(
                    "index",
                    format!("인덱스 불가 필드: {}", key.field),
                ));
            }
        }

        let name = index.name();
        let columns = index
            .keys
            .iter()
            .map(|k| {
                let order = match k.order {
                    SortOrder::Ascending => "ASC",
                    SortOrder::Descending => "DESC",
                };
                format!("{} {order}", quote_ident(&k.field))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let keys = serde_json::to_string(&index.keys)?;

        let mut conn = self.lock()?;
        let table = Self::require_collection(&conn, database, collection)?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 시작 실패: {e}")))?;

        tx.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({columns});",
            quote_ident(&format!("{table}.{name}")),
            quote_ident(&table),
        ))
        .map_err(|e| CoreError::Storage(format!("인덱스 생성 실패: {e}")))?;

        tx.execute(
            "INSERT OR IGNORE INTO collection_indexes (database, collection, name, keys, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![database, collection, name, keys, Utc::now().to_rfc3339()],
        )
        .map_err(|e| CoreError::Storage(format!("인덱스 등록 실패: {e}")))?;

        tx.commit()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 커밋 실패: {e}")))?;

        debug!("인덱스 생성: {table}.{name}");
        Ok(name)
    }
}
