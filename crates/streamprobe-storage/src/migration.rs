//! 메타데이터 스키마 마이그레이션.
//!
//! 버전 기반 SQLite 스키마 관리. 컬렉션 테이블은 프로비저닝 시점에 만들어지고,
//! 여기서는 자격증명/컬렉션/인덱스 카탈로그만 관리한다.

use rusqlite::Connection;
use tracing::{debug, info};

/// 현재 스키마 버전
const CURRENT_VERSION: u32 = 2;

/// 스키마 마이그레이션 실행
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = get_version(conn)?;
    info!("현재 스키마 버전: {current}, 목표: {CURRENT_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// 현재 스키마 버전 조회
fn get_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    let result: Result<u32, _> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );
    result.or(Ok(0))
}

/// V1: 자격증명 + 컬렉션 카탈로그
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V1 실행: grants + collections 테이블");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS grants (
            database TEXT NOT NULL,
            user TEXT NOT NULL,
            password_sha256 TEXT NOT NULL,
            roles TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (database, user)
        );

        CREATE TABLE IF NOT EXISTS collections (
            database TEXT NOT NULL,
            name TEXT NOT NULL,
            table_name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            PRIMARY KEY (database, name)
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )?;

    Ok(())
}

/// V2: 인덱스 카탈로그
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V2 실행: collection_indexes 테이블");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS collection_indexes (
            database TEXT NOT NULL,
            collection TEXT NOT NULL,
            name TEXT NOT NULL,
            keys TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (database, collection, name)
        );

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )?;

    Ok(())
}
