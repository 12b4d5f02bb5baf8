//! `provision` 명령.

use anyhow::Result;
use clap::ValueEnum;
use std::path::Path;
use streamprobe_core::config::AppConfig;
use streamprobe_core::models::provisioning::ProvisioningPlan;
use streamprobe_storage::{provision, MongoInitScript, ProvisioningReport, SqliteDocumentStore};
use tracing::info;

/// 프로비저닝 대상
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// SQLite 파일에 직접 적용
    Sqlite,
    /// 문서 DB 셸 초기화 스크립트 생성
    MongoScript,
}

/// 설정의 프로비저닝 계획을 대상에 적용
pub async fn run(config: &AppConfig, backend: Backend, out: &Path) -> Result<ProvisioningReport> {
    let plan = ProvisioningPlan::from_config(&config.provisioning);

    let report = match backend {
        Backend::Sqlite => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let store = SqliteDocumentStore::open(out)?;
            provision(&store, &plan).await?
        }
        Backend::MongoScript => {
            let script = MongoInitScript::new();
            let report = provision(&script, &plan).await?;
            script.write_to(out)?;
            report
        }
    };

    info!("프로비저닝 대상 {:?}: {}", backend, out.display());
    Ok(report)
}
