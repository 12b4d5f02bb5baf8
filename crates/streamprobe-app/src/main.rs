//! # streamprobe
//!
//! 재생 계측 실행 파일 진입점.
//! 설정 로드, 로그 초기화, 하위 명령 실행.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use streamprobe_app::lifecycle::LifecycleManager;
use streamprobe_app::provisioning::{self, Backend};
use streamprobe_app::{replay, ConfigOverrides};
use streamprobe_core::config::AppConfig;
use streamprobe_core::config_manager::ConfigManager;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "streamprobe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 수집 서버 URL
    #[arg(long, short = 's')]
    server: Option<String>,

    /// 실험 ID
    #[arg(long, short = 'e')]
    experiment: Option<String>,

    /// 주기 샘플링 간격 (밀리초, 0이면 비활성)
    #[arg(long)]
    sample_interval_ms: Option<u64>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 재생 트레이스를 재생하며 메트릭 전송
    Replay {
        /// 트레이스 JSON 파일
        #[arg(long, short = 't')]
        trace: PathBuf,

        /// 트레이스 종료 후 샘플링을 계속할 시간 (초)
        #[arg(long, default_value = "0")]
        linger_secs: u64,
    },
    /// 문서 저장소 프로비저닝
    Provision {
        #[arg(long, value_enum, default_value = "sqlite")]
        backend: Backend,

        /// SQLite 파일 또는 스크립트 출력 경로
        #[arg(long, short = 'o')]
        out: PathBuf,
    },
    /// 적용된 설정 출력
    PrintConfig,
    /// 설정 파일 관리
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// `section.field` 값 변경 후 저장 (예: `player.sample_interval_ms 2000`)
    Set { key: String, value: String },
    /// 설정 파일 경로 출력
    Path,
}

fn open_config(args: &Args) -> Result<ConfigManager> {
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };
    info!("설정 파일: {}", manager.config_path().display());
    Ok(manager)
}

/// 파일 + 환경 변수 + 명령줄 순으로 적용한 설정
fn effective_config(args: &Args, manager: &ConfigManager) -> AppConfig {
    let overrides = ConfigOverrides {
        server: args.server.clone(),
        experiment: args.experiment.clone(),
        sample_interval_ms: args.sample_interval_ms,
    };
    overrides.apply(manager.get())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "streamprobe={l},streamprobe_app={l},streamprobe_core={l},streamprobe_player={l},streamprobe_network={l},streamprobe_storage={l}",
        l = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let mut manager = open_config(&args)?;
    let config = effective_config(&args, &manager);

    match &args.command {
        Command::Replay { trace, linger_secs } => {
            let lifecycle = Arc::new(LifecycleManager::new());
            let signal_lifecycle = lifecycle.clone();
            let signal_task = tokio::spawn(async move {
                signal_lifecycle.wait_for_signal().await;
            });

            let summary = replay::run(
                &config,
                trace,
                Duration::from_secs(*linger_secs),
                &lifecycle,
            )
            .await;
            signal_task.abort();
            let summary = summary?;

            info!(
                "재생 완료: 단계 {}개, 핸들러 호출 {}회{}",
                summary.outcome.steps,
                summary.outcome.deliveries,
                if summary.outcome.interrupted { " (중단됨)" } else { "" }
            );
            print!("{}", summary.tally.render());
            if summary.unfinished_submits > 0 {
                println!("{:<28} {:>6}", "unfinished", summary.unfinished_submits);
            }
        }
        Command::Provision { backend, out } => {
            let report = provisioning::run(&config, *backend, out).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Config { action } => match action {
            ConfigAction::Set { key, value } => {
                manager.set(key, value)?;
                println!("{key} = {value}");
            }
            ConfigAction::Path => {
                println!("{}", manager.config_path().display());
            }
        },
    }

    Ok(())
}
