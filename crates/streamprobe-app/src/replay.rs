//! `replay` 명령.
//!
//! 트레이스를 스크립트 엔진으로 재생하면서 실제 수집 서버로 메트릭을 전송한다.
//! 트레이스 종료(+대기 시간) 또는 종료 시그널에서 파이프라인을 해제한다.

use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use streamprobe_core::config::AppConfig;
use streamprobe_core::ports::video_surface::VideoSurface;
use streamprobe_network::http_sink::HttpMetricsSink;
use streamprobe_player::simulated::ScriptedEngineFactory;
use streamprobe_player::trace::{self, PlaybackTrace, ReplayOutcome};
use streamprobe_player::{MetricsPipeline, PipelineSettings};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::lifecycle::LifecycleManager;
use crate::tally::{self, EventTally};

/// 관찰 채널 용량
const TALLY_CHANNEL_CAPACITY: usize = 1024;
/// 해제 후 집계 태스크 대기 한도
const TALLY_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
/// 해제 후 남은 전송 대기 한도
const SUBMIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// 재생 요약
#[derive(Debug)]
pub struct ReplaySummary {
    pub outcome: ReplayOutcome,
    pub tally: EventTally,
    /// 대기 한도 안에 끝나지 않은 전송 수
    pub unfinished_submits: usize,
}

/// 트레이스 재생 실행
pub async fn run(
    config: &AppConfig,
    trace_path: &Path,
    linger: Duration,
    lifecycle: &LifecycleManager,
) -> Result<ReplaySummary> {
    let playback = PlaybackTrace::load(trace_path)
        .map_err(|e| anyhow!("트레이스 로드 실패 ({}): {e}", trace_path.display()))?;

    let sink = Arc::new(HttpMetricsSink::new(&config.server.base_url)?);
    let factory = Arc::new(ScriptedEngineFactory::new(playback.ladder()));
    let video = Arc::new(playback.video());

    let (event_tx, event_rx) = broadcast::channel(TALLY_CHANNEL_CAPACITY);
    let tally_task = tally::spawn(event_rx);

    let mut pipeline = MetricsPipeline::new(
        PipelineSettings::from_config(config),
        factory.clone(),
        Some(video.clone() as Arc<dyn VideoSurface>),
        sink,
    )
    .with_event_tx(event_tx);

    info!(
        "재생 시작: target={}, server={}, experiment={}",
        playback.target, config.server.base_url, config.experiment.experiment_id
    );
    pipeline.initialize(&playback.target);

    let engine = factory
        .latest()
        .ok_or_else(|| anyhow!("엔진 인스턴스가 생성되지 않음"))?;

    let outcome = trace::replay(&playback, &engine, &video, lifecycle.subscribe()).await;

    if !outcome.interrupted && !linger.is_zero() {
        info!("트레이스 종료, {}초 대기", linger.as_secs_f64());
        lifecycle.sleep_or_shutdown(linger).await;
    }

    pipeline.teardown();
    if !pipeline.drain(SUBMIT_DRAIN_TIMEOUT).await {
        warn!(
            "전송 대기 시간 초과: {}건 미완료",
            pipeline.pending_submits()
        );
    }
    let unfinished_submits = pipeline.pending_submits();
    drop(pipeline);

    let tally = match tokio::time::timeout(TALLY_DRAIN_TIMEOUT, tally_task).await {
        Ok(Ok(tally)) => tally,
        Ok(Err(e)) => {
            warn!("집계 태스크 실패: {e}");
            EventTally::default()
        }
        Err(_) => {
            warn!("집계 태스크 대기 시간 초과");
            EventTally::default()
        }
    };

    Ok(ReplaySummary {
        outcome,
        tally,
        unfinished_submits,
    })
}
