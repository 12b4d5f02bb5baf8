//! 메트릭 파이프라인 라이프사이클.
//!
//! `initialize`는 이전 엔진 인스턴스를 해제한 뒤 새 인스턴스를 만들고,
//! 고정 이벤트 집합을 구독하고, 주기 샘플러를 시작한다.
//! 해제 순서: 세션 비활성화 → 구독 해제 → 샘플러 취소 → 엔진 해제.
//! 해제 후에도 남은 전송은 `drain`으로 기다린다.

use std::sync::Arc;
use std::time::Duration;
use streamprobe_core::config::AppConfig;
use streamprobe_core::models::metric::{MetricEventType, MetricRecord, Payload};
use streamprobe_core::ports::metrics_sink::MetricsSink;
use streamprobe_core::ports::player_engine::{PlayerEngine, PlayerEngineFactory};
use streamprobe_core::ports::video_surface::VideoSurface;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::dispatcher::{MetricDispatcher, SubmitTracker};
use crate::emitter::SessionEmitter;
use crate::handlers::{self, HandlerContext};
use crate::sampler::PeriodicSampler;
use crate::session::SessionContext;
use crate::status::StatusBoard;
use crate::subscriptions::SubscriptionTable;

/// 파이프라인 설정
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// 메트릭 제출 기본 URL
    pub server_endpoint: String,
    pub experiment_id: String,
    /// 레코드 `protocol` 리터럴
    pub protocol: String,
    /// 주기 샘플러 간격 (0이면 비활성)
    pub sample_interval: Duration,
    /// 엔진 초기화 시 자동 재생
    pub autoplay: bool,
    /// 상태 보드 로그 보관 줄 수
    pub status_log_capacity: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            server_endpoint: config.server.base_url.clone(),
            experiment_id: config.experiment.experiment_id.clone(),
            protocol: config.experiment.protocol.clone(),
            sample_interval: config.sample_interval(),
            autoplay: config.player.autoplay,
            status_log_capacity: config.player.status_log_capacity,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default_config())
    }
}

/// 활성 엔진 인스턴스와 그 세션 자원
struct ActivePlayer {
    engine: Arc<dyn PlayerEngine>,
    emitter: Arc<SessionEmitter>,
    subscriptions: SubscriptionTable,
    sampler: Option<PeriodicSampler>,
}

/// 메트릭 파이프라인
pub struct MetricsPipeline {
    settings: PipelineSettings,
    engine_factory: Arc<dyn PlayerEngineFactory>,
    video: Option<Arc<dyn VideoSurface>>,
    sink: Arc<dyn MetricsSink>,
    event_tx: Option<broadcast::Sender<MetricRecord>>,
    status: Arc<StatusBoard>,
    /// 모든 세션의 진행 중 전송
    submits: Arc<SubmitTracker>,
    active: Option<ActivePlayer>,
}

impl MetricsPipeline {
    /// 파이프라인 생성 (엔진은 `initialize`에서 만든다)
    ///
    /// `video`가 없으면 주기 샘플러는 틱마다 아무것도 내보내지 않는다.
    pub fn new(
        settings: PipelineSettings,
        engine_factory: Arc<dyn PlayerEngineFactory>,
        video: Option<Arc<dyn VideoSurface>>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        let status = Arc::new(StatusBoard::new(settings.status_log_capacity));
        Self {
            settings,
            engine_factory,
            video,
            sink,
            event_tx: None,
            status,
            submits: Arc::new(SubmitTracker::default()),
            active: None,
        }
    }

    /// 전송 레코드 관찰 채널 설정
    pub fn with_event_tx(mut self, event_tx: broadcast::Sender<MetricRecord>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// 재생 타깃으로 플레이어 (재)초기화
    pub fn initialize(&mut self, media_target: &str) {
        self.teardown();

        self.status.set_status("Initializing player...");
        self.status.log_event(format!("Loading MPD: {media_target}"));

        let engine = self.engine_factory.create();
        engine.initialize(media_target, self.settings.autoplay);

        let dispatcher = Arc::new(
            MetricDispatcher::new(self.sink.clone())
                .with_event_tx(self.event_tx.clone())
                .with_tracker(self.submits.clone()),
        );
        let context = SessionContext::new(
            self.settings.server_endpoint.clone(),
            self.settings.experiment_id.clone(),
            media_target,
        );
        let emitter = Arc::new(SessionEmitter::new(
            context,
            dispatcher,
            self.settings.protocol.clone(),
        ));

        let mut subscriptions = SubscriptionTable::new(engine.clone());
        handlers::register(
            &mut subscriptions,
            Arc::new(HandlerContext {
                emitter: emitter.clone(),
                engine: Arc::downgrade(&engine),
                status: self.status.clone(),
                media_target: media_target.to_string(),
            }),
        );

        let sampler = self.spawn_sampler(emitter.clone());

        self.active = Some(ActivePlayer {
            engine,
            emitter,
            subscriptions,
            sampler,
        });

        self.status.set_status("Player initialized");
        info!(
            "플레이어 초기화: target={media_target}, experiment={}",
            self.settings.experiment_id
        );
    }

    fn spawn_sampler(&self, emitter: Arc<SessionEmitter>) -> Option<PeriodicSampler> {
        let video = self.video.clone();
        let status = self.status.clone();
        PeriodicSampler::spawn(self.settings.sample_interval, move || {
            let Some(video) = video.as_deref() else {
                return;
            };
            emitter.emit_with(|ctx| {
                Some((
                    MetricEventType::PeriodicMetrics,
                    handlers::sample_payload(video, ctx, &status),
                ))
            });
        })
    }

    /// 현재 엔진 인스턴스 해제 (없으면 아무것도 하지 않음)
    ///
    /// 반환 이후 이전 세션의 레코드는 더 이상 생성되지 않는다.
    pub fn teardown(&mut self) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };

        active.emitter.deactivate();
        let removed = active.subscriptions.unbind_all();
        if let Some(sampler) = active.sampler.take() {
            sampler.cancel();
        }
        active.engine.destroy();

        debug!("플레이어 해제: 구독 {removed}개 해제");
        true
    }

    /// 진행 중 전송이 끝날 때까지 대기 (최대 `timeout`)
    ///
    /// 프로세스 종료 전에 호출한다. 모두 끝났으면 `true`.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.submits.drain(timeout).await
    }

    /// 아직 끝나지 않은 전송 수
    pub fn pending_submits(&self) -> usize {
        self.submits.pending()
    }

    /// 현재 세션 컨텍스트로 레코드 전송
    ///
    /// 활성 세션이 없으면 `false`.
    pub fn emit(&self, event_type: MetricEventType, payload: Payload) -> bool {
        match &self.active {
            Some(active) => active.emitter.emit(event_type, payload),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// 현재 세션 컨텍스트 복제본
    pub fn session(&self) -> Option<SessionContext> {
        self.active.as_ref().map(|a| a.emitter.snapshot())
    }

    pub fn engine(&self) -> Option<Arc<dyn PlayerEngine>> {
        self.active.as_ref().map(|a| a.engine.clone())
    }

    pub fn status(&self) -> Arc<StatusBoard> {
        self.status.clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.active
            .as_ref()
            .map(|a| a.subscriptions.len())
            .unwrap_or(0)
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }
}

impl Drop for MetricsPipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}
