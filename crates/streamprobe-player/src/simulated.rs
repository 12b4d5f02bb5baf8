//! 스크립트 엔진과 시뮬레이션 비디오.
//!
//! 실제 엔진 없이 파이프라인을 구동하기 위한 포트 구현.
//! `ScriptedEngine::fire`로 알림을 직접 발행하고,
//! `SimulatedVideo`는 tokio 시계로 재생 위치를 계산한다.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use streamprobe_core::models::engine::{EngineEvent, EngineEventKind, MediaType};
use streamprobe_core::ports::player_engine::{
    BitrateInfo, EngineHandler, PlayerEngine, PlayerEngineFactory, SubscriptionId,
};
use streamprobe_core::ports::video_surface::{VideoPlaybackQuality, VideoSurface};
use tokio::time::Instant;
use tracing::debug;

/// 시뮬레이션 프레임 레이트 (전체 프레임 수 추정용)
const SIMULATED_FPS: f64 = 30.0;

/// 비트레이트 목록으로 품질 사다리 생성
pub fn bitrate_ladder(bitrates: &[u64]) -> Vec<BitrateInfo> {
    bitrates
        .iter()
        .enumerate()
        .map(|(index, bitrate)| BitrateInfo {
            quality_index: index as u32,
            bitrate: *bitrate,
            width: None,
            height: None,
        })
        .collect()
}

#[derive(Default)]
struct EngineState {
    handlers: HashMap<EngineEventKind, Vec<(SubscriptionId, EngineHandler)>>,
    next_id: SubscriptionId,
    target: Option<String>,
    autoplay: bool,
    qualities: HashMap<MediaType, u32>,
    destroyed: bool,
}

/// 스크립트 엔진
pub struct ScriptedEngine {
    bitrates: Vec<BitrateInfo>,
    introspection: bool,
    state: Mutex<EngineState>,
}

impl ScriptedEngine {
    pub fn new(bitrates: Vec<BitrateInfo>) -> Self {
        Self {
            bitrates,
            introspection: true,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// 품질/비트레이트 조회를 지원하지 않는 엔진
    pub fn without_introspection(mut self) -> Self {
        self.introspection = false;
        self
    }

    /// 알림 발행, 호출된 핸들러 수 반환
    ///
    /// 핸들러는 잠금 밖에서 호출되므로 핸들러 안에서 조회 메서드를 불러도 된다.
    pub fn fire(&self, event: &EngineEvent) -> usize {
        let handlers: Vec<EngineHandler> = {
            let mut state = self.state.lock();
            if state.destroyed {
                debug!("해제된 엔진, 알림 무시: {:?}", event.kind());
                return 0;
            }
            if let EngineEvent::QualityChangeRendered {
                media_type,
                new_quality: Some(quality),
                ..
            } = event
            {
                state
                    .qualities
                    .insert(media_type.unwrap_or(MediaType::Video), *quality);
            }
            state
                .handlers
                .get(&event.kind())
                .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// 등록된 전체 핸들러 수
    pub fn handler_count(&self) -> usize {
        self.state.lock().handlers.values().map(Vec::len).sum()
    }

    pub fn target(&self) -> Option<String> {
        self.state.lock().target.clone()
    }

    pub fn autoplay(&self) -> bool {
        self.state.lock().autoplay
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }
}

impl PlayerEngine for ScriptedEngine {
    fn initialize(&self, target: &str, autoplay: bool) {
        let mut state = self.state.lock();
        state.target = Some(target.to_string());
        state.autoplay = autoplay;
    }

    fn on(&self, kind: EngineEventKind, handler: EngineHandler) -> SubscriptionId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    fn off(&self, kind: EngineEventKind, id: SubscriptionId) {
        let mut state = self.state.lock();
        if let Some(list) = state.handlers.get_mut(&kind) {
            list.retain(|(existing, _)| *existing != id);
            if list.is_empty() {
                state.handlers.remove(&kind);
            }
        }
    }

    fn destroy(&self) {
        self.state.lock().destroyed = true;
    }

    fn quality_for(&self, media_type: MediaType) -> Option<u32> {
        if !self.introspection {
            return None;
        }
        Some(
            self.state
                .lock()
                .qualities
                .get(&media_type)
                .copied()
                .unwrap_or(0),
        )
    }

    fn bitrate_info_list_for(&self, media_type: MediaType) -> Option<Vec<BitrateInfo>> {
        if !self.introspection {
            return None;
        }
        match media_type {
            MediaType::Video => Some(self.bitrates.clone()),
            _ => Some(Vec::new()),
        }
    }
}

/// 스크립트 엔진 생성기
///
/// 생성한 인스턴스를 보관해 테스트/재생기가 알림을 발행할 수 있게 한다.
pub struct ScriptedEngineFactory {
    bitrates: Vec<BitrateInfo>,
    introspection: bool,
    created: Mutex<Vec<Arc<ScriptedEngine>>>,
}

impl ScriptedEngineFactory {
    pub fn new(bitrates: Vec<BitrateInfo>) -> Self {
        Self {
            bitrates,
            introspection: true,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn without_introspection(mut self) -> Self {
        self.introspection = false;
        self
    }

    /// 가장 최근에 생성된 엔진
    pub fn latest(&self) -> Option<Arc<ScriptedEngine>> {
        self.created.lock().last().cloned()
    }

    pub fn created(&self) -> Vec<Arc<ScriptedEngine>> {
        self.created.lock().clone()
    }
}

impl PlayerEngineFactory for ScriptedEngineFactory {
    fn create(&self) -> Arc<dyn PlayerEngine> {
        let mut engine = ScriptedEngine::new(self.bitrates.clone());
        if !self.introspection {
            engine = engine.without_introspection();
        }
        let engine = Arc::new(engine);
        self.created.lock().push(engine.clone());
        engine
    }
}

struct VideoClock {
    /// 마지막 기준 시점의 재생 위치 (초)
    position: f64,
    /// 재생 중이면 기준 시점
    anchor: Option<Instant>,
    rate: f64,
    dropped_frames: u64,
}

/// 시뮬레이션 비디오
pub struct SimulatedVideo {
    duration: Option<f64>,
    quality_stats: bool,
    clock: Mutex<VideoClock>,
}

impl SimulatedVideo {
    /// `duration`이 없으면 메타데이터 로드 전처럼 NaN을 보고한다
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration,
            quality_stats: true,
            clock: Mutex::new(VideoClock {
                position: 0.0,
                anchor: None,
                rate: 1.0,
                dropped_frames: 0,
            }),
        }
    }

    /// 프레임 품질 통계를 지원하지 않는 비디오
    pub fn without_quality_stats(mut self) -> Self {
        self.quality_stats = false;
        self
    }

    pub fn play(&self) {
        let mut clock = self.clock.lock();
        if clock.anchor.is_none() {
            clock.anchor = Some(Instant::now());
        }
    }

    pub fn pause(&self) {
        let mut clock = self.clock.lock();
        self.settle(&mut clock);
        clock.anchor = None;
    }

    pub fn set_playback_rate(&self, rate: f64) {
        let mut clock = self.clock.lock();
        self.settle(&mut clock);
        clock.rate = rate.max(0.0);
    }

    pub fn set_dropped_frames(&self, dropped: u64) {
        self.clock.lock().dropped_frames = dropped;
    }

    pub fn is_playing(&self) -> bool {
        self.clock.lock().anchor.is_some()
    }

    /// 경과 시간을 위치에 반영하고 기준 시점 갱신
    fn settle(&self, clock: &mut VideoClock) {
        if let Some(anchor) = clock.anchor {
            let now = Instant::now();
            clock.position = self.position_at(clock, anchor, now);
            clock.anchor = Some(now);
        }
    }

    fn position_at(&self, clock: &VideoClock, anchor: Instant, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(anchor).as_secs_f64();
        self.clamp(clock.position + elapsed * clock.rate)
    }

    fn clamp(&self, position: f64) -> f64 {
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

impl VideoSurface for SimulatedVideo {
    fn playback_rate(&self) -> f64 {
        self.clock.lock().rate
    }

    fn current_time(&self) -> f64 {
        let clock = self.clock.lock();
        match clock.anchor {
            Some(anchor) => self.position_at(&clock, anchor, Instant::now()),
            None => clock.position,
        }
    }

    fn duration(&self) -> f64 {
        self.duration.unwrap_or(f64::NAN)
    }

    fn playback_quality(&self) -> Option<VideoPlaybackQuality> {
        if !self.quality_stats {
            return None;
        }
        let total = (self.current_time() * SIMULATED_FPS) as u64;
        let dropped = self.clock.lock().dropped_frames;
        Some(VideoPlaybackQuality {
            dropped_video_frames: dropped,
            total_video_frames: total.max(dropped),
        })
    }
}
