//! 엔진 알림 → 메트릭 변환.
//!
//! 각 알림은 (메트릭 유형, 페이로드) 하나로 정규화된다.
//! 필수 데이터가 없는 알림은 아무것도 내보내지 않는다.
//! 엔진/비디오의 조회 기능이 없으면 0 또는 null로 대체한다.

use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use streamprobe_core::models::engine::{EngineEvent, EngineEventKind, MediaType, PlaybackState};
use streamprobe_core::models::metric::{payload_from, MetricEventType, Payload};
use streamprobe_core::ports::player_engine::PlayerEngine;
use streamprobe_core::ports::video_surface::VideoSurface;
use tracing::debug;

use crate::emitter::SessionEmitter;
use crate::session::{PairedTransition, SessionContext};
use crate::status::{
    StatusBoard, DISPLAY_BUFFER_LEVEL, DISPLAY_CURRENT_BITRATE, DISPLAY_DROPPED_FRAMES,
    DISPLAY_PLAYBACK_RATE,
};
use crate::subscriptions::SubscriptionTable;

/// 핸들러가 공유하는 세션 자원
pub struct HandlerContext {
    pub emitter: Arc<SessionEmitter>,
    /// 엔진 → 핸들러 → 엔진 순환 참조 방지
    pub engine: Weak<dyn PlayerEngine>,
    pub status: Arc<StatusBoard>,
    /// 세션 시작 시점의 재생 타깃
    pub media_target: String,
}

impl HandlerContext {
    /// 알림 하나 처리
    pub fn handle(&self, event: &EngineEvent) {
        let engine = self.engine.upgrade();
        let emitted = self.emitter.emit_with(|session| {
            translate(
                event,
                session,
                engine.as_deref(),
                &self.media_target,
                &self.status,
            )
        });
        if !emitted {
            debug!("알림 무시: {:?}", event.kind());
        }
    }
}

/// 고정 이벤트 집합 전체 구독
pub fn register(table: &mut SubscriptionTable, ctx: Arc<HandlerContext>) {
    for kind in EngineEventKind::ALL {
        let ctx = ctx.clone();
        table.bind(kind, Arc::new(move |event: &EngineEvent| ctx.handle(event)));
    }
}

/// 알림 하나를 메트릭으로 변환
///
/// 세션 추적값과 상태 보드 갱신을 같이 수행한다.
pub fn translate(
    event: &EngineEvent,
    ctx: &mut SessionContext,
    engine: Option<&dyn PlayerEngine>,
    media_target: &str,
    status: &StatusBoard,
) -> Option<(MetricEventType, Payload)> {
    match event {
        EngineEvent::StreamInitialized => {
            status.set_status("Stream initialized");
            status.log_event("Stream initialized");
            Some((
                MetricEventType::StreamInitialized,
                payload_from([("mpd_url", json!(media_target))]),
            ))
        }

        EngineEvent::FragmentLoadingStarted { request } => {
            let request = request.as_ref()?;
            Some((
                MetricEventType::FragmentLoadingStarted,
                payload_from([
                    ("type", json!(request.request_type)),
                    ("url", json!(request.url)),
                    ("media_type", json!(request.media_type)),
                ]),
            ))
        }

        EngineEvent::FragmentLoadingCompleted { request } => {
            let request = request.as_ref()?;
            let quality = engine.and_then(|e| e.quality_for(MediaType::Video));
            Some((
                MetricEventType::FragmentLoadingCompleted,
                payload_from([
                    ("type", json!(request.request_type)),
                    ("url", json!(request.url)),
                    ("quality", json!(quality)),
                    ("media_type", json!(request.media_type)),
                    ("start_time", number_or_null(request.start_time)),
                    ("duration", number_or_null(request.duration)),
                ]),
            ))
        }

        EngineEvent::QualityChangeRendered {
            old_quality,
            new_quality,
            ..
        } => {
            let new_quality = (*new_quality)?;
            let bitrate = video_bitrate(engine, new_quality);
            ctx.record_bitrate(bitrate);

            status.update_metric(
                DISPLAY_CURRENT_BITRATE,
                format!("{:.0} kbps", bitrate as f64 / 1000.0),
            );
            status.log_event(format!("Quality change: {bitrate} bps"));

            Some((
                MetricEventType::QualityChangeRendered,
                payload_from([
                    ("old_quality", json!(old_quality)),
                    ("new_quality", json!(new_quality)),
                    ("bitrate", json!(bitrate)),
                ]),
            ))
        }

        EngineEvent::BufferLevelUpdated {
            media_type,
            buffer_level,
        } => {
            let level = (*buffer_level)?;
            // 추적값만 보정하고 페이로드는 엔진 값 그대로
            ctx.record_buffer_level(level);
            status.update_metric(DISPLAY_BUFFER_LEVEL, format!("{level:.2}s"));
            Some((
                MetricEventType::BufferLevelUpdated,
                payload_from([
                    ("buffer_level", number_or_null(Some(level))),
                    ("media_type", json!(media_type)),
                ]),
            ))
        }

        EngineEvent::PlaybackStateChanged { state } => {
            let new_state = state.clone()?;
            match ctx.record_state(new_state.clone()) {
                Some(PairedTransition::Paused) => status.log_event("Playback paused"),
                Some(PairedTransition::Resumed) => status.log_event("Playback resumed"),
                None => {}
            }
            // 덮어쓴 뒤에 읽으므로 old_state == new_state (수집 서버 호환)
            Some((
                MetricEventType::PlaybackStateChanged,
                payload_from([
                    ("old_state", state_value(&ctx.last_playback_state)),
                    ("new_state", state_value(&new_state)),
                ]),
            ))
        }

        EngineEvent::Error { error } => {
            let error = error.as_ref()?;
            let message = error.message.as_deref().unwrap_or("Unknown error");
            status.log_event(format!("ERROR: {message}"));
            Some((
                MetricEventType::PlaybackError,
                payload_from([
                    ("error_code", json!(error.code)),
                    ("error_message", json!(error.message)),
                    ("error_data", error.data.clone().unwrap_or(Value::Null)),
                ]),
            ))
        }

        EngineEvent::PlaybackStalled => {
            let count = ctx.record_stall();
            status.log_event(format!("Rebuffer detected (#{count})"));
            Some((
                MetricEventType::RebufferEvent,
                payload_from([
                    ("rebuffer_count", json!(count)),
                    ("buffer_level", json!(ctx.last_buffer_level)),
                    ("current_bitrate", json!(ctx.last_bitrate)),
                ]),
            ))
        }

        EngineEvent::PlaybackStarted => {
            status.set_status("Playing");
            status.log_event("Playback started");
            Some((
                MetricEventType::PlaybackStarted,
                payload_from([("mpd_url", json!(media_target))]),
            ))
        }

        EngineEvent::PlaybackEnded => {
            status.set_status("Playback ended");
            status.log_event("Playback ended");
            Some((
                MetricEventType::PlaybackEnded,
                payload_from([("total_rebuffers", json!(ctx.rebuffer_count))]),
            ))
        }
    }
}

/// 주기 샘플 페이로드
pub fn sample_payload(
    video: &dyn VideoSurface,
    ctx: &SessionContext,
    status: &StatusBoard,
) -> Payload {
    let playback_rate = video.playback_rate();
    let dropped_frames = video
        .playback_quality()
        .map(|q| q.dropped_video_frames)
        .unwrap_or(0);

    status.update_metric(DISPLAY_PLAYBACK_RATE, format!("{playback_rate:.2}x"));
    status.update_metric(DISPLAY_DROPPED_FRAMES, dropped_frames.to_string());

    payload_from([
        ("current_time", number_or_null(Some(video.current_time()))),
        ("duration", number_or_null(Some(video.duration()))),
        ("playback_rate", number_or_null(Some(playback_rate))),
        ("dropped_frames", json!(dropped_frames)),
        ("buffer_level", json!(ctx.last_buffer_level)),
        ("current_bitrate", json!(ctx.last_bitrate)),
    ])
}

/// 비디오 트랙 비트레이트 목록에서 품질 인덱스의 비트레이트 (없으면 0)
fn video_bitrate(engine: Option<&dyn PlayerEngine>, quality: u32) -> u64 {
    engine
        .and_then(|e| e.bitrate_info_list_for(MediaType::Video))
        .and_then(|list| list.get(quality as usize).map(|info| info.bitrate))
        .unwrap_or(0)
}

/// 유한 수는 숫자로, NaN/무한대/없음은 null로
fn number_or_null(value: Option<f64>) -> Value {
    match value {
        Some(v) if v.is_finite() => json!(v),
        _ => Value::Null,
    }
}

fn state_value(state: &PlaybackState) -> Value {
    Value::String(state.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{ScriptedEngine, SimulatedVideo};
    use streamprobe_core::models::engine::{EngineError, FragmentRequest};
    use streamprobe_core::ports::player_engine::BitrateInfo;

    const TARGET: &str = "http://media/manifest.mpd";

    fn ladder() -> Vec<BitrateInfo> {
        [400_000u64, 800_000, 1_600_000]
            .iter()
            .enumerate()
            .map(|(i, b)| BitrateInfo {
                quality_index: i as u32,
                bitrate: *b,
                width: None,
                height: None,
            })
            .collect()
    }

    fn ctx() -> SessionContext {
        SessionContext::new("http://localhost:8000", "exp", TARGET)
    }

    fn run(
        event: &EngineEvent,
        ctx: &mut SessionContext,
        engine: Option<&dyn PlayerEngine>,
    ) -> Option<(MetricEventType, Payload)> {
        translate(event, ctx, engine, TARGET, &StatusBoard::default())
    }

    fn assert_fields(event_type: MetricEventType, payload: &Payload) {
        let mut keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        let mut expected = event_type.payload_fields().to_vec();
        keys.sort_unstable();
        expected.sort_unstable();
        assert_eq!(keys, expected, "{event_type} 필드 불일치");
    }

    #[test]
    fn quality_change_looks_up_video_ladder() {
        let engine = ScriptedEngine::new(ladder());
        let mut c = ctx();
        let (ty, payload) = run(
            &EngineEvent::QualityChangeRendered {
                media_type: Some(MediaType::Video),
                old_quality: Some(0),
                new_quality: Some(1),
            },
            &mut c,
            Some(&engine),
        )
        .unwrap();

        assert_eq!(ty, MetricEventType::QualityChangeRendered);
        assert_fields(ty, &payload);
        assert_eq!(payload["bitrate"], json!(800_000));
        assert_eq!(payload["old_quality"], json!(0));
        assert_eq!(c.last_bitrate, 800_000);
    }

    #[test]
    fn quality_change_out_of_range_falls_back_to_zero() {
        let engine = ScriptedEngine::new(ladder());
        let mut c = ctx();
        c.record_bitrate(5);
        let (_, payload) = run(
            &EngineEvent::QualityChangeRendered {
                media_type: None,
                old_quality: None,
                new_quality: Some(9),
            },
            &mut c,
            Some(&engine),
        )
        .unwrap();
        assert_eq!(payload["bitrate"], json!(0));
        assert_eq!(payload["old_quality"], Value::Null);
        assert_eq!(c.last_bitrate, 0);
    }

    #[test]
    fn guarded_events_emit_nothing() {
        let mut c = ctx();
        let guarded = [
            EngineEvent::FragmentLoadingStarted { request: None },
            EngineEvent::FragmentLoadingCompleted { request: None },
            EngineEvent::QualityChangeRendered {
                media_type: None,
                old_quality: Some(0),
                new_quality: None,
            },
            EngineEvent::BufferLevelUpdated {
                media_type: None,
                buffer_level: None,
            },
            EngineEvent::PlaybackStateChanged { state: None },
            EngineEvent::Error { error: None },
        ];
        for event in &guarded {
            assert!(run(event, &mut c, None).is_none(), "{event:?}");
        }
        assert_eq!(c, ctx());
    }

    #[test]
    fn fragment_completed_without_introspection_has_null_quality() {
        let engine = ScriptedEngine::new(ladder()).without_introspection();
        let mut c = ctx();
        let request = FragmentRequest {
            request_type: Some("MediaSegment".into()),
            url: Some("http://media/seg-1.m4s".into()),
            media_type: Some(MediaType::Video),
            start_time: Some(4.0),
            duration: Some(f64::NAN),
        };
        let (ty, payload) = run(
            &EngineEvent::FragmentLoadingCompleted {
                request: Some(request),
            },
            &mut c,
            Some(&engine),
        )
        .unwrap();
        assert_fields(ty, &payload);
        assert_eq!(payload["quality"], Value::Null);
        assert_eq!(payload["media_type"], json!("video"));
        assert_eq!(payload["type"], json!("MediaSegment"));
        assert_eq!(payload["duration"], Value::Null);
    }

    #[test]
    fn state_change_old_state_equals_new_state() {
        let mut c = ctx();
        c.record_state(PlaybackState::Playing);
        let (_, payload) = run(
            &EngineEvent::PlaybackStateChanged {
                state: Some(PlaybackState::Paused),
            },
            &mut c,
            None,
        )
        .unwrap();
        // 기존 동작 유지: 이전 상태가 아니라 새 상태가 기록된다
        assert_eq!(payload["old_state"], json!("paused"));
        assert_eq!(payload["new_state"], json!("paused"));
    }

    #[test]
    fn paired_transitions_are_logged() {
        let status = StatusBoard::default();
        let mut c = ctx();
        for state in [
            PlaybackState::Playing,
            PlaybackState::Paused,
            PlaybackState::Playing,
            PlaybackState::Seeking,
        ] {
            translate(
                &EngineEvent::PlaybackStateChanged { state: Some(state) },
                &mut c,
                None,
                TARGET,
                &status,
            );
        }
        assert_eq!(status.snapshot().log, vec!["Playback paused", "Playback resumed"]);
    }

    #[test]
    fn error_without_message_logs_placeholder() {
        let status = StatusBoard::default();
        let mut c = ctx();
        let (_, payload) = translate(
            &EngineEvent::Error {
                error: Some(EngineError {
                    code: Some(27),
                    message: None,
                    data: Some(json!({"segment": 3})),
                }),
            },
            &mut c,
            None,
            TARGET,
            &status,
        )
        .unwrap();
        assert_eq!(payload["error_code"], json!(27));
        assert_eq!(payload["error_message"], Value::Null);
        assert_eq!(payload["error_data"], json!({"segment": 3}));
        assert_eq!(status.snapshot().log, vec!["ERROR: Unknown error"]);
    }

    #[test]
    fn stall_reads_latest_trackers() {
        let status = StatusBoard::default();
        let mut c = ctx();
        c.record_buffer_level(1.25);
        c.record_bitrate(400_000);
        let (ty, payload) =
            translate(&EngineEvent::PlaybackStalled, &mut c, None, TARGET, &status).unwrap();
        assert_eq!(ty, MetricEventType::RebufferEvent);
        assert_eq!(payload["rebuffer_count"], json!(1));
        assert_eq!(payload["buffer_level"], json!(1.25));
        assert_eq!(payload["current_bitrate"], json!(400_000));
        assert_eq!(status.snapshot().log, vec!["Rebuffer detected (#1)"]);

        let (_, ended) =
            translate(&EngineEvent::PlaybackEnded, &mut c, None, TARGET, &status).unwrap();
        assert_eq!(ended["total_rebuffers"], json!(1));
        assert_eq!(status.status(), "Playback ended");
    }

    #[test]
    fn display_metrics_follow_updates() {
        let engine = ScriptedEngine::new(ladder());
        let status = StatusBoard::default();
        let mut c = ctx();
        translate(
            &EngineEvent::QualityChangeRendered {
                media_type: Some(MediaType::Video),
                old_quality: Some(1),
                new_quality: Some(2),
            },
            &mut c,
            Some(&engine),
            TARGET,
            &status,
        );
        translate(
            &EngineEvent::BufferLevelUpdated {
                media_type: Some(MediaType::Audio),
                buffer_level: Some(3.456),
            },
            &mut c,
            None,
            TARGET,
            &status,
        );
        assert_eq!(
            status.metric(DISPLAY_CURRENT_BITRATE).as_deref(),
            Some("1600 kbps")
        );
        assert_eq!(status.metric(DISPLAY_BUFFER_LEVEL).as_deref(), Some("3.46s"));
    }

    #[test]
    fn buffer_payload_forwards_engine_value() {
        let mut c = ctx();
        let (_, payload) = run(
            &EngineEvent::BufferLevelUpdated {
                media_type: Some(MediaType::Video),
                buffer_level: Some(-0.5),
            },
            &mut c,
            None,
        )
        .unwrap();
        assert_eq!(payload["buffer_level"], json!(-0.5));
        assert_eq!(c.last_buffer_level, 0.0);

        c.record_buffer_level(4.0);
        let (_, payload) = run(
            &EngineEvent::BufferLevelUpdated {
                media_type: Some(MediaType::Video),
                buffer_level: Some(f64::NAN),
            },
            &mut c,
            None,
        )
        .unwrap();
        assert!(payload["buffer_level"].is_null());
        assert_eq!(c.last_buffer_level, 0.0);
        assert_fields(MetricEventType::BufferLevelUpdated, &payload);
    }

    #[tokio::test(start_paused = true)]
    async fn sample_defaults_dropped_frames_to_zero() {
        let video = SimulatedVideo::new(Some(60.0)).without_quality_stats();
        let status = StatusBoard::default();
        let mut c = ctx();
        c.record_buffer_level(2.0);
        c.record_bitrate(800_000);

        let payload = sample_payload(&video, &c, &status);
        assert_fields(MetricEventType::PeriodicMetrics, &payload);
        assert_eq!(payload["dropped_frames"], json!(0));
        assert_eq!(payload["duration"], json!(60.0));
        assert_eq!(payload["buffer_level"], json!(2.0));
        assert_eq!(payload["current_bitrate"], json!(800_000));
        assert_eq!(status.metric(DISPLAY_PLAYBACK_RATE).as_deref(), Some("1.00x"));
    }

    #[tokio::test(start_paused = true)]
    async fn sample_reports_unknown_duration_as_null() {
        let video = SimulatedVideo::new(None);
        let payload = sample_payload(&video, &ctx(), &StatusBoard::default());
        assert_eq!(payload["duration"], Value::Null);
    }
}
