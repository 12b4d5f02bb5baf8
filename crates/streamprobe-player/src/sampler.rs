//! 주기 샘플러.
//!
//! 세션 하나에 1:1로 묶인 취소 가능한 태스크. 첫 틱은 한 주기 뒤에 발생한다.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// 주기 샘플러
pub struct PeriodicSampler {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PeriodicSampler {
    /// 샘플러 시작
    ///
    /// 주기가 0이거나 tokio 런타임 밖이면 시작하지 않는다.
    pub fn spawn<F>(period: Duration, mut tick: F) -> Option<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            warn!("샘플 주기 0, 주기 샘플러 비활성");
            return None;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("tokio 런타임 없음, 주기 샘플러 생략");
            return None;
        };

        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let task = runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if *cancel_rx.borrow() {
                            break;
                        }
                        tick();
                    }
                    _ = cancel_rx.changed() => {
                        break;
                    }
                }
            }
            debug!("주기 샘플러 종료");
        });

        debug!("주기 샘플러 시작: {}ms", period.as_millis());
        Some(Self { cancel_tx, task })
    }

    /// 샘플러 취소
    ///
    /// 태스크를 즉시 중단하므로 반환 이후 틱은 실행되지 않는다.
    pub fn cancel(self) {
        let _ = self.cancel_tx.send(true);
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_period() {
        let (count, tick) = counter();
        let sampler = PeriodicSampler::spawn(Duration::from_secs(5), tick).unwrap();

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        sampler.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks() {
        let (count, tick) = counter();
        let sampler = PeriodicSampler::spawn(Duration::from_secs(1), tick).unwrap();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        sampler.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_period_is_rejected() {
        let (_, tick) = counter();
        assert!(PeriodicSampler::spawn(Duration::ZERO, tick).is_none());
    }

    #[test]
    fn outside_runtime_is_rejected() {
        let (_, tick) = counter();
        assert!(PeriodicSampler::spawn(Duration::from_secs(1), tick).is_none());
    }
}
