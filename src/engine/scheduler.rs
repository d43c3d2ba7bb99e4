use super::fault::{FaultChannel, SchedulerFault};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// A recurring timer task that runs one closure per period.
///
/// The first firing happens one full period after spawning. A panic inside a
/// firing is caught, raised on the [`FaultChannel`], and the timer keeps
/// going; a dead timer would leave only size-based sealing working.
pub struct FlushScheduler {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl FlushScheduler {
    pub fn spawn<F>(period: Duration, faults: FaultChannel, tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u64 = 0;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        ticks += 1;
                        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(&tick)) {
                            faults.raise(SchedulerFault::from_panic(payload.as_ref(), ticks));
                        }
                    }
                }
            }

            debug!(ticks, "Flush scheduler exited");
        });

        debug!(period_ms = period.as_millis() as u64, "Flush scheduler started");
        Self {
            cancel,
            handle: Some(handle),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Cancels the timer and waits for an in-progress firing to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Flush scheduler task failed: {}", e);
            }
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
