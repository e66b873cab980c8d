use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::sync::live::LiveSync;

/// Owns the live sync timer. Each timer tick spawns [`LiveSync::try_tick`], so a
/// slow tick never delays the timer; the tick's own guard turns overlap into a skip.
pub struct SyncScheduler {
    live: Arc<LiveSync>,
    period: Duration,
}

/// Returned by [`SyncScheduler::start`]. Dropping it without `stop()` leaves the
/// loop running for the life of the runtime.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncScheduler {
    pub fn new(live: Arc<LiveSync>, period: Duration) -> Self {
        Self { live, period }
    }

    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let SyncScheduler { live, period } = self;

        let task = tokio::spawn(async move {
            info!("Live sync scheduler started (every {}s)", period.as_secs_f64());
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let live = Arc::clone(&live);
                        tokio::spawn(async move {
                            live.try_tick().await;
                        });
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Live sync scheduler stopped");
        });

        SchedulerHandle { stop_tx, task }
    }
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the loop to exit and wait for it. A tick already in flight runs to
    /// completion on its own.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }

    /// Abort the loop without waiting.
    pub fn cancel(self) {
        self.task.abort();
    }
}
