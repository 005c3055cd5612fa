//! Frame pump: drives `Scheduler::tick` at a fixed cadence
//!
//! Missed ticks are skipped rather than bursted, so a stall never produces a
//! catch-up flood of frames. Schedule windows are checked about once a second.

use crate::schedule::Scheduler;
use chrono::Local;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// How often schedule windows are evaluated
pub const SCHEDULE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

pub struct FramePump {
    scheduler: Arc<Scheduler>,
    interval: Duration,
}

impl FramePump {
    pub fn new(scheduler: Arc<Scheduler>, interval: Duration) -> Self {
        Self {
            scheduler,
            interval,
        }
    }

    /// Run until `shutdown` flips to true (or its sender is dropped)
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Frame pump started ({}ms)", self.interval.as_millis());

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_check: Option<Instant> = None;
        let mut desired_frame_ms = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            self.scheduler.tick(self.scheduler.elapsed_ms());

            if last_check.map_or(true, |t| t.elapsed() >= SCHEDULE_CHECK_INTERVAL) {
                let frame_ms = self.scheduler.check_schedule(Local::now().naive_local());
                if frame_ms != desired_frame_ms {
                    debug!("Desired frame interval now {}ms", frame_ms);
                    desired_frame_ms = frame_ms;
                }
                last_check = Some(Instant::now());
            }
        }

        info!("Frame pump stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingSink;
    use crate::render::RendererRegistry;
    use lss_common::EventBus;

    #[tokio::test]
    async fn test_pump_ticks_until_shutdown() {
        let sink = Arc::new(RecordingSink::new(8));
        let scheduler = Arc::new(Scheduler::new(
            sink.clone(),
            RendererRegistry::default(),
            Arc::new(EventBus::default()),
            std::env::temp_dir(),
        ));

        let (tx, rx) = watch::channel(false);
        let handle = FramePump::new(scheduler, Duration::from_millis(10)).spawn(rx);

        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        // Idle blanking pushes a frame every tick
        let frames = sink.frame_count();
        assert!(frames >= 3, "only {} frames", frames);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.frame_count(), frames);
    }
}
