use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::utils::clock::Clock;

use super::events::{AlarmKind, TrackerEvent};

pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);
pub const DAILY_CHECK_PERIOD: Duration = Duration::from_secs(60 * 60);
pub const WEEKLY_REPORT_PERIOD: Duration = Duration::from_secs(60 * 60 * 24);

/// Periodic producer pushing one alarm kind into the tracker queue.
/// Alarms and browser events share that queue, so an alarm handler can
/// never interleave with an event handler.
pub struct AlarmModule {
    next: mpsc::Sender<TrackerEvent>,
    kind: AlarmKind,
    period: Duration,
    shutdown: CancellationToken,
    time_provider: Box<dyn Clock>,
}

impl AlarmModule {
    pub fn new(
        next: mpsc::Sender<TrackerEvent>,
        kind: AlarmKind,
        period: Duration,
        shutdown: CancellationToken,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            kind,
            period,
            shutdown,
            time_provider,
        }
    }

    /// Executes the alarm event loop.
    pub async fn run(self) -> Result<()> {
        let mut fire_point = self.time_provider.instant();
        loop {
            fire_point += self.period;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(fire_point) => ()
            }

            debug!("Alarm {:?} fired", self.kind);
            if self.next.send(TrackerEvent::Alarm(self.kind)).await.is_err() {
                // Consumer is gone, nothing left to wake.
                return Ok(());
            }
        }
    }
}
