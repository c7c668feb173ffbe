use anyhow::Result;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::events::{BrowserEvent, TrackerEvent};

/// Bridges the browser extension's event pipe into the tracker queue.
/// Events arrive as one JSON object per line; a malformed line is skipped.
/// The feed closing means the browser side is gone, which shuts the whole
/// tracker down.
pub struct EventFeedModule<R> {
    input: R,
    next: mpsc::Sender<TrackerEvent>,
    shutdown: CancellationToken,
}

pub fn stdin_feed(
    next: mpsc::Sender<TrackerEvent>,
    shutdown: CancellationToken,
) -> EventFeedModule<BufReader<Stdin>> {
    EventFeedModule::new(BufReader::new(tokio::io::stdin()), next, shutdown)
}

impl<R: AsyncBufRead + Unpin> EventFeedModule<R> {
    pub fn new(input: R, next: mpsc::Sender<TrackerEvent>, shutdown: CancellationToken) -> Self {
        Self {
            input,
            next,
            shutdown,
        }
    }

    /// Executes the feed event loop until EOF or cancellation.
    pub async fn run(self) -> Result<()> {
        let mut lines = self.input.lines();
        loop {
            let line = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                line = lines.next_line() => line?
            };

            let Some(line) = line else {
                debug!("Event feed closed");
                self.shutdown.cancel();
                return Ok(());
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<BrowserEvent>(line) {
                Ok(event) => {
                    debug!("Received event {event:?}");
                    if self.next.send(TrackerEvent::Browser(event)).await.is_err() {
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!("Ignoring malformed event line {line}: {e}")
                }
            }
        }
    }
}
