use chrono::{DateTime, Utc};

pub type TabId = i64;

/// Sessions shorter than this are noise from rapid tab-cycling and are
/// dropped instead of aggregated.
const MIN_SESSION_SECONDS: i64 = 2;

/// A closed stretch of attention on one domain, ready for aggregation.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct SessionFlush {
    pub domain: String,
    pub seconds: u64,
}

#[derive(PartialEq, Eq, Debug, Clone)]
enum SessionState {
    /// Nothing being tracked and nothing to resume.
    Idle,
    /// Accrual stopped (window blur, idle, lock). The domain is remembered
    /// so regaining focus resumes it with a fresh timer.
    Paused { domain: String },
    Tracking {
        domain: String,
        started_at: DateTime<Utc>,
    },
}

/// The single-active-session state machine. All session state lives here;
/// nothing else may decide when a session opens or closes.
pub struct SessionTracker {
    active_tab: Option<TabId>,
    state: SessionState,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            active_tab: None,
            state: SessionState::Idle,
        }
    }

    /// Whether `tab` is the tab whose page loads should retarget the
    /// session. Load events from background tabs are ignored.
    pub fn is_active_tab(&self, tab: TabId) -> bool {
        self.active_tab == Some(tab)
    }

    /// The focused tab now shows `domain`. Closes the running session (if
    /// any) and starts a new one at `now`.
    pub fn tab_changed(
        &mut self,
        tab: TabId,
        domain: String,
        now: DateTime<Utc>,
    ) -> Option<SessionFlush> {
        let flush = match &self.state {
            SessionState::Tracking { domain, started_at } => close(domain, *started_at, now),
            _ => None,
        };
        self.active_tab = Some(tab);
        self.state = SessionState::Tracking {
            domain,
            started_at: now,
        };
        flush
    }

    /// Window blurred, or the user went idle or locked the screen. Stops
    /// accrual but remembers the domain for [Self::resume].
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<SessionFlush> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Tracking { domain, started_at } => {
                let flush = close(&domain, started_at, now);
                self.state = SessionState::Paused { domain };
                flush
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Window focused or the user became active again. Time spent paused
    /// is never counted; the timer restarts at `now`.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        let state = std::mem::replace(&mut self.state, SessionState::Idle);
        self.state = match state {
            SessionState::Paused { domain } => SessionState::Tracking {
                domain,
                started_at: now,
            },
            other => other,
        };
    }

    /// Periodic flush that keeps the session open, bounding data loss if
    /// the browser terminates without a closing event. When the elapsed
    /// slice is below the noise threshold the timer keeps running so the
    /// time is not lost.
    pub fn heartbeat(&mut self, now: DateTime<Utc>) -> Option<SessionFlush> {
        match &mut self.state {
            SessionState::Tracking { domain, started_at } => {
                let flush = close(domain, *started_at, now);
                if flush.is_some() {
                    *started_at = now;
                }
                flush
            }
            _ => None,
        }
    }
}

fn close(domain: &str, started_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<SessionFlush> {
    let seconds = (now - started_at).num_seconds();
    if seconds < MIN_SESSION_SECONDS {
        return None;
    }
    Some(SessionFlush {
        domain: domain.to_owned(),
        seconds: seconds as u64,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn tab_switch_flushes_previous_session() {
        let mut tracker = SessionTracker::new();
        let t0 = start_time();

        assert_eq!(tracker.tab_changed(1, "github.com".into(), t0), None);
        let flush = tracker.tab_changed(2, "youtube.com".into(), t0 + Duration::seconds(90));

        assert_eq!(
            flush,
            Some(SessionFlush {
                domain: "github.com".into(),
                seconds: 90,
            })
        );
        assert!(tracker.is_active_tab(2));
        assert!(!tracker.is_active_tab(1));
    }

    #[test]
    fn sub_two_second_sessions_are_discarded() {
        let mut tracker = SessionTracker::new();
        let t0 = start_time();

        tracker.tab_changed(1, "github.com".into(), t0);
        let flush = tracker.tab_changed(2, "youtube.com".into(), t0 + Duration::seconds(1));

        assert_eq!(flush, None);
    }

    #[test]
    fn paused_time_is_not_counted() {
        let mut tracker = SessionTracker::new();
        let t0 = start_time();

        tracker.tab_changed(1, "github.com".into(), t0);
        let flush = tracker.pause(t0 + Duration::seconds(10));
        assert_eq!(flush.map(|f| f.seconds), Some(10));

        // 50 seconds pass while the window is unfocused.
        tracker.resume(t0 + Duration::seconds(60));
        let flush = tracker.pause(t0 + Duration::seconds(65));

        assert_eq!(
            flush,
            Some(SessionFlush {
                domain: "github.com".into(),
                seconds: 5,
            })
        );
    }

    #[test]
    fn pause_without_session_is_noop() {
        let mut tracker = SessionTracker::new();
        assert_eq!(tracker.pause(start_time()), None);
        tracker.resume(start_time());
        assert_eq!(tracker.pause(start_time()), None);
    }

    #[test]
    fn heartbeat_flushes_and_keeps_tracking() {
        let mut tracker = SessionTracker::new();
        let t0 = start_time();

        tracker.tab_changed(1, "github.com".into(), t0);
        let flush = tracker.heartbeat(t0 + Duration::seconds(60));
        assert_eq!(flush.map(|f| f.seconds), Some(60));

        // The session stayed open with a restarted timer.
        let flush = tracker.heartbeat(t0 + Duration::seconds(150));
        assert_eq!(
            flush,
            Some(SessionFlush {
                domain: "github.com".into(),
                seconds: 90,
            })
        );
    }

    #[test]
    fn short_heartbeat_slice_keeps_the_timer() {
        let mut tracker = SessionTracker::new();
        let t0 = start_time();

        tracker.tab_changed(1, "github.com".into(), t0);
        assert_eq!(tracker.heartbeat(t0 + Duration::seconds(1)), None);

        // The discarded slice was not lost; the timer still runs from t0.
        let flush = tracker.heartbeat(t0 + Duration::seconds(3));
        assert_eq!(flush.map(|f| f.seconds), Some(3));
    }
}
