use serde::Deserialize;
use tokio::sync::oneshot;

use super::{
    control::{ControlRequest, ControlResponse},
    session::TabId,
};

/// Notifications delivered by the browser-side shim, one JSON object per
/// line, e.g. `{"type": "tabActivated", "tabId": 3, "url": "https://..."}`.
#[derive(PartialEq, Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BrowserEvent {
    /// Another tab became the focused one.
    #[serde(rename_all = "camelCase")]
    TabActivated { tab_id: TabId, url: Option<String> },
    /// Page load progress in some tab. Only completed loads in the focused
    /// tab retarget the session.
    #[serde(rename_all = "camelCase")]
    TabUpdated {
        tab_id: TabId,
        url: Option<String>,
        #[serde(default)]
        complete: bool,
    },
    #[serde(rename_all = "camelCase")]
    WindowFocusChanged { focused: bool },
    #[serde(rename_all = "camelCase")]
    IdleStateChanged { state: IdleState },
}

#[derive(PartialEq, Eq, Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

/// Periodic triggers produced by the alarm tasks.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AlarmKind {
    /// Flush the running session without closing it.
    Heartbeat,
    /// Check whether the daily bucket belongs to an earlier date.
    DailyCheck,
    /// Score the rolling week and report it.
    WeeklyReport,
}

/// Everything that can arrive on the tracker's single event queue. The
/// queue is the only path into the tracker's state; producers are the
/// browser feed, the alarm tasks and control callers.
#[derive(Debug)]
pub enum TrackerEvent {
    Browser(BrowserEvent),
    Alarm(AlarmKind),
    Control(ControlRequest, oneshot::Sender<ControlResponse>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_events_parse_from_feed_lines() {
        let event: BrowserEvent = serde_json::from_str(
            r#"{"type": "tabActivated", "tabId": 3, "url": "https://github.com"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            BrowserEvent::TabActivated {
                tab_id: 3,
                url: Some("https://github.com".into()),
            }
        );

        let event: BrowserEvent =
            serde_json::from_str(r#"{"type": "idleStateChanged", "state": "locked"}"#).unwrap();
        assert_eq!(
            event,
            BrowserEvent::IdleStateChanged {
                state: IdleState::Locked,
            }
        );

        // A tab that is still loading carries no completion flag.
        let event: BrowserEvent =
            serde_json::from_str(r#"{"type": "tabUpdated", "tabId": 1, "url": null}"#).unwrap();
        assert_eq!(
            event,
            BrowserEvent::TabUpdated {
                tab_id: 1,
                url: None,
                complete: false,
            }
        );
    }
}
