use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    storage::{
        entities::{DailyBucket, HistoryEntry, MonthlyArchive, Settings, WeeklyBucket, WeeklyReport},
        store::{entry, keys, JsonFileStore, StateStore},
    },
    utils::clock::{Clock, DefaultClock},
};

use self::{
    alarms::{AlarmModule, DAILY_CHECK_PERIOD, HEARTBEAT_PERIOD, WEEKLY_REPORT_PERIOD},
    events::{AlarmKind, BrowserEvent, IdleState, TrackerEvent},
    report::{LogNotifier, Notifier},
    session::{SessionFlush, SessionTracker, TabId},
    sync::SyncForwarder,
};

pub mod aggregate;
pub mod alarms;
pub mod classify;
pub mod control;
pub mod domain;
pub mod events;
pub mod report;
pub mod rollover;
pub mod session;
pub mod shutdown;
pub mod source;
pub mod sync;

const EVENT_QUEUE_CAPACITY: usize = 64;

/// Represents the starting point for the tracker daemon: wires the event
/// feed, the alarm producers and the dispatch loop around a file-backed
/// store, then runs until Ctrl-C or the feed closes.
pub async fn start_tracker(dir: PathBuf) -> Result<()> {
    let store = JsonFileStore::new(dir.join("state"))?;
    let clock = DefaultClock;
    seed_defaults(&store, clock.time().date_naive()).await?;

    let (sender, receiver) = mpsc::channel::<TrackerEvent>(EVENT_QUEUE_CAPACITY);
    let shutdown_token = CancellationToken::new();

    let heartbeat = create_alarm(&sender, AlarmKind::Heartbeat, &shutdown_token);
    let daily_check = create_alarm(&sender, AlarmKind::DailyCheck, &shutdown_token);
    let weekly_report = create_alarm(&sender, AlarmKind::WeeklyReport, &shutdown_token);
    let feed = source::stdin_feed(sender, shutdown_token.clone());

    let service = TrackerService::new(
        receiver,
        store,
        LogNotifier,
        SyncForwarder::new(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        )),
        shutdown_token.clone(),
        Box::new(DefaultClock),
    );

    let (_, feed_result, heartbeat_result, daily_result, weekly_result, service_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        feed.run(),
        heartbeat.run(),
        daily_check.run(),
        weekly_report.run(),
        service.run(),
    );

    for (name, result) in [
        ("event feed", feed_result),
        ("heartbeat alarm", heartbeat_result),
        ("daily alarm", daily_result),
        ("weekly alarm", weekly_result),
        ("tracker service", service_result),
    ] {
        if let Err(e) = result {
            error!("The {name} module got an error {e:?}");
        }
    }

    Ok(())
}

fn create_alarm(
    sender: &mpsc::Sender<TrackerEvent>,
    kind: AlarmKind,
    shutdown_token: &CancellationToken,
) -> AlarmModule {
    let period = match kind {
        AlarmKind::Heartbeat => HEARTBEAT_PERIOD,
        AlarmKind::DailyCheck => DAILY_CHECK_PERIOD,
        AlarmKind::WeeklyReport => WEEKLY_REPORT_PERIOD,
    };
    AlarmModule::new(
        sender.clone(),
        kind,
        period,
        shutdown_token.clone(),
        Box::new(DefaultClock),
    )
}

/// Seeds missing keys with first-run defaults. Data already present is
/// never overwritten, so this can run on every startup.
pub async fn seed_defaults(store: &impl StateStore, today: NaiveDate) -> Result<()> {
    let mut entries = Vec::new();
    if store.get(keys::SETTINGS).await?.is_none() {
        entries.push(entry(keys::SETTINGS, &Settings::default())?);
    }
    if store.get(keys::CATEGORIES).await?.is_none() {
        entries.push(entry(keys::CATEGORIES, &classify::default_lists())?);
    }
    if store.get(keys::DAILY).await?.is_none() {
        entries.push(entry(keys::DAILY, &DailyBucket::new(today))?);
    }
    if store.get(keys::WEEKLY).await?.is_none() {
        entries.push(entry(keys::WEEKLY, &WeeklyBucket::default())?);
    }
    if store.get(keys::MONTHLY).await?.is_none() {
        entries.push(entry(keys::MONTHLY, &MonthlyArchive::default())?);
    }
    if store.get(keys::HISTORY).await?.is_none() {
        entries.push(entry(keys::HISTORY, &Vec::<HistoryEntry>::new())?);
    }
    if store.get(keys::REPORTS).await?.is_none() {
        entries.push(entry(keys::REPORTS, &Vec::<WeeklyReport>::new())?);
    }
    if !entries.is_empty() {
        store.set(entries).await?;
    }
    Ok(())
}

/// Consumes the tracker queue. Every handler runs to completion before
/// the next event is taken, so read-modify-write cycles on the store
/// never interleave; the transient session is the only state kept in
/// memory across events.
pub struct TrackerService<S, N> {
    receiver: mpsc::Receiver<TrackerEvent>,
    store: S,
    session: SessionTracker,
    notifier: N,
    syncer: SyncForwarder,
    shutdown: CancellationToken,
    time_provider: Box<dyn Clock>,
}

impl<S: StateStore, N: Notifier> TrackerService<S, N> {
    pub fn new(
        receiver: mpsc::Receiver<TrackerEvent>,
        store: S,
        notifier: N,
        syncer: SyncForwarder,
        shutdown: CancellationToken,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            receiver,
            store,
            session: SessionTracker::new(),
            notifier,
            syncer,
            shutdown,
            time_provider,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = self.receiver.recv() => match event {
                    Some(event) => event,
                    None => break,
                }
            };
            self.handle(event).await;
        }

        self.finalize().await;
        self.receiver.close();
        Ok(())
    }

    async fn handle(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::Browser(event) => self.handle_browser(event).await,
            TrackerEvent::Alarm(kind) => self.handle_alarm(kind).await,
            TrackerEvent::Control(request, respond) => {
                let today = self.time_provider.time().date_naive();
                match control::handle_control(&self.store, request, today).await {
                    // The requester may be gone by the time we answer.
                    Ok(response) => drop(respond.send(response)),
                    Err(e) => error!("Control request failed: {e:?}"),
                }
            }
        }
    }

    async fn handle_browser(&mut self, event: BrowserEvent) {
        let now = self.time_provider.time();
        match event {
            BrowserEvent::TabActivated { tab_id, url } => self.retarget(tab_id, url, now).await,
            BrowserEvent::TabUpdated {
                tab_id,
                url,
                complete,
            } => {
                if complete && self.session.is_active_tab(tab_id) {
                    self.retarget(tab_id, url, now).await;
                }
            }
            BrowserEvent::WindowFocusChanged { focused } => {
                if focused {
                    self.session.resume(now);
                } else {
                    let flush = self.session.pause(now);
                    self.commit(flush).await;
                }
            }
            BrowserEvent::IdleStateChanged { state } => match state {
                IdleState::Active => self.session.resume(now),
                IdleState::Idle | IdleState::Locked => {
                    let flush = self.session.pause(now);
                    self.commit(flush).await;
                }
            },
        }
    }

    /// Points the session at whatever the focused tab shows now. Pages
    /// that are not trackable leave the session untouched.
    async fn retarget(
        &mut self,
        tab_id: TabId,
        url: Option<String>,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        let Some(domain) = url.as_deref().and_then(domain::extract_domain) else {
            return;
        };
        info!("Tracking {domain}");
        let flush = self.session.tab_changed(tab_id, domain, now);
        self.commit(flush).await;
    }

    async fn handle_alarm(&mut self, kind: AlarmKind) {
        let now = self.time_provider.time();
        match kind {
            AlarmKind::Heartbeat => {
                let flush = self.session.heartbeat(now);
                self.commit(flush).await;
            }
            AlarmKind::DailyCheck => {
                if let Err(e) = rollover::check_daily_rollover(&self.store, now.date_naive()).await
                {
                    error!("Daily rollover failed: {e:?}");
                }
            }
            AlarmKind::WeeklyReport => {
                if let Err(e) =
                    report::generate_weekly_report(&self.store, &self.notifier, now).await
                {
                    error!("Weekly report failed: {e:?}");
                }
            }
        }
    }

    /// Persists one closed session slice. A store failure costs exactly
    /// this slice; tracking keeps going.
    async fn commit(&mut self, flush: Option<SessionFlush>) {
        let Some(flush) = flush else { return };
        let now = self.time_provider.time();
        match aggregate::record(&self.store, now, &flush.domain, flush.seconds).await {
            Ok(recorded) => {
                let settings = &recorded.settings;
                if settings.sync_to_server && !settings.server_url.is_empty() {
                    self.syncer
                        .forward(&settings.server_url, &recorded.observation);
                }
            }
            Err(e) => {
                error!(
                    "Dropped {}s on {}: {e:?}",
                    flush.seconds, flush.domain
                );
            }
        }
    }

    async fn finalize(&mut self) {
        let flush = self.session.pause(self.time_provider.time());
        self.commit(flush).await;
    }
}
