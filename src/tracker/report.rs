use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use tracing::info;

use crate::storage::{
    entities::{ProductivityLevel, Settings, WeeklyBucket, WeeklyReport, REPORTS_CAP},
    store::{entry, keys, read_or_default, StateStore},
};

/// Percentage of tracked time classified productive. A week with no
/// tracked time scores 0 rather than erroring.
pub fn productivity_score(productive: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((productive as f64 / total as f64) * 100.0).round() as u8
}

pub fn level_for(score: u8) -> ProductivityLevel {
    match score {
        70.. => ProductivityLevel::Excellent,
        50..=69 => ProductivityLevel::Good,
        30..=49 => ProductivityLevel::Average,
        _ => ProductivityLevel::NeedsImprovement,
    }
}

/// Delivers the weekly report to the user. Presentation (notification
/// popups, dashboard links) belongs to the embedding UI; the core only
/// hands over the numbers.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn weekly_report(&self, report: &WeeklyReport);
}

/// Default notifier for headless runs.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn weekly_report(&self, report: &WeeklyReport) {
        info!(
            "Weekly report: {}m productive, {}m unproductive. Score: {}% - {}",
            report.totals.productive / 60,
            report.totals.unproductive / 60,
            report.score,
            report.level,
        );
    }
}

/// Weekly report trigger, checked at least once per day. Scores the
/// rolling weekly bucket, appends the report (list capped at
/// [REPORTS_CAP]) and notifies the user when notifications are enabled.
/// The weekly bucket itself is left untouched; its totals keep
/// accumulating until reset externally.
pub async fn generate_weekly_report(
    store: &impl StateStore,
    notifier: &impl Notifier,
    now: DateTime<Utc>,
) -> Result<Option<WeeklyReport>> {
    let weekly: WeeklyBucket = read_or_default(store, keys::WEEKLY).await?;
    if weekly.total == 0 {
        return Ok(None);
    }
    let settings: Settings = read_or_default(store, keys::SETTINGS).await?;

    let score = productivity_score(weekly.totals.productive, weekly.total);
    let iso_week = now.iso_week();
    let report = WeeklyReport {
        week: iso_week.week(),
        year: iso_week.year(),
        totals: weekly.totals,
        total: weekly.total,
        score,
        level: level_for(score),
        generated_at: now,
    };

    let mut reports: Vec<WeeklyReport> = read_or_default(store, keys::REPORTS).await?;
    reports.push(report.clone());
    while reports.len() > REPORTS_CAP {
        reports.remove(0);
    }
    store.set(vec![entry(keys::REPORTS, &reports)?]).await?;

    if settings.notifications {
        notifier.weekly_report(&report);
    }

    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::{
        storage::{
            entities::CategoryTotals,
            store::{read, testing::MemoryStore},
        },
        tracker::aggregate::record,
    };

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn score_is_rounded_percentage() {
        assert_eq!(productivity_score(90, 120), 75);
        assert_eq!(productivity_score(1, 3), 33);
        assert_eq!(productivity_score(2, 3), 67);
        assert_eq!(productivity_score(0, 0), 0);
        assert_eq!(productivity_score(120, 120), 100);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(level_for(100), ProductivityLevel::Excellent);
        assert_eq!(level_for(70), ProductivityLevel::Excellent);
        assert_eq!(level_for(69), ProductivityLevel::Good);
        assert_eq!(level_for(50), ProductivityLevel::Good);
        assert_eq!(level_for(49), ProductivityLevel::Average);
        assert_eq!(level_for(30), ProductivityLevel::Average);
        assert_eq!(level_for(29), ProductivityLevel::NeedsImprovement);
        assert_eq!(level_for(0), ProductivityLevel::NeedsImprovement);
    }

    #[tokio::test]
    async fn empty_week_produces_no_report() -> Result<()> {
        let store = MemoryStore::new();
        let mut notifier = MockNotifier::new();
        notifier.expect_weekly_report().never();

        let report = generate_weekly_report(&store, &notifier, now()).await?;

        assert_eq!(report, None);
        assert_eq!(store.get(keys::REPORTS).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn report_is_scored_saved_and_notified() -> Result<()> {
        let store = MemoryStore::new();
        record(&store, now(), "github.com", 90).await?;
        record(&store, now(), "youtube.com", 30).await?;

        let mut notifier = MockNotifier::new();
        notifier
            .expect_weekly_report()
            .withf(|report| report.score == 75 && report.level == ProductivityLevel::Excellent)
            .times(1)
            .return_const(());

        let report = generate_weekly_report(&store, &notifier, now()).await?.unwrap();
        assert_eq!(report.score, 75);
        assert_eq!(report.total, 120);
        assert_eq!(report.week, now().iso_week().week());

        let reports: Vec<WeeklyReport> = read(&store, keys::REPORTS).await?.unwrap();
        assert_eq!(reports.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn disabled_notifications_still_save_the_report() -> Result<()> {
        let store = MemoryStore::new();
        record(&store, now(), "github.com", 90).await?;

        let settings = Settings {
            notifications: false,
            ..Settings::default()
        };
        store.set(vec![entry(keys::SETTINGS, &settings)?]).await?;

        let mut notifier = MockNotifier::new();
        notifier.expect_weekly_report().never();

        generate_weekly_report(&store, &notifier, now()).await?;

        let reports: Vec<WeeklyReport> = read(&store, keys::REPORTS).await?.unwrap();
        assert_eq!(reports.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn reports_list_is_capped() -> Result<()> {
        let store = MemoryStore::new();
        record(&store, now(), "github.com", 90).await?;

        let old = WeeklyReport {
            week: 1,
            year: 2023,
            totals: CategoryTotals::default(),
            total: 0,
            score: 0,
            level: ProductivityLevel::NeedsImprovement,
            generated_at: now(),
        };
        let backlog: Vec<WeeklyReport> = (0..REPORTS_CAP).map(|_| old.clone()).collect();
        store.set(vec![entry(keys::REPORTS, &backlog)?]).await?;

        let mut notifier = MockNotifier::new();
        notifier.expect_weekly_report().return_const(());

        generate_weekly_report(&store, &notifier, now()).await?;

        let reports: Vec<WeeklyReport> = read(&store, keys::REPORTS).await?.unwrap();
        assert_eq!(reports.len(), REPORTS_CAP);
        // The newest report is present, one old entry was evicted.
        assert_eq!(reports.last().unwrap().year, 2024);
        Ok(())
    }
}
