use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::storage::{
    entities::{
        prune_history, Category, CategoryLists, DailyBucket, HistoryEntry, Settings, WeeklyBucket,
    },
    store::{entry, keys, read, read_or_default, StateStore},
};

use super::classify::{classify, default_lists};

/// One aggregated observation, as appended to history and mirrored to the
/// sync endpoint.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Observation {
    pub domain: String,
    pub seconds: u64,
    pub category: Category,
    pub timestamp: DateTime<Utc>,
}

/// The outcome of a successful [record] call. The settings snapshot comes
/// from the same read pass so the caller can decide on sync forwarding
/// without another store round trip.
pub struct Recorded {
    pub observation: Observation,
    pub settings: Settings,
}

/// Folds one flushed session into the persisted counters: upserts the
/// day's site record, bumps daily and weekly totals, appends to history
/// and prunes the retention window. Everything is written back as one
/// logical update. A store failure aborts the whole call; the interval's
/// data is dropped, never retried.
pub async fn record(
    store: &impl StateStore,
    now: DateTime<Utc>,
    domain: &str,
    seconds: u64,
) -> Result<Recorded> {
    let lists: CategoryLists = read(store, keys::CATEGORIES)
        .await?
        .unwrap_or_else(default_lists);
    let mut daily: DailyBucket = read(store, keys::DAILY)
        .await?
        .unwrap_or_else(|| DailyBucket::new(now.date_naive()));
    let mut weekly: WeeklyBucket = read_or_default(store, keys::WEEKLY).await?;
    let mut history: Vec<HistoryEntry> = read_or_default(store, keys::HISTORY).await?;
    let settings: Settings = read_or_default(store, keys::SETTINGS).await?;

    let category = classify(domain, &lists);

    daily.record(domain, seconds, category);
    weekly.record(seconds, category);
    history.push(HistoryEntry {
        timestamp: now,
        domain: domain.to_owned(),
        seconds,
        category,
    });
    prune_history(&mut history, now);

    store
        .set(vec![
            entry(keys::DAILY, &daily)?,
            entry(keys::WEEKLY, &weekly)?,
            entry(keys::HISTORY, &history)?,
        ])
        .await?;

    debug!("+{seconds}s on {domain} ({category})");

    Ok(Recorded {
        observation: Observation {
            domain: domain.to_owned(),
            seconds,
            category,
            timestamp: now,
        },
        settings,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use crate::storage::store::testing::MemoryStore;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn totals_match_recorded_seconds() -> Result<()> {
        let store = MemoryStore::new();

        record(&store, now(), "github.com", 90).await?;
        record(&store, now(), "youtube.com", 30).await?;

        let daily: DailyBucket = read(&store, keys::DAILY).await?.unwrap();
        assert_eq!(daily.total, 120);
        assert_eq!(daily.totals.productive, 90);
        assert_eq!(daily.totals.unproductive, 30);
        assert_eq!(daily.totals.sum(), daily.total);

        let weekly: WeeklyBucket = read(&store, keys::WEEKLY).await?.unwrap();
        assert_eq!(weekly.total, 120);
        assert_eq!(weekly.totals.productive, 90);

        let history: Vec<HistoryEntry> = read(&store, keys::HISTORY).await?.unwrap();
        assert_eq!(history.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn site_counters_are_monotonic() -> Result<()> {
        let store = MemoryStore::new();

        record(&store, now(), "github.com", 10).await?;
        let first: DailyBucket = read(&store, keys::DAILY).await?.unwrap();

        record(&store, now() + Duration::seconds(30), "github.com", 20).await?;
        let second: DailyBucket = read(&store, keys::DAILY).await?.unwrap();

        let before = &first.sites["github.com"];
        let after = &second.sites["github.com"];
        assert!(after.seconds > before.seconds);
        assert!(after.visits > before.visits);
        assert_eq!(after.visits, 2);
        Ok(())
    }

    #[tokio::test]
    async fn category_is_frozen_at_first_observation() -> Result<()> {
        let store = MemoryStore::new();

        record(&store, now(), "example.com", 10).await?;

        // The user reclassifies the domain mid-day.
        let mut lists = CategoryLists::default();
        lists.productive.insert("example.com".into());
        store.set(vec![entry(keys::CATEGORIES, &lists)?]).await?;

        record(&store, now() + Duration::seconds(60), "example.com", 20).await?;

        let daily: DailyBucket = read(&store, keys::DAILY).await?.unwrap();
        assert_eq!(daily.sites["example.com"].category, Category::Neutral);
        assert_eq!(daily.totals.neutral, 10);
        assert_eq!(daily.totals.productive, 20);
        Ok(())
    }

    #[tokio::test]
    async fn history_older_than_retention_is_pruned() -> Result<()> {
        let store = MemoryStore::new();

        let stale = vec![HistoryEntry {
            timestamp: now() - Duration::days(31),
            domain: "old.com".into(),
            seconds: 10,
            category: Category::Neutral,
        }];
        store.set(vec![entry(keys::HISTORY, &stale)?]).await?;

        record(&store, now(), "github.com", 10).await?;

        let history: Vec<HistoryEntry> = read(&store, keys::HISTORY).await?.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].domain, "github.com");
        Ok(())
    }

    #[tokio::test]
    async fn store_failure_drops_the_interval() -> Result<()> {
        let store = MemoryStore::new();
        record(&store, now(), "github.com", 10).await?;

        store.set_failing(true);
        assert!(record(&store, now(), "github.com", 20).await.is_err());

        store.set_failing(false);
        let daily: DailyBucket = read(&store, keys::DAILY).await?.unwrap();
        assert_eq!(daily.total, 10);
        Ok(())
    }

    #[tokio::test]
    async fn default_lists_apply_when_none_are_stored() -> Result<()> {
        let store = MemoryStore::new();

        let recorded = record(&store, now(), "stackoverflow.com", 15).await?;
        assert_eq!(recorded.observation.category, Category::Productive);

        let recorded = record(&store, now(), "reddit.com", 15).await?;
        assert_eq!(recorded.observation.category, Category::Unproductive);
        Ok(())
    }
}
