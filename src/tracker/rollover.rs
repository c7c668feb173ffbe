use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::storage::{
    entities::{DailyBucket, DayArchive, MonthlyArchive, WeeklyBucket},
    store::{entry, keys, read, read_or_default, StateStore},
};

/// Daily rollover, checked at least once per hour. When the stored daily
/// bucket belongs to an earlier date it is archived into the weekly day
/// list and folded into the month entry for the current `(month, year)`,
/// then the daily bucket restarts empty under today's date.
///
/// Running this twice on the same date is a no-op, so the hourly check can
/// fire as often as it likes.
pub async fn check_daily_rollover(store: &impl StateStore, today: NaiveDate) -> Result<bool> {
    let Some(daily) = read::<DailyBucket>(store, keys::DAILY).await? else {
        // Nothing tracked yet. Seed an empty bucket so the next check has
        // a date to compare against.
        store
            .set(vec![entry(keys::DAILY, &DailyBucket::new(today))?])
            .await?;
        return Ok(false);
    };

    if daily.date == today {
        return Ok(false);
    }

    let mut weekly: WeeklyBucket = read_or_default(store, keys::WEEKLY).await?;
    let mut monthly: MonthlyArchive = read_or_default(store, keys::MONTHLY).await?;

    let outgoing_date = daily.date;
    let totals = daily.totals;
    weekly.archive_day(DayArchive::from(daily));
    monthly.fold_day(today.month(), today.year(), &totals);

    store
        .set(vec![
            entry(keys::DAILY, &DailyBucket::new(today))?,
            entry(keys::WEEKLY, &weekly)?,
            entry(keys::MONTHLY, &monthly)?,
        ])
        .await?;

    info!("Archived {outgoing_date}, daily bucket reset for {today}");
    Ok(true)
}
