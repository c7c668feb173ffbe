use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Days of archived dailies kept inside the weekly bucket.
pub const WEEKLY_DAYS_CAP: usize = 7;
/// Month entries kept in the monthly archive.
pub const MONTHLY_ENTRIES_CAP: usize = 12;
/// Weekly reports kept before the oldest are evicted.
pub const REPORTS_CAP: usize = 52;
/// Retention window for the observation history log.
pub const HISTORY_RETENTION_DAYS: i64 = 30;

/// Classification of tracked time.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Productive,
    Unproductive,
    Neutral,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Productive => write!(f, "productive"),
            Category::Unproductive => write!(f, "unproductive"),
            Category::Neutral => write!(f, "neutral"),
        }
    }
}

/// User-configurable domain membership lists. A domain present in neither
/// list is neutral. Membership is mutually exclusive by configuration
/// contract; the productive list wins if that contract is broken.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct CategoryLists {
    pub productive: std::collections::BTreeSet<String>,
    pub unproductive: std::collections::BTreeSet<String>,
}

/// Per-category second counters shared by every period bucket.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct CategoryTotals {
    pub productive: u64,
    pub unproductive: u64,
    pub neutral: u64,
}

impl CategoryTotals {
    pub fn add(&mut self, category: Category, seconds: u64) {
        match category {
            Category::Productive => self.productive += seconds,
            Category::Unproductive => self.unproductive += seconds,
            Category::Neutral => self.neutral += seconds,
        }
    }

    pub fn merge(&mut self, other: &CategoryTotals) {
        self.productive += other.productive;
        self.unproductive += other.unproductive;
        self.neutral += other.neutral;
    }

    pub fn sum(&self) -> u64 {
        self.productive + self.unproductive + self.neutral
    }
}

/// Accumulated time for one domain within the current day.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct SiteRecord {
    pub seconds: u64,
    pub visits: u64,
    /// Fixed at the first observation of the day. Later changes to the
    /// category lists do not reclassify time already attributed.
    pub category: Category,
}

/// The in-progress day. This is the only bucket carrying per-site detail
/// for the current day; rollover snapshots it into [DayArchive].
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub sites: BTreeMap<String, SiteRecord>,
    #[serde(flatten)]
    pub totals: CategoryTotals,
    pub total: u64,
}

impl DailyBucket {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            sites: BTreeMap::new(),
            totals: CategoryTotals::default(),
            total: 0,
        }
    }

    /// Folds one observation into the day. The site's category is set only
    /// when the record is created.
    pub fn record(&mut self, domain: &str, seconds: u64, category: Category) {
        let site = self.sites.entry(domain.to_owned()).or_insert(SiteRecord {
            seconds: 0,
            visits: 0,
            category,
        });
        site.seconds += seconds;
        site.visits += 1;
        self.totals.add(category, seconds);
        self.total += seconds;
    }
}

/// A finished day as archived by the daily rollover.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DayArchive {
    pub date: NaiveDate,
    pub sites: BTreeMap<String, SiteRecord>,
    #[serde(flatten)]
    pub totals: CategoryTotals,
    pub total: u64,
}

impl From<DailyBucket> for DayArchive {
    fn from(daily: DailyBucket) -> Self {
        Self {
            date: daily.date,
            sites: daily.sites,
            totals: daily.totals,
            total: daily.total,
        }
    }
}

/// Rolling week. `days` holds the last [WEEKLY_DAYS_CAP] archived dailies;
/// the totals accumulate independently and are only reset externally.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyBucket {
    pub days: Vec<DayArchive>,
    #[serde(flatten)]
    pub totals: CategoryTotals,
    pub total: u64,
}

impl WeeklyBucket {
    pub fn record(&mut self, seconds: u64, category: Category) {
        self.totals.add(category, seconds);
        self.total += seconds;
    }

    pub fn archive_day(&mut self, day: DayArchive) {
        self.days.push(day);
        while self.days.len() > WEEKLY_DAYS_CAP {
            self.days.remove(0);
        }
    }
}

/// One month of archived time, updated incrementally as days roll over.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MonthEntry {
    pub month: u32,
    pub year: i32,
    #[serde(flatten)]
    pub totals: CategoryTotals,
    pub total: u64,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct MonthlyArchive {
    pub months: Vec<MonthEntry>,
}

impl MonthlyArchive {
    /// Adds a finished day's totals to the entry for `(month, year)`,
    /// creating it if absent. The archive keeps the last
    /// [MONTHLY_ENTRIES_CAP] entries, oldest evicted first.
    pub fn fold_day(&mut self, month: u32, year: i32, totals: &CategoryTotals) {
        let entry = match self
            .months
            .iter_mut()
            .find(|m| m.month == month && m.year == year)
        {
            Some(entry) => entry,
            None => {
                self.months.push(MonthEntry {
                    month,
                    year,
                    totals: CategoryTotals::default(),
                    total: 0,
                });
                self.months.last_mut().expect("entry was just pushed")
            }
        };
        entry.totals.merge(totals);
        entry.total += totals.sum();

        while self.months.len() > MONTHLY_ENTRIES_CAP {
            self.months.remove(0);
        }
    }
}

/// One recorded observation. The log is append-only and sorted by
/// timestamp; [prune_history] drops entries older than the retention
/// window from the oldest end.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub domain: String,
    pub seconds: u64,
    pub category: Category,
}

pub fn prune_history(history: &mut Vec<HistoryEntry>, now: DateTime<Utc>) {
    let cutoff = now - Duration::days(HISTORY_RETENTION_DAYS);
    while history.first().is_some_and(|entry| entry.timestamp < cutoff) {
        history.remove(0);
    }
}

/// Productivity rating attached to a weekly report.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize, Clone, Copy)]
pub enum ProductivityLevel {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl std::fmt::Display for ProductivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductivityLevel::Excellent => write!(f, "Excellent"),
            ProductivityLevel::Good => write!(f, "Good"),
            ProductivityLevel::Average => write!(f, "Average"),
            ProductivityLevel::NeedsImprovement => write!(f, "Needs Improvement"),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub week: u32,
    pub year: i32,
    #[serde(flatten)]
    pub totals: CategoryTotals,
    pub total: u64,
    /// Percentage of tracked time classified productive, 0..=100.
    pub score: u8,
    pub level: ProductivityLevel,
    pub generated_at: DateTime<Utc>,
}

/// Runtime settings, mutated only through the `updateSettings` control
/// message.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_reset: bool,
    pub notifications: bool,
    pub weekly_report: bool,
    pub sync_to_server: bool,
    pub server_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_reset: true,
            notifications: true,
            weekly_report: true,
            sync_to_server: false,
            server_url: "http://localhost:5000".into(),
        }
    }
}
