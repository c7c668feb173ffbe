use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::{
    entities::{
        CategoryLists, DailyBucket, HistoryEntry, MonthlyArchive, Settings, WeeklyBucket,
        WeeklyReport,
    },
    store::{entry, keys, read, read_or_default, StateStore},
};

use super::seed_defaults;

/// Requests UI collaborators (popup, dashboard, CLI) may send to the
/// tracker. The wire format is `{"action": "...", ...}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlRequest {
    GetStats,
    ResetData,
    ExportData,
    ClearAllData,
    UpdateSettings { settings: Settings },
    UpdateCategories { categories: CategoryLists },
}

#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub daily: DailyBucket,
    pub weekly: WeeklyBucket,
    pub monthly: MonthlyArchive,
    pub history: Vec<HistoryEntry>,
    pub reports: Vec<WeeklyReport>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ControlResponse {
    Stats(Box<StatsSnapshot>),
    Export(Map<String, Value>),
    Ack { success: bool },
}

/// Serves one control request against the store. Runs inside the tracker's
/// dispatch loop (or a standalone CLI process), so it never observes a
/// half-applied mutation from a concurrent handler.
pub async fn handle_control(
    store: &impl StateStore,
    request: ControlRequest,
    today: NaiveDate,
) -> Result<ControlResponse> {
    match request {
        ControlRequest::GetStats => {
            let daily = read(store, keys::DAILY)
                .await?
                .unwrap_or_else(|| DailyBucket::new(today));
            Ok(ControlResponse::Stats(Box::new(StatsSnapshot {
                daily,
                weekly: read_or_default(store, keys::WEEKLY).await?,
                monthly: read_or_default(store, keys::MONTHLY).await?,
                history: read_or_default(store, keys::HISTORY).await?,
                reports: read_or_default(store, keys::REPORTS).await?,
            })))
        }
        ControlRequest::ResetData => {
            store
                .set(vec![entry(keys::DAILY, &DailyBucket::new(today))?])
                .await?;
            Ok(ControlResponse::Ack { success: true })
        }
        ControlRequest::ExportData => Ok(ControlResponse::Export(store.snapshot().await?)),
        ControlRequest::ClearAllData => {
            store.clear().await?;
            seed_defaults(store, today).await?;
            Ok(ControlResponse::Ack { success: true })
        }
        ControlRequest::UpdateSettings { settings } => {
            store.set(vec![entry(keys::SETTINGS, &settings)?]).await?;
            Ok(ControlResponse::Ack { success: true })
        }
        ControlRequest::UpdateCategories { categories } => {
            store
                .set(vec![entry(keys::CATEGORIES, &categories)?])
                .await?;
            Ok(ControlResponse::Ack { success: true })
        }
    }
}
