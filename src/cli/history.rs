use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    storage::{
        entities::{HistoryEntry, HISTORY_RETENTION_DAYS},
        store::{keys, read_or_default, StateStore},
    },
    utils::time::next_day_start,
};

use super::{output::format_duration, Args};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct HistoryCommand {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if start and end are both 15/03/2025 this option allows to extract the whole day"
    )]
    treat_as_days: bool,
}

/// Command to process `history`. Prints raw observations from the
/// retention window between `start_date` and `end_date`.
pub async fn process_history_command(
    HistoryCommand {
        start_date,
        end_date,
        date_style,
        treat_as_days,
    }: HistoryCommand,
    store: &impl StateStore,
) -> Result<()> {
    let (start, end) = parse_range(start_date, end_date, date_style, treat_as_days)?;

    let history: Vec<HistoryEntry> = read_or_default(store, keys::HISTORY).await?;

    for entry in history
        .iter()
        .filter(|entry| entry.timestamp >= start && entry.timestamp < end)
    {
        println!(
            "{}\t{}\t{}\t{}",
            entry
                .timestamp
                .with_timezone(&Local)
                .format("%x %H:%M:%S"),
            format_duration(entry.seconds),
            entry.category,
            entry.domain,
        );
    }
    Ok(())
}

fn parse_range(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let now = Local::now();
    let dialect: chrono_english::Dialect = date_style.into();

    let mut start = match start_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
        None => now - Duration::days(HISTORY_RETENTION_DAYS),
    };
    let mut end = match end_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate end date {e}"),
                )
                .into());
        }
        None => now,
    };
    if treat_as_days {
        start = start.beginning_of_day();
        end = next_day_start(end);
    }

    Ok((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}
