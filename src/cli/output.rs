use ansi_term::Colour;

use crate::{
    storage::entities::{CategoryTotals, ProductivityLevel, SiteRecord},
    tracker::{
        control::StatsSnapshot,
        report::{level_for, productivity_score},
    },
};

const TOP_SITES_SHOWN: usize = 10;
const REPORTS_SHOWN: usize = 5;

pub fn render_stats(stats: &StatsSnapshot) {
    println!("Today ({})", stats.daily.date);
    print_totals(&stats.daily.totals, stats.daily.total);

    let mut sites: Vec<(&String, &SiteRecord)> = stats.daily.sites.iter().collect();
    sites.sort_by(|a, b| b.1.seconds.cmp(&a.1.seconds));
    if !sites.is_empty() {
        println!();
        for (domain, record) in sites.into_iter().take(TOP_SITES_SHOWN) {
            println!(
                "  {}\t{} visits\t{}\t{}",
                format_duration(record.seconds),
                record.visits,
                record.category,
                domain
            );
        }
    }

    println!();
    println!("This week ({} archived days)", stats.weekly.days.len());
    print_totals(&stats.weekly.totals, stats.weekly.total);
    let score = productivity_score(stats.weekly.totals.productive, stats.weekly.total);
    let level = level_for(score);
    println!(
        "  score\t\t{}",
        level_colour(level).paint(format!("{score}% - {level}"))
    );

    if !stats.monthly.months.is_empty() {
        println!();
        println!("Months");
        for month in &stats.monthly.months {
            println!(
                "  {:04}-{:02}\t{}\t{}% productive",
                month.year,
                month.month,
                format_duration(month.total),
                productivity_score(month.totals.productive, month.total)
            );
        }
    }

    if !stats.reports.is_empty() {
        println!();
        println!("Recent reports");
        for report in stats.reports.iter().rev().take(REPORTS_SHOWN) {
            println!(
                "  week {}/{}\t{}\t{}",
                report.week,
                report.year,
                format_duration(report.total),
                level_colour(report.level).paint(format!("{}% - {}", report.score, report.level))
            );
        }
    }
}

fn print_totals(totals: &CategoryTotals, total: u64) {
    println!("  productive\t{}", format_duration(totals.productive));
    println!("  unproductive\t{}", format_duration(totals.unproductive));
    println!("  neutral\t{}", format_duration(totals.neutral));
    println!("  total\t\t{}", format_duration(total));
}

pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = seconds % 3600 / 60;
    let seconds = seconds % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn level_colour(level: ProductivityLevel) -> Colour {
    match level {
        ProductivityLevel::Excellent => Colour::Green,
        ProductivityLevel::Good => Colour::Blue,
        ProductivityLevel::Average => Colour::Yellow,
        ProductivityLevel::NeedsImprovement => Colour::Red,
    }
}
