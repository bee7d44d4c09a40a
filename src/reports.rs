//! Derived views over already-fetched records: usage totals, expiry aging,
//! time-bucketed usage trends, and headline inventory metrics. Pure
//! reducers with no store access; empty input yields empty output.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::{InventoryItem, UsageLogEntry};

/// Days-to-expiry classification used by the expiry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum AgingBucket {
    #[strum(serialize = "Expired")]
    Expired,
    #[strum(serialize = "<= 30 days")]
    Within30Days,
    #[strum(serialize = "<= 90 days")]
    Within90Days,
    #[strum(serialize = "> 90 days")]
    Beyond90Days,
    #[strum(serialize = "No expiry")]
    NoExpiry,
}

impl AgingBucket {
    /// Exact boundaries: 0 days is already expired, 30 is the last day of
    /// the first bucket, 31 falls into the 90-day bucket.
    pub fn classify(days_to_expiry: Option<i64>) -> Self {
        match days_to_expiry {
            None => AgingBucket::NoExpiry,
            Some(d) if d <= 0 => AgingBucket::Expired,
            Some(d) if d <= 30 => AgingBucket::Within30Days,
            Some(d) if d <= 90 => AgingBucket::Within90Days,
            Some(_) => AgingBucket::Beyond90Days,
        }
    }
}

/// One inventory item annotated for the expiry report.
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryRow {
    pub item_id: String,
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    pub unit: String,
    pub expiry_date: Option<NaiveDate>,
    pub days_to_expiry: Option<i64>,
    pub bucket: AgingBucket,
}

/// Annotates items with days-to-expiry and their aging bucket, soonest
/// expiry first; no-expiry items sort last.
pub fn expiry_overview(items: &[InventoryItem], today: NaiveDate) -> Vec<ExpiryRow> {
    let mut rows: Vec<ExpiryRow> = items
        .iter()
        .map(|item| {
            let days = item
                .expiry_date
                .map(|expiry| (expiry - today).num_days());
            ExpiryRow {
                item_id: item.item_id.clone(),
                item_name: item.item_name.clone(),
                category: item.category.clone(),
                quantity: item.quantity,
                unit: item.unit.clone(),
                expiry_date: item.expiry_date,
                days_to_expiry: days,
                bucket: AgingBucket::classify(days),
            }
        })
        .collect();
    rows.sort_by_key(|row| row.days_to_expiry.unwrap_or(i64::MAX));
    rows
}

/// Bucket counts for the expiry report header.
pub fn aging_summary(items: &[InventoryItem], today: NaiveDate) -> HashMap<AgingBucket, usize> {
    let mut summary = HashMap::new();
    for row in expiry_overview(items, today) {
        *summary.entry(row.bucket).or_insert(0) += 1;
    }
    summary
}

/// Per-item usage totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStat {
    pub item_name: String,
    pub total_units_used: i64,
    pub usage_count: usize,
}

/// Sums usage per item name, highest total first.
pub fn usage_stats(entries: &[UsageLogEntry]) -> Vec<UsageStat> {
    let mut totals: HashMap<&str, (i64, usize)> = HashMap::new();
    for entry in entries {
        let stat = totals.entry(entry.item_name.as_str()).or_insert((0, 0));
        stat.0 += entry.units_used;
        stat.1 += 1;
    }
    let mut stats: Vec<UsageStat> = totals
        .into_iter()
        .map(|(name, (total, count))| UsageStat {
            item_name: name.to_string(),
            total_units_used: total,
            usage_count: count,
        })
        .collect();
    stats.sort_by(|a, b| {
        b.total_units_used
            .cmp(&a.total_units_used)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    stats
}

/// Time grouping for the trend report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TrendPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl TrendPeriod {
    /// Start date of the bucket containing `date`. Weeks start on Monday;
    /// quarters on the first day of their first month.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            TrendPeriod::Daily => date,
            TrendPeriod::Weekly => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            TrendPeriod::Monthly => {
                NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
            }
            TrendPeriod::Quarterly => {
                let quarter_month = ((date.month0() / 3) * 3) + 1;
                NaiveDate::from_ymd_opt(date.year(), quarter_month, 1).unwrap_or(date)
            }
        }
    }
}

/// One point in the trend report: consumption of one item within one
/// time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub bucket_start: NaiveDate,
    pub item_name: String,
    pub units_used: i64,
}

/// Groups usage by time bucket and item, restricted to the `top_n` items
/// by total consumption. Points are ordered by bucket, then item name.
pub fn usage_trends(
    entries: &[UsageLogEntry],
    period: TrendPeriod,
    top_n: usize,
) -> Vec<TrendPoint> {
    if top_n == 0 {
        return Vec::new();
    }
    let leaders: Vec<String> = usage_stats(entries)
        .into_iter()
        .take(top_n)
        .map(|stat| stat.item_name)
        .collect();

    let mut buckets: HashMap<(NaiveDate, &str), i64> = HashMap::new();
    for entry in entries {
        if !leaders.iter().any(|name| name == &entry.item_name) {
            continue;
        }
        let bucket = period.bucket_start(entry.usage_date.date_naive());
        *buckets.entry((bucket, entry.item_name.as_str())).or_insert(0) += entry.units_used;
    }

    let mut points: Vec<TrendPoint> = buckets
        .into_iter()
        .map(|((bucket_start, item_name), units_used)| TrendPoint {
            bucket_start,
            item_name: item_name.to_string(),
            units_used,
        })
        .collect();
    points.sort_by(|a, b| {
        a.bucket_start
            .cmp(&b.bucket_start)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    points
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InventoryMetrics {
    pub total_items: usize,
    pub total_units: i64,
    pub categories: usize,
    pub low_stock_count: usize,
    pub expired_items: usize,
    pub expiring_soon: usize,
}

/// Metrics over the active inventory. "Expiring soon" means within the
/// next 30 days but not yet expired.
pub fn inventory_metrics(items: &[InventoryItem], today: NaiveDate) -> InventoryMetrics {
    if items.is_empty() {
        return InventoryMetrics::default();
    }
    let mut categories: Vec<&str> = items.iter().map(|i| i.category.as_str()).collect();
    categories.sort_unstable();
    categories.dedup();

    let mut metrics = InventoryMetrics {
        total_items: items.len(),
        total_units: items.iter().map(|i| i.quantity).sum(),
        categories: categories.len(),
        ..Default::default()
    };
    for item in items {
        if item.is_low_stock() {
            metrics.low_stock_count += 1;
        }
        if let Some(days) = item.expiry_date.map(|e| (e - today).num_days()) {
            if days <= 0 {
                metrics.expired_items += 1;
            } else if days <= 30 {
                metrics.expiring_soon += 1;
            }
        }
    }
    metrics
}
