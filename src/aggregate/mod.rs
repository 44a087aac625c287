//! Aggregation core: raw funnel rows to a daily counted time series.
//!
//! This is the heart of the pipeline:
//!
//! ```text
//! ┌───────────┐    ┌────────┐    ┌───────────┐    ┌──────────┐    ┌────────┐
//! │ RawTable  │───▶│ filter │───▶│ normalize │───▶│ group +  │───▶│ reshape│
//! │ (rows)    │    │ status │    │ dates,    │    │ resample │    │ + sort │
//! └───────────┘    │ channel│    │ names     │    │ daily    │    └────────┘
//!                  └────────┘    └───────────┘    └──────────┘
//! ```
//!
//! Rows survive the filter when their status is not "Lost" and their channel
//! is one of the sales channels we dashboard. Surviving rows are keyed by
//! (channel, state, contract period, bandwidth, nationality), bucketed per
//! calendar day of their probability milestone, and counted. Resampling fills
//! the gaps inside each partition's span with explicit zero buckets; the
//! reshape step drops them again, so a day with no records never reaches the
//! output. The result is sorted ascending by date.

pub mod normalize;

pub use normalize::{parse_milestone, title_case};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, ProcessResult};
use crate::loader::{Cell, RawTable};

/// Report column: sales channel.
pub const COL_CHANNEL: &str = "Channel";
/// Report column: funnel status.
pub const COL_STATUS: &str = "Funn Status";
/// Report column: customer nationality.
pub const COL_NATIONALITY: &str = "Nationality";
/// Report column: geographic state.
pub const COL_STATE: &str = "Blk State";
/// Report column: contract period in months.
pub const COL_CONTRACT_PERIOD: &str = "Funn Monthcontractperiod";
/// Report column: subscribed bandwidth.
pub const COL_BANDWIDTH: &str = "Funnel Bandwidth";
/// Report column: sales order number.
pub const COL_ORDER_NO: &str = "Funnel SO No";
/// Report column: probability milestone date, the time axis.
pub const COL_MILESTONE: &str = "Probability 90% Date";

/// Channels that participate in the dashboard.
pub const ALLOWED_CHANNELS: [&str; 3] = ["ONLINE", "INSIDE SALES", "DEALER"];

/// Status excluded from aggregation.
const LOST_STATUS: &str = "Lost";

/// One row of the aggregated output: a grouping key, a day, and how many
/// funnel records crossed the probability milestone that day.
///
/// Invariant: `count > 0`. The aggregated table is sorted ascending by `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFunnelCount {
    pub channel: String,
    pub state: String,
    pub contract_period: String,
    pub bandwidth: String,
    pub nationality: String,
    pub date: NaiveDate,
    pub count: u32,
}

/// Resolved indices of the report columns the aggregation needs.
struct ReportColumns {
    channel: usize,
    status: usize,
    nationality: usize,
    state: usize,
    contract_period: usize,
    bandwidth: usize,
    milestone: usize,
}

impl ReportColumns {
    fn resolve(table: &RawTable) -> ProcessResult<Self> {
        let find = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| ProcessError::MissingColumn(name.to_string()))
        };

        // The order number column is only counted, never read, but a report
        // without it is not the report this pipeline understands.
        find(COL_ORDER_NO)?;

        Ok(Self {
            channel: find(COL_CHANNEL)?,
            status: find(COL_STATUS)?,
            nationality: find(COL_NATIONALITY)?,
            state: find(COL_STATE)?,
            contract_period: find(COL_CONTRACT_PERIOD)?,
            bandwidth: find(COL_BANDWIDTH)?,
            milestone: find(COL_MILESTONE)?,
        })
    }
}

/// Grouping key for one partition of the report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    channel: String,
    state: String,
    contract_period: String,
    bandwidth: String,
    nationality: String,
}

/// Aggregate the raw report into the daily counted time series.
///
/// An empty report, or a report where every row is filtered away, yields an
/// empty table, not an error. A report missing an expected column fails with
/// [`ProcessError::MissingColumn`].
pub fn aggregate(table: &RawTable) -> ProcessResult<Vec<DailyFunnelCount>> {
    let cols = ReportColumns::resolve(table)?;

    let mut partitions: BTreeMap<GroupKey, BTreeMap<NaiveDate, u32>> = BTreeMap::new();

    for row in &table.rows {
        let status = cell_text(&row[cols.status]);
        if status == LOST_STATUS {
            continue;
        }

        let channel = cell_text(&row[cols.channel]);
        if !ALLOWED_CHANNELS.contains(&channel.as_str()) {
            continue;
        }

        // Unparseable milestone values coerce to null, and null milestones
        // are dropped before grouping.
        let Some(milestone) = parse_milestone(&row[cols.milestone]) else {
            continue;
        };

        let key = GroupKey {
            channel,
            state: cell_text(&row[cols.state]),
            contract_period: cell_text(&row[cols.contract_period]),
            bandwidth: cell_text(&row[cols.bandwidth]),
            nationality: title_case(&cell_text(&row[cols.nationality])),
        };

        *partitions
            .entry(key)
            .or_default()
            .entry(milestone.date())
            .or_insert(0) += 1;
    }

    let mut records = Vec::new();
    for (key, days) in &partitions {
        for (date, count) in resample_daily(days) {
            if count > 0 {
                records.push(DailyFunnelCount {
                    channel: key.channel.clone(),
                    state: key.state.clone(),
                    contract_period: key.contract_period.clone(),
                    bandwidth: key.bandwidth.clone(),
                    nationality: key.nationality.clone(),
                    date,
                    count,
                });
            }
        }
    }

    // Final, authoritative order. The sort is stable, so ties on date keep
    // their partition order; nothing downstream relies on that.
    records.sort_by_key(|r| r.date);

    Ok(records)
}

/// Re-express a partition's day buckets on a continuous daily axis.
///
/// Days between the partition's first and last observed date that have no
/// records are materialized with an explicit zero count; the caller drops
/// them during reshaping.
fn resample_daily(days: &BTreeMap<NaiveDate, u32>) -> Vec<(NaiveDate, u32)> {
    let (Some((&first, _)), Some((&last, _))) = (days.first_key_value(), days.last_key_value())
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut day = first;
    loop {
        out.push((day, days.get(&day).copied().unwrap_or(0)));
        if day >= last {
            break;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}

/// Text content of a cell as it participates in filtering and grouping.
fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.trim().to_string(),
        other => other.to_display_string(),
    }
}
