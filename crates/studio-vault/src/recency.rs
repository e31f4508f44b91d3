//! Search and calendar-day grouping of records

use chrono::{DateTime, Days, NaiveTime, TimeZone};
use serde::Serialize;
use studio_core::ProjectRecord;

/// Records partitioned by local calendar day
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecencyGroups {
    pub today: Vec<ProjectRecord>,
    pub yesterday: Vec<ProjectRecord>,
    pub older: Vec<ProjectRecord>,
}

impl RecencyGroups {
    /// Buckets with their display labels, in display order
    #[must_use]
    pub fn labeled(&self) -> [(&'static str, &[ProjectRecord]); 3] {
        [
            ("Today", self.today.as_slice()),
            ("Yesterday", self.yesterday.as_slice()),
            ("Older", self.older.as_slice()),
        ]
    }

    /// Total records across buckets
    #[must_use]
    pub fn len(&self) -> usize {
        self.today.len() + self.yesterday.len() + self.older.len()
    }

    /// True when every bucket is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Start of the calendar day containing `now`, in epoch ms
fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map_or_else(|| now.timestamp_millis(), |dt| dt.timestamp_millis())
}

fn start_of_previous_day<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<i64> {
    let day = now.date_naive().checked_sub_days(Days::new(1))?;
    now.timezone()
        .from_local_datetime(&day.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// Split `records` into Today / Yesterday / Older relative to `now`.
///
/// Order inside each bucket follows the input. Records from the future count
/// as today.
#[must_use]
pub fn group_by_recency<Tz: TimeZone>(records: &[ProjectRecord], now: &DateTime<Tz>) -> RecencyGroups {
    let today_start = start_of_day(now);
    let yesterday_start = start_of_previous_day(now).unwrap_or(i64::MIN);

    let mut groups = RecencyGroups::default();
    for record in records {
        let bucket = if record.timestamp >= today_start {
            &mut groups.today
        } else if record.timestamp >= yesterday_start {
            &mut groups.yesterday
        } else {
            &mut groups.older
        };
        bucket.push(record.clone());
    }
    groups
}

/// Case-insensitive substring match over title and tool id.
///
/// A blank query matches everything.
#[must_use]
pub fn matches_query(record: &ProjectRecord, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    record.title.to_lowercase().contains(&needle)
        || record.tool.as_str().to_lowercase().contains(&needle)
}

/// Records matching `query`, order preserved
#[must_use]
pub fn filter_records(records: &[ProjectRecord], query: &str) -> Vec<ProjectRecord> {
    records
        .iter()
        .filter(|record| matches_query(record, query))
        .cloned()
        .collect()
}
