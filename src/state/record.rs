//! Rank records and the state-transition rules applied once per pass.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Ranking history for one (country, keyword) key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankRecord {
    /// Rank observed the first time this key was seen. Write-once.
    pub initial_rank: Option<u32>,
    /// Most recently observed rank; `None` = not found in the last check.
    pub last_rank: Option<u32>,
    /// Timestamp of the last rank change, `"%d %b %H:%M"`.
    pub last_change_time: Option<String>,
}

impl RankRecord {
    /// Applies one observation to a previous record (or absence thereof).
    ///
    /// - `last_change_time` is stamped iff the observed rank differs from
    ///   the previous `last_rank`, including to/from not-found.
    /// - `initial_rank` is set only while it is still `None`.
    pub fn update(prev: Option<RankRecord>, observed: Option<u32>, now: &str) -> RankRecord {
        let mut record = prev.unwrap_or_default();

        if record.last_rank != observed {
            record.last_change_time = Some(now.to_string());
        }
        record.last_rank = observed;

        if record.initial_rank.is_none() {
            record.initial_rank = observed;
        }

        record
    }
}

/// On-disk shape of a record. Early versions of the state file stored a bare
/// rank value instead of a structure; both forms must load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredRecord {
    Legacy(u32),
    Record(RankRecord),
}

impl StoredRecord {
    /// Normalizes into a structured record. Done once at load time.
    pub fn normalize(self) -> RankRecord {
        match self {
            StoredRecord::Legacy(rank) => RankRecord {
                initial_rank: Some(rank),
                last_rank: Some(rank),
                last_change_time: None,
            },
            StoredRecord::Record(mut record) => {
                record.last_change_time =
                    record.last_change_time.map(|t| convert_legacy_time(&t));
                record
            }
        }
    }
}

impl From<RankRecord> for StoredRecord {
    fn from(record: RankRecord) -> Self {
        StoredRecord::Record(record)
    }
}

/// Formats a single rank for display: `#{n}` or `x` when absent.
pub fn format_rank(rank: Option<u32>) -> String {
    match rank {
        Some(n) => format!("#{}", n),
        None => "x".to_string(),
    }
}

/// Formats the previous-to-current rank transition for the `Now` column.
pub fn format_transition(prev: Option<u32>, new: Option<u32>) -> String {
    match (prev, new) {
        (Some(p), Some(n)) if p == n => format!("#{}", n),
        (Some(p), Some(n)) => format!("#{} → #{}", p, n),
        (Some(p), None) => format!("#{} → x", p),
        (None, Some(n)) => format!("x → #{}", n),
        (None, None) => "x".to_string(),
    }
}

/// Current local time as `"%d %b %H:%M"` (honors `TZ`).
pub fn now_string() -> String {
    Local::now().format("%d %b %H:%M").to_string()
}

/// Re-renders a `"%Y-%m-%d %H:%M:%S"` timestamp written by older versions
/// into the current display format. Anything else passes through unchanged.
fn convert_legacy_time(time: &str) -> String {
    match NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S") {
        Ok(parsed) => parsed.format("%d %b %H:%M").to_string(),
        Err(_) => time.to_string(),
    }
}
