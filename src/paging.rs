use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Current instant as RFC3339 UTC with fixed-width microseconds, so the
/// stored text compares lexicographically in chronological order.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Composite cursor for recency-ordered feeds: primary `created_at`
/// descending, tie-break `id` descending. Both components together form one
/// total order, so no two live rows compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCursor {
    pub created_at: String,
    pub id: i64,
}

/// Paging envelope for feed listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPaging {
    pub has_next: bool,
    pub next_created_at: Option<String>,
    pub next_id: Option<i64>,
}

pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Split a `limit + 1` fetch into the emitted page and the has-next flag.
/// The extra row is only a lookahead and is never returned.
pub fn split_page<T>(mut rows: Vec<T>, limit: u32) -> (Vec<T>, bool) {
    let limit = limit as usize;
    if rows.len() > limit {
        rows.truncate(limit);
        (rows, true)
    } else {
        (rows, false)
    }
}

/// Feed paging metadata from an emitted page, keyed by the last row.
pub fn feed_paging<T>(rows: &[T], has_next: bool, key: impl Fn(&T) -> FeedCursor) -> FeedPaging {
    let next = if has_next { rows.last().map(&key) } else { None };
    FeedPaging {
        has_next,
        next_created_at: next.as_ref().map(|c| c.created_at.clone()),
        next_id: next.map(|c| c.id),
    }
}
