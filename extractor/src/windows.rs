use crate::client::Transport;
use crate::model::Window;
use crate::paginate;
use chrono::{DateTime, Datelike, Months, SecondsFormat, Utc};
use extractor_core::Result;
use serde_json::Value;
use tracing::debug;

/// Longest `since..until` span the list endpoints accept, in whole
/// calendar months. Ranges at or past this get carved into windows.
pub const MAX_WINDOW_MONTHS: u32 = 5;

fn whole_months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let mut months =
        (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if (end.day(), end.time()) < (start.day(), start.time()) {
        months -= 1;
    }
    months.max(0) as u32
}

/// Split `[since, until]` into contiguous, non-overlapping windows whose
/// union exactly covers the range.
pub fn split_windows(since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<Window> {
    let mut windows = Vec::new();
    let mut cursor = since;

    while whole_months_between(cursor, until) >= MAX_WINDOW_MONTHS {
        let end = cursor
            .checked_add_months(Months::new(MAX_WINDOW_MONTHS))
            .unwrap_or(until)
            .min(until);
        windows.push(Window { start: cursor, end });
        cursor = end;
    }

    if cursor < until || windows.is_empty() {
        windows.push(Window {
            start: cursor,
            end: until,
        });
    }

    windows
}

/// Paginate through each window of `[since, until]` and concatenate the
/// results. A range already within the span limit produces a single
/// window, identical to an unwindowed fetch.
pub async fn fetch_windowed<T>(
    transport: &T,
    path: &str,
    resource: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<Value>>
where
    T: Transport + ?Sized,
{
    let mut all = Vec::new();

    for window in split_windows(since, until) {
        debug!(path, start = %window.start, end = %window.end, "Fetching window");
        let query = vec![
            (
                "since".to_string(),
                window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "until".to_string(),
                window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];
        let items = paginate::fetch_all(transport, path, &query, resource, limit).await?;
        all.extend(items);
    }

    Ok(all)
}
