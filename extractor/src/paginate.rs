use crate::client::Transport;
use crate::model::Page;
use extractor_core::Result;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, warn};

/// Drain a paginated list endpoint into one collection.
///
/// The first request carries `limit` and `total=true`; follow-ups add an
/// `offset` equal to the running count of items fetched so far. Using
/// the running count (instead of blindly re-adding the page limit) keeps
/// the walk correct when the server returns short pages.
pub async fn fetch_all<T>(
    transport: &T,
    path: &str,
    base_query: &[(String, String)],
    resource: &str,
    limit: u32,
) -> Result<Vec<Value>>
where
    T: Transport + ?Sized,
{
    let mut items: Vec<Value> = Vec::new();

    loop {
        let mut query: Vec<(String, String)> = base_query.to_vec();
        query.push(("limit".to_string(), limit.to_string()));
        query.push(("total".to_string(), "true".to_string()));
        if !items.is_empty() {
            query.push(("offset".to_string(), items.len().to_string()));
        }

        let body = transport.get(path, &query).await?;
        let page = Page::from_body(body, resource, path)?;

        if page.limit != 0 && page.limit != u64::from(limit) {
            debug!(
                path,
                requested = limit,
                reported = page.limit,
                "Server adjusted page limit"
            );
        }

        // The page's own offset should equal our running total; divergence
        // means the server skipped or replayed records within this scope.
        if page.offset != items.len() as u64 {
            warn!(
                path,
                reported = page.offset,
                expected = items.len(),
                "Page offset diverges from running total"
            );
        }

        let fetched = page.items.len();
        let more = page.more;
        debug!(path, fetched, offset = page.offset, more, "Fetched page");
        items.extend(page.items);

        if !more {
            break;
        }
        if fetched == 0 {
            // A server claiming more pages while returning nothing would
            // otherwise loop forever.
            warn!(path, "Server reported more pages but returned no items; stopping");
            counter!("extractor_malformed_pages").increment(1);
            break;
        }
    }

    debug!(path, total = items.len(), "Pagination complete");
    Ok(items)
}
