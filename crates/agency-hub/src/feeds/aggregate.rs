use serde_json::Value;
use std::sync::Arc;

use super::error::{AggregateError, LookupError};
use super::source::{FeedPage, PagedFeed};

/// Walks a paged feed from index 0 until the first missing page.
#[derive(Clone)]
pub struct FeedAggregator {
    feed: Arc<dyn PagedFeed>,
}

impl FeedAggregator {
    pub fn new(feed: Arc<dyn PagedFeed>) -> Self {
        Self { feed }
    }

    /// Every record across every page, in page order.
    ///
    /// A missing page ends the walk successfully. Any other failure discards
    /// what was collected and reports the page index it happened on.
    pub async fn collect(&self, key: &str) -> Result<Vec<Value>, AggregateError> {
        let mut records = Vec::new();
        let mut file_index = 0;

        loop {
            match self.feed.page(key, file_index).await {
                FeedPage::Records(page) => {
                    tracing::debug!(key, file_index, count = page.len(), "feed page loaded");
                    records.extend(page);
                }
                FeedPage::Boundary => break,
                FeedPage::Failure(source) => {
                    tracing::warn!(key, file_index, error = %source, "feed page failed");
                    return Err(AggregateError { file_index, source });
                }
            }
            file_index += 1;
        }

        tracing::info!(key, pages = file_index, records = records.len(), "feed aggregated");
        Ok(records)
    }

    /// Find one record by id. Ids may arrive prefixed with the feed key.
    pub async fn find(&self, key: &str, requested_id: &str) -> Result<Value, LookupError> {
        let property_id = requested_id.strip_prefix(key).unwrap_or(requested_id);
        let records = self.collect(key).await?;
        let searched = records.len();

        records
            .into_iter()
            .find(|record| record.get("id").and_then(Value::as_str) == Some(property_id))
            .ok_or_else(|| LookupError::NotFound {
                property_id: property_id.to_string(),
                requested_id: requested_id.to_string(),
                searched,
            })
    }
}
