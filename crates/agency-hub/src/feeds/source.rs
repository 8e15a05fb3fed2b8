use async_trait::async_trait;
use serde_json::Value;

use super::error::FeedError;
use crate::agencies::ExternalAgencyRecord;

/// Outcome of probing one page of a sequentially numbered feed.
#[derive(Debug)]
pub enum FeedPage {
    /// The page exists; zero or more records were decoded from it.
    Records(Vec<Value>),
    /// The page does not exist. This is the normal end of the feed.
    Boundary,
    /// The page could not be fetched or decoded.
    Failure(FeedError),
}

/// JSON listing endpoint scoped by an agency's vendor key.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn property_listings(&self, key: &str) -> Result<Value, FeedError>;
}

/// Directory of agencies published by the listing vendor.
#[async_trait]
pub trait AgencyDirectory: Send + Sync {
    async fn agencies(&self) -> Result<Vec<ExternalAgencyRecord>, FeedError>;
}

/// Feed split across `key-0`, `key-1`, ... with no index of how many exist.
#[async_trait]
pub trait PagedFeed: Send + Sync {
    async fn page(&self, key: &str, index: usize) -> FeedPage;
}

/// Pass-through lookups against the portal APIs.
#[async_trait]
pub trait PortalListings: Send + Sync {
    async fn myhome_property(&self, key: &str, id: &str) -> Result<Value, FeedError>;
    async fn daft_property(&self, key: &str, id: &str) -> Result<Value, FeedError>;
    async fn daft_properties(&self, key: &str) -> Result<Value, FeedError>;
}
