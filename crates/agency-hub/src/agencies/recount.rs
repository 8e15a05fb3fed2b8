use serde::Serialize;
use serde_json::Value;

use super::domain::Agency;
use crate::feeds::FeedError;

/// Number of listings in a vendor response; anything but a JSON array counts as zero.
pub fn listing_count(listings: &Value) -> i64 {
    listings
        .as_array()
        .map(|items| items.len() as i64)
        .unwrap_or(0)
}

/// An agency whose count was written during a bulk recount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecountEntry {
    pub agency: Option<String>,
    pub unique_key: String,
    pub total_properties: i64,
}

/// A vendor fetch that failed during a bulk recount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecountFailure {
    pub agency: Option<String>,
    pub unique_key: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RecountFailure {
    pub fn new(agency: &Agency, unique_key: &str, error: &FeedError) -> Self {
        Self {
            agency: agency.profile.name.clone(),
            unique_key: unique_key.to_string(),
            error: error.to_string(),
            status: error.status(),
            data: error.body(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecountReport {
    pub results: Vec<RecountEntry>,
    pub errors: Vec<RecountFailure>,
}
