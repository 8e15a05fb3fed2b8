//! reqwest-backed clients for the 4pm, Acquaint, MyHome and Daft endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;

use super::error::FeedError;
use super::source::{AgencyDirectory, FeedPage, ListingSource, PagedFeed, PortalListings};
use super::xml;
use crate::agencies::ExternalAgencyRecord;
use crate::config::FeedConfig;

#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: Client,
    config: FeedConfig,
}

impl HttpFeedClient {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn listings_url(&self, key: &str) -> String {
        format!("{}/api/property/json?Key={key}", self.config.fourpm_base_url)
    }

    fn directory_url(&self, directory_key: &str) -> String {
        format!(
            "{}/api/Agency/GetAgency?Key={directory_key}",
            self.config.fourpm_base_url
        )
    }

    fn page_url(&self, key: &str, index: usize) -> String {
        format!("{}/{key}-{index}.xml", self.config.acquaint_base_url)
    }

    fn myhome_url(&self, key: &str, id: &str) -> String {
        format!(
            "{}/property/{key}/{id}?format=json",
            self.config.myhome_base_url
        )
    }

    fn daft_property_url(&self, key: &str, id: &str) -> String {
        format!(
            "{}/property/{}?key={}",
            self.config.daft_base_url,
            urlencoding::encode(id),
            urlencoding::encode(key)
        )
    }

    fn daft_listing_url(&self, key: &str) -> String {
        format!(
            "{}/property?key={}",
            self.config.daft_base_url,
            urlencoding::encode(key)
        )
    }

    /// GET `url` and return the body of a 2xx response.
    async fn fetch_text(&self, url: &str) -> Result<String, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FeedError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| FeedError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let body = self.fetch_text(url).await?;
        serde_json::from_str(&body).map_err(|error| FeedError::Decode {
            url: url.to_string(),
            message: error.to_string(),
        })
    }
}

#[async_trait]
impl ListingSource for HttpFeedClient {
    #[instrument(level = "debug", skip(self))]
    async fn property_listings(&self, key: &str) -> Result<Value, FeedError> {
        if key.is_empty() {
            return Err(FeedError::MissingKey);
        }
        self.fetch_json(&self.listings_url(key)).await
    }
}

#[async_trait]
impl AgencyDirectory for HttpFeedClient {
    #[instrument(level = "debug", skip(self))]
    async fn agencies(&self) -> Result<Vec<ExternalAgencyRecord>, FeedError> {
        let directory_key = self
            .config
            .agency_directory_key
            .as_deref()
            .ok_or(FeedError::Unconfigured("FOURPM_AGENCY_KEY"))?;
        self.fetch_json(&self.directory_url(directory_key)).await
    }
}

#[async_trait]
impl PagedFeed for HttpFeedClient {
    #[instrument(level = "debug", skip(self))]
    async fn page(&self, key: &str, index: usize) -> FeedPage {
        let url = self.page_url(key, index);
        let body = match self.fetch_text(&url).await {
            Ok(body) => body,
            Err(error) if error.is_not_found() => return FeedPage::Boundary,
            Err(error) => return FeedPage::Failure(error),
        };

        match xml::property_records(&body) {
            Ok(records) => FeedPage::Records(records),
            Err(error) => FeedPage::Failure(FeedError::Decode {
                url,
                message: error.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PortalListings for HttpFeedClient {
    async fn myhome_property(&self, key: &str, id: &str) -> Result<Value, FeedError> {
        self.fetch_json(&self.myhome_url(key, id)).await
    }

    async fn daft_property(&self, key: &str, id: &str) -> Result<Value, FeedError> {
        self.fetch_json(&self.daft_property_url(key, id)).await
    }

    async fn daft_properties(&self, key: &str) -> Result<Value, FeedError> {
        self.fetch_json(&self.daft_listing_url(key)).await
    }
}
