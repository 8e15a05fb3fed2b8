//! Outbound listing feeds: the vendor clients, the paged XML aggregator, and
//! the pass-through routes that expose them.

pub mod aggregate;
pub mod error;
pub mod http;
pub mod router;
pub mod source;
pub mod xml;

pub use aggregate::FeedAggregator;
pub use error::{AggregateError, FeedError, LookupError};
pub use http::HttpFeedClient;
pub use router::{feed_router, FeedState};
pub use source::{AgencyDirectory, FeedPage, ListingSource, PagedFeed, PortalListings};
