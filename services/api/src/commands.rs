use crate::infra::Stores;
use agency_hub::agencies::{AgencyRepository, AgencyService};
use agency_hub::config::AppConfig;
use agency_hub::error::AppError;
use agency_hub::feeds::{FeedAggregator, HttpFeedClient};
use agency_hub::telemetry;
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct FeedDumpArgs {
    /// Agency feed key
    #[arg(long)]
    pub(crate) key: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct AgencyRefreshArgs {
    /// Delete stored agencies whose office no longer appears in the directory
    #[arg(long)]
    pub(crate) remove_deleted: bool,
    /// SQLite URL of the store to reconcile
    #[arg(long)]
    pub(crate) database_url: Option<String>,
}

fn load_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) async fn run_feed_dump(args: FeedDumpArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let aggregator = FeedAggregator::new(Arc::new(HttpFeedClient::new(config.feeds)));

    let records = aggregator.collect(&args.key).await?;
    info!(records = records.len(), "feed dump complete");
    println!("{:#}", serde_json::Value::Array(records));
    Ok(())
}

pub(crate) async fn run_agency_refresh(args: AgencyRefreshArgs) -> Result<(), AppError> {
    let mut config = load_config()?;
    if let Some(url) = args.database_url {
        config.database.url = Some(url);
    }
    let feeds = Arc::new(HttpFeedClient::new(config.feeds.clone()));

    match config.database.url.as_deref() {
        Some(url) => {
            let stores = Stores::sqlite(url).await?;
            refresh(stores.agencies, feeds, args.remove_deleted).await
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; refreshing an empty in-memory store");
            refresh(Stores::in_memory().agencies, feeds, args.remove_deleted).await
        }
    }
}

async fn refresh<R>(
    agencies: Arc<R>,
    feeds: Arc<HttpFeedClient>,
    prune: bool,
) -> Result<(), AppError>
where
    R: AgencyRepository + 'static,
{
    let service = Arc::new(AgencyService::new(agencies, feeds.clone(), feeds));
    let report = service.refresh(prune).await?;
    println!(
        "{:#}",
        json!({ "summary": report.summary(), "results": report.results() })
    );
    Ok(())
}
