use crate::cli::ServeArgs;
use crate::infra::{AppState, Stores};
use crate::routes::api_router;
use agency_hub::config::AppConfig;
use agency_hub::error::AppError;
use agency_hub::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    args.apply(&mut config);

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    if config.auth.secret_key.is_none() {
        warn!("SECRET_KEY is not set; login and protected routes will answer 500");
    }

    let app = match config.database.url.as_deref() {
        Some(url) => {
            info!(url, "using sqlite storage");
            api_router(Stores::sqlite(url).await?, &config)
        }
        None => {
            warn!("DATABASE_URL is not set; records are kept in memory and lost on exit");
            api_router(Stores::in_memory(), &config)
        }
    };
    let app = app.layer(Extension(app_state)).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "agency hub ready");

    axum::serve(listener, app).await?;
    Ok(())
}
