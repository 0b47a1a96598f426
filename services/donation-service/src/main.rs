use anyhow::Context;
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use donation_service::{
    backend::HttpDonationBackend,
    build_router,
    config::{PayFastSettings, ServiceConfig},
    currency::CurrencyConverter,
    AppState,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env()?;
    let payfast = PayFastSettings::from_env()?;
    info!(environment = ?payfast.environment, merchant_id = %payfast.merchant_id, "PayFast settings loaded");

    let timeout = Duration::from_secs(config.donation_api_timeout_secs);
    let backend = HttpDonationBackend::new(config.donation_api_url.clone(), timeout)
        .context("failed to build donation api client")?;
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build currency api client")?;
    let currency = CurrencyConverter::new(
        http_client,
        config.currency_api_url.clone(),
        config.currency_api_key.clone(),
    );

    let state = AppState {
        payfast: Arc::new(payfast),
        backend: Arc::new(backend),
        currency: Arc::new(currency),
        field_key: Arc::new(config.field_key.clone()),
    };

    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:5173",
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    let app = build_router(state).layer(cors);

    let addr = SocketAddr::new(config.host.parse().context("HOST must be an IP address")?, config.port);
    info!(%addr, donation_api = %config.donation_api_url, "starting donation-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
