use axum::{routing::get, routing::post, Router};
use common_crypto::FieldKey;
use std::sync::Arc;

pub mod backend;
pub mod config;
pub mod currency;
pub mod donation_handlers;
pub mod metrics;
pub mod payfast;
pub mod signature;

use backend::DonationBackend;
use config::PayFastSettings;
use currency::CurrencyConverter;

pub use signature::{generate_signature, verify_signature, PaymentFieldSet, SignatureError};

#[derive(Clone)]
pub struct AppState {
    pub payfast: Arc<PayFastSettings>,
    pub backend: Arc<dyn DonationBackend>,
    pub currency: Arc<CurrencyConverter>,
    pub field_key: Arc<FieldKey>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(donation_handlers::metrics_endpoint))
        .route("/donations", post(donation_handlers::create_donation))
        .route("/donations/:id", get(donation_handlers::get_donation))
        .route("/currency/convert", get(donation_handlers::convert_currency))
        .with_state(state)
}
