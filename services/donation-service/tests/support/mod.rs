#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use common_crypto::FieldKey;
use donation_service::backend::{BackendError, DonationBackend, DonationRecord, NewDonation, StubBackend};
use donation_service::config::PayFastSettings;
use donation_service::currency::CurrencyConverter;
use donation_service::payfast::PayFastEnvironment;
use donation_service::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const PASSPHRASE: &str = "jt7NOE43FZPn";

pub fn payfast(passphrase: Option<&str>) -> PayFastSettings {
    PayFastSettings {
        merchant_id: "10000100".into(),
        merchant_key: "46f0cd694581a".into(),
        passphrase: passphrase.map(str::to_string),
        environment: PayFastEnvironment::Sandbox,
        return_url: None,
        cancel_url: None,
        notify_url: None,
    }
}

pub fn state_with(payfast: PayFastSettings, backend: Arc<dyn DonationBackend>, key: FieldKey) -> AppState {
    AppState {
        payfast: Arc::new(payfast),
        backend,
        currency: Arc::new(CurrencyConverter::new(reqwest::Client::new(), "http://127.0.0.1:9", None)),
        field_key: Arc::new(key),
    }
}

/// Counts calls and always fails, so tests can assert nothing reached the remote API.
#[derive(Default)]
pub struct FailingBackend {
    pub calls: AtomicUsize,
}

impl FailingBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DonationBackend for FailingBackend {
    async fn create_donation(&self, _donation: &NewDonation) -> Result<i64, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Rejected("api down".into()))
    }

    async fn get_donation(&self, _id: i64) -> Result<DonationRecord, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Http("api down".into()))
    }
}

pub fn stub() -> Arc<StubBackend> {
    Arc::new(StubBackend::new())
}

pub fn donation_json(kind: &str, amount: &str) -> String {
    serde_json::json!({
        "donationType": kind,
        "donationAmount": amount,
        "donorName": "Thandi",
        "donorIdNumber": "9001015800087",
        "donorTaxNumber": "0123456789",
        "donorEmail": "thandi@example.org",
        "donorPhone": "0821234567"
    })
    .to_string()
}

pub fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).method("GET").body(Body::empty()).unwrap()
}

pub async fn json_body(resp: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 64).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
