use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("donation api request failed: {0}")]
    Http(String),
    #[error("donation api rejected the donation: {0}")]
    Rejected(String),
    #[error("donation not found")]
    NotFound,
}

/// Donation as submitted to the remote API. ID and tax numbers are already
/// encrypted by the time this is built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewDonation {
    pub donation_type: String,
    pub donation_amount: String,
    pub donor_name: String,
    #[serde(rename = "DonorIDNumber")]
    pub donor_id_number: String,
    pub donor_tax_number: String,
    pub donor_email: String,
    pub donor_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    #[serde(alias = "DonationId")]
    pub donation_id: i64,
    #[serde(alias = "DonationType")]
    pub donation_type: String,
    #[serde(alias = "DonationAmount")]
    pub donation_amount: BigDecimal,
    #[serde(alias = "DonorName")]
    pub donor_name: String,
    #[serde(alias = "DonorEmail")]
    pub donor_email: String,
    #[serde(default, alias = "DonationDate", skip_serializing_if = "Option::is_none")]
    pub donation_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    #[serde(alias = "Success")]
    success: bool,
    #[serde(default, alias = "Message")]
    message: Option<String>,
    #[serde(alias = "Data")]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DonationCreated {
    #[serde(alias = "DonationId")]
    donation_id: i64,
}

/// The remote API that owns donation persistence.
#[async_trait]
pub trait DonationBackend: Send + Sync {
    async fn create_donation(&self, donation: &NewDonation) -> Result<i64, BackendError>;
    async fn get_donation(&self, id: i64) -> Result<DonationRecord, BackendError>;
}

pub struct HttpDonationBackend {
    client: Client,
    base_url: String,
}

impl HttpDonationBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

#[async_trait]
impl DonationBackend for HttpDonationBackend {
    async fn create_donation(&self, donation: &NewDonation) -> Result<i64, BackendError> {
        let url = format!("{}/api/Donor/Donate", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(donation)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;
        let status = resp.status();
        let body: ApiResponse<DonationCreated> = resp
            .json()
            .await
            .map_err(|e| BackendError::Http(format!("unreadable response ({status}): {e}")))?;
        match (status.is_success(), body.success, body.data) {
            (true, true, Some(created)) if created.donation_id > 0 => Ok(created.donation_id),
            _ => Err(BackendError::Rejected(
                body.message.unwrap_or_else(|| format!("status {status}")),
            )),
        }
    }

    async fn get_donation(&self, id: i64) -> Result<DonationRecord, BackendError> {
        let url = format!("{}/api/Donor/Donation/{}", self.base_url, id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;
        match resp.status() {
            StatusCode::OK => resp
                .json::<DonationRecord>()
                .await
                .map_err(|e| BackendError::Http(e.to_string())),
            StatusCode::NOT_FOUND => Err(BackendError::NotFound),
            s => Err(BackendError::Http(format!("unexpected status {s} while fetching donation"))),
        }
    }
}

/// In-memory backend for local runs and tests.
pub struct StubBackend {
    next_id: AtomicI64,
    donations: Mutex<HashMap<i64, NewDonation>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { next_id: AtomicI64::new(1), donations: Mutex::new(HashMap::new()) }
    }

    pub fn stored(&self, id: i64) -> Option<NewDonation> {
        self.donations.lock().ok()?.get(&id).cloned()
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DonationBackend for StubBackend {
    async fn create_donation(&self, donation: &NewDonation) -> Result<i64, BackendError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.donations
            .lock()
            .map_err(|_| BackendError::Http("stub store poisoned".into()))?
            .insert(id, donation.clone());
        Ok(id)
    }

    async fn get_donation(&self, id: i64) -> Result<DonationRecord, BackendError> {
        let stored = self.stored(id).ok_or(BackendError::NotFound)?;
        let donation_amount = stored
            .donation_amount
            .parse::<BigDecimal>()
            .map_err(|e| BackendError::Http(e.to_string()))?;
        Ok(DonationRecord {
            donation_id: id,
            donation_type: stored.donation_type,
            donation_amount,
            donor_name: stored.donor_name,
            donor_email: stored.donor_email,
            donation_date: None,
        })
    }
}
