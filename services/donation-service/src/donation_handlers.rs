use axum::{
    extract::{Path, Query, State},
    Json,
};
use bigdecimal::{BigDecimal, Zero};
use common_crypto::encrypt_to_base64;
use common_http_errors::{ApiError, ApiResult};
use common_money::{ensure_in_range, format_amount, normalize_scale, parse_amount};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backend::{BackendError, DonationRecord, NewDonation};
use crate::currency::normalize_currency_code;
use crate::metrics;
use crate::payfast::{ensure_signing_ready, DonationCheckout, PayFastForm, PayFastRequest};
use crate::signature::SignatureError;
use crate::AppState;

const ID_NUMBER_LENGTH: usize = 13;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DonationRequest {
    pub donation_type: String,
    pub donation_amount: Option<BigDecimal>,
    pub donor_name: String,
    pub donor_id_number: String,
    pub donor_tax_number: String,
    pub donor_email: String,
    pub donor_phone: String,
}

impl DonationRequest {
    /// Returns the donation amount once every field checks out.
    pub fn validate(&self, trace_id: Uuid) -> Result<BigDecimal, ApiError> {
        let required = [
            ("donationType", &self.donation_type),
            ("donorName", &self.donor_name),
            ("donorIdNumber", &self.donor_id_number),
            ("donorTaxNumber", &self.donor_tax_number),
            ("donorEmail", &self.donor_email),
            ("donorPhone", &self.donor_phone),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(missing_field(name, trace_id));
        }
        let amount = self
            .donation_amount
            .clone()
            .ok_or_else(|| missing_field("donationAmount", trace_id))?;
        if !is_valid_id_number(&self.donor_id_number) {
            return Err(ApiError::BadRequest {
                code: "invalid_id_number",
                trace_id: Some(trace_id),
                message: Some(format!("ID number must be exactly {ID_NUMBER_LENGTH} digits")),
            });
        }
        if !looks_like_email(&self.donor_email) {
            return Err(ApiError::bad_request("invalid_email", Some(trace_id)));
        }
        ensure_in_range(&amount).map_err(|err| ApiError::BadRequest {
            code: "invalid_amount",
            trace_id: Some(trace_id),
            message: Some(err.to_string()),
        })?;
        // the gateway sees the rounded amount, so that is what must be positive
        let amount = normalize_scale(&amount);
        if amount <= BigDecimal::zero() {
            return Err(ApiError::BadRequest {
                code: "invalid_amount",
                trace_id: Some(trace_id),
                message: Some("donation amount must be at least 0.01".into()),
            });
        }
        Ok(amount)
    }
}

fn missing_field(name: &str, trace_id: Uuid) -> ApiError {
    ApiError::BadRequest {
        code: "missing_field",
        trace_id: Some(trace_id),
        message: Some(format!("{name} is required")),
    }
}

pub fn is_valid_id_number(id_number: &str) -> bool {
    let id_number = id_number.trim();
    id_number.len() == ID_NUMBER_LENGTH && id_number.bytes().all(|b| b.is_ascii_digit())
}

fn looks_like_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

fn signing_failed(err: &SignatureError, trace_id: Uuid) -> ApiError {
    ApiError::Internal {
        code: "signing_failed",
        trace_id: Some(trace_id),
        message: Some(err.to_string()),
    }
}

/// Persist the donation through the remote API and hand back a signed
/// PayFast form for the browser to post.
pub async fn create_donation(
    State(state): State<AppState>,
    Json(req): Json<DonationRequest>,
) -> ApiResult<Json<PayFastForm>> {
    let trace_id = Uuid::new_v4();
    let amount = req.validate(trace_id).map_err(|err| {
        metrics::record_checkout("invalid");
        err
    })?;

    // refuse before anything reaches the remote API
    if let Err(err) = ensure_signing_ready(&state.payfast) {
        metrics::record_signature_failure(&err);
        metrics::record_checkout("signing_failed");
        error!(%trace_id, error = %err, "payfast signing is not configured");
        return Err(signing_failed(&err, trace_id));
    }

    let encrypt = |value: &str| {
        encrypt_to_base64(&state.field_key, value.trim()).map_err(|err| {
            metrics::record_checkout("internal_error");
            ApiError::internal(err, Some(trace_id))
        })
    };
    let new_donation = NewDonation {
        donation_type: req.donation_type.trim().to_string(),
        donation_amount: format_amount(&amount),
        donor_name: req.donor_name.trim().to_string(),
        donor_id_number: encrypt(req.donor_id_number.as_str())?,
        donor_tax_number: encrypt(req.donor_tax_number.as_str())?,
        donor_email: req.donor_email.trim().to_string(),
        donor_phone: req.donor_phone.trim().to_string(),
    };

    let donation_id = match state.backend.create_donation(&new_donation).await {
        Ok(id) => id,
        Err(err) => {
            metrics::record_checkout("backend_error");
            warn!(%trace_id, error = %err, "failed to persist donation");
            return Err(ApiError::BadGateway {
                code: "backend_unavailable",
                trace_id: Some(trace_id),
                message: Some("failed to process the donation".into()),
            });
        }
    };
    info!(%trace_id, donation_id, "donation persisted");

    let checkout = DonationCheckout {
        donation_id,
        donor_name: new_donation.donor_name,
        donor_email: new_donation.donor_email,
        amount,
        donation_type: new_donation.donation_type,
    };
    let form = PayFastRequest::for_donation(&state.payfast, &checkout)
        .and_then(|request| request.into_form(&state.payfast))
        .map_err(|err| {
            metrics::record_checkout("signing_failed");
            error!(%trace_id, donation_id, error = %err, "payfast redirect withheld");
            signing_failed(&err, trace_id)
        })?;

    metrics::record_checkout("signed");
    Ok(Json(form))
}

pub async fn get_donation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DonationRecord>> {
    let trace_id = Uuid::new_v4();
    match state.backend.get_donation(id).await {
        Ok(record) => Ok(Json(record)),
        Err(BackendError::NotFound) => Err(ApiError::NotFound {
            code: "donation_not_found",
            trace_id: Some(trace_id),
        }),
        Err(err) => {
            warn!(%trace_id, donation_id = id, error = %err, "failed to load donation");
            Err(ApiError::BadGateway {
                code: "backend_unavailable",
                trace_id: Some(trace_id),
                message: None,
            })
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversionQuery {
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub amount: String,
    pub currency: String,
    pub zar_amount: String,
}

pub async fn convert_currency(
    State(state): State<AppState>,
    Query(query): Query<ConversionQuery>,
) -> ApiResult<Json<ConversionResponse>> {
    let trace_id = Uuid::new_v4();
    let amount = parse_amount(&query.amount).map_err(|err| ApiError::BadRequest {
        code: "invalid_amount",
        trace_id: Some(trace_id),
        message: Some(err.to_string()),
    })?;
    let currency = normalize_currency_code(&query.currency)
        .ok_or_else(|| ApiError::bad_request("invalid_currency", Some(trace_id)))?;
    let converted = state
        .currency
        .convert_to_rand(&amount, &currency)
        .await
        .ok_or(ApiError::ServiceUnavailable {
            code: "conversion_unavailable",
            trace_id: Some(trace_id),
            message: None,
        })?;
    Ok(Json(ConversionResponse {
        amount: format_amount(&amount),
        currency,
        zar_amount: format_amount(&converted),
    }))
}

pub async fn metrics_endpoint() -> String {
    metrics::gather()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn valid() -> DonationRequest {
        DonationRequest {
            donation_type: "Once-off".into(),
            donation_amount: Some(BigDecimal::from_str("100").unwrap()),
            donor_name: "Thandi".into(),
            donor_id_number: "9001015800087".into(),
            donor_tax_number: "0123456789".into(),
            donor_email: "thandi@example.org".into(),
            donor_phone: "0821234567".into(),
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert!(valid().validate(Uuid::nil()).is_ok());
    }

    #[test]
    fn id_number_must_be_thirteen_digits() {
        assert!(is_valid_id_number("9001015800087"));
        assert!(!is_valid_id_number("900101580008"));
        assert!(!is_valid_id_number("90010158000A7"));
        let mut req = valid();
        req.donor_id_number = "12345".into();
        assert_eq!(req.validate(Uuid::nil()).unwrap_err().code(), "invalid_id_number");
    }

    #[test]
    fn missing_fields_are_reported() {
        let mut req = valid();
        req.donor_phone = "  ".into();
        assert_eq!(req.validate(Uuid::nil()).unwrap_err().code(), "missing_field");
        let mut req = valid();
        req.donation_amount = None;
        assert_eq!(req.validate(Uuid::nil()).unwrap_err().code(), "missing_field");
    }

    #[test]
    fn non_positive_amount_rejected() {
        let mut req = valid();
        req.donation_amount = Some(BigDecimal::zero());
        assert_eq!(req.validate(Uuid::nil()).unwrap_err().code(), "invalid_amount");
    }

    #[test]
    fn sub_cent_amount_rejected_after_rounding() {
        let mut req = valid();
        req.donation_amount = Some(BigDecimal::from_str("0.001").unwrap());
        assert_eq!(req.validate(Uuid::nil()).unwrap_err().code(), "invalid_amount");
        req.donation_amount = Some(BigDecimal::from_str("0.005").unwrap());
        assert_eq!(req.validate(Uuid::nil()).unwrap().to_string(), "0.01");
    }

    #[test]
    fn huge_exponent_amount_rejected() {
        let mut req = valid();
        req.donation_amount = Some(BigDecimal::from_str("1e2000000").unwrap());
        assert_eq!(req.validate(Uuid::nil()).unwrap_err().code(), "invalid_amount");
    }

    #[test]
    fn email_shape_checked() {
        let mut req = valid();
        req.donor_email = "not-an-email".into();
        assert_eq!(req.validate(Uuid::nil()).unwrap_err().code(), "invalid_email");
    }
}
