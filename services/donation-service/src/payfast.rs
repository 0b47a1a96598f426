use bigdecimal::BigDecimal;
use common_money::format_amount;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PayFastSettings;
use crate::metrics;
use crate::signature::{encode_value, sign_with, PaymentFieldSet, SignatureError};

pub const SANDBOX_PROCESS_URL: &str = "https://sandbox.payfast.co.za/eng/process";
pub const LIVE_PROCESS_URL: &str = "https://www.payfast.co.za/eng/process";

/// The only donation type that is collected by debit order.
pub const MONTHLY_DONATION: &str = "Monthly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayFastEnvironment {
    Sandbox,
    Production,
}

impl PayFastEnvironment {
    pub fn from_sandbox_flag(use_sandbox: bool) -> Self {
        if use_sandbox {
            PayFastEnvironment::Sandbox
        } else {
            PayFastEnvironment::Production
        }
    }

    pub fn process_url(&self) -> &'static str {
        match self {
            PayFastEnvironment::Sandbox => SANDBOX_PROCESS_URL,
            PayFastEnvironment::Production => LIVE_PROCESS_URL,
        }
    }
}

/// What the checkout flow knows about a persisted donation.
#[derive(Debug, Clone)]
pub struct DonationCheckout {
    pub donation_id: i64,
    pub donor_name: String,
    pub donor_email: String,
    pub amount: BigDecimal,
    pub donation_type: String,
}

/// Hosted-payment-page request. Field declaration order is the signing order
/// the gateway uses; `field_set` must follow it exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayFastRequest {
    pub merchant_id: String,
    pub merchant_key: String,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
    pub notify_url: Option<String>,
    pub name_first: Option<String>,
    pub email_address: Option<String>,
    pub m_payment_id: Option<String>,
    pub amount: Option<String>,
    pub item_name: Option<String>,
    pub payment_method: Option<String>,
}

impl PayFastRequest {
    pub fn for_donation(
        settings: &PayFastSettings,
        donation: &DonationCheckout,
    ) -> Result<Self, SignatureError> {
        ensure_credentials(settings)?;
        let donation_type = donation.donation_type.trim();
        let payment_method = (donation_type == MONTHLY_DONATION).then(|| "eft".to_string());
        Ok(Self {
            merchant_id: settings.merchant_id.trim().to_string(),
            merchant_key: settings.merchant_key.trim().to_string(),
            return_url: settings.return_url.clone(),
            cancel_url: settings.cancel_url.clone(),
            notify_url: settings.notify_url.clone(),
            name_first: Some(donation.donor_name.trim().to_string()),
            email_address: Some(donation.donor_email.trim().to_string()),
            m_payment_id: Some(donation.donation_id.to_string()),
            amount: Some(format_amount(&donation.amount)),
            item_name: Some(format!("Funding Donation - {donation_type}").trim().to_string()),
            payment_method,
        })
    }

    pub fn field_set(&self) -> PaymentFieldSet {
        let mut fields = PaymentFieldSet::new();
        fields
            .push("merchant_id", self.merchant_id.as_str())
            .push("merchant_key", self.merchant_key.as_str())
            .push_opt("return_url", self.return_url.as_deref())
            .push_opt("cancel_url", self.cancel_url.as_deref())
            .push_opt("notify_url", self.notify_url.as_deref())
            .push_opt("name_first", self.name_first.as_deref())
            .push_opt("email_address", self.email_address.as_deref())
            .push_opt("m_payment_id", self.m_payment_id.as_deref())
            .push_opt("amount", self.amount.as_deref())
            .push_opt("item_name", self.item_name.as_deref())
            .push_opt("payment_method", self.payment_method.as_deref());
        fields
    }

    pub fn generate_signature(&self, passphrase: &str) -> Result<String, SignatureError> {
        crate::signature::generate_signature(&self.field_set(), passphrase)
    }

    /// Sign with the configured passphrase and produce the redirect payload.
    /// Nothing is returned on failure, so an unsigned form can never be issued.
    pub fn into_form(self, settings: &PayFastSettings) -> Result<PayFastForm, SignatureError> {
        let fields = self.field_set();
        let signature = match sign_with(&fields, settings.passphrase.as_deref()) {
            Ok(sig) => sig,
            Err(err) => {
                metrics::record_signature_failure(&err);
                warn!(error = %err, payment_id = ?self.m_payment_id, "payfast signing failed");
                return Err(err);
            }
        };
        metrics::SIGNATURES_TOTAL.inc();
        info!(payment_id = ?self.m_payment_id, environment = ?settings.environment, "payfast request signed");
        Ok(PayFastForm {
            process_url: settings.environment.process_url().to_string(),
            fields: fields
                .present()
                .map(|(name, value)| FormField {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            signature,
        })
    }
}

/// Merchant credentials and passphrase presence, checked before any network call.
pub fn ensure_credentials(settings: &PayFastSettings) -> Result<(), SignatureError> {
    if settings.merchant_id.trim().is_empty() {
        return Err(SignatureError::Configuration("payfast merchant id is empty".into()));
    }
    if settings.merchant_key.trim().is_empty() {
        return Err(SignatureError::Configuration("payfast merchant key is empty".into()));
    }
    Ok(())
}

pub fn ensure_signing_ready(settings: &PayFastSettings) -> Result<(), SignatureError> {
    ensure_credentials(settings)?;
    if settings.passphrase.is_none() {
        return Err(SignatureError::Configuration(
            "payfast passphrase is not configured".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

/// Everything the browser needs to post to the hosted payment page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayFastForm {
    pub process_url: String,
    pub fields: Vec<FormField>,
    pub signature: String,
}

impl PayFastForm {
    /// `application/x-www-form-urlencoded` body with the signature last.
    pub fn to_form_body(&self) -> String {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
            .chain(std::iter::once(("signature", self.signature.as_str())))
            .map(|(name, value)| format!("{name}={}", encode_value(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
