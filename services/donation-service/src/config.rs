use anyhow::{anyhow, Context, Result};
use common_crypto::FieldKey;
use std::env;
use tracing::warn;

use crate::payfast::PayFastEnvironment;

#[derive(Clone)]
pub struct PayFastSettings {
    pub merchant_id: String,
    pub merchant_key: String,
    /// `None` when `PAYFAST_PASSPHRASE` is not set at all; `Some("")` means
    /// the merchant account has no passphrase.
    pub passphrase: Option<String>,
    pub environment: PayFastEnvironment,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
    pub notify_url: Option<String>,
}

impl std::fmt::Debug for PayFastSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayFastSettings")
            .field("merchant_id", &self.merchant_id)
            .field("merchant_key", &"***redacted***")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***redacted***"))
            .field("environment", &self.environment)
            .field("return_url", &self.return_url)
            .field("cancel_url", &self.cancel_url)
            .field("notify_url", &self.notify_url)
            .finish()
    }
}

impl PayFastSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let merchant_id = lookup("PAYFAST_MERCHANT_ID").context("PAYFAST_MERCHANT_ID must be set")?;
        let merchant_key =
            lookup("PAYFAST_MERCHANT_KEY").context("PAYFAST_MERCHANT_KEY must be set")?;
        let passphrase = lookup("PAYFAST_PASSPHRASE");
        if passphrase.is_none() {
            warn!("PAYFAST_PASSPHRASE is not set; donation checkout will refuse to sign requests");
        }
        let use_sandbox = lookup("PAYFAST_USE_SANDBOX")
            .map(|value| parse_flag(&value))
            .transpose()?
            .unwrap_or(true);

        Ok(Self {
            merchant_id,
            merchant_key,
            passphrase,
            environment: PayFastEnvironment::from_sandbox_flag(use_sandbox),
            return_url: non_empty(lookup("PAYFAST_RETURN_URL")),
            cancel_url: non_empty(lookup("PAYFAST_CANCEL_URL")),
            notify_url: non_empty(lookup("PAYFAST_NOTIFY_URL")),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub donation_api_url: String,
    pub donation_api_timeout_secs: u64,
    pub currency_api_url: String,
    pub currency_api_key: Option<String>,
    pub field_key: FieldKey,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT")
            .unwrap_or_else(|| "8090".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;
        let donation_api_url = lookup("DONATION_API_URL")
            .unwrap_or_else(|| "http://localhost:5000".to_string())
            .trim_end_matches('/')
            .to_string();
        let donation_api_timeout_secs = lookup("DONATION_API_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(10);
        let currency_api_url = lookup("CURRENCY_API_URL")
            .unwrap_or_else(|| "https://api.currencyapi.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let raw_key =
            lookup("FIELD_ENCRYPTION_KEY").context("FIELD_ENCRYPTION_KEY must be set")?;
        let field_key = FieldKey::from_base64(&raw_key)
            .map_err(|err| anyhow!("FIELD_ENCRYPTION_KEY is invalid: {err}"))?;

        Ok(Self {
            host,
            port,
            donation_api_url,
            donation_api_timeout_secs: donation_api_timeout_secs.max(1),
            currency_api_url,
            currency_api_key: non_empty(lookup("CURRENCY_API_KEY")),
            field_key,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("invalid boolean flag `{other}`")),
    }
}
