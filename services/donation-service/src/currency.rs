use bigdecimal::BigDecimal;
use reqwest::Client;
use serde_json::Value;
use std::str::FromStr;
use tracing::{error, warn};

pub const TARGET_CURRENCY: &str = "ZAR";

/// Converts foreign-currency amounts to rand using currencyapi.com rates.
///
/// Without an API key the converter stays usable but every conversion
/// answers `None`.
#[derive(Clone)]
pub struct CurrencyConverter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CurrencyConverter {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("CURRENCY_API_KEY is not set; currency conversion will not function");
        }
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, api_key }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn convert_to_rand(&self, amount: &BigDecimal, currency_code: &str) -> Option<BigDecimal> {
        let Some(api_key) = self.api_key.as_deref() else {
            error!(currency = currency_code, "currency conversion attempted without an API key");
            return None;
        };
        match self.fetch_rate(api_key, currency_code).await {
            Ok(rate) => Some(amount.clone() * rate),
            Err(err) => {
                error!(currency = currency_code, error = %err, "currency conversion to ZAR failed");
                None
            }
        }
    }

    async fn fetch_rate(&self, api_key: &str, currency_code: &str) -> anyhow::Result<BigDecimal> {
        let url = format!("{}/v3/latest", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("apikey", api_key),
                ("base_currency", currency_code),
                ("currencies", TARGET_CURRENCY),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        let rate = match body.pointer("/data/ZAR/value") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => anyhow::bail!("response has no data.ZAR.value"),
        };
        Ok(BigDecimal::from_str(&rate)?)
    }
}

/// ISO-4217 style code: three ASCII letters, normalised to upper case.
pub fn normalize_currency_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    (code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}
