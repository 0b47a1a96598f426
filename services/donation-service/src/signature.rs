//! PayFast request signing.
//!
//! The gateway recomputes the digest from the fields it receives, so the
//! canonical string built here has to match its own byte for byte: fields in
//! declared order, empty values skipped, values trimmed and form-encoded, the
//! passphrase appended last, MD5 over the UTF-8 bytes, lowercase hex.

use md5::{Digest, Md5};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

pub const PASSPHRASE_FIELD: &str = "passphrase";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signing configuration error: {0}")]
    Configuration(String),
    #[error("field `{field}` cannot be encoded: {reason}")]
    Encoding { field: String, reason: &'static str },
}

/// Ordered `(name, value)` pairs for a single payment attempt.
///
/// Insertion order is the signing order. Values are kept as supplied; trimming
/// and the empty-value skip happen when the set is serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentFieldSet {
    fields: Vec<(String, String)>,
}

impl PaymentFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Absent values are not recorded at all.
    pub fn push_opt(&mut self, name: impl Into<String>, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(value) = value {
            self.fields.push((name.into(), value.into()));
        }
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Every recorded pair, in insertion order, untrimmed.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Pairs that take part in signing: trimmed, non-empty, in insertion order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .map(|(n, v)| (n, v.trim()))
            .filter(|(_, v)| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for PaymentFieldSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.push(name, value);
        }
        set
    }
}

/// Trim, then form-encode the way the gateway does: only `[A-Za-z0-9-_.]`
/// stay literal, everything else becomes uppercase `%XX` over UTF-8 and
/// spaces become `+`.
pub fn encode_value(raw: &str) -> String {
    // urlencoding also leaves `~` unreserved
    urlencoding::encode(raw.trim())
        .replace("%20", "+")
        .replace('~', "%7E")
}

fn check_name(name: &str) -> Result<(), SignatureError> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(SignatureError::Encoding {
            field: name.to_string(),
            reason: "field names are limited to ASCII letters, digits and `_`",
        })
    }
}

fn check_value(name: &str, value: &str) -> Result<(), SignatureError> {
    if value.contains('\0') {
        return Err(SignatureError::Encoding {
            field: name.to_string(),
            reason: "value contains a NUL character",
        });
    }
    Ok(())
}

/// The `name=value&...` string without the passphrase.
pub fn parameter_string(fields: &PaymentFieldSet) -> Result<String, SignatureError> {
    let mut out = String::new();
    for (name, value) in fields.present() {
        check_name(name)?;
        check_value(name, value)?;
        out.push_str(name);
        out.push('=');
        out.push_str(&encode_value(value));
        out.push('&');
    }
    if out.ends_with('&') {
        out.pop();
    }
    Ok(out)
}

/// The exact string that gets hashed.
pub fn canonical_string(fields: &PaymentFieldSet, passphrase: &str) -> Result<String, SignatureError> {
    let mut canonical = parameter_string(fields)?;
    let passphrase = passphrase.trim();
    debug!(
        parameters = %canonical,
        with_passphrase = !passphrase.is_empty(),
        "payfast parameter string built"
    );
    if !passphrase.is_empty() {
        check_value(PASSPHRASE_FIELD, passphrase)?;
        canonical.push('&');
        canonical.push_str(PASSPHRASE_FIELD);
        canonical.push('=');
        canonical.push_str(&encode_value(passphrase));
    }
    Ok(canonical)
}

/// Lowercase hex MD5 of the canonical string.
pub fn generate_signature(fields: &PaymentFieldSet, passphrase: &str) -> Result<String, SignatureError> {
    let canonical = canonical_string(fields, passphrase)?;
    Ok(hex::encode(Md5::digest(canonical.as_bytes())))
}

/// Like [`generate_signature`], but a passphrase that was never configured is
/// a hard error rather than "no passphrase".
pub fn sign_with(fields: &PaymentFieldSet, passphrase: Option<&str>) -> Result<String, SignatureError> {
    let passphrase = passphrase.ok_or_else(|| {
        SignatureError::Configuration("payfast passphrase is not configured".into())
    })?;
    generate_signature(fields, passphrase)
}

/// Recompute the digest and compare it with `provided` in constant time.
pub fn verify_signature(
    fields: &PaymentFieldSet,
    passphrase: &str,
    provided: &str,
) -> Result<bool, SignatureError> {
    let expected = generate_signature(fields, passphrase)?;
    let provided = provided.trim().to_ascii_lowercase();
    Ok(expected.as_bytes().ct_eq(provided.as_bytes()).into())
}
