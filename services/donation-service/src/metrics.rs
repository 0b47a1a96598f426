use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Registry, TextEncoder};

use crate::signature::SignatureError;

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static SIGNATURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("payfast_signatures_total", "PayFast requests signed").unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static SIGNATURE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    let v = IntCounterVec::new(
        prometheus::Opts::new("payfast_signature_failures_total", "PayFast signing failures by reason"),
        &["reason"],
    ).unwrap();
    REGISTRY.register(Box::new(v.clone())).ok();
    v
});

pub static DONATION_CHECKOUTS: Lazy<IntCounterVec> = Lazy::new(|| {
    let v = IntCounterVec::new(
        prometheus::Opts::new("donation_checkouts_total", "Donation checkout attempts by outcome"),
        &["outcome"],
    ).unwrap();
    REGISTRY.register(Box::new(v.clone())).ok();
    v
});

pub fn record_signature_failure(err: &SignatureError) {
    let reason = match err {
        SignatureError::Configuration(_) => "configuration",
        SignatureError::Encoding { .. } => "encoding",
    };
    SIGNATURE_FAILURES.with_label_values(&[reason]).inc();
}

pub fn record_checkout(outcome: &str) {
    DONATION_CHECKOUTS.with_label_values(&[outcome]).inc();
}

pub fn gather() -> String {
    // touch lazies so every series shows up even before first use
    Lazy::force(&SIGNATURES_TOTAL);
    Lazy::force(&SIGNATURE_FAILURES);
    Lazy::force(&DONATION_CHECKOUTS);
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}
