//! HMAC-SHA256 signatures used by the payment provider.
//!
//! The provider signs two different things with two different encodings:
//!
//! - webhook deliveries: MAC over the raw request body, base64-encoded, sent
//!   in the `x-razorpay-signature` header;
//! - checkout callbacks: MAC over `"{order_id}|{payment_id}"`, hex-encoded,
//!   sent in the request body.
//!
//! Verification always works on the exact bytes that were signed. Parsing
//! and re-serializing a JSON body before verifying changes those bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Encoding applied to the raw MAC bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// Standard base64 with padding (webhooks).
    Base64,
    /// Lowercase hex (payment verification).
    Hex,
}

impl SignatureScheme {
    fn encode(self, mac: &[u8]) -> String {
        match self {
            Self::Base64 => STANDARD.encode(mac),
            Self::Hex => hex::encode(mac),
        }
    }

    fn decode(self, signature: &str) -> Option<Vec<u8>> {
        match self {
            Self::Base64 => STANDARD.decode(signature.trim()).ok(),
            Self::Hex => hex::decode(signature.trim()).ok(),
        }
    }
}

fn keyed(secret: &str) -> Option<HmacSha256> {
    if secret.is_empty() {
        return None;
    }
    HmacSha256::new_from_slice(secret.as_bytes()).ok()
}

/// Signs `message` with `secret` using `scheme`.
///
/// Returns `None` when the secret is empty.
#[must_use]
pub fn sign(scheme: SignatureScheme, message: &[u8], secret: &str) -> Option<String> {
    let mut mac = keyed(secret)?;
    mac.update(message);
    Some(scheme.encode(&mac.finalize().into_bytes()))
}

/// Verifies `signature` over `message`.
///
/// Fails closed: a missing or empty secret, an empty or undecodable
/// signature and a mismatch all return `false`. The comparison is constant
/// time.
#[must_use]
pub fn verify(
    scheme: SignatureScheme,
    message: &[u8],
    signature: &str,
    secret: Option<&str>,
) -> bool {
    let Some(mut mac) = secret.and_then(keyed) else {
        return false;
    };
    let Some(expected) = scheme.decode(signature) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}

/// Message signed by the provider for a checkout callback.
#[must_use]
pub fn payment_message(provider_order_id: &str, provider_payment_id: &str) -> String {
    format!("{provider_order_id}|{provider_payment_id}")
}

/// Verifies a webhook delivery against its raw body.
#[must_use]
pub fn verify_webhook(body: &[u8], signature: Option<&str>, secret: Option<&str>) -> bool {
    signature.is_some_and(|sig| verify(SignatureScheme::Base64, body, sig, secret))
}

/// Verifies a checkout callback signature.
#[must_use]
pub fn verify_payment(
    provider_order_id: &str,
    provider_payment_id: &str,
    signature: &str,
    secret: Option<&str>,
) -> bool {
    let message = payment_message(provider_order_id, provider_payment_id);
    verify(SignatureScheme::Hex, message.as_bytes(), signature, secret)
}

/// Prefix of a signature safe to put in logs.
#[must_use]
pub fn redact(signature: &str) -> String {
    let prefix: String = signature.chars().take(10).collect();
    format!("{prefix}...")
}
