//! Webhook signature verification.
//!
//! Stripe signs each delivery with HMAC-SHA256 over `"{timestamp}.{raw_body}"`
//! and sends the result in the `Stripe-Signature` header:
//!
//! ```text
//! Stripe-Signature: t=1700000000,v1=5257a869e7ec...,v1=...
//! ```
//!
//! Several `v1` entries appear while a signing secret is being rolled; any one
//! of them matching is enough. Other schemes (`v0`) are ignored.
//!
//! The header is taken byte for byte: no whitespace trimming, the MAC covers
//! the `t=` text exactly as sent, and digests must be lowercase hex.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature scheme accepted by the verifier.
const SCHEME: &str = "v1";

/// Default tolerance between the signed timestamp and the current time.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Errors produced while verifying a webhook signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The header has no `t=` element.
    #[error("signature header has no timestamp")]
    MissingTimestamp,

    /// The `t=` element is not a unix timestamp.
    #[error("signature header has an invalid timestamp")]
    InvalidTimestamp,

    /// The header has no `v1=` signatures.
    #[error("no v1 signatures found in header")]
    NoSignatures,

    /// The signed timestamp is outside the tolerance window.
    #[error("timestamp outside the tolerance zone")]
    OutsideTolerance,

    /// The signing secret could not be used as an HMAC key.
    #[error("invalid signing secret")]
    InvalidSecret,

    /// No signature matches the expected signature for the payload.
    #[error("no signatures found matching the expected signature for payload")]
    Mismatch,
}

/// A parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp the provider signed.
    pub timestamp: i64,
    /// The `t=` value exactly as it appeared; this is what the MAC covers.
    pub signed_timestamp: String,
    /// Candidate `v1` signatures, hex-encoded.
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse a `t=...,v1=...` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp is missing or invalid, or if there
    /// are no `v1` signatures.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp: Option<(i64, &str)> = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.split_once('=') {
                Some(("t", ts)) => {
                    let parsed = ts.parse().map_err(|_| SignatureError::InvalidTimestamp)?;
                    timestamp = Some((parsed, ts));
                }
                Some((SCHEME, sig)) => signatures.push(sig.to_string()),
                _ => {}
            }
        }

        let (timestamp, signed_timestamp) = timestamp.ok_or(SignatureError::MissingTimestamp)?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        Ok(Self {
            timestamp,
            signed_timestamp: signed_timestamp.to_string(),
            signatures,
        })
    }
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Compute the hex-encoded `v1` signature for a payload.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret cannot key the HMAC.
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let mac = signed_mac(secret, &timestamp.to_string(), payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a complete `Stripe-Signature` header value for a payload.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret cannot key the HMAC.
pub fn signature_header(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let signature = compute_signature(secret, timestamp, payload)?;
    Ok(format!("t={timestamp},{SCHEME}={signature}"))
}

/// Verify a webhook payload against its `Stripe-Signature` header.
///
/// `now` is the current unix time; a zero `tolerance` disables the
/// timestamp check.
///
/// # Errors
///
/// Returns a `SignatureError` describing why verification failed.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), SignatureError> {
    let header = SignatureHeader::parse(header)?;

    let expected = signed_mac(secret, &header.signed_timestamp, payload)?;
    // verify_slice compares in constant time
    let matched = header
        .signatures
        .iter()
        .filter(|candidate| is_lowercase_hex(candidate))
        .any(|candidate| {
            hex::decode(candidate).is_ok_and(|bytes| expected.clone().verify_slice(&bytes).is_ok())
        });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if !tolerance.is_zero() {
        let age = now.abs_diff(header.timestamp);
        if age > tolerance.as_secs() {
            return Err(SignatureError::OutsideTolerance);
        }
    }

    Ok(())
}

/// `hex::decode` also accepts uppercase, which would let a case-flipped
/// digest through.
fn is_lowercase_hex(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
