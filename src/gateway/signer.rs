//! X-VERIFY integrity header construction and verification
//!
//! Checksum scheme: `sha256(base64Payload + endpointPath + saltKey)` rendered
//! as lowercase hex, then `###` and the salt index. The verifier must
//! concatenate in exactly this order with exactly this separator.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::PaymentConfig;
use crate::error::{PaymentError, PaymentResult};

pub const CHECKSUM_SEPARATOR: &str = "###";

/// A signed gateway request: the exact base64 string that was hashed is the
/// one that must be sent.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub base64_payload: String,
    pub x_verify: String,
}

/// Serialize, base64-encode, and sign a pay payload. Any failure here is
/// fatal for the request: a corrupted signature must never be sent.
pub fn sign_pay_request<T: Serialize>(
    payload: &T,
    endpoint_path: &str,
    config: &PaymentConfig,
) -> PaymentResult<SignedRequest> {
    let json = serde_json::to_string(payload)
        .map_err(|e| PaymentError::Signature(format!("payload serialization failed: {}", e)))?;
    let base64_payload = STANDARD.encode(json.as_bytes());
    let x_verify = checksum(
        &format!("{}{}{}", base64_payload, endpoint_path, config.salt_key),
        &config.salt_index,
    );
    Ok(SignedRequest {
        base64_payload,
        x_verify,
    })
}

/// Checksum for the status endpoint, which has no body:
/// `sha256(endpointPath + saltKey) + "###" + saltIndex`
pub fn status_checksum(endpoint_path: &str, config: &PaymentConfig) -> String {
    checksum(
        &format!("{}{}", endpoint_path, config.salt_key),
        &config.salt_index,
    )
}

/// Verify a gateway callback. The gateway signs its callback body with the
/// same salt the merchant used for the request:
/// `sha256(base64Body + saltKey) + "###" + saltIndex`.
///
/// Malformed supplied headers fail verification; they do not error.
pub fn verify_callback(base64_body: &str, supplied_header: &str, config: &PaymentConfig) -> bool {
    let expected = checksum(
        &format!("{}{}", base64_body, config.salt_key),
        &config.salt_index,
    );
    secure_eq(expected.as_bytes(), supplied_header.trim().as_bytes())
}

fn checksum(input: &str, salt_index: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    format!(
        "{}{}{}",
        hex::encode(digest),
        CHECKSUM_SEPARATOR,
        salt_index
    )
}

/// Constant-time comparison for integrity headers
pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
