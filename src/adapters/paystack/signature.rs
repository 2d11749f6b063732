//! Webhook signature: lowercase hex HMAC-SHA512 of the raw body.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

fn mac(secret: &[u8], payload: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so construction cannot fail here.
    let mut mac = match HmacSha512::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Hex signature of `payload` under `secret`.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    hex::encode(mac(secret.as_bytes(), payload))
}

/// Constant-time check of a hex signature.
///
/// Malformed hex and empty secrets never verify.
pub fn verify(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let provided = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let expected = mac(secret.as_bytes(), payload);
    if expected.is_empty() || provided.len() != expected.len() {
        return false;
    }
    expected.ct_eq(&provided).into()
}
