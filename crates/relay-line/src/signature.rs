//! `x-line-signature` verification.
//!
//! LINE signs every webhook body with HMAC-SHA256 keyed by the channel
//! secret and sends the base64 digest in the `x-line-signature` header.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use relay_core::RelayError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Base64 HMAC-SHA256 of `body` under `channel_secret`.
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String, RelayError> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .map_err(|_| RelayError::Signature("invalid HMAC key length".to_string()))?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check `signature` (header value) against `body`. Comparison is constant-time.
pub fn verify(channel_secret: &str, body: &[u8], signature: &str) -> Result<(), RelayError> {
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| RelayError::Signature("signature is not valid base64".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .map_err(|_| RelayError::Signature("invalid HMAC key length".to_string()))?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| RelayError::Signature("signature mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f1a1b2c3d4e5f60718293a4b5c6d7e8";
    const BODY: &[u8] = br#"{"destination":"U0","events":[]}"#;

    #[test]
    fn signed_body_verifies() {
        let sig = sign(SECRET, BODY).unwrap();
        assert!(verify(SECRET, BODY, &sig).is_ok());
    }

    #[test]
    fn tampered_body_rejected() {
        let sig = sign(SECRET, BODY).unwrap();
        let err = verify(SECRET, br#"{"destination":"U0","events":[{}]}"#, &sig).unwrap_err();
        assert_eq!(err.code(), "SIGNATURE_REJECTED");
    }

    #[test]
    fn wrong_secret_rejected() {
        let sig = sign("another-secret", BODY).unwrap();
        assert!(verify(SECRET, BODY, &sig).is_err());
    }

    #[test]
    fn garbage_header_rejected() {
        let err = verify(SECRET, BODY, "not base64 !!").unwrap_err();
        assert!(err.to_string().contains("base64"));
    }
}
