//! Access token expiry introspection
//!
//! Reads the `exp` claim without verifying the signature. The result only
//! decides whether to refresh proactively at startup; the backend remains the
//! authority on whether a token is valid.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::Deserialize;
use thiserror::Error;

/// base64url, with or without trailing `=` padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Malformed token: expected three dot-separated segments")]
    Malformed,
    #[error("Invalid payload encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Invalid payload JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Returns the `exp` claim in seconds since the epoch, if the token has one.
pub fn access_token_expiry(token: &str) -> Result<Option<i64>, JwtError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
        _ => return Err(JwtError::Malformed),
    };

    let bytes = PAYLOAD_ENGINE.decode(payload)?;
    let claims: Claims = serde_json::from_slice(&bytes)?;
    Ok(claims.exp.map(|exp| exp as i64))
}

/// A token without an `exp` claim never counts as expired.
pub fn is_expired(token: &str, now_secs: i64) -> Result<bool, JwtError> {
    Ok(matches!(access_token_expiry(token)?, Some(exp) if exp < now_secs))
}

#[cfg(test)]
pub(crate) fn token_with_exp(exp: i64) -> String {
    let header = PAYLOAD_ENGINE.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = PAYLOAD_ENGINE.encode(format!(r#"{{"user_id":7,"exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}
