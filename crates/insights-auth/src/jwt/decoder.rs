//! Payload decoding for compact bearer tokens.
//!
//! The codec trusts token issuance to the authentication service and
//! performs no signature verification.

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::DateTime;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use super::claims::Claims;

/// Claim names accepted for the subject, in lookup order.
const SUBJECT_CLAIMS: &[&str] = &["personal_number", "sub"];

/// Claim names accepted for the display name, in lookup order.
const NAME_CLAIMS: &[&str] = &["name", "username"];

/// Why a token could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The token is not three dot-separated segments.
    #[error("malformed token")]
    Malformed,
    /// The payload segment is not valid base64url.
    #[error("invalid payload encoding")]
    InvalidEncoding,
    /// The payload is not valid JSON.
    #[error("invalid payload json")]
    InvalidJson,
    /// The payload is JSON but not an object.
    #[error("payload is not a claim set")]
    NotAnObject,
    /// A required claim is absent.
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),
    /// A claim has the wrong type.
    #[error("invalid claim: {0}")]
    InvalidClaim(&'static str),
    /// The expiry is not a representable number of seconds since the epoch.
    #[error("invalid expiry")]
    InvalidExpiry,
}

/// Decodes bearer tokens into [`Claims`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec;

impl TokenCodec {
    /// Creates a new codec.
    pub fn new() -> Self {
        Self
    }

    /// Decodes a token's payload into claims.
    ///
    /// Either every required claim is present and well-typed, or an error
    /// is returned; partial claims are never produced.
    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        let payload = payload_object(token)?;

        let subject_id = first_present(&payload, SUBJECT_CLAIMS)
            .ok_or(DecodeError::MissingClaim("personal_number"))
            .and_then(|v| scalar_string(v).ok_or(DecodeError::InvalidClaim("personal_number")))?;

        let display_name = first_present(&payload, NAME_CLAIMS)
            .ok_or(DecodeError::MissingClaim("name"))?
            .as_str()
            .ok_or(DecodeError::InvalidClaim("name"))?
            .to_string();

        let roles = payload
            .get("roles")
            .ok_or(DecodeError::MissingClaim("roles"))?
            .as_array()
            .ok_or(DecodeError::InvalidClaim("roles"))?
            .iter()
            .map(|r| r.as_str().map(str::to_string))
            .collect::<Option<BTreeSet<String>>>()
            .ok_or(DecodeError::InvalidClaim("roles"))?;

        let expires_at = payload
            .get("exp")
            .ok_or(DecodeError::MissingClaim("exp"))
            .and_then(parse_expiry)?;

        Ok(Claims {
            subject_id,
            display_name,
            roles,
            expires_at,
        })
    }
}

/// Extracts and parses the payload segment as a JSON object.
fn payload_object(token: &str) -> Result<Map<String, JsonValue>, DecodeError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 || parts[1].is_empty() {
        return Err(DecodeError::Malformed);
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|_| DecodeError::InvalidEncoding)?;

    match serde_json::from_slice::<JsonValue>(&bytes) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(_) => Err(DecodeError::NotAnObject),
        Err(_) => Err(DecodeError::InvalidJson),
    }
}

fn first_present<'a>(payload: &'a Map<String, JsonValue>, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter()
        .filter_map(|k| payload.get(*k))
        .find(|v| !v.is_null())
}

/// Personal numbers may be issued as strings or bare numbers.
fn scalar_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_expiry(value: &JsonValue) -> Result<DateTime<chrono::Utc>, DecodeError> {
    let seconds = match value {
        JsonValue::Number(n) => match n.as_i64() {
            Some(secs) => secs,
            None => {
                let secs = n.as_f64().ok_or(DecodeError::InvalidExpiry)?;
                if !secs.is_finite() || secs.abs() > i64::MAX as f64 {
                    return Err(DecodeError::InvalidExpiry);
                }
                secs.floor() as i64
            }
        },
        _ => return Err(DecodeError::InvalidExpiry),
    };
    DateTime::from_timestamp(seconds, 0).ok_or(DecodeError::InvalidExpiry)
}
