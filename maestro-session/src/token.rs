//! Bearer token inspection and fallback minting
//!
//! The client cannot verify signatures of server-issued tokens, so
//! inspection only reads claims. Anything that is not a decodable JWT, or a
//! JWT without a numeric `exp`, is treated as non-expired.
//!
//! Server tokens are not required to match [`TokenClaims`] field for field:
//! the payload is read as loose JSON and a claim of an unexpected type is
//! simply absent.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::types::User;
use crate::error::Result;

/// Claims the session core reads from (or writes into) a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Role string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiry (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Token id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Set on locally minted tokens
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl TokenClaims {
    /// Pick known claims out of an arbitrary JWT payload.
    ///
    /// `sub` accepts strings and numbers, `exp`/`iat` accept integers,
    /// floats (floored) and numeric strings. Anything else reads as absent.
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            sub: payload.get("sub").and_then(claim_string),
            role: payload.get("role").and_then(Value::as_str).map(str::to_owned),
            exp: payload.get("exp").and_then(claim_timestamp),
            iat: payload.get("iat").and_then(claim_timestamp),
            jti: payload.get("jti").and_then(claim_string),
            fallback: payload.get("fallback").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

fn claim_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn claim_timestamp(value: &Value) -> Option<i64> {
    let secs = match value {
        Value::Number(n) => match n.as_i64() {
            Some(secs) => return Some(secs),
            None => n.as_f64()?,
        },
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    // Out-of-range values saturate, which still compares correctly.
    secs.is_finite().then(|| secs.floor() as i64)
}

/// Decode claims without verifying the signature.
///
/// Returns `None` for anything that is not a structurally valid JWT.
pub fn inspect(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    decode::<Value>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| TokenClaims::from_payload(&data.claims))
}

/// Expiry embedded in the token, if any
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    inspect(token)?
        .exp
        .and_then(|exp| DateTime::from_timestamp(exp, 0))
}

/// Whether the token carries an expiry at or before `now`
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    expires_at(token).is_some_and(|exp| exp <= now)
}

/// Build an HS256 token for `user` valid for `validity` from `now`.
///
/// Signed with a client-local secret purely so the result has ordinary JWT
/// shape. No backend can verify it.
pub fn mint_fallback(
    user: &User,
    now: DateTime<Utc>,
    validity: Duration,
    secret: &str,
) -> Result<String> {
    let claims = TokenClaims {
        sub: Some(user.id.clone()),
        role: Some(user.role.as_str().to_string()),
        exp: Some((now + validity).timestamp()),
        iat: Some(now.timestamp()),
        jti: Some(Uuid::new_v4().to_string()),
        fallback: true,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}
