//! Compact HS256 tokens: `base64url(header).base64url(claims).base64url(hmac)`.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::credential::ServiceAccount;
use super::verifier::AuthError;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token subject must not be empty")]
    EmptySubject,
    #[error("invalid signing key")]
    InvalidKey,
    #[error("token lifetime of {0}s is out of range")]
    InvalidTtl(u64),
    #[error("failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

fn sign(key: &[u8], signing_input: &str) -> Result<Vec<u8>, TokenError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::InvalidKey)?;
    mac.update(signing_input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Issue a token for `subject`, valid for `ttl`, bound to the account's project id.
pub fn mint_token(account: &ServiceAccount, subject: &str, ttl: Duration) -> Result<String, TokenError> {
    if subject.is_empty() {
        return Err(TokenError::EmptySubject);
    }
    let now = Utc::now().timestamp();
    let secs = ttl.as_secs();
    let exp = i64::try_from(secs)
        .ok()
        .and_then(|s| now.checked_add(s))
        .ok_or(TokenError::InvalidTtl(secs))?;
    let claims = Claims {
        sub: subject.to_string(),
        iat: now,
        exp,
        iss: account.project_id.clone(),
    };
    encode(account.signing_key.as_bytes(), &claims)
}

pub(crate) fn encode(key: &[u8], claims: &Claims) -> Result<String, TokenError> {
    let header = Header { alg: ALG.into(), typ: "JWT".into() };
    let h = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let c = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let input = format!("{h}.{c}");
    let sig = URL_SAFE_NO_PAD.encode(sign(key, &input)?);
    Ok(format!("{input}.{sig}"))
}

/// Check structure, algorithm and signature; time and issuer checks are the verifier's.
pub(crate) fn decode_verified(key: &[u8], token: &str) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let (Some(h), Some(c), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::Malformed);
    };
    let header_bytes = URL_SAFE_NO_PAD.decode(h).map_err(|_| AuthError::Malformed)?;
    let header: Header = serde_json::from_slice(&header_bytes).map_err(|_| AuthError::Malformed)?;
    if header.alg != ALG {
        return Err(AuthError::Malformed);
    }
    let sig = URL_SAFE_NO_PAD.decode(s).map_err(|_| AuthError::Malformed)?;
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| AuthError::BadSignature)?;
    mac.update(h.as_bytes());
    mac.update(b".");
    mac.update(c.as_bytes());
    mac.verify_slice(&sig).map_err(|_| AuthError::BadSignature)?;
    let claims_bytes = URL_SAFE_NO_PAD.decode(c).map_err(|_| AuthError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&claims_bytes).map_err(|_| AuthError::Malformed)?;
    if claims.sub.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(claims)
}
