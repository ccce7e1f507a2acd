use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;

use super::credential::ServiceAccount;
use super::principal::Principal;
use super::token::decode_verified;

const BEARER_PREFIX: &str = "Bearer ";

/// Why a bearer token was refused. Only ever logged; callers see one uniform 401.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingHeader,
    #[error("authorization header is not a Bearer credential")]
    BadScheme,
    #[error("token is malformed")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token issued for another project")]
    WrongIssuer,
    #[error("token not recognised")]
    UnknownToken,
}

/// Pull the token out of an `authorization` header value (`Bearer <token>`).
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let h = header.ok_or(AuthError::MissingHeader)?;
    let token = h.strip_prefix(BEARER_PREFIX).ok_or(AuthError::BadScheme)?;
    if token.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(token)
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Verifies HS256 tokens signed with the service-account key.
pub struct HmacTokenVerifier {
    key: Vec<u8>,
    issuer: Option<String>,
}

impl HmacTokenVerifier {
    pub fn new(account: &ServiceAccount) -> Self {
        Self { key: account.signing_key.as_bytes().to_vec(), issuer: account.project_id.clone() }
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<Principal, AuthError> {
        let claims = decode_verified(&self.key, token)?;
        if now >= claims.exp {
            return Err(AuthError::Expired);
        }
        if let Some(expected) = &self.issuer {
            if claims.iss.as_deref() != Some(expected.as_str()) {
                return Err(AuthError::WrongIssuer);
            }
        }
        Ok(Principal { uid: claims.sub, issuer: claims.iss })
    }
}

impl TokenVerifier for HmacTokenVerifier {
    fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }
}

/// Fixed token -> uid table, for tests and offline demos.
#[derive(Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self { Self::default() }

    pub fn with_token(mut self, token: impl Into<String>, uid: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), uid.into());
        self
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.tokens.get(token).map(Principal::new).ok_or(AuthError::UnknownToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::token::{encode, Claims};
    use crate::identity::mint_token;
    use std::time::Duration;

    fn account(project: Option<&str>) -> ServiceAccount {
        ServiceAccount { project_id: project.map(String::from), client_email: None, signing_key: "s3cr3t".into() }
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(AuthError::MissingHeader));
        assert_eq!(bearer_token(Some("bearer abc")), Err(AuthError::BadScheme));
        assert_eq!(bearer_token(Some("Basic abc")), Err(AuthError::BadScheme));
        assert_eq!(bearer_token(Some("Bearer ")), Err(AuthError::Malformed));
    }

    #[test]
    fn fresh_token_verifies() {
        let sa = account(Some("demo"));
        let t = mint_token(&sa, "uid-1", Duration::from_secs(300)).unwrap();
        let p = HmacTokenVerifier::new(&sa).verify(&t).unwrap();
        assert_eq!(p.uid, "uid-1");
        assert_eq!(p.issuer.as_deref(), Some("demo"));
    }

    #[test]
    fn expired_token_rejected() {
        let sa = account(None);
        let claims = Claims { sub: "u".into(), iat: 100, exp: 200, iss: None };
        let t = encode(sa.signing_key.as_bytes(), &claims).unwrap();
        let v = HmacTokenVerifier::new(&sa);
        assert!(v.verify_at(&t, 199).is_ok());
        assert_eq!(v.verify_at(&t, 200), Err(AuthError::Expired));
    }

    #[test]
    fn issuer_must_match_project() {
        let other = mint_token(&account(Some("other")), "u", Duration::from_secs(60)).unwrap();
        let unbound = mint_token(&account(None), "u", Duration::from_secs(60)).unwrap();
        let v = HmacTokenVerifier::new(&account(Some("demo")));
        assert_eq!(v.verify(&other), Err(AuthError::WrongIssuer));
        assert_eq!(v.verify(&unbound), Err(AuthError::WrongIssuer));
    }

    #[test]
    fn tampered_claims_rejected() {
        let sa = account(None);
        let t = mint_token(&sa, "alice", Duration::from_secs(60)).unwrap();
        let parts: Vec<&str> = t.split('.').collect();
        let forged = Claims { sub: "mallory".into(), iat: 0, exp: i64::MAX, iss: None };
        let forged_part = encode(b"whatever", &forged).unwrap();
        let forged_claims = forged_part.split('.').nth(1).unwrap();
        let tampered = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert_eq!(HmacTokenVerifier::new(&sa).verify(&tampered), Err(AuthError::BadSignature));
    }

    #[test]
    fn static_tokens() {
        let v = StaticTokenVerifier::new().with_token("demo", "demo-user");
        assert_eq!(v.verify("demo").unwrap().uid, "demo-user");
        assert_eq!(v.verify("nope"), Err(AuthError::UnknownToken));
    }
}
