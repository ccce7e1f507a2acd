use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read service account file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("invalid service account JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("service account signing key is empty")]
    EmptyKey,
}

/// Service-account credential: the signing key bearer tokens are verified against,
/// plus the project id used as the expected token issuer.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    pub signing_key: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl ServiceAccount {
    /// Bare shared secret with no issuer binding.
    pub fn from_secret(secret: impl Into<String>) -> Result<Self, CredentialError> {
        let signing_key = secret.into();
        if signing_key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }
        Ok(Self { project_id: None, client_email: None, signing_key })
    }

    /// Accepts the credential either inline (`{...}`) or as a path to a JSON file.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let raw = raw.trim();
        let sa: ServiceAccount = if raw.starts_with('{') {
            serde_json::from_str(raw)?
        } else {
            let text = std::fs::read_to_string(Path::new(raw))
                .map_err(|source| CredentialError::Read { path: raw.to_string(), source })?;
            serde_json::from_str(&text)?
        };
        if sa.signing_key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }
        Ok(sa)
    }
}
