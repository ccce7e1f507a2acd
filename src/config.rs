//! Environment-driven configuration for the API server, the frontend and the admin tool.
//!
//! ```bash
//! # API
//! STRATA_SERVICE_ACCOUNT='{"project_id":"demo","signing_key":"..."}'   # or a path to the JSON file
//! STRATA_TOKEN_SECRET=...            # fallback signing key when no service account is set
//! STRATA_STORAGE_BUCKET=default      # store namespace under the data dir
//! STRATA_DATA_DIR=data               # "memory" keeps everything in RAM
//! STRATA_HTTP_PORT=8787              # PORT is honoured too
//! STRATA_PATCH_UPSERT=false
//!
//! # Frontend
//! STRATA_WEB_PORT=3000
//! STRATA_API_BASE=http://127.0.0.1:8787
//! STRATA_DEMO_TOKEN=...
//! STRATA_LOCALES=en,mk
//! STRATA_DEFAULT_LOCALE=en
//! ```

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::identity::{CredentialError, ServiceAccount};
use crate::storage::{MemoryStore, SharedStore, StoreResult};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue { key: String, value: String, reason: String },
    #[error("no credential configured: set STRATA_SERVICE_ACCOUNT or STRATA_TOKEN_SECRET")]
    MissingCredential,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("default locale {0:?} is not among the supported locales")]
    UnsupportedDefaultLocale(String),
    #[error("at least one locale must be configured")]
    NoLocales,
}

/// What PATCH does when the target project does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchPolicy {
    /// Answer 404 and write nothing.
    #[default]
    RequireExisting,
    /// Create a document holding only the patched fields.
    Upsert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Memory,
    Directory(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StorageLocation,
    pub bucket: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { location: StorageLocation::Directory(PathBuf::from("data")), bucket: "default".into() }
    }
}

impl StoreConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let location = match lookup("STRATA_DATA_DIR") {
            Some(v) if v.eq_ignore_ascii_case("memory") => StorageLocation::Memory,
            Some(v) if !v.is_empty() => StorageLocation::Directory(PathBuf::from(v)),
            _ => StorageLocation::Directory(PathBuf::from("data")),
        };
        let bucket = lookup("STRATA_STORAGE_BUCKET").filter(|b| !b.is_empty()).unwrap_or_else(|| "default".into());
        Self { location, bucket }
    }

    pub fn with_data_dir(mut self, dir: &str) -> Self {
        self.location = if dir.eq_ignore_ascii_case("memory") {
            StorageLocation::Memory
        } else {
            StorageLocation::Directory(PathBuf::from(dir))
        };
        self
    }

    /// Directory holding the bucket's snapshot, if persisted.
    pub fn bucket_dir(&self) -> Option<PathBuf> {
        match &self.location {
            StorageLocation::Memory => None,
            StorageLocation::Directory(root) => Some(root.join(&self.bucket)),
        }
    }

    pub fn open(&self) -> StoreResult<SharedStore> {
        match self.bucket_dir() {
            None => Ok(SharedStore::in_memory()),
            Some(dir) => {
                info!(target: "storage", path = %dir.display(), "opening document store");
                Ok(SharedStore::new(MemoryStore::open(dir)?))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub store: StoreConfig,
    pub credential: ServiceAccount,
    pub patch_policy: PatchPolicy,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("STRATA_HTTP_PORT") {
            Some(v) => parse_port("STRATA_HTTP_PORT", &v)?,
            None => match lookup("PORT") {
                Some(v) => parse_port("PORT", &v)?,
                None => 8787,
            },
        };
        Ok(Self {
            port,
            store: StoreConfig::from_lookup(&lookup),
            credential: credential_from_lookup(&lookup)?,
            patch_policy: match lookup("STRATA_PATCH_UPSERT") {
                Some(v) if parse_bool("STRATA_PATCH_UPSERT", &v)? => PatchPolicy::Upsert,
                _ => PatchPolicy::RequireExisting,
            },
        })
    }
}

/// Settings the admin tool needs: where the store lives and, for tokens, the credential.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub store: StoreConfig,
    pub credential: Option<ServiceAccount>,
}

impl AdminConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let credential = match credential_from_lookup(&lookup) {
            Ok(c) => Some(c),
            Err(ConfigError::MissingCredential) => None,
            Err(e) => return Err(e),
        };
        Ok(Self { store: StoreConfig::from_lookup(&lookup), credential })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    pub supported: Vec<String>,
    pub default: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self { supported: vec!["en".into(), "mk".into()], default: "en".into() }
    }
}

impl LocaleConfig {
    pub fn new(supported: Vec<String>, default: String) -> Result<Self, ConfigError> {
        if supported.is_empty() {
            return Err(ConfigError::NoLocales);
        }
        if !supported.contains(&default) {
            return Err(ConfigError::UnsupportedDefaultLocale(default));
        }
        Ok(Self { supported, default })
    }

    pub fn is_supported(&self, locale: &str) -> bool {
        self.supported.iter().any(|l| l == locale)
    }
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub api_base: String,
    pub demo_token: String,
    pub locales: LocaleConfig,
}

impl WebConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("STRATA_WEB_PORT") {
            Some(v) => parse_port("STRATA_WEB_PORT", &v)?,
            None => 3000,
        };
        let supported: Vec<String> = match lookup("STRATA_LOCALES") {
            Some(v) => v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            None => LocaleConfig::default().supported,
        };
        let default = lookup("STRATA_DEFAULT_LOCALE").unwrap_or_else(|| "en".into());
        Ok(Self {
            port,
            api_base: lookup("STRATA_API_BASE").unwrap_or_else(|| "http://127.0.0.1:8787".into()),
            demo_token: lookup("STRATA_DEMO_TOKEN").unwrap_or_default(),
            locales: LocaleConfig::new(supported, default)?,
        })
    }
}

fn credential_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<ServiceAccount, ConfigError> {
    if let Some(raw) = lookup("STRATA_SERVICE_ACCOUNT").filter(|s| !s.trim().is_empty()) {
        return Ok(ServiceAccount::parse(&raw)?);
    }
    if let Some(secret) = lookup("STRATA_TOKEN_SECRET").filter(|s| !s.is_empty()) {
        return Ok(ServiceAccount::from_secret(secret)?);
    }
    Err(ConfigError::MissingCredential)
}

fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key: key.into(), value: value.into(), reason: "expected a boolean".into() }),
    }
}
