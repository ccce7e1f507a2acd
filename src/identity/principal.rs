use serde::{Deserialize, Serialize};

/// Verified caller of a protected route.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

impl Principal {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into(), issuer: None }
    }
}
