use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Revoked,
}

impl KeyStatus {
    pub fn from_revoked(revoked: bool) -> Self {
        if revoked {
            KeyStatus::Revoked
        } else {
            KeyStatus::Active
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStatus::Active => write!(f, "active"),
            KeyStatus::Revoked => write!(f, "revoked"),
        }
    }
}

/// Row of `/admin/apikeys`; the raw secret is never listed, only its prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeySummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewApiKey {
    pub project_id: i64,
    pub name: String,
}

/// Creation response; the only time the backend returns the secret.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedApiKey {
    pub id: i64,
    pub api_key: String,
    pub name: String,
    pub project_id: i64,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct KeyRevocation {
    pub id: i64,
    pub revoked: bool,
}
