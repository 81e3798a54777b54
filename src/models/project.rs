use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Only present on list responses.
    #[serde(default)]
    pub key_count: u64,
}

impl Project {
    /// `YYYY-MM-DD` part of the creation timestamp, for table display.
    pub fn created_date(&self) -> &str {
        self.created_at
            .as_deref()
            .map(|s| s.get(..10).unwrap_or(s))
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedProject {
    #[serde(default)]
    pub status: String,
    pub project_id: i64,
}
