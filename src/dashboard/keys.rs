use super::format::{mask_key, MASK_VISIBLE};
use super::notice::Notice;
use crate::client::BackendClient;
use crate::models::{ApiKeySummary, CreatedApiKey, KeyStatus, NewApiKey};

/// One row of the API key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRow {
    pub id: i64,
    pub name: String,
    /// Full secret, only known for keys created in this session.
    pub secret: Option<String>,
    pub prefix: String,
    pub created: String,
    pub status: KeyStatus,
    pub requests: u64,
    pub tokens: u64,
    pub errors: u64,
}

impl KeyRow {
    fn listed(key: ApiKeySummary) -> Self {
        Self {
            id: key.id,
            name: key.name,
            secret: None,
            prefix: key.prefix,
            created: date_part(key.created_at.as_deref()),
            status: KeyStatus::from_revoked(key.revoked),
            requests: 0,
            tokens: 0,
            errors: 0,
        }
    }

    fn created(key: CreatedApiKey, submitted_name: &str) -> Self {
        let prefix: String = key.api_key.chars().take(MASK_VISIBLE).collect();
        Self {
            id: key.id,
            name: submitted_name.to_string(),
            secret: Some(key.api_key),
            prefix,
            created: date_part(key.created_at.as_deref()),
            status: KeyStatus::Active,
            requests: 0,
            tokens: 0,
            errors: 0,
        }
    }

    pub fn masked(&self) -> String {
        mask_key(self.secret.as_deref().unwrap_or(&self.prefix))
    }
}

fn date_part(created_at: Option<&str>) -> String {
    match created_at {
        Some(s) => s.get(..10).unwrap_or(s).to_string(),
        None => chrono::Utc::now().date_naive().to_string(),
    }
}

/// API keys of one project.
pub struct ApiKeyPanel {
    client: BackendClient,
    project_id: i64,
    rows: Vec<KeyRow>,
}

impl ApiKeyPanel {
    pub fn new(client: BackendClient, project_id: i64) -> Self {
        Self {
            client,
            project_id,
            rows: Vec::new(),
        }
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    pub fn rows(&self) -> &[KeyRow] {
        &self.rows
    }

    pub fn row(&self, key_id: i64) -> Option<&KeyRow> {
        self.rows.iter().find(|r| r.id == key_id)
    }

    pub async fn load(&mut self) -> Result<usize, Notice> {
        let keys = self
            .client
            .list_api_keys(self.project_id)
            .await
            .map_err(|e| Notice::failure("Could not load API keys", &e))?;
        self.rows = keys.into_iter().map(KeyRow::listed).collect();
        Ok(self.rows.len())
    }

    /// Creates a key and appends it as a single new row.
    pub async fn create(&mut self, name: &str) -> Notice {
        let name = name.trim();
        if name.is_empty() {
            return Notice::error("Error").with_description("Please enter a key name");
        }

        let request = NewApiKey {
            project_id: self.project_id,
            name: name.to_string(),
        };
        match self.client.create_api_key(&request).await {
            Ok(created) => {
                tracing::info!("Created API key {} for project {}", created.id, self.project_id);
                self.rows.push(KeyRow::created(created, name));
                Notice::success("API Key Created").with_description(format!("New API key \"{}\" has been created", name))
            }
            Err(e) => Notice::failure("Could not create API key", &e),
        }
    }

    pub async fn revoke(&mut self, key_id: i64) -> Notice {
        match self.client.revoke_api_key(key_id).await {
            Ok(_) => {
                self.set_status(key_id, KeyStatus::Revoked);
                Notice::success("Key Revoked").with_description("API key has been revoked")
            }
            Err(e) => Notice::failure("Could not revoke key", &e),
        }
    }

    pub async fn restore(&mut self, key_id: i64) -> Notice {
        match self.client.restore_api_key(key_id).await {
            Ok(_) => {
                self.set_status(key_id, KeyStatus::Active);
                Notice::success("Key Restored").with_description("API key has been restored")
            }
            Err(e) => Notice::failure("Could not restore key", &e),
        }
    }

    fn set_status(&mut self, key_id: i64, status: KeyStatus) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.id == key_id) {
            row.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listed_row_masks_prefix() {
        let row = KeyRow::listed(ApiKeySummary {
            id: 4,
            name: "ci".into(),
            revoked: true,
            created_at: Some("2025-09-21T08:00:00".into()),
            prefix: "sk_live1".into(),
        });
        assert_eq!(row.status, KeyStatus::Revoked);
        assert_eq!(row.created, "2025-09-21");
        assert_eq!(row.masked(), format!("sk_li{}", "•".repeat(20)));
    }

    #[test]
    fn test_created_row_is_active_with_zero_usage() {
        let row = KeyRow::created(
            CreatedApiKey {
                id: 9,
                api_key: "AbCdEfGhIjKlMnOp".into(),
                name: "server-side name".into(),
                project_id: 1,
                revoked: false,
                created_at: None,
            },
            "prod",
        );
        assert_eq!(row.name, "prod");
        assert_eq!(row.status, KeyStatus::Active);
        assert_eq!((row.requests, row.tokens, row.errors), (0, 0, 0));
        assert_eq!(row.prefix, "AbCdE");
        assert_eq!(row.masked(), format!("AbCdE{}", "•".repeat(20)));
    }
}
