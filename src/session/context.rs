use crate::models::{CompanyInfo, UserInfo};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Credential and display info of the signed-in user.
///
/// `user` and `company` are an unverified local copy kept for rendering; the
/// backend re-checks `token` on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub company: Option<CompanyInfo>,
}

impl SessionContext {
    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn username(&self) -> &str {
        self.user.as_ref().map(|u| u.username.as_str()).unwrap_or("Admin User")
    }

    pub fn company_name(&self) -> &str {
        self.company.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }
}

/// Keeps the session context in a JSON file between runs.
///
/// Lifecycle: `load` once at startup, `save` after login, `clear` at logout.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files yield an empty context; the next verify
    /// call decides whether the user has to sign in again.
    pub fn load(&self) -> SessionContext {
        if !self.path.exists() {
            return SessionContext::default();
        }

        match std::fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(serde_json::from_str::<SessionContext>(&content)?))
        {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {:?}: {}", self.path, e);
                SessionContext::default()
            }
        }
    }

    pub fn save(&self, ctx: &SessionContext) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(ctx)?)?;
        restrict_permissions(&self.path)?;
        tracing::debug!("Session saved to {:?}", self.path);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            tracing::debug!("Session cleared at {:?}", self.path);
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in() -> SessionContext {
        SessionContext {
            token: Some("tok".into()),
            user: Some(UserInfo { id: 1, username: "ada".into() }),
            company: Some(CompanyInfo { id: 7, name: "Acme".into() }),
        }
    }

    #[test]
    fn test_save_load_clear_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load(), SessionContext::default());

        store.save(&signed_in()).unwrap();
        let loaded = store.load();
        assert!(loaded.is_signed_in());
        assert_eq!(loaded.username(), "ada");
        assert_eq!(loaded.company_name(), "Acme");

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(!store.load().is_signed_in());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SessionStore::new(path);
        assert_eq!(store.load(), SessionContext::default());
    }

    #[test]
    fn test_display_fallbacks() {
        let ctx = SessionContext::default();
        assert_eq!(ctx.username(), "Admin User");
        assert_eq!(ctx.company_name(), "");
    }
}
