use super::notice::Notice;
use crate::client::BackendClient;
use crate::models::{CompanyUser, NewUser};

/// Company user management. The signed-in user is never listed, so it cannot
/// be deleted from here.
pub struct UsersPanel {
    client: BackendClient,
    me: Option<i64>,
    users: Vec<CompanyUser>,
}

impl UsersPanel {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            me: None,
            users: Vec::new(),
        }
    }

    /// Resolves the current user, then lists the company.
    pub async fn load(&mut self) -> Result<usize, Notice> {
        match self.client.verify_session().await {
            Ok(session) if session.valid => self.me = Some(session.user.id),
            Ok(_) => self.me = None,
            Err(e) => tracing::debug!("Could not resolve current user: {}", e),
        }
        self.reload().await
    }

    async fn reload(&mut self) -> Result<usize, Notice> {
        self.users = self
            .client
            .list_users()
            .await
            .map_err(|e| Notice::failure("Failed to load users", &e))?;
        Ok(self.visible().count())
    }

    pub fn visible(&self) -> impl Iterator<Item = &CompanyUser> {
        self.users.iter().filter(move |u| Some(u.id) != self.me)
    }

    pub async fn create(&mut self, username: &str, password: &str) -> Notice {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Notice::error("Missing fields").with_description("Username and password are required");
        }

        let request = NewUser {
            username: username.to_string(),
            password: password.to_string(),
        };
        if let Err(e) = self.client.create_user(&request).await {
            return Notice::failure("Create failed", &e);
        }
        if let Err(notice) = self.reload().await {
            return notice;
        }
        Notice::success("User created").with_description(format!("User {} has been created successfully", username))
    }

    pub async fn delete(&mut self, user_id: i64) -> Notice {
        let username = self
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| user_id.to_string());

        match self.client.delete_user(user_id).await {
            Ok(()) => {
                self.users.retain(|u| u.id != user_id);
                Notice::success("User deleted").with_description(format!("User {} has been removed from the system", username))
            }
            Err(e) => Notice::failure("Delete failed", &e),
        }
    }
}
