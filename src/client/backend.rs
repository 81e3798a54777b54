use crate::config::BackendConfig;
use crate::error::ApiError;
use crate::models::{
    Ack, ApiKeyStatusBreakdown, ApiKeySummary, CompanyUser, CreatedApiKey, CuratedModel, DeletedProject,
    DownloadAccepted, DownloadJob, DownloadRequest, DownloadedModel, GenerationRequest, GenerationResponse,
    HourlyRequests, KeyRevocation, LatencyHistogram, LoginRequest, LoginResponse, NewApiKey, NewProject,
    NewUser, Project, ProjectStatusBreakdown, StatsSummary, SystemHealth, TokensPerKey, VerifyResponse,
    WeeklyRequests,
};
use crate::session::SessionContext;
use reqwest::header::{HeaderMap, AUTHORIZATION, SET_COOKIE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const TOKEN_COOKIE: &str = "access_token";

/// HTTP client for the admin backend.
///
/// Cheap to clone: clones share the connection pool, the cookie jar and the
/// bearer credential, so a login performed through one clone is visible to
/// every poller holding another.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Adopts the credential of a previously stored session.
    pub async fn use_session(&self, session: &SessionContext) {
        *self.token.write().await = session.token.clone();
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if let Some(token) = self.token.read().await.as_deref() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T, ApiError> {
        let response = builder.send().await.map_err(|e| {
            tracing::debug!("{} failed: {}", what, e);
            ApiError::from(e)
        })?;
        let (body, _) = Self::read_body(response, what).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn read_body(response: reqwest::Response, what: &str) -> Result<(String, HeaderMap), ApiError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_status(status, &body);
            tracing::debug!("{} -> {}: {}", what, status, err);
            return Err(err);
        }

        tracing::trace!("{} -> {}", what, status);
        Ok((body, headers))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, path).await;
        self.send(builder, path).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let builder = self.request(Method::POST, path).await.json(body);
        self.send(builder, path).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.request(Method::POST, path).await;
        self.send(builder, path).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.request(Method::DELETE, path).await;
        self.send(builder, path).await
    }

    // ── Session ────────────────────────────────────────────────

    pub async fn login(&self, credentials: &LoginRequest) -> Result<SessionContext, ApiError> {
        self.authenticate("/auth/login", credentials).await
    }

    pub async fn signup(&self, credentials: &LoginRequest) -> Result<SessionContext, ApiError> {
        self.authenticate("/auth/signup", credentials).await
    }

    async fn authenticate(&self, path: &str, credentials: &LoginRequest) -> Result<SessionContext, ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(credentials)
            .send()
            .await?;

        let (body, headers) = Self::read_body(response, path).await?;
        let login: LoginResponse = serde_json::from_str(&body)?;

        let token = token_from_cookies(&headers).or_else(|| login.access_token.clone());
        if token.is_none() {
            tracing::warn!("{} succeeded without a session credential", path);
        }
        *self.token.write().await = token.clone();

        tracing::info!(
            "Signed in as {} ({})",
            login.user.username,
            login.company.name
        );

        Ok(SessionContext {
            token,
            user: Some(login.user),
            company: Some(login.company),
        })
    }

    /// Ends the session server-side. The local credential is dropped even when
    /// the call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.post_empty::<Ack>("/auth/logout").await;
        self.clear_token().await;
        result.map(|_| ())
    }

    pub async fn verify_session(&self) -> Result<VerifyResponse, ApiError> {
        self.get("/auth/verify").await
    }

    // ── Health & stats ─────────────────────────────────────────

    pub async fn system_health(&self) -> Result<SystemHealth, ApiError> {
        self.get("/admin/system/health").await
    }

    pub async fn stats_summary(&self) -> Result<StatsSummary, ApiError> {
        self.get("/admin/stats/summary").await
    }

    pub async fn project_status(&self) -> Result<ProjectStatusBreakdown, ApiError> {
        self.get("/admin/stats/projects/status").await
    }

    pub async fn api_key_status(&self) -> Result<ApiKeyStatusBreakdown, ApiError> {
        self.get("/admin/stats/apikeys/status").await
    }

    pub async fn weekly_requests(&self) -> Result<WeeklyRequests, ApiError> {
        self.get("/admin/stats/requests/weekly").await
    }

    pub async fn hourly_requests(&self) -> Result<HourlyRequests, ApiError> {
        self.get("/admin/metrics/requests/24h").await
    }

    pub async fn latency_histogram(&self) -> Result<LatencyHistogram, ApiError> {
        self.get("/admin/metrics/latency/histogram").await
    }

    pub async fn tokens_per_key(&self) -> Result<TokensPerKey, ApiError> {
        self.get("/admin/metrics/tokens/per-key").await
    }

    // ── Projects ───────────────────────────────────────────────

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get("/admin/projects").await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project, ApiError> {
        self.post("/admin/project", project).await
    }

    /// Deletes the project together with its keys and usage records.
    pub async fn delete_project(&self, project_id: i64) -> Result<DeletedProject, ApiError> {
        self.delete(&format!("/admin/project/{}", project_id)).await
    }

    // ── API keys ───────────────────────────────────────────────

    pub async fn list_api_keys(&self, project_id: i64) -> Result<Vec<ApiKeySummary>, ApiError> {
        self.get(&format!("/admin/apikeys?project_id={}", project_id)).await
    }

    pub async fn create_api_key(&self, key: &NewApiKey) -> Result<CreatedApiKey, ApiError> {
        self.post("/admin/apikey", key).await
    }

    pub async fn revoke_api_key(&self, key_id: i64) -> Result<KeyRevocation, ApiError> {
        self.post_empty(&format!("/admin/apikey/{}/revoke", key_id)).await
    }

    pub async fn restore_api_key(&self, key_id: i64) -> Result<KeyRevocation, ApiError> {
        self.post_empty(&format!("/admin/apikey/{}/restore", key_id)).await
    }

    // ── Users ──────────────────────────────────────────────────

    pub async fn list_users(&self) -> Result<Vec<CompanyUser>, ApiError> {
        self.get("/admin/users").await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<CompanyUser, ApiError> {
        self.post("/admin/users", user).await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        self.delete::<Ack>(&format!("/admin/users/{}", user_id)).await.map(|_| ())
    }

    // ── Model catalog ──────────────────────────────────────────

    pub async fn curated_models(&self) -> Result<Vec<CuratedModel>, ApiError> {
        self.get("/models/curated").await
    }

    pub async fn downloaded_models(&self) -> Result<Vec<DownloadedModel>, ApiError> {
        self.get("/models/downloaded").await
    }

    pub async fn start_download(&self, repo_id: &str) -> Result<DownloadAccepted, ApiError> {
        let request = DownloadRequest {
            repo_id: repo_id.trim().to_string(),
        };
        self.post("/models/download", &request).await
    }

    pub async fn download_job(&self, job_id: &str) -> Result<DownloadJob, ApiError> {
        self.get(&format!("/models/jobs/{}", job_id)).await
    }

    // ── Generation ─────────────────────────────────────────────

    /// Calls the generation endpoint with a project API key instead of the session.
    pub async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<GenerationResponse, ApiError> {
        let builder = self
            .client
            .post(self.url("/generate"))
            .header("X-API-Key", api_key)
            .json(request);
        self.send(builder, "/generate").await
    }
}

fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_token_from_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark; Path=/"));
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("access_token=eyJhbGciOi.abc; HttpOnly; Max-Age=604800; Path=/; SameSite=lax"),
        );
        assert_eq!(token_from_cookies(&headers), Some("eyJhbGciOi.abc".to_string()));
    }

    #[test]
    fn test_deleted_cookie_is_not_a_token() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("access_token=; Max-Age=0; Path=/"));
        assert_eq!(token_from_cookies(&headers), None);
    }

    #[test]
    fn test_base_url_is_normalised() {
        let client = BackendClient::new(&BackendConfig {
            base_url: "http://localhost:5000/".into(),
            request_timeout_secs: Some(5),
        })
        .unwrap();
        assert_eq!(client.url("/auth/verify"), "http://localhost:5000/auth/verify");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let client = BackendClient::new(&BackendConfig {
            base_url: "http://127.0.0.1:9".into(),
            request_timeout_secs: Some(1),
        })
        .unwrap();

        let err = client.verify_session().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "{:?}", err);
        assert!(!err.is_unauthorized());
        assert!(err.to_string().starts_with("Backend not reachable"));

        let err = client
            .login(&LoginRequest {
                company: "Acme".into(),
                username: "ada".into(),
                password: "secret".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(client.token().await, None);
    }
}
