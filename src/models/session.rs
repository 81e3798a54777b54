use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub id: i64,
    pub name: String,
}

/// Body of `/auth/login` and `/auth/signup`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub company: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub company: CompanyInfo,
    pub user: UserInfo,
    /// Only some deployments echo the token in the body; the cookie is authoritative.
    #[serde(default)]
    pub access_token: Option<String>,
}

/// `/auth/verify` answer for a live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub valid: bool,
    pub user: UserInfo,
    pub company_id: i64,
}

/// Generic `{ "ok": true }` acknowledgement
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub ok: bool,
}
