use reqwest::StatusCode;

/// Failure of a single backend call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, reset).
    #[error("Backend not reachable: {0}")]
    Network(#[source] reqwest::Error),

    /// 401/403: the session or API key is missing, expired or revoked.
    #[error("Not authorized ({status}): {detail}")]
    Unauthorized { status: u16, detail: String },

    #[error("{detail}")]
    Status { status: u16, detail: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Builds the error for a non-2xx response from its status and raw body.
    ///
    /// The backend reports failures as `{"detail": "..."}`; a `message`
    /// field or plain text is accepted as a fallback.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = extract_detail(body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ApiError::Unauthorized {
                status: status.as_u16(),
                detail,
            }
        } else {
            ApiError::Status {
                status: status.as_u16(),
                detail,
            }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// 401 on an authenticated call: the bearer token is expired or revoked
    /// and the user has to sign in again. A 403 is a refused action,
    /// not a dead session.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::Unauthorized { status: 401, .. })
    }

    /// The backend's own message, without the status prefix.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Unauthorized { detail, .. } | ApiError::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. } | ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e)
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let field = json
            .get("detail")
            .or_else(|| json.get("message"))
            .and_then(|v| v.as_str());
        if let Some(detail) = field {
            return Some(detail.to_string());
        }
    }

    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_from_json_body() {
        let err = ApiError::from_status(StatusCode::CONFLICT, r#"{"detail":"Project name already exists"}"#);
        assert_eq!(err.to_string(), "Project name already exists");
        assert_eq!(err.status(), Some(409));
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_auth_statuses_are_unauthorized() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"detail":"Invalid token"}"#);
        assert!(err.is_unauthorized());

        let err = ApiError::from_status(StatusCode::FORBIDDEN, "You cannot delete your own account");
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("You cannot delete your own account"));
    }

    #[test]
    fn test_only_401_expires_the_session() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"detail":"Invalid token"}"#);
        assert!(err.is_session_expired());
        assert_eq!(err.detail(), "Invalid token");

        let err = ApiError::from_status(StatusCode::FORBIDDEN, r#"{"detail":"You can only delete users you created"}"#);
        assert!(!err.is_session_expired());
        assert_eq!(err.detail(), "You can only delete users you created");

        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"detail":"Job not found"}"#);
        assert!(!err.is_session_expired());
    }

    #[test]
    fn test_decode_failure_from_json() {
        let err: ApiError = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_empty_body_falls_back_to_code() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[test]
    fn test_message_field_and_plain_text() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message":"bad input"}"#);
        assert_eq!(err.to_string(), "bad input");

        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.to_string(), "boom");
    }
}
