use crate::error::ApiError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
    /// The backend rejected the session token; the user must sign in again.
    SessionExpired,
}

/// Outcome of a user action, shown once and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: Option<String>,
}

impl Notice {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: None,
        }
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            description: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: None,
        }
    }

    pub fn session_expired(detail: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::SessionExpired,
            title: "Session expired".into(),
            description: Some(detail.into()),
        }
    }

    /// Error notice carrying the backend's detail message. A 401 becomes a
    /// session-expired notice whatever the action was.
    pub fn failure(title: impl Into<String>, err: &ApiError) -> Self {
        if err.is_session_expired() {
            return Self::session_expired(err.detail());
        }
        Self::error(title).with_description(err.detail())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.level, NoticeLevel::Error | NoticeLevel::SessionExpired)
    }

    pub fn is_session_expired(&self) -> bool {
        self.level == NoticeLevel::SessionExpired
    }

    /// Writes the notice to the log at a level matching its severity.
    pub fn log(&self) {
        match self.level {
            NoticeLevel::Error | NoticeLevel::SessionExpired => tracing::warn!("{}", self),
            _ => tracing::info!("{}", self),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(d) => write!(f, "{}: {}", self.title, d),
            None => write!(f, "{}", self.title),
        }
    }
}
