use crate::client::BackendClient;
use crate::error::ApiError;
use crate::models::VerifyResponse;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const LOGIN_ROUTE: &str = "/login";

/// Answers whether the ambient credential belongs to a live session.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self) -> Result<VerifyResponse, ApiError>;
}

#[async_trait]
impl SessionVerifier for BackendClient {
    async fn verify(&self) -> Result<VerifyResponse, ApiError> {
        self.verify_session().await
    }
}

/// Where an unauthenticated visitor is sent, and where they were going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub to: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    /// Verification in flight; nothing may be rendered.
    Checking,
    Authenticated(VerifyResponse),
    Unauthenticated(LoginRedirect),
}

impl GateState {
    pub fn is_checking(&self) -> bool {
        matches!(self, GateState::Checking)
    }

    /// The verified session, only once the backend confirmed it.
    pub fn protected(&self) -> Option<&VerifyResponse> {
        match self {
            GateState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn redirect(&self) -> Option<&LoginRedirect> {
        match self {
            GateState::Unauthenticated(redirect) => Some(redirect),
            _ => None,
        }
    }
}

/// Guard in front of every protected view.
///
/// Issues exactly one verify call per check and fails closed: network
/// errors, error statuses and `valid: false` all redirect to login.
pub struct SessionGate<V: ?Sized> {
    verifier: Arc<V>,
    login_route: String,
}

impl<V: SessionVerifier + ?Sized + 'static> SessionGate<V> {
    pub fn new(verifier: Arc<V>) -> Self {
        Self {
            verifier,
            login_route: LOGIN_ROUTE.to_string(),
        }
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub async fn check(&self, requested: &str) -> GateState {
        verify_once(self.verifier.as_ref(), &self.login_route, requested).await
    }

    /// Starts the check in the background and returns immediately in
    /// `Checking`. Dropping the returned gate discards an unresolved check.
    pub fn mount(&self, requested: &str) -> MountedGate {
        let (tx, rx) = watch::channel(GateState::Checking);
        let cancel = CancellationToken::new();

        let verifier = Arc::clone(&self.verifier);
        let login_route = self.login_route.clone();
        let requested = requested.to_string();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let state = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                state = verify_once(verifier.as_ref(), &login_route, &requested) => state,
            };
            if token.is_cancelled() {
                return;
            }
            let _ = tx.send(state);
        });

        MountedGate { rx, cancel, task }
    }
}

async fn verify_once<V: SessionVerifier + ?Sized>(verifier: &V, login_route: &str, requested: &str) -> GateState {
    let redirect = || {
        GateState::Unauthenticated(LoginRedirect {
            to: login_route.to_string(),
            from: requested.to_string(),
        })
    };

    match verifier.verify().await {
        Ok(session) if session.valid => {
            tracing::debug!("Session verified for {} at {}", session.user.username, requested);
            GateState::Authenticated(session)
        }
        Ok(_) => {
            tracing::info!("Session reported invalid, redirecting {} to {}", requested, login_route);
            redirect()
        }
        Err(e) => {
            tracing::info!("Session check failed ({}), redirecting {} to {}", e, requested, login_route);
            redirect()
        }
    }
}

/// A gate attached to one mounted view.
pub struct MountedGate {
    rx: watch::Receiver<GateState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MountedGate {
    pub fn state(&self) -> GateState {
        self.rx.borrow().clone()
    }

    /// Waits for the check to resolve.
    pub async fn resolved(&mut self) -> GateState {
        loop {
            if !self.rx.borrow().is_checking() {
                return self.state();
            }
            if self.rx.changed().await.is_err() {
                return self.state();
            }
        }
    }
}

impl Drop for MountedGate {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::models::UserInfo;
    use crate::session::SessionContext;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Answer {
        Valid,
        Invalid,
        Status(StatusCode),
    }

    struct FakeVerifier {
        answer: Answer,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeVerifier {
        fn new(answer: Answer) -> Self {
            Self {
                answer,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn slow(answer: Answer, delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new(answer)
            }
        }
    }

    #[async_trait]
    impl SessionVerifier for FakeVerifier {
        async fn verify(&self) -> Result<VerifyResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let session = VerifyResponse {
                valid: true,
                user: UserInfo { id: 1, username: "ada".into() },
                company_id: 7,
            };
            match self.answer {
                Answer::Valid => Ok(session),
                Answer::Invalid => Ok(VerifyResponse { valid: false, ..session }),
                Answer::Status(status) => Err(ApiError::from_status(status, r#"{"detail":"Invalid token"}"#)),
            }
        }
    }

    #[tokio::test]
    async fn test_valid_session_renders_protected() {
        let verifier = Arc::new(FakeVerifier::new(Answer::Valid));
        let gate = SessionGate::new(verifier.clone());

        let state = gate.check("/dashboard").await;
        assert_eq!(state.protected().map(|s| s.user.username.as_str()), Some("ada"));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_redirect_to_login() {
        for answer in [
            Answer::Invalid,
            Answer::Status(StatusCode::UNAUTHORIZED),
            Answer::Status(StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            let gate = SessionGate::new(Arc::new(FakeVerifier::new(answer)));
            let state = gate.check("/dashboard/api-keys").await;

            assert!(state.protected().is_none());
            assert_eq!(
                state.redirect(),
                Some(&LoginRedirect {
                    to: "/login".into(),
                    from: "/dashboard/api-keys".into()
                })
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_closed() {
        let client = BackendClient::new(&BackendConfig {
            base_url: "http://127.0.0.1:9".into(),
            request_timeout_secs: Some(1),
        })
        .unwrap();
        client
            .use_session(&SessionContext {
                token: Some("stored-token".into()),
                user: None,
                company: None,
            })
            .await;
        let gate = SessionGate::new(Arc::new(client));

        let state = gate.check("/dashboard/models").await;
        assert!(state.protected().is_none());
        assert_eq!(
            state.redirect(),
            Some(&LoginRedirect {
                to: "/login".into(),
                from: "/dashboard/models".into()
            })
        );

        let mut mounted = gate.mount("/dashboard/usage");
        let state = mounted.resolved().await;
        assert!(state.protected().is_none());
        assert_eq!(state.redirect().map(|r| r.from.as_str()), Some("/dashboard/usage"));
    }

    #[tokio::test]
    async fn test_custom_login_route() {
        let gate = SessionGate::new(Arc::new(FakeVerifier::new(Answer::Invalid))).with_login_route("/signin");
        let state = gate.check("/dashboard").await;
        assert_eq!(state.redirect().map(|r| r.to.as_str()), Some("/signin"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mounted_gate_starts_checking_and_checks_once() {
        let verifier = Arc::new(FakeVerifier::slow(Answer::Valid, Duration::from_secs(2)));
        let gate = SessionGate::new(verifier.clone());

        let mut mounted = gate.mount("/dashboard");
        assert!(mounted.state().is_checking());
        assert!(mounted.state().protected().is_none());

        let state = mounted.resolved().await;
        assert!(state.protected().is_some());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remount_checks_again() {
        let verifier = Arc::new(FakeVerifier::new(Answer::Valid));
        let gate = SessionGate::new(verifier.clone());

        let mut first = gate.mount("/dashboard");
        first.resolved().await;
        drop(first);

        let mut second = gate.mount("/dashboard/settings");
        second.resolved().await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_before_resolution_discards_result() {
        let verifier = Arc::new(FakeVerifier::slow(Answer::Valid, Duration::from_secs(5)));
        let gate = SessionGate::new(verifier.clone());

        let mounted = gate.mount("/dashboard");
        let mut rx = mounted.rx.clone();
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(mounted);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.borrow_and_update().is_checking());
        assert!(rx.changed().await.is_err());
    }
}
