//! The auth service: the four client-facing operations on top of the
//! [`SessionManager`], and the mapping from session errors to wire
//! statuses.
//!
//! Only a [`Status`] ever reaches the client. The error that caused it is
//! logged here and goes no further.

use turnstile_protocol::{Request, RequestEnvelope, ResponseBody, ResponseEnvelope, Status, WireSession};
use turnstile_session::{Session, SessionError, SessionManager};
use turnstile_store::Store;
use turnstile_token::TokenError;

/// Maps a session error onto the status the client sees.
pub fn status_for(err: &SessionError) -> Status {
    match err {
        SessionError::InvalidChallenge
        | SessionError::InvalidSession
        | SessionError::Token(TokenError::InvalidToken(_)) => Status::PermissionDenied,
        SessionError::UserNotExist => Status::NotFound,
        _ => Status::Internal,
    }
}

/// Answers login, refresh, check and logout requests.
pub struct AuthService<S: Store> {
    sessions: SessionManager<S>,
}

impl<S: Store> AuthService<S> {
    pub fn new(sessions: SessionManager<S>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &SessionManager<S> {
        &self.sessions
    }

    pub async fn login(&self, user_id: &str, password: &str) -> Result<WireSession, Status> {
        self.sessions
            .login(user_id, password)
            .await
            .map(to_wire)
            .map_err(|e| reject("login", &e))
    }

    /// Renews `session`.
    pub async fn refresh(&self, session: WireSession) -> Result<WireSession, Status> {
        self.sessions
            .renew_session(&from_wire(session))
            .await
            .map(to_wire)
            .map_err(|e| reject("refresh", &e))
    }

    /// Whether `token` is genuine and unexpired. Revocation is not
    /// consulted.
    pub fn check(&self, token: &str) -> Result<bool, Status> {
        self.sessions
            .check_token(token)
            .map_err(|e| reject("check", &e))
    }

    pub async fn logout(&self, session: WireSession) -> Result<(), Status> {
        self.sessions
            .destroy_session(&from_wire(session))
            .await
            .map_err(|e| reject("logout", &e))
    }

    /// Runs one request and builds its response.
    pub async fn handle(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        let RequestEnvelope { id, request } = envelope;

        let result = match request {
            Request::Login { user_id, password } => self
                .login(&user_id, &password)
                .await
                .map(|session| ResponseBody::Session { session }),
            Request::Refresh { session } => self
                .refresh(session)
                .await
                .map(|session| ResponseBody::Session { session }),
            Request::Check { token } => self.check(&token).map(|valid| ResponseBody::Validity { valid }),
            Request::Logout { session } => self.logout(session).await.map(|()| ResponseBody::LoggedOut),
        };

        match result {
            Ok(body) => ResponseEnvelope::ok(id, body),
            Err(status) => ResponseEnvelope::error(id, status),
        }
    }
}

/// Logs `err` at a level matching its status and returns that status.
fn reject(op: &'static str, err: &SessionError) -> Status {
    let status = status_for(err);
    match status {
        Status::Internal => tracing::error!(op, error = %err, "request failed"),
        _ => tracing::debug!(op, error = %err, ?status, "request rejected"),
    }
    status
}

fn to_wire(session: Session) -> WireSession {
    WireSession {
        user_id: session.user_id,
        refresh_token: session.refresh,
        signed_token: session.signed_token,
    }
}

fn from_wire(session: WireSession) -> Session {
    Session::new(session.user_id, session.refresh_token, session.signed_token)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use turnstile_challenge::{ChallengeError, KeyRing};
    use turnstile_session::SessionOptions;
    use turnstile_store::{MemoryStore, StoreError};
    use turnstile_token::TokenSigner;

    use super::*;

    const KEY: &[u8] = b"vcMGBMVbxobHRRdX1WBYq0T4L3UYWQLd";

    async fn service() -> AuthService<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let options = SessionOptions {
            request_timeout: Duration::from_secs(10),
            ..SessionOptions::default()
        };
        let sessions = SessionManager::new(
            Arc::clone(&store),
            TokenSigner::new(b"service-test-secret"),
            KeyRing::new([KEY]).unwrap(),
            options,
        );
        let challenge = sessions.challenger().generate("hunter22").unwrap();
        store.set_salt("alice", &challenge.salt).await.unwrap();
        store.set_verifier("alice", &challenge.verifier).await.unwrap();
        AuthService::new(sessions)
    }

    fn login_request(id: u64, user_id: &str, password: &str) -> RequestEnvelope {
        RequestEnvelope {
            id,
            request: Request::Login {
                user_id: user_id.into(),
                password: password.into(),
            },
        }
    }

    #[test]
    fn test_status_for_maps_domain_errors() {
        assert_eq!(status_for(&SessionError::InvalidChallenge), Status::PermissionDenied);
        assert_eq!(status_for(&SessionError::InvalidSession), Status::PermissionDenied);
        assert_eq!(
            status_for(&SessionError::Token(TokenError::InvalidToken("sig".into()))),
            Status::PermissionDenied
        );
        assert_eq!(status_for(&SessionError::UserNotExist), Status::NotFound);
    }

    #[test]
    fn test_status_for_everything_else_is_internal() {
        assert_eq!(status_for(&SessionError::DeadlineExceeded), Status::Internal);
        assert_eq!(status_for(&SessionError::Storage(StoreError::Closed)), Status::Internal);
        assert_eq!(
            status_for(&SessionError::Challenge(ChallengeError::CipherTooShort(3))),
            Status::Internal
        );
        assert_eq!(
            status_for(&SessionError::Token(TokenError::Signing("x".into()))),
            Status::Internal
        );
    }

    #[tokio::test]
    async fn test_handle_login_echoes_id_and_returns_session() {
        let service = service().await;

        let response = service.handle(login_request(41, "alice", "hunter22")).await;

        assert_eq!(response.id, 41);
        assert_eq!(response.status, Status::Ok);
        match response.body {
            ResponseBody::Session { session } => {
                assert_eq!(session.user_id, "alice");
                assert!(!session.refresh_token.is_empty());
                assert!(!session.signed_token.is_empty());
            }
            other => panic!("expected session, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_login_wrong_password_is_permission_denied() {
        let service = service().await;

        let response = service.handle(login_request(1, "alice", "wrong")).await;

        assert_eq!(response.status, Status::PermissionDenied);
        assert_eq!(
            response.body,
            ResponseBody::Error {
                message: "permission denied".into()
            }
        );
    }

    #[tokio::test]
    async fn test_handle_login_unknown_user_is_not_found() {
        let service = service().await;

        let response = service.handle(login_request(2, "mallory", "hunter22")).await;

        assert_eq!(response.status, Status::NotFound);
    }

    #[tokio::test]
    async fn test_check_fresh_token_is_valid() {
        let service = service().await;
        let session = service.login("alice", "hunter22").await.unwrap();

        assert_eq!(service.check(&session.signed_token), Ok(true));
        assert_eq!(service.check("not-a-token"), Err(Status::PermissionDenied));
    }

    #[tokio::test]
    async fn test_refresh_then_logout_lifecycle() {
        let service = service().await;
        let first = service.login("alice", "hunter22").await.unwrap();

        let second = service.refresh(first.clone()).await.unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);

        // The old refresh token is gone.
        assert_eq!(service.refresh(first.clone()).await, Err(Status::PermissionDenied));

        assert_eq!(service.logout(second.clone()).await, Ok(()));
        assert_eq!(service.logout(second).await, Err(Status::PermissionDenied));
    }

    #[tokio::test]
    async fn test_handle_logout_returns_logged_out() {
        let service = service().await;
        let session = service.login("alice", "hunter22").await.unwrap();

        let response = service
            .handle(RequestEnvelope {
                id: 9,
                request: Request::Logout { session },
            })
            .await;

        assert_eq!(response, ResponseEnvelope::ok(9, ResponseBody::LoggedOut));
    }

    #[tokio::test]
    async fn test_handle_closed_store_is_internal() {
        let service = service().await;
        service.sessions().store().close().await.unwrap();

        let response = service.handle(login_request(3, "alice", "hunter22")).await;

        assert_eq!(response.status, Status::Internal);
        assert_eq!(
            response.body,
            ResponseBody::Error {
                message: "internal error".into()
            }
        );
    }
}
