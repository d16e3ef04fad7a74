//! Request and response messages.
//!
//! On the wire a request looks like
//!
//! ```json
//! { "id": 1, "op": "login", "user_id": "alice", "password": "..." }
//! ```
//!
//! and its response like
//!
//! ```json
//! { "id": 1, "status": "ok", "kind": "session",
//!   "session": { "user_id": "alice", "refresh_token": "...", "signed_token": "..." } }
//! ```
//!
//! `#[serde(tag = "...")]` makes serde write the enum variant name as a
//! field next to the variant's own fields ("internally tagged"), and
//! `#[serde(flatten)]` merges those fields into the envelope.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A session as it travels on the wire.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSession {
    pub user_id: String,
    pub refresh_token: String,
    pub signed_token: String,
}

impl fmt::Debug for WireSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireSession")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// The four operations a client can ask for.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Exchange credentials for a new session.
    Login { user_id: String, password: String },
    /// Trade a session's refresh token for a new session.
    Refresh { session: WireSession },
    /// Ask whether a signed token is still current (expiry only).
    Check { token: String },
    /// End a session.
    Logout { session: WireSession },
}

impl Request {
    /// The operation name, for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Request::Login { .. } => "login",
            Request::Refresh { .. } => "refresh",
            Request::Check { .. } => "check",
            Request::Logout { .. } => "logout",
        }
    }
}

// Passwords and tokens never end up in logs through `{:?}`.
impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Login { user_id, .. } => f
                .debug_struct("Login")
                .field("user_id", user_id)
                .finish_non_exhaustive(),
            Request::Refresh { session } => {
                f.debug_struct("Refresh").field("session", session).finish()
            }
            Request::Check { .. } => f.debug_struct("Check").finish_non_exhaustive(),
            Request::Logout { session } => {
                f.debug_struct("Logout").field("session", session).finish()
            }
        }
    }
}

/// A request plus its correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: u64,
    #[serde(flatten)]
    pub request: Request,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Outcome category of a request.
///
/// Deliberately coarse: clients learn whether to retry, re-login, or give
/// up, and nothing about why the server failed internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    /// Wrong credentials, or an invalid/revoked session or token.
    PermissionDenied,
    /// The user does not exist.
    NotFound,
    /// The server could not decide.
    Internal,
    /// The request could not be decoded.
    BadRequest,
}

impl Status {
    /// The fixed message sent with an error of this status.
    pub fn message(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::PermissionDenied => "permission denied",
            Status::NotFound => "user not found",
            Status::Internal => "internal error",
            Status::BadRequest => "malformed request",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What a response carries, depending on the request and outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Answer to `login` and `refresh`.
    Session { session: WireSession },
    /// Answer to `check`.
    Validity { valid: bool },
    /// Answer to `logout`.
    LoggedOut,
    /// Any failure.
    Error { message: String },
}

/// A response plus the id of the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: u64,
    pub status: Status,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    pub fn ok(id: u64, body: ResponseBody) -> Self {
        Self {
            id,
            status: Status::Ok,
            body,
        }
    }

    /// An error response carrying only the status's fixed message.
    pub fn error(id: u64, status: Status) -> Self {
        Self {
            id,
            status,
            body: ResponseBody::Error {
                message: status.message().to_string(),
            },
        }
    }
}
