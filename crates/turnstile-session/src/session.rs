//! The session triple handed to and received from clients.

use std::fmt;

/// A user's session: who they are plus the two credentials proving it.
///
/// Sessions are never stored as a unit. The refresh token lives in
/// storage under the user id; the signed token lives only with the client.
/// A session returned by the manager always has all three fields set.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub refresh: String,
    pub signed_token: String,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        refresh: impl Into<String>,
        signed_token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            refresh: refresh.into(),
            signed_token: signed_token.into(),
        }
    }

    /// `true` when no field is empty.
    pub fn is_complete(&self) -> bool {
        !self.user_id.is_empty() && !self.refresh.is_empty() && !self.signed_token.is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
