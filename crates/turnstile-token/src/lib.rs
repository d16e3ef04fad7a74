//! Token issuer for Turnstile.
//!
//! Two unrelated token types live here, each with its own trust model:
//!
//! - **Signed tokens** ([`SignedToken`], minted by [`TokenSigner`]) are
//!   short-lived and self-describing. The subject and expiry travel inside
//!   the token and are trusted because of an HMAC over them; checking one
//!   needs no storage lookup.
//! - **Refresh tokens** ([`new_refresh`]) are long-lived opaque random
//!   strings. They mean nothing on their own and are only valid while the
//!   storage layer says so.
//!
//! Parsing never looks at the expiry. [`TokenSigner::parse`] answers
//! "is this token genuine?", and [`SignedToken::is_expired`] answers
//! "is it still current?", so callers can tell a forged token from a
//! stale one.

mod error;
mod refresh;
mod signed;

pub use error::TokenError;
pub use refresh::{DEFAULT_REFRESH_LEN, new_refresh};
pub use signed::{SignedToken, TokenSigner};
