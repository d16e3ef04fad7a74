//! Signed, self-contained session tokens (HMAC JWTs).

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{TokenError, new_refresh};

/// Random bytes in the `jti` claim.
const TOKEN_ID_LEN: usize = 16;

/// Algorithm used when issuing. Parsing accepts the whole HMAC family.
const ISSUE_ALGORITHM: Algorithm = Algorithm::HS256;

/// The claims carried inside a signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// Subject: the user id the token was issued to.
    sub: String,
    /// Expiry as unix seconds.
    exp: i64,
    /// Random token id. Keeps two tokens for the same subject and expiry
    /// second distinct, so revoking one never revokes the other.
    #[serde(default)]
    jti: String,
}

// ---------------------------------------------------------------------------
// SignedToken
// ---------------------------------------------------------------------------

/// A signed token together with the claims it carries.
///
/// Obtained either from [`TokenSigner::issue`] or from
/// [`TokenSigner::parse`]; in both cases the claims have been produced or
/// verified by the signer, so they can be trusted without a lookup.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken {
    token: String,
    subject: String,
    expires_at: OffsetDateTime,
}

impl SignedToken {
    /// The serialized token, as handed to clients.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Consumes the token and returns its serialized form.
    pub fn into_string(self) -> String {
        self.token
    }

    /// The user id the token was issued to.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// When the token stops being current (whole seconds).
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Whether the expiry has been reached.
    ///
    /// The expiry instant itself counts as expired, so a token issued with
    /// a zero TTL is already expired.
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Time left until expiry. Negative once the token has expired.
    pub fn expires_in(&self) -> time::Duration {
        self.expires_at - OffsetDateTime::now_utc()
    }

    /// Time left until expiry, clamped at zero.
    ///
    /// This is the TTL to use when the token is put on a blacklist: an
    /// already-expired token gets a zero TTL and is swept on the next pass.
    pub fn remaining_ttl(&self) -> Duration {
        Duration::try_from(self.expires_in()).unwrap_or(Duration::ZERO)
    }
}

// Tokens are bearer credentials; keep them out of logs.
impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedToken")
            .field("subject", &self.subject)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// TokenSigner
// ---------------------------------------------------------------------------

/// Issues and verifies [`SignedToken`]s with a shared HMAC secret.
///
/// Build one at startup and share it; it holds no mutable state.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    /// Creates a signer for the given shared secret.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(ISSUE_ALGORITHM);
        // Only HMAC algorithms are accepted. A token declaring anything
        // else (RS256, none, ...) fails before its signature is looked at.
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // Expiry is checked separately by `SignedToken::is_expired`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            HashSet::from(["sub".to_string(), "exp".to_string()]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issues a token for `subject` that expires `ttl` from now.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<SignedToken, TokenError> {
        let ttl = time::Duration::try_from(ttl).map_err(|_| TokenError::ExpiryOutOfRange)?;
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        self.issue_until(subject, expires_at)
    }

    /// Issues a token for `subject` with an explicit expiry, which may lie
    /// in the past. The expiry is truncated to whole seconds.
    pub fn issue_until(
        &self,
        subject: &str,
        expires_at: OffsetDateTime,
    ) -> Result<SignedToken, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: expires_at.unix_timestamp(),
            jti: new_refresh(TOKEN_ID_LEN)?,
        };
        let token = jsonwebtoken::encode(&Header::new(ISSUE_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(SignedToken {
            token,
            subject: claims.sub,
            expires_at: from_unix(claims.exp)?,
        })
    }

    /// Verifies `token` and extracts its claims.
    ///
    /// Fails with [`TokenError::InvalidToken`] if the signature does not
    /// match, the algorithm is not HMAC, the token is malformed, or the
    /// subject/expiry claims are missing or mistyped. Expiry is NOT
    /// checked here.
    pub fn parse(&self, token: &str) -> Result<SignedToken, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(TokenError::InvalidToken("empty subject".into()));
        }

        Ok(SignedToken {
            token: token.to_string(),
            expires_at: from_unix(claims.exp)?,
            subject: claims.sub,
        })
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

fn from_unix(secs: i64) -> Result<OffsetDateTime, TokenError> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|_| TokenError::InvalidToken("expiry out of range".into()))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    const SECRET: &[u8] = b"test-signing-secret";
    const FIFTEEN_MIN: Duration = Duration::from_secs(15 * 60);

    fn signer() -> TokenSigner {
        TokenSigner::new(SECRET)
    }

    /// Builds `header.payload.signature` by hand so tests can declare
    /// algorithms the library refuses to sign with.
    fn raw_token(header: serde_json::Value, payload: serde_json::Value) -> String {
        let h = URL_SAFE_NO_PAD.encode(header.to_string());
        let p = URL_SAFE_NO_PAD.encode(payload.to_string());
        let s = URL_SAFE_NO_PAD.encode(b"not-a-real-signature");
        format!("{h}.{p}.{s}")
    }

    fn future_exp() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp() + 600
    }

    // =====================================================================
    // issue() / parse()
    // =====================================================================

    #[test]
    fn test_issue_then_parse_recovers_claims() {
        let signer = signer();
        let issued = signer.issue("alice", FIFTEEN_MIN).unwrap();

        let parsed = signer.parse(issued.as_str()).unwrap();

        assert_eq!(parsed.subject(), "alice");
        assert_eq!(parsed.expires_at(), issued.expires_at());
        assert_eq!(parsed, issued);
    }

    #[test]
    fn test_issue_same_subject_same_second_gives_distinct_tokens() {
        let signer = signer();

        let a = signer.issue("alice", FIFTEEN_MIN).unwrap();
        let b = signer.issue("alice", FIFTEEN_MIN).unwrap();

        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_parse_different_secret_returns_invalid_token() {
        let issued = signer().issue("alice", FIFTEEN_MIN).unwrap();

        let result = TokenSigner::new(b"another-secret").parse(issued.as_str());

        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
    }

    #[test]
    fn test_parse_any_single_byte_tampered_returns_invalid_token() {
        let signer = signer();
        let token = signer.issue("alice", FIFTEEN_MIN).unwrap().into_string();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(
                matches!(signer.parse(&tampered), Err(TokenError::InvalidToken(_))),
                "tampering byte {i} was not detected"
            );
        }
    }

    #[test]
    fn test_parse_non_hmac_algorithm_returns_invalid_token() {
        let claims = serde_json::json!({ "sub": "alice", "exp": future_exp() });

        for alg in ["RS256", "ES256", "none"] {
            let token = raw_token(serde_json::json!({ "alg": alg, "typ": "JWT" }), claims.clone());
            assert!(
                matches!(signer().parse(&token), Err(TokenError::InvalidToken(_))),
                "{alg} token was accepted"
            );
        }
    }

    #[test]
    fn test_parse_other_hmac_algorithm_is_accepted() {
        let claims = Claims {
            sub: "alice".into(),
            exp: future_exp(),
            jti: "id".into(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(signer().parse(&token).unwrap().subject(), "alice");
    }

    #[test]
    fn test_parse_missing_subject_returns_invalid_token() {
        #[derive(Serialize)]
        struct OnlyExp {
            exp: i64,
        }
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &OnlyExp { exp: future_exp() },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(signer().parse(&token), Err(TokenError::InvalidToken(_))));
    }

    #[test]
    fn test_parse_wrong_claim_type_returns_invalid_token() {
        #[derive(Serialize)]
        struct NumericSubject {
            sub: u64,
            exp: i64,
        }
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &NumericSubject { sub: 42, exp: future_exp() },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(signer().parse(&token), Err(TokenError::InvalidToken(_))));
    }

    #[test]
    fn test_parse_garbage_returns_invalid_token() {
        for garbage in ["", "abc", "a.b.c", "...."] {
            assert!(matches!(signer().parse(garbage), Err(TokenError::InvalidToken(_))));
        }
    }

    // =====================================================================
    // expiry
    // =====================================================================

    #[test]
    fn test_is_expired_positive_ttl_returns_false() {
        let token = signer().issue("alice", FIFTEEN_MIN).unwrap();

        assert!(!token.is_expired());
        assert!(token.expires_in() > time::Duration::minutes(14));
        assert!(token.remaining_ttl() > Duration::from_secs(14 * 60));
    }

    #[test]
    fn test_is_expired_zero_ttl_returns_true() {
        let token = signer().issue("alice", Duration::ZERO).unwrap();

        assert!(token.is_expired());
    }

    #[test]
    fn test_parse_expired_token_still_parses() {
        let signer = signer();
        let past = OffsetDateTime::now_utc() - time::Duration::minutes(5);
        let issued = signer.issue_until("alice", past).unwrap();

        let parsed = signer.parse(issued.as_str()).expect("expiry is not checked on parse");

        assert!(parsed.is_expired());
        assert!(parsed.expires_in().is_negative());
        assert_eq!(parsed.remaining_ttl(), Duration::ZERO);
    }

    #[test]
    fn test_issue_huge_ttl_returns_out_of_range() {
        let result = signer().issue("alice", Duration::MAX);

        assert!(matches!(result, Err(TokenError::ExpiryOutOfRange)));
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let token = signer().issue("alice", FIFTEEN_MIN).unwrap();

        let rendered = format!("{token:?}");

        assert!(rendered.contains("alice"));
        assert!(!rendered.contains(token.as_str()));
    }
}
