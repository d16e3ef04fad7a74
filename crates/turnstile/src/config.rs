//! Process configuration.
//!
//! Settings come from an optional TOML file, overlaid by environment
//! variables prefixed `TURNSTILE` with `__` between path segments:
//!
//! ```text
//! TURNSTILE__SERVER__BIND_ADDR=0.0.0.0:9000
//! TURNSTILE__TOKEN__SIGNING_SECRET=...
//! TURNSTILE__CHALLENGE__KEYS=key-one,key-two
//! ```
//!
//! Every field except the signing secret and the cipher keys has a
//! default. [`Settings::validate`] runs on every load.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use turnstile_challenge::{ChallengeError, DEFAULT_SALT_LEN, KEY_LEN, KeyRing};
use turnstile_session::SessionOptions;
use turnstile_sweep::SweepConfig;
use turnstile_token::{DEFAULT_REFRESH_LEN, TokenSigner};

use crate::TurnstileError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TURNSTILE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub token: TokenSettings,
    #[serde(default)]
    pub challenge: ChallengeSettings,
    #[serde(default)]
    pub sweep: SweepSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// A connection with no request for this long is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Upper bound on graceful shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            idle_timeout_secs: default_idle_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl ServerSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[derive(Clone, Deserialize)]
pub struct TokenSettings {
    /// HMAC secret for signed tokens. Required.
    #[serde(default)]
    pub signing_secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    /// Random bytes per refresh token.
    #[serde(default = "default_refresh_len")]
    pub refresh_len: usize,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            ttl_secs: default_token_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            refresh_len: default_refresh_len(),
        }
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("signing_secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("refresh_len", &self.refresh_len)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct ChallengeSettings {
    /// AES-256 keys, newest first. Each must be exactly 32 bytes.
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default = "default_salt_len")]
    pub salt_len: usize,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            salt_len: default_salt_len(),
        }
    }
}

impl fmt::Debug for ChallengeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeSettings")
            .field("keys", &format_args!("<{} redacted>", self.keys.len()))
            .field("salt_len", &self.salt_len)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepSettings {
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Upper bound on a single session operation.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:9000".into()
}
fn default_idle_timeout_secs() -> u64 {
    60
}
fn default_shutdown_timeout_secs() -> u64 {
    3
}
fn default_token_ttl_secs() -> u64 {
    15 * 60
}
fn default_refresh_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_refresh_len() -> usize {
    DEFAULT_REFRESH_LEN
}
fn default_salt_len() -> usize {
    DEFAULT_SALT_LEN
}
fn default_sweep_interval_secs() -> u64 {
    15
}
fn default_request_timeout_ms() -> u64 {
    3_000
}

impl Settings {
    /// Loads settings from `path` (if given) and the environment, then
    /// validates them.
    pub fn load(path: Option<&Path>) -> Result<Self, TurnstileError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("challenge.keys"),
        );
        Self::finish(builder)
    }

    /// Loads settings from a TOML document only, then validates them.
    pub fn from_toml_str(toml: &str) -> Result<Self, TurnstileError> {
        Self::finish(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, TurnstileError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects settings the service cannot start with.
    pub fn validate(&self) -> Result<(), TurnstileError> {
        let invalid = |msg: String| Err(TurnstileError::InvalidConfig(msg));

        if self.server.bind_addr.is_empty() {
            return invalid("server.bind_addr must not be empty".into());
        }
        if self.server.idle_timeout_secs == 0 || self.server.shutdown_timeout_secs == 0 {
            return invalid("server timeouts must be > 0".into());
        }
        if self.token.signing_secret.is_empty() {
            return invalid("token.signing_secret is required".into());
        }
        if self.token.ttl_secs == 0 || self.token.refresh_ttl_secs == 0 {
            return invalid("token TTLs must be > 0".into());
        }
        if self.token.refresh_len == 0 {
            return invalid("token.refresh_len must be > 0".into());
        }
        if self.challenge.keys.is_empty() {
            return invalid("challenge.keys needs at least one key".into());
        }
        for (i, key) in self.challenge.keys.iter().enumerate() {
            if key.len() != KEY_LEN {
                return invalid(format!(
                    "challenge.keys[{i}] must be {KEY_LEN} bytes, got {}",
                    key.len()
                ));
            }
        }
        if self.challenge.salt_len == 0 {
            return invalid("challenge.salt_len must be > 0".into());
        }
        if self.sweep.interval_secs == 0 {
            return invalid("sweep.interval_secs must be > 0".into());
        }
        if self.session.request_timeout_ms == 0 {
            return invalid("session.request_timeout_ms must be > 0".into());
        }
        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            refresh_token_len: self.token.refresh_len,
            signed_token_ttl: Duration::from_secs(self.token.ttl_secs),
            refresh_token_ttl: Duration::from_secs(self.token.refresh_ttl_secs),
            salt_len: self.challenge.salt_len,
            request_timeout: Duration::from_millis(self.session.request_timeout_ms),
        }
    }

    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig::with_interval(Duration::from_secs(self.sweep.interval_secs))
    }

    pub fn key_ring(&self) -> Result<KeyRing, ChallengeError> {
        KeyRing::new(&self.challenge.keys)
    }

    pub fn signer(&self) -> TokenSigner {
        TokenSigner::new(self.token.signing_secret.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [token]
        signing_secret = "config-test-secret"

        [challenge]
        keys = ["vcMGBMVbxobHRRdX1WBYq0T4L3UYWQLd"]
    "#;

    #[test]
    fn test_from_toml_minimal_fills_defaults() {
        let settings = Settings::from_toml_str(MINIMAL).unwrap();

        assert_eq!(settings.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(settings.server.idle_timeout(), Duration::from_secs(60));
        assert_eq!(settings.server.shutdown_timeout(), Duration::from_secs(3));
        assert_eq!(settings.token.ttl_secs, 900);
        assert_eq!(settings.token.refresh_ttl_secs, 86_400);
        assert_eq!(settings.token.refresh_len, 32);
        assert_eq!(settings.challenge.salt_len, 16);
        assert_eq!(settings.sweep.interval_secs, 15);
        assert_eq!(settings.session.request_timeout_ms, 3_000);
    }

    #[test]
    fn test_from_toml_overrides_defaults() {
        let toml = format!(
            "{MINIMAL}\n[server]\nbind_addr = \"0.0.0.0:7000\"\n[sweep]\ninterval_secs = 5\n"
        );
        let settings = Settings::from_toml_str(&toml).unwrap();

        assert_eq!(settings.server.bind_addr, "0.0.0.0:7000");
        assert_eq!(settings.sweep_config().interval, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_missing_secret_rejected() {
        let toml = r#"
            [challenge]
            keys = ["vcMGBMVbxobHRRdX1WBYq0T4L3UYWQLd"]
        "#;
        let err = Settings::from_toml_str(toml).unwrap_err();

        assert!(matches!(err, TurnstileError::InvalidConfig(ref m) if m.contains("signing_secret")));
    }

    #[test]
    fn test_validate_empty_key_ring_rejected() {
        let toml = r#"
            [token]
            signing_secret = "s"
        "#;
        let err = Settings::from_toml_str(toml).unwrap_err();

        assert!(matches!(err, TurnstileError::InvalidConfig(ref m) if m.contains("challenge.keys")));
    }

    #[test]
    fn test_validate_short_key_rejected() {
        let toml = r#"
            [token]
            signing_secret = "s"
            [challenge]
            keys = ["vcMGBMVbxobHRRdX1WBYq0T4L3UYWQLd", "too-short"]
        "#;
        let err = Settings::from_toml_str(toml).unwrap_err();

        assert!(matches!(err, TurnstileError::InvalidConfig(ref m) if m.contains("keys[1]")));
    }

    #[test]
    fn test_validate_zero_interval_rejected() {
        let mut settings = Settings::from_toml_str(MINIMAL).unwrap();
        settings.sweep.interval_secs = 0;

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_toml_wrong_type_is_config_error() {
        let toml = format!("{MINIMAL}\n[sweep]\ninterval_secs = \"soon\"\n");
        let err = Settings::from_toml_str(&toml).unwrap_err();

        assert!(matches!(err, TurnstileError::Config(_)));
    }

    #[test]
    fn test_session_options_mapped_from_settings() {
        let settings = Settings::from_toml_str(MINIMAL).unwrap();
        let options = settings.session_options();

        assert_eq!(options.signed_token_ttl, Duration::from_secs(900));
        assert_eq!(options.refresh_token_ttl, Duration::from_secs(86_400));
        assert_eq!(options.request_timeout, Duration::from_secs(3));
        assert_eq!(settings.key_ring().unwrap().len(), 1);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = Settings::from_toml_str(MINIMAL).unwrap();
        let rendered = format!("{settings:?}");

        assert!(!rendered.contains("config-test-secret"));
        assert!(!rendered.contains("vcMGBMVbxobHRRdX1WBYq0T4L3UYWQLd"));
        assert!(rendered.contains("redacted"));
    }
}
