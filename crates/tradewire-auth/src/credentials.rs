//! API credentials for private venue endpoints
//!
//! # Security
//!
//! Secrets are stored using the `secrecy` crate which:
//! - Zeroizes memory on drop (prevents memory scanning)
//! - Prevents accidental logging via Debug impl
//! - Provides explicit access via `expose_secret()`

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// Access key, secret, and the optional parts some venues require
///
/// OKEx and KuCoin also need a passphrase. Bitstamp signs with a client
/// id (the customer number).
pub struct Credentials {
    /// API key (public)
    api_key: String,
    /// API secret (zeroized on drop)
    secret: SecretString,
    passphrase: Option<SecretString>,
    client_id: Option<String>,
}

impl Credentials {
    /// Create credentials from an access key and secret
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: SecretString::from(secret.into()),
            passphrase: None,
            client_id: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(SecretString::from(passphrase.into()));
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Create credentials from environment variables
    ///
    /// Reads `{PREFIX}_API_KEY` and `{PREFIX}_API_SECRET`, plus the optional
    /// `{PREFIX}_PASSPHRASE` and `{PREFIX}_CLIENT_ID`.
    pub fn from_env(prefix: &str) -> AuthResult<Self> {
        let var = |suffix: &str| format!("{}_{}", prefix.to_ascii_uppercase(), suffix);

        let key_var = var("API_KEY");
        let secret_var = var("API_SECRET");
        let api_key = std::env::var(&key_var).map_err(|_| AuthError::EnvVarNotSet(key_var))?;
        let secret = std::env::var(&secret_var).map_err(|_| AuthError::EnvVarNotSet(secret_var))?;

        let mut credentials = Self::new(api_key, secret);
        if let Ok(passphrase) = std::env::var(var("PASSPHRASE")) {
            credentials = credentials.with_passphrase(passphrase);
        }
        if let Ok(client_id) = std::env::var(var("CLIENT_ID")) {
            credentials = credentials.with_client_id(client_id);
        }
        debug!(prefix, "Loaded credentials from environment");
        Ok(credentials)
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn has_passphrase(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Secret bytes as given
    pub(crate) fn secret_bytes(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }

    /// Secret decoded from base64, for venues that issue encoded secrets
    pub(crate) fn secret_base64_decoded(&self) -> AuthResult<Vec<u8>> {
        BASE64
            .decode(self.secret.expose_secret())
            .map_err(|e| AuthError::InvalidCredentials(format!("Invalid base64 secret: {}", e)))
    }

    pub(crate) fn passphrase(&self) -> AuthResult<&str> {
        self.passphrase
            .as_ref()
            .map(|p| p.expose_secret())
            .ok_or(AuthError::MissingCredential("passphrase"))
    }

    pub(crate) fn require_client_id(&self) -> AuthResult<&str> {
        self.client_id
            .as_deref()
            .ok_or(AuthError::MissingCredential("client_id"))
    }
}

impl Clone for Credentials {
    /// Clone credentials (creates new secret boxes with the same content)
    fn clone(&self) -> Self {
        Self {
            api_key: self.api_key.clone(),
            secret: SecretString::from(self.secret.expose_secret().to_string()),
            passphrase: self
                .passphrase
                .as_ref()
                .map(|p| SecretString::from(p.expose_secret().to_string())),
            client_id: self.client_id.clone(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let visible: String = self.api_key.chars().take(8).collect();
        f.debug_struct("Credentials")
            .field("api_key", &format!("{}...", visible))
            .field("secret", &"[REDACTED]")
            .field(
                "passphrase",
                &self.passphrase.as_ref().map(|_| "[REDACTED]"),
            )
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("abcdefghijklmnop", "super-secret").with_passphrase("pass-phrase");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("abcdefgh..."));
        assert!(!debug.contains("ijklmnop"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("pass-phrase"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_debug_short_key() {
        let creds = Credentials::new("ab", "s");
        assert!(format!("{:?}", creds).contains("ab..."));
    }

    #[test]
    fn test_clone_keeps_secret() {
        let creds = Credentials::new("key", "secret").with_client_id("123");
        let cloned = creds.clone();
        assert_eq!(cloned.secret_bytes(), b"secret");
        assert_eq!(cloned.client_id(), Some("123"));
    }

    #[test]
    fn test_missing_parts() {
        let creds = Credentials::new("key", "secret");
        assert!(matches!(creds.passphrase(), Err(AuthError::MissingCredential("passphrase"))));
        assert!(matches!(
            creds.require_client_id(),
            Err(AuthError::MissingCredential("client_id"))
        ));
    }

    #[test]
    fn test_invalid_base64_secret() {
        let creds = Credentials::new("key", "not base64!!");
        assert!(matches!(
            creds.secret_base64_decoded(),
            Err(AuthError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_from_env_missing() {
        let result = Credentials::from_env("TRADEWIRE_TEST_UNSET_VENUE");
        assert!(matches!(result, Err(AuthError::EnvVarNotSet(ref v)) if v == "TRADEWIRE_TEST_UNSET_VENUE_API_KEY"));
    }
}
