//! Error types for credential handling and signing

use tradewire_types::ExchangeError;

/// Errors that can occur while building credentials or signing a request
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Invalid API credentials
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// A scheme needs a credential part that was not configured
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// Environment variable not set
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// Failed to encode the signed payload
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

impl From<AuthError> for ExchangeError {
    fn from(err: AuthError) -> Self {
        ExchangeError::Auth(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::EnvVarNotSet("BINANCE_API_KEY".to_string());
        assert!(err.to_string().contains("BINANCE_API_KEY"));
    }

    #[test]
    fn test_into_exchange_error() {
        let err: ExchangeError = AuthError::MissingCredential("client_id").into();
        assert!(matches!(err, ExchangeError::Auth(ref m) if m.contains("client_id")));
    }
}
