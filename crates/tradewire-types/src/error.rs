//! Error types shared by all venue adapters

use thiserror::Error;

use crate::error_kind::VenueErrorKind;

/// Main error type for adapter operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    // === Transport ===
    /// Network or HTTP failure before a venue answer could be read
    ///
    /// When `order_state_unknown` is set the request was an order placement
    /// or cancellation that may have reached the venue. Reconcile with
    /// `get_order` or `get_open_orders` before acting again.
    #[error("transport error: {message}{}", unknown_state_note(.order_state_unknown))]
    Transport {
        message: String,
        order_state_unknown: bool,
    },

    // === Venue ===
    /// Business error reported in the venue's error envelope
    #[error("{kind} from venue (code {}): {message}", display_code(.code))]
    Venue {
        kind: VenueErrorKind,
        /// Raw venue code, when the envelope carries one
        code: Option<String>,
        /// Raw venue message, kept for diagnostics
        message: String,
    },

    /// The venue does not offer this operation
    #[error("{operation} is not supported on {venue}")]
    NotSupported {
        venue: &'static str,
        operation: &'static str,
    },

    // === Payload ===
    /// A financial field did not match the expected schema
    #[error("cannot normalize {field}: {reason}")]
    Normalization { field: String, reason: String },

    // === Caller input ===
    #[error("invalid currency pair: {0}")]
    InvalidPair(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    // === Authentication ===
    /// A private operation was called on an adapter built without credentials
    #[error("credentials required for this operation")]
    AuthRequired,

    /// Signing failed, typically a malformed secret
    #[error("authentication error: {0}")]
    Auth(String),
}

fn unknown_state_note(order_state_unknown: &bool) -> &'static str {
    if *order_state_unknown {
        " (order state unknown, reconcile with get_order/get_open_orders)"
    } else {
        ""
    }
}

fn display_code(code: &Option<String>) -> &str {
    code.as_deref().unwrap_or("-")
}

impl ExchangeError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            order_state_unknown: false,
        }
    }

    pub fn not_supported(venue: &'static str, operation: &'static str) -> Self {
        Self::NotSupported { venue, operation }
    }

    pub fn normalization(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Normalization {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Venue error with the kind decided by the caller
    pub fn venue(kind: VenueErrorKind, code: Option<String>, message: impl Into<String>) -> Self {
        Self::Venue {
            kind,
            code,
            message: message.into(),
        }
    }

    /// Mark a transport failure on a state-changing order call
    ///
    /// Non-transport errors pass through unchanged: a venue envelope means
    /// the venue answered and the state is known.
    pub fn into_order_state_unknown(self) -> Self {
        match self {
            Self::Transport { message, .. } => Self::Transport {
                message,
                order_state_unknown: true,
            },
            other => other,
        }
    }

    pub fn is_order_state_unknown(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                order_state_unknown: true,
                ..
            }
        )
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }

    /// Cross-venue kind for venue errors
    pub fn venue_kind(&self) -> Option<VenueErrorKind> {
        match self {
            Self::Venue { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns true if the caller may safely repeat the request
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport {
                order_state_unknown,
                ..
            } => !order_state_unknown,
            Self::Venue { kind, .. } => kind.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for adapter operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_retryable_until_order_state_unknown() {
        let err = ExchangeError::transport("connection reset");
        assert!(err.is_retryable());
        assert!(!err.is_order_state_unknown());

        let err = err.into_order_state_unknown();
        assert!(!err.is_retryable());
        assert!(err.is_order_state_unknown());
        assert!(err.to_string().contains("reconcile"));
    }

    #[test]
    fn test_venue_error_keeps_raw_message() {
        let err = ExchangeError::venue(
            VenueErrorKind::InsufficientBalance,
            Some("1001".into()),
            "insufficient balance",
        );
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::InsufficientBalance));
        assert!(err.to_string().contains("insufficient balance"));
        assert!(err.to_string().contains("1001"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rate_limit_is_retryable() {
        let err = ExchangeError::venue(VenueErrorKind::RateLimited, None, "slow down");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_into_order_state_unknown_keeps_venue_errors() {
        let err = ExchangeError::venue(VenueErrorKind::OrderNotFound, None, "unknown order");
        assert_eq!(err.clone().into_order_state_unknown(), err);
    }

    #[test]
    fn test_not_supported_display() {
        let err = ExchangeError::not_supported("poloniex.com", "market_buy");
        assert!(err.is_not_supported());
        assert_eq!(err.to_string(), "market_buy is not supported on poloniex.com");
    }
}
