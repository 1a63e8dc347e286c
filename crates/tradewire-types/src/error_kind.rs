//! Cross-venue classification of venue error envelopes
//!
//! Each venue reports business errors with its own codes and wording. The
//! adapters translate them into a small set of kinds with an [`ErrorTable`]:
//! exact code matches first, then the venue's own substrings, then a generic
//! set of substrings most venues share. Anything unmatched is
//! [`VenueErrorKind::Other`] and keeps its raw message.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ExchangeError;

/// Cross-venue error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueErrorKind {
    OrderNotFound,
    RateLimited,
    InsufficientBalance,
    Other,
}

impl VenueErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderNotFound => "order not found",
            Self::RateLimited => "rate limited",
            Self::InsufficientBalance => "insufficient balance",
            Self::Other => "venue error",
        }
    }

    /// Only rate limits clear up by waiting
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

impl fmt::Display for VenueErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substrings shared by most venues, matched case-insensitively
const GENERIC_PATTERNS: &[(&str, VenueErrorKind)] = &[
    ("insufficient", VenueErrorKind::InsufficientBalance),
    ("not enough", VenueErrorKind::InsufficientBalance),
    ("rate limit", VenueErrorKind::RateLimited),
    ("too many request", VenueErrorKind::RateLimited),
    ("too much request", VenueErrorKind::RateLimited),
    ("order not found", VenueErrorKind::OrderNotFound),
    ("order does not exist", VenueErrorKind::OrderNotFound),
    ("order not exist", VenueErrorKind::OrderNotFound),
    ("unknown order", VenueErrorKind::OrderNotFound),
    ("no such order", VenueErrorKind::OrderNotFound),
];

/// Per-venue classification table
#[derive(Debug, Clone, Copy)]
pub struct ErrorTable {
    /// Exact venue codes
    pub codes: &'static [(&'static str, VenueErrorKind)],
    /// Case-insensitive substrings checked before the generic ones
    pub patterns: &'static [(&'static str, VenueErrorKind)],
}

impl ErrorTable {
    pub const GENERIC: ErrorTable = ErrorTable {
        codes: &[],
        patterns: &[],
    };

    pub fn classify(&self, code: Option<&str>, message: &str) -> VenueErrorKind {
        if let Some(code) = code {
            if let Some((_, kind)) = self.codes.iter().find(|(c, _)| *c == code) {
                return *kind;
            }
        }

        let lower = message.to_ascii_lowercase();
        self.patterns
            .iter()
            .chain(GENERIC_PATTERNS.iter())
            .find(|(pattern, _)| lower.contains(&pattern.to_ascii_lowercase()))
            .map(|(_, kind)| *kind)
            .unwrap_or(VenueErrorKind::Other)
    }

    /// Build the classified [`ExchangeError::Venue`]
    pub fn error(&self, code: Option<String>, message: impl Into<String>) -> ExchangeError {
        let message = message.into();
        let kind = self.classify(code.as_deref(), &message);
        ExchangeError::Venue {
            kind,
            code,
            message,
        }
    }
}
