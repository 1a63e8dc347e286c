//! Canonical types shared by every tradewire venue adapter
//!
//! This crate holds the venue-independent model that all adapters translate
//! their wire payloads into. It has minimal dependencies and can be used
//! independently of any transport.
//!
//! # Key Types
//!
//! - [`Currency`], [`CurrencyPair`], [`SymbolFormat`] - Assets and venue symbol rendering
//! - [`Order`], [`TradeStatus`], [`TradeSide`] - Order state
//! - [`Ticker`], [`Depth`], [`Kline`], [`Trade`] - Market data
//! - [`Account`], [`SubAccount`] - Balance snapshots
//! - [`ExchangeError`], [`VenueErrorKind`] - Cross-venue error taxonomy
//! - [`coerce`] - Lossy and strict numeric coercion from heterogeneous JSON

pub mod account;
pub mod coerce;
pub mod currency;
pub mod enums;
pub mod error;
pub mod error_kind;
pub mod market;
pub mod order;
pub mod pair;

// Re-export commonly used types
pub use account::*;
pub use currency::*;
pub use enums::*;
pub use error::*;
pub use error_kind::*;
pub use market::*;
pub use order::*;
pub use pair::*;

// Re-export rust_decimal for users
pub use rust_decimal::Decimal;
