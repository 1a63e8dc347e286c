//! Re-exports for convenience
//!
//! ```
//! use tradewire_venues::prelude::*;
//! ```

pub use crate::config::VenueConfig;
pub use crate::exchange::Exchange;
pub use crate::registry::{connect, connect_all};
pub use crate::venue::Venue;
pub use crate::venues::{
    Atop, Binance, Bitfinex, Bitstamp, Bittrex, Coinbase, Kraken, KuCoin, OKEx, OKExMargin, OKExSpot, OKExSwap,
    Poloniex,
};

pub use tradewire_auth::Credentials;
pub use tradewire_http::HttpConfig;
pub use tradewire_types::{
    Account, Currency, CurrencyPair, Depth, DepthRecord, ExchangeError, ExchangeResult, Kline, KlinePeriod, Order,
    Page, PageRequest, ProductType, SubAccount, Ticker, Trade, TradeSide, TradeStatus, VenueErrorKind,
};

pub use rust_decimal::Decimal;
