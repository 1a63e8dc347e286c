//! One module per venue
//!
//! Each module exposes `VENUE`, `BASE_URL` and `SYMBOL` next to its adapter.

pub mod atop;
pub mod binance;
pub mod bitfinex;
pub mod bitstamp;
pub mod bittrex;
pub mod coinbase;
pub mod kraken;
pub mod kucoin;
pub mod okex;
pub mod poloniex;

pub use atop::Atop;
pub use binance::Binance;
pub use bitfinex::Bitfinex;
pub use bitstamp::Bitstamp;
pub use bittrex::Bittrex;
pub use coinbase::Coinbase;
pub use kraken::Kraken;
pub use kucoin::KuCoin;
pub use okex::{OKEx, OKExMargin, OKExSpot, OKExSwap};
pub use poloniex::Poloniex;
