//! Venue identifiers

use std::fmt;
use std::str::FromStr;

use tradewire_types::ExchangeError;

/// Every venue with an adapter in this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Venue {
    Binance,
    Kraken,
    OKEx,
    Bitfinex,
    Bitstamp,
    Poloniex,
    Atop,
    KuCoin,
    /// Coinbase Pro, formerly GDAX
    Coinbase,
    Bittrex,
}

impl Venue {
    pub const ALL: [Venue; 10] = [
        Venue::Binance,
        Venue::Kraken,
        Venue::OKEx,
        Venue::Bitfinex,
        Venue::Bitstamp,
        Venue::Poloniex,
        Venue::Atop,
        Venue::KuCoin,
        Venue::Coinbase,
        Venue::Bittrex,
    ];

    /// Stable name used in accounts, errors and logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binance => "binance.com",
            Self::Kraken => "kraken.com",
            Self::OKEx => "okex.com",
            Self::Bitfinex => "bitfinex.com",
            Self::Bitstamp => "bitstamp.net",
            Self::Poloniex => "poloniex.com",
            Self::Atop => "a.top",
            Self::KuCoin => "kucoin.com",
            Self::Coinbase => "coinbase.com",
            Self::Bittrex => "bittrex.com",
        }
    }

    /// Prefix for [`Credentials::from_env`](tradewire_auth::Credentials::from_env)
    pub const fn env_prefix(&self) -> &'static str {
        match self {
            Self::Binance => "BINANCE",
            Self::Kraken => "KRAKEN",
            Self::OKEx => "OKEX",
            Self::Bitfinex => "BITFINEX",
            Self::Bitstamp => "BITSTAMP",
            Self::Poloniex => "POLONIEX",
            Self::Atop => "ATOP",
            Self::KuCoin => "KUCOIN",
            Self::Coinbase => "COINBASE",
            Self::Bittrex => "BITTREX",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Venue {
    type Err = ExchangeError;

    /// Accepts the stable name, the bare brand, or `gdax`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "gdax.com" || lower == "gdax" {
            return Ok(Self::Coinbase);
        }
        Self::ALL
            .into_iter()
            .find(|v| {
                let name = v.name();
                lower == name || name.split('.').next() == Some(lower.as_str())
            })
            .ok_or_else(|| ExchangeError::InvalidParameter(format!("unknown venue {:?}", s)))
    }
}
