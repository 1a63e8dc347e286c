//! Currency pairs and venue symbol rendering

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::currency::Currency;
use crate::enums::ProductType;
use crate::error::{ExchangeError, ExchangeResult};

/// An ordered (base, quote) pair plus the product it trades on
///
/// `base` is the asset bought or sold, `quote` is the asset prices are
/// expressed in. Construction and deserialization reject `base == quote`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPair")]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
    #[serde(default)]
    pub product: ProductType,
}

/// Wire form of [`CurrencyPair`], checked on the way in
#[derive(Deserialize)]
struct RawPair {
    base: Currency,
    quote: Currency,
    #[serde(default)]
    product: ProductType,
}

impl TryFrom<RawPair> for CurrencyPair {
    type Error = ExchangeError;

    fn try_from(raw: RawPair) -> Result<Self, Self::Error> {
        Ok(CurrencyPair::new(raw.base, raw.quote)?.with_product(raw.product))
    }
}

impl CurrencyPair {
    pub const BTC_USDT: CurrencyPair = CurrencyPair::from_static(Currency::BTC, Currency::USDT);
    pub const BTC_USD: CurrencyPair = CurrencyPair::from_static(Currency::BTC, Currency::USD);
    pub const BTC_EUR: CurrencyPair = CurrencyPair::from_static(Currency::BTC, Currency::EUR);
    pub const ETH_USDT: CurrencyPair = CurrencyPair::from_static(Currency::ETH, Currency::USDT);
    pub const ETH_USD: CurrencyPair = CurrencyPair::from_static(Currency::ETH, Currency::USD);
    pub const ETH_BTC: CurrencyPair = CurrencyPair::from_static(Currency::ETH, Currency::BTC);
    pub const LTC_USDT: CurrencyPair = CurrencyPair::from_static(Currency::LTC, Currency::USDT);
    pub const LTC_BTC: CurrencyPair = CurrencyPair::from_static(Currency::LTC, Currency::BTC);
    pub const XRP_USDT: CurrencyPair = CurrencyPair::from_static(Currency::XRP, Currency::USDT);
    pub const EOS_USDT: CurrencyPair = CurrencyPair::from_static(Currency::EOS, Currency::USDT);

    const fn from_static(base: Currency, quote: Currency) -> Self {
        Self {
            base,
            quote,
            product: ProductType::Spot,
        }
    }

    /// Create a spot pair
    pub fn new(base: impl Into<Currency>, quote: impl Into<Currency>) -> ExchangeResult<Self> {
        let base = base.into();
        let quote = quote.into();
        if base == quote {
            return Err(ExchangeError::InvalidPair(format!(
                "base and quote are both {}",
                base
            )));
        }
        Ok(Self {
            base,
            quote,
            product: ProductType::Spot,
        })
    }

    /// Same pair, traded on a different product
    pub fn with_product(mut self, product: ProductType) -> Self {
        self.product = product;
        self
    }

    /// Swap base and quote
    pub fn reverse(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
            product: self.product,
        }
    }

    /// Apply an alias rule to both legs
    ///
    /// Fails when the rule folds both legs onto one currency, as USD to USDT
    /// does for USDT/USD.
    pub fn map_currencies(&self, f: impl Fn(Currency) -> Currency) -> ExchangeResult<Self> {
        Ok(Self::new(f(self.base.clone()), f(self.quote.clone()))?.with_product(self.product))
    }

    /// `BASE{sep}QUOTE` in upper case
    pub fn to_symbol(&self, separator: &'static str) -> String {
        SymbolFormat::upper(separator).render(self)
    }

    /// `base{sep}quote` in lower case
    pub fn to_lower_symbol(&self, separator: &'static str) -> String {
        SymbolFormat::lower(separator).render(self)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = ExchangeError;

    /// Accepts `BTC/USDT`, `BTC_USDT` and `BTC-USDT`, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep = ['/', '_', '-']
            .into_iter()
            .find(|c| s.contains(*c))
            .ok_or_else(|| ExchangeError::InvalidPair(format!("no separator in {:?}", s)))?;
        let mut parts = s.split(sep);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Self::new(base, quote)
            }
            _ => Err(ExchangeError::InvalidPair(s.to_string())),
        }
    }
}

/// Letter case a venue expects in its symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolCase {
    Upper,
    Lower,
}

/// How a venue spells a pair
///
/// Every adapter renders pairs through one of these so the convention lives
/// in a single place per venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolFormat {
    pub separator: &'static str,
    pub case: SymbolCase,
    /// Quote first, as in `USDT_BTC`
    pub reversed: bool,
}

impl SymbolFormat {
    pub const fn upper(separator: &'static str) -> Self {
        Self {
            separator,
            case: SymbolCase::Upper,
            reversed: false,
        }
    }

    pub const fn lower(separator: &'static str) -> Self {
        Self {
            separator,
            case: SymbolCase::Lower,
            reversed: false,
        }
    }

    pub const fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    pub fn render(&self, pair: &CurrencyPair) -> String {
        let (first, second) = if self.reversed {
            (&pair.quote, &pair.base)
        } else {
            (&pair.base, &pair.quote)
        };
        let joined = format!("{}{}{}", first.symbol(), self.separator, second.symbol());
        match self.case {
            SymbolCase::Upper => joined,
            SymbolCase::Lower => joined.to_ascii_lowercase(),
        }
    }

    /// Inverse of [`render`](Self::render) for formats with a separator
    ///
    /// The product type cannot be recovered from a symbol and is left at spot.
    pub fn parse(&self, symbol: &str) -> ExchangeResult<CurrencyPair> {
        if self.separator.is_empty() {
            return Err(ExchangeError::InvalidPair(format!(
                "{:?} has no separator to split on",
                symbol
            )));
        }
        let (first, second) = symbol
            .split_once(self.separator)
            .ok_or_else(|| ExchangeError::InvalidPair(symbol.to_string()))?;
        if first.is_empty() || second.is_empty() || second.contains(self.separator) {
            return Err(ExchangeError::InvalidPair(symbol.to_string()));
        }
        if self.reversed {
            CurrencyPair::new(second, first)
        } else {
            CurrencyPair::new(first, second)
        }
    }

    /// Split a separator-less symbol using a list of known quote assets
    ///
    /// Longer quotes are tried first so `BTCUSDT` resolves to USDT, not USD.
    pub fn parse_with_quotes(&self, symbol: &str, quotes: &[&str]) -> ExchangeResult<CurrencyPair> {
        let upper = symbol.to_ascii_uppercase();
        let mut sorted: Vec<&str> = quotes.to_vec();
        sorted.sort_by_key(|q| std::cmp::Reverse(q.len()));
        for quote in sorted {
            let quote = quote.to_ascii_uppercase();
            let split = if self.reversed {
                upper.strip_prefix(&quote).map(|rest| (rest.to_string(), quote.clone()))
            } else {
                upper.strip_suffix(&quote).map(|rest| (rest.to_string(), quote.clone()))
            };
            if let Some((base, quote)) = split {
                if !base.is_empty() {
                    return CurrencyPair::new(base, quote);
                }
            }
        }
        Err(ExchangeError::InvalidPair(format!(
            "no known quote asset in {:?}",
            symbol
        )))
    }
}
