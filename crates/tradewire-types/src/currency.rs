//! Currencies and the alias rules venues disagree on

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A tradable asset
///
/// The symbol is always upper case. Equality and hashing look at the symbol
/// only, so `Currency::new("btc")` equals [`Currency::BTC`].
#[derive(Clone)]
pub struct Currency {
    symbol: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl Currency {
    pub const BTC: Currency = Currency::from_static("BTC", "Bitcoin");
    pub const BCH: Currency = Currency::from_static("BCH", "Bitcoin Cash");
    pub const BCC: Currency = Currency::from_static("BCC", "Bitcoin Cash");
    pub const XBT: Currency = Currency::from_static("XBT", "Bitcoin");
    pub const ETH: Currency = Currency::from_static("ETH", "Ethereum");
    pub const ETC: Currency = Currency::from_static("ETC", "Ethereum Classic");
    pub const LTC: Currency = Currency::from_static("LTC", "Litecoin");
    pub const XRP: Currency = Currency::from_static("XRP", "Ripple");
    pub const EOS: Currency = Currency::from_static("EOS", "EOS");
    pub const DASH: Currency = Currency::from_static("DASH", "Dash");
    pub const DOGE: Currency = Currency::from_static("DOGE", "Dogecoin");
    pub const QTUM: Currency = Currency::from_static("QTUM", "Qtum");
    pub const IOTA: Currency = Currency::from_static("IOTA", "IOTA");
    pub const USDT: Currency = Currency::from_static("USDT", "Tether");
    pub const USD: Currency = Currency::from_static("USD", "US Dollar");
    pub const EUR: Currency = Currency::from_static("EUR", "Euro");
    pub const CNY: Currency = Currency::from_static("CNY", "Chinese Yuan");

    /// Build a currency from static, already upper-cased strings
    pub const fn from_static(symbol: &'static str, name: &'static str) -> Self {
        Self {
            symbol: Cow::Borrowed(symbol),
            name: Cow::Borrowed(name),
        }
    }

    /// Create a currency from any symbol; the symbol is upper-cased
    ///
    /// Well-known symbols pick up their display name.
    pub fn new(symbol: impl AsRef<str>) -> Self {
        let symbol = symbol.as_ref().trim().to_ascii_uppercase();
        match Self::known(&symbol) {
            Some(known) => known,
            None => Self {
                name: Cow::Owned(symbol.clone()),
                symbol: Cow::Owned(symbol),
            },
        }
    }

    fn known(symbol: &str) -> Option<Self> {
        const KNOWN: &[Currency] = &[
            Currency::BTC,
            Currency::BCH,
            Currency::BCC,
            Currency::XBT,
            Currency::ETH,
            Currency::ETC,
            Currency::LTC,
            Currency::XRP,
            Currency::EOS,
            Currency::DASH,
            Currency::DOGE,
            Currency::QTUM,
            Currency::IOTA,
            Currency::USDT,
            Currency::USD,
            Currency::EUR,
            Currency::CNY,
        ];
        KNOWN.iter().find(|c| c.symbol == symbol).cloned()
    }

    /// Upper-case symbol, e.g. `"BTC"`
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Display name, e.g. `"Bitcoin"`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-case symbol, for venues that render pairs in lower case
    pub fn lower(&self) -> String {
        self.symbol.to_ascii_lowercase()
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Currency {}

impl Hash for Currency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl PartialOrd for Currency {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Currency {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.symbol.cmp(&other.symbol)
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self.symbol)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl FromStr for Currency {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.symbol)
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(s))
    }
}

// ============================================================================
// Alias rules
// ============================================================================

/// BCC was Bitcoin Cash's ticker on some venues before it became BCH
pub fn adapt_bcc_to_bch(currency: Currency) -> Currency {
    if currency == Currency::BCC {
        Currency::BCH
    } else {
        currency
    }
}

/// Kraken and a few others name bitcoin XBT
pub fn adapt_xbt_to_btc(currency: Currency) -> Currency {
    if currency == Currency::XBT {
        Currency::BTC
    } else {
        currency
    }
}

pub fn adapt_btc_to_xbt(currency: Currency) -> Currency {
    if currency == Currency::BTC {
        Currency::XBT
    } else {
        currency
    }
}

pub fn adapt_usdt_to_usd(currency: Currency) -> Currency {
    if currency == Currency::USDT {
        Currency::USD
    } else {
        currency
    }
}

pub fn adapt_usd_to_usdt(currency: Currency) -> Currency {
    if currency == Currency::USD {
        Currency::USDT
    } else {
        currency
    }
}

/// Bitfinex v1 uses three-letter tickers for a handful of assets
pub fn adapt_to_bitfinex_ticker(currency: Currency) -> Currency {
    match currency.symbol() {
        "DASH" => Currency::new("DSH"),
        "QTUM" => Currency::new("QTM"),
        "IOTA" => Currency::new("IOT"),
        "USDT" => Currency::USD,
        _ => currency,
    }
}

/// Inverse of [`adapt_to_bitfinex_ticker`] for symbols reported back by the venue
pub fn adapt_from_bitfinex_ticker(currency: Currency) -> Currency {
    match currency.symbol() {
        "DSH" => Currency::DASH,
        "QTM" => Currency::QTUM,
        "IOT" => Currency::IOTA,
        _ => currency,
    }
}

/// Kraken's legacy X/Z prefixed asset codes, e.g. `XXBT`, `ZUSD`, `XXDG`
pub fn adapt_kraken_asset(code: &str) -> Currency {
    let code = code.trim().to_ascii_uppercase();
    let stripped = if code.len() == 4 && (code.starts_with('X') || code.starts_with('Z')) {
        &code[1..]
    } else {
        code.as_str()
    };
    match stripped {
        "XBT" => Currency::BTC,
        "XDG" => Currency::DOGE,
        other => Currency::new(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_symbol_is_upper_cased() {
        let c = Currency::new("btc");
        assert_eq!(c.symbol(), "BTC");
        assert_eq!(c.name(), "Bitcoin");
        assert_eq!(c, Currency::BTC);
    }

    #[test]
    fn test_unknown_currency_uses_symbol_as_name() {
        let c = Currency::new("zrx");
        assert_eq!(c.symbol(), "ZRX");
        assert_eq!(c.name(), "ZRX");
    }

    #[test]
    fn test_from_owned_string() {
        let c: Currency = String::from("usdt").into();
        assert_eq!(c, Currency::USDT);
        assert_eq!(c.name(), "Tether");
    }

    #[test]
    fn test_equality_ignores_name() {
        let a = Currency::from_static("BTC", "Bitcoin");
        let b = Currency::from_static("BTC", "Something else");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(adapt_bcc_to_bch(Currency::BCC), Currency::BCH);
        assert_eq!(adapt_bcc_to_bch(Currency::ETH), Currency::ETH);
        assert_eq!(adapt_xbt_to_btc(Currency::XBT), Currency::BTC);
        assert_eq!(adapt_btc_to_xbt(Currency::BTC), Currency::XBT);
        assert_eq!(adapt_usdt_to_usd(Currency::USDT), Currency::USD);
        assert_eq!(adapt_usd_to_usdt(Currency::USD), Currency::USDT);
    }

    #[test]
    fn test_bitfinex_aliases_invert() {
        for c in [Currency::DASH, Currency::QTUM, Currency::IOTA, Currency::BTC] {
            let venue = adapt_to_bitfinex_ticker(c.clone());
            assert_eq!(adapt_from_bitfinex_ticker(venue), c);
        }
    }

    #[test]
    fn test_kraken_asset_codes() {
        assert_eq!(adapt_kraken_asset("XXBT"), Currency::BTC);
        assert_eq!(adapt_kraken_asset("ZUSD"), Currency::USD);
        assert_eq!(adapt_kraken_asset("XETH"), Currency::ETH);
        assert_eq!(adapt_kraken_asset("XXDG"), Currency::DOGE);
        assert_eq!(adapt_kraken_asset("DOT"), Currency::new("DOT"));
        assert_eq!(adapt_kraken_asset("USDT"), Currency::USDT);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&Currency::ETH).unwrap();
        assert_eq!(json, "\"ETH\"");
        let back: Currency = serde_json::from_str("\"eth\"").unwrap();
        assert_eq!(back, Currency::ETH);
    }
}
