//! Market data: tickers, order books, candles, and the public trade tape

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::TradeSide;
use crate::pair::CurrencyPair;

/// 24h ticker snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub pair: CurrencyPair,
    pub last: Decimal,
    /// Best bid
    pub buy: Decimal,
    /// Best ask
    pub sell: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub vol: Decimal,
    /// Unix milliseconds; venue time when reported, else capture time
    pub timestamp: i64,
}

impl Ticker {
    /// Mid price between best bid and best ask
    pub fn mid(&self) -> Option<Decimal> {
        if self.buy.is_zero() || self.sell.is_zero() {
            return None;
        }
        Some((self.buy + self.sell) / Decimal::TWO)
    }
}

/// A single price level in the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthRecord {
    pub price: Decimal,
    pub amount: Decimal,
}

impl DepthRecord {
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }
}

/// Order book snapshot
///
/// Bids are sorted by price descending and asks ascending, so index 0 is the
/// top of the book on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depth {
    pub pair: CurrencyPair,
    pub bids: Vec<DepthRecord>,
    pub asks: Vec<DepthRecord>,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl Depth {
    /// Sort both sides, then truncate each to `size` records
    ///
    /// Venues return sides in either order and sometimes pre-truncate, so
    /// ordering is never assumed. A `size` of zero keeps every record.
    pub fn from_unsorted(
        pair: CurrencyPair,
        mut bids: Vec<DepthRecord>,
        mut asks: Vec<DepthRecord>,
        size: usize,
        timestamp: i64,
    ) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        if size > 0 {
            bids.truncate(size);
            asks.truncate(size);
        }
        Self {
            pair,
            bids,
            asks,
            timestamp,
        }
    }

    pub fn best_bid(&self) -> Option<&DepthRecord> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&DepthRecord> {
        self.asks.first()
    }

    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }

    /// True when bids are non-increasing and asks non-decreasing
    pub fn is_sorted(&self) -> bool {
        self.bids.windows(2).all(|w| w[0].price >= w[1].price)
            && self.asks.windows(2).all(|w| w[0].price <= w[1].price)
    }
}

/// OHLCV candle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kline {
    pub pair: CurrencyPair,
    /// Bucket open time in Unix seconds
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub vol: Decimal,
}

/// Public trade tape entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub pair: CurrencyPair,
    pub tid: String,
    /// Taker (aggressor) side
    pub side: TradeSide,
    pub price: Decimal,
    pub amount: Decimal,
    /// Unix milliseconds
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rec(price: Decimal, amount: Decimal) -> DepthRecord {
        DepthRecord::new(price, amount)
    }

    #[test]
    fn test_from_unsorted_orders_both_sides() {
        let bids = vec![rec(dec!(99), dec!(1)), rec(dec!(100), dec!(2)), rec(dec!(98), dec!(3))];
        let asks = vec![rec(dec!(103), dec!(1)), rec(dec!(101), dec!(2)), rec(dec!(102), dec!(3))];
        let depth = Depth::from_unsorted(CurrencyPair::BTC_USDT, bids, asks, 0, 1);

        assert!(depth.is_sorted());
        assert_eq!(depth.best_bid().unwrap().price, dec!(100));
        assert_eq!(depth.best_ask().unwrap().price, dec!(101));
        assert_eq!(depth.spread(), Some(dec!(1)));
    }

    #[test]
    fn test_truncates_after_sorting() {
        let asks = vec![rec(dec!(105), dec!(1)), rec(dec!(101), dec!(1)), rec(dec!(103), dec!(1))];
        let depth = Depth::from_unsorted(CurrencyPair::BTC_USDT, vec![], asks, 2, 1);
        let prices: Vec<_> = depth.asks.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![dec!(101), dec!(103)]);
    }

    #[test]
    fn test_ticker_mid() {
        let t = Ticker {
            pair: CurrencyPair::BTC_USDT,
            last: dec!(100),
            buy: dec!(99),
            sell: dec!(101),
            high: dec!(110),
            low: dec!(90),
            vol: dec!(5),
            timestamp: 0,
        };
        assert_eq!(t.mid(), Some(dec!(100)));
    }
}
