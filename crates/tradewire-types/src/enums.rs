//! TradeSide, TradeStatus, OrderType, ProductType, and KlinePeriod enums

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order or trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
    BuyMarket,
    SellMarket,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::BuyMarket => "buy_market",
            Self::SellMarket => "sell_market",
        }
    }

    /// True for both limit and market buys
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy | Self::BuyMarket)
    }

    pub fn is_market(&self) -> bool {
        matches!(self, Self::BuyMarket | Self::SellMarket)
    }

    /// Combine a direction with an order type
    pub fn from_parts(is_buy: bool, order_type: OrderType) -> Self {
        match (is_buy, order_type) {
            (true, OrderType::Limit) => Self::Buy,
            (false, OrderType::Limit) => Self::Sell,
            (true, OrderType::Market) => Self::BuyMarket,
            (false, OrderType::Market) => Self::SellMarket,
        }
    }

    /// Returns the opposite direction, keeping the order type
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
            Self::BuyMarket => Self::SellMarket,
            Self::SellMarket => Self::BuyMarket,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an order
///
/// Every venue vocabulary maps onto this closed set. Unknown native values
/// map to [`TradeStatus::Unfinished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    #[default]
    Unfinished,
    PartiallyFilled,
    Filled,
    Canceled,
    CancelPending,
    Failed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unfinished => "unfinished",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::Canceled => "canceled",
            Self::CancelPending => "cancel_pending",
            Self::Failed => "failed",
        }
    }

    /// True once the venue will not fill the order any further
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Failed)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Market => "market",
        }
    }
}

/// Product family a pair trades on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    #[default]
    Spot,
    Margin,
    Swap,
    Futures,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Margin => "margin",
            Self::Swap => "swap",
            Self::Futures => "futures",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candle width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum KlinePeriod {
    #[serde(rename = "1min")]
    Min1,
    #[serde(rename = "3min")]
    Min3,
    #[serde(rename = "5min")]
    Min5,
    #[serde(rename = "15min")]
    Min15,
    #[serde(rename = "30min")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "2h")]
    Hour2,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "6h")]
    Hour6,
    #[serde(rename = "8h")]
    Hour8,
    #[serde(rename = "12h")]
    Hour12,
    #[serde(rename = "1day")]
    Day1,
    #[serde(rename = "3day")]
    Day3,
    #[serde(rename = "1week")]
    Week1,
    #[serde(rename = "1month")]
    Month1,
}

impl KlinePeriod {
    pub const ALL: [KlinePeriod; 15] = [
        Self::Min1,
        Self::Min3,
        Self::Min5,
        Self::Min15,
        Self::Min30,
        Self::Hour1,
        Self::Hour2,
        Self::Hour4,
        Self::Hour6,
        Self::Hour8,
        Self::Hour12,
        Self::Day1,
        Self::Day3,
        Self::Week1,
        Self::Month1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min1 => "1min",
            Self::Min3 => "3min",
            Self::Min5 => "5min",
            Self::Min15 => "15min",
            Self::Min30 => "30min",
            Self::Hour1 => "1h",
            Self::Hour2 => "2h",
            Self::Hour4 => "4h",
            Self::Hour6 => "6h",
            Self::Hour8 => "8h",
            Self::Hour12 => "12h",
            Self::Day1 => "1day",
            Self::Day3 => "3day",
            Self::Week1 => "1week",
            Self::Month1 => "1month",
        }
    }

    /// Width in seconds; a month counts as 30 days
    pub fn seconds(&self) -> u64 {
        match self {
            Self::Min1 => 60,
            Self::Min3 => 180,
            Self::Min5 => 300,
            Self::Min15 => 900,
            Self::Min30 => 1_800,
            Self::Hour1 => 3_600,
            Self::Hour2 => 7_200,
            Self::Hour4 => 14_400,
            Self::Hour6 => 21_600,
            Self::Hour8 => 28_800,
            Self::Hour12 => 43_200,
            Self::Day1 => 86_400,
            Self::Day3 => 259_200,
            Self::Week1 => 604_800,
            Self::Month1 => 2_592_000,
        }
    }

    pub fn minutes(&self) -> u64 {
        self.seconds() / 60
    }
}

impl fmt::Display for KlinePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KlinePeriod {
    type Err = crate::error::ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                crate::error::ExchangeError::InvalidParameter(format!("unknown kline period {}", s))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parts() {
        assert_eq!(TradeSide::from_parts(true, OrderType::Market), TradeSide::BuyMarket);
        assert_eq!(TradeSide::from_parts(false, OrderType::Limit), TradeSide::Sell);
        assert!(TradeSide::BuyMarket.is_buy());
        assert!(!TradeSide::SellMarket.is_buy());
        assert_eq!(TradeSide::Buy.opposite(), TradeSide::Sell);
    }

    #[test]
    fn test_status_default_is_unfinished() {
        assert_eq!(TradeStatus::default(), TradeStatus::Unfinished);
        assert!(TradeStatus::Canceled.is_final());
        assert!(!TradeStatus::CancelPending.is_final());
    }

    #[test]
    fn test_period_round_trip() {
        for period in KlinePeriod::ALL {
            assert_eq!(period.as_str().parse::<KlinePeriod>().unwrap(), period);
        }
        assert!("7min".parse::<KlinePeriod>().is_err());
        assert_eq!(KlinePeriod::Hour4.minutes(), 240);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&TradeSide::BuyMarket).unwrap(), "\"buy_market\"");
        assert_eq!(serde_json::to_string(&KlinePeriod::Day1).unwrap(), "\"1day\"");
        let p: ProductType = serde_json::from_str("\"swap\"").unwrap();
        assert_eq!(p, ProductType::Swap);
    }
}
