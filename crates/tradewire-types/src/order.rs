//! Canonical order

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{TradeSide, TradeStatus};
use crate::error::{ExchangeError, ExchangeResult};
use crate::pair::CurrencyPair;

/// An order as reported by a venue
///
/// Fill fields go through [`Order::with_fill`] or [`Order::with_quote_fill`],
/// which keep `0 <= deal_amount <= amount` and leave `avg_price` empty until
/// something has filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Venue order id; numeric ids are rendered as strings
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub pair: CurrencyPair,
    pub side: TradeSide,
    /// Limit price; zero for market orders the venue reports without one
    pub price: Decimal,
    /// Requested amount in base units
    pub amount: Decimal,
    /// Executed amount in base units
    pub deal_amount: Decimal,
    pub avg_price: Option<Decimal>,
    pub fee: Decimal,
    pub status: TradeStatus,
    /// Unix milliseconds
    pub created_at: Option<i64>,
    /// Unix milliseconds
    pub finished_at: Option<i64>,
}

impl Order {
    /// A fresh, unfilled order
    pub fn new(
        order_id: impl Into<String>,
        pair: CurrencyPair,
        side: TradeSide,
        price: Decimal,
        amount: Decimal,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            client_order_id: None,
            pair,
            side,
            price,
            amount,
            deal_amount: Decimal::ZERO,
            avg_price: None,
            fee: Decimal::ZERO,
            status: TradeStatus::Unfinished,
            created_at: None,
            finished_at: None,
        }
    }

    /// Record the executed amount and the venue's average price
    ///
    /// A zero `amount` means the venue did not report one (quote-sized
    /// market buys); it is then taken to be the executed amount.
    pub fn with_fill(mut self, deal_amount: Decimal, avg_price: Option<Decimal>) -> ExchangeResult<Self> {
        if deal_amount < Decimal::ZERO {
            return Err(ExchangeError::normalization(
                "deal_amount",
                format!("negative executed amount {} on order {}", deal_amount, self.order_id),
            ));
        }
        if self.amount.is_zero() {
            self.amount = deal_amount;
        }
        if deal_amount > self.amount {
            return Err(ExchangeError::normalization(
                "deal_amount",
                format!(
                    "executed {} exceeds requested {} on order {}",
                    deal_amount, self.amount, self.order_id
                ),
            ));
        }
        self.deal_amount = deal_amount;
        self.avg_price = if deal_amount > Decimal::ZERO {
            avg_price.filter(|p| *p > Decimal::ZERO)
        } else {
            None
        };
        Ok(self)
    }

    /// Record the executed amount and derive the average from quote spent
    pub fn with_quote_fill(self, deal_amount: Decimal, quote_filled: Decimal) -> ExchangeResult<Self> {
        let avg = average_price(quote_filled, deal_amount);
        self.with_fill(deal_amount, avg)
    }

    pub fn with_status(mut self, status: TradeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        let id = client_order_id.into();
        self.client_order_id = if id.is_empty() { None } else { Some(id) };
        self
    }

    pub fn with_times(mut self, created_at: Option<i64>, finished_at: Option<i64>) -> Self {
        self.created_at = created_at;
        self.finished_at = finished_at;
        self
    }

    /// Amount still open on the book
    pub fn remaining(&self) -> Decimal {
        self.amount - self.deal_amount
    }
}

/// `quote / base`, or `None` when nothing has filled
pub fn average_price(quote_filled: Decimal, deal_amount: Decimal) -> Option<Decimal> {
    if deal_amount > Decimal::ZERO {
        quote_filled.checked_div(deal_amount)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(amount: Decimal) -> Order {
        Order::new("42", CurrencyPair::BTC_USDT, TradeSide::Buy, dec!(100), amount)
    }

    #[test]
    fn test_new_order_is_unfilled() {
        let o = order(dec!(2));
        assert_eq!(o.deal_amount, Decimal::ZERO);
        assert_eq!(o.avg_price, None);
        assert_eq!(o.status, TradeStatus::Unfinished);
        assert_eq!(o.remaining(), dec!(2));
    }

    #[test]
    fn test_zero_fill_has_no_average() {
        let o = order(dec!(2)).with_quote_fill(Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(o.avg_price, None);

        let o = order(dec!(2)).with_fill(Decimal::ZERO, Some(dec!(99))).unwrap();
        assert_eq!(o.avg_price, None);
    }

    #[test]
    fn test_quote_fill_average() {
        let o = order(dec!(2)).with_quote_fill(dec!(1.5), dec!(150)).unwrap();
        assert_eq!(o.deal_amount, dec!(1.5));
        assert_eq!(o.avg_price, Some(dec!(100)));
    }

    #[test]
    fn test_overfill_is_rejected() {
        let err = order(dec!(1)).with_fill(dec!(1.1), None).unwrap_err();
        assert!(matches!(err, ExchangeError::Normalization { .. }));
    }

    #[test]
    fn test_negative_fill_is_rejected() {
        assert!(order(dec!(1)).with_fill(dec!(-0.1), None).is_err());
    }

    #[test]
    fn test_unknown_amount_takes_fill() {
        let o = order(Decimal::ZERO).with_fill(dec!(0.3), Some(dec!(101))).unwrap();
        assert_eq!(o.amount, dec!(0.3));
        assert_eq!(o.deal_amount, dec!(0.3));
    }

    #[test]
    fn test_empty_client_id_is_none() {
        assert_eq!(order(dec!(1)).with_client_order_id("").client_order_id, None);
        assert_eq!(
            order(dec!(1)).with_client_order_id("abc").client_order_id.as_deref(),
            Some("abc")
        );
    }
}
