//! The capability contract every venue adapter satisfies

use async_trait::async_trait;
use rust_decimal::Decimal;
use tradewire_types::{
    Account, CurrencyPair, Depth, ExchangeError, ExchangeResult, Kline, KlinePeriod, Order, Page,
    PageRequest, Ticker, Trade,
};

/// Cross-venue trading and market-data operations
///
/// Every call is one sequential unit: build the request, sign it when
/// private, perform a single network exchange, normalize the response.
/// Nothing is retried. Operations a venue does not offer return
/// [`ExchangeError::NotSupported`] through the default implementations.
///
/// # Amounts
///
/// `amount` is always in base units. `price` is in quote units and is
/// ignored by market orders except on venues that size market buys in
/// quote, where the adapter sends `amount * price`.
///
/// # Order placement
///
/// Placement and cancellation are not idempotent. A transport failure on
/// those calls comes back with `order_state_unknown` set; reconcile with
/// [`get_order`](Self::get_order) or [`get_open_orders`](Self::get_open_orders)
/// before trying again.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Stable venue name, e.g. `binance.com`
    fn venue(&self) -> &'static str;

    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let _ = pair;
        Err(ExchangeError::not_supported(self.venue(), "get_ticker"))
    }

    /// Order book with at most `size` levels per side
    ///
    /// The request is rounded up to the venue's next supported depth and the
    /// sorted result truncated back to `size`.
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let _ = (size, pair);
        Err(ExchangeError::not_supported(self.venue(), "get_depth"))
    }

    /// Candles in ascending time order, at most `size` of them
    ///
    /// `since` is a Unix millisecond lower bound where the venue accepts one.
    async fn get_klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: usize,
        since: Option<i64>,
    ) -> ExchangeResult<Vec<Kline>> {
        let _ = (pair, period, size, since);
        Err(ExchangeError::not_supported(self.venue(), "get_klines"))
    }

    /// Public trade tape
    ///
    /// `since` is a venue cursor: a trade id on Binance, Unix milliseconds
    /// everywhere else.
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let _ = (pair, since);
        Err(ExchangeError::not_supported(self.venue(), "get_trades"))
    }

    async fn limit_buy(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let _ = (amount, price, pair);
        Err(ExchangeError::not_supported(self.venue(), "limit_buy"))
    }

    async fn limit_sell(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let _ = (amount, price, pair);
        Err(ExchangeError::not_supported(self.venue(), "limit_sell"))
    }

    async fn market_buy(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let _ = (amount, price, pair);
        Err(ExchangeError::not_supported(self.venue(), "market_buy"))
    }

    async fn market_sell(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let _ = (amount, price, pair);
        Err(ExchangeError::not_supported(self.venue(), "market_sell"))
    }

    /// Returns true once the venue has accepted the cancellation
    async fn cancel_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<bool> {
        let _ = (order_id, pair);
        Err(ExchangeError::not_supported(self.venue(), "cancel_order"))
    }

    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let _ = (order_id, pair);
        Err(ExchangeError::not_supported(self.venue(), "get_order"))
    }

    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        let _ = pair;
        Err(ExchangeError::not_supported(self.venue(), "get_open_orders"))
    }

    /// Finished orders, newest first where the venue orders them
    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page: Option<PageRequest>,
    ) -> ExchangeResult<Page<Order>> {
        let _ = (pair, page);
        Err(ExchangeError::not_supported(self.venue(), "get_order_history"))
    }

    async fn get_account(&self) -> ExchangeResult<Account> {
        Err(ExchangeError::not_supported(self.venue(), "get_account"))
    }
}
