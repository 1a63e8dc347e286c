//! OKEx v3 across products
//!
//! [`OKEx`] routes each canonical call by `pair.product` to the spot, margin
//! or swap adapter. The three share one [`RestContext`], so they sign with
//! the same credentials and agree on the clock offset and nonce sequence.
//!
//! - Symbols: `BTC-USDT`, swaps `BTC-USDT-SWAP`
//! - Signing: base64 HMAC-SHA256 over `timestamp + METHOD + path + body`, `OK-ACCESS-*` headers
//! - Errors: `{"code": 30008, ...}` or `{"error_code": "33014", ...}`

mod common;
mod margin;
mod spot;
mod swap;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::instrument;
use tradewire_types::{
    Account, CurrencyPair, Depth, ExchangeError, ExchangeResult, Kline, KlinePeriod, Order, Page, PageRequest,
    ProductType, Ticker, Trade,
};

pub use common::{BASE_URL, SYMBOL, VENUE};
pub use margin::OKExMargin;
pub use spot::OKExSpot;
pub use swap::{instrument_id as swap_instrument_id, OKExSwap};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;

/// OKEx facade over spot, margin and swap
#[derive(Debug)]
pub struct OKEx {
    ctx: Arc<RestContext>,
    spot: OKExSpot,
    margin: OKExMargin,
    swap: OKExSwap,
}

impl OKEx {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        let ctx = Arc::new(RestContext::new(VENUE, BASE_URL, config)?);
        Ok(Self {
            spot: OKExSpot::with_context(ctx.clone()),
            margin: OKExMargin::with_context(ctx.clone()),
            swap: OKExSwap::with_context(ctx.clone()),
            ctx,
        })
    }

    /// Build and align the shared clock with the server
    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        let okex = Self::new(config)?;
        okex.ctx.sync_clock(common::server_time(&okex.ctx).await);
        Ok(okex)
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    pub fn spot(&self) -> &OKExSpot {
        &self.spot
    }

    /// Margin adapter, with `borrow`, `repay` and `get_margin_account`
    pub fn margin(&self) -> &OKExMargin {
        &self.margin
    }

    pub fn swap(&self) -> &OKExSwap {
        &self.swap
    }

    fn route(&self, pair: &CurrencyPair, operation: &'static str) -> ExchangeResult<&dyn Exchange> {
        match pair.product {
            ProductType::Spot => Ok(&self.spot),
            ProductType::Margin => Ok(&self.margin),
            ProductType::Swap => Ok(&self.swap),
            ProductType::Futures => Err(ExchangeError::not_supported(VENUE, operation)),
        }
    }
}

#[async_trait]
impl Exchange for OKEx {
    fn venue(&self) -> &'static str {
        VENUE
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        self.route(pair, "get_ticker")?.get_ticker(pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        self.route(pair, "get_depth")?.get_depth(size, pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: usize,
        since: Option<i64>,
    ) -> ExchangeResult<Vec<Kline>> {
        self.route(pair, "get_klines")?
            .get_klines(pair, period, size, since)
            .await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        self.route(pair, "get_trades")?.get_trades(pair, since).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn limit_buy(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.route(pair, "limit_buy")?.limit_buy(amount, price, pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn limit_sell(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.route(pair, "limit_sell")?.limit_sell(amount, price, pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn market_buy(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.route(pair, "market_buy")?.market_buy(amount, price, pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn market_sell(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.route(pair, "market_sell")?.market_sell(amount, price, pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn cancel_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<bool> {
        self.route(pair, "cancel_order")?.cancel_order(order_id, pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.route(pair, "get_order")?.get_order(order_id, pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        self.route(pair, "get_open_orders")?.get_open_orders(pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page: Option<PageRequest>,
    ) -> ExchangeResult<Page<Order>> {
        self.route(pair, "get_order_history")?
            .get_order_history(pair, page)
            .await
    }

    /// Spot balances
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        self.spot.get_account().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tradewire_auth::{Credentials, FixedClock};
    use tradewire_http::MockHttpClient;

    const NOW: i64 = 1_700_000_000_000;

    fn config(mock: Arc<MockHttpClient>) -> VenueConfig {
        VenueConfig::new()
            .with_http_client(mock)
            .with_clock(Arc::new(FixedClock::new(NOW)))
            .with_credentials(Credentials::new("key", "secret").with_passphrase("phrase"))
    }

    fn ticker_body() -> String {
        json!({"last": "1", "best_bid": "1", "best_ask": "1", "high_24h": "1", "low_24h": "1", "volume_24h": "1"})
            .to_string()
    }

    #[tokio::test]
    async fn test_routes_by_product() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_oks([ticker_body(), ticker_body(), ticker_body()]);
        let okex = OKEx::new(config(mock.clone())).unwrap();

        okex.get_ticker(&CurrencyPair::BTC_USDT).await.unwrap();
        okex.get_ticker(&CurrencyPair::BTC_USDT.with_product(ProductType::Margin))
            .await
            .unwrap();
        okex.get_ticker(&CurrencyPair::BTC_USDT.with_product(ProductType::Swap))
            .await
            .unwrap();

        let urls: Vec<String> = mock.requests().into_iter().map(|r| r.url).collect();
        assert!(urls[0].ends_with("/api/spot/v3/instruments/BTC-USDT/ticker"));
        assert!(urls[1].ends_with("/api/spot/v3/instruments/BTC-USDT/ticker"));
        assert!(urls[2].ends_with("/api/swap/v3/instruments/BTC-USDT-SWAP/ticker"));
    }

    #[tokio::test]
    async fn test_futures_not_supported() {
        let mock = Arc::new(MockHttpClient::new());
        let okex = OKEx::new(config(mock.clone())).unwrap();
        let futures = CurrencyPair::BTC_USD.with_product(ProductType::Futures);

        let err = okex.get_depth(20, &futures).await.unwrap_err();
        assert_eq!(err, ExchangeError::not_supported(VENUE, "get_depth"));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_products_share_clock_offset() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(json!({"iso": "2023-11-14T22:13:21.500Z", "epoch": "1700000001.500"}).to_string());
        let okex = OKEx::connect(config(mock)).await.unwrap();

        assert_eq!(okex.context().clock().offset_millis(), 1_500);
        assert_eq!(okex.spot().context().clock().offset_millis(), 1_500);
        assert_eq!(okex.swap().context().clock().offset_millis(), 1_500);
        assert_eq!(okex.margin().context().now_millis(), NOW + 1_500);
    }

    #[tokio::test]
    async fn test_connect_survives_time_failure() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_json(503, "unavailable");
        let okex = OKEx::connect(config(mock)).await.unwrap();
        assert_eq!(okex.context().clock().offset_millis(), 0);
    }
}
