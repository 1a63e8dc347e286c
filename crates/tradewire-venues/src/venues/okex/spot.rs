//! OKEx spot (`/api/spot/v3`)

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;
use tradewire_types::coerce::de;
use tradewire_types::{
    adapt_bcc_to_bch, Account, Currency, CurrencyPair, Depth, ExchangeResult, Kline, KlinePeriod, Order, Page,
    PageRequest, SubAccount, Ticker, Trade, TradeSide,
};

use super::common::{
    history_page, history_window, placed_order, server_time, signed_get, signed_order_post, spot_order_body,
    MarketData, SpotOrderWire, MAX_HISTORY, SYMBOL, VENUE,
};
use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::decode;

pub(super) const ROOT: &str = "/api/spot/v3";

pub(super) fn instrument_id(pair: &CurrencyPair) -> String {
    SYMBOL.render(pair)
}

#[derive(Debug, Deserialize)]
struct BalanceWire {
    currency: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    available: Decimal,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    hold: Decimal,
}

/// Whether a cancel or repay response reports success
pub(super) fn result_flag(body: &Value) -> bool {
    match body.get("result") {
        Some(Value::Bool(ok)) => *ok,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

fn parse_account(body: Value) -> ExchangeResult<Account> {
    let balances: Vec<BalanceWire> = decode(body, "accounts")?;
    let mut account = Account::new(VENUE);
    for b in balances {
        account.add(SubAccount::new(
            adapt_bcc_to_bch(Currency::new(&b.currency)),
            b.available,
            b.hold,
        ));
    }
    Ok(account)
}

/// OKEx spot adapter
#[derive(Debug)]
pub struct OKExSpot {
    ctx: Arc<RestContext>,
    market: MarketData,
}

impl OKExSpot {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self::with_context(Arc::new(RestContext::new(
            VENUE,
            super::common::BASE_URL,
            config,
        )?)))
    }

    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        let spot = Self::new(config)?;
        spot.ctx.sync_clock(server_time(&spot.ctx).await);
        Ok(spot)
    }

    pub(super) fn with_context(ctx: Arc<RestContext>) -> Self {
        Self {
            market: MarketData::new(ctx.clone(), ROOT, "book", instrument_id),
            ctx,
        }
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    async fn place(
        &self,
        amount: Decimal,
        price: Decimal,
        pair: &CurrencyPair,
        side: TradeSide,
    ) -> ExchangeResult<Order> {
        let body = spot_order_body(amount, price, pair, side, "1");
        let placed = signed_order_post(&self.ctx, &format!("{}/orders", ROOT), &body).await?;
        placed_order(placed, amount, price, pair, side)
    }
}

#[async_trait]
impl Exchange for OKExSpot {
    fn venue(&self) -> &'static str {
        VENUE
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        self.market.ticker(pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        self.market.depth(size, pair).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: usize,
        since: Option<i64>,
    ) -> ExchangeResult<Vec<Kline>> {
        self.market.klines(pair, period, size, since).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        self.market.trades(pair, since).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn limit_buy(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.place(amount, price, pair, TradeSide::Buy).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn limit_sell(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.place(amount, price, pair, TradeSide::Sell).await
    }

    /// Sent as a quote notional of `amount × price`
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn market_buy(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.place(amount, price, pair, TradeSide::BuyMarket).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn market_sell(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.place(amount, price, pair, TradeSide::SellMarket).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn cancel_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<bool> {
        let body = json!({ "instrument_id": instrument_id(pair) });
        let response =
            signed_order_post(&self.ctx, &format!("{}/cancel_orders/{}", ROOT, order_id), &body).await?;
        Ok(result_flag(&response))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let body = signed_get(
            &self.ctx,
            &format!("{}/orders/{}", ROOT, order_id),
            vec![("instrument_id".to_string(), instrument_id(pair))],
        )
        .await?;
        decode::<SpotOrderWire>(body, "order")?.into_order(pair)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        let body = signed_get(
            &self.ctx,
            &format!("{}/orders_pending", ROOT),
            vec![
                ("instrument_id".to_string(), instrument_id(pair)),
                ("limit".to_string(), MAX_HISTORY.to_string()),
            ],
        )
        .await?;
        decode::<Vec<SpotOrderWire>>(body, "orders_pending")?
            .into_iter()
            .map(|o| o.into_order(pair))
            .collect()
    }

    /// Filled and cancelled orders (`state=7`), newest first
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page: Option<PageRequest>,
    ) -> ExchangeResult<Page<Order>> {
        let page = page.unwrap_or_default();
        let (offset, limit) = history_window(&page)?;
        let body = signed_get(
            &self.ctx,
            &format!("{}/orders", ROOT),
            vec![
                ("instrument_id".to_string(), instrument_id(pair)),
                ("state".to_string(), "7".to_string()),
                ("limit".to_string(), limit.to_string()),
            ],
        )
        .await?;
        let orders = decode::<Vec<SpotOrderWire>>(body, "orders")?
            .into_iter()
            .map(|o| o.into_order(pair))
            .collect::<ExchangeResult<Vec<_>>>()?;
        Ok(history_page(orders, &page, offset, limit))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        let body = signed_get(&self.ctx, &format!("{}/accounts", ROOT), Vec::new()).await?;
        parse_account(body)
    }
}
