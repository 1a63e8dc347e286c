//! OKEx isolated margin (`/api/margin/v3`)
//!
//! Orders and balances live under the margin root; market data is the spot
//! market's.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};
use tradewire_types::coerce::{de, decimal_from_value};
use tradewire_types::{
    Currency, CurrencyPair, Depth, ExchangeError, ExchangeResult, Kline, KlinePeriod, MarginAccount, Order,
    Page, PageRequest, SubAccount, Ticker, Trade, TradeSide,
};

use super::common::{
    history_page, history_window, placed_order, server_time, signed_get, signed_order_post, signed_post,
    spot_order_body, MarketData, SpotOrderWire, BASE_URL, MAX_HISTORY, VENUE,
};
use super::spot::{instrument_id, result_flag, ROOT as SPOT_ROOT};
use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::decode;

const ROOT: &str = "/api/margin/v3";

#[derive(Debug, Deserialize)]
struct MarginBalanceWire {
    #[serde(deserialize_with = "de::strict_decimal")]
    available: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    frozen: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    hold: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    borrowed: Decimal,
}

#[derive(Debug, Deserialize)]
struct BorrowWire {
    #[serde(deserialize_with = "de::string_or_number")]
    borrow_id: String,
}

#[derive(Debug, Deserialize)]
struct RepayWire {
    #[serde(default, deserialize_with = "de::string_or_number")]
    repayment_id: String,
}

fn sub_account(fields: &HashMap<String, Value>, currency: &Currency) -> ExchangeResult<SubAccount> {
    let key = format!("currency:{}", currency.symbol());
    let raw = fields
        .get(&key)
        .cloned()
        .ok_or_else(|| ExchangeError::normalization(key.clone(), "missing from margin account"))?;
    let wire: MarginBalanceWire = decode(raw, &key)?;
    Ok(SubAccount::new(currency.clone(), wire.available, wire.frozen.max(wire.hold)).with_loan(wire.borrowed))
}

/// Positive decimal, or `None` for blanks and zero placeholders
fn optional_positive(value: Option<&Value>) -> Option<Decimal> {
    value
        .and_then(decimal_from_value)
        .filter(|d| *d > Decimal::ZERO)
}

fn parse_margin_account(pair: &CurrencyPair, body: Value) -> ExchangeResult<MarginAccount> {
    let fields: HashMap<String, Value> = decode(body, "margin account")?;
    Ok(MarginAccount {
        pair: pair.clone(),
        base: sub_account(&fields, &pair.base)?,
        quote: sub_account(&fields, &pair.quote)?,
        risk_rate: optional_positive(fields.get("risk_rate")),
        liquidation_price: optional_positive(fields.get("liquidation_price")),
    })
}

/// OKEx margin adapter
#[derive(Debug)]
pub struct OKExMargin {
    ctx: Arc<RestContext>,
    market: MarketData,
}

impl OKExMargin {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self::with_context(Arc::new(RestContext::new(VENUE, BASE_URL, config)?)))
    }

    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        let margin = Self::new(config)?;
        margin.ctx.sync_clock(server_time(&margin.ctx).await);
        Ok(margin)
    }

    pub(super) fn with_context(ctx: Arc<RestContext>) -> Self {
        Self {
            market: MarketData::new(ctx.clone(), SPOT_ROOT, "book", instrument_id),
            ctx,
        }
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    /// Borrow `amount` of `currency` against the `pair` margin account
    ///
    /// Returns the borrow id needed to repay.
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn borrow(&self, pair: &CurrencyPair, currency: &Currency, amount: Decimal) -> ExchangeResult<String> {
        let body = json!({
            "instrument_id": instrument_id(pair),
            "currency": currency.symbol(),
            "amount": amount.normalize().to_string(),
        });
        let response = signed_post(&self.ctx, &format!("{}/accounts/borrow", ROOT), &body).await?;
        let wire: BorrowWire = decode(response, "borrow")?;
        info!(venue = VENUE, borrow_id = %wire.borrow_id, %currency, %amount, "Borrowed on margin");
        Ok(wire.borrow_id)
    }

    /// Repay part or all of a loan; returns the repayment id
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn repay(
        &self,
        borrow_id: &str,
        pair: &CurrencyPair,
        currency: &Currency,
        amount: Decimal,
    ) -> ExchangeResult<String> {
        let body = json!({
            "borrow_id": borrow_id,
            "instrument_id": instrument_id(pair),
            "currency": currency.symbol(),
            "amount": amount.normalize().to_string(),
        });
        let response = signed_post(&self.ctx, &format!("{}/accounts/repayment", ROOT), &body).await?;
        if !result_flag(&response) {
            return Err(ExchangeError::normalization("result", "repayment not acknowledged"));
        }
        let wire: RepayWire = decode(response, "repayment")?;
        info!(venue = VENUE, borrow_id, %currency, %amount, "Repaid margin loan");
        Ok(wire.repayment_id)
    }

    /// Base and quote balances of one isolated margin account
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn get_margin_account(&self, pair: &CurrencyPair) -> ExchangeResult<MarginAccount> {
        let body = signed_get(
            &self.ctx,
            &format!("{}/accounts/{}", ROOT, instrument_id(pair)),
            Vec::new(),
        )
        .await?;
        parse_margin_account(pair, body)
    }

    async fn place(
        &self,
        amount: Decimal,
        price: Decimal,
        pair: &CurrencyPair,
        side: TradeSide,
    ) -> ExchangeResult<Order> {
        let body = spot_order_body(amount, price, pair, side, "2");
        let placed = signed_order_post(&self.ctx, &format!("{}/orders", ROOT), &body).await?;
        placed_order(placed, amount, price, pair, side)
    }
}

#[async_trait]
impl Exchange for OKExMargin {
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

    // Margin balances are per pair; see `get_margin_account`
}
