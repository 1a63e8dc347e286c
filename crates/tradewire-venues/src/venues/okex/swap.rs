//! OKEx perpetual swaps (`/api/swap/v3`)
//!
//! Amounts are contract counts. Buys open longs and sells open shorts.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;
use tradewire_types::coerce::de;
use tradewire_types::{
    Account, Currency, CurrencyPair, Depth, ExchangeResult, Kline, KlinePeriod, Order, OrderType, Page,
    PageRequest, SubAccount, Ticker, Trade, TradeSide,
};

use super::common::{
    client_oid, history_page, history_window, placed_order, server_time, signed_get,
    signed_order_post, status, MarketData, BASE_URL, MAX_HISTORY, SYMBOL, VENUE,
};
use super::spot::result_flag;
use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::{decode, iso8601_millis};

const ROOT: &str = "/api/swap/v3";

/// `BTC-USDT-SWAP`
pub fn instrument_id(pair: &CurrencyPair) -> String {
    format!("{}-SWAP", SYMBOL.render(pair))
}

/// Swap `type`: 1 open long, 2 open short, 3 close long, 4 close short
fn swap_side(native: &str, order_type: OrderType) -> TradeSide {
    TradeSide::from_parts(matches!(native, "1" | "4"), order_type)
}

#[derive(Debug, Deserialize)]
struct SwapOrderWire {
    #[serde(deserialize_with = "de::string_or_number")]
    order_id: String,
    #[serde(default)]
    client_oid: String,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    size: Decimal,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    filled_qty: Decimal,
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    price_avg: Option<Decimal>,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    fee: Decimal,
    #[serde(default, rename = "type")]
    swap_type: String,
    #[serde(default)]
    order_type: String,
    #[serde(default, deserialize_with = "de::lossy_i64")]
    state: i64,
    #[serde(default)]
    timestamp: Value,
}

impl SwapOrderWire {
    fn into_order(self, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let order_type = if self.order_type == "4" {
            OrderType::Market
        } else {
            OrderType::Limit
        };
        let side = swap_side(&self.swap_type, order_type);
        Ok(Order::new(self.order_id, pair.clone(), side, self.price, self.size)
            .with_fill(self.filled_qty, self.price_avg)?
            .with_status(status(self.state))
            .with_fee(self.fee.abs())
            .with_client_order_id(self.client_oid)
            .with_times(iso8601_millis(&self.timestamp), None))
    }
}

#[derive(Debug, Deserialize)]
struct OrderListWire {
    #[serde(default)]
    order_info: Vec<SwapOrderWire>,
}

#[derive(Debug, Deserialize)]
struct SwapAccountWire {
    currency: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    total_avail_balance: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    margin_frozen: Decimal,
}

#[derive(Debug, Deserialize)]
struct AccountsWire {
    #[serde(default)]
    info: Vec<SwapAccountWire>,
}

/// OKEx perpetual swap adapter
#[derive(Debug)]
pub struct OKExSwap {
    ctx: Arc<RestContext>,
    market: MarketData,
}

impl OKExSwap {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self::with_context(Arc::new(RestContext::new(VENUE, BASE_URL, config)?)))
    }

    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        let swap = Self::new(config)?;
        swap.ctx.sync_clock(server_time(&swap.ctx).await);
        Ok(swap)
    }

    pub(super) fn with_context(ctx: Arc<RestContext>) -> Self {
        Self {
            market: MarketData::new(ctx.clone(), ROOT, "depth", instrument_id),
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
        let mut body = json!({
            "client_oid": client_oid(),
            "instrument_id": instrument_id(pair),
            "type": if side.is_buy() { "1" } else { "2" },
            "size": amount.normalize().to_string(),
            "order_type": if side.is_market() { "4" } else { "0" },
        });
        if !side.is_market() {
            body["price"] = price.normalize().to_string().into();
            body["match_price"] = "0".into();
        }
        let placed = signed_order_post(&self.ctx, &format!("{}/order", ROOT), &body).await?;
        placed_order(placed, amount, price, pair, side)
    }

    async fn list_orders(&self, pair: &CurrencyPair, state: &str, limit: usize) -> ExchangeResult<Vec<Order>> {
        let body = signed_get(
            &self.ctx,
            &format!("{}/orders/{}", ROOT, instrument_id(pair)),
            vec![
                ("state".to_string(), state.to_string()),
                ("limit".to_string(), limit.to_string()),
            ],
        )
        .await?;
        decode::<OrderListWire>(body, "orders")?
            .order_info
            .into_iter()
            .map(|o| o.into_order(pair))
            .collect()
    }
}

#[async_trait]
impl Exchange for OKExSwap {
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
        let path = format!("{}/cancel_order/{}/{}", ROOT, instrument_id(pair), order_id);
        let response = signed_order_post(&self.ctx, &path, &json!({})).await?;
        Ok(result_flag(&response))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let body = signed_get(
            &self.ctx,
            &format!("{}/orders/{}/{}", ROOT, instrument_id(pair), order_id),
            Vec::new(),
        )
        .await?;
        decode::<SwapOrderWire>(body, "order")?.into_order(pair)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        // 6: open or partially filled
        self.list_orders(pair, "6", MAX_HISTORY).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page: Option<PageRequest>,
    ) -> ExchangeResult<Page<Order>> {
        let page = page.unwrap_or_default();
        let (offset, limit) = history_window(&page)?;
        let orders = self.list_orders(pair, "7", limit).await?;
        Ok(history_page(orders, &page, offset, limit))
    }

    /// Available balance and frozen margin per settlement currency
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        let body = signed_get(&self.ctx, &format!("{}/accounts", ROOT), Vec::new()).await?;
        let wire: AccountsWire = decode(body, "accounts")?;
        let mut account = Account::new(VENUE);
        for entry in wire.info {
            account.add(SubAccount::new(
                Currency::new(&entry.currency),
                entry.total_avail_balance,
                entry.margin_frozen,
            ));
        }
        Ok(account)
    }
}
