//! A.top
//!
//! - Symbols: `btc_usdt`
//! - Signing: hex HMAC-SHA256 over the key-sorted form, `accesskey` / `signature` fields
//! - Errors: `{"code": 1001, "info": "..."}`; success is `{"code": 200, "data": ...}`
//! - Order `type`: 1 buy, 0 sell; `entrustType`: 0 limit, 1 market

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};
use tradewire_auth::{Digest, FormScheme, Placement, SignScheme};
use tradewire_http::{HttpRequest, HttpResponse};
use tradewire_types::coerce::{de, i64_from_value, value_to_string};
use tradewire_types::{
    Account, Currency, CurrencyPair, Depth, ErrorTable, ExchangeError, ExchangeResult, Kline, KlinePeriod, Order,
    OrderType, Page, PageRequest, SubAccount, SymbolFormat, Ticker, Trade, TradeSide, TradeStatus, VenueErrorKind,
};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::{
    decode, depth_from_rows, ensure_success, parse_body, period_code, DepthColumns, KlineColumns, TimeUnit,
};

pub const VENUE: &str = "a.top";
pub const BASE_URL: &str = "https://api.a.top";
/// Sandbox, for `VenueConfig::with_base_url`
pub const TESTNET_URL: &str = "https://testapi.a.top";

pub const SYMBOL: SymbolFormat = SymbolFormat::lower("_");
const KLINE_COLUMNS: KlineColumns = KlineColumns::ohlcv(TimeUnit::Seconds);
const SUCCESS: &str = "200";
const OPEN_ORDERS_PAGE: &str = "1000";

const PERIODS: &[(KlinePeriod, &str)] = &[
    (KlinePeriod::Min1, "1min"),
    (KlinePeriod::Min3, "3min"),
    (KlinePeriod::Min5, "5min"),
    (KlinePeriod::Min15, "15min"),
    (KlinePeriod::Min30, "30min"),
    (KlinePeriod::Hour1, "1hour"),
    (KlinePeriod::Hour2, "2hour"),
    (KlinePeriod::Hour4, "4hour"),
    (KlinePeriod::Hour6, "6hour"),
    (KlinePeriod::Hour8, "8hour"),
    (KlinePeriod::Hour12, "12hour"),
    (KlinePeriod::Day1, "1day"),
    (KlinePeriod::Day3, "3day"),
    (KlinePeriod::Week1, "7day"),
    (KlinePeriod::Month1, "30day"),
];

const ERRORS: ErrorTable = ErrorTable {
    codes: &[("1001", VenueErrorKind::InsufficientBalance)],
    patterns: &[],
};

const SIGNER: SignScheme = SignScheme::Form(FormScheme {
    digest: Digest::Sha256,
    key: Placement::Field("accesskey"),
    nonce_field: "nonce",
    signature: Placement::Field("signature"),
    extra_params: &[],
    sorted: true,
});

fn status(code: i64) -> TradeStatus {
    match code {
        1 => TradeStatus::PartiallyFilled,
        2 => TradeStatus::Filled,
        3 => TradeStatus::Canceled,
        _ => TradeStatus::Unfinished,
    }
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerWire {
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    bid: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    ask: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    high: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    low: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    coin_vol: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct KlineWire {
    #[serde(default)]
    datas: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeWire {
    #[serde(deserialize_with = "de::string_or_number")]
    id: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    qty: Decimal,
    #[serde(deserialize_with = "de::lossy_i64")]
    time: i64,
    #[serde(default)]
    is_buyer_maker: bool,
}

#[derive(Debug, Deserialize)]
struct PlacedWire {
    #[serde(deserialize_with = "de::string_or_number")]
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderWire {
    #[serde(deserialize_with = "de::string_or_number")]
    id: String,
    #[serde(default, rename = "type")]
    side: Option<Value>,
    #[serde(default)]
    flag: Option<String>,
    #[serde(default, deserialize_with = "de::lossy_i64")]
    entrust_type: i64,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    number: Decimal,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    complete_number: Decimal,
    #[serde(default, alias = "avg_price", deserialize_with = "de::strict_opt_decimal")]
    avg_price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::lossy_i64")]
    status: i64,
    #[serde(default, deserialize_with = "de::lossy_i64")]
    time: i64,
}

#[derive(Debug, Deserialize)]
struct HistoryWire {
    #[serde(default)]
    record: Vec<OrderWire>,
}

#[derive(Debug, Deserialize)]
struct BalanceWire {
    #[serde(deserialize_with = "de::strict_decimal")]
    available: Decimal,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    freeze: Decimal,
}

// ============================================================================
// Normalizers
// ============================================================================

/// Unwrap `{code, data}`; bodies without a `code` are returned whole
fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let mut body = parse_body(response)?;
    if let Some(code) = body.get("code").map(value_to_string) {
        if code != SUCCESS {
            let message = body.get("info").or_else(|| body.get("msg")).map(value_to_string).unwrap_or_default();
            warn!(venue = VENUE, code = %code, message = %message, "Venue rejected request");
            return Err(ERRORS.error(Some(code), message));
        }
        ensure_success(response, &body, &ERRORS)?;
        return Ok(body.get_mut("data").map(Value::take).unwrap_or(Value::Null));
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body)
}

fn parse_order(pair: &CurrencyPair, wire: OrderWire) -> ExchangeResult<Order> {
    let is_buy = match (&wire.side, &wire.flag) {
        (Some(side), _) => value_to_string(side) == "1",
        (None, Some(flag)) => flag == "buy",
        (None, None) => true,
    };
    let order_type = if wire.entrust_type == 1 {
        OrderType::Market
    } else {
        OrderType::Limit
    };
    let side = TradeSide::from_parts(is_buy, order_type);
    let created = Some(wire.time).filter(|t| *t > 0);
    Ok(Order::new(wire.id, pair.clone(), side, wire.price, wire.number)
        .with_fill(wire.complete_number, wire.avg_price)?
        .with_status(status(wire.status))
        .with_times(created, None))
}

// ============================================================================
// Adapter
// ============================================================================

/// A.top spot adapter
#[derive(Debug)]
pub struct Atop {
    ctx: RestContext,
}

impl Atop {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self {
            ctx: RestContext::new(VENUE, BASE_URL, config)?,
        })
    }

    /// Build and align the clock with the server
    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        let atop = Self::new(config)?;
        atop.ctx.sync_clock(atop.server_time().await);
        Ok(atop)
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    /// Server time in Unix milliseconds
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn server_time(&self) -> ExchangeResult<i64> {
        let data = self.public("/trade/api/v1/getServerTime", Vec::new()).await?;
        let time = data.get("serverTime").unwrap_or(&data);
        i64_from_value(time)
            .ok_or_else(|| ExchangeError::normalization("serverTime", format!("unreadable: {}", data)))
    }

    async fn public(&self, path: &str, query: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.get(path, &query).await?;
        check(&response)
    }

    fn private_request(&self, path: &str, form: Vec<(String, String)>) -> ExchangeResult<HttpRequest> {
        let signed = self.ctx.sign(&SIGNER, "POST", path, form, None)?;
        Ok(HttpRequest::post(self.ctx.url(path)).with_form(signed.params))
    }

    async fn private(&self, path: &str, form: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.send(self.private_request(path, form)?).await?;
        check(&response)
    }

    async fn place(
        &self,
        amount: Decimal,
        price: Decimal,
        pair: &CurrencyPair,
        side: TradeSide,
    ) -> ExchangeResult<Order> {
        let request = self.private_request(
            "/trade/api/v1/order",
            params(&[
                ("market", &SYMBOL.render(pair)),
                ("type", if side.is_buy() { "1" } else { "0" }),
                ("entrustType", if side.is_market() { "1" } else { "0" }),
                ("price", &price.normalize().to_string()),
                ("number", &amount.normalize().to_string()),
            ]),
        )?;
        let response = self.ctx.send_order(request).await?;
        let placed: PlacedWire = decode(check(&response)?, "order")?;
        let price = if side.is_market() { Decimal::ZERO } else { price };
        Ok(Order::new(placed.id, pair.clone(), side, price, amount).with_times(Some(self.ctx.now_millis()), None))
    }

    async fn order_list(&self, path: &str, pair: &CurrencyPair, page: &str, size: &str) -> ExchangeResult<Value> {
        self.private(
            path,
            params(&[("market", &SYMBOL.render(pair)), ("page", page), ("pageSize", size)]),
        )
        .await
    }
}

#[async_trait]
impl Exchange for Atop {
    fn venue(&self) -> &'static str {
        VENUE
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let data = self
            .public("/data/api/v1/getTicker", params(&[("market", &SYMBOL.render(pair))]))
            .await?;
        let wire: TickerWire = decode(data, "ticker")?;
        Ok(Ticker {
            pair: pair.clone(),
            last: wire.price,
            buy: wire.bid,
            sell: wire.ask,
            high: wire.high,
            low: wire.low,
            vol: wire.coin_vol,
            timestamp: self.ctx.now_millis(),
        })
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let data = self
            .public("/data/api/v1/getDepth", params(&[("market", &SYMBOL.render(pair))]))
            .await?;
        let book: BookWire = decode(data, "depth")?;
        Ok(depth_from_rows(
            pair,
            &book.bids,
            &book.asks,
            DepthColumns::PRICE_AMOUNT,
            size,
            self.ctx.now_millis(),
        ))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: usize,
        since: Option<i64>,
    ) -> ExchangeResult<Vec<Kline>> {
        let code = period_code(PERIODS, VENUE, period)?;
        let mut query = params(&[("market", &SYMBOL.render(pair)), ("type", code)]);
        if let Some(since) = since {
            query.push(("since".to_string(), (since / 1000).to_string()));
        }
        let data = self.public("/data/api/v1/getKLine", query).await?;
        let wire: KlineWire = decode(data, "kline")?;
        Ok(KLINE_COLUMNS.klines(pair, &wire.datas, size))
    }

    /// `isBuyerMaker` marks a sell-side taker
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let data = self
            .public("/data/api/v1/getTrades", params(&[("market", &SYMBOL.render(pair))]))
            .await?;
        let rows: Vec<TradeWire> = decode(data, "trades")?;
        let since = since.unwrap_or(0);
        let mut trades: Vec<Trade> = rows
            .into_iter()
            .filter(|t| t.time >= since)
            .map(|t| Trade {
                pair: pair.clone(),
                tid: t.id,
                side: if t.is_buyer_maker { TradeSide::Sell } else { TradeSide::Buy },
                price: t.price,
                amount: t.qty,
                timestamp: t.time,
            })
            .collect();
        trades.sort_by_key(|t| t.timestamp);
        Ok(trades)
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
        let request = self.private_request(
            "/trade/api/v1/cancel",
            params(&[("market", &SYMBOL.render(pair)), ("id", order_id)]),
        )?;
        let response = self.ctx.send_order(request).await?;
        check(&response)?;
        Ok(true)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let data = self
            .private(
                "/trade/api/v1/getOrder",
                params(&[("market", &SYMBOL.render(pair)), ("id", order_id)]),
            )
            .await?;
        parse_order(pair, decode(data, "order")?)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        let data = self
            .order_list("/trade/api/v1/getOpenOrders", pair, "1", OPEN_ORDERS_PAGE)
            .await?;
        let rows: Vec<OrderWire> = decode(data, "open orders")?;
        let mut orders = rows
            .into_iter()
            .map(|o| parse_order(pair, o))
            .collect::<ExchangeResult<Vec<_>>>()?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page: Option<PageRequest>,
    ) -> ExchangeResult<Page<Order>> {
        let page = page.unwrap_or_default();
        let data = self
            .order_list(
                "/trade/api/v1/getHistorys",
                pair,
                &page.page.to_string(),
                &page.page_size.to_string(),
            )
            .await?;
        let wire: HistoryWire = decode(data, "history")?;
        let orders = wire
            .record
            .into_iter()
            .map(|o| parse_order(pair, o))
            .collect::<ExchangeResult<Vec<_>>>()?;
        Ok(Page::from_limit(orders, page.page_size as usize))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        let data = self.private("/trade/api/v1/getBalance", Vec::new()).await?;
        let balances: BTreeMap<String, BalanceWire> = decode(data, "balance")?;
        let mut account = Account::new(VENUE);
        for (symbol, balance) in balances {
            account.add(SubAccount::new(Currency::new(symbol), balance.available, balance.freeze));
        }
        Ok(account)
    }
}
