//! Binance spot
//!
//! - Symbols: `BTCUSDT`
//! - Signing: HMAC-SHA256 over the query, `X-MBX-APIKEY` header
//! - Errors: `{"code": -2013, "msg": "..."}`
//! - Account: one entry per asset, `free` / `locked`; empty balances dropped

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};
use tradewire_auth::{Digest, FormScheme, Placement, SignScheme};
use tradewire_http::{HttpRequest, HttpResponse, Method};
use tradewire_types::coerce::de;
use tradewire_types::{
    adapt_bcc_to_bch, Account, Currency, CurrencyPair, Depth, ErrorTable, ExchangeError, ExchangeResult,
    Kline, KlinePeriod, Order, OrderType, Page, PageRequest, SubAccount, SymbolFormat, Ticker, Trade,
    TradeSide, TradeStatus, VenueErrorKind,
};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::metadata::MetadataCache;
use crate::normalize::{
    decode, depth_from_rows, ensure_success, parse_body, period_code, DepthColumns, DepthTiers, KlineColumns,
    TimeUnit,
};

pub const VENUE: &str = "binance.com";
pub const BASE_URL: &str = "https://api.binance.com";

pub const SYMBOL: SymbolFormat = SymbolFormat::upper("");
const DEPTH_TIERS: DepthTiers = DepthTiers::Tiers(&[5, 10, 20, 50, 100, 500, 1000]);
const KLINE_COLUMNS: KlineColumns = KlineColumns::ohlcv(TimeUnit::Millis);
const MAX_KLINES: usize = 1000;
const MAX_HISTORY: usize = 1000;
const TRADES_LIMIT: &str = "500";

const PERIODS: &[(KlinePeriod, &str)] = &[
    (KlinePeriod::Min1, "1m"),
    (KlinePeriod::Min3, "3m"),
    (KlinePeriod::Min5, "5m"),
    (KlinePeriod::Min15, "15m"),
    (KlinePeriod::Min30, "30m"),
    (KlinePeriod::Hour1, "1h"),
    (KlinePeriod::Hour2, "2h"),
    (KlinePeriod::Hour4, "4h"),
    (KlinePeriod::Hour6, "6h"),
    (KlinePeriod::Hour8, "8h"),
    (KlinePeriod::Hour12, "12h"),
    (KlinePeriod::Day1, "1d"),
    (KlinePeriod::Day3, "3d"),
    (KlinePeriod::Week1, "1w"),
    (KlinePeriod::Month1, "1M"),
];

const ERRORS: ErrorTable = ErrorTable {
    codes: &[
        ("-1003", VenueErrorKind::RateLimited),
        ("-1015", VenueErrorKind::RateLimited),
        ("-2011", VenueErrorKind::OrderNotFound),
        ("-2013", VenueErrorKind::OrderNotFound),
    ],
    patterns: &[
        ("Unknown order sent", VenueErrorKind::OrderNotFound),
        ("Account has insufficient balance", VenueErrorKind::InsufficientBalance),
    ],
};

const SIGNER: SignScheme = SignScheme::Form(FormScheme {
    digest: Digest::Sha256,
    key: Placement::Header("X-MBX-APIKEY"),
    nonce_field: "timestamp",
    signature: Placement::Field("signature"),
    extra_params: &[("recvWindow", "60000")],
    sorted: false,
});

fn status(native: &str) -> TradeStatus {
    match native {
        "NEW" => TradeStatus::Unfinished,
        "PARTIALLY_FILLED" => TradeStatus::PartiallyFilled,
        "FILLED" => TradeStatus::Filled,
        "CANCELED" | "EXPIRED" => TradeStatus::Canceled,
        "PENDING_CANCEL" => TradeStatus::CancelPending,
        "REJECTED" => TradeStatus::Failed,
        _ => TradeStatus::Unfinished,
    }
}

/// Trading rules for one symbol from `exchangeInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub symbol: String,
    pub pair: CurrencyPair,
    pub status: String,
    pub min_amount: Decimal,
    pub amount_step: Decimal,
    pub min_price: Decimal,
    pub price_tick: Decimal,
    pub min_notional: Decimal,
}

impl SymbolInfo {
    /// Decimal places allowed in an amount
    pub fn amount_precision(&self) -> u32 {
        self.amount_step.normalize().scale()
    }

    /// Decimal places allowed in a price
    pub fn price_precision(&self) -> u32 {
        self.price_tick.normalize().scale()
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ServerTime {
    #[serde(rename = "serverTime")]
    server_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerWire {
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    last_price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    bid_price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    ask_price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    high_price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    low_price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    volume: Decimal,
    #[serde(default)]
    close_time: i64,
}

#[derive(Debug, Deserialize)]
struct DepthWire {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeWire {
    #[serde(deserialize_with = "de::string_or_number")]
    id: String,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    qty: Decimal,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    is_buyer_maker: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderWire {
    #[serde(deserialize_with = "de::string_or_number")]
    order_id: String,
    #[serde(default)]
    client_order_id: String,
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    orig_qty: Option<Decimal>,
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    executed_qty: Option<Decimal>,
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    cummulative_quote_qty: Option<Decimal>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    side: String,
    #[serde(default, rename = "type")]
    order_type: String,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    transact_time: Option<i64>,
    #[serde(default)]
    update_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AccountWire {
    #[serde(default)]
    balances: Vec<BalanceWire>,
}

#[derive(Debug, Deserialize)]
struct BalanceWire {
    asset: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    free: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    locked: Decimal,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfoWire {
    #[serde(default)]
    symbols: Vec<SymbolWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolWire {
    symbol: String,
    #[serde(default)]
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<FilterWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterWire {
    filter_type: String,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    min_qty: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    step_size: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    min_price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    tick_size: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    min_notional: Decimal,
}

impl SymbolWire {
    fn into_info(self) -> Option<SymbolInfo> {
        let pair = CurrencyPair::new(self.base_asset.as_str(), self.quote_asset.as_str()).ok()?;
        let mut info = SymbolInfo {
            symbol: self.symbol,
            pair,
            status: self.status,
            min_amount: Decimal::ZERO,
            amount_step: Decimal::ZERO,
            min_price: Decimal::ZERO,
            price_tick: Decimal::ZERO,
            min_notional: Decimal::ZERO,
        };
        for filter in self.filters {
            match filter.filter_type.as_str() {
                "LOT_SIZE" => {
                    info.min_amount = filter.min_qty;
                    info.amount_step = filter.step_size;
                }
                "PRICE_FILTER" => {
                    info.min_price = filter.min_price;
                    info.price_tick = filter.tick_size;
                }
                "MIN_NOTIONAL" | "NOTIONAL" => info.min_notional = filter.min_notional,
                _ => {}
            }
        }
        Some(info)
    }
}

// ============================================================================
// Normalizers
// ============================================================================

fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let body = parse_body(response)?;
    if let Some(code) = body.get("code").filter(|c| !c.is_null()) {
        if let Some(msg) = body.get("msg").and_then(Value::as_str) {
            let code = tradewire_types::coerce::value_to_string(code);
            warn!(venue = VENUE, code = %code, msg, "Venue rejected request");
            return Err(ERRORS.error(Some(code), msg));
        }
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body)
}

fn parse_ticker(pair: &CurrencyPair, body: Value, captured_at: i64) -> ExchangeResult<Ticker> {
    let wire: TickerWire = decode(body, "ticker")?;
    Ok(Ticker {
        pair: pair.clone(),
        last: wire.last_price,
        buy: wire.bid_price,
        sell: wire.ask_price,
        high: wire.high_price,
        low: wire.low_price,
        vol: wire.volume,
        timestamp: if wire.close_time > 0 { wire.close_time } else { captured_at },
    })
}

fn parse_order(pair: &CurrencyPair, wire: OrderWire) -> ExchangeResult<Order> {
    let order_type = if wire.order_type == "MARKET" {
        OrderType::Market
    } else {
        OrderType::Limit
    };
    let side = TradeSide::from_parts(wire.side == "BUY", order_type);
    let deal = wire.executed_qty.unwrap_or_default();
    let quote = wire.cummulative_quote_qty.unwrap_or_default();
    let created = wire.time.or(wire.transact_time);

    let order = Order::new(
        wire.order_id,
        pair.clone(),
        side,
        wire.price.unwrap_or_default(),
        wire.orig_qty.unwrap_or_default(),
    )
    .with_client_order_id(wire.client_order_id)
    .with_quote_fill(deal, quote)?
    .with_status(if wire.status.is_empty() {
        TradeStatus::Unfinished
    } else {
        status(&wire.status)
    });

    let finished = if order.status.is_final() { wire.update_time } else { None };
    Ok(order.with_times(created, finished))
}

fn parse_trades(pair: &CurrencyPair, body: Value) -> ExchangeResult<Vec<Trade>> {
    let wire: Vec<TradeWire> = decode(body, "trades")?;
    Ok(wire
        .into_iter()
        .map(|t| Trade {
            pair: pair.clone(),
            tid: t.id,
            // buyer is maker: the aggressor sold
            side: if t.is_buyer_maker { TradeSide::Sell } else { TradeSide::Buy },
            price: t.price,
            amount: t.qty,
            timestamp: t.time,
        })
        .collect())
}

fn parse_account(body: Value) -> ExchangeResult<Account> {
    let wire: AccountWire = decode(body, "account")?;
    let mut account = Account::new(VENUE);
    for balance in wire.balances {
        let sub = SubAccount::new(
            adapt_bcc_to_bch(Currency::new(&balance.asset)),
            balance.free,
            balance.locked,
        );
        if !sub.is_empty() {
            account.add(sub);
        }
    }
    Ok(account)
}

// ============================================================================
// Adapter
// ============================================================================

/// Binance spot adapter
#[derive(Debug)]
pub struct Binance {
    ctx: RestContext,
    symbols: MetadataCache<HashMap<String, SymbolInfo>>,
}

impl Binance {
    /// Build without contacting the venue; the clock offset stays at zero
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self {
            ctx: RestContext::new(VENUE, BASE_URL, config)?,
            symbols: MetadataCache::new(),
        })
    }

    /// Build and align the clock with the server
    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        let exchange = Self::new(config)?;
        exchange.ctx.sync_clock(exchange.server_time().await);
        Ok(exchange)
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    /// Server time in Unix milliseconds
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn server_time(&self) -> ExchangeResult<i64> {
        let body = self.public("/api/v3/time", Vec::new()).await?;
        Ok(decode::<ServerTime>(body, "serverTime")?.server_time)
    }

    /// Trading rules for a pair, fetched once per adapter
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn symbol_info(&self, pair: &CurrencyPair) -> ExchangeResult<SymbolInfo> {
        let symbol = SYMBOL.render(pair);
        self.symbol_table()
            .await?
            .get(&symbol)
            .cloned()
            .ok_or_else(|| ExchangeError::InvalidPair(format!("{} is not listed on {}", symbol, VENUE)))
    }

    /// Resolve a venue symbol such as `ETHBTC` to a pair
    pub async fn pair_for_symbol(&self, symbol: &str) -> ExchangeResult<CurrencyPair> {
        self.symbol_table()
            .await?
            .get(&symbol.to_ascii_uppercase())
            .map(|info| info.pair.clone())
            .ok_or_else(|| ExchangeError::InvalidPair(format!("{} is not listed on {}", symbol, VENUE)))
    }

    async fn symbol_table(&self) -> ExchangeResult<&HashMap<String, SymbolInfo>> {
        self.symbols
            .get_or_try_init(|| async {
                let body = self.public("/api/v3/exchangeInfo", Vec::new()).await?;
                let wire: ExchangeInfoWire = decode(body, "exchangeInfo")?;
                Ok(wire
                    .symbols
                    .into_iter()
                    .filter_map(SymbolWire::into_info)
                    .map(|info| (info.symbol.clone(), info))
                    .collect())
            })
            .await
    }

    async fn public(&self, path: &str, params: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.get(path, &params).await?;
        check(&response)
    }

    fn signed_request(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> ExchangeResult<HttpRequest> {
        let signed = self.ctx.sign(&SIGNER, method.as_str(), path, params, None)?;
        let request = match method {
            Method::Post => HttpRequest::post(self.ctx.url(path)).with_form(signed.params),
            _ => HttpRequest::new(method, self.ctx.url_with_query(path, &signed.params)?),
        };
        Ok(request.with_headers(signed.headers))
    }

    async fn signed(&self, method: Method, path: &str, params: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.send(self.signed_request(method, path, params)?).await?;
        check(&response)
    }

    async fn place(
        &self,
        amount: Decimal,
        price: Decimal,
        pair: &CurrencyPair,
        side: TradeSide,
    ) -> ExchangeResult<Order> {
        let mut params = vec![
            ("symbol".to_string(), SYMBOL.render(pair)),
            ("side".to_string(), if side.is_buy() { "BUY" } else { "SELL" }.to_string()),
            ("quantity".to_string(), amount.normalize().to_string()),
            ("newOrderRespType".to_string(), "RESULT".to_string()),
        ];
        if side.is_market() {
            params.push(("type".to_string(), "MARKET".to_string()));
        } else {
            params.push(("type".to_string(), "LIMIT".to_string()));
            params.push(("timeInForce".to_string(), "GTC".to_string()));
            params.push(("price".to_string(), price.normalize().to_string()));
        }

        let request = self.signed_request(Method::Post, "/api/v3/order", params)?;
        let response = self.ctx.send_order(request).await?;
        let mut wire: OrderWire = decode(check(&response)?, "order")?;
        if wire.orig_qty.is_none() {
            wire.orig_qty = Some(amount);
        }
        if wire.price.map_or(true, |p| p.is_zero()) && !side.is_market() {
            wire.price = Some(price);
        }
        let mut order = parse_order(pair, wire)?;
        order.side = side;
        Ok(order)
    }
}

#[async_trait]
impl Exchange for Binance {
    fn venue(&self) -> &'static str {
        VENUE
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let body = self
            .public("/api/v3/ticker/24hr", vec![("symbol".into(), SYMBOL.render(pair))])
            .await?;
        parse_ticker(pair, body, self.ctx.now_millis())
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let limit = DEPTH_TIERS.request_size(size).unwrap_or(100);
        let body = self
            .public(
                "/api/v3/depth",
                vec![
                    ("symbol".into(), SYMBOL.render(pair)),
                    ("limit".into(), limit.to_string()),
                ],
            )
            .await?;
        let wire: DepthWire = decode(body, "depth")?;
        Ok(depth_from_rows(
            pair,
            &wire.bids,
            &wire.asks,
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
        let mut params = vec![
            ("symbol".to_string(), SYMBOL.render(pair)),
            ("interval".to_string(), period_code(PERIODS, VENUE, period)?.to_string()),
            ("limit".to_string(), size.clamp(1, MAX_KLINES).to_string()),
        ];
        if let Some(since) = since {
            params.push(("startTime".to_string(), since.to_string()));
        }
        let body = self.public("/api/v3/klines", params).await?;
        let rows: Vec<Value> = decode(body, "klines")?;
        Ok(KLINE_COLUMNS.klines(pair, &rows, size))
    }

    /// `since` is a trade id; paging from it needs an API key
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let mut params = vec![
            ("symbol".to_string(), SYMBOL.render(pair)),
            ("limit".to_string(), TRADES_LIMIT.to_string()),
        ];
        let body = match since {
            None => self.public("/api/v3/trades", params).await?,
            Some(from_id) => {
                params.push(("fromId".to_string(), from_id.to_string()));
                let key = self.ctx.credentials()?.api_key().to_string();
                let request = HttpRequest::get(self.ctx.url_with_query("/api/v3/historicalTrades", &params)?)
                    .with_header("X-MBX-APIKEY", key);
                check(&self.ctx.send(request).await?)?
            }
        };
        parse_trades(pair, body)
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
        let request = self.signed_request(
            Method::Delete,
            "/api/v3/order",
            vec![
                ("symbol".to_string(), SYMBOL.render(pair)),
                ("orderId".to_string(), order_id.to_string()),
            ],
        )?;
        let response = self.ctx.send_order(request).await?;
        let body = check(&response)?;
        Ok(body.get("orderId").map_or(false, |id| !id.is_null()))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let body = self
            .signed(
                Method::Get,
                "/api/v3/order",
                vec![
                    ("symbol".to_string(), SYMBOL.render(pair)),
                    ("orderId".to_string(), order_id.to_string()),
                ],
            )
            .await?;
        parse_order(pair, decode(body, "order")?)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        let body = self
            .signed(
                Method::Get,
                "/api/v3/openOrders",
                vec![("symbol".to_string(), SYMBOL.render(pair))],
            )
            .await?;
        let wire: Vec<OrderWire> = decode(body, "openOrders")?;
        wire.into_iter().map(|o| parse_order(pair, o)).collect()
    }

    /// `allOrders` has no page parameter; pages are cut from the finished
    /// orders among the newest `page * page_size`, up to 1000
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page: Option<PageRequest>,
    ) -> ExchangeResult<Page<Order>> {
        let page = page.unwrap_or_default();
        let offset = page.offset() as usize;
        let limit = (offset + page.page_size as usize).min(MAX_HISTORY);
        if offset >= limit {
            return Err(ExchangeError::InvalidParameter(format!(
                "{} order history reaches back {} orders",
                VENUE, MAX_HISTORY
            )));
        }

        let body = self
            .signed(
                Method::Get,
                "/api/v3/allOrders",
                vec![
                    ("symbol".to_string(), SYMBOL.render(pair)),
                    ("limit".to_string(), limit.to_string()),
                ],
            )
            .await?;
        let wire: Vec<OrderWire> = decode(body, "allOrders")?;
        let fetched = wire.len();

        let mut orders = wire
            .into_iter()
            .map(|o| parse_order(pair, o))
            .collect::<ExchangeResult<Vec<_>>>()?;
        orders.reverse();
        let items: Vec<Order> = orders
            .into_iter()
            .filter(|o| o.status.is_final())
            .skip(offset)
            .take(page.page_size as usize)
            .collect();
        Ok(Page::new(items, fetched == limit && limit < MAX_HISTORY))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        let body = self.signed(Method::Get, "/api/v3/account", Vec::new()).await?;
        parse_account(body)
    }
}
