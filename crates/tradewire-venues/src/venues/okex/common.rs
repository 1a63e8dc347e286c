//! Pieces shared by the OKEx v3 product adapters

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use tradewire_auth::{PassphraseMode, PrehashScheme, SignScheme, TimestampFormat};
use tradewire_http::{HttpRequest, HttpResponse, Method};
use tradewire_types::coerce::{de, value_to_string};
use tradewire_types::{
    CurrencyPair, Depth, ErrorTable, ExchangeError, ExchangeResult, Kline, KlinePeriod, Order, OrderType,
    Page, PageRequest, SymbolFormat, Ticker, Trade, TradeSide, TradeStatus, VenueErrorKind,
};

use crate::context::RestContext;
use crate::normalize::{
    decode, depth_from_rows, ensure_success, iso8601_millis, millis_to_iso8601, parse_body, period_code,
    DepthColumns, DepthTiers, KlineColumns, TimeUnit,
};

pub const VENUE: &str = "okex.com";
pub const BASE_URL: &str = "https://www.okex.com";

/// `BTC-USDT`; swaps append `-SWAP`
pub const SYMBOL: SymbolFormat = SymbolFormat::upper("-");

const MAX_DEPTH: usize = 200;
pub(super) const DEPTH_TIERS: DepthTiers = DepthTiers::Any { max: MAX_DEPTH };
pub(super) const KLINE_COLUMNS: KlineColumns = KlineColumns::ohlcv(TimeUnit::Iso8601);
pub(super) const MAX_KLINES: usize = 200;
/// Largest `limit` accepted by the order list endpoints
pub(super) const MAX_HISTORY: usize = 100;

/// Candle granularity in seconds
const PERIODS: &[(KlinePeriod, &str)] = &[
    (KlinePeriod::Min1, "60"),
    (KlinePeriod::Min3, "180"),
    (KlinePeriod::Min5, "300"),
    (KlinePeriod::Min15, "900"),
    (KlinePeriod::Min30, "1800"),
    (KlinePeriod::Hour1, "3600"),
    (KlinePeriod::Hour2, "7200"),
    (KlinePeriod::Hour4, "14400"),
    (KlinePeriod::Hour6, "21600"),
    (KlinePeriod::Hour12, "43200"),
    (KlinePeriod::Day1, "86400"),
    (KlinePeriod::Week1, "604800"),
];

pub(super) const ERRORS: ErrorTable = ErrorTable {
    codes: &[
        ("30014", VenueErrorKind::RateLimited),
        ("30026", VenueErrorKind::RateLimited),
        ("33014", VenueErrorKind::OrderNotFound),
        ("35029", VenueErrorKind::OrderNotFound),
        ("33017", VenueErrorKind::InsufficientBalance),
        ("35008", VenueErrorKind::InsufficientBalance),
    ],
    patterns: &[],
};

pub(super) const SIGNER: SignScheme = SignScheme::Prehash(PrehashScheme {
    timestamp: TimestampFormat::Iso8601Millis,
    key_header: "OK-ACCESS-KEY",
    sign_header: "OK-ACCESS-SIGN",
    timestamp_header: "OK-ACCESS-TIMESTAMP",
    passphrase_header: "OK-ACCESS-PASSPHRASE",
    passphrase: PassphraseMode::Plain,
    extra_headers: &[],
});

pub(super) fn status(state: i64) -> TradeStatus {
    match state {
        -2 => TradeStatus::Failed,
        -1 => TradeStatus::Canceled,
        1 => TradeStatus::PartiallyFilled,
        2 => TradeStatus::Filled,
        4 => TradeStatus::CancelPending,
        _ => TradeStatus::Unfinished,
    }
}

/// Fresh `client_oid`: a letter followed by alphanumerics, 32 chars at most
pub(super) fn client_oid() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("tw{}", suffix)
}

// ============================================================================
// Transport
// ============================================================================

/// Detect both error envelopes and hand back the body
///
/// - `{"code": 30008, "message": "..."}` with a 4xx status
/// - `{"error_code": "33014", "error_message": "...", "result": false}`, sometimes with 200
pub(super) fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let body = parse_body(response)?;
    if let Some((code, message)) = envelope_error(&body) {
        warn!(venue = VENUE, code = %code, message = %message, "Venue rejected request");
        return Err(ERRORS.error(Some(code), message));
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body)
}

fn envelope_error(body: &Value) -> Option<(String, String)> {
    let object = body.as_object()?;
    let (code, message) = if let Some(code) = object.get("error_code") {
        (code, object.get("error_message"))
    } else {
        (object.get("code")?, object.get("message").or_else(|| object.get("msg")))
    };
    let code = value_to_string(code);
    if code.is_empty() || code == "0" {
        return None;
    }
    let message = message.map(value_to_string).unwrap_or_default();
    Some((code, message))
}

pub(super) async fn public(ctx: &RestContext, path: &str, params: Vec<(String, String)>) -> ExchangeResult<Value> {
    let response = ctx.get(path, &params).await?;
    check(&response)
}

/// Signed request; GET parameters go in the query, POST bodies as JSON
pub(super) fn signed_request(
    ctx: &RestContext,
    method: Method,
    path: &str,
    params: Vec<(String, String)>,
    body: Option<&Value>,
) -> ExchangeResult<HttpRequest> {
    let body = body.map(Value::to_string);
    let signed = ctx.sign(&SIGNER, method.as_str(), path, params, body.as_deref())?;
    let mut request =
        HttpRequest::new(method, ctx.url_with_query(path, &signed.params)?).with_headers(signed.headers);
    if let Some(body) = signed.body {
        request = request.with_json(body);
    }
    Ok(request)
}

pub(super) async fn signed_get(
    ctx: &RestContext,
    path: &str,
    params: Vec<(String, String)>,
) -> ExchangeResult<Value> {
    let response = ctx.send(signed_request(ctx, Method::Get, path, params, None)?).await?;
    check(&response)
}

/// POST that places or cancels an order
pub(super) async fn signed_order_post(ctx: &RestContext, path: &str, body: &Value) -> ExchangeResult<Value> {
    let request = signed_request(ctx, Method::Post, path, Vec::new(), Some(body))?;
    let response = ctx.send_order(request).await?;
    check(&response)
}

/// `POST` outside order placement, e.g. borrowing
pub(super) async fn signed_post(ctx: &RestContext, path: &str, body: &Value) -> ExchangeResult<Value> {
    let response = ctx
        .send(signed_request(ctx, Method::Post, path, Vec::new(), Some(body))?)
        .await?;
    check(&response)
}

#[derive(Debug, Deserialize)]
struct ServerTimeWire {
    #[serde(deserialize_with = "de::strict_decimal")]
    epoch: Decimal,
}

/// Server time in Unix milliseconds
pub(super) async fn server_time(ctx: &RestContext) -> ExchangeResult<i64> {
    let body = public(ctx, "/api/general/v3/time", Vec::new()).await?;
    let wire: ServerTimeWire = decode(body, "time")?;
    (wire.epoch * Decimal::ONE_THOUSAND)
        .trunc()
        .to_i64()
        .ok_or_else(|| ExchangeError::normalization("epoch", "out of range"))
}

// ============================================================================
// Market data, shared by spot and swap
// ============================================================================

#[derive(Debug, Deserialize)]
struct TickerWire {
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    last: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    best_bid: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    best_ask: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    high_24h: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    low_24h: Decimal,
    #[serde(default, alias = "volume_24h", deserialize_with = "de::lossy_decimal")]
    base_volume_24h: Decimal,
    #[serde(default)]
    timestamp: Value,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
    #[serde(default, alias = "time")]
    timestamp: Value,
}

#[derive(Debug, Deserialize)]
struct TradeWire {
    #[serde(deserialize_with = "de::string_or_number")]
    trade_id: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    size: Decimal,
    #[serde(default)]
    side: String,
    #[serde(default)]
    timestamp: Value,
}

/// Public endpoints under one product root such as `/api/spot/v3`
#[derive(Debug, Clone)]
pub(super) struct MarketData {
    ctx: Arc<RestContext>,
    root: &'static str,
    book: &'static str,
    instrument: fn(&CurrencyPair) -> String,
}

impl MarketData {
    pub(super) fn new(
        ctx: Arc<RestContext>,
        root: &'static str,
        book: &'static str,
        instrument: fn(&CurrencyPair) -> String,
    ) -> Self {
        Self {
            ctx,
            root,
            book,
            instrument,
        }
    }

    fn path(&self, pair: &CurrencyPair, endpoint: &str) -> String {
        format!("{}/instruments/{}/{}", self.root, (self.instrument)(pair), endpoint)
    }

    pub(super) async fn ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let body = public(&self.ctx, &self.path(pair, "ticker"), Vec::new()).await?;
        let wire: TickerWire = decode(body, "ticker")?;
        Ok(Ticker {
            pair: pair.clone(),
            last: wire.last,
            buy: wire.best_bid,
            sell: wire.best_ask,
            high: wire.high_24h,
            low: wire.low_24h,
            vol: wire.base_volume_24h,
            timestamp: iso8601_millis(&wire.timestamp).unwrap_or_else(|| self.ctx.now_millis()),
        })
    }

    pub(super) async fn depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let count = DEPTH_TIERS.request_size(size).unwrap_or(MAX_DEPTH);
        let body = public(
            &self.ctx,
            &self.path(pair, self.book),
            vec![("size".to_string(), count.to_string())],
        )
        .await?;
        let wire: BookWire = decode(body, "depth")?;
        Ok(depth_from_rows(
            pair,
            &wire.bids,
            &wire.asks,
            DepthColumns::PRICE_AMOUNT,
            size,
            iso8601_millis(&wire.timestamp).unwrap_or_else(|| self.ctx.now_millis()),
        ))
    }

    pub(super) async fn klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: usize,
        since: Option<i64>,
    ) -> ExchangeResult<Vec<Kline>> {
        let mut params = vec![(
            "granularity".to_string(),
            period_code(PERIODS, VENUE, period)?.to_string(),
        )];
        if let Some(since) = since {
            params.push(("start".to_string(), millis_to_iso8601(since)?));
        }
        let body = public(&self.ctx, &self.path(pair, "candles"), params).await?;
        let rows: Vec<Value> = decode(body, "candles")?;
        Ok(KLINE_COLUMNS.klines(pair, &rows, size.min(MAX_KLINES)))
    }

    /// Latest trades; `since` (Unix ms) filters the returned window
    pub(super) async fn trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let body = public(
            &self.ctx,
            &self.path(pair, "trades"),
            vec![("limit".to_string(), "100".to_string())],
        )
        .await?;
        let rows: Vec<TradeWire> = decode(body, "trades")?;
        let mut trades: Vec<Trade> = rows
            .into_iter()
            .map(|t| Trade {
                pair: pair.clone(),
                tid: t.trade_id,
                side: if t.side == "sell" { TradeSide::Sell } else { TradeSide::Buy },
                price: t.price,
                amount: t.size,
                timestamp: iso8601_millis(&t.timestamp).unwrap_or(0),
            })
            .filter(|t| since.map_or(true, |s| t.timestamp >= s))
            .collect();
        trades.sort_by_key(|t| t.timestamp);
        Ok(trades)
    }
}

// ============================================================================
// Spot and margin orders
// ============================================================================

#[derive(Debug, Deserialize)]
struct PlacedWire {
    #[serde(deserialize_with = "de::string_or_number")]
    order_id: String,
    #[serde(default)]
    client_oid: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct SpotOrderWire {
    #[serde(deserialize_with = "de::string_or_number")]
    order_id: String,
    #[serde(default)]
    client_oid: String,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    size: Decimal,
    #[serde(default)]
    side: String,
    #[serde(default, rename = "type")]
    order_type: String,
    #[serde(default)]
    timestamp: Value,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    filled_size: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    filled_notional: Decimal,
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    price_avg: Option<Decimal>,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    fee: Decimal,
    #[serde(default, deserialize_with = "de::lossy_i64")]
    state: i64,
}

impl SpotOrderWire {
    pub(super) fn into_order(self, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let order_type = if self.order_type == "market" {
            OrderType::Market
        } else {
            OrderType::Limit
        };
        let side = TradeSide::from_parts(self.side == "buy", order_type);
        let avg = self
            .price_avg
            .filter(|p| !p.is_zero())
            .or_else(|| tradewire_types::average_price(self.filled_notional, self.filled_size));
        let status = status(self.state);
        let created = iso8601_millis(&self.timestamp);

        // Market buys are sized in quote, so the base amount is the fill
        let amount = if side == TradeSide::BuyMarket { Decimal::ZERO } else { self.size };
        Ok(Order::new(self.order_id, pair.clone(), side, self.price, amount)
            .with_fill(self.filled_size, avg)?
            .with_status(status)
            .with_fee(self.fee.abs())
            .with_client_order_id(self.client_oid)
            .with_times(created, None))
    }
}

/// Order body for `/api/{spot,margin}/v3/orders`
pub(super) fn spot_order_body(
    amount: Decimal,
    price: Decimal,
    pair: &CurrencyPair,
    side: TradeSide,
    margin_trading: &str,
) -> Value {
    let mut body = serde_json::json!({
        "client_oid": client_oid(),
        "instrument_id": SYMBOL.render(pair),
        "side": if side.is_buy() { "buy" } else { "sell" },
        "type": if side.is_market() { "market" } else { "limit" },
        "order_type": "0",
        "margin_trading": margin_trading,
    });
    match side {
        TradeSide::Buy | TradeSide::Sell => {
            body["price"] = price.normalize().to_string().into();
            body["size"] = amount.normalize().to_string().into();
        }
        // Market buys take a quote notional
        TradeSide::BuyMarket => {
            body["notional"] = (amount * price).normalize().to_string().into();
        }
        TradeSide::SellMarket => {
            body["size"] = amount.normalize().to_string().into();
        }
    }
    body
}

/// Placement response turned into a fresh order
pub(super) fn placed_order(
    body: Value,
    amount: Decimal,
    price: Decimal,
    pair: &CurrencyPair,
    side: TradeSide,
) -> ExchangeResult<Order> {
    let placed: PlacedWire = decode(body, "order")?;
    let limit_price = if side.is_market() { Decimal::ZERO } else { price };
    Ok(Order::new(placed.order_id, pair.clone(), side, limit_price, amount)
        .with_client_order_id(placed.client_oid))
}

/// Offset into, and `limit` for, a newest-first order list covering `page`
pub(super) fn history_window(page: &PageRequest) -> ExchangeResult<(usize, usize)> {
    let offset = page.offset() as usize;
    let limit = (offset + page.page_size as usize).min(MAX_HISTORY);
    if offset >= limit {
        return Err(ExchangeError::InvalidParameter(format!(
            "{} order history reaches back {} orders",
            VENUE, MAX_HISTORY
        )));
    }
    Ok((offset, limit))
}

pub(super) fn history_page(orders: Vec<Order>, page: &PageRequest, offset: usize, limit: usize) -> Page<Order> {
    let fetched = orders.len();
    let items = orders
        .into_iter()
        .skip(offset)
        .take(page.page_size as usize)
        .collect();
    Page::new(items, fetched == limit && limit < MAX_HISTORY)
}
