//! Bitfinex
//!
//! - Symbols: `btcusd` on v1, `tBTCUSD` on v2 candles; DASH, QTUM and IOTA use
//!   three-letter tickers and USDT is quoted as USD
//! - Signing: base64 JSON payload in `X-BFX-PAYLOAD`, HMAC-SHA384 in `X-BFX-SIGNATURE`
//! - Errors: `{"message": "..."}` or `{"error": "ERR_RATE_LIMIT"}`; v2 `["error", 10020, "..."]`
//! - Account: the `exchange` wallet; every wallet via [`Bitfinex::wallet_balances`]

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{instrument, warn};
use tradewire_auth::{PayloadScheme, SignScheme};
use tradewire_http::{HttpRequest, HttpResponse};
use tradewire_types::coerce::{de, value_to_string};
use tradewire_types::{
    adapt_from_bitfinex_ticker, adapt_to_bitfinex_ticker, Account, Currency, CurrencyPair, Depth,
    DepthRecord, ErrorTable, ExchangeError, ExchangeResult, Kline, KlinePeriod, Order, OrderType, Page,
    PageRequest, SubAccount, SymbolFormat, Ticker, Trade, TradeSide, TradeStatus, VenueErrorKind,
};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::{
    decode, ensure_success, fractional_seconds_millis, parse_body, period_code, DepthTiers, KlineColumns,
    TimeUnit,
};

pub const VENUE: &str = "bitfinex.com";
pub const BASE_URL: &str = "https://api.bitfinex.com";

pub const SYMBOL: SymbolFormat = SymbolFormat::lower("");
const CANDLE_SYMBOL: SymbolFormat = SymbolFormat::upper("");
const DEPTH_TIERS: DepthTiers = DepthTiers::Any { max: 100 };
const KLINE_COLUMNS: KlineColumns = KlineColumns {
    time: 0,
    open: 1,
    close: 2,
    high: 3,
    low: 4,
    volume: 5,
    unit: TimeUnit::Millis,
};
const MAX_KLINES: usize = 10_000;
const MAX_HISTORY: usize = 100;
const TRADES_LIMIT: &str = "100";

const PERIODS: &[(KlinePeriod, &str)] = &[
    (KlinePeriod::Min1, "1m"),
    (KlinePeriod::Min5, "5m"),
    (KlinePeriod::Min15, "15m"),
    (KlinePeriod::Min30, "30m"),
    (KlinePeriod::Hour1, "1h"),
    (KlinePeriod::Hour6, "6h"),
    (KlinePeriod::Hour12, "12h"),
    (KlinePeriod::Day1, "1D"),
    (KlinePeriod::Week1, "7D"),
    (KlinePeriod::Month1, "1M"),
];

const ERRORS: ErrorTable = ErrorTable {
    codes: &[("11010", VenueErrorKind::RateLimited)],
    patterns: &[
        ("err_rate_limit", VenueErrorKind::RateLimited),
        ("ratelimit", VenueErrorKind::RateLimited),
    ],
};

const SIGNER: SignScheme = SignScheme::Payload(PayloadScheme {
    key_header: "X-BFX-APIKEY",
    payload_header: "X-BFX-PAYLOAD",
    sign_header: "X-BFX-SIGNATURE",
});

/// The `exchange` wallet backs spot trading
pub const EXCHANGE_WALLET: &str = "exchange";

/// v1 symbol, e.g. `dshusd` for DASH/USDT
pub fn venue_symbol(pair: &CurrencyPair) -> ExchangeResult<String> {
    Ok(SYMBOL.render(&pair.map_currencies(adapt_to_bitfinex_ticker)?))
}

fn candle_symbol(pair: &CurrencyPair) -> ExchangeResult<String> {
    Ok(format!("t{}", CANDLE_SYMBOL.render(&pair.map_currencies(adapt_to_bitfinex_ticker)?)))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TickerWire {
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    last_price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    bid: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    ask: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    high: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    low: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    volume: Decimal,
    #[serde(default)]
    timestamp: Value,
}

#[derive(Debug, Deserialize)]
struct LevelWire {
    #[serde(deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "de::lossy_decimal")]
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default)]
    bids: Vec<LevelWire>,
    #[serde(default)]
    asks: Vec<LevelWire>,
}

#[derive(Debug, Deserialize)]
struct TradeWire {
    #[serde(deserialize_with = "de::string_or_number")]
    tid: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    amount: Decimal,
    #[serde(default)]
    timestamp: Value,
    #[serde(default, rename = "type")]
    side: String,
}

#[derive(Debug, Deserialize)]
struct OrderWire {
    #[serde(deserialize_with = "de::string_or_number")]
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    avg_execution_price: Option<Decimal>,
    #[serde(default)]
    side: String,
    #[serde(default, rename = "type")]
    order_type: String,
    #[serde(default)]
    timestamp: Value,
    #[serde(default)]
    is_live: Option<bool>,
    #[serde(default)]
    is_cancelled: bool,
    #[serde(deserialize_with = "de::strict_decimal")]
    original_amount: Decimal,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    executed_amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct BalanceWire {
    #[serde(rename = "type")]
    wallet: String,
    currency: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    amount: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    available: Decimal,
}

// ============================================================================
// Normalizers
// ============================================================================

fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let body = parse_body(response)?;
    if let Some((code, message)) = envelope_error(&body, response.is_success()) {
        warn!(venue = VENUE, message = %message, "Venue rejected request");
        return Err(ERRORS.error(code, message));
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body)
}

fn envelope_error(body: &Value, success: bool) -> Option<(Option<String>, String)> {
    match body {
        Value::Object(map) => {
            if let Some(error) = map.get("error") {
                return Some((None, value_to_string(error)));
            }
            if !success {
                return map.get("message").map(|m| (None, value_to_string(m)));
            }
            None
        }
        Value::Array(items) if items.first().and_then(Value::as_str) == Some("error") => Some((
            items.get(1).map(value_to_string),
            items.get(2).map(value_to_string).unwrap_or_default(),
        )),
        _ => None,
    }
}

/// An order that left the book without filling counts as canceled even when
/// `is_cancelled` is false, as with expired or immediate-or-cancel orders
fn status(wire: &OrderWire) -> TradeStatus {
    if wire.is_cancelled {
        TradeStatus::Canceled
    } else if wire.original_amount > Decimal::ZERO && wire.executed_amount >= wire.original_amount {
        TradeStatus::Filled
    } else if wire.is_live == Some(false) {
        TradeStatus::Canceled
    } else if wire.executed_amount > Decimal::ZERO {
        TradeStatus::PartiallyFilled
    } else {
        TradeStatus::Unfinished
    }
}

fn parse_order(pair: &CurrencyPair, wire: OrderWire) -> ExchangeResult<Order> {
    let order_type = if wire.order_type.contains("market") {
        OrderType::Market
    } else {
        OrderType::Limit
    };
    let side = TradeSide::from_parts(wire.side == "buy", order_type);
    let status = status(&wire);
    let created = fractional_seconds_millis(&wire.timestamp);
    Ok(
        Order::new(wire.id, pair.clone(), side, wire.price, wire.original_amount)
            .with_fill(wire.executed_amount, wire.avg_execution_price)?
            .with_status(status)
            .with_times(created, None),
    )
}

fn parse_wallets(body: Value) -> ExchangeResult<HashMap<String, Account>> {
    let rows: Vec<BalanceWire> = decode(body, "balances")?;
    let mut wallets: HashMap<String, Account> = HashMap::new();
    for row in rows {
        let currency = adapt_from_bitfinex_ticker(Currency::new(&row.currency));
        let frozen = (row.amount - row.available).max(Decimal::ZERO);
        wallets
            .entry(row.wallet)
            .or_insert_with(|| Account::new(VENUE))
            .add(SubAccount::new(currency, row.available, frozen));
    }
    Ok(wallets)
}

// ============================================================================
// Adapter
// ============================================================================

/// Bitfinex adapter (v1 trading, v2 candles)
#[derive(Debug)]
pub struct Bitfinex {
    ctx: RestContext,
}

impl Bitfinex {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self {
            ctx: RestContext::new(VENUE, BASE_URL, config)?,
        })
    }

    /// Nonces come from the local clock; same as [`new`](Self::new)
    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        Self::new(config)
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    /// Balances of every wallet, keyed by wallet type (`exchange`, `trading`, `deposit`)
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn wallet_balances(&self) -> ExchangeResult<HashMap<String, Account>> {
        let body = self.private("balances", json!({})).await?;
        parse_wallets(body)
    }

    async fn public(&self, path: &str, params: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.get(path, &params).await?;
        check(&response)
    }

    fn private_request(&self, endpoint: &str, payload: Value) -> ExchangeResult<HttpRequest> {
        let path = format!("/v1/{}", endpoint);
        let payload = payload.to_string();
        let signed = self.ctx.sign(&SIGNER, "POST", &path, Vec::new(), Some(&payload))?;
        let mut request = HttpRequest::post(self.ctx.url(&path)).with_headers(signed.headers);
        if let Some(body) = signed.body {
            request = request.with_json(body);
        }
        Ok(request)
    }

    async fn private(&self, endpoint: &str, payload: Value) -> ExchangeResult<Value> {
        let response = self.ctx.send(self.private_request(endpoint, payload)?).await?;
        check(&response)
    }

    fn order_id_payload(order_id: &str) -> ExchangeResult<Value> {
        let id: u64 = order_id
            .parse()
            .map_err(|_| ExchangeError::InvalidParameter(format!("order id {:?} is not numeric", order_id)))?;
        Ok(json!({ "order_id": id }))
    }

    async fn place(
        &self,
        amount: Decimal,
        price: Decimal,
        pair: &CurrencyPair,
        side: TradeSide,
    ) -> ExchangeResult<Order> {
        // v1 wants a positive price even where it ignores it
        let wire_price = if side.is_market() && price <= Decimal::ZERO {
            Decimal::ONE
        } else {
            price
        };
        let payload = json!({
            "symbol": venue_symbol(pair)?,
            "amount": amount.normalize().to_string(),
            "price": wire_price.normalize().to_string(),
            "side": if side.is_buy() { "buy" } else { "sell" },
            "type": if side.is_market() { "exchange market" } else { "exchange limit" },
            "exchange": "bitfinex",
        });
        let request = self.private_request("order/new", payload)?;
        let response = self.ctx.send_order(request).await?;
        let wire: OrderWire = decode(check(&response)?, "order")?;
        let mut order = parse_order(pair, wire)?;
        order.side = side;
        if side.is_market() {
            order.price = Decimal::ZERO;
        }
        Ok(order)
    }

    async fn orders_for(&self, endpoint: &str, payload: Value, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        let symbol = venue_symbol(pair)?;
        let body = self.private(endpoint, payload).await?;
        decode::<Vec<OrderWire>>(body, endpoint)?
            .into_iter()
            .filter(|o| o.symbol.eq_ignore_ascii_case(&symbol))
            .map(|o| parse_order(pair, o))
            .collect()
    }
}

#[async_trait]
impl Exchange for Bitfinex {
    fn venue(&self) -> &'static str {
        VENUE
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let body = self
            .public(&format!("/v1/pubticker/{}", venue_symbol(pair)?), Vec::new())
            .await?;
        let wire: TickerWire = decode(body, "ticker")?;
        Ok(Ticker {
            pair: pair.clone(),
            last: wire.last_price,
            buy: wire.bid,
            sell: wire.ask,
            high: wire.high,
            low: wire.low,
            vol: wire.volume,
            timestamp: fractional_seconds_millis(&wire.timestamp).unwrap_or_else(|| self.ctx.now_millis()),
        })
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let count = DEPTH_TIERS.request_size(size).unwrap_or(size).to_string();
        let body = self
            .public(
                &format!("/v1/book/{}", venue_symbol(pair)?),
                vec![
                    ("limit_bids".to_string(), count.clone()),
                    ("limit_asks".to_string(), count),
                ],
            )
            .await?;
        let wire: BookWire = decode(body, "depth")?;
        let side = |levels: Vec<LevelWire>| -> Vec<DepthRecord> {
            levels
                .into_iter()
                .map(|l| DepthRecord::new(l.price, l.amount))
                .collect()
        };
        Ok(Depth::from_unsorted(
            pair.clone(),
            side(wire.bids),
            side(wire.asks),
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
        let limit = if size == 0 { 100 } else { size.min(MAX_KLINES) };
        let mut params = vec![("limit".to_string(), limit.to_string())];
        if let Some(since) = since {
            params.push(("start".to_string(), since.to_string()));
            params.push(("sort".to_string(), "1".to_string()));
        }
        let body = self
            .public(
                &format!("/v2/candles/trade:{}:{}/hist", code, candle_symbol(pair)?),
                params,
            )
            .await?;
        let rows: Vec<Value> = decode(body, "candles")?;
        Ok(KLINE_COLUMNS.klines(pair, &rows, size))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let mut params = vec![("limit_trades".to_string(), TRADES_LIMIT.to_string())];
        if let Some(since) = since {
            params.push(("timestamp".to_string(), (since / 1000).to_string()));
        }
        let body = self
            .public(&format!("/v1/trades/{}", venue_symbol(pair)?), params)
            .await?;
        let rows: Vec<TradeWire> = decode(body, "trades")?;
        let mut trades: Vec<Trade> = rows
            .into_iter()
            .map(|t| Trade {
                pair: pair.clone(),
                tid: t.tid,
                side: if t.side == "sell" { TradeSide::Sell } else { TradeSide::Buy },
                price: t.price,
                amount: t.amount,
                timestamp: fractional_seconds_millis(&t.timestamp).unwrap_or(0),
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

    /// True once the venue accepts the cancel request; cancellation itself is asynchronous
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn cancel_order(&self, order_id: &str, _pair: &CurrencyPair) -> ExchangeResult<bool> {
        let request = self.private_request("order/cancel", Self::order_id_payload(order_id)?)?;
        let response = self.ctx.send_order(request).await?;
        let body = check(&response)?;
        Ok(body.get("id").map_or(false, |id| !id.is_null()))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let body = self
            .private("order/status", Self::order_id_payload(order_id)?)
            .await?;
        parse_order(pair, decode(body, "order")?)
    }

    /// Every active order is returned by the venue; the result is filtered to `pair`
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        self.orders_for("orders", json!({}), pair).await
    }

    /// Inactive orders of the last few days, newest first, filtered to `pair`
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
        let symbol = venue_symbol(pair)?;
        let body = self.private("orders/hist", json!({ "limit": limit })).await?;
        let wire: Vec<OrderWire> = decode(body, "orders/hist")?;
        let fetched = wire.len();
        let items = wire
            .into_iter()
            .filter(|o| o.symbol.eq_ignore_ascii_case(&symbol))
            .map(|o| parse_order(pair, o))
            .collect::<ExchangeResult<Vec<_>>>()?
            .into_iter()
            .skip(offset)
            .take(page.page_size as usize)
            .collect();
        Ok(Page::new(items, fetched == limit && limit < MAX_HISTORY))
    }

    /// The `exchange` wallet
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        Ok(self
            .wallet_balances()
            .await?
            .remove(EXCHANGE_WALLET)
            .unwrap_or_else(|| Account::new(VENUE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tradewire_auth::{Credentials, FixedClock};
    use tradewire_http::{MockHttpClient, RequestBody};

    const NOW: i64 = 1_700_000_000_000;

    fn adapter(mock: Arc<MockHttpClient>) -> Bitfinex {
        Bitfinex::new(
            VenueConfig::new()
                .with_http_client(mock)
                .with_clock(Arc::new(FixedClock::new(NOW)))
                .with_credentials(Credentials::new("key", "secret")),
        )
        .unwrap()
    }

    fn order_json(id: u64, symbol: &str, executed: &str, cancelled: bool) -> Value {
        json!({
            "id": id, "symbol": symbol, "exchange": "bitfinex", "price": "30000.0",
            "avg_execution_price": "30000.0", "side": "buy", "type": "exchange limit",
            "timestamp": "1700000000.5", "is_live": !cancelled, "is_cancelled": cancelled,
            "original_amount": "1.0", "remaining_amount": "0.0", "executed_amount": executed
        })
    }

    #[test]
    fn test_symbol_aliases() {
        let dash = CurrencyPair::new(Currency::DASH, Currency::USDT).unwrap();
        assert_eq!(venue_symbol(&dash).unwrap(), "dshusd");
        assert_eq!(candle_symbol(&dash).unwrap(), "tDSHUSD");
        assert_eq!(venue_symbol(&CurrencyPair::ETH_BTC).unwrap(), "ethbtc");
    }

    #[test]
    fn test_order_status_derivation() {
        let wire: OrderWire = serde_json::from_value(order_json(1, "btcusd", "0.4", false)).unwrap();
        assert_eq!(status(&wire), TradeStatus::PartiallyFilled);
        let wire: OrderWire = serde_json::from_value(order_json(1, "btcusd", "1.0", false)).unwrap();
        assert_eq!(status(&wire), TradeStatus::Filled);
        let wire: OrderWire = serde_json::from_value(order_json(1, "btcusd", "0.4", true)).unwrap();
        assert_eq!(status(&wire), TradeStatus::Canceled);
        let wire: OrderWire = serde_json::from_value(order_json(1, "btcusd", "0.0", false)).unwrap();
        assert_eq!(status(&wire), TradeStatus::Unfinished);
    }

    #[test]
    fn test_order_off_book_without_cancel_flag() {
        let mut body = order_json(1, "btcusd", "0.4", false);
        body["is_live"] = json!(false);
        let wire: OrderWire = serde_json::from_value(body).unwrap();
        assert_eq!(status(&wire), TradeStatus::Canceled);

        let mut body = order_json(1, "btcusd", "1.0", false);
        body["is_live"] = json!(false);
        let wire: OrderWire = serde_json::from_value(body).unwrap();
        assert_eq!(status(&wire), TradeStatus::Filled);

        let mut body = order_json(1, "btcusd", "0.4", false);
        body.as_object_mut().unwrap().remove("is_live");
        let wire: OrderWire = serde_json::from_value(body).unwrap();
        assert_eq!(status(&wire), TradeStatus::PartiallyFilled);
    }

    #[tokio::test]
    async fn test_ticker() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({
                "mid": "30000.5", "bid": "30000.0", "ask": "30001.0", "last_price": "30000.2",
                "low": "29000", "high": "31000", "volume": "5000.1", "timestamp": "1700000000.25"
            })
            .to_string(),
        );
        let ticker = adapter(mock.clone()).get_ticker(&CurrencyPair::BTC_USDT).await.unwrap();
        assert_eq!(ticker.last, dec!(30000.2));
        assert_eq!(ticker.timestamp, 1_700_000_000_250);
        assert!(mock.last_request().unwrap().url.ends_with("/v1/pubticker/btcusd"));
    }

    #[tokio::test]
    async fn test_unknown_symbol_message() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_json(400, json!({"message": "Unknown symbol"}).to_string());
        let err = adapter(mock).get_ticker(&CurrencyPair::BTC_USDT).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Venue { kind: VenueErrorKind::Other, .. }));
    }

    #[tokio::test]
    async fn test_depth_object_levels() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({
                "bids": [{"price": "29999", "amount": "1", "timestamp": "1700000000.0"},
                         {"price": "30000", "amount": "2", "timestamp": "1700000000.0"}],
                "asks": [{"price": "30002", "amount": "1", "timestamp": "1700000000.0"},
                         {"price": "30001", "amount": "3", "timestamp": "1700000000.0"}]
            })
            .to_string(),
        );
        let depth = adapter(mock.clone()).get_depth(1, &CurrencyPair::BTC_USD).await.unwrap();
        assert_eq!(depth.bids.len(), 1);
        assert_eq!(depth.bids[0].price, dec!(30000));
        assert_eq!(depth.asks[0].price, dec!(30001));
        assert!(mock.last_request().unwrap().url.contains("limit_bids=1&limit_asks=1"));
    }

    #[tokio::test]
    async fn test_v2_candles_and_error_array() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!([
                [1700003600000i64, "2", "2.5", "3", "1.5", "20"],
                [1700000000000i64, "1", "2", "2.2", "0.9", "10"]
            ])
            .to_string(),
        );
        mock.push_json(500, json!(["error", 10020, "limit: invalid"]).to_string());
        let bfx = adapter(mock.clone());

        let klines = bfx
            .get_klines(&CurrencyPair::BTC_USD, KlinePeriod::Hour1, 2, None)
            .await
            .unwrap();
        assert_eq!(klines[0].timestamp, 1_700_000_000);
        assert_eq!(klines[0].close, dec!(2));
        assert_eq!(klines[0].high, dec!(2.2));
        assert!(mock
            .last_request()
            .unwrap()
            .url
            .contains("/v2/candles/trade:1h:tBTCUSD/hist?limit=2"));

        let err = bfx
            .get_klines(&CurrencyPair::BTC_USD, KlinePeriod::Hour1, 2, None)
            .await
            .unwrap_err();
        match err {
            ExchangeError::Venue { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("10020"));
                assert_eq!(message, "limit: invalid");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_place_signs_payload() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(order_json(448364249, "btcusd", "0.0", false).to_string());
        let order = adapter(mock.clone())
            .market_buy(dec!(1), Decimal::ZERO, &CurrencyPair::BTC_USD)
            .await
            .unwrap();
        assert_eq!(order.order_id, "448364249");
        assert_eq!(order.side, TradeSide::BuyMarket);
        assert_eq!(order.price, Decimal::ZERO);

        let req = mock.last_request().unwrap();
        assert!(req.url.ends_with("/v1/order/new"));
        assert_eq!(req.header("X-BFX-APIKEY"), Some("key"));
        assert!(req.header("X-BFX-SIGNATURE").is_some());
        let body: Value = match &req.body {
            RequestBody::Json(text) => serde_json::from_str(text).unwrap(),
            other => panic!("expected JSON, got {:?}", other),
        };
        assert_eq!(body["request"], "/v1/order/new");
        assert_eq!(body["type"], "exchange market");
        assert_eq!(body["price"], "1");
    }

    #[tokio::test]
    async fn test_cancel_rejects_non_numeric_id() {
        let mock = Arc::new(MockHttpClient::new());
        let err = adapter(mock.clone())
            .cancel_order("abc", &CurrencyPair::BTC_USD)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidParameter(_)));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_open_orders_filtered() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(json!([order_json(1, "btcusd", "0.4", false), order_json(2, "ethusd", "0", false)]).to_string());
        let orders = adapter(mock).get_open_orders(&CurrencyPair::BTC_USD).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].deal_amount, dec!(0.4));
        assert_eq!(orders[0].created_at, Some(1_700_000_000_500));
    }

    #[tokio::test]
    async fn test_wallets_kept_separate() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!([
                {"type": "exchange", "currency": "btc", "amount": "1.5", "available": "1.0"},
                {"type": "trading", "currency": "btc", "amount": "2", "available": "2"},
                {"type": "exchange", "currency": "dsh", "amount": "3", "available": "3"}
            ])
            .to_string(),
        );
        let account = adapter(mock).get_account().await.unwrap();
        let btc = account.get(&Currency::BTC).unwrap();
        assert_eq!(btc.available, dec!(1.0));
        assert_eq!(btc.frozen, dec!(0.5));
        assert_eq!(account.available(&Currency::DASH), dec!(3));
    }
}
