//! KuCoin v1
//!
//! - Symbols: `BTC-USDT`
//! - Signing: base64 HMAC-SHA256 over `timestamp + METHOD + path + body`, `KC-API-*` headers,
//!   passphrase signed with the secret (key version 2)
//! - Errors: `{"code": "400100", "msg": "..."}`; success is `{"code": "200000", "data": ...}`
//! - Trade history times are nanoseconds

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{instrument, warn};
use tradewire_auth::{PassphraseMode, PrehashScheme, SignScheme, TimestampFormat};
use tradewire_http::{HttpRequest, HttpResponse, Method};
use tradewire_types::coerce::{de, i64_from_value, value_to_string};
use tradewire_types::{
    adapt_bcc_to_bch, average_price, Account, Currency, CurrencyPair, Depth, ErrorTable, ExchangeError,
    ExchangeResult, Kline, KlinePeriod, Order, OrderType, Page, PageRequest, SubAccount, SymbolFormat, Ticker,
    Trade, TradeSide, TradeStatus, VenueErrorKind,
};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::{
    decode, depth_from_rows, ensure_success, parse_body, period_code, DepthColumns, DepthTiers, KlineColumns,
    TimeUnit,
};

pub const VENUE: &str = "kucoin.com";
pub const BASE_URL: &str = "https://api.kucoin.com";
pub const SANDBOX_URL: &str = "https://openapi-sandbox.kucoin.com";

pub const SYMBOL: SymbolFormat = SymbolFormat::upper("-");
const DEPTH_TIERS: DepthTiers = DepthTiers::Tiers(&[20, 100]);
/// `[time, open, close, high, low, volume, turnover]`
const KLINE_COLUMNS: KlineColumns = KlineColumns {
    time: 0,
    open: 1,
    close: 2,
    high: 3,
    low: 4,
    volume: 5,
    unit: TimeUnit::Seconds,
};
const SUCCESS: &str = "200000";

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
    (KlinePeriod::Week1, "1week"),
];

const ERRORS: ErrorTable = ErrorTable {
    codes: &[
        ("200004", VenueErrorKind::InsufficientBalance),
        ("400100", VenueErrorKind::Other),
        ("400600", VenueErrorKind::OrderNotFound),
        ("429000", VenueErrorKind::RateLimited),
    ],
    patterns: &[("order not exist", VenueErrorKind::OrderNotFound)],
};

const SIGNER: SignScheme = SignScheme::Prehash(PrehashScheme {
    timestamp: TimestampFormat::UnixMillis,
    key_header: "KC-API-KEY",
    sign_header: "KC-API-SIGN",
    timestamp_header: "KC-API-TIMESTAMP",
    passphrase_header: "KC-API-PASSPHRASE",
    passphrase: PassphraseMode::Signed,
    extra_headers: &[("KC-API-KEY-VERSION", "2")],
});

/// Order state from the activity and cancel flags
///
/// A live order with a pending cancel is `CancelPending`; a done order is
/// `Canceled` when a cancel exists and `Filled` otherwise.
fn status(is_active: bool, cancel_exist: bool, deal_size: Decimal) -> TradeStatus {
    match (is_active, cancel_exist) {
        (true, true) => TradeStatus::CancelPending,
        (true, false) if deal_size > Decimal::ZERO => TradeStatus::PartiallyFilled,
        (true, false) => TradeStatus::Unfinished,
        (false, true) => TradeStatus::Canceled,
        (false, false) => TradeStatus::Filled,
    }
}

fn client_oid() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StatsWire {
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    last: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    buy: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    sell: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    high: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    low: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    vol: Decimal,
    #[serde(default)]
    time: Value,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
    #[serde(default)]
    time: Value,
}

#[derive(Debug, Deserialize)]
struct TradeWire {
    #[serde(deserialize_with = "de::string_or_number")]
    sequence: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    size: Decimal,
    #[serde(default)]
    side: String,
    /// Nanoseconds
    #[serde(deserialize_with = "de::lossy_i64")]
    time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacedWire {
    order_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelWire {
    #[serde(default)]
    cancelled_order_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderWire {
    id: String,
    #[serde(default)]
    side: String,
    #[serde(default, rename = "type")]
    order_type: String,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    size: Decimal,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    deal_size: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    deal_funds: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    fee: Decimal,
    #[serde(default)]
    client_oid: String,
    #[serde(default, deserialize_with = "de::lossy_i64")]
    created_at: i64,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    cancel_exist: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderPageWire {
    #[serde(default, deserialize_with = "de::lossy_i64")]
    current_page: i64,
    #[serde(default, deserialize_with = "de::lossy_i64")]
    total_page: i64,
    #[serde(default)]
    items: Vec<OrderWire>,
}

/// One entry of `/api/v1/accounts`; a currency may appear once per account type
#[derive(Debug, Clone, Deserialize)]
pub struct AccountWire {
    pub id: String,
    pub currency: String,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    pub balance: Decimal,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    pub available: Decimal,
    #[serde(default, deserialize_with = "de::strict_decimal")]
    pub holds: Decimal,
}

// ============================================================================
// Normalizers
// ============================================================================

/// Unwrap `{code, data}`
fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let mut body = parse_body(response)?;
    if let Some(code) = body.get("code").map(value_to_string) {
        if code != SUCCESS {
            let message = body.get("msg").map(value_to_string).unwrap_or_default();
            warn!(venue = VENUE, code = %code, message = %message, "Venue rejected request");
            return Err(ERRORS.error(Some(code), message));
        }
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body.get_mut("data").map(Value::take).unwrap_or(Value::Null))
}

fn parse_order(pair: &CurrencyPair, wire: OrderWire) -> ExchangeResult<Order> {
    let order_type = if wire.order_type == "market" {
        OrderType::Market
    } else {
        OrderType::Limit
    };
    let side = TradeSide::from_parts(wire.side == "buy", order_type);
    let status = status(wire.is_active, wire.cancel_exist, wire.deal_size);
    let created = Some(wire.created_at).filter(|t| *t > 0);
    Ok(Order::new(wire.id, pair.clone(), side, wire.price, wire.size)
        .with_fill(wire.deal_size, average_price(wire.deal_funds, wire.deal_size))?
        .with_status(status)
        .with_fee(wire.fee)
        .with_client_order_id(wire.client_oid)
        .with_times(created, None))
}

fn parse_orders(pair: &CurrencyPair, rows: Vec<OrderWire>) -> ExchangeResult<Vec<Order>> {
    rows.into_iter().map(|o| parse_order(pair, o)).collect()
}

/// Balances summed over account types
fn parse_accounts(rows: Vec<AccountWire>) -> Account {
    let mut account = Account::new(VENUE);
    for row in rows {
        account.add(SubAccount::new(
            adapt_bcc_to_bch(Currency::new(&row.currency)),
            row.available,
            row.holds,
        ));
    }
    account
}

// ============================================================================
// Adapter
// ============================================================================

/// KuCoin spot adapter
#[derive(Debug)]
pub struct KuCoin {
    ctx: RestContext,
}

impl KuCoin {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self {
            ctx: RestContext::new(VENUE, BASE_URL, config)?,
        })
    }

    /// Build and align the clock with the server
    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        let kucoin = Self::new(config)?;
        kucoin.ctx.sync_clock(kucoin.server_time().await);
        Ok(kucoin)
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    /// Server time in Unix milliseconds
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn server_time(&self) -> ExchangeResult<i64> {
        let data = self.public("/api/v1/timestamp", Vec::new()).await?;
        i64_from_value(&data).ok_or_else(|| ExchangeError::normalization("timestamp", format!("unreadable: {}", data)))
    }

    /// Every account, one entry per currency and account type
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn accounts(&self) -> ExchangeResult<Vec<AccountWire>> {
        let data = self.private(Method::Get, "/api/v1/accounts", Vec::new()).await?;
        decode(data, "accounts")
    }

    async fn public(&self, path: &str, query: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.get(path, &query).await?;
        check(&response)
    }

    fn private_request(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<&Value>,
    ) -> ExchangeResult<HttpRequest> {
        let body = body.map(Value::to_string);
        let signed = self.ctx.sign(&SIGNER, method.as_str(), path, query, body.as_deref())?;
        let mut request =
            HttpRequest::new(method, self.ctx.url_with_query(path, &signed.params)?).with_headers(signed.headers);
        if let Some(body) = signed.body {
            request = request.with_json(body);
        }
        Ok(request)
    }

    async fn private(&self, method: Method, path: &str, query: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.send(self.private_request(method, path, query, None)?).await?;
        check(&response)
    }

    async fn place(
        &self,
        amount: Decimal,
        price: Decimal,
        pair: &CurrencyPair,
        side: TradeSide,
    ) -> ExchangeResult<Order> {
        let client_oid = client_oid();
        let mut body = json!({
            "clientOid": client_oid,
            "side": if side.is_buy() { "buy" } else { "sell" },
            "symbol": SYMBOL.render(pair),
            "type": if side.is_market() { "market" } else { "limit" },
            "size": amount.normalize().to_string(),
        });
        if !side.is_market() {
            body["price"] = price.normalize().to_string().into();
        }
        let request = self.private_request(Method::Post, "/api/v1/orders", Vec::new(), Some(&body))?;
        let response = self.ctx.send_order(request).await?;
        let placed: PlacedWire = decode(check(&response)?, "order")?;
        let price = if side.is_market() { Decimal::ZERO } else { price };
        Ok(Order::new(placed.order_id, pair.clone(), side, price, amount)
            .with_client_order_id(client_oid)
            .with_times(Some(self.ctx.now_millis()), None))
    }

    async fn order_page(&self, pair: &CurrencyPair, state: &str, page: &PageRequest) -> ExchangeResult<OrderPageWire> {
        let data = self
            .private(
                Method::Get,
                "/api/v1/orders",
                params(&[
                    ("status", state),
                    ("symbol", &SYMBOL.render(pair)),
                    ("currentPage", &page.page.to_string()),
                    ("pageSize", &page.page_size.to_string()),
                ]),
            )
            .await?;
        decode(data, "orders")
    }
}

#[async_trait]
impl Exchange for KuCoin {
    fn venue(&self) -> &'static str {
        VENUE
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let data = self
            .public("/api/v1/market/stats", params(&[("symbol", &SYMBOL.render(pair))]))
            .await?;
        let wire: StatsWire = decode(data, "ticker")?;
        Ok(Ticker {
            pair: pair.clone(),
            last: wire.last,
            buy: wire.buy,
            sell: wire.sell,
            high: wire.high,
            low: wire.low,
            vol: wire.vol,
            timestamp: i64_from_value(&wire.time).unwrap_or_else(|| self.ctx.now_millis()),
        })
    }

    /// Level-2 snapshot of 20 or 100 levels, trimmed to `size`
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let levels = DEPTH_TIERS.request_size(size).unwrap_or(100);
        let data = self
            .public(
                &format!("/api/v1/market/orderbook/level2_{}", levels),
                params(&[("symbol", &SYMBOL.render(pair))]),
            )
            .await?;
        let book: BookWire = decode(data, "depth")?;
        Ok(depth_from_rows(
            pair,
            &book.bids,
            &book.asks,
            DepthColumns::PRICE_AMOUNT,
            size,
            i64_from_value(&book.time).unwrap_or_else(|| self.ctx.now_millis()),
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
        let mut query = params(&[("type", code), ("symbol", &SYMBOL.render(pair))]);
        if let Some(since) = since {
            query.push(("startAt".to_string(), (since / 1000).to_string()));
        }
        let data = self.public("/api/v1/market/candles", query).await?;
        let rows: Vec<Value> = decode(data, "candles")?;
        Ok(KLINE_COLUMNS.klines(pair, &rows, size))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let data = self
            .public("/api/v1/market/histories", params(&[("symbol", &SYMBOL.render(pair))]))
            .await?;
        let rows: Vec<TradeWire> = decode(data, "trades")?;
        let since = since.unwrap_or(0);
        let mut trades: Vec<Trade> = rows
            .into_iter()
            .map(|t| Trade {
                pair: pair.clone(),
                tid: t.sequence,
                side: if t.side == "sell" { TradeSide::Sell } else { TradeSide::Buy },
                price: t.price,
                amount: t.size,
                timestamp: t.time / 1_000_000,
            })
            .filter(|t| t.timestamp >= since)
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

    /// Sized in base units; `price` is not sent
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn market_buy(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.place(amount, price, pair, TradeSide::BuyMarket).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn market_sell(&self, amount: Decimal, price: Decimal, pair: &CurrencyPair) -> ExchangeResult<Order> {
        self.place(amount, price, pair, TradeSide::SellMarket).await
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn cancel_order(&self, order_id: &str, _pair: &CurrencyPair) -> ExchangeResult<bool> {
        if order_id.is_empty() {
            return Err(ExchangeError::InvalidParameter(format!("{} cancel needs an order id", VENUE)));
        }
        let request = self.private_request(Method::Delete, &format!("/api/v1/orders/{}", order_id), Vec::new(), None)?;
        let response = self.ctx.send_order(request).await?;
        let cancelled: CancelWire = decode(check(&response)?, "cancel")?;
        Ok(cancelled.cancelled_order_ids.iter().any(|id| id == order_id))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let data = self
            .private(Method::Get, &format!("/api/v1/orders/{}", order_id), Vec::new())
            .await?;
        if data.is_null() {
            return Err(ERRORS.error(Some("400600".to_string()), format!("order {} not exist", order_id)));
        }
        parse_order(pair, decode(data, "order")?)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        let wire = self.order_page(pair, "active", &PageRequest::new(1, 500)).await?;
        parse_orders(pair, wire.items)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page: Option<PageRequest>,
    ) -> ExchangeResult<Page<Order>> {
        let page = page.unwrap_or_default();
        let wire = self.order_page(pair, "done", &page).await?;
        let has_more = wire.current_page < wire.total_page;
        Ok(Page::new(parse_orders(pair, wire.items)?, has_more))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        Ok(parse_accounts(self.accounts().await?))
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

    fn adapter(mock: Arc<MockHttpClient>) -> KuCoin {
        KuCoin::new(
            VenueConfig::new()
                .with_http_client(mock)
                .with_clock(Arc::new(FixedClock::new(NOW)))
                .with_credentials(Credentials::new("key", "secret").with_passphrase("phrase")),
        )
        .unwrap()
    }

    fn ok(data: Value) -> String {
        json!({"code": "200000", "data": data}).to_string()
    }

    #[test]
    fn test_status_flags() {
        assert_eq!(status(true, false, Decimal::ZERO), TradeStatus::Unfinished);
        assert_eq!(status(true, false, dec!(0.1)), TradeStatus::PartiallyFilled);
        assert_eq!(status(true, true, dec!(0.1)), TradeStatus::CancelPending);
        assert_eq!(status(false, true, dec!(0.1)), TradeStatus::Canceled);
        assert_eq!(status(false, false, dec!(1)), TradeStatus::Filled);
    }

    #[test]
    fn test_error_envelope() {
        let err = check(&HttpResponse::new(200, r#"{"code":"200004","msg":"Balance insufficient!"}"#)).unwrap_err();
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::InsufficientBalance));

        let err = check(&HttpResponse::new(429, r#"{"code":"429000","msg":"Too Many Requests"}"#)).unwrap_err();
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::RateLimited));
    }

    #[tokio::test]
    async fn test_connect_syncs_clock() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!(NOW - 400)));
        let kucoin = KuCoin::connect(
            VenueConfig::new()
                .with_http_client(mock)
                .with_clock(Arc::new(FixedClock::new(NOW))),
        )
        .await
        .unwrap();
        assert_eq!(kucoin.context().clock().offset_millis(), -400);
    }

    #[tokio::test]
    async fn test_ticker_from_stats() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!({"time": NOW, "symbol": "BTC-USDT", "buy": "29999", "sell": "30001",
            "high": "31000", "low": "29000", "vol": "1234.5", "volValue": "37000000", "last": "30000"})));
        let ticker = adapter(mock.clone()).get_ticker(&CurrencyPair::BTC_USDT).await.unwrap();
        assert_eq!(ticker.last, dec!(30000));
        assert_eq!(ticker.vol, dec!(1234.5));
        assert_eq!(ticker.timestamp, NOW);
        assert!(mock.last_request().unwrap().url.ends_with("/api/v1/market/stats?symbol=BTC-USDT"));
    }

    #[tokio::test]
    async fn test_depth_tier_and_trim() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!({"time": NOW, "sequence": "1",
            "bids": [["99", "1"], ["100", "2"], ["98", "1"]],
            "asks": [["102", "1"], ["101", "3"], ["103", "1"]]})));
        let depth = adapter(mock.clone()).get_depth(2, &CurrencyPair::BTC_USDT).await.unwrap();
        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.bids[0].price, dec!(100));
        assert_eq!(depth.asks[0].price, dec!(101));
        assert!(mock.last_request().unwrap().url.contains("/level2_20?"));

        mock.push_ok(ok(json!({"bids": [], "asks": []})));
        adapter(mock.clone()).get_depth(50, &CurrencyPair::BTC_USDT).await.unwrap();
        assert!(mock.last_request().unwrap().url.contains("/level2_100?"));
    }

    #[tokio::test]
    async fn test_candle_columns() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!([
            ["1700000060", "2", "2.5", "3", "1", "4", "10"],
            ["1700000000", "1", "2", "2.2", "0.5", "3", "6"]
        ])));
        let klines = adapter(mock.clone())
            .get_klines(&CurrencyPair::BTC_USDT, KlinePeriod::Min1, 10, Some(NOW))
            .await
            .unwrap();
        assert_eq!(klines[0].timestamp, 1_700_000_000);
        assert_eq!(klines[1].close, dec!(2.5));
        assert_eq!(klines[1].high, dec!(3));
        assert_eq!(klines[1].vol, dec!(4));
        assert!(mock.last_request().unwrap().url.contains("startAt=1700000000"));
    }

    #[tokio::test]
    async fn test_trades_nanoseconds() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!([
            {"sequence": "3", "price": "30000", "size": "0.1", "side": "sell", "time": 1_700_000_000_500_000_000i64},
            {"sequence": "2", "price": "30001", "size": "0.2", "side": "buy", "time": 1_699_999_999_000_000_000i64}
        ])));
        let trades = adapter(mock)
            .get_trades(&CurrencyPair::BTC_USDT, Some(NOW))
            .await
            .unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].tid, "3");
        assert_eq!(trades[0].timestamp, NOW + 500);
        assert_eq!(trades[0].side, TradeSide::Sell);
    }

    #[tokio::test]
    async fn test_limit_buy_signed_json() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!({"orderId": "5c35c02703aa673ceec2a168"})));
        let order = adapter(mock.clone())
            .limit_buy(dec!(0.5), dec!(30000), &CurrencyPair::BTC_USDT)
            .await
            .unwrap();
        assert_eq!(order.order_id, "5c35c02703aa673ceec2a168");
        assert_eq!(order.client_order_id.as_deref().map(str::len), Some(32));

        let req = mock.last_request().unwrap();
        assert_eq!(req.header("KC-API-TIMESTAMP"), Some("1700000000000"));
        assert_eq!(req.header("KC-API-KEY-VERSION"), Some("2"));
        let body: Value = match &req.body {
            RequestBody::Json(text) => serde_json::from_str(text).unwrap(),
            other => panic!("expected JSON, got {:?}", other),
        };
        assert_eq!(body["symbol"], "BTC-USDT");
        assert_eq!(body["price"], "30000");
        assert_eq!(body["size"], "0.5");
    }

    #[tokio::test]
    async fn test_market_order_omits_price() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!({"orderId": "abc"})));
        let order = adapter(mock.clone())
            .market_sell(dec!(0.5), dec!(30000), &CurrencyPair::BTC_USDT)
            .await
            .unwrap();
        assert_eq!(order.price, Decimal::ZERO);
        let req = mock.last_request().unwrap();
        match &req.body {
            RequestBody::Json(text) => assert!(!text.contains("price")),
            other => panic!("expected JSON, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_passphrase_sends_nothing() {
        let mock = Arc::new(MockHttpClient::new());
        let kucoin = KuCoin::new(
            VenueConfig::new()
                .with_http_client(mock.clone())
                .with_credentials(Credentials::new("key", "secret")),
        )
        .unwrap();
        let err = kucoin.get_account().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Auth(_)));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_by_id() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!({"cancelledOrderIds": ["abc"]})));
        let kucoin = adapter(mock.clone());
        assert!(kucoin.cancel_order("abc", &CurrencyPair::BTC_USDT).await.unwrap());
        let req = mock.last_request().unwrap();
        assert_eq!(req.method, Method::Delete);
        assert!(req.url.ends_with("/api/v1/orders/abc"));

        let err = kucoin.cancel_order("", &CurrencyPair::BTC_USDT).await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidParameter(_)));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_get_order_average_price() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!({"id": "abc", "symbol": "BTC-USDT", "type": "limit", "side": "sell",
            "price": "30000", "size": "1", "dealSize": "0.5", "dealFunds": "15010", "fee": "0.015",
            "clientOid": "x1", "createdAt": NOW, "isActive": true, "cancelExist": false})));
        let order = adapter(mock).get_order("abc", &CurrencyPair::BTC_USDT).await.unwrap();
        assert_eq!(order.side, TradeSide::Sell);
        assert_eq!(order.status, TradeStatus::PartiallyFilled);
        assert_eq!(order.avg_price, Some(dec!(30020)));
        assert_eq!(order.fee, dec!(0.015));
        assert_eq!(order.client_order_id.as_deref(), Some("x1"));
    }

    #[tokio::test]
    async fn test_history_pages() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!({"currentPage": 1, "pageSize": 1, "totalNum": 2, "totalPage": 2, "items": [
            {"id": "a", "type": "market", "side": "buy", "price": "0", "size": "0.1", "dealSize": "0.1",
             "dealFunds": "3000", "isActive": false, "cancelExist": false}
        ]})));
        let page = adapter(mock.clone())
            .get_order_history(&CurrencyPair::BTC_USDT, Some(PageRequest::new(1, 1)))
            .await
            .unwrap();
        assert!(page.has_more);
        assert_eq!(page.items[0].side, TradeSide::BuyMarket);
        assert_eq!(page.items[0].status, TradeStatus::Filled);
        let url = mock.last_request().unwrap().url;
        assert!(url.contains("status=done"));
        assert!(url.contains("currentPage=1"));
    }

    #[tokio::test]
    async fn test_accounts_summed_across_types() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(ok(json!([
            {"id": "1", "currency": "BTC", "type": "main", "balance": "1", "available": "1", "holds": "0"},
            {"id": "2", "currency": "BTC", "type": "trade", "balance": "2", "available": "1.5", "holds": "0.5"},
            {"id": "3", "currency": "BCC", "type": "trade", "balance": "3", "available": "3", "holds": "0"}
        ])));
        let account = adapter(mock).get_account().await.unwrap();
        let btc = account.get(&Currency::BTC).unwrap();
        assert_eq!(btc.available, dec!(2.5));
        assert_eq!(btc.frozen, dec!(0.5));
        assert_eq!(account.available(&Currency::new("BCH")), dec!(3));
    }
}
