//! Bitstamp v2
//!
//! - Symbols: `btcusd`
//! - Signing: upper-case hex HMAC-SHA256 over `nonce + client_id + key`, sent as form fields
//! - Errors: `{"status": "error", "reason": ...}` or `{"error": "Order not found"}`
//! - No order history endpoint

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};
use tradewire_auth::{ClientIdScheme, SignScheme};
use tradewire_http::{HttpRequest, HttpResponse};
use tradewire_types::coerce::{de, lossy_decimal, value_to_string};
use tradewire_types::{
    Account, Currency, CurrencyPair, Depth, ErrorTable, ExchangeResult, Kline, KlinePeriod, Order, SubAccount,
    SymbolFormat, Ticker, Trade, TradeSide, TradeStatus, VenueErrorKind,
};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::{
    decode, depth_from_rows, ensure_success, finish_klines, parse_body, period_code, DepthColumns, TimeUnit,
};

pub const VENUE: &str = "bitstamp.net";
pub const BASE_URL: &str = "https://www.bitstamp.net";

pub const SYMBOL: SymbolFormat = SymbolFormat::lower("");
const MAX_KLINES: usize = 1000;
const HOUR_MS: i64 = 3_600_000;

/// `step` in seconds
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
    (KlinePeriod::Day3, "259200"),
];

const ERRORS: ErrorTable = ErrorTable {
    codes: &[],
    patterns: &[("you have only", VenueErrorKind::InsufficientBalance)],
};

const SIGNER: SignScheme = SignScheme::ClientId(ClientIdScheme {
    key_field: "key",
    signature_field: "signature",
    nonce_field: "nonce",
});

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn status(text: &str, dealt: bool) -> TradeStatus {
    match text {
        "Finished" => TradeStatus::Filled,
        "Canceled" => TradeStatus::Canceled,
        _ if dealt => TradeStatus::PartiallyFilled,
        _ => TradeStatus::Unfinished,
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TickerWire {
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    last: Decimal,
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
    #[serde(default, deserialize_with = "de::lossy_i64")]
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default, deserialize_with = "de::lossy_i64")]
    timestamp: i64,
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct OhlcWire {
    #[serde(deserialize_with = "de::lossy_i64")]
    timestamp: i64,
    #[serde(deserialize_with = "de::lossy_decimal")]
    open: Decimal,
    #[serde(deserialize_with = "de::lossy_decimal")]
    high: Decimal,
    #[serde(deserialize_with = "de::lossy_decimal")]
    low: Decimal,
    #[serde(deserialize_with = "de::lossy_decimal")]
    close: Decimal,
    #[serde(deserialize_with = "de::lossy_decimal")]
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct OhlcData {
    #[serde(default)]
    ohlc: Vec<OhlcWire>,
}

#[derive(Debug, Deserialize)]
struct OhlcEnvelope {
    data: OhlcData,
}

#[derive(Debug, Deserialize)]
struct TransactionWire {
    #[serde(deserialize_with = "de::string_or_number")]
    tid: String,
    #[serde(deserialize_with = "de::lossy_i64")]
    date: i64,
    #[serde(deserialize_with = "de::strict_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    amount: Decimal,
    #[serde(rename = "type", deserialize_with = "de::string_or_number")]
    side: String,
}

#[derive(Debug, Deserialize)]
struct PlacedWire {
    #[serde(deserialize_with = "de::string_or_number")]
    id: String,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(default)]
    datetime: String,
}

#[derive(Debug, Deserialize)]
struct OpenOrderWire {
    #[serde(deserialize_with = "de::string_or_number")]
    id: String,
    #[serde(default)]
    datetime: String,
    #[serde(rename = "type", deserialize_with = "de::string_or_number")]
    side: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct OrderStatusWire {
    #[serde(default)]
    status: String,
    #[serde(default)]
    transactions: Vec<Value>,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    amount_remaining: Decimal,
}

// ============================================================================
// Normalizers
// ============================================================================

/// Venue seconds as millis; `None` when missing or out of range
fn seconds_to_millis(seconds: i64) -> Option<i64> {
    seconds.checked_mul(1000).filter(|t| *t > 0)
}

fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let body = parse_body(response)?;
    if let Some((code, message)) = envelope_error(&body) {
        warn!(venue = VENUE, message = %message, "Venue rejected request");
        return Err(ERRORS.error(code, message));
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body)
}

/// `reason` is a string or a map of field errors such as `{"__all__": ["..."]}`
fn envelope_error(body: &Value) -> Option<(Option<String>, String)> {
    if body.get("status").and_then(Value::as_str) == Some("error") {
        let code = body.get("code").map(value_to_string);
        let message = match body.get("reason") {
            Some(Value::Object(fields)) => fields
                .values()
                .flat_map(|v| match v {
                    Value::Array(items) => items.iter().map(value_to_string).collect(),
                    other => vec![value_to_string(other)],
                })
                .collect::<Vec<_>>()
                .join("; "),
            Some(other) => value_to_string(other),
            None => String::new(),
        };
        return Some((code, message));
    }
    body.get("error").map(|e| (None, value_to_string(e)))
}

fn parse_datetime(text: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .ok()
        .map(|t| t.and_utc().timestamp_millis())
}

/// Executed base amount and quote spent, summed over the order's transactions
fn fills(base: &Currency, transactions: &[Value]) -> (Decimal, Decimal, Decimal) {
    let base_key = base.lower();
    transactions.iter().fold(
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        |(deal, quote, fee), tx| {
            let amount = tx.get(&base_key).map(lossy_decimal).unwrap_or_default();
            let price = tx.get("price").map(lossy_decimal).unwrap_or_default();
            let tx_fee = tx.get("fee").map(lossy_decimal).unwrap_or_default();
            (deal + amount, quote + amount * price, fee + tx_fee)
        },
    )
}

fn parse_balances(body: &Value) -> Account {
    let mut account = Account::new(VENUE);
    if let Value::Object(map) = body {
        for (key, value) in map {
            let Some(symbol) = key.strip_suffix("_available") else {
                continue;
            };
            let reserved = map
                .get(&format!("{}_reserved", symbol))
                .map(lossy_decimal)
                .unwrap_or_default();
            account.add(SubAccount::new(Currency::new(symbol), lossy_decimal(value), reserved));
        }
    }
    account
}

// ============================================================================
// Adapter
// ============================================================================

/// Bitstamp adapter; private calls need a client id in the credentials
#[derive(Debug)]
pub struct Bitstamp {
    ctx: RestContext,
}

impl Bitstamp {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self {
            ctx: RestContext::new(VENUE, BASE_URL, config)?,
        })
    }

    /// Same as [`new`](Self::new)
    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        Self::new(config)
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    async fn public(&self, path: &str, params: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.get(path, &params).await?;
        check(&response)
    }

    fn private_request(&self, path: &str, params: Vec<(String, String)>) -> ExchangeResult<HttpRequest> {
        let signed = self.ctx.sign(&SIGNER, "POST", path, params, None)?;
        Ok(HttpRequest::post(self.ctx.url(path)).with_form(signed.params))
    }

    async fn private(&self, path: &str, params: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.send(self.private_request(path, params)?).await?;
        check(&response)
    }

    async fn place(
        &self,
        amount: Decimal,
        price: Decimal,
        pair: &CurrencyPair,
        side: TradeSide,
    ) -> ExchangeResult<Order> {
        let direction = if side.is_buy() { "buy" } else { "sell" };
        let symbol = SYMBOL.render(pair);
        let mut params = vec![("amount".to_string(), amount.normalize().to_string())];
        let path = if side.is_market() {
            format!("/api/v2/{}/market/{}/", direction, symbol)
        } else {
            params.push(("price".to_string(), price.normalize().to_string()));
            format!("/api/v2/{}/{}/", direction, symbol)
        };
        let request = self.private_request(&path, params)?;
        let response = self.ctx.send_order(request).await?;
        let placed: PlacedWire = decode(check(&response)?, "order")?;
        let price = if side.is_market() { Decimal::ZERO } else { placed.price };
        Ok(Order::new(placed.id, pair.clone(), side, price, amount)
            .with_times(parse_datetime(&placed.datetime), None))
    }
}

#[async_trait]
impl Exchange for Bitstamp {
    fn venue(&self) -> &'static str {
        VENUE
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let body = self
            .public(&format!("/api/v2/ticker/{}/", SYMBOL.render(pair)), Vec::new())
            .await?;
        let wire: TickerWire = decode(body, "ticker")?;
        Ok(Ticker {
            pair: pair.clone(),
            last: wire.last,
            buy: wire.bid,
            sell: wire.ask,
            high: wire.high,
            low: wire.low,
            vol: wire.volume,
            timestamp: seconds_to_millis(wire.timestamp).unwrap_or_else(|| self.ctx.now_millis()),
        })
    }

    /// The full book is returned and truncated locally
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let body = self
            .public(&format!("/api/v2/order_book/{}/", SYMBOL.render(pair)), Vec::new())
            .await?;
        let book: BookWire = decode(body, "depth")?;
        let timestamp = seconds_to_millis(book.timestamp).unwrap_or_else(|| self.ctx.now_millis());
        Ok(depth_from_rows(
            pair,
            &book.bids,
            &book.asks,
            DepthColumns::PRICE_AMOUNT,
            size,
            timestamp,
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
        let step = period_code(PERIODS, VENUE, period)?;
        let limit = if size == 0 { 100 } else { size.min(MAX_KLINES) };
        let mut params = vec![
            ("step".to_string(), step.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(since) = since {
            params.push(("start".to_string(), (since / 1000).to_string()));
        }
        let body = self
            .public(&format!("/api/v2/ohlc/{}/", SYMBOL.render(pair)), params)
            .await?;
        let envelope: OhlcEnvelope = decode(body, "ohlc")?;
        let klines = envelope
            .data
            .ohlc
            .into_iter()
            .map(|c| Kline {
                pair: pair.clone(),
                timestamp: c.timestamp,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                vol: c.volume,
            })
            .collect();
        Ok(finish_klines(klines, size))
    }

    /// Transactions of the last hour, or of the last day when `since` is older
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let window = match since {
            Some(since) if self.ctx.now_millis() - since > HOUR_MS => "day",
            _ => "hour",
        };
        let body = self
            .public(
                &format!("/api/v2/transactions/{}/", SYMBOL.render(pair)),
                vec![("time".to_string(), window.to_string())],
            )
            .await?;
        let rows: Vec<TransactionWire> = decode(body, "transactions")?;
        let since = since.unwrap_or(0);
        let mut trades: Vec<Trade> = rows
            .into_iter()
            .map(|t| Trade {
                pair: pair.clone(),
                tid: t.tid,
                side: if t.side == "0" { TradeSide::Buy } else { TradeSide::Sell },
                price: t.price,
                amount: t.amount,
                timestamp: TimeUnit::Seconds.to_millis(&Value::from(t.date)),
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
        let request = self.private_request(
            "/api/v2/cancel_order/",
            vec![("id".to_string(), order_id.to_string())],
        )?;
        let response = self.ctx.send_order(request).await?;
        check(&response)?;
        Ok(true)
    }

    /// Side and limit price are not reported by the status endpoint; the
    /// returned order carries `Buy` and a zero price
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let body = self
            .private(
                "/api/v2/order_status/",
                vec![("id".to_string(), order_id.to_string())],
            )
            .await?;
        let wire: OrderStatusWire = decode(body, "order_status")?;
        let (deal, quote, fee) = fills(&pair.base, &wire.transactions);
        let status = status(&wire.status, deal > Decimal::ZERO);
        Ok(
            Order::new(order_id, pair.clone(), TradeSide::Buy, Decimal::ZERO, deal + wire.amount_remaining)
                .with_quote_fill(deal, quote)?
                .with_fee(fee)
                .with_status(status),
        )
    }

    /// `amount` is what remains on the book
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        let body = self
            .private(&format!("/api/v2/open_orders/{}/", SYMBOL.render(pair)), Vec::new())
            .await?;
        let rows: Vec<OpenOrderWire> = decode(body, "open_orders")?;
        let mut orders: Vec<Order> = rows
            .into_iter()
            .map(|o| {
                let side = if o.side == "0" { TradeSide::Buy } else { TradeSide::Sell };
                Order::new(o.id, pair.clone(), side, o.price, o.amount)
                    .with_times(parse_datetime(&o.datetime), None)
            })
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        let body = self.private("/api/v2/balance/", Vec::new()).await?;
        Ok(parse_balances(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Arc;
    use tradewire_auth::{Credentials, FixedClock};
    use tradewire_http::MockHttpClient;
    use tradewire_types::ExchangeError;

    const NOW: i64 = 1_700_000_000_000;

    fn adapter(mock: Arc<MockHttpClient>) -> Bitstamp {
        Bitstamp::new(
            VenueConfig::new()
                .with_http_client(mock)
                .with_clock(Arc::new(FixedClock::new(NOW)))
                .with_credentials(Credentials::new("key", "secret").with_client_id("client")),
        )
        .unwrap()
    }

    #[test]
    fn test_reason_map_flattened() {
        let body = json!({"status": "error", "reason": {"__all__": ["You have only 1 USD available. Check your account balance for details."]}});
        let (code, message) = envelope_error(&body).unwrap();
        assert_eq!(code, None);
        assert_eq!(
            ERRORS.classify(None, &message),
            VenueErrorKind::InsufficientBalance
        );
        assert!(envelope_error(&json!({"id": "1"})).is_none());
    }

    #[test]
    fn test_unknown_status_text() {
        assert_eq!(status("Open", false), TradeStatus::Unfinished);
        assert_eq!(status("Queued", false), TradeStatus::Unfinished);
        assert_eq!(status("Open", true), TradeStatus::PartiallyFilled);
        assert_eq!(status("Finished", true), TradeStatus::Filled);
    }

    #[tokio::test]
    async fn test_ticker_timestamp_falls_back_to_capture_time() {
        let mock = Arc::new(MockHttpClient::new());
        let ticker = json!({"last": "30000", "bid": "29999", "ask": "30001", "high": "31000", "low": "29000", "volume": "12"});
        let mut huge = ticker.clone();
        huge["timestamp"] = json!("99999999999999999999");
        let mut stamped = ticker.clone();
        stamped["timestamp"] = json!("1690000000");
        mock.push_oks([ticker, huge, stamped].map(|body| body.to_string()));
        let exchange = adapter(mock);

        let missing = exchange.get_ticker(&CurrencyPair::BTC_USD).await.unwrap();
        assert_eq!(missing.timestamp, NOW);
        assert_eq!(missing.last, dec!(30000));

        let overflowed = exchange.get_ticker(&CurrencyPair::BTC_USD).await.unwrap();
        assert_eq!(overflowed.timestamp, NOW);

        let venue = exchange.get_ticker(&CurrencyPair::BTC_USD).await.unwrap();
        assert_eq!(venue.timestamp, 1_690_000_000_000);
    }

    #[tokio::test]
    async fn test_depth_fixed_book_truncated() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({
                "timestamp": "1700000000",
                "bids": [["30000", "1"], ["29999", "2"], ["29998", "3"]],
                "asks": [["30001", "1"], ["30002", "2"], ["30003", "3"]]
            })
            .to_string(),
        );
        let depth = adapter(mock.clone()).get_depth(2, &CurrencyPair::BTC_USD).await.unwrap();
        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.asks.len(), 2);
        assert_eq!(depth.asks[0].price, dec!(30001));
        assert_eq!(depth.timestamp, NOW);
        assert!(mock.last_request().unwrap().url.ends_with("/api/v2/order_book/btcusd/"));
    }

    #[tokio::test]
    async fn test_ohlc_objects() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({"data": {"pair": "BTC/USD", "ohlc": [
                {"timestamp": "1700000060", "open": "2", "high": "3", "low": "1", "close": "2.5", "volume": "4"},
                {"timestamp": "1700000000", "open": "1", "high": "2", "low": "0.5", "close": "2", "volume": "3"}
            ]}})
            .to_string(),
        );
        let klines = adapter(mock.clone())
            .get_klines(&CurrencyPair::BTC_USD, KlinePeriod::Min1, 2, Some(NOW))
            .await
            .unwrap();
        assert_eq!(klines[0].timestamp, 1_700_000_000);
        assert_eq!(klines[1].close, dec!(2.5));
        let url = mock.last_request().unwrap().url;
        assert!(url.contains("step=60&limit=2&start=1700000000"));
    }

    #[tokio::test]
    async fn test_transactions_side_and_window() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!([
                {"date": "1700000001", "tid": 2, "price": "30000", "amount": "0.1", "type": "1"},
                {"date": "1699999990", "tid": 1, "price": "30001", "amount": "0.2", "type": "0"}
            ])
            .to_string(),
        );
        let trades = adapter(mock.clone())
            .get_trades(&CurrencyPair::BTC_USD, Some(NOW - 2 * HOUR_MS))
            .await
            .unwrap();
        assert_eq!(trades[0].tid, "1");
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[1].side, TradeSide::Sell);
        assert!(mock.last_request().unwrap().url.ends_with("time=day"));
    }

    #[tokio::test]
    async fn test_limit_order_signed_form() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({"id": "1234", "datetime": "2023-11-14 22:13:20.123456", "type": "0", "price": "30000.00", "amount": "0.50000000"})
                .to_string(),
        );
        let order = adapter(mock.clone())
            .limit_buy(dec!(0.5), dec!(30000), &CurrencyPair::BTC_USD)
            .await
            .unwrap();
        assert_eq!(order.order_id, "1234");
        assert_eq!(order.created_at, Some(1_700_000_000_123));

        let req = mock.last_request().unwrap();
        assert!(req.url.ends_with("/api/v2/buy/btcusd/"));
        assert_eq!(req.form_value("price"), Some("30000"));
        assert_eq!(req.form_value("key"), Some("key"));
        let signature = req.form_value("signature").unwrap();
        assert_eq!(signature, signature.to_ascii_uppercase());
    }

    #[tokio::test]
    async fn test_missing_client_id_is_auth_error() {
        let mock = Arc::new(MockHttpClient::new());
        let bitstamp = Bitstamp::new(
            VenueConfig::new()
                .with_http_client(mock.clone())
                .with_credentials(Credentials::new("key", "secret")),
        )
        .unwrap();
        let err = bitstamp.get_account().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Auth(_)));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_order_status_from_transactions() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({"id": 1234, "status": "Open", "amount_remaining": "0.3", "transactions": [
                {"tid": 1, "price": "30000", "fee": "0.1", "btc": "0.1", "usd": "3000", "type": 2},
                {"tid": 2, "price": "30100", "fee": "0.1", "btc": "0.1", "usd": "3010", "type": 2}
            ]})
            .to_string(),
        );
        let order = adapter(mock).get_order("1234", &CurrencyPair::BTC_USD).await.unwrap();
        assert_eq!(order.status, TradeStatus::PartiallyFilled);
        assert_eq!(order.deal_amount, dec!(0.2));
        assert_eq!(order.amount, dec!(0.5));
        assert_eq!(order.avg_price, Some(dec!(30050)));
        assert_eq!(order.fee, dec!(0.2));
    }

    #[tokio::test]
    async fn test_cancel_not_found() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(json!({"error": "Order not found"}).to_string());
        let err = adapter(mock)
            .cancel_order("1", &CurrencyPair::BTC_USD)
            .await
            .unwrap_err();
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::OrderNotFound));
    }

    #[tokio::test]
    async fn test_balances_by_suffix() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({
                "btc_available": "1.5", "btc_reserved": "0.5", "btc_balance": "2.0",
                "usd_available": "100", "usd_reserved": "0", "fee": "0.25"
            })
            .to_string(),
        );
        let account = adapter(mock).get_account().await.unwrap();
        assert_eq!(account.len(), 2);
        assert_eq!(account.get(&Currency::BTC).unwrap().frozen, dec!(0.5));
        assert_eq!(account.available(&Currency::USD), dec!(100));
    }
}
