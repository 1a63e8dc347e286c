//! Poloniex
//!
//! - Symbols: quote first, `USDT_BTC`; USD is traded as USDT
//! - Signing: hex HMAC-SHA512 over the form, `Key` / `Sign` headers
//! - Errors: `{"error": "..."}`, on any status
//! - Limit orders only; no order history endpoint

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use tradewire_auth::{Digest, FormScheme, Placement, SignScheme};
use tradewire_http::{HttpRequest, HttpResponse};
use tradewire_types::coerce::{de, value_to_string};
use tradewire_types::{
    adapt_usd_to_usdt, Account, Currency, CurrencyPair, Depth, ErrorTable, ExchangeError, ExchangeResult, Kline,
    KlinePeriod, Order, SubAccount, SymbolFormat, Ticker, Trade, TradeSide, TradeStatus, VenueErrorKind,
};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::{
    decode, depth_from_rows, ensure_success, finish_klines, parse_body, period_code, DepthColumns, DepthTiers,
};

pub const VENUE: &str = "poloniex.com";
pub const BASE_URL: &str = "https://poloniex.com";

pub const SYMBOL: SymbolFormat = SymbolFormat::upper("_").reversed();
const DEPTH_TIERS: DepthTiers = DepthTiers::Any { max: 100 };
const PUBLIC_PATH: &str = "/public";
const TRADING_PATH: &str = "/tradingApi";

/// Candle width in seconds
const PERIODS: &[(KlinePeriod, &str)] = &[
    (KlinePeriod::Min5, "300"),
    (KlinePeriod::Min15, "900"),
    (KlinePeriod::Min30, "1800"),
    (KlinePeriod::Hour2, "7200"),
    (KlinePeriod::Hour4, "14400"),
    (KlinePeriod::Day1, "86400"),
];

const ERRORS: ErrorTable = ErrorTable {
    codes: &[],
    patterns: &[("api calls per second", VenueErrorKind::RateLimited)],
};

const SIGNER: SignScheme = SignScheme::Form(FormScheme {
    digest: Digest::Sha512,
    key: Placement::Header("Key"),
    nonce_field: "nonce",
    signature: Placement::Header("Sign"),
    extra_params: &[],
    sorted: false,
});

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `USDT_BTC` for BTC/USD as well as BTC/USDT
pub fn venue_symbol(pair: &CurrencyPair) -> ExchangeResult<String> {
    Ok(SYMBOL.render(&pair.map_currencies(adapt_usd_to_usdt)?))
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn parse_date(text: &str) -> i64 {
    NaiveDateTime::parse_from_str(text, DATE_FORMAT)
        .map(|t| t.and_utc().timestamp_millis())
        .unwrap_or(0)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerWire {
    #[serde(deserialize_with = "de::lossy_decimal")]
    last: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    highest_bid: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    lowest_ask: Decimal,
    #[serde(default, rename = "high24hr", deserialize_with = "de::lossy_decimal")]
    high: Decimal,
    #[serde(default, rename = "low24hr", deserialize_with = "de::lossy_decimal")]
    low: Decimal,
    /// Base-currency volume; `baseVolume` is counted in the quote
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    quote_volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandleWire {
    date: i64,
    #[serde(deserialize_with = "de::lossy_decimal")]
    open: Decimal,
    #[serde(deserialize_with = "de::lossy_decimal")]
    high: Decimal,
    #[serde(deserialize_with = "de::lossy_decimal")]
    low: Decimal,
    #[serde(deserialize_with = "de::lossy_decimal")]
    close: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    quote_volume: Decimal,
}

/// Public and private trade rows share this shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeWire {
    #[serde(default, rename = "tradeID", deserialize_with = "de::string_or_number")]
    trade_id: String,
    #[serde(default)]
    date: String,
    #[serde(rename = "type")]
    side: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    rate: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    amount: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    fee: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacedWire {
    #[serde(deserialize_with = "de::string_or_number")]
    order_number: String,
    #[serde(default)]
    resulting_trades: Vec<TradeWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenOrderWire {
    #[serde(deserialize_with = "de::string_or_number")]
    order_number: String,
    #[serde(rename = "type")]
    side: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    rate: Decimal,
    /// Remaining on the book
    #[serde(deserialize_with = "de::strict_decimal")]
    amount: Decimal,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceWire {
    #[serde(deserialize_with = "de::strict_decimal")]
    available: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    on_orders: Decimal,
}

// ============================================================================
// Normalizers
// ============================================================================

fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let body = parse_body(response)?;
    if let Some(error) = body.get("error") {
        let message = value_to_string(error);
        warn!(venue = VENUE, message = %message, "Venue rejected request");
        return Err(ERRORS.error(None, message));
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body)
}

fn side_of(text: &str) -> TradeSide {
    if text == "sell" {
        TradeSide::Sell
    } else {
        TradeSide::Buy
    }
}

/// Executed amount, quote spent and fees
fn sum_fills(trades: &[TradeWire]) -> (Decimal, Decimal, Decimal) {
    trades.iter().fold(
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        |(deal, quote, fee), t| (deal + t.amount, quote + t.amount * t.rate, fee + t.fee),
    )
}

fn open_order(pair: &CurrencyPair, wire: OpenOrderWire) -> Order {
    Order::new(wire.order_number, pair.clone(), side_of(&wire.side), wire.rate, wire.amount)
        .with_times(Some(parse_date(&wire.date)).filter(|t| *t > 0), None)
}

/// Combine the order's fills with its open-book entry, when it still has one
///
/// Without an open entry a filled order reads as `Filled`; an order canceled
/// after a partial fill is indistinguishable from it.
fn merge_order(
    order_id: &str,
    pair: &CurrencyPair,
    fills: &[TradeWire],
    open: Option<OpenOrderWire>,
) -> ExchangeResult<Order> {
    let (deal, quote, fee) = sum_fills(fills);
    let side = fills.first().map(|t| side_of(&t.side));
    let order = match open {
        Some(open) => {
            let remaining = open.amount;
            let mut order = open_order(pair, open);
            order.amount = remaining + deal;
            let status = if deal > Decimal::ZERO {
                TradeStatus::PartiallyFilled
            } else {
                TradeStatus::Unfinished
            };
            order.with_quote_fill(deal, quote)?.with_status(status)
        }
        None => Order::new(order_id, pair.clone(), side.unwrap_or(TradeSide::Buy), Decimal::ZERO, deal)
            .with_quote_fill(deal, quote)?
            .with_status(TradeStatus::Filled),
    };
    Ok(order.with_fee(fee))
}

// ============================================================================
// Adapter
// ============================================================================

/// Poloniex spot adapter
#[derive(Debug)]
pub struct Poloniex {
    ctx: RestContext,
}

impl Poloniex {
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

    async fn public(&self, command: &str, mut extra: Vec<(String, String)>) -> ExchangeResult<Value> {
        extra.insert(0, ("command".to_string(), command.to_string()));
        let response = self.ctx.get(PUBLIC_PATH, &extra).await?;
        check(&response)
    }

    fn private_request(&self, command: &str, extra: Vec<(String, String)>) -> ExchangeResult<HttpRequest> {
        let mut form = vec![("command".to_string(), command.to_string())];
        form.extend(extra);
        let signed = self.ctx.sign(&SIGNER, "POST", TRADING_PATH, form, None)?;
        Ok(HttpRequest::post(self.ctx.url(TRADING_PATH))
            .with_headers(signed.headers)
            .with_form(signed.params))
    }

    async fn private(&self, command: &str, extra: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.send(self.private_request(command, extra)?).await?;
        check(&response)
    }

    async fn open_orders_wire(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<OpenOrderWire>> {
        let body = self
            .private("returnOpenOrders", params(&[("currencyPair", &venue_symbol(pair)?)]))
            .await?;
        decode(body, "returnOpenOrders")
    }

    async fn place(
        &self,
        amount: Decimal,
        price: Decimal,
        pair: &CurrencyPair,
        side: TradeSide,
    ) -> ExchangeResult<Order> {
        let command = if side.is_buy() { "buy" } else { "sell" };
        let request = self.private_request(
            command,
            params(&[
                ("currencyPair", &venue_symbol(pair)?),
                ("rate", &price.normalize().to_string()),
                ("amount", &amount.normalize().to_string()),
            ]),
        )?;
        let response = self.ctx.send_order(request).await?;
        let placed: PlacedWire = decode(check(&response)?, command)?;
        let (deal, quote, fee) = sum_fills(&placed.resulting_trades);
        let status = if deal >= amount && amount > Decimal::ZERO {
            TradeStatus::Filled
        } else if deal > Decimal::ZERO {
            TradeStatus::PartiallyFilled
        } else {
            TradeStatus::Unfinished
        };
        Ok(Order::new(placed.order_number, pair.clone(), side, price, amount)
            .with_quote_fill(deal, quote)?
            .with_fee(fee)
            .with_status(status)
            .with_times(Some(self.ctx.now_millis()), None))
    }
}

#[async_trait]
impl Exchange for Poloniex {
    fn venue(&self) -> &'static str {
        VENUE
    }

    /// Read from the venue-wide ticker map
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let symbol = venue_symbol(pair)?;
        let mut body = self.public("returnTicker", Vec::new()).await?;
        let entry = body
            .get_mut(&symbol)
            .map(Value::take)
            .ok_or_else(|| ExchangeError::InvalidPair(symbol.clone()))?;
        let wire: TickerWire = decode(entry, "ticker")?;
        Ok(Ticker {
            pair: pair.clone(),
            last: wire.last,
            buy: wire.highest_bid,
            sell: wire.lowest_ask,
            high: wire.high,
            low: wire.low,
            vol: wire.quote_volume,
            timestamp: self.ctx.now_millis(),
        })
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let depth = DEPTH_TIERS.request_size(size).unwrap_or(size).to_string();
        let body = self
            .public(
                "returnOrderBook",
                params(&[("currencyPair", &venue_symbol(pair)?), ("depth", &depth)]),
            )
            .await?;
        let book: BookWire = decode(body, "depth")?;
        Ok(depth_from_rows(
            pair,
            &book.bids,
            &book.asks,
            DepthColumns::PRICE_AMOUNT,
            size,
            self.ctx.now_millis(),
        ))
    }

    /// Without `since`, the window reaching back `size` candles from now
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: usize,
        since: Option<i64>,
    ) -> ExchangeResult<Vec<Kline>> {
        let code = period_code(PERIODS, VENUE, period)?;
        let now_secs = self.ctx.now_millis() / 1000;
        let span = period.seconds() as i64 * size.max(1) as i64;
        let start = since.map(|ms| ms / 1000).unwrap_or(now_secs - span);
        let body = self
            .public(
                "returnChartData",
                params(&[
                    ("currencyPair", &venue_symbol(pair)?),
                    ("period", code),
                    ("start", &start.to_string()),
                    ("end", &now_secs.to_string()),
                ]),
            )
            .await?;
        let rows: Vec<CandleWire> = decode(body, "returnChartData")?;
        let klines = rows
            .into_iter()
            .filter(|c| c.date > 0)
            .map(|c| Kline {
                pair: pair.clone(),
                timestamp: c.date,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                vol: c.quote_volume,
            })
            .collect();
        Ok(finish_klines(klines, size))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let mut query = params(&[("currencyPair", &venue_symbol(pair)?)]);
        if let Some(since) = since {
            query.push(("start".to_string(), (since / 1000).to_string()));
            query.push(("end".to_string(), (self.ctx.now_millis() / 1000).to_string()));
        }
        let body = self.public("returnTradeHistory", query).await?;
        let rows: Vec<TradeWire> = decode(body, "returnTradeHistory")?;
        let since = since.unwrap_or(0);
        let mut trades: Vec<Trade> = rows
            .into_iter()
            .map(|t| Trade {
                pair: pair.clone(),
                tid: t.trade_id,
                side: side_of(&t.side),
                price: t.rate,
                amount: t.amount,
                timestamp: parse_date(&t.date),
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
    async fn cancel_order(&self, order_id: &str, _pair: &CurrencyPair) -> ExchangeResult<bool> {
        let request = self.private_request("cancelOrder", params(&[("orderNumber", order_id)]))?;
        let response = self.ctx.send_order(request).await?;
        let body = check(&response)?;
        Ok(body.get("success").map(value_to_string).as_deref() == Some("1"))
    }

    /// Fills come from `returnOrderTrades`; an order without fills is looked
    /// up among the open orders
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let (fills, trades_error) = match self
            .private("returnOrderTrades", params(&[("orderNumber", order_id)]))
            .await
        {
            Ok(body) => (decode::<Vec<TradeWire>>(body, "returnOrderTrades")?, None),
            Err(err @ ExchangeError::Venue { .. }) => {
                debug!(venue = VENUE, error = %err, "No trades for order, checking open orders");
                (Vec::new(), Some(err))
            }
            Err(err) => return Err(err),
        };
        let open = self
            .open_orders_wire(pair)
            .await?
            .into_iter()
            .find(|o| o.order_number == order_id);

        match (open, trades_error) {
            (None, Some(err)) => Err(err),
            (open, _) => merge_order(order_id, pair, &fills, open),
        }
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .open_orders_wire(pair)
            .await?
            .into_iter()
            .map(|o| open_order(pair, o))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        let body = self.private("returnCompleteBalances", Vec::new()).await?;
        let balances: HashMap<String, BalanceWire> = decode(body, "returnCompleteBalances")?;
        let mut account = Account::new(VENUE);
        for (symbol, balance) in balances {
            account.add(SubAccount::new(Currency::new(symbol), balance.available, balance.on_orders));
        }
        Ok(account)
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

    const NOW: i64 = 1_700_000_000_000;

    fn adapter(mock: Arc<MockHttpClient>) -> Poloniex {
        Poloniex::new(
            VenueConfig::new()
                .with_http_client(mock)
                .with_clock(Arc::new(FixedClock::new(NOW)))
                .with_credentials(Credentials::new("key", "secret")),
        )
        .unwrap()
    }

    fn open_orders_body() -> String {
        json!([
            {"orderNumber": "120466", "type": "sell", "rate": "0.025", "amount": "100", "total": "2.5", "date": "2023-11-14 22:00:00"},
            {"orderNumber": "120467", "type": "buy", "rate": "0.024", "amount": "50", "total": "1.2", "date": "2023-11-14 22:10:00"}
        ])
        .to_string()
    }

    #[test]
    fn test_symbol_reversed_with_usdt() {
        assert_eq!(venue_symbol(&CurrencyPair::BTC_USD).unwrap(), "USDT_BTC");
        assert_eq!(venue_symbol(&CurrencyPair::ETH_BTC).unwrap(), "BTC_ETH");
    }

    #[tokio::test]
    async fn test_usdt_usd_collapses_before_any_request() {
        let mock = Arc::new(MockHttpClient::new());
        let polo = adapter(mock.clone());
        let pair = CurrencyPair::new("USDT", "USD").unwrap();
        let err = polo.get_ticker(&pair).await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidPair(_)));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_ticker_from_map() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({"USDT_BTC": {"last": "30000", "lowestAsk": "30001", "highestBid": "29999",
                "high24hr": "31000", "low24hr": "29000", "baseVolume": "3000000", "quoteVolume": "100"}})
            .to_string(),
        );
        mock.push_ok(json!({"USDT_BTC": {"last": "1"}}).to_string());
        let polo = adapter(mock.clone());

        let ticker = polo.get_ticker(&CurrencyPair::BTC_USDT).await.unwrap();
        assert_eq!(ticker.vol, dec!(100));
        assert_eq!(ticker.buy, dec!(29999));
        assert!(mock.last_request().unwrap().url.ends_with("/public?command=returnTicker"));

        let err = polo.get_ticker(&CurrencyPair::ETH_BTC).await.unwrap_err();
        assert_eq!(err, ExchangeError::InvalidPair("BTC_ETH".to_string()));
    }

    #[tokio::test]
    async fn test_depth_mixed_number_types() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({"asks": [["30001", 1.5], ["30002", 2]], "bids": [["29999", 0.5], ["30000", 1]], "isFrozen": "0", "seq": 1})
                .to_string(),
        );
        let depth = adapter(mock.clone()).get_depth(5, &CurrencyPair::BTC_USDT).await.unwrap();
        assert_eq!(depth.bids[0].price, dec!(30000));
        assert_eq!(depth.asks[0].amount, dec!(1.5));
        assert!(mock
            .last_request()
            .unwrap()
            .url
            .contains("command=returnOrderBook&currencyPair=USDT_BTC&depth=5"));
    }

    #[tokio::test]
    async fn test_chart_window_and_volume() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!([
                {"date": 1699999700, "high": 2, "low": 1, "open": 1.5, "close": 1.8, "volume": 180, "quoteVolume": 100},
                {"date": 1699999400, "high": 2, "low": 1, "open": 1.2, "close": 1.5, "volume": 150, "quoteVolume": 90}
            ])
            .to_string(),
        );
        let klines = adapter(mock.clone())
            .get_klines(&CurrencyPair::BTC_USDT, KlinePeriod::Min5, 2, None)
            .await
            .unwrap();
        assert_eq!(klines[0].timestamp, 1_699_999_400);
        assert_eq!(klines[1].vol, dec!(100));
        assert!(mock
            .last_request()
            .unwrap()
            .url
            .contains("period=300&start=1699999400&end=1700000000"));
    }

    #[tokio::test]
    async fn test_market_orders_not_supported() {
        let mock = Arc::new(MockHttpClient::new());
        let err = adapter(mock.clone())
            .market_buy(dec!(1), dec!(1), &CurrencyPair::BTC_USDT)
            .await
            .unwrap_err();
        assert!(err.is_not_supported());
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_limit_sell_with_immediate_fill() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({"orderNumber": 31226040, "resultingTrades": [
                {"amount": "0.4", "date": "2023-11-14 22:13:20", "rate": "30000", "total": "12000", "tradeID": "1", "type": "sell"}
            ]})
            .to_string(),
        );
        let order = adapter(mock.clone())
            .limit_sell(dec!(1), dec!(30000), &CurrencyPair::BTC_USDT)
            .await
            .unwrap();
        assert_eq!(order.order_id, "31226040");
        assert_eq!(order.status, TradeStatus::PartiallyFilled);
        assert_eq!(order.deal_amount, dec!(0.4));

        let req = mock.last_request().unwrap();
        assert!(req.url.ends_with("/tradingApi"));
        assert_eq!(req.form_value("command"), Some("sell"));
        assert_eq!(req.form_value("currencyPair"), Some("USDT_BTC"));
        assert_eq!(req.header("Key"), Some("key"));
        assert_eq!(req.header("Sign").map(str::len), Some(128));
    }

    #[tokio::test]
    async fn test_not_enough_balance() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(json!({"error": "Not enough USDT."}).to_string());
        let err = adapter(mock)
            .limit_buy(dec!(1), dec!(30000), &CurrencyPair::BTC_USDT)
            .await
            .unwrap_err();
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::InsufficientBalance));
    }

    #[tokio::test]
    async fn test_get_order_partially_filled_and_open() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!([{"globalTradeID": 1, "tradeID": 2, "currencyPair": "USDT_BTC", "type": "sell",
                "rate": "0.025", "amount": "20", "total": "0.5", "fee": "0.001", "date": "2023-11-14 22:05:00"}])
            .to_string(),
        );
        mock.push_ok(open_orders_body());
        let order = adapter(mock).get_order("120466", &CurrencyPair::BTC_USDT).await.unwrap();
        assert_eq!(order.status, TradeStatus::PartiallyFilled);
        assert_eq!(order.amount, dec!(120));
        assert_eq!(order.deal_amount, dec!(20));
        assert_eq!(order.side, TradeSide::Sell);
        assert_eq!(order.avg_price, Some(dec!(0.025)));
    }

    #[tokio::test]
    async fn test_get_order_falls_back_to_open_orders() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(json!({"error": "Order not found, or you are not the person who placed it."}).to_string());
        mock.push_ok(open_orders_body());
        let order = adapter(mock).get_order("120467", &CurrencyPair::BTC_USDT).await.unwrap();
        assert_eq!(order.status, TradeStatus::Unfinished);
        assert_eq!(order.amount, dec!(50));
        assert_eq!(order.avg_price, None);
    }

    #[tokio::test]
    async fn test_get_order_unknown() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(json!({"error": "Order not found, or you are not the person who placed it."}).to_string());
        mock.push_ok(open_orders_body());
        let err = adapter(mock).get_order("1", &CurrencyPair::BTC_USDT).await.unwrap_err();
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::OrderNotFound));
    }

    #[tokio::test]
    async fn test_complete_balances() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_ok(
            json!({
                "BTC": {"available": "1.5", "onOrders": "0.5", "btcValue": "2.0"},
                "USDT": {"available": "100", "onOrders": "0", "btcValue": "0.003"}
            })
            .to_string(),
        );
        let account = adapter(mock).get_account().await.unwrap();
        assert_eq!(account.get(&Currency::BTC).unwrap().frozen, dec!(0.5));
        assert_eq!(account.available(&Currency::USDT), dec!(100));
    }
}
