//! Coinbase Exchange, formerly GDAX
//!
//! Market data only; every trading call is `NotSupported`.
//!
//! - Symbols: `BTC-USD`; candles quote USDT pairs in USD
//! - Errors: `{"message": "NotFound"}` with a 4xx status
//! - Trade `side` is the maker's, so the taker side is its opposite

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};
use tradewire_http::HttpResponse;
use tradewire_types::coerce::{de, value_to_string};
use tradewire_types::{
    adapt_usdt_to_usd, CurrencyPair, Depth, ErrorTable, ExchangeResult, Kline, KlinePeriod, SymbolFormat, Ticker,
    Trade, TradeSide,
};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::{
    decode, depth_from_rows, ensure_success, iso8601_millis, millis_to_iso8601, parse_body, period_code,
    DepthColumns, KlineColumns, TimeUnit,
};

pub const VENUE: &str = "coinbase.com";
pub const BASE_URL: &str = "https://api.exchange.coinbase.com";

pub const SYMBOL: SymbolFormat = SymbolFormat::upper("-");
/// `[time, low, high, open, close, volume]`
const KLINE_COLUMNS: KlineColumns = KlineColumns {
    time: 0,
    low: 1,
    high: 2,
    open: 3,
    close: 4,
    volume: 5,
    unit: TimeUnit::Seconds,
};
/// Candles per response
const MAX_KLINES: usize = 300;

/// Granularity in seconds
const PERIODS: &[(KlinePeriod, &str)] = &[
    (KlinePeriod::Min1, "60"),
    (KlinePeriod::Min5, "300"),
    (KlinePeriod::Min15, "900"),
    (KlinePeriod::Hour1, "3600"),
    (KlinePeriod::Hour6, "21600"),
    (KlinePeriod::Day1, "86400"),
];

const ERRORS: ErrorTable = ErrorTable {
    codes: &[],
    patterns: &[],
};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TickerWire {
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    bid: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    ask: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    volume: Decimal,
    #[serde(default)]
    time: Value,
}

#[derive(Debug, Deserialize)]
struct StatsWire {
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    high: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    low: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    volume: Decimal,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    last: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
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
    time: Value,
}

// ============================================================================
// Normalizers
// ============================================================================

fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let body = parse_body(response)?;
    if !response.is_success() {
        if let Some(message) = body.get("message").map(value_to_string) {
            warn!(venue = VENUE, status = response.status, message = %message, "Venue rejected request");
            return Err(ERRORS.error(Some(response.status.to_string()), message));
        }
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body)
}

/// Book level: 1 for the best bid and ask, otherwise the aggregated top 50
fn book_level(size: usize) -> &'static str {
    if size == 1 {
        "1"
    } else {
        "2"
    }
}

/// Taker side from the maker side the venue reports
fn taker_side(maker: &str) -> TradeSide {
    if maker == "buy" {
        TradeSide::Sell
    } else {
        TradeSide::Buy
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Coinbase market data adapter
#[derive(Debug)]
pub struct Coinbase {
    ctx: RestContext,
}

impl Coinbase {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self {
            ctx: RestContext::new(VENUE, BASE_URL, config)?,
        })
    }

    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        Self::new(config)
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    async fn public(&self, path: &str, query: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.get(path, &query).await?;
        check(&response)
    }

    fn product_path(pair: &CurrencyPair, endpoint: &str) -> String {
        format!("/products/{}/{}", SYMBOL.render(pair), endpoint)
    }

    async fn stats(&self, pair: &CurrencyPair) -> ExchangeResult<StatsWire> {
        let body = self.public(&Self::product_path(pair, "stats"), Vec::new()).await?;
        decode(body, "stats")
    }

    /// Rolling 24 hour statistics; bid and ask are left at zero
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn get_24h_stats(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let stats = self.stats(pair).await?;
        Ok(Ticker {
            pair: pair.clone(),
            last: stats.last,
            buy: Decimal::ZERO,
            sell: Decimal::ZERO,
            high: stats.high,
            low: stats.low,
            vol: stats.volume,
            timestamp: self.ctx.now_millis(),
        })
    }
}

#[async_trait]
impl Exchange for Coinbase {
    fn venue(&self) -> &'static str {
        VENUE
    }

    /// Top of book from `ticker`, the daily range from `stats`
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let ticker_path = Self::product_path(pair, "ticker");
        let (ticker, stats) = tokio::try_join!(self.public(&ticker_path, Vec::new()), self.stats(pair))?;
        let ticker: TickerWire = decode(ticker, "ticker")?;
        Ok(Ticker {
            pair: pair.clone(),
            last: ticker.price,
            buy: ticker.bid,
            sell: ticker.ask,
            high: stats.high,
            low: stats.low,
            vol: ticker.volume,
            timestamp: iso8601_millis(&ticker.time).unwrap_or_else(|| self.ctx.now_millis()),
        })
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let body = self
            .public(
                &Self::product_path(pair, "book"),
                vec![("level".to_string(), book_level(size).to_string())],
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

    /// With `since`, the window runs from there for up to 300 candles
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_klines(
        &self,
        pair: &CurrencyPair,
        period: KlinePeriod,
        size: usize,
        since: Option<i64>,
    ) -> ExchangeResult<Vec<Kline>> {
        let granularity = period_code(PERIODS, VENUE, period)?;
        let mut query = vec![("granularity".to_string(), granularity.to_string())];
        if let Some(since) = since {
            let step_ms = granularity.parse::<i64>().unwrap_or(60) * 1000;
            let end = (since + step_ms * MAX_KLINES as i64).min(self.ctx.now_millis());
            query.push(("start".to_string(), millis_to_iso8601(since)?));
            query.push(("end".to_string(), millis_to_iso8601(end)?));
        }
        let product = pair.map_currencies(adapt_usdt_to_usd)?;
        let body = self.public(&Self::product_path(&product, "candles"), query).await?;
        let rows: Vec<Value> = decode(body, "candles")?;
        Ok(KLINE_COLUMNS.klines(pair, &rows, size.min(MAX_KLINES)))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let body = self.public(&Self::product_path(pair, "trades"), Vec::new()).await?;
        let rows: Vec<TradeWire> = decode(body, "trades")?;
        let since = since.unwrap_or(0);
        let mut trades: Vec<Trade> = rows
            .into_iter()
            .map(|t| Trade {
                pair: pair.clone(),
                tid: t.trade_id,
                side: taker_side(&t.side),
                price: t.price,
                amount: t.size,
                timestamp: iso8601_millis(&t.time).unwrap_or(0),
            })
            .filter(|t| t.timestamp >= since)
            .collect();
        trades.sort_by_key(|t| t.timestamp);
        Ok(trades)
    }
}
