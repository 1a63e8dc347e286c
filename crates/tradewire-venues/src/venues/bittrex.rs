//! Bittrex v1.1 public API
//!
//! Ticker, depth and trades only; everything else is `NotSupported`.
//!
//! - Symbols: `USDT-BTC`, quote first
//! - Errors: `{"success": false, "message": "INVALID_MARKET", "result": null}`, usually with 200

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};
use tradewire_http::HttpResponse;
use tradewire_types::coerce::{de, value_to_string};
use tradewire_types::{
    CurrencyPair, Depth, DepthRecord, ErrorTable, ExchangeError, ExchangeResult, SymbolFormat, Ticker, Trade,
    TradeSide, VenueErrorKind,
};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::normalize::{decode, ensure_success, parse_body};

pub const VENUE: &str = "bittrex.com";
pub const BASE_URL: &str = "https://bittrex.com/api/v1.1";

pub const SYMBOL: SymbolFormat = SymbolFormat::upper("-").reversed();

/// `TimeStamp` carries no zone; it is UTC
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const ERRORS: ErrorTable = ErrorTable {
    codes: &[],
    patterns: &[("throttled", VenueErrorKind::RateLimited)],
};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SummaryWire {
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
    #[serde(default)]
    time_stamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LevelWire {
    #[serde(deserialize_with = "de::strict_decimal")]
    rate: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    quantity: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default)]
    buy: Vec<LevelWire>,
    #[serde(default)]
    sell: Vec<LevelWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TradeWire {
    #[serde(deserialize_with = "de::string_or_number")]
    id: String,
    #[serde(default)]
    time_stamp: String,
    #[serde(deserialize_with = "de::strict_decimal")]
    quantity: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    price: Decimal,
    /// Taker side, `BUY` or `SELL`
    #[serde(default)]
    order_type: String,
}

// ============================================================================
// Normalizers
// ============================================================================

/// Unwrap `{success, message, result}`
fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let mut body = parse_body(response)?;
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body.get("message").map(value_to_string).unwrap_or_default();
        warn!(venue = VENUE, message = %message, "Venue rejected request");
        return Err(ERRORS.error(None, message));
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
}

fn parse_timestamp(text: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .ok()
        .map(|t| t.and_utc().timestamp_millis())
}

fn levels(rows: Vec<LevelWire>) -> Vec<DepthRecord> {
    rows.into_iter().map(|l| DepthRecord::new(l.rate, l.quantity)).collect()
}

// ============================================================================
// Adapter
// ============================================================================

/// Bittrex market data adapter
#[derive(Debug)]
pub struct Bittrex {
    ctx: RestContext,
}

impl Bittrex {
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

    async fn public(&self, path: &str, pair: &CurrencyPair, extra: &[(&str, &str)]) -> ExchangeResult<Value> {
        let mut query = vec![("market".to_string(), SYMBOL.render(pair))];
        query.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        let response = self.ctx.get(path, &query).await?;
        check(&response)
    }
}

#[async_trait]
impl Exchange for Bittrex {
    fn venue(&self) -> &'static str {
        VENUE
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let result = self.public("/public/getmarketsummary", pair, &[]).await?;
        let mut rows: Vec<SummaryWire> = decode(result, "market summary")?;
        if rows.is_empty() {
            return Err(ExchangeError::InvalidPair(SYMBOL.render(pair)));
        }
        let summary = rows.swap_remove(0);
        Ok(Ticker {
            pair: pair.clone(),
            last: summary.last,
            buy: summary.bid,
            sell: summary.ask,
            high: summary.high,
            low: summary.low,
            vol: summary.volume,
            timestamp: parse_timestamp(&summary.time_stamp).unwrap_or_else(|| self.ctx.now_millis()),
        })
    }

    /// Full book, trimmed locally to `size`
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let result = self
            .public("/public/getorderbook", pair, &[("type", "both")])
            .await?;
        let book: BookWire = decode(result, "depth")?;
        Ok(Depth::from_unsorted(
            pair.clone(),
            levels(book.buy),
            levels(book.sell),
            size,
            self.ctx.now_millis(),
        ))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let result = self.public("/public/getmarkethistory", pair, &[]).await?;
        let rows: Vec<TradeWire> = decode(result, "market history")?;
        let since = since.unwrap_or(0);
        let mut trades: Vec<Trade> = rows
            .into_iter()
            .map(|t| Trade {
                pair: pair.clone(),
                tid: t.id,
                side: if t.order_type == "SELL" { TradeSide::Sell } else { TradeSide::Buy },
                price: t.price,
                amount: t.quantity,
                timestamp: parse_timestamp(&t.time_stamp).unwrap_or(0),
            })
            .filter(|t| t.timestamp >= since)
            .collect();
        trades.sort_by_key(|t| t.timestamp);
        Ok(trades)
    }
}
