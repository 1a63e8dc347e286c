//! Shared normalization helpers
//!
//! Venue modules keep their own envelopes, schemas and tables. What they
//! share lives here: body parsing, typed decoding, depth tiers, and the
//! column tables used to read array-shaped depth and kline rows.
//!
//! Nothing here reads the clock. Capture time is passed in.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tradewire_http::HttpResponse;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tradewire_types::coerce::{decimal_from_value, lossy_decimal_at, lossy_i64, parse_decimal};
use tradewire_types::{
    CurrencyPair, Depth, DepthRecord, ErrorTable, ExchangeError, ExchangeResult, Kline, KlinePeriod,
    VenueErrorKind,
};

/// Depth sizes a venue accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthTiers {
    /// Only these sizes, ascending
    Tiers(&'static [usize]),
    /// Any count up to `max`
    Any { max: usize },
    /// No size parameter
    Fixed,
}

impl DepthTiers {
    /// Size to request for `size` levels, `None` when the venue takes none
    ///
    /// Rounds up to the next tier and clamps to the largest.
    pub fn request_size(&self, size: usize) -> Option<usize> {
        match self {
            Self::Tiers(tiers) => tiers
                .iter()
                .copied()
                .find(|tier| *tier >= size)
                .or_else(|| tiers.last().copied()),
            Self::Any { max } => Some(size.clamp(1, *max)),
            Self::Fixed => None,
        }
    }
}

/// Positions of price and amount in a depth row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthColumns {
    pub price: usize,
    pub amount: usize,
}

impl DepthColumns {
    /// `[price, amount, ...]`
    pub const PRICE_AMOUNT: DepthColumns = DepthColumns { price: 0, amount: 1 };

    pub fn record(&self, row: &[Value]) -> DepthRecord {
        DepthRecord::new(lossy_decimal_at(row, self.price), lossy_decimal_at(row, self.amount))
    }

    /// Read rows; anything that is not an array is skipped
    pub fn records(&self, rows: &[Value]) -> Vec<DepthRecord> {
        rows.iter()
            .filter_map(Value::as_array)
            .map(|row| self.record(row))
            .collect()
    }
}

/// Unit of a time column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Millis,
    /// RFC 3339 string such as `2021-07-01T00:00:00.000Z`
    Iso8601,
}

impl TimeUnit {
    /// Unix seconds, zero when unreadable
    pub fn to_seconds(&self, value: &Value) -> i64 {
        match self {
            Self::Seconds => lossy_i64(value),
            Self::Millis => lossy_i64(value) / 1000,
            Self::Iso8601 => iso8601_millis(value).map(|ms| ms / 1000).unwrap_or(0),
        }
    }

    /// Unix milliseconds, zero when unreadable
    pub fn to_millis(&self, value: &Value) -> i64 {
        match self {
            Self::Seconds => lossy_i64(value) * 1000,
            Self::Millis => lossy_i64(value),
            Self::Iso8601 => iso8601_millis(value).unwrap_or(0),
        }
    }
}

/// Unix milliseconds from an RFC 3339 string
pub fn iso8601_millis(value: &Value) -> Option<i64> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.timestamp_millis())
}

/// Unix milliseconds from fractional seconds such as `"1574697131.6032143"`
pub fn fractional_seconds_millis(value: &Value) -> Option<i64> {
    decimal_from_value(value).and_then(|secs| (secs * Decimal::ONE_THOUSAND).trunc().to_i64())
}

/// RFC 3339 with millisecond precision, e.g. `2023-11-14T22:13:20.000Z`
pub fn millis_to_iso8601(millis: i64) -> ExchangeResult<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| ExchangeError::InvalidParameter(format!("timestamp out of range: {}", millis)))
}

/// Positions of the kline columns in a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KlineColumns {
    pub time: usize,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: usize,
    pub unit: TimeUnit,
}

impl KlineColumns {
    /// `[time, open, high, low, close, volume, ...]`
    pub const fn ohlcv(unit: TimeUnit) -> Self {
        Self {
            time: 0,
            open: 1,
            high: 2,
            low: 3,
            close: 4,
            volume: 5,
            unit,
        }
    }

    pub fn kline(&self, pair: &CurrencyPair, row: &[Value]) -> Kline {
        Kline {
            pair: pair.clone(),
            timestamp: row.get(self.time).map(|v| self.unit.to_seconds(v)).unwrap_or(0),
            open: lossy_decimal_at(row, self.open),
            high: lossy_decimal_at(row, self.high),
            low: lossy_decimal_at(row, self.low),
            close: lossy_decimal_at(row, self.close),
            vol: lossy_decimal_at(row, self.volume),
        }
    }

    /// Read rows, then order and trim them with [`finish_klines`]
    pub fn klines(&self, pair: &CurrencyPair, rows: &[Value], size: usize) -> Vec<Kline> {
        let klines = rows
            .iter()
            .filter_map(Value::as_array)
            .map(|row| self.kline(pair, row))
            .collect();
        finish_klines(klines, size)
    }
}

/// Ascending by time, keeping the newest `size` (all when zero)
pub fn finish_klines(mut klines: Vec<Kline>, size: usize) -> Vec<Kline> {
    klines.sort_by_key(|k| k.timestamp);
    if size > 0 && klines.len() > size {
        klines.drain(..klines.len() - size);
    }
    klines
}

/// Sort and truncate array-shaped book sides
pub fn depth_from_rows(
    pair: &CurrencyPair,
    bids: &[Value],
    asks: &[Value],
    columns: DepthColumns,
    size: usize,
    timestamp: i64,
) -> Depth {
    Depth::from_unsorted(
        pair.clone(),
        columns.records(bids),
        columns.records(asks),
        size,
        timestamp,
    )
}

/// Venue interval code for a period, or `InvalidParameter`
pub fn period_code(
    table: &[(KlinePeriod, &'static str)],
    venue: &str,
    period: KlinePeriod,
) -> ExchangeResult<&'static str> {
    table
        .iter()
        .find(|(p, _)| *p == period)
        .map(|(_, code)| *code)
        .ok_or_else(|| {
            ExchangeError::InvalidParameter(format!("{} has no {} candles", venue, period.as_str()))
        })
}

/// Parse the response body as JSON
///
/// A non-JSON body on an error status is a transport failure: the venue's
/// gateway answered, not its API.
pub fn parse_body(response: &HttpResponse) -> ExchangeResult<Value> {
    match serde_json::from_slice::<Value>(&response.body) {
        Ok(value) => Ok(value),
        Err(_) if !response.is_success() => Err(ExchangeError::transport(format!(
            "HTTP {}: {}",
            response.status,
            truncate(&response.text(), 200)
        ))),
        Err(e) => Err(ExchangeError::normalization("body", e.to_string())),
    }
}

/// Decode a JSON value into a venue schema
pub fn decode<T: DeserializeOwned>(value: Value, what: &str) -> ExchangeResult<T> {
    serde_json::from_value(value).map_err(|e| ExchangeError::normalization(what, e.to_string()))
}

/// Strict decimal from a string field that must be present
pub fn require_decimal(text: &str, field: &str) -> ExchangeResult<Decimal> {
    parse_decimal(text)
        .ok_or_else(|| ExchangeError::normalization(field, format!("expected a decimal, got {:?}", text)))
}

/// Reject an error status whose body matched no venue envelope
///
/// HTTP 429 is always a rate limit; other statuses are classified from the
/// body text with the venue's table.
pub fn ensure_success(response: &HttpResponse, body: &Value, table: &ErrorTable) -> ExchangeResult<()> {
    if response.is_success() {
        return Ok(());
    }
    let message = truncate(&body.to_string(), 200);
    if response.status == 429 {
        return Err(ExchangeError::venue(
            VenueErrorKind::RateLimited,
            Some("429".to_string()),
            message,
        ));
    }
    Err(table.error(Some(response.status.to_string()), message))
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_fractional_seconds() {
        assert_eq!(fractional_seconds_millis(&json!("1574697131.6032143")), Some(1574697131603));
        assert_eq!(fractional_seconds_millis(&json!(1688671969.2542)), Some(1688671969254));
        assert_eq!(fractional_seconds_millis(&json!(1700000000)), Some(1700000000000));
        assert_eq!(fractional_seconds_millis(&json!("")), None);
    }

    #[test]
    fn test_iso8601_both_ways() {
        let text = millis_to_iso8601(1_700_000_000_123).unwrap();
        assert_eq!(text, "2023-11-14T22:13:20.123Z");
        assert_eq!(iso8601_millis(&json!(text)), Some(1_700_000_000_123));
        assert_eq!(iso8601_millis(&json!("yesterday")), None);
    }

    #[test]
    fn test_tiers_round_up_and_clamp() {
        let tiers = DepthTiers::Tiers(&[5, 10, 20, 50, 100, 500, 1000]);
        assert_eq!(tiers.request_size(1), Some(5));
        assert_eq!(tiers.request_size(7), Some(10));
        assert_eq!(tiers.request_size(20), Some(20));
        assert_eq!(tiers.request_size(5000), Some(1000));

        assert_eq!(DepthTiers::Any { max: 200 }.request_size(7), Some(7));
        assert_eq!(DepthTiers::Any { max: 200 }.request_size(900), Some(200));
        assert_eq!(DepthTiers::Fixed.request_size(7), None);
    }

    #[test]
    fn test_kline_row_with_millis() {
        let row = json!([1625097600000i64, "100.0", "105.0", "99.0", "104.5", "1200"]);
        let kline = KlineColumns::ohlcv(TimeUnit::Millis).kline(&CurrencyPair::BTC_USDT, row.as_array().unwrap());
        assert_eq!(kline.timestamp, 1625097600);
        assert_eq!(kline.open, dec!(100.0));
        assert_eq!(kline.high, dec!(105.0));
        assert_eq!(kline.low, dec!(99.0));
        assert_eq!(kline.close, dec!(104.5));
        assert_eq!(kline.vol, dec!(1200));
    }

    #[test]
    fn test_iso_time_column() {
        assert_eq!(TimeUnit::Iso8601.to_seconds(&json!("2021-07-01T00:00:00.000Z")), 1625097600);
        assert_eq!(TimeUnit::Iso8601.to_millis(&json!("garbage")), 0);
        assert_eq!(TimeUnit::Seconds.to_millis(&json!("1625097600")), 1625097600000);
    }

    #[test]
    fn test_finish_klines_sorts_and_keeps_newest() {
        let rows = json!([[3, 1, 1, 1, 1, 1], [1, 1, 1, 1, 1, 1], [2, 1, 1, 1, 1, 1]]);
        let klines = KlineColumns::ohlcv(TimeUnit::Seconds).klines(
            &CurrencyPair::BTC_USDT,
            rows.as_array().unwrap(),
            2,
        );
        let times: Vec<i64> = klines.iter().map(|k| k.timestamp).collect();
        assert_eq!(times, vec![2, 3]);
    }

    #[test]
    fn test_depth_rows_skip_malformed() {
        let bids = json!([["1.0", "2"], "junk", ["3.0", "1"]]);
        let asks = json!([["5.0", "1"], ["4.0", "1"]]);
        let depth = depth_from_rows(
            &CurrencyPair::BTC_USDT,
            bids.as_array().unwrap(),
            asks.as_array().unwrap(),
            DepthColumns::PRICE_AMOUNT,
            0,
            1,
        );
        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.bids[0].price, dec!(3.0));
        assert_eq!(depth.asks[0].price, dec!(4.0));
    }

    #[test]
    fn test_parse_body() {
        let html = HttpResponse::new(502, "<html>Bad Gateway</html>");
        assert!(matches!(parse_body(&html), Err(ExchangeError::Transport { .. })));

        let garbage = HttpResponse::new(200, "not json");
        assert!(matches!(parse_body(&garbage), Err(ExchangeError::Normalization { .. })));

        let ok = HttpResponse::new(400, r#"{"code":-1}"#);
        assert_eq!(parse_body(&ok).unwrap()["code"], -1);
    }

    #[test]
    fn test_ensure_success_classifies_status() {
        let body = json!({"detail": "slow down"});
        let limited = HttpResponse::new(429, body.to_string());
        let err = ensure_success(&limited, &body, &ErrorTable::GENERIC).unwrap_err();
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::RateLimited));

        let body = json!({"detail": "Insufficient funds"});
        let rejected = HttpResponse::new(400, body.to_string());
        let err = ensure_success(&rejected, &body, &ErrorTable::GENERIC).unwrap_err();
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::InsufficientBalance));

        assert!(ensure_success(&HttpResponse::new(200, "{}"), &json!({}), &ErrorTable::GENERIC).is_ok());
    }

    #[test]
    fn test_period_code() {
        const TABLE: &[(KlinePeriod, &str)] = &[(KlinePeriod::Min1, "1m")];
        assert_eq!(period_code(TABLE, "x", KlinePeriod::Min1).unwrap(), "1m");
        assert!(matches!(
            period_code(TABLE, "x", KlinePeriod::Hour1),
            Err(ExchangeError::InvalidParameter(_))
        ));
    }
}
