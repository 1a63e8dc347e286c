//! Cross-venue properties of the normalized model
//!
//! Each test drives real adapters against `MockHttpClient` fixtures.

mod common;

use std::time::Duration;

use common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use tradewire_http::TransportError;
use tradewire_types::{CurrencyPair, ExchangeError, KlinePeriod, SymbolFormat, TradeSide, TradeStatus, VenueErrorKind};
use tradewire_venues::normalize::{DepthTiers, KlineColumns, TimeUnit};
use tradewire_venues::venues::{atop, binance, bittrex, coinbase, kucoin, okex, poloniex};
use tradewire_venues::{connect, Exchange, Venue};

// =============================================================================
// Symbols
// =============================================================================

const PAIRS: [CurrencyPair; 5] = [
    CurrencyPair::BTC_USDT,
    CurrencyPair::ETH_BTC,
    CurrencyPair::LTC_USDT,
    CurrencyPair::XRP_USDT,
    CurrencyPair::EOS_USDT,
];

#[test]
fn test_separator_symbols_round_trip() {
    let formats: [(&str, SymbolFormat); 6] = [
        ("okex", okex::SYMBOL),
        ("kucoin", kucoin::SYMBOL),
        ("atop", atop::SYMBOL),
        ("poloniex", poloniex::SYMBOL),
        ("bittrex", bittrex::SYMBOL),
        ("coinbase", coinbase::SYMBOL),
    ];
    for (name, format) in formats {
        for pair in PAIRS {
            let symbol = format.render(&pair);
            assert_eq!(format.parse(&symbol).unwrap(), pair, "{} {}", name, symbol);
        }
    }
}

#[test]
fn test_reversed_symbols_put_quote_first() {
    assert_eq!(poloniex::SYMBOL.render(&CurrencyPair::ETH_BTC), "BTC_ETH");
    assert_eq!(bittrex::SYMBOL.render(&CurrencyPair::ETH_BTC), "BTC-ETH");
    assert_eq!(atop::SYMBOL.render(&CurrencyPair::ETH_BTC), "eth_btc");
}

#[test]
fn test_joined_symbols_round_trip_with_known_quotes() {
    let quotes = ["USDT", "USD", "BTC"];
    for pair in PAIRS {
        let symbol = binance::SYMBOL.render(&pair);
        assert_eq!(binance::SYMBOL.parse_with_quotes(&symbol, &quotes).unwrap(), pair);
    }
}

// =============================================================================
// Depth
// =============================================================================

#[tokio::test]
async fn test_depth_is_ordered_on_every_venue() {
    for venue in Venue::ALL {
        let mock = mock();
        let exchange = connect(venue, config(mock.clone())).await.unwrap();
        mock.push_ok(book_body(venue));

        let pair = if venue == Venue::Kraken || venue == Venue::Coinbase {
            CurrencyPair::BTC_USD
        } else {
            CurrencyPair::BTC_USDT
        };
        let depth = exchange.get_depth(7, &pair).await.unwrap();
        assert_ordered(&depth);
        assert_eq!(depth.bids.len(), 7, "{}", venue);
        assert_eq!(depth.asks.len(), 7, "{}", venue);
        assert_eq!(depth.bids[0].price, dec!(100.5), "{}", venue);
        assert_eq!(depth.asks[0].price, dec!(101.5), "{}", venue);
    }
}

#[tokio::test]
async fn test_depth_tier_rounds_up_and_trims() {
    assert_eq!(DepthTiers::Tiers(&[5, 10, 20, 50]).request_size(7), Some(10));

    let mock = mock();
    let exchange = connect(Venue::Binance, config(mock.clone())).await.unwrap();
    mock.push_ok(book_body(Venue::Binance));
    let depth = exchange.get_depth(7, &CurrencyPair::BTC_USDT).await.unwrap();
    assert!(mock.last_request().unwrap().url.contains("limit=10"));
    assert_eq!(depth.bids.len(), 7);
    assert_eq!(depth.asks.len(), 7);
}

// =============================================================================
// Klines
// =============================================================================

#[test]
fn test_millisecond_kline_row() {
    let row = json!([1625097600000i64, "100.0", "105.0", "99.0", "104.5", "1200"]);
    let kline = KlineColumns::ohlcv(TimeUnit::Millis).kline(&CurrencyPair::BTC_USDT, row.as_array().unwrap());
    assert_eq!(kline.timestamp, 1_625_097_600);
    assert_eq!(kline.open, dec!(100.0));
    assert_eq!(kline.high, dec!(105.0));
    assert_eq!(kline.low, dec!(99.0));
    assert_eq!(kline.close, dec!(104.5));
    assert_eq!(kline.vol, dec!(1200));
}

#[tokio::test]
async fn test_binance_klines_ascending() {
    let mock = mock();
    let exchange = connect(Venue::Binance, config(mock.clone())).await.unwrap();
    mock.push_ok(
        json!([
            [1625097660000i64, "104.5", "106", "104", "105", "800"],
            [1625097600000i64, "100.0", "105.0", "99.0", "104.5", "1200"]
        ])
        .to_string(),
    );
    let klines = exchange
        .get_klines(&CurrencyPair::BTC_USDT, KlinePeriod::Min1, 10, None)
        .await
        .unwrap();
    assert_eq!(klines.len(), 2);
    assert!(klines[0].timestamp < klines[1].timestamp);
    assert_eq!(klines[0].vol, dec!(1200));
}

// =============================================================================
// Orders
// =============================================================================

fn binance_order(executed: &str, quote: &str, status: &str) -> String {
    json!({
        "symbol": "BTCUSDT", "orderId": 28, "clientOrderId": "abc", "price": "30000",
        "origQty": "1", "executedQty": executed, "cummulativeQuoteQty": quote,
        "status": status, "type": "LIMIT", "side": "SELL", "time": 1_699_999_000_000i64,
        "updateTime": 1_700_000_000_000i64
    })
    .to_string()
}

#[tokio::test]
async fn test_order_fill_bounds() {
    let cases = [
        ("0", "0", TradeStatus::Unfinished),
        ("0.4", "12000", TradeStatus::PartiallyFilled),
        ("1", "30050", TradeStatus::Filled),
    ];
    for (executed, quote, status) in cases {
        let mock = mock();
        let exchange = connect(Venue::Binance, config(mock.clone())).await.unwrap();
        let native = match status {
            TradeStatus::Unfinished => "NEW",
            TradeStatus::PartiallyFilled => "PARTIALLY_FILLED",
            _ => "FILLED",
        };
        mock.push_ok(binance_order(executed, quote, native));
        let order = exchange.get_order("28", &CurrencyPair::BTC_USDT).await.unwrap();
        assert!(order.deal_amount >= Decimal::ZERO);
        assert!(order.deal_amount <= order.amount);
        assert_eq!(order.status, status);
        if order.deal_amount.is_zero() {
            assert_eq!(order.avg_price, None);
        } else {
            assert!(order.avg_price.is_some());
        }
    }
}

#[tokio::test]
async fn test_overfilled_order_is_rejected() {
    let mock = mock();
    let exchange = connect(Venue::Binance, config(mock.clone())).await.unwrap();
    mock.push_ok(binance_order("2", "60000", "FILLED"));
    let err = exchange.get_order("28", &CurrencyPair::BTC_USDT).await.unwrap_err();
    assert!(matches!(err, ExchangeError::Normalization { .. }));
}

#[tokio::test]
async fn test_normalizing_twice_is_identical() {
    let mock = mock();
    let exchange = connect(Venue::Binance, config(mock.clone())).await.unwrap();
    mock.push_oks([binance_order("0.4", "12000", "PARTIALLY_FILLED"), binance_order("0.4", "12000", "PARTIALLY_FILLED")]);
    let first = exchange.get_order("28", &CurrencyPair::BTC_USDT).await.unwrap();
    let second = exchange.get_order("28", &CurrencyPair::BTC_USDT).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.side, TradeSide::Sell);
}

#[tokio::test]
async fn test_lost_placement_leaves_state_unknown() {
    for venue in [Venue::Atop, Venue::KuCoin, Venue::Bitstamp] {
        let mock = mock();
        let exchange = connect(venue, config(mock.clone())).await.unwrap();
        mock.push_error(TransportError::Timeout(Duration::from_secs(10)));
        let err = exchange
            .limit_buy(dec!(1), dec!(30000), &CurrencyPair::BTC_USDT)
            .await
            .unwrap_err();
        assert!(err.is_order_state_unknown(), "{}: {:?}", venue, err);
    }
}

#[tokio::test]
async fn test_lost_query_keeps_state_known() {
    let mock = mock();
    let exchange = connect(Venue::Atop, config(mock.clone())).await.unwrap();
    mock.push_error(TransportError::Request("connection reset".into()));
    let err = exchange.get_order("1", &CurrencyPair::BTC_USDT).await.unwrap_err();
    assert!(!err.is_order_state_unknown());
    assert!(err.is_retryable());
}

// =============================================================================
// Envelopes
// =============================================================================

#[tokio::test]
async fn test_atop_envelopes() {
    let mock = mock();
    let exchange = connect(Venue::Atop, config(mock.clone())).await.unwrap();

    mock.push_ok(r#"{"code":1001,"info":"insufficient balance"}"#);
    let err = exchange
        .limit_sell(dec!(1), dec!(30000), &CurrencyPair::BTC_USDT)
        .await
        .unwrap_err();
    assert_eq!(err.venue_kind(), Some(VenueErrorKind::InsufficientBalance));

    mock.push_ok(r#"{"code":200,"data":{"id":"42"}}"#);
    let order = exchange
        .limit_sell(dec!(1), dec!(30000), &CurrencyPair::BTC_USDT)
        .await
        .unwrap();
    assert_eq!(order.order_id, "42");
}

#[tokio::test]
async fn test_rate_limit_status_is_classified_everywhere() {
    for venue in [Venue::Binance, Venue::Bitstamp, Venue::Poloniex, Venue::KuCoin] {
        let mock = mock();
        let exchange = connect(venue, config(mock.clone())).await.unwrap();
        mock.push_json(429, "{}");
        let err = exchange.get_ticker(&CurrencyPair::BTC_USDT).await.unwrap_err();
        assert_eq!(err.venue_kind(), Some(VenueErrorKind::RateLimited), "{}", venue);
        assert!(err.is_retryable());
    }
}

#[tokio::test]
async fn test_unsupported_operations_make_no_request() {
    for venue in [Venue::Coinbase, Venue::Bittrex] {
        let mock = mock();
        let exchange = connect(venue, config(mock.clone())).await.unwrap();
        let before = mock.request_count();
        let err = exchange.cancel_order("1", &CurrencyPair::BTC_USD).await.unwrap_err();
        assert!(err.is_not_supported());
        assert_eq!(mock.request_count(), before);
    }
}
