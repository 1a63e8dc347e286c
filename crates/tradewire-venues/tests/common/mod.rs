//! Shared fixtures for the cross-venue integration tests
//!
//! Payloads follow the shapes each venue returns, trimmed to the fields the
//! adapters read.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tradewire_auth::{Credentials, FixedClock};
use tradewire_http::MockHttpClient;
use tradewire_types::Depth;
use tradewire_venues::{Venue, VenueConfig};

/// 2023-11-14T22:13:20Z
pub const NOW: i64 = 1_700_000_000_000;

pub fn mock() -> Arc<MockHttpClient> {
    Arc::new(MockHttpClient::new())
}

/// Fixed clock and a credential set every signing scheme accepts
pub fn config(mock: Arc<MockHttpClient>) -> VenueConfig {
    VenueConfig::new()
        .with_http_client(mock)
        .with_clock(Arc::new(FixedClock::new(NOW)))
        .with_credentials(
            Credentials::new("key", "c2VjcmV0")
                .with_passphrase("phrase")
                .with_client_id("123456"),
        )
}

/// Twelve bid levels, 100 down to 89, in no particular order
pub fn scrambled_bids() -> Vec<Value> {
    [93, 100, 89, 97, 95, 99, 90, 96, 92, 98, 91, 94]
        .iter()
        .map(|p| json!([format!("{}.5", p), "1.25"]))
        .collect()
}

/// Twelve ask levels, 101 up to 112, in no particular order
pub fn scrambled_asks() -> Vec<Value> {
    [108, 101, 112, 103, 110, 105, 102, 111, 104, 107, 109, 106]
        .iter()
        .map(|p| json!([format!("{}.5", p), "0.75"]))
        .collect()
}

fn as_objects(rows: &[Value], price: &str, amount: &str) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let mut level = serde_json::Map::new();
            level.insert(price.to_string(), row[0].clone());
            level.insert(amount.to_string(), row[1].clone());
            Value::Object(level)
        })
        .collect()
}

/// The scrambled book in the response shape of `venue`
pub fn book_body(venue: Venue) -> String {
    let (bids, asks) = (scrambled_bids(), scrambled_asks());
    let body = match venue {
        Venue::Binance => json!({"lastUpdateId": 1, "bids": bids, "asks": asks}),
        Venue::Kraken => json!({"error": [], "result": {"XXBTZUSD": {"bids": bids, "asks": asks}}}),
        Venue::OKEx => json!({"bids": bids, "asks": asks, "timestamp": "2023-11-14T22:13:20.000Z"}),
        Venue::Bitfinex => json!({
            "bids": as_objects(&bids, "price", "amount"),
            "asks": as_objects(&asks, "price", "amount"),
        }),
        Venue::Bitstamp => json!({"timestamp": "1700000000", "bids": bids, "asks": asks}),
        Venue::Poloniex => json!({"bids": bids, "asks": asks, "isFrozen": "0"}),
        Venue::Atop => json!({"code": 200, "data": {"bids": bids, "asks": asks}}),
        Venue::KuCoin => json!({"code": "200000", "data": {"time": NOW, "bids": bids, "asks": asks}}),
        Venue::Coinbase => json!({"sequence": 1, "bids": bids, "asks": asks}),
        Venue::Bittrex => json!({"success": true, "message": "", "result": {
            "buy": as_objects(&bids, "Rate", "Quantity"),
            "sell": as_objects(&asks, "Rate", "Quantity"),
        }}),
    };
    body.to_string()
}

pub fn assert_ordered(depth: &Depth) {
    for pair in depth.bids.windows(2) {
        assert!(pair[0].price >= pair[1].price, "bids out of order: {:?}", depth.bids);
    }
    for pair in depth.asks.windows(2) {
        assert!(pair[0].price <= pair[1].price, "asks out of order: {:?}", depth.asks);
    }
}
