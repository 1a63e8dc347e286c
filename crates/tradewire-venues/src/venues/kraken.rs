//! Kraken spot
//!
//! - Symbols: `XBTUSD`, with BTC spelled XBT
//! - Signing: HMAC-SHA512 over `path + SHA256(nonce + form)`, `API-Key` / `API-Sign`
//! - Errors: `{"error": ["EOrder:Insufficient funds"], "result": {}}`
//! - Account: `X`/`Z` prefixes stripped; staking balances (`XBT.M`, `DOT.S`) skipped

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};
use tradewire_auth::{PathScheme, SignScheme};
use tradewire_http::{HttpRequest, HttpResponse};
use tradewire_types::coerce::{de, lossy_decimal_at, value_to_string};
use tradewire_types::{
    adapt_btc_to_xbt, adapt_kraken_asset, adapt_xbt_to_btc, Account, CurrencyPair, Depth, ErrorTable,
    ExchangeError, ExchangeResult, Kline, KlinePeriod, Order, OrderType, Page, PageRequest, SubAccount,
    SymbolFormat, Ticker, Trade, TradeSide, TradeStatus, VenueErrorKind,
};

use crate::config::VenueConfig;
use crate::context::RestContext;
use crate::exchange::Exchange;
use crate::metadata::MetadataCache;
use crate::normalize::{
    decode, depth_from_rows, ensure_success, fractional_seconds_millis, parse_body, period_code, DepthColumns,
    DepthTiers, KlineColumns, TimeUnit,
};

pub const VENUE: &str = "kraken.com";
pub const BASE_URL: &str = "https://api.kraken.com";

pub const SYMBOL: SymbolFormat = SymbolFormat::upper("");
const DEPTH_TIERS: DepthTiers = DepthTiers::Any { max: 500 };
const KLINE_COLUMNS: KlineColumns = KlineColumns {
    time: 0,
    open: 1,
    high: 2,
    low: 3,
    close: 4,
    volume: 6,
    unit: TimeUnit::Seconds,
};

/// Interval in minutes
const PERIODS: &[(KlinePeriod, &str)] = &[
    (KlinePeriod::Min1, "1"),
    (KlinePeriod::Min5, "5"),
    (KlinePeriod::Min15, "15"),
    (KlinePeriod::Min30, "30"),
    (KlinePeriod::Hour1, "60"),
    (KlinePeriod::Hour4, "240"),
    (KlinePeriod::Day1, "1440"),
    (KlinePeriod::Week1, "10080"),
];

const ERRORS: ErrorTable = ErrorTable {
    codes: &[
        ("EOrder:Unknown order", VenueErrorKind::OrderNotFound),
        ("EOrder:Insufficient funds", VenueErrorKind::InsufficientBalance),
        ("EOrder:Rate limit exceeded", VenueErrorKind::RateLimited),
        ("EAPI:Rate limit exceeded", VenueErrorKind::RateLimited),
        ("EGeneral:Too many requests", VenueErrorKind::RateLimited),
    ],
    patterns: &[],
};

const SIGNER: SignScheme = SignScheme::Path(PathScheme {
    key_header: "API-Key",
    sign_header: "API-Sign",
});

/// Closed orders per `ClosedOrders` page
const CLOSED_PAGE: usize = 50;

fn status(native: &str, vol_exec: Decimal) -> TradeStatus {
    match native {
        "pending" | "open" if vol_exec > Decimal::ZERO => TradeStatus::PartiallyFilled,
        "pending" | "open" => TradeStatus::Unfinished,
        "closed" => TradeStatus::Filled,
        "canceled" | "expired" => TradeStatus::Canceled,
        _ => TradeStatus::Unfinished,
    }
}

/// Kraken spelling of a pair
pub fn venue_symbol(pair: &CurrencyPair) -> ExchangeResult<String> {
    Ok(SYMBOL.render(&pair.map_currencies(adapt_btc_to_xbt)?))
}

/// Listing details from `AssetPairs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPairInfo {
    /// Result key, e.g. `XXBTZUSD`
    pub key: String,
    /// Request symbol, e.g. `XBTUSD`
    pub altname: String,
    pub pair: CurrencyPair,
    pub price_decimals: u32,
    pub amount_decimals: u32,
    pub min_amount: Decimal,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TickerWire {
    #[serde(default)]
    a: Vec<Value>,
    #[serde(default)]
    b: Vec<Value>,
    #[serde(default)]
    c: Vec<Value>,
    #[serde(default)]
    v: Vec<Value>,
    #[serde(default)]
    l: Vec<Value>,
    #[serde(default)]
    h: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BookWire {
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct AddOrderWire {
    #[serde(default)]
    txid: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CancelWire {
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct OrderDescrWire {
    #[serde(default)]
    pair: String,
    #[serde(default, rename = "type")]
    side: String,
    #[serde(default)]
    ordertype: String,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct OrderWire {
    #[serde(default)]
    status: String,
    #[serde(default)]
    opentm: Option<f64>,
    #[serde(default)]
    closetm: Option<f64>,
    #[serde(deserialize_with = "de::strict_decimal")]
    vol: Decimal,
    #[serde(deserialize_with = "de::strict_decimal")]
    vol_exec: Decimal,
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    cost: Option<Decimal>,
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    fee: Option<Decimal>,
    /// Average fill price
    #[serde(default, deserialize_with = "de::strict_opt_decimal")]
    price: Option<Decimal>,
    #[serde(default)]
    userref: Option<Value>,
    descr: OrderDescrWire,
}

#[derive(Debug, Deserialize)]
struct OpenOrdersWire {
    #[serde(default)]
    open: HashMap<String, OrderWire>,
}

#[derive(Debug, Deserialize)]
struct ClosedOrdersWire {
    #[serde(default)]
    closed: HashMap<String, OrderWire>,
    #[serde(default)]
    count: usize,
}

#[derive(Debug, Deserialize)]
struct AssetPairWire {
    #[serde(default)]
    altname: String,
    #[serde(default)]
    wsname: String,
    #[serde(default)]
    pair_decimals: u32,
    #[serde(default)]
    lot_decimals: u32,
    #[serde(default, deserialize_with = "de::lossy_decimal")]
    ordermin: Decimal,
}

// ============================================================================
// Normalizers
// ============================================================================

fn check(response: &HttpResponse) -> ExchangeResult<Value> {
    let mut body = parse_body(response)?;
    let errors: Vec<String> = body
        .get("error")
        .and_then(Value::as_array)
        .map(|errs| errs.iter().map(value_to_string).collect())
        .unwrap_or_default();
    if let Some(first) = errors.first() {
        warn!(venue = VENUE, error = %first, "Venue rejected request");
        return Err(ERRORS.error(Some(first.clone()), errors.join("; ")));
    }
    ensure_success(response, &body, &ERRORS)?;
    Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
}

/// Public results are keyed by Kraken's own pair name; take the single entry
fn single_entry(result: Value, what: &str) -> ExchangeResult<Value> {
    match result {
        Value::Object(map) => map
            .into_iter()
            .find(|(k, _)| k != "last")
            .map(|(_, v)| v)
            .ok_or_else(|| ExchangeError::normalization(what, "empty result")),
        other => Err(ExchangeError::normalization(what, format!("expected an object, got {}", other))),
    }
}

fn first_at(values: &[Value], index: usize) -> Decimal {
    lossy_decimal_at(values, index)
}

fn parse_ticker(pair: &CurrencyPair, result: Value, captured_at: i64) -> ExchangeResult<Ticker> {
    let wire: TickerWire = decode(single_entry(result, "ticker")?, "ticker")?;
    Ok(Ticker {
        pair: pair.clone(),
        last: first_at(&wire.c, 0),
        buy: first_at(&wire.b, 0),
        sell: first_at(&wire.a, 0),
        // index 1 is the rolling 24h window
        high: first_at(&wire.h, 1),
        low: first_at(&wire.l, 1),
        vol: first_at(&wire.v, 1),
        timestamp: captured_at,
    })
}

fn parse_trades(pair: &CurrencyPair, result: Value) -> ExchangeResult<Vec<Trade>> {
    let rows: Vec<Value> = decode(single_entry(result, "trades")?, "trades")?;
    Ok(rows
        .iter()
        .filter_map(Value::as_array)
        .map(|row| {
            let millis = row.get(2).and_then(fractional_seconds_millis).unwrap_or(0);
            let tid = row
                .get(6)
                .map(value_to_string)
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| millis.to_string());
            Trade {
                pair: pair.clone(),
                tid,
                side: if row.get(3).and_then(Value::as_str) == Some("s") {
                    TradeSide::Sell
                } else {
                    TradeSide::Buy
                },
                price: lossy_decimal_at(row, 0),
                amount: lossy_decimal_at(row, 1),
                timestamp: millis,
            }
        })
        .collect())
}

fn seconds_to_millis(secs: Option<f64>) -> Option<i64> {
    secs.filter(|s| *s > 0.0).map(|s| (s * 1000.0) as i64)
}

fn parse_order(order_id: String, pair: &CurrencyPair, wire: OrderWire) -> ExchangeResult<Order> {
    let order_type = if wire.descr.ordertype == "market" {
        OrderType::Market
    } else {
        OrderType::Limit
    };
    let side = TradeSide::from_parts(wire.descr.side == "buy", order_type);
    let avg = wire
        .price
        .or_else(|| wire.cost.and_then(|cost| tradewire_types::average_price(cost, wire.vol_exec)));

    let mut order = Order::new(order_id, pair.clone(), side, wire.descr.price, wire.vol)
        .with_fill(wire.vol_exec, avg)?
        .with_status(status(&wire.status, wire.vol_exec))
        .with_fee(wire.fee.unwrap_or_default())
        .with_times(seconds_to_millis(wire.opentm), seconds_to_millis(wire.closetm));
    if let Some(userref) = wire.userref.filter(|v| !v.is_null()) {
        order = order.with_client_order_id(value_to_string(&userref));
    }
    Ok(order)
}

fn parse_account(result: Value) -> ExchangeResult<Account> {
    let balances: HashMap<String, Value> = decode(result, "balance")?;
    let mut account = Account::new(VENUE);
    for (asset, amount) in balances {
        if asset.contains('.') {
            continue;
        }
        let amount = tradewire_types::coerce::strict_decimal(&amount, &asset)?;
        account.add(SubAccount::new(adapt_kraken_asset(&asset), amount, Decimal::ZERO));
    }
    Ok(account)
}

// ============================================================================
// Adapter
// ============================================================================

/// Kraken spot adapter
#[derive(Debug)]
pub struct Kraken {
    ctx: RestContext,
    asset_pairs: MetadataCache<HashMap<String, AssetPairInfo>>,
}

impl Kraken {
    pub fn new(config: VenueConfig) -> ExchangeResult<Self> {
        Ok(Self {
            ctx: RestContext::new(VENUE, BASE_URL, config)?,
            asset_pairs: MetadataCache::new(),
        })
    }

    /// Kraken nonces need no server clock; same as [`new`](Self::new)
    pub async fn connect(config: VenueConfig) -> ExchangeResult<Self> {
        Self::new(config)
    }

    pub fn context(&self) -> &RestContext {
        &self.ctx
    }

    /// Listing details for a pair, fetched once per adapter
    #[instrument(skip(self), fields(venue = VENUE))]
    pub async fn pair_info(&self, pair: &CurrencyPair) -> ExchangeResult<AssetPairInfo> {
        let symbol = venue_symbol(pair)?;
        self.asset_pair_table()
            .await?
            .get(&symbol)
            .cloned()
            .ok_or_else(|| ExchangeError::InvalidPair(format!("{} is not listed on {}", symbol, VENUE)))
    }

    /// Resolve an altname or result key such as `XXBTZUSD`
    pub async fn pair_for_symbol(&self, symbol: &str) -> ExchangeResult<CurrencyPair> {
        let table = self.asset_pair_table().await?;
        table
            .get(symbol)
            .or_else(|| table.values().find(|info| info.key == symbol))
            .map(|info| info.pair.clone())
            .ok_or_else(|| ExchangeError::InvalidPair(format!("{} is not listed on {}", symbol, VENUE)))
    }

    async fn asset_pair_table(&self) -> ExchangeResult<&HashMap<String, AssetPairInfo>> {
        self.asset_pairs
            .get_or_try_init(|| async {
                let result = self.public("/0/public/AssetPairs", Vec::new()).await?;
                let wire: HashMap<String, AssetPairWire> = decode(result, "AssetPairs")?;
                Ok(wire
                    .into_iter()
                    .filter_map(|(key, w)| {
                        let pair = SymbolFormat::upper("/")
                            .parse(&w.wsname)
                            .ok()?
                            .map_currencies(adapt_xbt_to_btc)
                            .ok()?;
                        Some((
                            w.altname.clone(),
                            AssetPairInfo {
                                key,
                                altname: w.altname,
                                pair,
                                price_decimals: w.pair_decimals,
                                amount_decimals: w.lot_decimals,
                                min_amount: w.ordermin,
                            },
                        ))
                    })
                    .collect())
            })
            .await
    }

    async fn public(&self, path: &str, params: Vec<(String, String)>) -> ExchangeResult<Value> {
        let response = self.ctx.get(path, &params).await?;
        check(&response)
    }

    fn private_request(&self, path: &str, params: Vec<(String, String)>) -> ExchangeResult<HttpRequest> {
        let signed = self.ctx.sign(&SIGNER, "POST", path, params, None)?;
        Ok(HttpRequest::post(self.ctx.url(path))
            .with_headers(signed.headers)
            .with_form(signed.params))
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
        let mut params = vec![
            ("pair".to_string(), venue_symbol(pair)?),
            ("type".to_string(), if side.is_buy() { "buy" } else { "sell" }.to_string()),
            (
                "ordertype".to_string(),
                if side.is_market() { "market" } else { "limit" }.to_string(),
            ),
            ("volume".to_string(), amount.normalize().to_string()),
        ];
        if !side.is_market() {
            params.push(("price".to_string(), price.normalize().to_string()));
        }

        let request = self.private_request("/0/private/AddOrder", params)?;
        let response = self.ctx.send_order(request).await?;
        let wire: AddOrderWire = decode(check(&response)?, "AddOrder")?;
        let txid = wire
            .txid
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::normalization("txid", "AddOrder returned no transaction id"))?;
        let limit_price = if side.is_market() { Decimal::ZERO } else { price };
        Ok(Order::new(txid, pair.clone(), side, limit_price, amount))
    }
}

#[async_trait]
impl Exchange for Kraken {
    fn venue(&self) -> &'static str {
        VENUE
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_ticker(&self, pair: &CurrencyPair) -> ExchangeResult<Ticker> {
        let result = self
            .public("/0/public/Ticker", vec![("pair".into(), venue_symbol(pair)?)])
            .await?;
        parse_ticker(pair, result, self.ctx.now_millis())
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_depth(&self, size: usize, pair: &CurrencyPair) -> ExchangeResult<Depth> {
        let count = DEPTH_TIERS.request_size(size).unwrap_or(100);
        let result = self
            .public(
                "/0/public/Depth",
                vec![
                    ("pair".into(), venue_symbol(pair)?),
                    ("count".into(), count.to_string()),
                ],
            )
            .await?;
        let book: BookWire = decode(single_entry(result, "depth")?, "depth")?;
        Ok(depth_from_rows(
            pair,
            &book.bids,
            &book.asks,
            DepthColumns::PRICE_AMOUNT,
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
        let mut params = vec![
            ("pair".to_string(), venue_symbol(pair)?),
            ("interval".to_string(), period_code(PERIODS, VENUE, period)?.to_string()),
        ];
        if let Some(since) = since {
            params.push(("since".to_string(), (since / 1000).to_string()));
        }
        let result = self.public("/0/public/OHLC", params).await?;
        let rows: Vec<Value> = decode(single_entry(result, "klines")?, "klines")?;
        Ok(KLINE_COLUMNS.klines(pair, &rows, size))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_trades(&self, pair: &CurrencyPair, since: Option<i64>) -> ExchangeResult<Vec<Trade>> {
        let mut params = vec![("pair".to_string(), venue_symbol(pair)?)];
        if let Some(since) = since {
            params.push(("since".to_string(), (since as i128 * 1_000_000).to_string()));
        }
        let result = self.public("/0/public/Trades", params).await?;
        parse_trades(pair, result)
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
            "/0/private/CancelOrder",
            vec![("txid".to_string(), order_id.to_string())],
        )?;
        let response = self.ctx.send_order(request).await?;
        let wire: CancelWire = decode(check(&response)?, "CancelOrder")?;
        Ok(wire.count > 0)
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order(&self, order_id: &str, pair: &CurrencyPair) -> ExchangeResult<Order> {
        let result = self
            .private(
                "/0/private/QueryOrders",
                vec![("txid".to_string(), order_id.to_string())],
            )
            .await?;
        let mut orders: HashMap<String, OrderWire> = decode(result, "QueryOrders")?;
        let wire = orders.remove(order_id).ok_or_else(|| {
            ExchangeError::venue(
                VenueErrorKind::OrderNotFound,
                None,
                format!("order {} not returned by QueryOrders", order_id),
            )
        })?;
        parse_order(order_id.to_string(), pair, wire)
    }

    /// Kraken lists every open order; the result is filtered to `pair`
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_open_orders(&self, pair: &CurrencyPair) -> ExchangeResult<Vec<Order>> {
        let result = self.private("/0/private/OpenOrders", Vec::new()).await?;
        let wire: OpenOrdersWire = decode(result, "OpenOrders")?;
        let symbol = venue_symbol(pair)?;
        let mut orders = wire
            .open
            .into_iter()
            .filter(|(_, o)| o.descr.pair == symbol)
            .map(|(txid, o)| parse_order(txid, pair, o))
            .collect::<ExchangeResult<Vec<_>>>()?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Pages of `ClosedOrders` by offset, filtered to `pair` afterwards
    ///
    /// The venue returns up to 50 orders per call across all pairs, so
    /// `page_size` is capped at 50 and offsets are counted in capped pages.
    /// A page may hold fewer items than that while `has_more` is true.
    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_order_history(
        &self,
        pair: &CurrencyPair,
        page: Option<PageRequest>,
    ) -> ExchangeResult<Page<Order>> {
        let page = page.unwrap_or_default();
        let page = PageRequest::new(page.page, page.page_size.min(CLOSED_PAGE as u32));
        let offset = page.offset();
        let result = self
            .private(
                "/0/private/ClosedOrders",
                vec![("ofs".to_string(), offset.to_string())],
            )
            .await?;
        let wire: ClosedOrdersWire = decode(result, "ClosedOrders")?;
        let returned = wire.closed.len().min(CLOSED_PAGE);
        let symbol = venue_symbol(pair)?;

        let mut orders = wire
            .closed
            .into_iter()
            .filter(|(_, o)| o.descr.pair == symbol)
            .map(|(txid, o)| parse_order(txid, pair, o))
            .collect::<ExchangeResult<Vec<_>>>()?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(page.page_size as usize);

        let has_more = (offset as usize) + returned < wire.count;
        Ok(Page::new(orders, has_more))
    }

    #[instrument(skip(self), fields(venue = VENUE))]
    async fn get_account(&self) -> ExchangeResult<Account> {
        let result = self.private("/0/private/Balance", Vec::new()).await?;
        parse_account(result)
    }
}
