//! Exbitron v1 wire formats.
//!
//! Raw request/response shapes and their conversion into core types. Kept
//! separate from the HTTP plumbing so response handling can be tested
//! without a network.

use exbit_core::{
    Balances, BookLevel, MarketId, MarketInfo, Order, OrderBookSnapshot, OrderReceipt,
    OrderRequest, OrderSide, OrderStatus, OrderType, Price, Size,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

/// `GET /balances` response.
#[derive(Debug, Deserialize)]
struct RawBalancesResponse {
    data: Option<RawBalancesData>,
}

#[derive(Debug, Deserialize)]
struct RawBalancesData {
    user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    currencies: Vec<RawCurrency>,
}

#[derive(Debug, Deserialize)]
struct RawCurrency {
    id: String,
    balance: Decimal,
    #[serde(default)]
    enabled: bool,
}

/// `GET /trading/info/{market}` response.
#[derive(Debug, Deserialize)]
struct RawMarketInfoResponse {
    data: Option<RawMarketInfoData>,
}

#[derive(Debug, Deserialize)]
struct RawMarketInfoData {
    market: Option<RawMarket>,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    #[serde(default)]
    trading_min_amount: Option<Decimal>,
    #[serde(default)]
    trading_min_price: Option<Decimal>,
}

/// `GET /orderbook/{market}` response.
///
/// Levels are `[price, volume, ...]` arrays; trailing fields are ignored.
#[derive(Debug, Deserialize)]
struct RawOrderBook {
    bids: Option<Vec<Vec<Decimal>>>,
    asks: Option<Vec<Vec<Decimal>>>,
}

/// One entry of `GET /order/market/{market}`.
#[derive(Debug, Deserialize)]
struct RawOrder {
    id: Value,
    #[serde(default)]
    market: Option<String>,
    side: OrderSide,
    price: Decimal,
    #[serde(alias = "volume", alias = "origin_volume")]
    amount: Decimal,
    status: OrderStatus,
}

/// `POST /order` body.
#[derive(Debug, Serialize)]
pub struct RawOrderRequest<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub market: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
}

impl<'a> From<&'a OrderRequest> for RawOrderRequest<'a> {
    fn from(req: &'a OrderRequest) -> Self {
        Self {
            amount: req.volume.inner(),
            market: req.market.as_str(),
            price: req.price.inner(),
            side: req.side,
            order_type: req.order_type,
        }
    }
}

/// Parse balances, keeping only enabled assets.
pub fn parse_balances(body: Value) -> ClientResult<Balances> {
    let raw: RawBalancesResponse = serde_json::from_value(body)?;
    let currencies = raw
        .data
        .and_then(|d| d.user)
        .map(|u| u.currencies)
        .ok_or_else(|| ClientError::Parse("balances response missing data.user".to_string()))?;

    let total = currencies.len();
    let balances: Balances = currencies
        .into_iter()
        .filter(|c| c.enabled)
        .map(|c| (c.id, c.balance))
        .collect();

    debug!(total, enabled = balances.len(), "Parsed balances");
    Ok(balances)
}

/// Parse an order book. `None` when either side key is missing.
pub fn parse_order_book(body: Value) -> ClientResult<Option<OrderBookSnapshot>> {
    let raw: RawOrderBook = serde_json::from_value(body)?;
    let (Some(bids), Some(asks)) = (raw.bids, raw.asks) else {
        return Ok(None);
    };
    Ok(Some(OrderBookSnapshot::new(
        to_levels(bids),
        to_levels(asks),
    )))
}

fn to_levels(entries: Vec<Vec<Decimal>>) -> Vec<BookLevel> {
    entries
        .into_iter()
        .filter_map(|e| match e.as_slice() {
            [price, size, ..] => Some(BookLevel::new(Price::new(*price), Size::new(*size))),
            _ => {
                warn!(?e, "Skipping malformed book level");
                None
            }
        })
        .collect()
}

/// Parse market metadata. `None` when the market or its minimum volume is
/// not described.
pub fn parse_market_info(body: Value) -> ClientResult<Option<MarketInfo>> {
    let raw: RawMarketInfoResponse = serde_json::from_value(body)?;
    let Some(market) = raw.data.and_then(|d| d.market) else {
        return Ok(None);
    };
    Ok(market.trading_min_amount.map(|min_amount| MarketInfo {
        minimum_trade_volume: Size::new(min_amount),
        minimum_trade_price: market
            .trading_min_price
            .filter(|p| *p > Decimal::ZERO)
            .map(Price::new),
    }))
}

/// Parse an open-order listing. Accepts a bare array or `{"data": [...]}`.
pub fn parse_orders(body: Value, market: &MarketId) -> ClientResult<Vec<Order>> {
    let entries = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ClientError::Parse(
                    "order listing is neither an array nor {data: [...]}".to_string(),
                ))
            }
        },
        other => {
            return Err(ClientError::Parse(format!(
                "unexpected order listing: {other}"
            )))
        }
    };

    entries
        .into_iter()
        .map(|entry| {
            let raw: RawOrder = serde_json::from_value(entry)?;
            let id = id_to_string(&raw.id)
                .ok_or_else(|| ClientError::Parse(format!("order without id: {}", raw.id)))?;
            let order_market = match raw.market {
                Some(m) => MarketId::new(&m).map_err(|e| ClientError::Parse(e.to_string()))?,
                None => market.clone(),
            };
            Ok(Order {
                id,
                market: order_market,
                side: raw.side,
                price: Price::new(raw.price),
                volume: Size::new(raw.amount),
                status: raw.status,
            })
        })
        .collect()
}

/// Extract the order id from a placement response (`id` or `data.id`).
pub fn parse_receipt(body: &Value) -> OrderReceipt {
    let order_id = body
        .get("id")
        .or_else(|| body.get("data").and_then(|d| d.get("id")))
        .and_then(id_to_string);
    OrderReceipt { order_id }
}

fn id_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
