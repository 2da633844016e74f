//! Unified upload format decoder
//!
//! Inflates a relay payload, parses the JSON document and turns the
//! column-oriented rowsets into typed order or history records.

use chrono::{DateTime, Utc};
use flate2::read::ZlibDecoder;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use crate::error::DecodeError;
use crate::models::batch::{MarketBatch, OrderBatch};
use crate::models::history::HistoryRecord;
use crate::models::order::OrderRecord;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnifiedMessage {
    result_type: String,
    #[serde(default)]
    upload_keys: Vec<UploadKey>,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rowsets: Vec<Rowset>,
}

#[derive(Debug, Deserialize)]
struct UploadKey {
    #[allow(dead_code)]
    name: String,
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Rowset {
    generated_at: DateTime<Utc>,
    #[serde(rename = "regionID")]
    region_id: Option<i64>,
    #[serde(rename = "typeID")]
    type_id: i64,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

/// Inflate and classify a raw relay message
pub fn decode_message(raw: &[u8]) -> Result<MarketBatch, DecodeError> {
    let mut json = String::new();
    ZlibDecoder::new(raw).read_to_string(&mut json)?;
    parse_message(&json)
}

/// Classify an already inflated JSON document
pub fn parse_message(json: &str) -> Result<MarketBatch, DecodeError> {
    let message: UnifiedMessage = serde_json::from_str(json)?;

    match message.result_type.as_str() {
        "orders" => Ok(MarketBatch::Orders(OrderBatch::new(order_records(&message)?))),
        "history" => Ok(MarketBatch::History(history_records(&message)?)),
        other => Ok(MarketBatch::Ignored(other.to_string())),
    }
}

struct Columns<'a> {
    positions: HashMap<&'a str, usize>,
}

impl<'a> Columns<'a> {
    fn new(columns: &'a [String]) -> Self {
        Self {
            positions: columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.as_str(), i))
                .collect(),
        }
    }

    fn position(&self, name: &'static str) -> Result<usize, DecodeError> {
        self.positions
            .get(name)
            .copied()
            .ok_or(DecodeError::MissingColumn(name))
    }
}

/// Resolved column positions for an orders document
struct OrderColumns {
    price: usize,
    vol_remaining: usize,
    range: usize,
    order_id: usize,
    vol_entered: usize,
    min_volume: usize,
    bid: usize,
    issue_date: usize,
    duration: usize,
    station_id: usize,
    solar_system_id: usize,
}

fn order_records(message: &UnifiedMessage) -> Result<Vec<OrderRecord>, DecodeError> {
    if message.rowsets.iter().all(|r| r.rows.is_empty()) {
        return Ok(Vec::new());
    }

    let columns = Columns::new(&message.columns);
    let idx = OrderColumns {
        price: columns.position("price")?,
        vol_remaining: columns.position("volRemaining")?,
        range: columns.position("range")?,
        order_id: columns.position("orderID")?,
        vol_entered: columns.position("volEntered")?,
        min_volume: columns.position("minVolume")?,
        bid: columns.position("bid")?,
        issue_date: columns.position("issueDate")?,
        duration: columns.position("duration")?,
        station_id: columns.position("stationID")?,
        solar_system_id: columns.position("solarSystemID")?,
    };

    let uploader_hash = message
        .upload_keys
        .first()
        .map(|k| k.key.clone())
        .unwrap_or_default();

    let mut orders = Vec::new();
    for rowset in &message.rowsets {
        let Some(region_id) = rowset.region_id else {
            tracing::debug!(type_id = rowset.type_id, "Skipping order rowset without region");
            continue;
        };

        for row in &rowset.rows {
            orders.push(OrderRecord {
                order_id: integer(row, idx.order_id, "orderID")?,
                region_id,
                type_id: rowset.type_id,
                station_id: integer(row, idx.station_id, "stationID")?,
                solar_system_id: integer(row, idx.solar_system_id, "solarSystemID")?,
                price: decimal(row, idx.price, "price")?,
                volume_remaining: integer(row, idx.vol_remaining, "volRemaining")?,
                volume_entered: integer(row, idx.vol_entered, "volEntered")?,
                min_volume: integer(row, idx.min_volume, "minVolume")?,
                range: small_integer(row, idx.range, "range")?,
                is_bid: boolean(row, idx.bid, "bid")?,
                issue_date: timestamp(row, idx.issue_date, "issueDate")?,
                duration: small_integer(row, idx.duration, "duration")?,
                generated_at: rowset.generated_at,
                is_suspicious: false,
                uploader_hash: uploader_hash.clone(),
                is_active: true,
            });
        }
    }

    Ok(orders)
}

fn history_records(message: &UnifiedMessage) -> Result<Vec<HistoryRecord>, DecodeError> {
    if message.rowsets.iter().all(|r| r.rows.is_empty()) {
        return Ok(Vec::new());
    }

    let columns = Columns::new(&message.columns);
    let date = columns.position("date")?;
    let orders = columns.position("orders")?;
    let quantity = columns.position("quantity")?;
    let low = columns.position("low")?;
    let high = columns.position("high")?;
    let average = columns.position("average")?;

    let mut records = Vec::new();
    for rowset in &message.rowsets {
        // Some uploaders send history without a region
        let Some(region_id) = rowset.region_id else {
            tracing::debug!(type_id = rowset.type_id, "Skipping history rowset without region");
            continue;
        };

        for row in &rowset.rows {
            records.push(HistoryRecord {
                region_id,
                type_id: rowset.type_id,
                date: timestamp(row, date, "date")?,
                num_orders: integer(row, orders, "orders")?,
                low: decimal(row, low, "low")?,
                high: decimal(row, high, "high")?,
                average: decimal(row, average, "average")?,
                quantity: integer(row, quantity, "quantity")?,
            });
        }
    }

    Ok(records)
}

fn cell<'a>(row: &'a [Value], idx: usize, column: &'static str) -> Result<&'a Value, DecodeError> {
    row.get(idx).ok_or(DecodeError::MissingColumn(column))
}

fn bad_value(column: &'static str, value: &Value) -> DecodeError {
    DecodeError::BadValue {
        column,
        value: value.to_string(),
    }
}

fn integer(row: &[Value], idx: usize, column: &'static str) -> Result<i64, DecodeError> {
    let value = cell(row, idx, column)?;
    value
        .as_i64()
        .or_else(|| {
            // Integral floats such as 1.0 show up from some generators
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .ok_or_else(|| bad_value(column, value))
}

fn small_integer(row: &[Value], idx: usize, column: &'static str) -> Result<i32, DecodeError> {
    let value = integer(row, idx, column)?;
    i32::try_from(value).map_err(|_| DecodeError::BadValue {
        column,
        value: value.to_string(),
    })
}

fn decimal(row: &[Value], idx: usize, column: &'static str) -> Result<Decimal, DecodeError> {
    let value = cell(row, idx, column)?;
    let Value::Number(number) = value else {
        return Err(bad_value(column, value));
    };
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| bad_value(column, value))
}

fn boolean(row: &[Value], idx: usize, column: &'static str) -> Result<bool, DecodeError> {
    let value = cell(row, idx, column)?;
    value.as_bool().ok_or_else(|| bad_value(column, value))
}

fn timestamp(row: &[Value], idx: usize, column: &'static str) -> Result<DateTime<Utc>, DecodeError> {
    let value = cell(row, idx, column)?;
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| bad_value(column, value))
}
