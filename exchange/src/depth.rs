use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Bids count as positive depth, asks as negative.
    pub fn sign(self) -> f64 {
        match self {
            Side::Bid => 1.0,
            Side::Ask => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PriceLevel {
    pub price: f64,
    #[serde(deserialize_with = "de_size")]
    pub quantity: u64,
    pub side: Side,
}

impl PriceLevel {
    pub fn signed_amount(&self) -> f64 {
        self.quantity as f64 * self.side.sign()
    }
}

/// One depth observation as served by the snapshot backend.
///
/// `levels` is optional on the wire: a live body without it is a malformed
/// payload and gets ignored downstream, a historical snapshot without it is
/// simply empty.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RawSnapshot {
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub levels: Option<Vec<PriceLevel>>,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_size")]
    pub last_size: Option<u64>,
    #[serde(default)]
    pub underlying_price: Option<f64>,
}

impl RawSnapshot {
    pub fn levels(&self) -> &[PriceLevel] {
        self.levels.as_deref().unwrap_or_default()
    }

    pub fn has_levels(&self) -> bool {
        !self.levels().is_empty()
    }

    /// Whole seconds, floored toward negative infinity.
    pub fn time_secs(&self) -> i64 {
        self.timestamp.div_euclid(1000)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoricalBatch {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub snapshots: Vec<RawSnapshot>,
}

// The backend stores sizes as REAL columns, so `2` may arrive as `2.0`.
fn size_from_value<E: serde::de::Error>(value: Value) -> Result<u64, E> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Ok(v)
            } else {
                n.as_f64()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .map(|v| v.round() as u64)
                    .ok_or_else(|| E::custom(format!("expected non-negative size, got {n}")))
            }
        }
        Value::String(s) => s.parse::<u64>().map_err(E::custom),
        other => Err(E::custom(format!("expected size as number, got {other}"))),
    }
}

fn de_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    size_from_value(value)
}

fn de_opt_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => size_from_value(value).map(Some),
    }
}
