use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// OrderLine
// ---------------------------------------------------------------------------

/// One product within one order, as returned by the backend.
///
/// The backend relays whatever the upstream store sent, so every field is
/// optional and text fields accept numbers too. Use the accessors for display;
/// they degrade to an empty string instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default, deserialize_with = "lenient_text")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_order_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub order_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub buyer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_option: Option<String>,
    /// Raw quantity: number, numeric string, null, or missing.
    #[serde(default)]
    pub quantity: Option<Value>,
}

impl OrderLine {
    pub fn order_id(&self) -> &str {
        self.order_id.as_deref().unwrap_or("")
    }

    pub fn product_order_id(&self) -> &str {
        self.product_order_id.as_deref().unwrap_or("")
    }

    pub fn order_date(&self) -> &str {
        self.order_date.as_deref().unwrap_or("")
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("")
    }

    pub fn buyer_name(&self) -> &str {
        self.buyer_name.as_deref().unwrap_or("")
    }

    pub fn product_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or("")
    }

    pub fn product_option(&self) -> Option<&str> {
        self.product_option.as_deref().filter(|s| !s.is_empty())
    }

    /// Quantity coerced to an integer. Non-numeric or missing values count as 0.
    pub fn quantity(&self) -> i64 {
        self.quantity.as_ref().map(coerce_int).unwrap_or(0)
    }

    /// Quantity exactly as the backend sent it, for the detail rows.
    pub fn quantity_text(&self) -> String {
        match &self.quantity {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Integer coercion with leading-integer semantics: `"3"` → 3, `"3개"` → 3,
/// `2.9` → 2, `"abc"` → 0.
pub fn coerce_int(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => leading_int(s),
        _ => 0,
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.and_then(|v| match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }))
}

// ---------------------------------------------------------------------------
// OrderGroup
// ---------------------------------------------------------------------------

/// All lines of one purchase, in the order the backend listed them.
/// Only built by the projector, so it is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderGroup {
    pub order_id: String,
    pub lines: Vec<OrderLine>,
}

impl OrderGroup {
    pub(crate) fn new(first: OrderLine) -> Self {
        Self {
            order_id: first.order_id().to_string(),
            lines: vec![first],
        }
    }

    /// The line whose date, status and buyer stand for the whole group.
    pub fn representative(&self) -> &OrderLine {
        &self.lines[0]
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Saturates instead of overflowing on absurd quantities.
    pub fn total_quantity(&self) -> i64 {
        self.lines
            .iter()
            .map(OrderLine::quantity)
            .fold(0i64, |acc, q| acc.saturating_add(q))
    }
}

// ---------------------------------------------------------------------------
// Sync progress
// ---------------------------------------------------------------------------

/// Snapshot reported by the sync driver before each chunk request goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub offset_days: u32,
    pub total_days: u32,
    pub chunk_days: u32,
    pub percent_complete: u32,
    pub chunk_index: u32,
    pub chunk_count: u32,
    /// Upper bound of the window for display, clamped to `total_days`.
    pub window_end_days: u32,
}

// ---------------------------------------------------------------------------
// Backend contract
// ---------------------------------------------------------------------------

/// Successful body of `/api/orders`. Failure bodies (`{error}`) are read by
/// the client's status check before this is decoded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersResponse {
    #[serde(default)]
    pub orders: Option<Vec<OrderLine>>,
}

/// Body of `/api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductsResponse {
    #[serde(default)]
    pub products: Option<Vec<Product>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Shape of a `/api/orders` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderQuery {
    /// Whatever the backend has cached.
    Cached,
    /// Live re-fetch of one sub-window from the upstream source.
    SyncChunk { days: u32, offset: u32, clear: bool },
    /// Absolute range; never combined with sync parameters.
    Range { start: NaiveDate, end: NaiveDate },
}

impl OrderQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            OrderQuery::Cached => Vec::new(),
            OrderQuery::SyncChunk { days, offset, clear } => {
                let mut params = vec![
                    ("sync", "true".to_string()),
                    ("days", days.to_string()),
                    ("offset", offset.to_string()),
                ];
                if *clear {
                    params.push(("clear", "true".to_string()));
                }
                params
            }
            OrderQuery::Range { start, end } => vec![
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub total_stock: Option<Value>,
    #[serde(default)]
    pub options: Vec<ProductOption>,
}

impl Product {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("")
    }

    pub fn price(&self) -> i64 {
        self.price.as_ref().map(coerce_int).unwrap_or(0)
    }

    pub fn total_stock(&self) -> i64 {
        self.total_stock.as_ref().map(coerce_int).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default)]
    pub stock: Option<Value>,
}

impl ProductOption {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn stock(&self) -> i64 {
        self.stock.as_ref().map(coerce_int).unwrap_or(0)
    }
}
