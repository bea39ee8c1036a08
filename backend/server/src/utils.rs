use axum::body::Bytes;
use serde_json::{Map, Value};

use crate::{
    error::AppError::{
        self, InvalidAmount, InvalidCount, InvalidPinnedValue, MalformedPayload, PinnedOutOfRange,
    },
    store::Ticket,
};

pub const AMOUNT_FIELD: &str = "monto";
pub const COUNT_FIELD: &str = "cantidadGanadores";
pub const PINNED_FIELDS: [&str; 2] = ["primerPuestoManual", "segundoPuestoManual"];

pub fn get_fields(body: &Bytes) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice(body).map_err(|_| MalformedPayload)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(MalformedPayload),
    }
}

/// JSON numbers like `3.0` count as integers, same as `Number.isInteger` on the frontend.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

pub fn get_amount(fields: &Map<String, Value>) -> Result<f64, AppError> {
    fields
        .get(AMOUNT_FIELD)
        .and_then(Value::as_f64)
        .ok_or(InvalidAmount)
}

pub fn get_count(fields: &Map<String, Value>) -> Result<i64, AppError> {
    fields.get(COUNT_FIELD).and_then(as_integer).ok_or(InvalidCount)
}

/// Manual placements are not checked against the pool, but they still have to fit a ticket:
/// non-integers fail with `InvalidPinnedValue`, integers outside `u32` with `PinnedOutOfRange`.
pub fn get_pinned(fields: &Map<String, Value>) -> Result<Vec<Option<Ticket>>, AppError> {
    PINNED_FIELDS
        .iter()
        .map(|field| match fields.get(*field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let n = as_integer(value).ok_or(InvalidPinnedValue)?;
                Ticket::try_from(n).map(Some).map_err(|_| PinnedOutOfRange(n))
            }
        })
        .collect()
}
