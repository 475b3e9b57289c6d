//! Persistence projection of price alerts.
//!
//! Export produces plain records; import validates each record on its own so a
//! single bad entry never poisons the batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_core::Timestamp;

use crate::model::{AlertCondition, AlertId, AlertKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializableAlert {
    pub id: AlertId,
    pub level: f64,
    pub condition: AlertCondition,
    pub kind: AlertKind,
    pub created_at: Timestamp,
}

/// Validate one persisted record. The error string names the rejected field.
pub(crate) fn parse_record(value: &Value, now: Timestamp) -> Result<SerializableAlert, &'static str> {
    let obj = value.as_object().ok_or("record is not an object")?;

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => AlertId::new(s.clone()),
        Some(Value::Number(n)) => AlertId::new(n.to_string()),
        _ => return Err("id"),
    };

    let level = obj
        .get("level")
        .and_then(Value::as_f64)
        .filter(|l| l.is_finite())
        .ok_or("level")?;

    let condition = match obj.get("condition") {
        None | Some(Value::Null) => AlertCondition::Crossing,
        Some(Value::String(s)) => s.parse::<AlertCondition>().map_err(|_| "condition")?,
        Some(_) => return Err("condition"),
    };
    if condition.is_area() {
        return Err("condition");
    }

    match obj.get("kind") {
        None | Some(Value::Null) => {}
        Some(Value::String(k)) if k == "price" => {}
        Some(_) => return Err("kind"),
    }

    let created_at = obj
        .get("createdAt")
        .and_then(Value::as_i64)
        .unwrap_or(now);

    Ok(SerializableAlert {
        id,
        level,
        condition,
        kind: AlertKind::Price,
        created_at,
    })
}
