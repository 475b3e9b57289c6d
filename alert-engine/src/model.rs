use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_core::Timestamp;

use crate::error::AlertError;
use crate::tools::{ToolCategory, ToolHandle};

/// Opaque alert identifier, unique within one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlertId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AlertId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    Crossing,
    CrossingUp,
    CrossingDown,
    Entering,
    Exiting,
    Inside,
    Outside,
}

/// Conditions offered for fixed prices and line-like drawings.
pub const LINE_CONDITIONS: &[AlertCondition] = &[
    AlertCondition::Crossing,
    AlertCondition::CrossingUp,
    AlertCondition::CrossingDown,
];

/// Conditions offered for area drawings (rectangles and other shapes).
pub const AREA_CONDITIONS: &[AlertCondition] = &[
    AlertCondition::Entering,
    AlertCondition::Exiting,
    AlertCondition::Inside,
    AlertCondition::Outside,
];

/// Vertical markers have no price, only a time to cross.
pub const MARKER_CONDITIONS: &[AlertCondition] = &[AlertCondition::Crossing];

impl AlertCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCondition::Crossing => "crossing",
            AlertCondition::CrossingUp => "crossing_up",
            AlertCondition::CrossingDown => "crossing_down",
            AlertCondition::Entering => "entering",
            AlertCondition::Exiting => "exiting",
            AlertCondition::Inside => "inside",
            AlertCondition::Outside => "outside",
        }
    }

    pub fn is_area(&self) -> bool {
        AREA_CONDITIONS.contains(self)
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertCondition {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crossing" => Ok(AlertCondition::Crossing),
            "crossing_up" => Ok(AlertCondition::CrossingUp),
            "crossing_down" => Ok(AlertCondition::CrossingDown),
            "entering" => Ok(AlertCondition::Entering),
            "exiting" => Ok(AlertCondition::Exiting),
            "inside" => Ok(AlertCondition::Inside),
            "outside" => Ok(AlertCondition::Outside),
            other => Err(AlertError::UnknownCondition(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Price,
    Tool,
}

/// Where an alert's level comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertLevel {
    Price(f64),
    /// Weak binding to a drawing. `resolved` caches the last level the adapter
    /// produced so ordering and hit-testing have a value between bars;
    /// `category` is fixed when the alert is bound.
    Tool {
        handle: ToolHandle,
        category: ToolCategory,
        resolved: f64,
    },
}

impl AlertLevel {
    pub fn value(&self) -> f64 {
        match *self {
            AlertLevel::Price(p) => p,
            AlertLevel::Tool { resolved, .. } => resolved,
        }
    }

    pub fn kind(&self) -> AlertKind {
        match self {
            AlertLevel::Price(_) => AlertKind::Price,
            AlertLevel::Tool { .. } => AlertKind::Tool,
        }
    }

    pub fn tool_category(&self) -> Option<ToolCategory> {
        match *self {
            AlertLevel::Price(_) => None,
            AlertLevel::Tool { category, .. } => Some(category),
        }
    }

    pub fn tool(&self) -> Option<ToolHandle> {
        match *self {
            AlertLevel::Price(_) => None,
            AlertLevel::Tool { handle, .. } => Some(handle),
        }
    }
}

/// Which side of a level a bar's close sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Above,
    Below,
    At,
}

impl Side {
    pub fn of(close: f64, level: f64) -> Self {
        if close > level {
            Side::Above
        } else if close < level {
            Side::Below
        } else {
            Side::At
        }
    }
}

/// Directional debounce memory for line conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionState {
    #[default]
    Undetermined,
    Above,
    Below,
}

/// Containment memory for area conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneState {
    #[default]
    Undetermined,
    Inside,
    Outside,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub(crate) id: AlertId,
    pub(crate) level: AlertLevel,
    pub(crate) condition: AlertCondition,
    pub(crate) created_at: Timestamp,
    pub(crate) direction: DirectionState,
    pub(crate) zone: ZoneState,
}

impl Alert {
    pub(crate) fn new(
        id: AlertId,
        level: AlertLevel,
        condition: AlertCondition,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            level,
            condition,
            created_at,
            direction: DirectionState::Undetermined,
            zone: ZoneState::Undetermined,
        }
    }

    pub fn id(&self) -> &AlertId {
        &self.id
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }

    /// Numeric level used for ordering, labels and hit-testing.
    pub fn level_value(&self) -> f64 {
        self.level.value()
    }

    pub fn kind(&self) -> AlertKind {
        self.level.kind()
    }

    pub fn condition(&self) -> AlertCondition {
        self.condition
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn direction_state(&self) -> DirectionState {
        self.direction
    }

    pub fn zone_state(&self) -> ZoneState {
        self.zone
    }

    pub(crate) fn reset_state(&mut self) {
        self.direction = DirectionState::Undetermined;
        self.zone = ZoneState::Undetermined;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingDirection {
    Up,
    Down,
    Into,
    OutOf,
}

/// A fired alert. Produced once, then the alert is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossingEvent {
    pub alert_id: AlertId,
    pub alert_level: f64,
    pub crossing_price: f64,
    pub direction: CrossingDirection,
    pub condition: AlertCondition,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_parses_loosely() {
        assert_eq!(
            " Crossing_Up ".parse::<AlertCondition>().unwrap(),
            AlertCondition::CrossingUp
        );
        assert!("sideways".parse::<AlertCondition>().is_err());
    }

    #[test]
    fn condition_families_are_disjoint() {
        for c in LINE_CONDITIONS {
            assert!(!c.is_area());
        }
        for c in AREA_CONDITIONS {
            assert!(c.is_area());
        }
        assert_eq!(MARKER_CONDITIONS, &[AlertCondition::Crossing]);
    }

    #[test]
    fn side_treats_equality_as_at() {
        assert_eq!(Side::of(100.0, 100.0), Side::At);
        assert_eq!(Side::of(100.5, 100.0), Side::Above);
        assert_eq!(Side::of(99.5, 100.0), Side::Below);
    }

    #[test]
    fn crossing_event_uses_camel_case_json() {
        let ev = CrossingEvent {
            alert_id: AlertId::from("7"),
            alert_level: 100.0,
            crossing_price: 101.0,
            direction: CrossingDirection::Up,
            condition: AlertCondition::Crossing,
            timestamp: 60_000,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["alertId"], "7");
        assert_eq!(json["direction"], "up");
        assert_eq!(json["condition"], "crossing");
    }
}
