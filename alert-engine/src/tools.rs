//! Tool-price adapter: how an alert bound to a drawing finds its level.
//!
//! The alert engine never owns drawings. It holds a [`ToolHandle`] and asks the
//! adapter on every use; a handle the adapter no longer knows is stale and the
//! alert is skipped until the drawing comes back.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_core::LogicalIndex;

use crate::model::{AlertCondition, AREA_CONDITIONS, LINE_CONDITIONS, MARKER_CONDITIONS};

/// Opaque, copyable reference to a host-owned drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolHandle(u64);

impl ToolHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Line-like drawings that yield one price per logical index.
    Line,
    /// Closed shapes with an inside and an outside.
    Area,
    /// Vertical markers: a position on the time axis, no price.
    Marker,
}

impl ToolCategory {
    pub fn allowed_conditions(&self) -> &'static [AlertCondition] {
        match self {
            ToolCategory::Line => LINE_CONDITIONS,
            ToolCategory::Area => AREA_CONDITIONS,
            ToolCategory::Marker => MARKER_CONDITIONS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCategory::Line => "line",
            ToolCategory::Area => "area",
            ToolCategory::Marker => "vertical marker",
        }
    }
}

/// What one category of drawing can answer about itself.
pub trait ToolCapability {
    fn category(&self) -> ToolCategory;

    /// Price of the drawing at `index`, or `None` where it has no price there.
    fn resolve_level(&self, index: LogicalIndex) -> Option<f64>;

    /// Containment test for area drawings.
    fn contains(&self, _index: LogicalIndex, _price: f64) -> Option<bool> {
        None
    }

    /// A price coordinate the drawing exposes directly (an anchor point).
    fn anchor_price(&self) -> Option<f64> {
        None
    }

    /// Time-axis position of a marker.
    fn marker_index(&self) -> Option<LogicalIndex> {
        None
    }

    fn allowed_conditions(&self) -> &'static [AlertCondition] {
        self.category().allowed_conditions()
    }
}

/// Host-side lookup from handles to live drawings.
///
/// Only [`capability`](ToolPriceAdapter::capability) is required; the other
/// methods delegate to it and treat an unknown handle as stale.
pub trait ToolPriceAdapter {
    fn capability(&self, tool: ToolHandle) -> Option<&dyn ToolCapability>;

    fn is_alive(&self, tool: ToolHandle) -> bool {
        self.capability(tool).is_some()
    }

    fn category(&self, tool: ToolHandle) -> Option<ToolCategory> {
        self.capability(tool).map(|c| c.category())
    }

    fn resolve_level(&self, tool: ToolHandle, index: LogicalIndex) -> Option<f64> {
        self.capability(tool)
            .and_then(|c| c.resolve_level(index))
            .filter(|p| p.is_finite())
    }

    fn contains(&self, tool: ToolHandle, index: LogicalIndex, price: f64) -> Option<bool> {
        self.capability(tool).and_then(|c| c.contains(index, price))
    }

    fn anchor_price(&self, tool: ToolHandle) -> Option<f64> {
        self.capability(tool)
            .and_then(|c| c.anchor_price())
            .filter(|p| p.is_finite())
    }

    fn marker_index(&self, tool: ToolHandle) -> Option<LogicalIndex> {
        self.capability(tool)
            .and_then(|c| c.marker_index())
            .filter(|i| i.is_finite())
    }

    fn allowed_conditions(&self, tool: ToolHandle) -> &'static [AlertCondition] {
        self.capability(tool)
            .map(|c| c.allowed_conditions())
            .unwrap_or(&[])
    }
}

/// Adapter for hosts without drawings: every handle is stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTools;

impl ToolPriceAdapter for NoTools {
    fn capability(&self, _tool: ToolHandle) -> Option<&dyn ToolCapability> {
        None
    }
}
