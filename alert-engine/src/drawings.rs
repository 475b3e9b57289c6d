//! In-memory drawing book that can back tool-bound alerts.
//!
//! Anchors live in logical-index space so a drawing keeps its place when the
//! host pans or zooms. Removed drawings are parked so an undo can restore them
//! under the same handle.

use serde::{Deserialize, Serialize};
use ts_core::LogicalIndex;

use crate::tools::{ToolCapability, ToolCategory, ToolHandle, ToolPriceAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawingShape {
    HorizontalLine {
        price: f64,
    },
    /// `price` is where the marker was placed; it has no level of its own.
    VerticalLine {
        index: LogicalIndex,
        price: f64,
    },
    TrendLine {
        index1: LogicalIndex,
        price1: f64,
        index2: LogicalIndex,
        price2: f64,
        #[serde(default)]
        extended: bool,
    },
    Rectangle {
        index1: LogicalIndex,
        price1: f64,
        index2: LogicalIndex,
        price2: f64,
    },
}

impl DrawingShape {
    fn shift(&mut self, d_index: LogicalIndex, d_price: f64) {
        match self {
            DrawingShape::HorizontalLine { price } => *price += d_price,
            DrawingShape::VerticalLine { index, price } => {
                *index += d_index;
                *price += d_price;
            }
            DrawingShape::TrendLine {
                index1,
                price1,
                index2,
                price2,
                ..
            }
            | DrawingShape::Rectangle {
                index1,
                price1,
                index2,
                price2,
            } => {
                *index1 += d_index;
                *index2 += d_index;
                *price1 += d_price;
                *price2 += d_price;
            }
        }
    }
}

impl ToolCapability for DrawingShape {
    fn category(&self) -> ToolCategory {
        match self {
            DrawingShape::HorizontalLine { .. } | DrawingShape::TrendLine { .. } => {
                ToolCategory::Line
            }
            DrawingShape::Rectangle { .. } => ToolCategory::Area,
            DrawingShape::VerticalLine { .. } => ToolCategory::Marker,
        }
    }

    fn resolve_level(&self, at: LogicalIndex) -> Option<f64> {
        match *self {
            DrawingShape::HorizontalLine { price } => Some(price),
            DrawingShape::VerticalLine { .. } => None,
            DrawingShape::TrendLine {
                index1,
                price1,
                index2,
                price2,
                extended,
            } => {
                if index1 == index2 {
                    return None;
                }
                let lo = index1.min(index2);
                let hi = index1.max(index2);
                if !extended && (at < lo || at > hi) {
                    return None;
                }
                let slope = (price2 - price1) / (index2 - index1);
                Some(price1 + slope * (at - index1))
            }
            DrawingShape::Rectangle {
                index1,
                price1,
                index2,
                price2,
            } => {
                if at < index1.min(index2) || at > index1.max(index2) {
                    return None;
                }
                Some((price1 + price2) / 2.0)
            }
        }
    }

    fn contains(&self, at: LogicalIndex, price: f64) -> Option<bool> {
        match *self {
            DrawingShape::Rectangle {
                index1,
                price1,
                index2,
                price2,
            } => {
                if at < index1.min(index2) || at > index1.max(index2) {
                    return None;
                }
                Some(price >= price1.min(price2) && price <= price1.max(price2))
            }
            _ => None,
        }
    }

    fn anchor_price(&self) -> Option<f64> {
        match *self {
            DrawingShape::HorizontalLine { price } | DrawingShape::VerticalLine { price, .. } => {
                Some(price)
            }
            DrawingShape::TrendLine { price1, .. } => Some(price1),
            DrawingShape::Rectangle { price1, price2, .. } => Some((price1 + price2) / 2.0),
        }
    }

    fn marker_index(&self) -> Option<LogicalIndex> {
        match *self {
            DrawingShape::VerticalLine { index, .. } => Some(index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: ToolHandle,
    #[serde(flatten)]
    pub shape: DrawingShape,
}

#[derive(Debug)]
pub struct DrawingBook {
    drawings: Vec<Drawing>,
    removed: Vec<Drawing>,
    next_id: u64,
}

impl Default for DrawingBook {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingBook {
    pub fn new() -> Self {
        Self {
            drawings: Vec::new(),
            removed: Vec::new(),
            next_id: 1,
        }
    }

    /// Build a book from persisted drawings, keeping their handles.
    pub fn from_drawings(drawings: Vec<Drawing>) -> Self {
        let next_id = drawings
            .iter()
            .map(|d| d.id.raw())
            .max()
            .map_or(1, |max| max.wrapping_add(1).max(1));
        Self {
            drawings,
            removed: Vec::new(),
            next_id,
        }
    }

    pub fn add(&mut self, shape: DrawingShape) -> ToolHandle {
        let id = self.fresh_handle();
        self.drawings.push(Drawing { id, shape });
        id
    }

    /// Next unused handle. Wraps past `u64::MAX` and never hands out 0.
    fn fresh_handle(&mut self) -> ToolHandle {
        loop {
            let id = ToolHandle::new(self.next_id);
            self.next_id = self.next_id.wrapping_add(1).max(1);
            let taken = self
                .drawings
                .iter()
                .chain(self.removed.iter())
                .any(|d| d.id == id);
            if !taken {
                return id;
            }
        }
    }

    pub fn get(&self, id: ToolHandle) -> Option<&Drawing> {
        self.drawings.iter().find(|d| d.id == id)
    }

    pub fn drawings(&self) -> &[Drawing] {
        &self.drawings
    }

    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    /// Deleting a drawing leaves alerts bound to it stale.
    pub fn remove(&mut self, id: ToolHandle) -> Option<Drawing> {
        let idx = self.drawings.iter().position(|d| d.id == id)?;
        let drawing = self.drawings.remove(idx);
        self.removed.push(drawing.clone());
        Some(drawing)
    }

    /// Undo a removal. Alerts bound to `id` resolve again afterwards.
    pub fn restore(&mut self, id: ToolHandle) -> bool {
        match self.removed.iter().rposition(|d| d.id == id) {
            Some(idx) => {
                let drawing = self.removed.remove(idx);
                self.drawings.push(drawing);
                true
            }
            None => false,
        }
    }

    pub fn move_by(&mut self, id: ToolHandle, d_index: LogicalIndex, d_price: f64) -> bool {
        match self.drawings.iter_mut().find(|d| d.id == id) {
            Some(d) => {
                d.shape.shift(d_index, d_price);
                true
            }
            None => false,
        }
    }
}

impl ToolPriceAdapter for DrawingBook {
    fn capability(&self, tool: ToolHandle) -> Option<&dyn ToolCapability> {
        self.get(tool).map(|d| &d.shape as &dyn ToolCapability)
    }
}
