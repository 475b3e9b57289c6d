//! Pixel <-> chart coordinate mapping and alert label geometry.

use ts_core::LogicalIndex;

use crate::config::InteractionConfig;

/// Host-provided transforms. Must be pure: the controller calls them freely.
pub trait CoordinateMapping {
    fn price_to_y(&self, price: f64) -> f64;
    fn y_to_price(&self, y: f64) -> f64;
    fn x_to_logical(&self, x: f64) -> LogicalIndex;
    /// Width of the plotting area. The price scale starts at this x.
    fn time_axis_width(&self) -> f64;
}

/// Simple price panel with a bar-spaced time axis.
///
/// In log mode `y_min`/`y_max` are natural logs of the visible price range.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPriceScale {
    pub top: f64,
    pub height: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub log_scale: bool,
    pub width: f64,
    /// Logical index at x = 0.
    pub first_index: LogicalIndex,
    pub bar_spacing: f64,
}

impl LinearPriceScale {
    pub fn new(width: f64, height: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            top: 0.0,
            height,
            y_min,
            y_max,
            log_scale: false,
            width,
            first_index: 0.0,
            bar_spacing: 8.0,
        }
    }
}

impl CoordinateMapping for LinearPriceScale {
    fn price_to_y(&self, price: f64) -> f64 {
        let p = if self.log_scale {
            if price > 0.0 {
                price.ln()
            } else {
                self.y_min
            }
        } else {
            price
        };
        let range = (self.y_max - self.y_min).max(1e-9);
        let norm = (p - self.y_min) / range;
        self.top + self.height - norm * self.height
    }

    fn y_to_price(&self, y: f64) -> f64 {
        let range = (self.y_max - self.y_min).max(1e-9);
        let rel = (self.top + self.height - y) / self.height;
        let v = self.y_min + rel.clamp(0.0, 1.0) * range;
        if self.log_scale {
            v.exp()
        } else {
            v
        }
    }

    fn x_to_logical(&self, x: f64) -> LogicalIndex {
        if self.bar_spacing <= 0.0 {
            return self.first_index;
        }
        self.first_index + x / self.bar_spacing
    }

    fn time_axis_width(&self) -> f64 {
        self.width
    }
}

/// Where an alert's label and its delete button sit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    pub width: f64,
    pub height: f64,
    pub center_y: f64,
    pub delete_center_x: f64,
    pub delete_width: f64,
}

impl LabelBox {
    pub fn new(label: &str, center_y: f64, time_axis_width: f64, cfg: &InteractionConfig) -> Self {
        let width = 2.0 * cfg.label_padding_px
            + cfg.delete_button_width_px
            + label.chars().count() as f64 * cfg.avg_char_width_px;
        Self {
            width,
            height: cfg.label_height_px,
            center_y,
            delete_center_x: (time_axis_width + width - cfg.delete_button_width_px) / 2.0,
            delete_width: cfg.delete_button_width_px,
        }
    }

    pub fn on_delete(&self, x: f64, y: f64) -> bool {
        (x - self.delete_center_x).abs() <= self.delete_width / 2.0
            && (y - self.center_y).abs() <= self.height / 2.0
    }
}

/// True when `x` lies in the band just left of the price scale edge.
pub fn in_gutter(x: f64, time_axis_width: f64, band: f64) -> bool {
    let offset = time_axis_width - x;
    (0.0..=band).contains(&offset)
}
