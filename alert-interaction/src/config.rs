use serde::Deserialize;

/// Pixel metrics and timings for pointer handling and notifications.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Maximum vertical distance at which an alert line is highlighted.
    pub proximity_px: f64,
    /// Vertical travel after which a pointer-down becomes a drag.
    pub drag_threshold_px: f64,
    /// Width of the band left of the price scale where a click creates an alert.
    pub gutter_band_px: f64,
    pub label_padding_px: f64,
    pub delete_button_width_px: f64,
    pub avg_char_width_px: f64,
    pub label_height_px: f64,
    pub auto_dismiss_ms: i64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            proximity_px: 8.0,
            drag_threshold_px: 5.0,
            gutter_band_px: 20.0,
            label_padding_px: 6.0,
            delete_button_width_px: 16.0,
            avg_char_width_px: 7.0,
            label_height_px: 18.0,
            auto_dismiss_ms: 60_000,
        }
    }
}

impl InteractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proximity(mut self, px: f64) -> Self {
        self.proximity_px = px.max(0.0);
        self
    }

    pub fn with_gutter_band(mut self, px: f64) -> Self {
        self.gutter_band_px = px.max(0.0);
        self
    }

    pub fn with_auto_dismiss_ms(mut self, ms: i64) -> Self {
        self.auto_dismiss_ms = ms.max(0);
        self
    }
}
