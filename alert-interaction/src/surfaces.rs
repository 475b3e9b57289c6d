//! Contracts for the host's edit dialog and notification toasts.

use alert_engine::{
    Alert, AlertCondition, AlertId, AlertKind, CrossingEvent, EngineConfig, ToolCategory,
    ToolPriceAdapter, AREA_CONDITIONS, LINE_CONDITIONS, MARKER_CONDITIONS,
};
use serde::Serialize;
use ts_core::Timestamp;

/// What an alert's level is bound to, as far as the edit dialog cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingCategory {
    Price,
    Line,
    Area,
    VerticalMarker,
}

impl BindingCategory {
    pub fn allowed_conditions(&self) -> &'static [AlertCondition] {
        match self {
            BindingCategory::Price | BindingCategory::Line => LINE_CONDITIONS,
            BindingCategory::Area => AREA_CONDITIONS,
            BindingCategory::VerticalMarker => MARKER_CONDITIONS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BindingCategory::Price => "price",
            BindingCategory::Line => "line",
            BindingCategory::Area => "area",
            BindingCategory::VerticalMarker => "vertical marker",
        }
    }

    pub fn of(alert: &Alert, tools: &dyn ToolPriceAdapter) -> Self {
        let Some(handle) = alert.level().tool() else {
            return BindingCategory::Price;
        };
        // A stale drawing falls back on the category recorded at binding time.
        match tools
            .category(handle)
            .or_else(|| alert.level().tool_category())
        {
            Some(ToolCategory::Area) => BindingCategory::Area,
            Some(ToolCategory::Marker) => BindingCategory::VerticalMarker,
            Some(ToolCategory::Line) | None => BindingCategory::Line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Existing(AlertId),
    /// Placeholder for an alert that does not exist yet.
    New,
}

/// Initial data for the edit dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub target: EditTarget,
    pub level: f64,
    pub condition: AlertCondition,
    pub binding: BindingCategory,
    pub allowed_conditions: &'static [AlertCondition],
    /// Level is fixed by a drawing and not editable.
    pub level_locked: bool,
}

impl EditRequest {
    pub fn new_at(price: f64) -> Self {
        Self {
            target: EditTarget::New,
            level: price,
            condition: AlertCondition::Crossing,
            binding: BindingCategory::Price,
            allowed_conditions: BindingCategory::Price.allowed_conditions(),
            level_locked: false,
        }
    }

    pub fn for_alert(alert: &Alert, tools: &dyn ToolPriceAdapter) -> Self {
        let binding = BindingCategory::of(alert, tools);
        Self {
            target: EditTarget::Existing(alert.id().clone()),
            level: alert.level_value(),
            condition: alert.condition(),
            binding,
            allowed_conditions: binding.allowed_conditions(),
            level_locked: alert.kind() == AlertKind::Tool,
        }
    }
}

/// What the dialog hands back on save.
#[derive(Debug, Clone, PartialEq)]
pub struct EditResult {
    pub target: EditTarget,
    pub level: f64,
    pub condition: AlertCondition,
}

pub trait EditSurface {
    /// Open the dialog. Saving comes back through `AlertController::save_edit`.
    fn show(&mut self, request: EditRequest);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub alert_id: AlertId,
    pub title: String,
    pub message: String,
    pub timestamp: Timestamp,
}

impl NotificationData {
    pub fn from_event(event: &CrossingEvent, config: &EngineConfig) -> Self {
        Self {
            alert_id: event.alert_id.clone(),
            title: format!("Alert {}", event.condition),
            message: format!(
                "price {} reached level {}",
                config.format_price(event.crossing_price),
                config.format_price(event.alert_level)
            ),
            timestamp: event.timestamp,
        }
    }
}

pub trait NotificationSurface {
    /// Show or replace the notification for `data.alert_id`.
    fn show(&mut self, data: NotificationData);
    fn dismiss(&mut self, id: &AlertId);
}
