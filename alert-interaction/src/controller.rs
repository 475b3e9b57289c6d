//! Pointer handling for alert lines: hover highlight, drag to move, click to
//! edit or delete, and click in the price gutter to create.

use alert_engine::{
    AlertError, AlertId, AlertKind, AlertStore, EventChannel, Result, ToolPriceAdapter,
};
use tracing::{debug, warn};

use crate::config::InteractionConfig;
use crate::geometry::{in_gutter, CoordinateMapping, LabelBox};
use crate::surfaces::{BindingCategory, EditRequest, EditResult, EditSurface, EditTarget};

/// Advisory lock the host honours by pausing its own pan/zoom/kinetic scroll.
pub trait InteractionLock {
    fn set_locked(&mut self, locked: bool);
}

/// Everything the controller borrows from the host for one pointer event.
pub struct ChartContext<'a> {
    pub store: &'a mut AlertStore,
    pub mapping: &'a dyn CoordinateMapping,
    pub tools: &'a dyn ToolPriceAdapter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
    pub over_time_axis: bool,
    /// Host-reported hit on the price gutter. The x band check still applies
    /// when this is false.
    pub over_price_gutter: bool,
}

impl PointerSample {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            over_time_axis: false,
            over_price_gutter: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GutterClick {
    pub price: f64,
    pub x: f64,
    pub y: f64,
}

/// What a click ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    Ignored,
    /// Swallowed because the gesture was a drag.
    Suppressed,
    /// Raised on the gutter channel for the host's own menu.
    GutterRequested(GutterClick),
    /// No gutter listener; the edit surface was opened for a new alert.
    CreateOpened { price: f64 },
    Deleted(AlertId),
    EditOpened(AlertId),
}

#[derive(Debug, Clone, PartialEq)]
struct DragState {
    alert_id: AlertId,
    start_y: f64,
    dragged: bool,
}

pub struct AlertController {
    config: InteractionConfig,
    edit: Box<dyn EditSurface>,
    lock: Box<dyn InteractionLock>,
    gutter_clicked: EventChannel<GutterClick>,
    highlighted: Option<AlertId>,
    drag: Option<DragState>,
    suppress_click: bool,
}

impl AlertController {
    pub fn new(
        config: InteractionConfig,
        edit: Box<dyn EditSurface>,
        lock: Box<dyn InteractionLock>,
    ) -> Self {
        Self {
            config,
            edit,
            lock,
            gutter_clicked: EventChannel::new(),
            highlighted: None,
            drag: None,
            suppress_click: false,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn gutter_clicked_mut(&mut self) -> &mut EventChannel<GutterClick> {
        &mut self.gutter_clicked
    }

    pub fn highlighted(&self) -> Option<&AlertId> {
        self.highlighted.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_move(&mut self, cx: &mut ChartContext<'_>, p: PointerSample) {
        if let Some(drag) = self.drag.as_mut() {
            if !drag.dragged && (p.y - drag.start_y).abs() > self.config.drag_threshold_px {
                drag.dragged = true;
            }
            if drag.dragged {
                let price = cx.mapping.y_to_price(p.y);
                if let Err(err) = cx.store.update_level(&drag.alert_id, price) {
                    warn!(alert = %drag.alert_id, %err, "drag produced an invalid level");
                }
            }
            return;
        }

        if p.over_time_axis {
            self.highlighted = None;
            return;
        }
        self.highlighted = self.nearest(cx, p.y);
    }

    /// Returns true when the press started an alert drag and the host should
    /// not treat it as a pan.
    pub fn pointer_down(&mut self, cx: &mut ChartContext<'_>, p: PointerSample) -> bool {
        self.suppress_click = false;
        let Some(id) = self.highlighted.clone() else {
            return false;
        };
        let Some(alert) = cx.store.get(&id) else {
            self.highlighted = None;
            return false;
        };
        if alert.kind() == AlertKind::Tool {
            return false;
        }
        if self.delete_hit(cx, &id, p) {
            return false;
        }

        debug!(alert = %id, y = p.y, "alert drag armed");
        self.drag = Some(DragState {
            alert_id: id,
            start_y: p.y,
            dragged: false,
        });
        self.lock.set_locked(true);
        true
    }

    pub fn pointer_up(&mut self) {
        if let Some(drag) = self.drag.take() {
            if drag.dragged {
                debug!(alert = %drag.alert_id, "alert drag finished");
                self.suppress_click = true;
            }
        }
        self.lock.set_locked(false);
    }

    /// Dispatch a click: gutter create, then delete hotspot, then edit.
    pub fn click(&mut self, cx: &mut ChartContext<'_>, p: PointerSample) -> ClickAction {
        if std::mem::take(&mut self.suppress_click) {
            return ClickAction::Suppressed;
        }
        if p.over_time_axis {
            return ClickAction::Ignored;
        }

        let width = cx.mapping.time_axis_width();
        if p.over_price_gutter || in_gutter(p.x, width, self.config.gutter_band_px) {
            let price = cx.mapping.y_to_price(p.y);
            let click = GutterClick { price, x: p.x, y: p.y };
            if self.gutter_clicked.is_empty() {
                self.edit.show(EditRequest::new_at(price));
                return ClickAction::CreateOpened { price };
            }
            self.gutter_clicked.emit(&click);
            return ClickAction::GutterRequested(click);
        }

        let Some(id) = self.highlighted.clone() else {
            return ClickAction::Ignored;
        };
        let Some(alert) = cx.store.get(&id) else {
            self.highlighted = None;
            return ClickAction::Ignored;
        };
        if self.delete_hit(cx, &id, p) {
            cx.store.remove(&id);
            self.highlighted = None;
            return ClickAction::Deleted(id);
        }
        self.edit.show(EditRequest::for_alert(alert, cx.tools));
        ClickAction::EditOpened(id)
    }

    /// Apply what the edit surface returned.
    pub fn save_edit(&mut self, cx: &mut ChartContext<'_>, result: EditResult) -> Result<AlertId> {
        match result.target {
            EditTarget::New => cx.store.create(result.level, result.condition),
            EditTarget::Existing(id) => {
                let Some(alert) = cx.store.get(&id) else {
                    return Ok(id);
                };
                let binding = BindingCategory::of(alert, cx.tools);
                if !binding.allowed_conditions().contains(&result.condition) {
                    return Err(AlertError::UnsupportedCondition {
                        condition: result.condition,
                        binding: binding.name(),
                    });
                }
                cx.store.update(&id, result.level, result.condition)?;
                Ok(id)
            }
        }
    }

    fn nearest(&self, cx: &ChartContext<'_>, y: f64) -> Option<AlertId> {
        cx.store
            .alerts()
            .iter()
            .filter_map(|a| {
                let ay = cx.mapping.price_to_y(a.level_value());
                ay.is_finite().then(|| (a, (ay - y).abs()))
            })
            .filter(|(_, dist)| *dist < self.config.proximity_px)
            .min_by(|l, r| l.1.total_cmp(&r.1))
            .map(|(a, _)| a.id().clone())
    }

    fn delete_hit(&self, cx: &ChartContext<'_>, id: &AlertId, p: PointerSample) -> bool {
        let Some(alert) = cx.store.get(id) else {
            return false;
        };
        let label = cx.store.config().format_price(alert.level_value());
        let y = cx.mapping.price_to_y(alert.level_value());
        LabelBox::new(&label, y, cx.mapping.time_axis_width(), &self.config).on_delete(p.x, p.y)
    }
}
