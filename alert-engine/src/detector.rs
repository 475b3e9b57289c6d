//! Per-bar crossing evaluation.
//!
//! Every alert carries a small debounce memory. The first bar an alert sees only
//! records which side of the level price is on; later bars compare against that
//! memory. While the bar range still touches the level the memory is held, so a
//! bar that pokes through and closes back does not erase the original side.

use tracing::{debug, info, warn};
use ts_core::{Bar, LogicalIndex};

use crate::events::EventChannel;
use crate::model::{
    Alert, AlertCondition, AlertLevel, CrossingDirection, CrossingEvent, DirectionState, Side,
    ZoneState,
};
use crate::store::AlertStore;
use crate::tools::{ToolCategory, ToolPriceAdapter};

#[derive(Debug, Default)]
pub struct CrossingDetector {
    triggered: EventChannel<CrossingEvent>,
}

enum Outcome {
    Hold,
    Skip(&'static str),
    Fire(CrossingEvent),
}

impl CrossingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triggered_mut(&mut self) -> &mut EventChannel<CrossingEvent> {
        &mut self.triggered
    }

    /// Evaluate the latest state of the bar at `index`.
    ///
    /// Safe to call on every intrabar tick. Each alert is visited once: fired
    /// alerts are emitted on the triggered channel as they are found and removed
    /// from the store once the pass is over. The returned list holds the same
    /// events in firing order.
    pub fn evaluate(
        &mut self,
        store: &mut AlertStore,
        adapter: &dyn ToolPriceAdapter,
        bar: &Bar,
        index: LogicalIndex,
    ) -> Vec<CrossingEvent> {
        let mut fired = Vec::new();
        if !bar.is_finite() {
            warn!(time = bar.time, "skipping bar with non-finite prices");
            return fired;
        }

        let mut refreshed = false;
        for alert in store.alerts_mut().iter_mut() {
            let before = alert.level_value();
            let outcome = evaluate_alert(alert, adapter, bar, index);
            refreshed |= alert.level_value() != before;

            match outcome {
                Outcome::Hold => {}
                Outcome::Skip(reason) => {
                    debug!(alert = %alert.id, reason, "alert skipped for this bar");
                }
                Outcome::Fire(event) => {
                    info!(
                        alert = %alert.id,
                        condition = %event.condition,
                        level = event.alert_level,
                        price = event.crossing_price,
                        "alert triggered"
                    );
                    self.triggered.emit(&event);
                    fired.push(event);
                }
            }
        }

        let ids: Vec<_> = fired.iter().map(|e| e.alert_id.clone()).collect();
        store.remove_fired(&ids);
        if refreshed {
            store.sort();
        }
        fired
    }
}

fn evaluate_alert(
    alert: &mut Alert,
    adapter: &dyn ToolPriceAdapter,
    bar: &Bar,
    index: LogicalIndex,
) -> Outcome {
    let condition = alert.condition;
    match alert.level {
        AlertLevel::Price(level) => {
            line_step(&mut alert.direction, condition, level, bar)
                .map_or(Outcome::Hold, |dir| Outcome::Fire(event(alert, level, bar, dir)))
        }
        AlertLevel::Tool { handle, .. } => match adapter.category(handle) {
            None => Outcome::Skip("drawing is gone"),
            Some(ToolCategory::Line) => {
                let Some(level) = adapter.resolve_level(handle, index) else {
                    return Outcome::Skip("line has no price at this bar");
                };
                cache_level(alert, level);
                line_step(&mut alert.direction, condition, level, bar)
                    .map_or(Outcome::Hold, |dir| Outcome::Fire(event(alert, level, bar, dir)))
            }
            Some(ToolCategory::Area) => {
                let Some(inside) = adapter.contains(handle, index, bar.close) else {
                    return Outcome::Skip("area does not cover this bar");
                };
                if let Some(level) = adapter.resolve_level(handle, index) {
                    cache_level(alert, level);
                }
                let level = alert.level_value();
                zone_step(&mut alert.zone, condition, inside)
                    .map_or(Outcome::Hold, |dir| Outcome::Fire(event(alert, level, bar, dir)))
            }
            Some(ToolCategory::Marker) => {
                let Some(marker) = adapter.marker_index(handle) else {
                    return Outcome::Skip("marker has no position");
                };
                // The bar occupies [index - 0.5, index + 0.5] on the time axis and
                // is considered complete at its right edge.
                let sample = Bar::new(bar.time, index + 0.5, index - 0.5, index + 0.5);
                line_step(&mut alert.direction, condition, marker, &sample)
                    .map_or(Outcome::Hold, |dir| Outcome::Fire(event(alert, marker, bar, dir)))
            }
        },
    }
}

fn cache_level(alert: &mut Alert, level: f64) {
    if let AlertLevel::Tool { resolved, .. } = &mut alert.level {
        *resolved = level;
    }
}

fn event(alert: &Alert, level: f64, bar: &Bar, direction: CrossingDirection) -> CrossingEvent {
    CrossingEvent {
        alert_id: alert.id.clone(),
        alert_level: level,
        crossing_price: bar.close,
        direction,
        condition: alert.condition,
        timestamp: bar.time,
    }
}

/// One debounce step for a scalar level. Returns the crossing direction when the
/// condition fires.
fn line_step(
    state: &mut DirectionState,
    condition: AlertCondition,
    level: f64,
    bar: &Bar,
) -> Option<CrossingDirection> {
    let touching = bar.touches(level);
    let side = Side::of(bar.close, level);

    if *state == DirectionState::Undetermined {
        *state = match side {
            Side::Above => DirectionState::Above,
            Side::Below => DirectionState::Below,
            Side::At => DirectionState::Undetermined,
        };
        return None;
    }

    let from_above = *state == DirectionState::Above && bar.close <= level;
    let from_below = *state == DirectionState::Below && bar.close >= level;
    let fires = match condition {
        AlertCondition::Crossing => touching && (from_above || from_below),
        AlertCondition::CrossingUp => touching && from_below && bar.close >= level,
        AlertCondition::CrossingDown => touching && from_above && bar.close <= level,
        _ => false,
    };

    // An exact close on the level never moves the memory.
    if !touching {
        match side {
            Side::Above => *state = DirectionState::Above,
            Side::Below => *state = DirectionState::Below,
            Side::At => {}
        }
    }

    if !fires {
        None
    } else if from_below {
        Some(CrossingDirection::Up)
    } else {
        Some(CrossingDirection::Down)
    }
}

/// One debounce step for an area containment result.
fn zone_step(
    state: &mut ZoneState,
    condition: AlertCondition,
    inside: bool,
) -> Option<CrossingDirection> {
    let now = if inside {
        ZoneState::Inside
    } else {
        ZoneState::Outside
    };
    let prev = std::mem::replace(state, now);
    if prev == ZoneState::Undetermined {
        return None;
    }
    let fires = match condition {
        AlertCondition::Entering => prev == ZoneState::Outside && inside,
        AlertCondition::Exiting => prev == ZoneState::Inside && !inside,
        AlertCondition::Inside => inside,
        AlertCondition::Outside => !inside,
        _ => false,
    };
    fires.then_some(if inside {
        CrossingDirection::Into
    } else {
        CrossingDirection::OutOf
    })
}
