//! Canonical alert collection.
//!
//! Alerts are kept sorted by descending level at all times; the hit-test
//! controller relies on that order when it scans for the closest alert.

use std::collections::HashSet;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, info, warn};
use ts_core::{LogicalIndex, Timestamp};

use crate::config::EngineConfig;
use crate::error::{AlertError, Result};
use crate::events::{EventChannel, OwnerToken};
use crate::model::{Alert, AlertCondition, AlertId, AlertKind, AlertLevel};
use crate::persistence::{parse_record, SerializableAlert};
use crate::tools::{ToolHandle, ToolPriceAdapter};

/// The four observable store channels.
#[derive(Debug, Default)]
pub struct StoreEvents {
    pub added: EventChannel<AlertId>,
    pub removed: EventChannel<AlertId>,
    pub changed: EventChannel<Alert>,
    pub bulk_changed: EventChannel<()>,
}

impl StoreEvents {
    /// Drop every listener `owner` registered on any channel.
    pub fn unsubscribe_owner(&mut self, owner: OwnerToken) -> usize {
        self.added.unsubscribe_owner(owner)
            + self.removed.unsubscribe_owner(owner)
            + self.changed.unsubscribe_owner(owner)
            + self.bulk_changed.unsubscribe_owner(owner)
    }
}

pub struct AlertStore {
    alerts: Vec<Alert>,
    config: EngineConfig,
    rng: StdRng,
    events: StoreEvents,
}

impl AlertStore {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic ids, for replays and tests.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: EngineConfig, rng: StdRng) -> Self {
        Self {
            alerts: Vec::new(),
            config,
            rng,
            events: StoreEvents::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events_mut(&mut self) -> &mut StoreEvents {
        &mut self.events
    }

    /// All alerts, highest level first.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn get(&self, id: &AlertId) -> Option<&Alert> {
        self.alerts.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &AlertId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Point-in-time copy of the ids, safe to iterate while mutating the store.
    pub fn ids(&self) -> Vec<AlertId> {
        self.alerts.iter().map(|a| a.id.clone()).collect()
    }

    pub fn create(&mut self, level: f64, condition: AlertCondition) -> Result<AlertId> {
        if !level.is_finite() {
            return Err(AlertError::InvalidLevel(level));
        }
        if condition.is_area() {
            return Err(AlertError::UnsupportedCondition {
                condition,
                binding: "price",
            });
        }
        let id = self.generate_id();
        self.insert(Alert::new(id.clone(), AlertLevel::Price(level), condition, now_ms()));
        debug!(alert = %id, level, %condition, "price alert created");
        Ok(id)
    }

    /// Bind a new alert to a drawing.
    ///
    /// The starting level is the drawing's price at `at`, or failing that any
    /// anchor price the drawing exposes.
    pub fn create_for_tool(
        &mut self,
        tool: ToolHandle,
        condition: AlertCondition,
        adapter: &dyn ToolPriceAdapter,
        at: LogicalIndex,
    ) -> Result<AlertId> {
        let category = adapter.category(tool).ok_or(AlertError::StaleTool(tool))?;
        if !adapter.allowed_conditions(tool).contains(&condition) {
            return Err(AlertError::UnsupportedCondition {
                condition,
                binding: category.name(),
            });
        }
        let resolved = adapter
            .resolve_level(tool, at)
            .or_else(|| adapter.anchor_price(tool))
            .ok_or(AlertError::UnresolvableTool(tool))?;

        let id = self.generate_id();
        self.insert(Alert::new(
            id.clone(),
            AlertLevel::Tool {
                handle: tool,
                category,
                resolved,
            },
            condition,
            now_ms(),
        ));
        debug!(alert = %id, %tool, level = resolved, %condition, "tool alert created");
        Ok(id)
    }

    /// Move a price alert. Tool alerts follow their drawing and are left alone.
    pub fn update_level(&mut self, id: &AlertId, level: f64) -> Result<()> {
        if !level.is_finite() {
            return Err(AlertError::InvalidLevel(level));
        }
        let Some(alert) = self.alerts.iter_mut().find(|a| &a.id == id) else {
            return Ok(());
        };
        let AlertLevel::Price(current) = alert.level else {
            debug!(alert = %id, "ignoring level change on tool-bound alert");
            return Ok(());
        };
        if current == level {
            return Ok(());
        }
        alert.level = AlertLevel::Price(level);
        alert.reset_state();
        self.after_change(id);
        Ok(())
    }

    /// Apply an edit-dialog result. The level is ignored for tool alerts.
    ///
    /// Saving without changes keeps the alert's debounce state; any real change
    /// resets it so the next bar is treated as the first one again.
    pub fn update(&mut self, id: &AlertId, level: f64, condition: AlertCondition) -> Result<()> {
        if !level.is_finite() {
            return Err(AlertError::InvalidLevel(level));
        }
        let Some(alert) = self.alerts.iter_mut().find(|a| &a.id == id) else {
            return Ok(());
        };
        match alert.level {
            AlertLevel::Price(current) => {
                if condition.is_area() {
                    return Err(AlertError::UnsupportedCondition {
                        condition,
                        binding: "price",
                    });
                }
                if current == level && alert.condition == condition {
                    return Ok(());
                }
                alert.level = AlertLevel::Price(level);
            }
            AlertLevel::Tool { category, .. } => {
                if !category.allowed_conditions().contains(&condition) {
                    return Err(AlertError::UnsupportedCondition {
                        condition,
                        binding: category.name(),
                    });
                }
                if alert.condition == condition {
                    return Ok(());
                }
            }
        }
        alert.condition = condition;
        alert.reset_state();
        self.after_change(id);
        Ok(())
    }

    /// Returns the removed alert; unknown ids are a silent no-op.
    pub fn remove(&mut self, id: &AlertId) -> Option<Alert> {
        let idx = self.alerts.iter().position(|a| &a.id == id)?;
        let alert = self.alerts.remove(idx);
        debug!(alert = %id, "alert removed");
        self.events.removed.emit(id);
        self.events.bulk_changed.emit(&());
        Some(alert)
    }

    /// Persistable projection: price alerts only.
    pub fn export_all(&self) -> Vec<SerializableAlert> {
        self.alerts
            .iter()
            .filter_map(|a| match a.level {
                AlertLevel::Price(level) => Some(SerializableAlert {
                    id: a.id.clone(),
                    level,
                    condition: a.condition,
                    kind: AlertKind::Price,
                    created_at: a.created_at,
                }),
                AlertLevel::Tool { .. } => None,
            })
            .collect()
    }

    /// Upsert well-formed price records; returns how many were applied.
    pub fn import_all<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let now = now_ms();
        let mut applied = 0usize;
        let mut dropped = 0usize;
        for value in records {
            let record = match parse_record(&value, now) {
                Ok(record) => record,
                Err(field) => {
                    dropped += 1;
                    warn!(field, "dropping malformed alert record");
                    continue;
                }
            };
            let alert = Alert::new(
                record.id.clone(),
                AlertLevel::Price(record.level),
                record.condition,
                record.created_at,
            );
            match self.alerts.iter_mut().find(|a| a.id == record.id) {
                Some(existing) => *existing = alert,
                None => self.alerts.push(alert),
            }
            applied += 1;
        }
        if applied > 0 {
            self.sort();
            info!(applied, dropped, "alerts imported");
            self.events.bulk_changed.emit(&());
        }
        applied
    }

    /// Import a JSON array payload as produced by [`export_all`](Self::export_all).
    pub fn import_json(&mut self, payload: &str) -> Result<usize> {
        match serde_json::from_str::<Value>(payload)? {
            Value::Array(records) => Ok(self.import_all(records)),
            _ => Err(AlertError::NotAnArray),
        }
    }

    /// Remove everything, e.g. when the active symbol changes. Idempotent.
    pub fn clear_all(&mut self) {
        if self.alerts.is_empty() {
            return;
        }
        let cleared = self.alerts.len();
        self.alerts.clear();
        info!(cleared, "alerts cleared");
        self.events.bulk_changed.emit(&());
    }

    pub(crate) fn alerts_mut(&mut self) -> &mut [Alert] {
        &mut self.alerts
    }

    /// Drop alerts that just fired, in one pass over the set.
    pub(crate) fn remove_fired(&mut self, ids: &[AlertId]) {
        if ids.is_empty() {
            return;
        }
        let fired: HashSet<&AlertId> = ids.iter().collect();
        self.alerts.retain(|a| !fired.contains(&a.id));
        for id in ids {
            self.events.removed.emit(id);
        }
        self.events.bulk_changed.emit(&());
    }

    /// Restore the ordering after in-place level refreshes.
    pub(crate) fn sort(&mut self) {
        self.alerts
            .sort_by(|a, b| b.level_value().total_cmp(&a.level_value()));
    }

    fn insert(&mut self, alert: Alert) {
        let id = alert.id.clone();
        self.alerts.push(alert);
        self.sort();
        self.events.added.emit(&id);
        self.events.bulk_changed.emit(&());
    }

    fn after_change(&mut self, id: &AlertId) {
        self.sort();
        if let Some(alert) = self.get(id).cloned() {
            self.events.changed.emit(&alert);
        }
        self.events.bulk_changed.emit(&());
    }

    fn generate_id(&mut self) -> AlertId {
        let space = self.config.id_space.max(1);
        for _ in 0..=self.alerts.len() {
            let candidate = AlertId::new(self.rng.gen_range(0..space).to_string());
            if !self.contains(&candidate) {
                return candidate;
            }
        }
        // Dense id spaces: take the first free integer.
        let mut n = 0u64;
        loop {
            let candidate = AlertId::new(n.to_string());
            if !self.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn now_ms() -> Timestamp {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawings::{DrawingBook, DrawingShape};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> AlertStore {
        AlertStore::with_seed(EngineConfig::default(), 7)
    }

    fn levels(store: &AlertStore) -> Vec<f64> {
        store.alerts().iter().map(|a| a.level_value()).collect()
    }

    fn assert_sorted(store: &AlertStore) {
        let l = levels(store);
        assert!(l.windows(2).all(|w| w[0] >= w[1]), "not sorted: {l:?}");
    }

    #[derive(Default)]
    struct Log {
        added: usize,
        removed: usize,
        changed: usize,
        bulk: usize,
    }

    fn observe(store: &mut AlertStore) -> Rc<RefCell<Log>> {
        let log = Rc::new(RefCell::new(Log::default()));
        let owner = OwnerToken::new(1);
        let events = store.events_mut();
        let l = log.clone();
        events.added.subscribe(owner, move |_| l.borrow_mut().added += 1);
        let l = log.clone();
        events.removed.subscribe(owner, move |_| l.borrow_mut().removed += 1);
        let l = log.clone();
        events.changed.subscribe(owner, move |_| l.borrow_mut().changed += 1);
        let l = log.clone();
        events.bulk_changed.subscribe(owner, move |_| l.borrow_mut().bulk += 1);
        log
    }

    #[test]
    fn alerts_stay_sorted_descending() {
        let mut s = store();
        for level in [10.0, 30.0, 20.0, 25.0, 5.0] {
            s.create(level, AlertCondition::Crossing).unwrap();
        }
        assert_eq!(levels(&s), vec![30.0, 25.0, 20.0, 10.0, 5.0]);

        let id = s.alerts()[4].id().clone();
        s.update_level(&id, 27.0).unwrap();
        assert_sorted(&s);
        assert_eq!(s.alerts()[1].id(), &id);

        let top = s.alerts()[0].id().clone();
        s.remove(&top);
        assert_sorted(&s);
    }

    #[test]
    fn ids_are_unique_even_in_a_tiny_id_space() {
        let mut s = AlertStore::with_seed(EngineConfig::new().with_id_space(3), 1);
        let ids: Vec<_> = (0..10)
            .map(|i| s.create(i as f64, AlertCondition::Crossing).unwrap())
            .collect();
        let mut dedup = ids.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), ids.len());
    }

    #[test]
    fn create_rejects_bad_input() {
        let mut s = store();
        assert!(matches!(
            s.create(f64::NAN, AlertCondition::Crossing),
            Err(AlertError::InvalidLevel(_))
        ));
        assert!(matches!(
            s.create(1.0, AlertCondition::Inside),
            Err(AlertError::UnsupportedCondition { .. })
        ));
        assert!(s.is_empty());
    }

    #[test]
    fn mutations_fire_expected_channels() {
        let mut s = store();
        let log = observe(&mut s);

        let id = s.create(100.0, AlertCondition::Crossing).unwrap();
        s.update(&id, 101.0, AlertCondition::CrossingUp).unwrap();
        s.remove(&id);

        let log = log.borrow();
        assert_eq!(log.added, 1);
        assert_eq!(log.changed, 1);
        assert_eq!(log.removed, 1);
        assert_eq!(log.bulk, 3);
    }

    #[test]
    fn unknown_ids_are_silent_no_ops() {
        let mut s = store();
        let log = observe(&mut s);
        let ghost = AlertId::from("ghost");
        assert!(s.remove(&ghost).is_none());
        s.update_level(&ghost, 1.0).unwrap();
        s.update(&ghost, 1.0, AlertCondition::Crossing).unwrap();
        assert_eq!(log.borrow().bulk, 0);
    }

    #[test]
    fn clear_all_is_idempotent() {
        let mut s = store();
        s.create(1.0, AlertCondition::Crossing).unwrap();
        s.create(2.0, AlertCondition::Crossing).unwrap();
        let log = observe(&mut s);
        s.clear_all();
        s.clear_all();
        assert!(s.is_empty());
        assert_eq!(log.borrow().bulk, 1);
    }

    #[test]
    fn export_import_round_trip_skips_tools() {
        let mut book = DrawingBook::new();
        let line = book.add(DrawingShape::HorizontalLine { price: 55.0 });

        let mut s = store();
        s.create(100.0, AlertCondition::Crossing).unwrap();
        s.create(90.0, AlertCondition::CrossingDown).unwrap();
        s.create_for_tool(line, AlertCondition::CrossingUp, &book, 0.0)
            .unwrap();

        let exported = s.export_all();
        assert_eq!(exported.len(), 2);
        assert!(exported.iter().all(|r| r.kind == AlertKind::Price));

        let payload = serde_json::to_string(&exported).unwrap();
        let mut restored = store();
        let log = observe(&mut restored);
        assert_eq!(restored.import_json(&payload).unwrap(), 2);
        assert_eq!(log.borrow().added, 0);
        assert_eq!(log.borrow().bulk, 1);

        let key = |r: &SerializableAlert| (r.id.clone(), r.level.to_bits(), r.condition);
        let mut before: Vec<_> = exported.iter().map(key).collect();
        let mut after: Vec<_> = restored.export_all().iter().map(key).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn import_drops_bad_records_individually_and_upserts() {
        let mut s = store();
        let log = observe(&mut s);
        let applied = s.import_all(vec![
            json!({"id": "a", "level": 10.0, "condition": "crossing_up", "kind": "price"}),
            json!({"id": null, "level": 11.0}),
            json!({"id": "b", "level": "twelve"}),
            json!({"id": "c", "level": 13.0}),
        ]);
        assert_eq!(applied, 2);
        assert_eq!(s.len(), 2);

        let applied = s.import_all(vec![json!({"id": "a", "level": 20.0})]);
        assert_eq!(applied, 1);
        assert_eq!(s.len(), 2);
        let a = s.get(&AlertId::from("a")).unwrap();
        assert_eq!(a.level_value(), 20.0);
        assert_eq!(a.condition(), AlertCondition::Crossing);
        assert_sorted(&s);

        assert_eq!(s.import_all(vec![json!({"bogus": true})]), 0);
        assert_eq!(log.borrow().bulk, 2);
    }

    #[test]
    fn import_json_requires_an_array() {
        let mut s = store();
        assert!(matches!(s.import_json("{}"), Err(AlertError::NotAnArray)));
        assert!(matches!(
            s.import_json("not json"),
            Err(AlertError::InvalidPayload(_))
        ));
    }

    #[test]
    fn tool_alerts_validate_category_and_liveness() {
        let mut book = DrawingBook::new();
        let rect = book.add(DrawingShape::Rectangle {
            index1: 0.0,
            price1: 10.0,
            index2: 10.0,
            price2: 20.0,
        });
        let marker = book.add(DrawingShape::VerticalLine {
            index: 5.0,
            price: 12.0,
        });
        let mut s = store();

        assert!(matches!(
            s.create_for_tool(rect, AlertCondition::Crossing, &book, 5.0),
            Err(AlertError::UnsupportedCondition { binding: "area", .. })
        ));
        let id = s
            .create_for_tool(rect, AlertCondition::Entering, &book, 5.0)
            .unwrap();
        assert_eq!(s.get(&id).unwrap().level_value(), 15.0);

        // Outside the span the rectangle has no price; its anchor seeds the level.
        let id = s
            .create_for_tool(rect, AlertCondition::Exiting, &book, 50.0)
            .unwrap();
        assert_eq!(s.get(&id).unwrap().level_value(), 15.0);

        let id = s
            .create_for_tool(marker, AlertCondition::Crossing, &book, 0.0)
            .unwrap();
        assert_eq!(s.get(&id).unwrap().level_value(), 12.0);

        book.remove(rect);
        assert!(matches!(
            s.create_for_tool(rect, AlertCondition::Entering, &book, 5.0),
            Err(AlertError::StaleTool(_))
        ));
    }

    #[test]
    fn tool_alert_ignores_level_edits() {
        let mut book = DrawingBook::new();
        let line = book.add(DrawingShape::HorizontalLine { price: 40.0 });
        let mut s = store();
        let id = s
            .create_for_tool(line, AlertCondition::Crossing, &book, 0.0)
            .unwrap();
        s.update_level(&id, 99.0).unwrap();
        assert_eq!(s.get(&id).unwrap().level_value(), 40.0);

        s.update(&id, 99.0, AlertCondition::CrossingDown).unwrap();
        let alert = s.get(&id).unwrap();
        assert_eq!(alert.level_value(), 40.0);
        assert_eq!(alert.condition(), AlertCondition::CrossingDown);
        assert!(s.update(&id, 1.0, AlertCondition::Outside).is_err());
    }

    #[test]
    fn unchanged_update_is_silent() {
        let mut s = store();
        let id = s.create(100.0, AlertCondition::Crossing).unwrap();
        let log = observe(&mut s);
        s.update(&id, 100.0, AlertCondition::Crossing).unwrap();
        let log = log.borrow();
        assert_eq!(log.changed, 0);
        assert_eq!(log.bulk, 0);
    }

    #[test]
    fn marker_alert_only_accepts_crossing() {
        let mut book = DrawingBook::new();
        let marker = book.add(DrawingShape::VerticalLine {
            index: 5.0,
            price: 12.0,
        });
        let mut s = store();
        let id = s
            .create_for_tool(marker, AlertCondition::Crossing, &book, 0.0)
            .unwrap();
        assert!(matches!(
            s.update(&id, 12.0, AlertCondition::CrossingUp),
            Err(AlertError::UnsupportedCondition {
                binding: "vertical marker",
                ..
            })
        ));
        // The drawing going away does not loosen the rule.
        book.remove(marker);
        assert!(s.update(&id, 12.0, AlertCondition::CrossingDown).is_err());
        assert_eq!(s.get(&id).unwrap().condition(), AlertCondition::Crossing);
    }
}
