//! Price and drawing alerts for a chart: storage, per-bar crossing detection and
//! the adapter seam to host-owned drawings.

pub mod config;
pub mod detector;
pub mod drawings;
pub mod error;
pub mod events;
pub mod model;
pub mod persistence;
pub mod store;
pub mod tools;

pub use config::EngineConfig;
pub use detector::CrossingDetector;
pub use drawings::{Drawing, DrawingBook, DrawingShape};
pub use error::{AlertError, Result};
pub use events::{EventChannel, OwnerToken, SubscriptionId};
pub use model::{
    Alert, AlertCondition, AlertId, AlertKind, AlertLevel, CrossingDirection, CrossingEvent,
    DirectionState, Side, ZoneState, AREA_CONDITIONS, LINE_CONDITIONS, MARKER_CONDITIONS,
};
pub use persistence::SerializableAlert;
pub use store::{AlertStore, StoreEvents};
pub use tools::{NoTools, ToolCapability, ToolCategory, ToolHandle, ToolPriceAdapter};

use tracing::info;
use ts_core::{Bar, LogicalIndex};

/// One chart's alert state. The host creates it, feeds bars into it and drops it
/// with the chart.
pub struct AlertEngine {
    store: AlertStore,
    detector: CrossingDetector,
}

impl AlertEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_store(AlertStore::new(config))
    }

    pub fn with_store(store: AlertStore) -> Self {
        Self {
            store,
            detector: CrossingDetector::new(),
        }
    }

    pub fn store(&self) -> &AlertStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AlertStore {
        &mut self.store
    }

    pub fn triggered_mut(&mut self) -> &mut EventChannel<CrossingEvent> {
        self.detector.triggered_mut()
    }

    /// Feed the latest state of the bar at `index`. Call on every tick.
    pub fn on_bar(
        &mut self,
        adapter: &dyn ToolPriceAdapter,
        bar: &Bar,
        index: LogicalIndex,
    ) -> Vec<CrossingEvent> {
        self.detector.evaluate(&mut self.store, adapter, bar, index)
    }

    /// Alerts belong to one instrument; a symbol change starts from an empty set.
    pub fn switch_symbol(&mut self) {
        info!(dropped = self.store.len(), "symbol switched, clearing alerts");
        self.store.clear_all();
    }

    /// Drop every listener `owner` registered, on the store and on the trigger
    /// channel.
    pub fn unsubscribe_owner(&mut self, owner: OwnerToken) -> usize {
        self.store.events_mut().unsubscribe_owner(owner)
            + self.detector.triggered_mut().unsubscribe_owner(owner)
    }
}
