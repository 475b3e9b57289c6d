//! Toast bookkeeping with per-alert auto-dismiss deadlines.
//!
//! Nothing here owns a timer. The host calls [`NotificationCenter::tick`] from
//! its frame loop and expired toasts are dismissed then.

use alert_engine::AlertId;
use chrono::Utc;
use tracing::debug;
use ts_core::Timestamp;

use crate::surfaces::{NotificationData, NotificationSurface};

/// Draws and removes toasts.
pub trait ToastRenderer {
    fn render(&mut self, data: &NotificationData);
    fn remove(&mut self, id: &AlertId);
}

pub trait Clock {
    fn now_ms(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        Utc::now().timestamp_millis()
    }
}

struct Toast {
    data: NotificationData,
    deadline: Timestamp,
}

pub struct NotificationCenter<R: ToastRenderer, C: Clock> {
    renderer: R,
    clock: C,
    auto_dismiss_ms: i64,
    live: Vec<Toast>,
}

impl<R: ToastRenderer, C: Clock> NotificationCenter<R, C> {
    pub fn new(renderer: R, clock: C, auto_dismiss_ms: i64) -> Self {
        Self {
            renderer,
            clock,
            auto_dismiss_ms,
            live: Vec::new(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn deadline(&self, id: &AlertId) -> Option<Timestamp> {
        self.live
            .iter()
            .find(|t| &t.data.alert_id == id)
            .map(|t| t.deadline)
    }

    /// Dismiss every toast whose deadline has passed. Returns how many went.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut expired = 0;
        let renderer = &mut self.renderer;
        self.live.retain(|t| {
            if t.deadline > now {
                return true;
            }
            renderer.remove(&t.data.alert_id);
            expired += 1;
            false
        });
        if expired > 0 {
            debug!(expired, "notifications auto-dismissed");
        }
        expired
    }

    /// Dismiss everything. Also runs on drop.
    pub fn teardown(&mut self) {
        for toast in self.live.drain(..) {
            self.renderer.remove(&toast.data.alert_id);
        }
    }
}

impl<R: ToastRenderer, C: Clock> NotificationSurface for NotificationCenter<R, C> {
    fn show(&mut self, data: NotificationData) {
        let deadline = self.clock.now_ms() + self.auto_dismiss_ms;
        if let Some(idx) = self
            .live
            .iter()
            .position(|t| t.data.alert_id == data.alert_id)
        {
            let old = self.live.remove(idx);
            self.renderer.remove(&old.data.alert_id);
        }
        self.renderer.render(&data);
        self.live.push(Toast { data, deadline });
    }

    fn dismiss(&mut self, id: &AlertId) {
        if let Some(idx) = self.live.iter().position(|t| &t.data.alert_id == id) {
            self.live.remove(idx);
            self.renderer.remove(id);
        }
    }
}

impl<R: ToastRenderer, C: Clock> Drop for NotificationCenter<R, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl ToastRenderer for Recorder {
        fn render(&mut self, data: &NotificationData) {
            self.0.borrow_mut().push(format!("show {}", data.alert_id));
        }

        fn remove(&mut self, id: &AlertId) {
            self.0.borrow_mut().push(format!("hide {id}"));
        }
    }

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<Timestamp>>);

    impl Clock for ManualClock {
        fn now_ms(&self) -> Timestamp {
            self.0.get()
        }
    }

    fn note(id: &str) -> NotificationData {
        NotificationData {
            alert_id: AlertId::from(id),
            title: "t".into(),
            message: "m".into(),
            timestamp: 0,
        }
    }

    #[test]
    fn toast_expires_after_auto_dismiss() {
        let log = Recorder::default();
        let clock = ManualClock::default();
        let mut center = NotificationCenter::new(log.clone(), clock.clone(), 60_000);
        center.show(note("a"));
        clock.0.set(59_999);
        assert_eq!(center.tick(), 0);
        clock.0.set(60_000);
        assert_eq!(center.tick(), 1);
        assert!(center.is_empty());
        assert_eq!(*log.0.borrow(), vec!["show a", "hide a"]);
    }

    #[test]
    fn reshow_replaces_and_restarts_timer() {
        let log = Recorder::default();
        let clock = ManualClock::default();
        let mut center = NotificationCenter::new(log.clone(), clock.clone(), 60_000);
        center.show(note("a"));
        clock.0.set(30_000);
        center.show(note("a"));
        assert_eq!(center.len(), 1);
        assert_eq!(center.deadline(&AlertId::from("a")), Some(90_000));
        clock.0.set(60_000);
        assert_eq!(center.tick(), 0);
        assert_eq!(*log.0.borrow(), vec!["show a", "hide a", "show a"]);
    }

    #[test]
    fn dismiss_cancels_only_that_toast() {
        let log = Recorder::default();
        let mut center = NotificationCenter::new(log.clone(), ManualClock::default(), 1_000);
        center.show(note("a"));
        center.show(note("b"));
        center.dismiss(&AlertId::from("a"));
        center.dismiss(&AlertId::from("missing"));
        assert_eq!(center.len(), 1);
        assert_eq!(center.deadline(&AlertId::from("a")), None);
    }

    #[test]
    fn drop_dismisses_everything() {
        let log = Recorder::default();
        {
            let mut center = NotificationCenter::new(log.clone(), ManualClock::default(), 1_000);
            center.show(note("a"));
            center.show(note("b"));
        }
        let entries = log.0.borrow();
        assert!(entries.contains(&"hide a".to_string()));
        assert!(entries.contains(&"hide b".to_string()));
    }
}
