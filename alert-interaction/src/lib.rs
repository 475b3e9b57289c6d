//! Pointer interaction and host surfaces for chart alerts.

pub mod config;
pub mod controller;
pub mod geometry;
pub mod notifications;
pub mod surfaces;

pub use config::InteractionConfig;
pub use controller::{
    AlertController, ChartContext, ClickAction, GutterClick, InteractionLock, PointerSample,
};
pub use geometry::{CoordinateMapping, LabelBox, LinearPriceScale};
pub use notifications::{Clock, NotificationCenter, SystemClock, ToastRenderer};
pub use surfaces::{
    BindingCategory, EditRequest, EditResult, EditSurface, EditTarget, NotificationData,
    NotificationSurface,
};
