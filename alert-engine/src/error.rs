use thiserror::Error;

use crate::model::AlertCondition;
use crate::tools::ToolHandle;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("alert level must be a finite number, got {0}")]
    InvalidLevel(f64),
    #[error("condition {condition} is not available for {binding} alerts")]
    UnsupportedCondition {
        condition: AlertCondition,
        binding: &'static str,
    },
    #[error("drawing {0} no longer exists")]
    StaleTool(ToolHandle),
    #[error("drawing {0} exposes no price to seed an alert from")]
    UnresolvableTool(ToolHandle),
    #[error("unknown alert condition: {0}")]
    UnknownCondition(String),
    #[error("invalid alert payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("alert payload must be a JSON array")]
    NotAnArray,
}

pub type Result<T> = std::result::Result<T, AlertError>;
