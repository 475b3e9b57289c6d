use serde::Deserialize;

const DEFAULT_ID_SPACE: u64 = 1_000_000;
const DEFAULT_PRICE_PRECISION: usize = 2;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound (exclusive) of the random integers alert ids are drawn from.
    pub id_space: u64,
    /// Decimal places used when an alert level is rendered as label text.
    pub price_precision: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_space: DEFAULT_ID_SPACE,
            price_precision: DEFAULT_PRICE_PRECISION,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_space(mut self, id_space: u64) -> Self {
        self.id_space = id_space.max(1);
        self
    }

    pub fn with_price_precision(mut self, precision: usize) -> Self {
        self.price_precision = precision.min(10);
        self
    }

    pub fn format_price(&self, price: f64) -> String {
        format!("{price:.prec$}", prec = self.price_precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"price_precision": 4}"#).unwrap();
        assert_eq!(cfg.price_precision, 4);
        assert_eq!(cfg.id_space, DEFAULT_ID_SPACE);
        assert_eq!(cfg.format_price(1.5), "1.5000");
    }

    #[test]
    fn id_space_never_zero() {
        assert_eq!(EngineConfig::new().with_id_space(0).id_space, 1);
    }
}
