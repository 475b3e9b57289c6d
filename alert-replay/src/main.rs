//! Replays a bar file through the alert engine.
//!
//! Fired alerts are printed to stdout as one JSON object per line; logs go to
//! stderr. Alerts still armed at the end can be written back with `--out`.

use std::cell::{Cell, RefCell};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use alert_engine::{
    AlertCondition, AlertEngine, AlertStore, CrossingEvent, Drawing, DrawingBook, EngineConfig,
    OwnerToken, ToolHandle,
};
use alert_interaction::{
    Clock, InteractionConfig, NotificationCenter, NotificationData, NotificationSurface,
    ToastRenderer,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ts_core::{Bar, Candle, Timestamp};

const CONFIG_PATH_ENV: &str = "ALERT_REPLAY_CONFIG";
const LOG_FILTER_ENV: &str = "ALERT_REPLAY_LOG";
const DEFAULT_LOG_FILTER: &str = "alert_engine=info,alert_replay=info";

/// Replay candles against a set of price and drawing alerts
#[derive(Parser, Debug)]
#[command(name = "alert-replay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON array of candles ({ts, open, high, low, close, volume?})
    #[arg(long)]
    bars: PathBuf,

    /// JSON array of persisted price alerts
    #[arg(long)]
    alerts: Option<PathBuf>,

    /// JSON array of drawings ({id, kind, ...})
    #[arg(long)]
    drawings: Option<PathBuf>,

    /// Bind an alert to a drawing, as `<drawing id>:<condition>`. Repeatable.
    #[arg(long = "tool-alert", value_name = "ID:CONDITION")]
    tool_alerts: Vec<String>,

    /// Where to write the alerts that did not fire
    #[arg(long)]
    out: Option<PathBuf>,

    /// Engine/interaction config file (falls back to $ALERT_REPLAY_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for alert id generation, for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplayConfig {
    engine: EngineConfig,
    interaction: InteractionConfig,
}

/// Notification clock that follows bar time instead of the wall clock.
#[derive(Clone, Default)]
struct BarClock(Rc<Cell<Timestamp>>);

impl Clock for BarClock {
    fn now_ms(&self) -> Timestamp {
        self.0.get()
    }
}

struct LogToasts;

impl ToastRenderer for LogToasts {
    fn render(&mut self, data: &NotificationData) {
        info!(alert = %data.alert_id, title = %data.title, "{}", data.message);
    }

    fn remove(&mut self, id: &alert_engine::AlertId) {
        tracing::debug!(alert = %id, "notification dismissed");
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let candles: Vec<Candle> = read_json(&cli.bars)?;
    let book = match &cli.drawings {
        Some(path) => DrawingBook::from_drawings(read_json::<Vec<Drawing>>(path)?),
        None => DrawingBook::new(),
    };

    let store = match cli.seed {
        Some(seed) => AlertStore::with_seed(config.engine.clone(), seed),
        None => AlertStore::new(config.engine.clone()),
    };
    let mut engine = AlertEngine::with_store(store);

    if let Some(path) = &cli.alerts {
        let payload =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let applied = engine.store_mut().import_json(&payload)?;
        info!(applied, "price alerts imported");
    }
    for spec in &cli.tool_alerts {
        let (tool, condition) = parse_tool_alert(spec)?;
        let id = engine
            .store_mut()
            .create_for_tool(tool, condition, &book, 0.0)
            .with_context(|| format!("binding alert to drawing {tool}"))?;
        info!(alert = %id, %tool, %condition, "tool alert created");
    }

    let clock = BarClock::default();
    let center = Rc::new(RefCell::new(NotificationCenter::new(
        LogToasts,
        clock.clone(),
        config.interaction.auto_dismiss_ms,
    )));
    let owner = OwnerToken::new(1);
    {
        let center = center.clone();
        let engine_cfg = config.engine.clone();
        engine
            .triggered_mut()
            .subscribe(owner, move |ev: &CrossingEvent| {
                center
                    .borrow_mut()
                    .show(NotificationData::from_event(ev, &engine_cfg));
            });
    }

    let mut fired = 0usize;
    for (i, candle) in candles.iter().enumerate() {
        let bar = Bar::from(candle);
        clock.0.set(bar.time);
        center.borrow_mut().tick();
        for event in engine.on_bar(&book, &bar, i as f64) {
            println!("{}", serde_json::to_string(&event)?);
            fired += 1;
        }
    }
    engine.unsubscribe_owner(owner);
    info!(
        bars = candles.len(),
        fired,
        remaining = engine.store().len(),
        "replay finished"
    );

    if let Some(path) = &cli.out {
        let remaining = serde_json::to_string_pretty(&engine.store().export_all())?;
        fs::write(path, remaining).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = env::var(LOG_FILTER_ENV)
        .ok()
        .and_then(|f| tracing_subscriber::EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(flag: Option<&Path>) -> Result<ReplayConfig> {
    let path = match flag {
        Some(p) => Some(p.to_path_buf()),
        None => env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from),
    };
    match path {
        Some(p) => read_json(&p),
        None => Ok(ReplayConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn parse_tool_alert(spec: &str) -> Result<(ToolHandle, AlertCondition)> {
    let Some((id, condition)) = spec.split_once(':') else {
        bail!("expected <drawing id>:<condition>, got {spec:?}");
    };
    let id: u64 = id
        .trim()
        .parse()
        .with_context(|| format!("bad drawing id in {spec:?}"))?;
    Ok((ToolHandle::new(id), condition.parse()?))
}
