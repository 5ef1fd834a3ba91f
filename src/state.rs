use crate::config::AppConfig;
use crate::geometry::{Sample, VizMode};
use crate::simulation::analytics::AnalyticsSummary;
use crate::simulation::SimulationParams;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

// ── Completed simulation run (immutable once published) ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct SimulationRun {
    pub run_id: String,
    pub created_at: String,
    pub params: SimulationParams,
    pub visualization_data: Vec<Sample>,
    #[serde(flatten)]
    pub analytics: AnalyticsSummary,
}

// ── Messages OUT to WebSocket clients ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "status")]
    Status { message: String, timestamp: String },

    #[serde(rename = "simulation_complete")]
    SimulationComplete {
        run_id: String,
        samples: usize,
        option_price: f64,
        execution_time_seconds: f64,
    },

    #[serde(rename = "geometry_built")]
    GeometryBuilt {
        run_id: Option<String>,
        mode: VizMode,
        vertices: usize,
    },

    #[serde(rename = "error")]
    Error { kind: String, message: String },
}

impl WsMessage {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub simulations_run: AtomicU64,
    pub geometry_built: AtomicU64,
    pub geometry_failures: AtomicU64,
    pub pricing_requests: AtomicU64,
    pub risk_requests: AtomicU64,
    pub ws_messages_sent: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            simulations_run: AtomicU64::new(0),
            geometry_built: AtomicU64::new(0),
            geometry_failures: AtomicU64::new(0),
            pricing_requests: AtomicU64::new(0),
            risk_requests: AtomicU64::new(0),
            ws_messages_sent: AtomicU64::new(0),
        }
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

// ── Application shared state (channels, not locks) ──

pub struct AppState {
    pub config: AppConfig,

    // Latest completed run (watch = single slot, replaced wholesale)
    pub latest_run_tx: watch::Sender<Option<Arc<SimulationRun>>>,
    pub latest_run_rx: watch::Receiver<Option<Arc<SimulationRun>>>,

    // Status event stream (broadcast for WS clients)
    pub ws_tx: broadcast::Sender<WsMessage>,

    // Lock-free performance counters
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        let (ws_tx, _) = broadcast::channel(256);
        let (latest_run_tx, latest_run_rx) = watch::channel(None);

        Arc::new(Self {
            config,
            latest_run_tx,
            latest_run_rx,
            ws_tx,
            counters: PerfCounters::new(),
        })
    }

    #[inline]
    pub fn broadcast(&self, msg: WsMessage) {
        self.counters.ws_messages_sent.fetch_add(1, Ordering::Relaxed);
        let _ = self.ws_tx.send(msg);
    }

    pub fn latest_run(&self) -> Option<Arc<SimulationRun>> {
        self.latest_run_rx.borrow().clone()
    }

    /// Replace the stored run. The previous run is dropped once no request holds it.
    pub fn publish_run(&self, run: Arc<SimulationRun>) {
        self.latest_run_tx.send_replace(Some(run));
    }
}
