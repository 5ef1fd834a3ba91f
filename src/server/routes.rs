use crate::errors::{EngineError, EngineResult};
use crate::geometry::grid::Bucketing;
use crate::geometry::{self, Geometry, Sample, VizMode};
use crate::models::black_scholes::BlackScholes;
use crate::models::monte_carlo::{self, AmericanMonteCarlo};
use crate::models::{OptionContract, OptionType, PricingModel};
use crate::risk::greeks::{compute_greeks, Greeks};
use crate::risk::portfolio::{self, PortfolioRequest, PortfolioRisk};
use crate::simulation::{self, SimulationParams};
use crate::state::{AppState, SimulationRun, WsMessage};
use axum::extract::State;
use axum::response::Json;
use portable_atomic::Ordering::Relaxed;
use std::sync::Arc;

#[derive(Debug, Default, serde::Deserialize)]
pub struct VisualizeRequest {
    #[serde(default)]
    pub mode: VizMode,
    /// Explicit samples; the latest stored run is used when absent.
    #[serde(default)]
    pub samples: Option<Vec<Sample>>,
    /// Overrides the configured surface bucketing for this request.
    #[serde(default)]
    pub tolerance: Option<f64>,
}

#[derive(Debug, serde::Serialize)]
pub struct VisualizeResponse {
    pub run_id: Option<String>,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct PricingRequest {
    pub spot: f64,
    pub strike: f64,
    pub maturity: f64,
    pub rate: f64,
    pub volatility: f64,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub seed: Option<u64>,
}

impl Default for PricingRequest {
    fn default() -> Self {
        Self {
            spot: 100.0,
            strike: 100.0,
            maturity: 1.0,
            rate: 0.05,
            volatility: 0.2,
            option_type: OptionType::Call,
            seed: None,
        }
    }
}

impl PricingRequest {
    fn contract(&self) -> OptionContract {
        OptionContract {
            spot: self.spot,
            strike: self.strike,
            maturity: self.maturity,
            rate: self.rate,
            volatility: self.volatility,
            option_type: self.option_type,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PricingResponse {
    pub black_scholes_price: f64,
    pub monte_carlo_price: f64,
    pub american_monte_carlo_price: f64,
    pub greeks: Greeks,
}

/// GET / -- liveness
pub async fn home() -> &'static str {
    "Quantitative finance simulation service is running"
}

/// POST /simulate -- run a simulation, store it as the latest run, return it
pub async fn simulate(
    State(state): State<Arc<AppState>>,
    Json(params): Json<SimulationParams>,
) -> EngineResult<Json<SimulationRun>> {
    let limits = state.config.simulation_limits();
    let params = params.clamped(&limits);
    params.validate()?;

    state.broadcast(WsMessage::status("Running simulation..."));

    let output = tokio::task::spawn_blocking(move || {
        let mut rng = monte_carlo::seeded_rng(params.seed, 0);
        simulation::run_simulation(&params, &limits, &mut rng)
    })
    .await??;

    let run = SimulationRun {
        run_id: uuid::Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        params,
        visualization_data: output.samples.samples,
        analytics: output.analytics,
    };

    state.counters.simulations_run.fetch_add(1, Relaxed);
    state.broadcast(WsMessage::SimulationComplete {
        run_id: run.run_id.clone(),
        samples: run.visualization_data.len(),
        option_price: run.analytics.option_price,
        execution_time_seconds: run.analytics.statistics.execution_time_seconds,
    });
    state.publish_run(Arc::new(run.clone()));

    Ok(Json(run))
}

/// GET /api/latest -- latest stored run (from watch channel, no lock)
pub async fn latest(State(state): State<Arc<AppState>>) -> EngineResult<Json<SimulationRun>> {
    state
        .latest_run()
        .map(|run| Json(run.as_ref().clone()))
        .ok_or_else(|| EngineError::NotFound("no simulation has been run yet".into()))
}

/// POST /visualize -- build render buffers for the chosen mode.
/// Switching modes only re-runs this against the stored samples.
pub async fn visualize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VisualizeRequest>,
) -> EngineResult<Json<VisualizeResponse>> {
    let cfg = &state.config;
    let bucketing = match req.tolerance {
        None => cfg.bucketing(),
        Some(eps) if eps.is_finite() && eps >= 0.0 => Bucketing::from_tolerance(eps),
        Some(eps) => {
            return Err(EngineError::InvalidInput(format!(
                "tolerance must be finite and non-negative, got {eps}"
            )))
        }
    };
    let mode = req.mode;
    let max_vertices = cfg.vis_max_vertices;

    let (run_id, built) = match req.samples {
        Some(samples) => {
            if samples.len() > cfg.vis_max_samples {
                return Err(EngineError::InvalidInput(format!(
                    "{} samples exceeds the limit of {}",
                    samples.len(),
                    cfg.vis_max_samples
                )));
            }
            let built = tokio::task::spawn_blocking(move || {
                geometry::build_geometry(&samples, mode, bucketing, max_vertices)
            })
            .await?;
            (None, built)
        }
        None => {
            let run = state
                .latest_run()
                .ok_or_else(|| EngineError::NotFound("no simulation has been run yet".into()))?;
            let run_id = run.run_id.clone();
            let built = tokio::task::spawn_blocking(move || {
                geometry::build_geometry(&run.visualization_data, mode, bucketing, max_vertices)
            })
            .await?;
            (Some(run_id), built)
        }
    };

    match built {
        Ok(geometry) => {
            state.counters.geometry_built.fetch_add(1, Relaxed);
            state.broadcast(WsMessage::GeometryBuilt {
                run_id: run_id.clone(),
                mode,
                vertices: geometry.vertex_count(),
            });
            Ok(Json(VisualizeResponse { run_id, geometry }))
        }
        Err(e) => {
            state.counters.geometry_failures.fetch_add(1, Relaxed);
            state.broadcast(WsMessage::Error {
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
            Err(e.into())
        }
    }
}

/// POST /pricing -- analytic, Monte Carlo and LSM prices plus Greeks
pub async fn pricing(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PricingRequest>,
) -> EngineResult<Json<PricingResponse>> {
    let contract = req.contract();
    contract.validate()?;
    state.counters.pricing_requests.fetch_add(1, Relaxed);

    let cfg = &state.config;
    let bs = BlackScholes::new();
    let black_scholes_price = bs.price(&contract)?;
    let greeks = compute_greeks(&bs, &contract);

    let monte_carlo_price = monte_carlo::parallel_european_price(
        contract,
        cfg.pricing_paths,
        cfg.pricing_steps,
        cfg.mc_workers,
        req.seed,
    )
    .await?;

    let lsm = AmericanMonteCarlo {
        paths: cfg.lsm_paths,
        steps: cfg.lsm_steps,
        seed: req.seed,
    };
    tracing::debug!(engine = lsm.name(), paths = lsm.paths, steps = lsm.steps, "pricing early exercise");
    let american_monte_carlo_price =
        tokio::task::spawn_blocking(move || lsm.price(&contract)).await??;

    tracing::info!(
        option_type = %contract.option_type,
        black_scholes_price,
        monte_carlo_price,
        american_monte_carlo_price,
        "priced option"
    );

    Ok(Json(PricingResponse {
        black_scholes_price,
        monte_carlo_price,
        american_monte_carlo_price,
        greeks,
    }))
}

/// POST /risk -- simulated portfolio risk metrics
pub async fn risk(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PortfolioRequest>,
) -> EngineResult<Json<PortfolioRisk>> {
    req.validate()?;
    state.counters.risk_requests.fetch_add(1, Relaxed);

    let (paths, steps) = (state.config.risk_paths, state.config.risk_steps);
    let risk = tokio::task::spawn_blocking(move || {
        let mut rng = monte_carlo::seeded_rng(req.seed, 0);
        portfolio::analyze_portfolio(&req, paths, steps, &mut rng)
    })
    .await??;

    Ok(Json(risk))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "simulations_run": state.counters.simulations_run.load(Relaxed),
        "geometry_built": state.counters.geometry_built.load(Relaxed),
        "geometry_failures": state.counters.geometry_failures.load(Relaxed),
        "pricing_requests": state.counters.pricing_requests.load(Relaxed),
        "risk_requests": state.counters.risk_requests.load(Relaxed),
        "ws_messages_sent": state.counters.ws_messages_sent.load(Relaxed),
    }))
}
