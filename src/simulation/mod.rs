pub mod analytics;
pub mod sampler;

use crate::errors::{EngineError, EngineResult};
use crate::models::black_scholes::BlackScholes;
use crate::models::monte_carlo;
use crate::models::{OptionContract, OptionType};
use crate::risk::greeks::compute_greeks;
use analytics::AnalyticsSummary;
use rand::Rng;
use sampler::{SamplePlan, SampleProcess, SampleSet};
use std::time::Instant;

/// Request body of a simulation run. Field names follow the browser client.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationParams {
    pub initial_price: f64,
    pub strike_price: f64,
    pub time_to_maturity: f64,
    pub risk_free_rate: f64,
    pub num_simulations: usize,
    pub num_steps: usize,
    pub option_type: OptionType,
    pub process: SampleProcess,
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            initial_price: 100.0,
            strike_price: 100.0,
            time_to_maturity: 1.0,
            risk_free_rate: 0.05,
            num_simulations: 1000,
            num_steps: 252,
            option_type: OptionType::Call,
            process: SampleProcess::Gbm,
            seed: None,
        }
    }
}

/// Server-side caps on simulation size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationLimits {
    pub max_simulations: usize,
    pub max_steps: usize,
    pub vis_max_paths: usize,
    pub vis_max_steps: usize,
    /// Volatility used for the analytic price/Greeks of a run
    pub reference_volatility: f64,
}

impl SimulationParams {
    pub fn clamped(mut self, limits: &SimulationLimits) -> Self {
        self.num_simulations = self.num_simulations.min(limits.max_simulations);
        self.num_steps = self.num_steps.min(limits.max_steps);
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.num_simulations == 0 {
            return Err(EngineError::InvalidInput("numSimulations must be at least 1".into()));
        }
        if self.num_steps == 0 {
            return Err(EngineError::InvalidInput("numSteps must be at least 1".into()));
        }
        self.contract(0.2).validate()
    }

    pub fn contract(&self, volatility: f64) -> OptionContract {
        OptionContract {
            spot: self.initial_price,
            strike: self.strike_price,
            maturity: self.time_to_maturity,
            rate: self.risk_free_rate,
            volatility,
            option_type: self.option_type,
        }
    }

    pub fn sample_plan(&self, limits: &SimulationLimits) -> SamplePlan {
        SamplePlan {
            initial_price: self.initial_price,
            rate: self.risk_free_rate,
            dt: self.time_to_maturity / self.num_steps as f64,
            paths: self.num_simulations.min(limits.vis_max_paths),
            steps_per_path: (self.num_steps + 1).min(limits.vis_max_steps),
            process: self.process,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub samples: SampleSet,
    pub analytics: AnalyticsSummary,
}

/// Generate visualization samples and the analytics summary for one request.
/// Blocking; callers on the async runtime should move this onto a blocking thread.
pub fn run_simulation<R: Rng + ?Sized>(
    params: &SimulationParams,
    limits: &SimulationLimits,
    rng: &mut R,
) -> EngineResult<SimulationOutput> {
    let started = Instant::now();
    params.validate()?;

    let plan = params.sample_plan(limits);
    let samples = sampler::generate_samples(&plan, rng)?;

    let contract = params.contract(limits.reference_volatility);
    contract.validate()?;
    let option_price =
        monte_carlo::european_price(&contract, params.num_simulations, params.num_steps, rng);
    let greeks = compute_greeks(&BlackScholes::new(), &contract);

    let analytics = AnalyticsSummary {
        option_price,
        greeks,
        risk_metrics: analytics::risk_snapshot(&samples),
        statistics: analytics::run_statistics(&samples, started.elapsed().as_secs_f64()),
    };

    tracing::info!(
        paths = plan.paths,
        steps_per_path = plan.steps_per_path,
        samples = samples.samples.len(),
        option_price,
        elapsed_s = analytics.statistics.execution_time_seconds,
        "simulation finished"
    );

    Ok(SimulationOutput { samples, analytics })
}
