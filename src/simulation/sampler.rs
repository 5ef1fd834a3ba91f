use crate::errors::EngineResult;
use crate::geometry::Sample;
use crate::models::processes::{self, HestonParams, JumpParams};
use rand::Rng;

/// Per-path volatility is drawn uniformly from this range for GBM and jump paths.
pub const PATH_VOL_RANGE: (f64, f64) = (0.1, 0.3);

const HESTON: HestonParams = HestonParams { v0: 0.04, kappa: 2.0, theta: 0.04, xi: 0.3, rho: -0.7 };
const JUMPS: JumpParams = JumpParams { intensity: 1.0, mean: -0.05, std_dev: 0.1 };

/// Process used to generate visualization paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleProcess {
    #[default]
    Gbm,
    Heston,
    JumpDiffusion,
}

/// Shape of a visualization run. `dt` comes from the full step count even
/// when fewer steps are sampled, so the samples cover the start of the horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePlan {
    pub initial_price: f64,
    pub rate: f64,
    pub dt: f64,
    pub paths: usize,
    /// Samples per path, including t = 0
    pub steps_per_path: usize,
    pub process: SampleProcess,
}

/// Samples laid out path-major: `steps_per_path` consecutive entries per path.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub samples: Vec<Sample>,
    pub steps_per_path: usize,
}

impl SampleSet {
    pub fn paths(&self) -> impl Iterator<Item = &[Sample]> {
        self.samples.chunks_exact(self.steps_per_path.max(1))
    }
}

pub fn generate_samples<R: Rng + ?Sized>(plan: &SamplePlan, rng: &mut R) -> EngineResult<SampleSet> {
    let steps = plan.steps_per_path.saturating_sub(1);
    let horizon = plan.dt * steps as f64;
    let mut samples = Vec::with_capacity(plan.paths * plan.steps_per_path);

    for _ in 0..plan.paths {
        match plan.process {
            SampleProcess::Gbm => {
                let vol = rng.gen_range(PATH_VOL_RANGE.0..PATH_VOL_RANGE.1);
                let m = processes::geometric_brownian_motion(
                    plan.initial_price, plan.rate, vol, horizon, steps, 1, rng,
                );
                push_path(&mut samples, plan.dt, m.path(0), |_| vol);
            }
            SampleProcess::JumpDiffusion => {
                let vol = rng.gen_range(PATH_VOL_RANGE.0..PATH_VOL_RANGE.1);
                let m = processes::jump_diffusion(
                    plan.initial_price, plan.rate, vol, &JUMPS, horizon, steps, 1, rng,
                )?;
                push_path(&mut samples, plan.dt, m.path(0), |_| vol);
            }
            SampleProcess::Heston => {
                let (spot, var) =
                    processes::heston(plan.initial_price, plan.rate, &HESTON, horizon, steps, 1, rng);
                let variance = var.path(0);
                push_path(&mut samples, plan.dt, spot.path(0), |t| variance[t].sqrt());
            }
        }
    }

    Ok(SampleSet { samples, steps_per_path: plan.steps_per_path })
}

fn push_path(out: &mut Vec<Sample>, dt: f64, prices: &[f64], vol_at: impl Fn(usize) -> f64) {
    out.extend(prices.iter().enumerate().map(|(t, &price)| Sample {
        time: t as f64 * dt,
        price,
        volatility: vol_at(t),
    }));
}
