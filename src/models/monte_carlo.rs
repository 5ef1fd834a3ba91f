use crate::errors::{EngineError, EngineResult};
use crate::models::processes::geometric_brownian_motion;
use crate::models::{OptionContract, PricingModel};
use nalgebra::{Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tokio::task::JoinSet;

/// Discounted mean payoff over `paths` terminal prices, each stepped `steps` times.
/// Paths are generated one at a time, so memory stays flat in `paths`.
pub fn european_price<R: Rng + ?Sized>(
    contract: &OptionContract,
    paths: usize,
    steps: usize,
    rng: &mut R,
) -> f64 {
    if paths == 0 {
        return 0.0;
    }
    let steps = steps.max(1);
    let dt = contract.maturity / steps as f64;
    let drift = (contract.rate - 0.5 * contract.volatility * contract.volatility) * dt;
    let diffusion = contract.volatility * dt.sqrt();

    let mut payoff_sum = 0.0;
    for _ in 0..paths {
        let mut log_s = 0.0;
        for _ in 0..steps {
            let z: f64 = rng.sample(StandardNormal);
            log_s += drift + diffusion * z;
        }
        payoff_sum += contract.option_type.payoff(contract.spot * log_s.exp(), contract.strike);
    }

    contract.discount() * payoff_sum / paths as f64
}

/// Longstaff-Schwartz American pricing.
///
/// Walks backwards from maturity; at each step regresses discounted
/// continuation values of in-the-money paths on {1, S, S^2} and exercises
/// where intrinsic value beats the fitted continuation.
pub fn american_price<R: Rng + ?Sized>(
    contract: &OptionContract,
    paths: usize,
    steps: usize,
    rng: &mut R,
) -> f64 {
    if paths == 0 {
        return 0.0;
    }
    let steps = steps.max(1);
    let dt = contract.maturity / steps as f64;
    let df = (-contract.rate * dt).exp();
    let spot = geometric_brownian_motion(
        contract.spot,
        contract.rate,
        contract.volatility,
        contract.maturity,
        steps,
        paths,
        rng,
    );
    let payoff = |s: f64| contract.option_type.payoff(s, contract.strike);

    // Cash flow of each path valued at step t + 1
    let mut value: Vec<f64> = (0..paths).map(|p| payoff(spot.terminal(p))).collect();
    let mut itm: Vec<usize> = Vec::with_capacity(paths);
    let mut xs: Vec<f64> = Vec::with_capacity(paths);
    let mut ys: Vec<f64> = Vec::with_capacity(paths);

    for t in (1..steps).rev() {
        itm.clear();
        xs.clear();
        ys.clear();
        for p in 0..paths {
            if payoff(spot.get(p, t)) > 0.0 {
                itm.push(p);
                // Scale by strike to keep the normal equations conditioned
                xs.push(spot.get(p, t) / contract.strike);
                ys.push(value[p] * df);
            }
        }

        let beta = if itm.is_empty() { None } else { Some(fit_quadratic(&xs, &ys)) };

        // itm is ascending, so walk it alongside p
        let mut k = 0;
        for p in 0..paths {
            let exercise = payoff(spot.get(p, t));
            let continuation = match beta {
                Some(b) if k < itm.len() && itm[k] == p => {
                    let x = xs[k];
                    k += 1;
                    b[0] + b[1] * x + b[2] * x * x
                }
                _ => 0.0,
            };
            value[p] = if exercise > continuation { exercise } else { value[p] * df };
        }
    }

    df * value.iter().sum::<f64>() / paths as f64
}

/// Least squares fit of y on {1, x, x^2}. Falls back to the mean of y when
/// the normal equations are singular (too few or identical regressors).
fn fit_quadratic(xs: &[f64], ys: &[f64]) -> [f64; 3] {
    let mut xtx = Matrix3::<f64>::zeros();
    let mut xty = Vector3::<f64>::zeros();
    for (&x, &y) in xs.iter().zip(ys) {
        let row = Vector3::new(1.0, x, x * x);
        xtx += row * row.transpose();
        xty += row * y;
    }

    let mean = xty[0] / xtx[(0, 0)].max(1.0);
    xtx.lu()
        .solve(&xty)
        .filter(|beta| beta.iter().all(|v| v.is_finite()))
        .map(|beta| [beta[0], beta[1], beta[2]])
        .unwrap_or([mean, 0.0, 0.0])
}

/// Deterministic per-stream RNG when seeded, OS entropy otherwise.
pub fn seeded_rng(seed: Option<u64>, stream: usize) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s.wrapping_add(stream as u64)),
        None => StdRng::from_entropy(),
    }
}

/// Split `total_paths` across `workers` blocking tasks, each with its own RNG,
/// and combine the per-worker prices weighted by path count.
pub async fn parallel_european_price(
    contract: OptionContract,
    total_paths: usize,
    steps: usize,
    workers: usize,
    seed: Option<u64>,
) -> EngineResult<f64> {
    let workers = workers.clamp(1, total_paths.max(1));
    let base = total_paths / workers;
    let extra = total_paths % workers;

    let mut set = JoinSet::new();
    for w in 0..workers {
        let paths = base + usize::from(w < extra);
        if paths == 0 {
            continue;
        }
        set.spawn_blocking(move || {
            let mut rng = seeded_rng(seed, w);
            (paths, european_price(&contract, paths, steps, &mut rng))
        });
    }

    let mut weighted = 0.0;
    let mut counted = 0usize;
    while let Some(joined) = set.join_next().await {
        let (paths, price) = joined?;
        weighted += price * paths as f64;
        counted += paths;
    }

    if counted == 0 {
        return Err(EngineError::Model("monte carlo run with zero paths".into()));
    }
    tracing::debug!(workers, paths = counted, "parallel monte carlo finished");
    Ok(weighted / counted as f64)
}

/// Longstaff-Schwartz engine with a fixed budget.
pub struct AmericanMonteCarlo {
    pub paths: usize,
    pub steps: usize,
    pub seed: Option<u64>,
}

impl PricingModel for AmericanMonteCarlo {
    fn name(&self) -> &'static str {
        "Monte Carlo (American LSM)"
    }

    fn price(&self, contract: &OptionContract) -> EngineResult<f64> {
        contract.validate()?;
        let mut rng = seeded_rng(self.seed, 0);
        Ok(american_price(contract, self.paths, self.steps, &mut rng))
    }
}
