use crate::errors::{EngineError, EngineResult};
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson, StandardNormal};

/// Row-major `paths x (steps + 1)` matrix of simulated values.
/// Column 0 is the initial value.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatrix {
    paths: usize,
    steps: usize,
    data: Vec<f64>,
}

impl PathMatrix {
    fn filled(paths: usize, steps: usize, initial: f64) -> Self {
        let mut data = vec![0.0; paths * (steps + 1)];
        for p in 0..paths {
            data[p * (steps + 1)] = initial;
        }
        Self { paths, steps, data }
    }

    #[inline]
    pub fn paths(&self) -> usize {
        self.paths
    }

    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    #[inline]
    pub fn path(&self, p: usize) -> &[f64] {
        let width = self.steps + 1;
        &self.data[p * width..(p + 1) * width]
    }

    #[inline]
    pub fn get(&self, p: usize, t: usize) -> f64 {
        self.data[p * (self.steps + 1) + t]
    }

    #[inline]
    fn set(&mut self, p: usize, t: usize, v: f64) {
        self.data[p * (self.steps + 1) + t] = v;
    }

    #[inline]
    pub fn terminal(&self, p: usize) -> f64 {
        self.get(p, self.steps)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.steps + 1)
    }
}

/// Heston stochastic-volatility parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HestonParams {
    /// Initial variance
    pub v0: f64,
    /// Mean-reversion speed
    pub kappa: f64,
    /// Long-run variance
    pub theta: f64,
    /// Volatility of variance
    pub xi: f64,
    /// Spot/variance correlation
    pub rho: f64,
}

/// Merton jump parameters: Poisson intensity and normal log-jump size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpParams {
    pub intensity: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Exact log-Euler GBM step: S_{t+dt} = S_t * exp((mu - sigma^2/2) dt + sigma sqrt(dt) Z)
pub fn geometric_brownian_motion<R: Rng + ?Sized>(
    s0: f64,
    mu: f64,
    sigma: f64,
    maturity: f64,
    steps: usize,
    paths: usize,
    rng: &mut R,
) -> PathMatrix {
    let mut out = PathMatrix::filled(paths, steps, s0);
    if steps == 0 {
        return out;
    }

    let dt = maturity / steps as f64;
    let drift = (mu - 0.5 * sigma * sigma) * dt;
    let diffusion = sigma * dt.sqrt();

    for p in 0..paths {
        let mut s = s0;
        for t in 1..=steps {
            let z: f64 = rng.sample(StandardNormal);
            s *= (drift + diffusion * z).exp();
            out.set(p, t, s);
        }
    }
    out
}

/// Heston paths with full truncation of the variance at zero.
/// Returns (spot, variance) matrices of identical shape.
pub fn heston<R: Rng + ?Sized>(
    s0: f64,
    rate: f64,
    params: &HestonParams,
    maturity: f64,
    steps: usize,
    paths: usize,
    rng: &mut R,
) -> (PathMatrix, PathMatrix) {
    let mut spot = PathMatrix::filled(paths, steps, s0);
    let mut var = PathMatrix::filled(paths, steps, params.v0);
    if steps == 0 {
        return (spot, var);
    }

    let dt = maturity / steps as f64;
    let rho_perp = (1.0 - params.rho * params.rho).max(0.0).sqrt();

    for p in 0..paths {
        let mut s = s0;
        let mut v = params.v0;
        for t in 1..=steps {
            let z1: f64 = rng.sample(StandardNormal);
            let z2: f64 = params.rho * z1 + rho_perp * rng.sample::<f64, _>(StandardNormal);

            // Spot uses the pre-step variance
            let v_pos = v.max(0.0);
            s *= ((rate - 0.5 * v_pos) * dt + (v_pos * dt).sqrt() * z1).exp();
            v = (v + params.kappa * (params.theta - v) * dt + params.xi * (v_pos * dt).sqrt() * z2)
                .max(0.0);

            spot.set(p, t, s);
            var.set(p, t, v);
        }
    }
    (spot, var)
}

/// Merton jump diffusion: GBM plus a compound Poisson sum of normal log-jumps per step.
#[allow(clippy::too_many_arguments)]
pub fn jump_diffusion<R: Rng + ?Sized>(
    s0: f64,
    mu: f64,
    sigma: f64,
    jumps: &JumpParams,
    maturity: f64,
    steps: usize,
    paths: usize,
    rng: &mut R,
) -> EngineResult<PathMatrix> {
    let mut out = PathMatrix::filled(paths, steps, s0);
    if steps == 0 {
        return Ok(out);
    }

    let dt = maturity / steps as f64;
    let drift = (mu - 0.5 * sigma * sigma) * dt;
    let diffusion = sigma * dt.sqrt();

    let jump_size = Normal::new(jumps.mean, jumps.std_dev)
        .map_err(|e| EngineError::Model(format!("jump size distribution: {e}")))?;
    // Poisson rejects a zero rate; no intensity means no jumps at all
    let jump_count = if jumps.intensity * dt > 0.0 {
        Some(
            Poisson::new(jumps.intensity * dt)
                .map_err(|e| EngineError::Model(format!("jump count distribution: {e}")))?,
        )
    } else {
        None
    };

    for p in 0..paths {
        let mut s = s0;
        for t in 1..=steps {
            let z: f64 = rng.sample(StandardNormal);
            let n = jump_count.as_ref().map_or(0, |d| d.sample(rng) as u64);
            let mut jump = 0.0;
            for _ in 0..n {
                jump += jump_size.sample(rng);
            }
            s *= (drift + diffusion * z + jump).exp();
            out.set(p, t, s);
        }
    }
    Ok(out)
}
