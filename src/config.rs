use crate::errors::{EngineError, EngineResult};
use crate::geometry::grid::Bucketing;
use crate::simulation::SimulationLimits;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub static_dir: PathBuf,
    pub max_simulations: usize,
    pub max_steps: usize,
    pub vis_max_paths: usize,
    pub vis_max_steps: usize,
    /// Largest `samples` array accepted by `/visualize`
    pub vis_max_samples: usize,
    /// Largest surface grid (distinct times x distinct volatilities)
    pub vis_max_vertices: usize,
    pub reference_volatility: f64,
    pub pricing_paths: usize,
    pub pricing_steps: usize,
    pub lsm_paths: usize,
    pub lsm_steps: usize,
    pub risk_paths: usize,
    pub risk_steps: usize,
    pub mc_workers: usize,
    /// 0 keeps exact axis matching for surface grids
    pub grid_tolerance: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 5001,
            static_dir: PathBuf::from("static"),
            max_simulations: 10_000,
            max_steps: 1_000,
            vis_max_paths: 50,
            vis_max_steps: 50,
            vis_max_samples: 100_000,
            vis_max_vertices: 1_000_000,
            reference_volatility: 0.2,
            pricing_paths: 100_000,
            pricing_steps: 252,
            lsm_paths: 10_000,
            lsm_steps: 50,
            risk_paths: 1_000,
            risk_steps: 252,
            mc_workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
            grid_tolerance: 0.0,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        let d = Self::default();

        let cfg = Self {
            server_port: env_parse("SERVER_PORT", d.server_port)?,
            static_dir: std::env::var("STATIC_DIR").map(PathBuf::from).unwrap_or(d.static_dir),
            max_simulations: env_parse("MAX_SIMULATIONS", d.max_simulations)?,
            max_steps: env_parse("MAX_STEPS", d.max_steps)?,
            vis_max_paths: env_parse("VIS_MAX_PATHS", d.vis_max_paths)?,
            vis_max_steps: env_parse("VIS_MAX_STEPS", d.vis_max_steps)?,
            vis_max_samples: env_parse("VIS_MAX_SAMPLES", d.vis_max_samples)?,
            vis_max_vertices: env_parse("VIS_MAX_VERTICES", d.vis_max_vertices)?,
            reference_volatility: env_parse("REFERENCE_VOLATILITY", d.reference_volatility)?,
            pricing_paths: env_parse("PRICING_PATHS", d.pricing_paths)?,
            pricing_steps: env_parse("PRICING_STEPS", d.pricing_steps)?,
            lsm_paths: env_parse("LSM_PATHS", d.lsm_paths)?,
            lsm_steps: env_parse("LSM_STEPS", d.lsm_steps)?,
            risk_paths: env_parse("RISK_PATHS", d.risk_paths)?,
            risk_steps: env_parse("RISK_STEPS", d.risk_steps)?,
            mc_workers: env_parse("MC_WORKERS", d.mc_workers)?,
            grid_tolerance: env_parse("GRID_TOLERANCE", d.grid_tolerance)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.vis_max_paths == 0 || self.vis_max_steps == 0 {
            return Err(EngineError::Config("VIS_MAX_PATHS and VIS_MAX_STEPS must be positive".into()));
        }
        if self.vis_max_samples == 0 || self.vis_max_vertices == 0 {
            return Err(EngineError::Config(
                "VIS_MAX_SAMPLES and VIS_MAX_VERTICES must be positive".into(),
            ));
        }
        if self.mc_workers == 0 {
            return Err(EngineError::Config("MC_WORKERS must be positive".into()));
        }
        if !(self.reference_volatility.is_finite() && self.reference_volatility > 0.0) {
            return Err(EngineError::Config("REFERENCE_VOLATILITY must be positive".into()));
        }
        if !(self.grid_tolerance.is_finite() && self.grid_tolerance >= 0.0) {
            return Err(EngineError::Config("GRID_TOLERANCE must be non-negative".into()));
        }
        Ok(())
    }

    pub fn simulation_limits(&self) -> SimulationLimits {
        SimulationLimits {
            max_simulations: self.max_simulations,
            max_steps: self.max_steps,
            vis_max_paths: self.vis_max_paths,
            vis_max_steps: self.vis_max_steps,
            reference_volatility: self.reference_volatility,
        }
    }

    pub fn bucketing(&self) -> Bucketing {
        Bucketing::from_tolerance(self.grid_tolerance)
    }
}

fn env_parse<T>(key: &str, default: T) -> EngineResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| EngineError::Config(format!("{key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.bucketing(), Bucketing::Exact);
        assert_eq!(cfg.simulation_limits().vis_max_steps, 50);
    }

    #[test]
    fn test_env_parse() {
        std::env::set_var("QUANTSCOPE_TEST_PORT", " 8080 ");
        assert_eq!(env_parse("QUANTSCOPE_TEST_PORT", 1u16).unwrap(), 8080);
        std::env::set_var("QUANTSCOPE_TEST_BAD", "abc");
        assert!(matches!(env_parse("QUANTSCOPE_TEST_BAD", 1u16), Err(EngineError::Config(_))));
        assert_eq!(env_parse("QUANTSCOPE_TEST_MISSING", 7usize).unwrap(), 7);
    }

    #[test]
    fn test_zero_visualization_caps_rejected() {
        let cfg = AppConfig { vis_max_vertices: 0, ..AppConfig::default() };
        assert!(matches!(cfg.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let cfg = AppConfig { grid_tolerance: -1.0, ..AppConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
