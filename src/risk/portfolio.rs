use crate::errors::{EngineError, EngineResult};
use crate::models::processes::geometric_brownian_motion;
use crate::risk::metrics;
use rand::Rng;
use smallvec::SmallVec;

const TRADING_DAYS: f64 = 252.0;

fn default_spot() -> f64 {
    100.0
}
fn default_volatility() -> f64 {
    0.2
}
fn default_weight() -> f64 {
    1.0
}
fn default_rate() -> f64 {
    0.05
}
fn default_horizon() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct AssetSpec {
    #[serde(default = "default_spot")]
    pub spot: f64,
    #[serde(default = "default_volatility")]
    pub volatility: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PortfolioRequest {
    #[serde(default)]
    pub portfolio: SmallVec<[AssetSpec; 4]>,
    #[serde(default = "default_rate")]
    pub rate: f64,
    /// Years
    #[serde(default = "default_horizon")]
    pub horizon: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PortfolioRisk {
    pub value_at_risk_95: f64,
    pub conditional_var_95: f64,
    pub sharpe_ratio: f64,
    pub maximum_drawdown: f64,
    /// Annualized mean step return
    pub expected_return: f64,
    /// Annualized step return volatility
    pub volatility: f64,
}

impl PortfolioRequest {
    pub fn validate(&self) -> EngineResult<()> {
        if self.portfolio.is_empty() {
            return Err(EngineError::InvalidInput("Empty portfolio".into()));
        }
        for (i, a) in self.portfolio.iter().enumerate() {
            if !(a.spot.is_finite() && a.spot > 0.0) {
                return Err(EngineError::InvalidInput(format!("asset {i}: spot must be positive")));
            }
            if !(a.volatility.is_finite() && a.volatility >= 0.0) {
                return Err(EngineError::InvalidInput(format!(
                    "asset {i}: volatility must be non-negative"
                )));
            }
            if !a.weight.is_finite() {
                return Err(EngineError::InvalidInput(format!("asset {i}: weight must be finite")));
            }
        }
        let total: f64 = self.portfolio.iter().map(|a| a.weight).sum();
        if total.abs() < 1e-12 {
            return Err(EngineError::InvalidInput("portfolio weights sum to zero".into()));
        }
        if !(self.horizon.is_finite() && self.horizon > 0.0) || !self.rate.is_finite() {
            return Err(EngineError::InvalidInput("horizon must be positive, rate finite".into()));
        }
        Ok(())
    }
}

/// Simulate every asset under GBM, combine paths with normalized weights,
/// and compute tail and performance statistics over all step returns.
pub fn analyze_portfolio<R: Rng + ?Sized>(
    req: &PortfolioRequest,
    paths: usize,
    steps: usize,
    rng: &mut R,
) -> EngineResult<PortfolioRisk> {
    req.validate()?;
    if paths == 0 || steps == 0 {
        return Err(EngineError::InvalidInput("portfolio simulation needs paths and steps".into()));
    }

    let total_weight: f64 = req.portfolio.iter().map(|a| a.weight).sum();
    let width = steps + 1;
    let mut values = vec![0.0; paths * width];

    for asset in &req.portfolio {
        let w = asset.weight / total_weight;
        let m = geometric_brownian_motion(
            asset.spot,
            req.rate,
            asset.volatility,
            req.horizon,
            steps,
            paths,
            rng,
        );
        for (acc, row) in values.chunks_exact_mut(width).zip(m.rows()) {
            for (a, s) in acc.iter_mut().zip(row) {
                *a += w * s;
            }
        }
    }

    let returns: Vec<f64> = values.chunks_exact(width).flat_map(metrics::simple_returns).collect();

    let mean_path: Vec<f64> = (0..width)
        .map(|t| values.iter().skip(t).step_by(width).sum::<f64>() / paths as f64)
        .collect();

    let risk = PortfolioRisk {
        value_at_risk_95: metrics::value_at_risk(&returns, 0.95),
        conditional_var_95: metrics::conditional_var(&returns, 0.95),
        sharpe_ratio: metrics::sharpe_ratio(&returns, req.rate / TRADING_DAYS),
        maximum_drawdown: metrics::maximum_drawdown(&mean_path),
        expected_return: metrics::mean(&returns) * TRADING_DAYS,
        volatility: metrics::std_dev(&returns) * TRADING_DAYS.sqrt(),
    };

    tracing::debug!(
        assets = req.portfolio.len(),
        paths,
        steps,
        var_95 = risk.value_at_risk_95,
        "portfolio risk computed"
    );
    Ok(risk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn request(json: &str) -> PortfolioRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let req = request(r#"{"portfolio": [{}, {"spot": 50, "weight": 3}]}"#);
        assert_eq!(req.portfolio.len(), 2);
        assert_eq!(req.portfolio[0].spot, 100.0);
        assert_eq!(req.portfolio[1].volatility, 0.2);
        assert_eq!(req.rate, 0.05);
        assert_eq!(req.horizon, 1.0);
    }

    #[test]
    fn test_empty_portfolio_rejected() {
        let req = request(r#"{"portfolio": []}"#);
        let mut rng = StdRng::seed_from_u64(1);
        let err = analyze_portfolio(&req, 100, 10, &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_weights_rejected() {
        let req = request(r#"{"portfolio": [{"weight": 1}, {"weight": -1}]}"#);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_annualized_volatility_tracks_asset_vol() {
        let req = request(r#"{"portfolio": [{"spot": 100, "volatility": 0.3}], "rate": 0.0}"#);
        let mut rng = StdRng::seed_from_u64(99);
        let risk = analyze_portfolio(&req, 500, 252, &mut rng).unwrap();
        assert!((risk.volatility - 0.3).abs() < 0.02, "vol={}", risk.volatility);
        assert!(risk.value_at_risk_95 > 0.0);
        assert!(risk.conditional_var_95 >= risk.value_at_risk_95);
        assert!(risk.maximum_drawdown <= 0.0);
    }

    #[test]
    fn test_diversification_lowers_volatility() {
        let single = request(r#"{"portfolio": [{"volatility": 0.3}]}"#);
        let pair = request(r#"{"portfolio": [{"volatility": 0.3}, {"volatility": 0.3}]}"#);
        let mut rng = StdRng::seed_from_u64(4);
        let a = analyze_portfolio(&single, 400, 100, &mut rng).unwrap();
        let b = analyze_portfolio(&pair, 400, 100, &mut rng).unwrap();
        assert!(b.volatility < a.volatility, "pair={} single={}", b.volatility, a.volatility);
    }
}
