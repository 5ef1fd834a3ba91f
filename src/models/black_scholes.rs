use crate::errors::EngineResult;
use crate::models::{OptionContract, OptionType, PricingModel};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Black-Scholes European vanilla pricing.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
/// call = S*Phi(d1) - K*e^{-rT}*Phi(d2)
/// put  = K*e^{-rT}*Phi(-d2) - S*Phi(-d1)
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self { normal: Normal::standard() }
    }

    #[inline]
    pub fn d1_d2(&self, c: &OptionContract) -> (f64, f64) {
        let sigma_sqrt_t = c.volatility * c.maturity.sqrt();
        let d1 = ((c.spot / c.strike).ln() + (c.rate + 0.5 * c.volatility * c.volatility) * c.maturity)
            / sigma_sqrt_t;
        (d1, d1 - sigma_sqrt_t)
    }

    #[inline]
    pub fn cdf(&self, x: f64) -> f64 {
        self.normal.cdf(x)
    }

    #[inline]
    pub fn pdf(&self, x: f64) -> f64 {
        self.normal.pdf(x)
    }

    pub fn value(&self, c: &OptionContract) -> f64 {
        // Expired or zero-vol contracts collapse to discounted forward intrinsic
        if c.maturity <= 0.0 || c.volatility <= 0.0 {
            let forward = c.spot * (c.rate * c.maturity.max(0.0)).exp();
            return c.option_type.payoff(forward, c.strike) * (-c.rate * c.maturity.max(0.0)).exp();
        }

        let (d1, d2) = self.d1_d2(c);
        let df = c.discount();
        match c.option_type {
            OptionType::Call => c.spot * self.cdf(d1) - c.strike * df * self.cdf(d2),
            OptionType::Put => c.strike * df * self.cdf(-d2) - c.spot * self.cdf(-d1),
        }
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingModel for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    fn price(&self, contract: &OptionContract) -> EngineResult<f64> {
        Ok(self.value(contract))
    }
}
