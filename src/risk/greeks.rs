use crate::models::black_scholes::BlackScholes;
use crate::models::{OptionContract, OptionType};

/// Black-Scholes sensitivities. Theta is per year, vega and rho per unit
/// (not per 1%) change of volatility and rate.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

pub fn compute_greeks(bs: &BlackScholes, c: &OptionContract) -> Greeks {
    let (d1, d2) = bs.d1_d2(c);
    let sqrt_t = c.maturity.sqrt();
    let pdf_d1 = bs.pdf(d1);
    let k_df = c.strike * c.discount();

    let gamma = pdf_d1 / (c.spot * c.volatility * sqrt_t);
    let vega = c.spot * sqrt_t * pdf_d1;
    let decay = -(c.spot * pdf_d1 * c.volatility) / (2.0 * sqrt_t);

    match c.option_type {
        OptionType::Call => Greeks {
            delta: bs.cdf(d1),
            gamma,
            theta: decay - c.rate * k_df * bs.cdf(d2),
            vega,
            rho: c.maturity * k_df * bs.cdf(d2),
        },
        OptionType::Put => Greeks {
            delta: bs.cdf(d1) - 1.0,
            gamma,
            theta: decay + c.rate * k_df * bs.cdf(-d2),
            vega,
            rho: -c.maturity * k_df * bs.cdf(-d2),
        },
    }
}
