pub mod black_scholes;
pub mod monte_carlo;
pub mod processes;

use crate::errors::{EngineError, EngineResult};
use std::str::FromStr;

/// All pricing engines implement this trait.
/// Send + Sync required so engines can be shared with blocking workers.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Present value of the contract. Deterministic for deterministic engines;
    /// Monte Carlo engines are deterministic only when seeded.
    fn price(&self, contract: &OptionContract) -> EngineResult<f64>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum OptionType {
    #[default]
    Call,
    Put,
}

impl OptionType {
    #[inline]
    pub fn payoff(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

impl FromStr for OptionType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            other => Err(EngineError::InvalidInput(format!("unknown option type: {other}"))),
        }
    }
}

impl TryFrom<String> for OptionType {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// European/American vanilla contract plus the market inputs every engine needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionContract {
    pub spot: f64,
    pub strike: f64,
    /// Years to expiry
    pub maturity: f64,
    pub rate: f64,
    pub volatility: f64,
    pub option_type: OptionType,
}

impl OptionContract {
    pub fn validate(&self) -> EngineResult<()> {
        let positive = [
            ("spot", self.spot),
            ("strike", self.strike),
            ("maturity", self.maturity),
            ("volatility", self.volatility),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::InvalidInput(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if !self.rate.is_finite() {
            return Err(EngineError::InvalidInput(format!("rate must be finite, got {}", self.rate)));
        }
        Ok(())
    }

    #[inline]
    pub fn discount(&self) -> f64 {
        (-self.rate * self.maturity).exp()
    }
}
