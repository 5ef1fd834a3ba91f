use crate::risk::greeks::Greeks;
use crate::risk::metrics;
use crate::simulation::sampler::SampleSet;

/// Summary shown next to the visualization. Produced here, passed through
/// untouched by the geometry pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AnalyticsSummary {
    pub option_price: f64,
    pub greeks: Greeks,
    pub risk_metrics: RiskSnapshot,
    pub statistics: RunStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RiskSnapshot {
    pub var_95: f64,
    pub cvar_95: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RunStatistics {
    pub mean_final_price: f64,
    pub std_final_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub execution_time_seconds: f64,
}

/// Step-return tail risk of the sampled paths plus drawdown of their mean path.
pub fn risk_snapshot(set: &SampleSet) -> RiskSnapshot {
    let prices: Vec<Vec<f64>> = set
        .paths()
        .map(|path| path.iter().map(|s| s.price).collect())
        .collect();
    let returns: Vec<f64> = prices.iter().flat_map(|p| metrics::simple_returns(p)).collect();

    let mean_path: Vec<f64> = (0..set.steps_per_path)
        .map(|t| metrics::mean(&prices.iter().map(|p| p[t]).collect::<Vec<_>>()))
        .collect();

    RiskSnapshot {
        var_95: metrics::value_at_risk(&returns, 0.95),
        cvar_95: metrics::conditional_var(&returns, 0.95),
        max_drawdown: metrics::maximum_drawdown(&mean_path),
    }
}

pub fn run_statistics(set: &SampleSet, execution_time_seconds: f64) -> RunStatistics {
    let finals: Vec<f64> = set.paths().filter_map(|path| path.last().map(|s| s.price)).collect();
    let (min_price, max_price) = set
        .samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(s.price), hi.max(s.price)));

    RunStatistics {
        mean_final_price: metrics::mean(&finals),
        std_final_price: metrics::std_dev(&finals),
        min_price: if set.samples.is_empty() { 0.0 } else { min_price },
        max_price: if set.samples.is_empty() { 0.0 } else { max_price },
        execution_time_seconds,
    }
}
