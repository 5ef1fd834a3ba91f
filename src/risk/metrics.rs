//! Tail and performance statistics over return series.
//! All functions are pure; empty inputs produce 0.0 instead of NaN.

/// Percentile with linear interpolation between closest ranks, `pct` in [0, 100].
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Historical VaR as a positive loss: -percentile(returns, 100 * (1 - confidence)).
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    -percentile(returns, 100.0 * (1.0 - confidence))
}

/// Expected shortfall: mean loss of the returns at or beyond the VaR cutoff.
pub fn conditional_var(returns: &[f64], confidence: f64) -> f64 {
    let var = value_at_risk(returns, confidence);
    let (sum, count) = returns
        .iter()
        .filter(|&&r| r <= -var)
        .fold((0.0, 0usize), |(s, n), &r| (s + r, n + 1));
    if count == 0 {
        return var;
    }
    -(sum / count as f64)
}

#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Per-period Sharpe ratio of excess returns (not annualized).
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate).collect();
    let std = std_dev(&excess);
    if std < 1e-12 {
        return 0.0;
    }
    mean(&excess) / std
}

/// Worst peak-to-trough decline as a non-positive fraction of the running peak.
pub fn maximum_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;
    for &v in equity_curve {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            worst = worst.min((v - peak) / peak);
        }
    }
    worst
}

/// Simple step returns of one price path.
pub fn simple_returns(path: &[f64]) -> impl Iterator<Item = f64> + '_ {
    path.windows(2).map(|w| (w[1] - w[0]) / w[0])
}
