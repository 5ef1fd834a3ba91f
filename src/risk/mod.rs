pub mod greeks;
pub mod metrics;
pub mod portfolio;
