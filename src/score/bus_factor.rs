use crate::error::Result;
use crate::types::record::{signal, SignalTable};

/// Share of the year's commits not made by the top three contributors.
pub fn bus_factor(top3: f64, commits_yr: f64) -> f64 {
    if commits_yr <= 0.0 {
        return 0.0;
    }
    (1.0 - top3 / commits_yr).clamp(0.0, 1.0)
}

pub fn score(signals: &SignalTable) -> Result<f64> {
    Ok(bus_factor(
        signals.require(signal::TOP3)?,
        signals.require(signal::COMMITS_YR)?,
    ))
}
