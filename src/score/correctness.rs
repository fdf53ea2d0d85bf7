use crate::error::Result;
use crate::types::record::{signal, SignalTable};

pub fn correctness(closed_yr: f64, opened_yr: f64) -> f64 {
    if opened_yr <= 0.0 {
        return 1.0;
    }
    (closed_yr / opened_yr).clamp(0.0, 1.0)
}

pub fn score(signals: &SignalTable) -> Result<f64> {
    Ok(correctness(
        signals.require(signal::ISSUES_CLOSED_YR)?,
        signals.require(signal::ISSUES_OPENED_YR)?,
    ))
}
