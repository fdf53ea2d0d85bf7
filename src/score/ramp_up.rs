use crate::error::Result;
use crate::types::record::{signal, SignalTable};

/// Lower download bounds of each step, highest first.
const STEPS: [(f64, f64); 4] = [
    (1_200_000.0, 1.0),
    (500_000.0, 0.9),
    (50_000.0, 0.6),
    (1_000.0, 0.3),
];

pub fn ramp_up(downloads: f64) -> f64 {
    STEPS
        .iter()
        .find(|(floor, _)| downloads >= *floor)
        .map(|(_, score)| *score)
        .unwrap_or(0.0)
}

pub fn score(signals: &SignalTable) -> Result<f64> {
    Ok(ramp_up(signals.require(signal::DOWNLOADS)?))
}
