use crate::error::Result;
use crate::types::record::{signal, SignalTable};

/// Weight for issues closed within 3, 7, 14 and 31 days.
const WEIGHTS: [(&str, f64); 4] = [
    (signal::ISS3, 1.0),
    (signal::ISS7, 0.7),
    (signal::ISS14, 0.4),
    (signal::ISS31, 0.1),
];

pub fn responsiveness(bucket_counts: [f64; 4], opened_yr: f64) -> f64 {
    if opened_yr <= 0.0 {
        return 1.0;
    }
    let weighted: f64 = bucket_counts
        .iter()
        .zip(WEIGHTS.iter())
        .map(|(count, (_, weight))| count * weight)
        .sum();
    (weighted / opened_yr).clamp(0.0, 1.0)
}

pub fn score(signals: &SignalTable) -> Result<f64> {
    let mut counts = [0.0; 4];
    for (slot, (key, _)) in counts.iter_mut().zip(WEIGHTS.iter()) {
        *slot = signals.require(key)?;
    }
    Ok(responsiveness(
        counts,
        signals.require(signal::ISSUES_OPENED_YR)?,
    ))
}
