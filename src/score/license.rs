use crate::error::Result;
use crate::types::record::{signal, SignalTable};

pub fn score(signals: &SignalTable) -> Result<f64> {
    let found = signals.require(signal::LICENSE)?;
    Ok(if found > 0.0 { 1.0 } else { 0.0 })
}
