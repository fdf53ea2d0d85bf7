use crate::error::{PkgScoreError, Result};
use crate::types::record::{metric, MetricTable};
use std::fmt::Write;

/// One NDJSON line: `URL` first, then each metric followed by its latency,
/// every number with exactly three decimals.
pub fn report_line(url: &str, metrics: &MetricTable) -> Result<String> {
    let mut line = format!("{{\"URL\":{}", serde_json::to_string(url)?);
    for name in metric::ALL {
        let latency_key = metric::latency_key(name);
        for key in [name, latency_key.as_str()] {
            let value = metrics.get(key).ok_or_else(|| PkgScoreError::Incomplete {
                url: url.to_string(),
                column: "metrics",
            })?;
            // Writing into a String cannot fail.
            let _ = write!(line, ",\"{key}\":{value:.3}");
        }
    }
    line.push('}');
    Ok(line)
}
