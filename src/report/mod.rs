pub mod json;

use crate::error::{PkgScoreError, Result};
use crate::types::record::PackageRecord;

/// Report line for a record whose metrics have been written.
pub fn render_record(record: &PackageRecord) -> Result<String> {
    let metrics = record
        .metrics
        .as_ref()
        .ok_or_else(|| PkgScoreError::Incomplete {
            url: record.url.clone(),
            column: "metrics",
        })?;
    json::report_line(&record.url, metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscored_record_cannot_be_reported() {
        let record = PackageRecord {
            id: 1,
            url: "https://github.com/o/r".to_string(),
            signals: None,
            metrics: None,
        };
        assert!(matches!(
            render_record(&record),
            Err(PkgScoreError::Incomplete { column: "metrics", .. })
        ));
    }
}
