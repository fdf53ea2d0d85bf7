use crate::error::{PkgScoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod signal {
    pub const TOP3: &str = "top3";
    pub const COMMITS_YR: &str = "commits/yr";
    pub const DOWNLOADS: &str = "downloads";
    pub const ISSUES_CLOSED_YR: &str = "issuesClosedYr";
    pub const ISSUES_CLOSED_6MTH: &str = "issuesClosed6mth";
    pub const ISSUES_OPENED_YR: &str = "issuesOpenedYr";
    pub const ISS3: &str = "iss3";
    pub const ISS7: &str = "iss7";
    pub const ISS14: &str = "iss14";
    pub const ISS31: &str = "iss31";
    pub const LICENSE: &str = "license";
}

pub mod metric {
    pub const BUS_FACTOR: &str = "BusFactor";
    pub const CORRECTNESS: &str = "Correctness";
    pub const RAMP_UP: &str = "RampUp";
    pub const RESPONSIVE_MAINTAINER: &str = "ResponsiveMaintainer";
    pub const LICENSE: &str = "License";
    pub const NET_SCORE: &str = "NetScore";

    /// Report order; each metric is followed by its latency.
    pub const ALL: [&str; 6] = [
        BUS_FACTOR,
        CORRECTNESS,
        RAMP_UP,
        RESPONSIVE_MAINTAINER,
        LICENSE,
        NET_SCORE,
    ];

    pub fn latency_key(metric: &str) -> String {
        format!("{metric}_Latency")
    }
}

/// Raw per-package signals keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalTable(BTreeMap<String, f64>);

impl SignalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Missing keys are a scoring error, not a zero.
    pub fn require(&self, key: &str) -> Result<f64> {
        self.get(key)
            .ok_or_else(|| PkgScoreError::MissingSignal(key.to_string()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl<const N: usize> From<[(&str, f64); N]> for SignalTable {
    fn from(entries: [(&str, f64); N]) -> Self {
        let mut table = Self::new();
        for (key, value) in entries {
            table.set(key, value);
        }
        table
    }
}

/// Normalized scores plus per-metric latencies in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricTable(BTreeMap<String, f64>);

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metric: &str, score: f64, latency_secs: f64) {
        self.0.insert(metric.to_string(), score);
        self.0.insert(metric::latency_key(metric), latency_secs);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn score(&self, metric: &str) -> f64 {
        self.get(metric).unwrap_or_default()
    }

    #[cfg(test)]
    pub fn latency(&self, metric: &str) -> f64 {
        self.get(&metric::latency_key(metric)).unwrap_or_default()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// One row of the `package_scores` table.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRecord {
    pub id: i64,
    pub url: String,
    pub signals: Option<SignalTable>,
    pub metrics: Option<MetricTable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoords {
    pub owner: String,
    pub repo: String,
}

impl RepoCoords {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Display for RepoCoords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
