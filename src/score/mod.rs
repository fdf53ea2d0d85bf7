//! Sub-metric scoring and the license-gated net score.

pub mod bus_factor;
pub mod correctness;
pub mod license;
pub mod ramp_up;
pub mod responsiveness;

use crate::error::{PkgScoreError, Result};
use crate::store::Store;
use crate::types::record::{metric, MetricTable, SignalTable};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

const BUS_FACTOR_WEIGHT: f64 = 0.1;
const CORRECTNESS_WEIGHT: f64 = 0.3;
const RAMP_UP_WEIGHT: f64 = 0.2;
const RESPONSIVENESS_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub bus_factor: f64,
    pub correctness: f64,
    pub ramp_up: f64,
    pub responsive_maintainer: f64,
    pub license: f64,
}

pub fn net_score(scores: &SubScores) -> f64 {
    let weighted = BUS_FACTOR_WEIGHT * scores.bus_factor
        + CORRECTNESS_WEIGHT * scores.correctness
        + RAMP_UP_WEIGHT * scores.ramp_up
        + RESPONSIVENESS_WEIGHT * scores.responsive_maintainer;
    (weighted * scores.license).clamp(0.0, 1.0)
}

fn timed(metrics: &mut MetricTable, name: &str, f: impl FnOnce() -> Result<f64>) -> Result<f64> {
    let started = Instant::now();
    let value = f()?;
    metrics.record(name, value, started.elapsed().as_secs_f64());
    Ok(value)
}

/// Every metric plus its latency. Fails on the first missing signal.
pub fn score_signals(signals: &SignalTable) -> Result<MetricTable> {
    let mut metrics = MetricTable::new();
    let scores = SubScores {
        bus_factor: timed(&mut metrics, metric::BUS_FACTOR, || bus_factor::score(signals))?,
        correctness: timed(&mut metrics, metric::CORRECTNESS, || correctness::score(signals))?,
        ramp_up: timed(&mut metrics, metric::RAMP_UP, || ramp_up::score(signals))?,
        responsive_maintainer: timed(&mut metrics, metric::RESPONSIVE_MAINTAINER, || {
            responsiveness::score(signals)
        })?,
        license: timed(&mut metrics, metric::LICENSE, || license::score(signals))?,
    };
    timed(&mut metrics, metric::NET_SCORE, || Ok(net_score(&scores)))?;
    Ok(metrics)
}

pub struct Scorer {
    store: Arc<Store>,
}

impl Scorer {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Scores the stored signals of record `id` and writes the metric table
    /// back to the same record.
    pub fn compute(&self, id: i64) -> Result<MetricTable> {
        let record = self.store.read_record(id)?;
        let signals = record.signals.as_ref().ok_or_else(|| PkgScoreError::Incomplete {
            url: record.url.clone(),
            column: "signals",
        })?;
        let metrics = score_signals(signals)?;
        self.store.write_metrics(&record.url, &metrics)?;
        info!(
            id,
            url = %record.url,
            net_score = metrics.score(metric::NET_SCORE),
            "scoring complete"
        );
        Ok(metrics)
    }
}
