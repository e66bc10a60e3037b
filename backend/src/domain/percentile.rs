//! Decile scoring of NDT samples against the reference tables.
//!
//! A bucket is `10 × (rank + 1)` where `rank` counts the reference points
//! strictly below the sample, clamped to 100.
//!
//! Historically the upload sample alone decided whether *every* metric
//! saturated to 100: an upload sample at or above all ten upload points forced the
//! download and round-trip buckets to 100 as well. That coupling is kept as
//! [`SaturationGate::Upload`] so stored scores stay comparable;
//! [`SaturationGate::PerMetric`] scores each metric on its own rank.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::reference_tables::{ReferenceDistribution, ReferenceTables};

/// Decile bucket in `{10, 20, …, 100}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecileBucket(u8);

impl DecileBucket {
    /// Highest bucket.
    pub const TOP: Self = Self(100);

    fn from_rank(rank: usize) -> Self {
        match u8::try_from(rank) {
            Ok(value @ 0..=9) => Self((value + 1) * 10),
            _ => Self::TOP,
        }
    }

    /// Bucket value.
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for DecileBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metric a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Download,
    Upload,
    RoundTrip,
}

/// Which rank decides that a metric saturates to the top bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationGate {
    /// An upload sample at or above every upload point saturates all three metrics.
    #[default]
    Upload,
    /// Each metric saturates only on its own rank.
    PerMetric,
}

/// Error returned when a saturation gate name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown saturation gate {value:?}; expected `upload` or `per_metric`")]
pub struct ParseSaturationGateError {
    value: String,
}

impl FromStr for SaturationGate {
    type Err = ParseSaturationGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upload" => Ok(Self::Upload),
            "per_metric" | "per-metric" => Ok(Self::PerMetric),
            _ => Err(ParseSaturationGateError {
                value: s.to_owned(),
            }),
        }
    }
}

/// Buckets for one NDT measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileScores {
    pub p_download: DecileBucket,
    pub p_upload: DecileBucket,
    /// Absent when the measurement carried no round-trip sample.
    pub p_rtt: Option<DecileBucket>,
}

/// Scores samples against immutable reference tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileScorer {
    tables: ReferenceTables,
    gate: SaturationGate,
}

impl PercentileScorer {
    /// Create a scorer over `tables` using `gate` for saturation.
    pub const fn new(tables: ReferenceTables, gate: SaturationGate) -> Self {
        Self { tables, gate }
    }

    /// Saturation gate in effect.
    pub const fn gate(&self) -> SaturationGate {
        self.gate
    }

    fn distribution(&self, metric: Metric) -> &ReferenceDistribution {
        match metric {
            Metric::Download => &self.tables.download,
            Metric::Upload => &self.tables.upload,
            Metric::RoundTrip => &self.tables.round_trip,
        }
    }

    /// Score a single sample on its own rank.
    pub fn score(&self, sample: f64, metric: Metric) -> DecileBucket {
        DecileBucket::from_rank(self.distribution(metric).rank(sample))
    }

    /// Score a full measurement, applying the configured saturation gate.
    ///
    /// # Examples
    /// ```
    /// use wifi_advisor::domain::{PercentileScorer, ReferenceTables, SaturationGate};
    ///
    /// let scorer = PercentileScorer::new(ReferenceTables::standard(), SaturationGate::Upload);
    /// let scores = scorer.score_sample(1.0, 500.0, Some(12.0));
    /// assert_eq!(scores.p_download.value(), 100);
    /// ```
    pub fn score_sample(&self, download: f64, upload: f64, rtt: Option<f64>) -> PercentileScores {
        let upload_saturated = self.tables.upload.is_saturated_by(upload);
        let bucket = |sample: f64, metric: Metric| match self.gate {
            SaturationGate::Upload if upload_saturated => DecileBucket::TOP,
            SaturationGate::Upload | SaturationGate::PerMetric => self.score(sample, metric),
        };

        PercentileScores {
            p_download: bucket(download, Metric::Download),
            p_upload: self.score(upload, Metric::Upload),
            p_rtt: rtt.map(|sample| bucket(sample, Metric::RoundTrip)),
        }
    }
}

impl Default for PercentileScorer {
    fn default() -> Self {
        Self::new(ReferenceTables::standard(), SaturationGate::default())
    }
}
