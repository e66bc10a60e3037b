//! Empirical ten-point reference distributions for NDT samples.
//!
//! Throughput is in Mbit/s and round-trip time in milliseconds.

/// Ascending ten-point reference sequence for one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceDistribution {
    points: [f64; 10],
}

impl ReferenceDistribution {
    /// Wrap ten reference points. Callers supply them in ascending order.
    pub const fn new(points: [f64; 10]) -> Self {
        Self { points }
    }

    /// Number of reference points strictly below `sample` (0..=10).
    pub fn rank(&self, sample: f64) -> usize {
        self.points.iter().filter(|point| **point < sample).count()
    }

    /// Whether `sample` meets or exceeds every reference point.
    pub fn is_saturated_by(&self, sample: f64) -> bool {
        self.points.iter().all(|point| *point <= sample)
    }

    /// The reference points in ascending order.
    pub const fn points(&self) -> &[f64; 10] {
        &self.points
    }

    fn is_ascending(&self) -> bool {
        self.points.windows(2).all(|pair| matches!(pair, [a, b] if a <= b))
    }
}

const DOWNLOAD_MBPS: ReferenceDistribution = ReferenceDistribution::new([
    1.0, 2.5, 5.0, 10.0, 15.0, 25.0, 40.0, 60.0, 100.0, 200.0,
]);

const UPLOAD_MBPS: ReferenceDistribution = ReferenceDistribution::new([
    0.25, 0.5, 1.0, 2.0, 4.0, 7.5, 10.0, 20.0, 40.0, 80.0,
]);

const ROUND_TRIP_MS: ReferenceDistribution = ReferenceDistribution::new([
    5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0, 80.0, 120.0, 200.0,
]);

/// Reference distributions for every scored metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceTables {
    pub download: ReferenceDistribution,
    pub upload: ReferenceDistribution,
    pub round_trip: ReferenceDistribution,
}

impl ReferenceTables {
    /// The built-in population tables.
    pub const fn standard() -> Self {
        Self {
            download: DOWNLOAD_MBPS,
            upload: UPLOAD_MBPS,
            round_trip: ROUND_TRIP_MS,
        }
    }

    /// Whether every distribution is in ascending order.
    pub fn is_well_formed(&self) -> bool {
        self.download.is_ascending() && self.upload.is_ascending() && self.round_trip.is_ascending()
    }
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self::standard()
    }
}
