//! Charge-profile test for a stopping track.
//!
//! The longest adjacent track in a window is extracted with the
//! [`AdjacencyScanner`], its ADC profile is smoothed with circular running
//! means, and contiguous runs above the profile's mean are summed into charge
//! clusters. A stopping particle deposits most of its charge at one end of the
//! track, so the check passes when the biggest cluster is the first or the last.

#![allow(clippy::cast_precision_loss)]

use crate::adjacency::{AdjacencyScanner, Link};
use rustrig_core::{Channel, Primitive, Timestamp, ToleranceRule, TrackHitRecord, TrackRecord};

/// Running-mean widths computed for every track.
pub const REFERENCE_WIDTHS: [usize; 5] = [4, 6, 8, 10, 15];

/// Width whose running mean drives the decision.
pub const DECISION_WIDTH: usize = 8;

/// Two hits on one channel closer than this belong to the same track.
pub const SAME_CHANNEL_WINDOW: u64 = 200;

/// One hit of an extracted track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackHit {
    /// Channel.
    pub channel: Channel,
    /// Start time.
    pub time_start: Timestamp,
    /// ADC integral.
    pub adc: u32,
}

impl From<&Primitive> for TrackHit {
    fn from(tp: &Primitive) -> Self {
        Self {
            channel: tp.channel,
            time_start: tp.time_start,
            adc: tp.adc_integral,
        }
    }
}

/// Outcome of a charge-profile check.
#[derive(Debug, Clone, PartialEq)]
pub struct BraggPeak {
    /// Whether the biggest charge cluster sits at a track end.
    pub detected: bool,
    /// Adjacency of the longest track.
    pub adjacency: u16,
    /// Hits of the longest track, in channel order.
    pub track: Vec<TrackHit>,
    /// Running means, one series per width.
    pub running_means: Vec<Vec<f64>>,
    /// Mean of the decision series.
    pub baseline: f64,
    /// Summed charge of each run above the baseline.
    pub charge_clusters: Vec<f64>,
    /// Index of the biggest cluster.
    pub peak_cluster: Option<usize>,
}

impl BraggPeak {
    /// Converts the track into a debug record.
    #[must_use]
    pub fn to_record(&self, maker: &'static str, widths: &[usize]) -> TrackRecord {
        let hits = self
            .track
            .iter()
            .enumerate()
            .map(|(i, hit)| TrackHitRecord {
                channel: hit.channel,
                time_start: hit.time_start,
                adc: hit.adc,
                running_means: self
                    .running_means
                    .iter()
                    .filter_map(|series| series.get(i).copied())
                    .collect(),
            })
            .collect();
        TrackRecord {
            maker,
            start_channel: self.track.first().map_or(0, |h| h.channel),
            end_channel: self.track.last().map_or(0, |h| h.channel),
            start_time: self.track.first().map_or(0, |h| h.time_start),
            end_time: self.track.last().map_or(0, |h| h.time_start),
            widths: widths.to_vec(),
            hits,
        }
    }
}

/// Finds the longest track in a set of primitives and checks its charge profile.
#[derive(Debug, Clone)]
pub struct BraggPeakDetector {
    scanner: AdjacencyScanner,
    widths: Vec<usize>,
    decision: usize,
    same_channel_window: u64,
}

impl Default for BraggPeakDetector {
    fn default() -> Self {
        Self::new(AdjacencyScanner::new(3, ToleranceRule::MissingWires))
    }
}

impl BraggPeakDetector {
    /// Creates a detector with the reference widths.
    #[must_use]
    pub fn new(scanner: AdjacencyScanner) -> Self {
        Self {
            scanner,
            widths: REFERENCE_WIDTHS.to_vec(),
            decision: REFERENCE_WIDTHS
                .iter()
                .position(|&w| w == DECISION_WIDTH)
                .unwrap_or(0),
            same_channel_window: SAME_CHANNEL_WINDOW,
        }
    }

    /// Replaces the running-mean widths. `decision` is added if missing.
    #[must_use]
    pub fn with_widths(mut self, widths: &[usize], decision: usize) -> Self {
        self.widths = widths.iter().copied().filter(|&w| w > 0).collect();
        if !self.widths.contains(&decision) {
            self.widths.push(decision);
        }
        self.decision = self
            .widths
            .iter()
            .position(|&w| w == decision)
            .unwrap_or(0);
        self
    }

    /// Sets the same-channel merge window.
    #[must_use]
    pub fn with_same_channel_window(mut self, ticks: u64) -> Self {
        self.same_channel_window = ticks;
        self
    }

    /// Running-mean widths, in record order.
    #[must_use]
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// The adjacency scanner used for track extraction.
    #[must_use]
    pub fn scanner(&self) -> &AdjacencyScanner {
        &self.scanner
    }

    /// Runs the full check on `primitives`.
    #[must_use]
    pub fn detect(&self, primitives: &[Primitive]) -> BraggPeak {
        let (track, adjacency) = self.longest_track(primitives);
        let adcs: Vec<u32> = track.iter().map(|h| h.adc).collect();
        let running_means: Vec<Vec<f64>> = self
            .widths
            .iter()
            .map(|&w| running_mean(&adcs, w))
            .collect();

        let (baseline, charge_clusters) = running_means
            .get(self.decision)
            .map_or((0.0, Vec::new()), |series| charge_clusters(series));
        let peak_cluster = peak_cluster(&charge_clusters);
        let detected = peak_at_end(&charge_clusters);

        BraggPeak {
            detected,
            adjacency,
            track,
            running_means,
            baseline,
            charge_clusters,
            peak_cluster,
        }
    }

    /// Extracts the hits of the longest adjacent run and its length.
    ///
    /// Hits are stably sorted by channel. A hit repeating the previous channel
    /// joins the track only if it starts within the same-channel window.
    #[must_use]
    pub fn longest_track(&self, primitives: &[Primitive]) -> (Vec<TrackHit>, u16) {
        let mut hits: Vec<TrackHit> = primitives.iter().map(TrackHit::from).collect();
        hits.sort_by_key(|h| h.channel);
        let channels: Vec<Channel> = hits.iter().map(|h| h.channel).collect();

        let mut current: Vec<TrackHit> = Vec::new();
        let mut longest: Vec<TrackHit> = Vec::new();
        let adjacency = self.scanner.walk(&channels, |i, next, link| {
            if current.is_empty() {
                current.push(hits[i]);
            }
            match link {
                Link::Repeat => {
                    if hits[next].time_start.abs_diff(hits[i].time_start) < self.same_channel_window {
                        current.push(hits[next]);
                    }
                }
                Link::Adjacent | Link::Bridged { .. } => current.push(hits[next]),
                Link::Break { longest: true, .. } => longest = std::mem::take(&mut current),
                Link::Break { .. } => current.clear(),
            }
        });

        (longest, adjacency)
    }
}

/// Circular running mean: element `i` is the sum of `width` values starting at
/// `i`, wrapping around, divided by `width`.
#[must_use]
pub fn running_mean(values: &[u32], width: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || width == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let sum: f64 = (i..i + width).map(|j| f64::from(values[j % n])).sum();
            sum / width as f64
        })
        .collect()
}

/// Splits `series` into runs above its mean and sums each run.
///
/// Returns the mean and the run sums. A run is counted only once the series
/// drops back to or below the mean, so a run still open at the end is left out.
#[must_use]
pub fn charge_clusters(series: &[f64]) -> (f64, Vec<f64>) {
    if series.is_empty() {
        return (0.0, Vec::new());
    }
    let baseline = series.iter().sum::<f64>() / series.len() as f64;

    let mut clusters = Vec::new();
    let mut charge = 0.0;
    let mut open = false;
    for &value in series {
        if value > baseline {
            charge += value;
            open = true;
        } else if open {
            clusters.push(charge);
            charge = 0.0;
            open = false;
        }
    }
    (baseline, clusters)
}

fn peak_cluster(clusters: &[f64]) -> Option<usize> {
    let max = clusters.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    clusters.iter().position(|c| c.total_cmp(&max).is_eq())
}

fn peak_at_end(clusters: &[f64]) -> bool {
    let max = clusters.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let is_max = |c: &f64| c.total_cmp(&max).is_eq();
    clusters.first().is_some_and(is_max) || clusters.last().is_some_and(is_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rising_track() -> Vec<Primitive> {
        (0..20_u32)
            .map(|i| Primitive::new(100 + i, 1000 + i64::from(i), 10 * (i + 1)))
            .collect()
    }

    #[test]
    fn test_running_mean_wraps() {
        let means = running_mean(&[1, 2, 3, 4], 2);
        assert_eq!(means.len(), 4);
        assert_relative_eq!(means[0], 1.5);
        assert_relative_eq!(means[3], 2.5);
        assert!(running_mean(&[], 4).is_empty());
    }

    #[test]
    fn test_clusters_with_middle_peak() {
        let (baseline, clusters) = charge_clusters(&[1.0, 5.0, 1.0, 9.0, 1.0, 5.0, 1.0]);
        assert_relative_eq!(baseline, 23.0 / 7.0);
        assert_eq!(clusters, vec![5.0, 9.0, 5.0]);
        assert_eq!(peak_cluster(&clusters), Some(1));
        assert!(!peak_at_end(&clusters));
    }

    #[test]
    fn test_open_trailing_run_is_not_counted() {
        let (_, clusters) = charge_clusters(&[1.0, 5.0, 1.0, 9.0, 1.0, 5.0]);
        assert_eq!(clusters, vec![5.0, 9.0]);
        assert_eq!(peak_cluster(&clusters), Some(1));
        assert!(peak_at_end(&clusters));

        let (_, clusters) = charge_clusters(&[1.0, 1.0, 2.0, 8.0]);
        assert!(clusters.is_empty());
        assert!(!peak_at_end(&clusters));
    }

    #[test]
    fn test_detect_ignores_open_trailing_run() {
        let primitives: Vec<_> = [10, 50, 10, 90, 10, 50]
            .into_iter()
            .zip(100..)
            .map(|(adc, channel)| Primitive::new(channel, 1000, adc))
            .collect();
        let peak = BraggPeakDetector::default()
            .with_widths(&[1], 1)
            .detect(&primitives);

        assert_eq!(peak.adjacency, 6);
        assert_eq!(peak.charge_clusters, vec![50.0, 90.0]);
        assert_eq!(peak.peak_cluster, Some(1));
        assert!(peak.detected);
    }

    #[test]
    fn test_flat_profile_has_no_clusters() {
        let (baseline, clusters) = charge_clusters(&[3.0; 6]);
        assert_relative_eq!(baseline, 3.0);
        assert!(clusters.is_empty());
        assert_eq!(peak_cluster(&clusters), None);
    }

    #[test]
    fn test_rising_track_is_detected() {
        let peak = BraggPeakDetector::default().detect(&rising_track());

        assert_eq!(peak.adjacency, 20);
        assert_eq!(peak.track.len(), 20);
        assert_eq!(peak.running_means.len(), REFERENCE_WIDTHS.len());

        let decision = &peak.running_means[2];
        assert_relative_eq!(decision[0], 45.0);
        assert_relative_eq!(decision[12], 165.0);
        assert_relative_eq!(decision[13], 150.0);
        assert_relative_eq!(decision[19], 60.0);
        assert_relative_eq!(peak.baseline, 105.0);

        assert_eq!(peak.charge_clusters.len(), 1);
        assert_relative_eq!(peak.charge_clusters[0], 1245.0);
        assert_eq!(peak.peak_cluster, Some(0));
        assert!(peak.detected);
    }

    #[test]
    fn test_empty_and_single_channel_inputs() {
        let detector = BraggPeakDetector::default();

        let empty = detector.detect(&[]);
        assert!(!empty.detected);
        assert_eq!(empty.adjacency, 0);
        assert!(empty.track.is_empty());

        let same: Vec<_> = (0..5).map(|t| Primitive::new(7, t, 50)).collect();
        let single = detector.detect(&same);
        assert!(!single.detected);
        assert_eq!(single.adjacency, 0);
    }

    #[test]
    fn test_same_channel_hits_merge_within_window() {
        let primitives = [
            Primitive::new(5, 0, 10),
            Primitive::new(5, 100, 10),
            Primitive::new(5, 500, 10),
            Primitive::new(6, 0, 10),
        ];
        let (track, adjacency) = BraggPeakDetector::default().longest_track(&primitives);

        assert_eq!(adjacency, 2);
        let times: Vec<_> = track.iter().map(|h| (h.channel, h.time_start)).collect();
        assert_eq!(times, vec![(5, 0), (5, 100), (6, 0)]);
    }

    #[test]
    fn test_record_carries_profile() {
        let detector = BraggPeakDetector::default();
        let peak = detector.detect(&rising_track());
        let record = peak.to_record("michel_electron", detector.widths());

        assert_eq!(record.start_channel, 100);
        assert_eq!(record.end_channel, 119);
        assert_eq!(record.hits.len(), 20);
        assert_eq!(record.hits[0].running_means.len(), 5);
        assert_eq!(record.widths, REFERENCE_WIDTHS.to_vec());
    }
}
