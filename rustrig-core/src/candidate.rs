//! Trigger candidate: a cluster of activities handed to the decision layer.

use crate::activity::{Activity, Version};
use crate::primitive::{DetId, Timestamp};
use std::collections::BTreeSet;

/// Detector id of candidates that read out every region.
pub const WHOLE_DETECTOR: DetId = DetId::MAX;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physics hypothesis attached to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CandidateType {
    /// Not set.
    #[default]
    Unknown,
    /// Prescaled pass-through.
    Prescale,
    /// Fixed-size bundle of activities.
    Bundle,
    /// Track-like activity across many wires.
    HorizontalMuon,
    /// Burst of busy activities across the detector.
    Supernova,
}

/// Algorithm that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CandidateAlgorithm {
    /// Not set.
    #[default]
    Unknown,
    /// One candidate per prescaled activity.
    Prescale,
    /// Fixed-size bundles.
    Bundle,
    /// Windowed ADC / multiplicity thresholds.
    HorizontalMuon,
    /// Count of busy activities in a trailing time window.
    Supernova,
}

impl CandidateAlgorithm {
    /// Short lowercase name, used in output files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Prescale => "prescale",
            Self::Bundle => "bundle",
            Self::HorizontalMuon => "horizontal_muon",
            Self::Supernova => "supernova",
        }
    }
}

/// A trigger candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Candidate {
    /// Start of the requested readout.
    pub time_start: Timestamp,
    /// End of the requested readout.
    pub time_end: Timestamp,
    /// Representative candidate time.
    pub time_candidate: Timestamp,
    /// Detector element of the latest activity.
    pub detid: DetId,
    /// Physics hypothesis.
    pub kind: CandidateType,
    /// Producing algorithm.
    pub algorithm: CandidateAlgorithm,
    /// Format version.
    pub version: Version,
    /// Contributing activities, ordered by start time.
    pub inputs: Vec<Activity>,
    /// Detector regions touched by the contributing activities.
    pub regions: BTreeSet<DetId>,
}

impl Candidate {
    /// Builds a candidate around a list of activities.
    ///
    /// Regions are collected from the activities' detector ids. Time fields are
    /// left to the caller.
    #[must_use]
    pub fn from_activities(
        inputs: Vec<Activity>,
        kind: CandidateType,
        algorithm: CandidateAlgorithm,
    ) -> Self {
        let regions = inputs.iter().map(|ta| ta.detid).collect();
        let detid = inputs.last().map_or(0, |ta| ta.detid);
        Self {
            detid,
            kind,
            algorithm,
            inputs,
            regions,
            ..Self::default()
        }
    }

    /// Number of contributing activities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Returns true if the candidate has no activities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
