//! Trigger activity: a cluster of primitives.

use crate::primitive::{Channel, DetId, Primitive, Timestamp};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Version stamp carried by activities and candidates.
pub type Version = u16;

/// Subdetector an activity was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActivityType {
    /// Not set.
    #[default]
    Unknown,
    /// Time projection chamber wires.
    Tpc,
    /// Photon detection system.
    Pds,
}

/// Algorithm that produced an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActivityAlgorithm {
    /// Not set.
    #[default]
    Unknown,
    /// One activity per prescaled primitive.
    Prescale,
    /// Sliding window with an ADC-sum threshold only.
    AdcSimpleWindow,
    /// Geometry based: long tracks across adjacent wires.
    HorizontalMuon,
    /// Shape based: track with a charge deposit concentrated at one end.
    MichelElectron,
}

impl ActivityAlgorithm {
    /// Short lowercase name, used in output files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Prescale => "prescale",
            Self::AdcSimpleWindow => "adc_simple_window",
            Self::HorizontalMuon => "horizontal_muon",
            Self::MichelElectron => "michel_electron",
        }
    }
}

/// A cluster of primitives recognised as one coherent piece of activity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Activity {
    /// Start time of the earliest contributing primitive.
    pub time_start: Timestamp,
    /// End of the activity.
    pub time_end: Timestamp,
    /// Peak time of the dominant primitive.
    pub time_peak: Timestamp,
    /// Representative activity time.
    pub time_activity: Timestamp,
    /// Channel of the first contributing primitive.
    pub channel_start: Channel,
    /// Channel of the last contributing primitive.
    pub channel_end: Channel,
    /// Channel of the dominant primitive.
    pub channel_peak: Channel,
    /// Summed ADC integral of all contributing primitives.
    pub adc_integral: u64,
    /// ADC peak of the dominant primitive.
    pub adc_peak: u32,
    /// Detector element.
    pub detid: DetId,
    /// Subdetector type.
    pub kind: ActivityType,
    /// Producing algorithm.
    pub algorithm: ActivityAlgorithm,
    /// Format version.
    pub version: Version,
    /// Contributing primitives, ordered by start time.
    pub inputs: Vec<Primitive>,
}

impl Activity {
    /// Builds a single-primitive activity.
    #[must_use]
    pub fn from_primitive(tp: &Primitive, algorithm: ActivityAlgorithm) -> Self {
        Self {
            time_start: tp.time_start,
            time_end: tp.time_end(),
            time_peak: tp.time_peak,
            time_activity: 0,
            channel_start: tp.channel,
            channel_end: tp.channel,
            channel_peak: tp.channel,
            adc_integral: u64::from(tp.adc_integral),
            adc_peak: tp.adc_peak,
            detid: tp.detid,
            kind: ActivityType::Tpc,
            algorithm,
            version: 0,
            inputs: vec![*tp],
        }
    }

    /// Number of contributing primitives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Returns true if no primitives contributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Iterates over the channels of all contributing primitives.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.inputs.iter().map(|tp| tp.channel)
    }
}
