//! Trigger primitive: a single hit on one detector channel.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Time in detector clock ticks.
pub type Timestamp = i64;

/// Offline channel identifier.
pub type Channel = u32;

/// Detector element identifier.
pub type DetId = u16;

/// A hit primitive as delivered by the upstream hit finder.
///
/// Primitives are immutable once produced and are expected in non-decreasing
/// `time_start` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Primitive {
    /// Offline channel the hit was found on.
    pub channel: Channel,
    /// Start of the above-threshold interval.
    pub time_start: Timestamp,
    /// Time of the ADC maximum.
    pub time_peak: Timestamp,
    /// Width of the above-threshold interval (ticks).
    pub time_over_threshold: Timestamp,
    /// Integrated ADC over the interval.
    pub adc_integral: u32,
    /// Maximum ADC sample in the interval.
    pub adc_peak: u32,
    /// Detector element that produced the hit.
    pub detid: DetId,
    /// Producer-specific type tag.
    pub kind: u32,
}

impl Primitive {
    /// Creates a primitive with the fields the makers care about most.
    ///
    /// The peak time defaults to the start time and all other fields to zero.
    #[must_use]
    pub fn new(channel: Channel, time_start: Timestamp, adc_integral: u32) -> Self {
        Self {
            channel,
            time_start,
            time_peak: time_start,
            adc_integral,
            ..Self::default()
        }
    }

    /// Sets the time over threshold.
    #[must_use]
    pub fn with_time_over_threshold(mut self, tot: Timestamp) -> Self {
        self.time_over_threshold = tot;
        self
    }

    /// Sets the peak time.
    #[must_use]
    pub fn with_time_peak(mut self, time_peak: Timestamp) -> Self {
        self.time_peak = time_peak;
        self
    }

    /// Sets the ADC peak.
    #[must_use]
    pub fn with_adc_peak(mut self, adc_peak: u32) -> Self {
        self.adc_peak = adc_peak;
        self
    }

    /// Sets the detector id.
    #[must_use]
    pub fn with_detid(mut self, detid: DetId) -> Self {
        self.detid = detid;
        self
    }

    /// End of the above-threshold interval.
    #[inline]
    #[must_use]
    pub fn time_end(&self) -> Timestamp {
        self.time_start + self.time_over_threshold
    }
}
