//! Structured debug events emitted by makers.
//!
//! Makers never write files themselves. When a sink is injected they describe
//! what they saw as [`MakerEvent`]s and the sink decides where those go.

use crate::primitive::{Channel, Primitive, Timestamp};
use std::sync::{Arc, Mutex, PoisonError};

/// Summary of a window at the moment it produced an output.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRecord {
    /// Maker that owned the window.
    pub maker: &'static str,
    /// Window start time.
    pub time_start: Timestamp,
    /// Start time of the latest element.
    pub time_end: Timestamp,
    /// Summed ADC.
    pub adc_integral: u64,
    /// Distinct channels hit.
    pub n_channels_hit: usize,
    /// Resident elements.
    pub n_inputs: usize,
    /// Channel of the first element.
    pub first_channel: Channel,
    /// Channel of the latest element.
    pub last_channel: Channel,
    /// Longest adjacent run, when the maker computes one.
    pub adjacency: Option<u16>,
    /// Summed time over threshold of the resident primitives.
    pub tot_sum: Timestamp,
}

impl WindowRecord {
    /// Window span from the first to the latest element.
    #[must_use]
    pub fn length(&self) -> Timestamp {
        self.time_end - self.time_start
    }
}

/// One hit of a track examined by the charge-shape detector.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackHitRecord {
    /// Channel.
    pub channel: Channel,
    /// Start time.
    pub time_start: Timestamp,
    /// ADC integral.
    pub adc: u32,
    /// Running means at this hit, one per convolution width.
    pub running_means: Vec<f64>,
}

/// The longest track of a window and its charge profile.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    /// Maker that examined the track.
    pub maker: &'static str,
    /// First channel of the track.
    pub start_channel: Channel,
    /// Last channel of the track.
    pub end_channel: Channel,
    /// Start time of the first hit.
    pub start_time: Timestamp,
    /// Start time of the last hit.
    pub end_time: Timestamp,
    /// Convolution widths, in the order of `running_means`.
    pub widths: Vec<usize>,
    /// Track hits in channel order.
    pub hits: Vec<TrackHitRecord>,
}

/// A debug event.
#[derive(Debug, Clone, PartialEq)]
pub enum MakerEvent {
    /// A primitive was received.
    Primitive {
        /// Receiving maker.
        maker: &'static str,
        /// The primitive.
        primitive: Primitive,
    },
    /// A window produced an output.
    Window(WindowRecord),
    /// A track passed the charge-shape check.
    Track(TrackRecord),
}

/// Destination for [`MakerEvent`]s.
pub trait EventSink: Send {
    /// Records one event.
    fn record(&mut self, event: MakerEvent);

    /// Flushes buffered events.
    fn flush(&mut self) {}
}

/// Sink that keeps events in memory behind a shared handle.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other to a maker.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<MakerEvent>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<MakerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, event: MakerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shares_buffer() {
        let handle = MemorySink::new();
        let mut sink: Box<dyn EventSink> = Box::new(handle.clone());

        sink.record(MakerEvent::Primitive {
            maker: "test",
            primitive: Primitive::new(1, 2, 3),
        });

        assert_eq!(handle.len(), 1);
        assert!(matches!(
            handle.events()[0],
            MakerEvent::Primitive { maker: "test", .. }
        ));
    }

    #[test]
    fn test_window_record_length() {
        let record = WindowRecord {
            maker: "test",
            time_start: 100,
            time_end: 350,
            adc_integral: 0,
            n_channels_hit: 0,
            n_inputs: 0,
            first_channel: 0,
            last_channel: 0,
            adjacency: None,
            tot_sum: 0,
        };
        assert_eq!(record.length(), 250);
    }
}
