//! Shape-based trigger for stopping tracks.
//!
//! A window fires when its longest adjacent run exceeds the threshold and the
//! run's charge profile peaks at one end of the track.

use crate::bragg::BraggPeakDetector;
use crate::horizontal_muon::{primitive_event, scanner_for, warn_on_multiple_triggers};
use crate::windowed::{activity_from_window, Fired, TriggerPolicy, TriggerReason, WindowedMaker};
use rustrig_core::{
    Activity, ActivityAlgorithm, MakerEvent, Primitive, Result, SlidingWindow, ToleranceRule,
    TriggerConfig,
};

/// Activity maker for the shape trigger.
pub type MichelElectronActivityMaker = WindowedMaker<Primitive, ShapeTrigger>;

/// Adjacency plus charge-profile policy.
#[derive(Debug, Clone)]
pub struct ShapeTrigger {
    config: TriggerConfig,
    detector: BraggPeakDetector,
}

impl Default for ShapeTrigger {
    fn default() -> Self {
        Self::new(TriggerConfig::default())
    }
}

impl ShapeTrigger {
    /// Creates the policy.
    #[must_use]
    pub fn new(config: TriggerConfig) -> Self {
        let detector = BraggPeakDetector::new(scanner_for(&config, ToleranceRule::MissingWires));
        Self { config, detector }
    }

    /// The charge-profile detector.
    #[must_use]
    pub fn detector(&self) -> &BraggPeakDetector {
        &self.detector
    }
}

impl TriggerPolicy<Primitive> for ShapeTrigger {
    type Output = Activity;

    fn name(&self) -> &'static str {
        ActivityAlgorithm::MichelElectron.as_str()
    }

    fn configure(&mut self, config: &TriggerConfig) -> Result<()> {
        *self = Self::new(config.clone());
        if !config.trigger_on_adjacency {
            log::warn!("{}: adjacency disabled, no activity will be produced", self.name());
        }
        warn_on_multiple_triggers(self.name(), config);
        Ok(())
    }

    fn config(&self) -> &TriggerConfig {
        &self.config
    }

    fn evaluate(&self, window: &SlidingWindow<Primitive>, _incoming: &Primitive) -> Option<Fired> {
        if !self.config.trigger_on_adjacency {
            return None;
        }
        let adjacency = self
            .detector
            .scanner()
            .longest_run(window.inputs().iter().map(|tp| tp.channel));
        if adjacency <= self.config.adjacency_threshold {
            return None;
        }

        let peak = self.detector.detect(window.inputs());
        if !peak.detected {
            log::trace!(
                "{}: adjacency {adjacency} without an end-peaked charge profile",
                self.name()
            );
            return None;
        }
        Some(
            Fired::new(TriggerReason::BraggPeak)
                .with_adjacency(adjacency)
                .with_track(peak.to_record(self.name(), self.detector.widths())),
        )
    }

    fn construct(&self, window: &SlidingWindow<Primitive>) -> Option<Activity> {
        activity_from_window(window, ActivityAlgorithm::MichelElectron, true)
    }

    fn input_event(&self, input: &Primitive) -> Option<MakerEvent> {
        primitive_event(self.name(), &self.config, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustrig_core::{Maker, MemorySink};

    fn config() -> TriggerConfig {
        TriggerConfig::default()
            .without_triggers()
            .with_adjacency_trigger(15, 3)
            .with_window_length(1000)
    }

    fn track(adc: impl Fn(u32) -> u32) -> Vec<Primitive> {
        (0..20_u32)
            .map(|i| {
                Primitive::new(200 + i, i64::from(i) * 10, adc(i))
                    .with_adc_peak(adc(i))
                    .with_time_over_threshold(7)
            })
            .collect()
    }

    fn run(maker: &mut MichelElectronActivityMaker, tps: &[Primitive]) -> Vec<Activity> {
        let mut out = Vec::new();
        for tp in tps {
            maker.process(tp, &mut out);
        }
        maker.process(&Primitive::new(1, 5000, 1), &mut out);
        out
    }

    #[test]
    fn test_end_peaked_track_fires() {
        let sink = MemorySink::new();
        let mut maker =
            MichelElectronActivityMaker::new(ShapeTrigger::new(config())).with_sink(Box::new(sink.clone()));

        let out = run(&mut maker, &track(|i| 10 * (i + 1)));

        assert_eq!(out.len(), 1);
        let ta = &out[0];
        assert_eq!(ta.algorithm, ActivityAlgorithm::MichelElectron);
        assert_eq!(ta.time_start, 0);
        assert_eq!(ta.time_end, 190 + 7);
        assert_eq!(ta.channel_peak, 219);
        assert_eq!(ta.adc_peak, 200);
        assert_eq!(maker.statistics().max_adjacency, 20);

        let events = sink.events();
        assert!(matches!(events[0], MakerEvent::Window(_)));
        let MakerEvent::Track(record) = &events[1] else {
            panic!("expected a track record");
        };
        assert_eq!(record.hits.len(), 20);
    }

    #[test]
    fn test_flat_track_does_not_fire() {
        let mut maker = MichelElectronActivityMaker::new(ShapeTrigger::new(config()));
        let out = run(&mut maker, &track(|_| 50));
        assert!(out.is_empty());
        assert_eq!(maker.statistics().triggers_fired, 0);
    }

    #[test]
    fn test_short_track_does_not_fire() {
        let mut maker = MichelElectronActivityMaker::new(ShapeTrigger::new(config()));
        let short: Vec<_> = track(|i| 10 * (i + 1)).into_iter().take(10).collect();
        assert!(run(&mut maker, &short).is_empty());
    }

    #[test]
    fn test_adjacency_flag_gates_the_check() {
        let mut maker = MichelElectronActivityMaker::new(ShapeTrigger::default());
        maker
            .configure(&config().without_triggers().with_window_length(1000))
            .unwrap();
        assert!(run(&mut maker, &track(|i| 10 * (i + 1))).is_empty());
    }
}
