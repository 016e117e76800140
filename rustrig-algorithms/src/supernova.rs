//! Burst trigger: counts busy activities over a trailing time window.

use rustrig_core::{
    Activity, Candidate, CandidateAlgorithm, CandidateType, Error, Maker, MakerStatistics, Result,
    Timestamp, TriggerConfig, WHOLE_DETECTOR,
};

/// Default trailing window (ticks), about ten seconds.
pub const BURST_WINDOW: Timestamp = 500_000_000;

/// Emits a whole-detector candidate when busy activities pile up.
///
/// An activity with more than `hit_threshold` primitives is buffered. Each new
/// activity first expires buffered ones that started more than `time_window`
/// ticks before it. Once more than `activity_threshold` activities remain, the
/// whole buffer becomes one candidate reaching back one window, and the buffer
/// starts over.
#[derive(Debug, Clone)]
pub struct SupernovaCandidateMaker {
    time_window: Timestamp,
    activity_threshold: usize,
    hit_threshold: usize,
    buffer: Vec<Activity>,
    stats: MakerStatistics,
}

impl Default for SupernovaCandidateMaker {
    fn default() -> Self {
        let config = TriggerConfig::candidate_defaults();
        Self::new(BURST_WINDOW, config.activity_threshold, config.hit_threshold)
    }
}

impl SupernovaCandidateMaker {
    /// Creates a maker with an explicit window and thresholds.
    #[must_use]
    pub fn new(time_window: Timestamp, activity_threshold: usize, hit_threshold: usize) -> Self {
        Self {
            time_window,
            activity_threshold,
            hit_threshold,
            buffer: Vec::new(),
            stats: MakerStatistics::default(),
        }
    }

    /// Activities currently counted towards a burst.
    #[must_use]
    pub fn buffered(&self) -> &[Activity] {
        &self.buffer
    }

    fn expire(&mut self, now: Timestamp) {
        let horizon = now.saturating_sub(self.time_window);
        let before = self.buffer.len();
        self.buffer.retain(|ta| ta.time_start >= horizon);
        let expired = before - self.buffer.len();
        if expired > 0 {
            log::trace!("{}: expired {} activities before {}", self.name(), expired, horizon);
        }
    }
}

impl Maker for SupernovaCandidateMaker {
    type Input = Activity;
    type Output = Candidate;

    fn name(&self) -> &'static str {
        CandidateAlgorithm::Supernova.as_str()
    }

    fn configure(&mut self, config: &TriggerConfig) -> Result<()> {
        if self.stats.inputs_processed > 0 {
            return Err(Error::ConfigLocked {
                maker: self.name(),
                processed: self.stats.inputs_processed,
            });
        }
        config.validate()?;
        *self = Self::new(
            config.window_length,
            config.activity_threshold,
            config.hit_threshold,
        );
        Ok(())
    }

    fn process(&mut self, input: &Activity, output: &mut Vec<Candidate>) {
        self.stats.inputs_processed += 1;
        let now = input.time_start;
        self.expire(now);

        if input.len() > self.hit_threshold {
            self.buffer.push(input.clone());
        }
        if self.buffer.len() <= self.activity_threshold {
            return;
        }

        self.stats.triggers_fired += 1;
        let mut candidate = Candidate::from_activities(
            std::mem::take(&mut self.buffer),
            CandidateType::Supernova,
            CandidateAlgorithm::Supernova,
        );
        candidate.time_start = now.saturating_sub(self.time_window);
        candidate.time_end = input.time_end;
        candidate.time_candidate = now;
        candidate.detid = WHOLE_DETECTOR;

        log::debug!(
            "{}: burst of {} activities over {} regions at {}",
            self.name(),
            candidate.len(),
            candidate.regions.len(),
            now
        );
        output.push(candidate);
        self.stats.outputs_emitted += 1;
    }

    fn flush(&mut self, _output: &mut Vec<Candidate>) {
        if !self.buffer.is_empty() {
            log::debug!(
                "{}: {} buffered activities below threshold at end of stream",
                self.name(),
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    fn statistics(&self) -> MakerStatistics {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustrig_core::{ActivityAlgorithm, Primitive};

    /// An activity of `hits` primitives starting at `time` on detector `detid`.
    fn activity(time: Timestamp, hits: u32, detid: u16) -> Activity {
        let tp = |i: u32| {
            Primitive::new(i, time, 10)
                .with_time_over_threshold(5)
                .with_detid(detid)
        };
        let mut ta = Activity::from_primitive(&tp(0), ActivityAlgorithm::HorizontalMuon);
        ta.inputs.extend((1..hits).map(tp));
        ta
    }

    #[test]
    fn test_fires_once_threshold_is_exceeded() {
        let mut maker = SupernovaCandidateMaker::new(1000, 2, 1);
        let mut out = Vec::new();

        maker.process(&activity(0, 2, 1), &mut out);
        maker.process(&activity(10, 2, 4), &mut out);
        assert!(out.is_empty());
        assert_eq!(maker.buffered().len(), 2);

        maker.process(&activity(20, 3, 1), &mut out);
        assert_eq!(out.len(), 1);
        let tc = &out[0];
        assert_eq!(tc.len(), 3);
        assert_eq!(tc.time_start, 20 - 1000);
        assert_eq!(tc.time_candidate, 20);
        assert_eq!(tc.time_end, 25);
        assert_eq!(tc.detid, WHOLE_DETECTOR);
        assert_eq!(tc.regions.iter().copied().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(tc.kind, CandidateType::Supernova);
        assert!(maker.buffered().is_empty());
    }

    #[test]
    fn test_small_activities_are_not_counted() {
        let mut maker = SupernovaCandidateMaker::new(1000, 1, 2);
        let mut out = Vec::new();
        for t in 0..10 {
            maker.process(&activity(t, 2, 0), &mut out);
        }
        assert!(out.is_empty());
        assert!(maker.buffered().is_empty());
        assert_eq!(maker.statistics().inputs_processed, 10);
    }

    #[test]
    fn test_old_activities_expire() {
        let mut maker = SupernovaCandidateMaker::new(1000, 2, 0);
        let mut out = Vec::new();

        maker.process(&activity(0, 1, 0), &mut out);
        maker.process(&activity(10, 1, 0), &mut out);
        maker.process(&activity(2000, 1, 0), &mut out);
        assert!(out.is_empty());
        assert_eq!(maker.buffered().len(), 1);

        // Exactly one window back is still inside.
        maker.process(&activity(2500, 1, 0), &mut out);
        maker.process(&activity(3000, 1, 0), &mut out);
        assert_eq!(out.len(), 1);
        let starts: Vec<_> = out[0].inputs.iter().map(|ta| ta.time_start).collect();
        assert_eq!(starts, vec![2000, 2500, 3000]);
    }

    #[test]
    fn test_configure_and_flush() {
        let mut maker = SupernovaCandidateMaker::default();
        maker
            .configure(
                &TriggerConfig::candidate_defaults()
                    .with_window_length(50)
                    .with_burst_thresholds(1, 0),
            )
            .unwrap();

        let mut out = Vec::new();
        maker.process(&activity(0, 1, 0), &mut out);
        maker.process(&activity(100, 1, 0), &mut out);
        assert!(out.is_empty());
        assert_eq!(maker.buffered().len(), 1);

        maker.flush(&mut out);
        assert!(out.is_empty());
        assert!(maker.buffered().is_empty());
        assert!(maker.configure(&TriggerConfig::candidate_defaults()).is_err());
    }
}
