//! Fixed-size bundles of activities.

use rustrig_core::{
    Activity, Candidate, CandidateAlgorithm, CandidateType, Error, Maker, MakerStatistics, Result,
    TriggerConfig,
};

/// Groups every `bundle_size` consecutive activities into one candidate.
///
/// With a prescale above one only every `prescale`-th completed bundle is
/// emitted; the others are dropped whole.
#[derive(Debug, Clone)]
pub struct BundleCandidateMaker {
    bundle_size: usize,
    prescale: u64,
    bundles_completed: u64,
    current: Vec<Activity>,
    stats: MakerStatistics,
}

impl Default for BundleCandidateMaker {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl BundleCandidateMaker {
    /// Creates a maker. Zero sizes are raised to 1.
    #[must_use]
    pub fn new(bundle_size: usize, prescale: u64) -> Self {
        let bundle_size = bundle_size.max(1);
        Self {
            bundle_size,
            prescale: prescale.max(1),
            bundles_completed: 0,
            current: Vec::with_capacity(bundle_size),
            stats: MakerStatistics::default(),
        }
    }

    /// Activities waiting for the bundle to fill.
    #[must_use]
    pub fn pending(&self) -> &[Activity] {
        &self.current
    }

    fn build(bundle: Vec<Activity>) -> Option<Candidate> {
        let first = bundle.first()?;
        let (time_start, detid) = (first.time_start, first.detid);
        let time_end = bundle.last()?.time_end;

        let mut candidate =
            Candidate::from_activities(bundle, CandidateType::Bundle, CandidateAlgorithm::Bundle);
        candidate.time_start = time_start;
        candidate.time_end = time_end;
        candidate.time_candidate = time_start;
        candidate.detid = detid;
        Some(candidate)
    }
}

impl Maker for BundleCandidateMaker {
    type Input = Activity;
    type Output = Candidate;

    fn name(&self) -> &'static str {
        "bundle_n"
    }

    fn configure(&mut self, config: &TriggerConfig) -> Result<()> {
        if self.stats.inputs_processed > 0 {
            return Err(Error::ConfigLocked {
                maker: self.name(),
                processed: self.stats.inputs_processed,
            });
        }
        config.validate()?;
        *self = Self::new(config.bundle_size, config.prescale);
        Ok(())
    }

    fn process(&mut self, input: &Activity, output: &mut Vec<Candidate>) {
        self.stats.inputs_processed += 1;
        self.current.push(input.clone());
        if self.current.len() < self.bundle_size {
            return;
        }

        let bundle = std::mem::replace(&mut self.current, Vec::with_capacity(self.bundle_size));
        let index = self.bundles_completed;
        self.bundles_completed += 1;
        self.stats.triggers_fired += 1;
        if index % self.prescale != 0 {
            self.stats.triggers_prescaled += 1;
            return;
        }

        if let Some(candidate) = Self::build(bundle) {
            log::debug!(
                "{}: bundle {} of {} activities from {} to {}",
                self.name(),
                index,
                candidate.len(),
                candidate.time_start,
                candidate.time_end
            );
            output.push(candidate);
            self.stats.outputs_emitted += 1;
        }
    }

    fn flush(&mut self, _output: &mut Vec<Candidate>) {
        if !self.current.is_empty() {
            log::debug!(
                "{}: discarding partial bundle of {} activities",
                self.name(),
                self.current.len()
            );
            self.current.clear();
        }
    }

    fn statistics(&self) -> MakerStatistics {
        self.stats
    }
}
