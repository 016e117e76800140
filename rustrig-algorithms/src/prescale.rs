//! Prescale makers: pass through every N-th input.

use rustrig_core::{
    Activity, ActivityAlgorithm, Candidate, CandidateAlgorithm, CandidateType, Error, Maker,
    MakerStatistics, Primitive, Result, TriggerConfig,
};

/// Emits one single-primitive activity for every `prescale`-th primitive.
#[derive(Debug, Clone)]
pub struct PrescaleActivityMaker {
    prescale: u64,
    stats: MakerStatistics,
}

impl Default for PrescaleActivityMaker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PrescaleActivityMaker {
    /// Creates a maker keeping one primitive in `prescale` (minimum 1).
    #[must_use]
    pub fn new(prescale: u64) -> Self {
        Self {
            prescale: prescale.max(1),
            stats: MakerStatistics::default(),
        }
    }
}

impl Maker for PrescaleActivityMaker {
    type Input = Primitive;
    type Output = Activity;

    fn name(&self) -> &'static str {
        ActivityAlgorithm::Prescale.as_str()
    }

    fn configure(&mut self, config: &TriggerConfig) -> Result<()> {
        configure_prescale(self.name(), &self.stats, &mut self.prescale, config)
    }

    fn process(&mut self, input: &Primitive, output: &mut Vec<Activity>) {
        let index = self.stats.inputs_processed;
        self.stats.inputs_processed += 1;
        self.stats.triggers_fired += 1;
        if index % self.prescale != 0 {
            self.stats.triggers_prescaled += 1;
            return;
        }
        log::debug!(
            "{}: emitting activity for channel {} at {}",
            self.name(),
            input.channel,
            input.time_start
        );
        output.push(Activity::from_primitive(input, ActivityAlgorithm::Prescale));
        self.stats.outputs_emitted += 1;
    }

    fn statistics(&self) -> MakerStatistics {
        self.stats
    }
}

/// Emits one single-activity candidate for every `prescale`-th activity.
#[derive(Debug, Clone)]
pub struct PrescaleCandidateMaker {
    prescale: u64,
    stats: MakerStatistics,
}

impl Default for PrescaleCandidateMaker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PrescaleCandidateMaker {
    /// Creates a maker keeping one activity in `prescale` (minimum 1).
    #[must_use]
    pub fn new(prescale: u64) -> Self {
        Self {
            prescale: prescale.max(1),
            stats: MakerStatistics::default(),
        }
    }
}

impl Maker for PrescaleCandidateMaker {
    type Input = Activity;
    type Output = Candidate;

    fn name(&self) -> &'static str {
        CandidateAlgorithm::Prescale.as_str()
    }

    fn configure(&mut self, config: &TriggerConfig) -> Result<()> {
        configure_prescale(self.name(), &self.stats, &mut self.prescale, config)
    }

    fn process(&mut self, input: &Activity, output: &mut Vec<Candidate>) {
        let index = self.stats.inputs_processed;
        self.stats.inputs_processed += 1;
        self.stats.triggers_fired += 1;
        if index % self.prescale != 0 {
            self.stats.triggers_prescaled += 1;
            return;
        }

        let mut candidate = Candidate::from_activities(
            vec![input.clone()],
            CandidateType::Prescale,
            CandidateAlgorithm::Prescale,
        );
        candidate.time_start = input.time_start;
        candidate.time_end = input.time_end;
        candidate.time_candidate = input.time_start;
        log::debug!("{}: emitting candidate at {}", self.name(), input.time_start);
        output.push(candidate);
        self.stats.outputs_emitted += 1;
    }

    fn statistics(&self) -> MakerStatistics {
        self.stats
    }
}

fn configure_prescale(
    name: &'static str,
    stats: &MakerStatistics,
    prescale: &mut u64,
    config: &TriggerConfig,
) -> Result<()> {
    if stats.inputs_processed > 0 {
        return Err(Error::ConfigLocked {
            maker: name,
            processed: stats.inputs_processed,
        });
    }
    config.validate()?;
    *prescale = config.prescale;
    Ok(())
}
