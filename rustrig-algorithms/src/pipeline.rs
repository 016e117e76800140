//! High-level helpers that chain an activity maker into a candidate maker.

use crate::registry::MakerRegistry;
use rayon::prelude::*;
use rustrig_core::{
    Activity, ActivityMaker, Candidate, CandidateMaker, MakerStatistics, Primitive, Result,
};
use serde_json::{json, Value};

/// Names and configurations of a two-stage chain.
#[derive(Clone, Debug)]
pub struct ChainSpec {
    /// Registered activity maker name.
    pub activity_maker: String,
    /// Activity maker configuration object.
    pub activity_config: Value,
    /// Registered candidate maker name.
    pub candidate_maker: String,
    /// Candidate maker configuration object.
    pub candidate_config: Value,
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self {
            activity_maker: "horizontal_muon".to_string(),
            activity_config: json!({}),
            candidate_maker: "horizontal_muon".to_string(),
            candidate_config: json!({}),
        }
    }
}

impl ChainSpec {
    /// Builds fresh makers for one partition.
    pub fn build(
        &self,
        registry: &MakerRegistry,
    ) -> Result<(Box<dyn ActivityMaker>, Box<dyn CandidateMaker>)> {
        let activity = registry.activity_maker(&self.activity_maker, &self.activity_config)?;
        let candidate = registry.candidate_maker(&self.candidate_maker, &self.candidate_config)?;
        Ok((activity, candidate))
    }
}

/// Everything a chain produced for one partition.
#[derive(Clone, Debug, Default)]
pub struct ChainOutput {
    /// Activities, in emission order.
    pub activities: Vec<Activity>,
    /// Candidates, in emission order.
    pub candidates: Vec<Candidate>,
    /// Activity maker counters.
    pub activity_statistics: MakerStatistics,
    /// Candidate maker counters.
    pub candidate_statistics: MakerStatistics,
}

/// Streams `primitives` through both makers, then flushes them.
pub fn run_chain(
    primitives: &[Primitive],
    activity_maker: &mut dyn ActivityMaker,
    candidate_maker: &mut dyn CandidateMaker,
) -> ChainOutput {
    let mut activities = Vec::new();
    let mut candidates = Vec::new();
    let mut fresh = Vec::new();

    for tp in primitives {
        activity_maker.process(tp, &mut fresh);
        for ta in &fresh {
            candidate_maker.process(ta, &mut candidates);
        }
        activities.append(&mut fresh);
    }

    activity_maker.flush(&mut fresh);
    for ta in &fresh {
        candidate_maker.process(ta, &mut candidates);
    }
    activities.append(&mut fresh);
    candidate_maker.flush(&mut candidates);

    log::info!(
        "{} -> {}: {} primitives, {} activities, {} candidates",
        activity_maker.name(),
        candidate_maker.name(),
        primitives.len(),
        activities.len(),
        candidates.len()
    );

    ChainOutput {
        activities,
        candidates,
        activity_statistics: activity_maker.statistics(),
        candidate_statistics: candidate_maker.statistics(),
    }
}

/// Runs one independent chain per partition in parallel.
///
/// `build(i)` creates the makers for partition `i`. Results keep partition order.
pub fn run_partitions<F, E>(
    partitions: &[Vec<Primitive>],
    build: F,
) -> std::result::Result<Vec<ChainOutput>, E>
where
    F: Fn(usize) -> std::result::Result<(Box<dyn ActivityMaker>, Box<dyn CandidateMaker>), E>
        + Sync,
    E: Send,
{
    partitions
        .par_iter()
        .enumerate()
        .map(|(i, primitives)| {
            let (mut activity_maker, mut candidate_maker) = build(i)?;
            Ok(run_chain(
                primitives,
                activity_maker.as_mut(),
                candidate_maker.as_mut(),
            ))
        })
        .collect()
}
