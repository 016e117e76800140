//! Geometry-based horizontal muon triggers.
//!
//! At the activity level a window of primitives fires on its ADC sum, channel
//! multiplicity, longest adjacent run, or the incoming primitive's time over
//! threshold. At the candidate level a window of activities fires on ADC sum or
//! multiplicity, or on every full window when adjacency is enabled; with no
//! condition enabled each activity becomes a candidate on its own.

use crate::adjacency::AdjacencyScanner;
use crate::windowed::{activity_from_window, Fired, TriggerPolicy, TriggerReason, WindowedMaker};
use rustrig_core::{
    Activity, ActivityAlgorithm, Candidate, CandidateAlgorithm, CandidateType, MakerEvent,
    Primitive, Result, SlidingWindow, ToleranceRule, TriggerConfig,
};

/// Activity maker for the geometry trigger.
pub type HorizontalMuonActivityMaker = WindowedMaker<Primitive, GeometryTrigger>;

/// Candidate maker grouping activities in a time window.
pub type HorizontalMuonCandidateMaker = WindowedMaker<Activity, CandidateWindowTrigger>;

/// Builds the adjacency scanner a configuration asks for.
pub(crate) fn scanner_for(config: &TriggerConfig, default_rule: ToleranceRule) -> AdjacencyScanner {
    AdjacencyScanner::new(
        u32::from(config.adj_tolerance),
        config.adj_tolerance_rule.unwrap_or(default_rule),
    )
}

pub(crate) fn warn_on_multiple_triggers(name: &str, config: &TriggerConfig) {
    let enabled = config.enabled_triggers();
    if enabled.len() > 1 {
        log::warn!(
            "{name}: several triggers enabled ({}); they are evaluated in that order",
            enabled.join(", ")
        );
    }
}

pub(crate) fn primitive_event(
    name: &'static str,
    config: &TriggerConfig,
    tp: &Primitive,
) -> Option<MakerEvent> {
    if !config.print_tp_info {
        return None;
    }
    log::debug!(
        "{name}: primitive channel {} start {} tot {} adc {}",
        tp.channel,
        tp.time_start,
        tp.time_over_threshold,
        tp.adc_integral
    );
    Some(MakerEvent::Primitive {
        maker: name,
        primitive: *tp,
    })
}

/// Threshold policy over a window of primitives.
#[derive(Debug, Clone)]
pub struct GeometryTrigger {
    config: TriggerConfig,
    scanner: AdjacencyScanner,
    algorithm: ActivityAlgorithm,
}

impl Default for GeometryTrigger {
    fn default() -> Self {
        Self::with_algorithm(TriggerConfig::default(), ActivityAlgorithm::HorizontalMuon)
    }
}

impl GeometryTrigger {
    /// Horizontal muon policy.
    #[must_use]
    pub fn new(config: TriggerConfig) -> Self {
        Self::with_algorithm(config, ActivityAlgorithm::HorizontalMuon)
    }

    /// Policy that only looks at the window ADC sum.
    #[must_use]
    pub fn adc_simple_window(config: TriggerConfig) -> Self {
        Self::with_algorithm(config, ActivityAlgorithm::AdcSimpleWindow)
    }

    fn with_algorithm(config: TriggerConfig, algorithm: ActivityAlgorithm) -> Self {
        let mut policy = Self {
            scanner: AdjacencyScanner::default(),
            config: TriggerConfig::default(),
            algorithm,
        };
        policy.adopt(config);
        policy
    }

    fn adopt(&mut self, mut config: TriggerConfig) {
        if self.algorithm == ActivityAlgorithm::AdcSimpleWindow {
            config = TriggerConfig {
                trigger_on_adc: true,
                ..config.without_triggers()
            };
        }
        self.scanner = scanner_for(&config, ToleranceRule::GapWidth);
        self.config = config;
    }

    /// Longest adjacent run in `window`.
    #[must_use]
    pub fn adjacency(&self, window: &SlidingWindow<Primitive>) -> u16 {
        self.scanner
            .longest_run(window.inputs().iter().map(|tp| tp.channel))
    }

    fn check_aggregates(&self, window: &SlidingWindow<Primitive>) -> Option<Fired> {
        let c = &self.config;
        if c.trigger_on_adc && window.adc_integral() > c.adc_threshold {
            return Some(Fired::new(TriggerReason::AdcSum));
        }
        if c.trigger_on_n_channels
            && window.n_channels_hit() > c.n_channels_threshold as usize
        {
            return Some(Fired::new(TriggerReason::Multiplicity));
        }
        None
    }
}

impl TriggerPolicy<Primitive> for GeometryTrigger {
    type Output = Activity;

    fn name(&self) -> &'static str {
        self.algorithm.as_str()
    }

    fn configure(&mut self, config: &TriggerConfig) -> Result<()> {
        self.adopt(config.clone());
        warn_on_multiple_triggers(self.name(), &self.config);
        Ok(())
    }

    fn config(&self) -> &TriggerConfig {
        &self.config
    }

    fn evaluate(&self, window: &SlidingWindow<Primitive>, incoming: &Primitive) -> Option<Fired> {
        if let Some(fired) = self.check_aggregates(window) {
            return Some(fired);
        }

        let c = &self.config;
        if c.trigger_on_adjacency {
            let adjacency = self.adjacency(window);
            if adjacency > c.adjacency_threshold {
                return Some(Fired::new(TriggerReason::Adjacency).with_adjacency(adjacency));
            }
        }
        if c.trigger_on_tot && incoming.time_over_threshold > i64::from(c.tot_threshold) {
            return Some(Fired::new(TriggerReason::TimeOverThreshold));
        }
        None
    }

    fn evaluate_flush(&self, window: &SlidingWindow<Primitive>) -> Option<Fired> {
        self.check_aggregates(window)
    }

    fn construct(&self, window: &SlidingWindow<Primitive>) -> Option<Activity> {
        activity_from_window(window, self.algorithm, false)
    }

    fn input_event(&self, input: &Primitive) -> Option<MakerEvent> {
        primitive_event(self.name(), &self.config, input)
    }
}

/// Threshold policy over a window of activities.
#[derive(Debug, Clone)]
pub struct CandidateWindowTrigger {
    config: TriggerConfig,
}

impl Default for CandidateWindowTrigger {
    fn default() -> Self {
        Self::new(TriggerConfig::candidate_defaults())
    }
}

impl CandidateWindowTrigger {
    /// Creates the policy.
    #[must_use]
    pub fn new(config: TriggerConfig) -> Self {
        Self { config }
    }

    fn check_aggregates(&self, window: &SlidingWindow<Activity>) -> Option<Fired> {
        let c = &self.config;
        if c.trigger_on_adc && window.adc_integral() > c.adc_threshold {
            return Some(Fired::new(TriggerReason::AdcSum));
        }
        if c.trigger_on_n_channels
            && window.n_channels_hit() > c.n_channels_threshold as usize
        {
            return Some(Fired::new(TriggerReason::Multiplicity));
        }
        None
    }
}

impl TriggerPolicy<Activity> for CandidateWindowTrigger {
    type Output = Candidate;

    fn name(&self) -> &'static str {
        CandidateAlgorithm::HorizontalMuon.as_str()
    }

    fn configure(&mut self, config: &TriggerConfig) -> Result<()> {
        self.config = config.clone();
        warn_on_multiple_triggers(self.name(), &self.config);
        Ok(())
    }

    fn config(&self) -> &TriggerConfig {
        &self.config
    }

    fn passthrough(&self) -> bool {
        let c = &self.config;
        !(c.trigger_on_adc || c.trigger_on_n_channels || c.trigger_on_adjacency)
    }

    fn evaluate(&self, window: &SlidingWindow<Activity>, _incoming: &Activity) -> Option<Fired> {
        self.check_aggregates(window).or_else(|| {
            self.config
                .trigger_on_adjacency
                .then(|| Fired::new(TriggerReason::WindowFull))
        })
    }

    fn evaluate_flush(&self, window: &SlidingWindow<Activity>) -> Option<Fired> {
        self.check_aggregates(window)
    }

    fn construct(&self, window: &SlidingWindow<Activity>) -> Option<Candidate> {
        let last = window.last()?;
        let last_end = last
            .inputs
            .last()
            .map_or(last.time_end, |tp| tp.time_start + tp.time_over_threshold);

        let mut candidate = Candidate::from_activities(
            window.inputs().to_vec(),
            CandidateType::HorizontalMuon,
            CandidateAlgorithm::HorizontalMuon,
        );
        candidate.time_start = window.time_start() - self.config.readout_window_ticks_before;
        candidate.time_end = last_end + self.config.readout_window_ticks_after;
        candidate.time_candidate = window.time_start();
        Some(candidate)
    }
}
