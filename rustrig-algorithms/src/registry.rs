//! Name -> constructor lookup for makers.
//!
//! Constructors take the maker's JSON configuration object, overlay it on the
//! level defaults and return a ready maker.

use crate::bundle::BundleCandidateMaker;
use crate::horizontal_muon::{
    CandidateWindowTrigger, GeometryTrigger, HorizontalMuonActivityMaker,
    HorizontalMuonCandidateMaker,
};
use crate::michel_electron::{MichelElectronActivityMaker, ShapeTrigger};
use crate::prescale::{PrescaleActivityMaker, PrescaleCandidateMaker};
use crate::supernova::{SupernovaCandidateMaker, BURST_WINDOW};
use rustrig_core::{ActivityMaker, CandidateMaker, Error, Maker, Result, TriggerConfig};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Builds an activity maker from its configuration.
pub type ActivityMakerConstructor = fn(&Value) -> Result<Box<dyn ActivityMaker>>;

/// Builds a candidate maker from its configuration.
pub type CandidateMakerConstructor = fn(&Value) -> Result<Box<dyn CandidateMaker>>;

/// Registered maker constructors, keyed by name.
#[derive(Clone, Default)]
pub struct MakerRegistry {
    activity: BTreeMap<&'static str, ActivityMakerConstructor>,
    candidate: BTreeMap<&'static str, CandidateMakerConstructor>,
}

impl fmt::Debug for MakerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MakerRegistry")
            .field("activity", &self.activity.keys().collect::<Vec<_>>())
            .field("candidate", &self.candidate.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MakerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in maker.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_activity_maker("horizontal_muon", build_horizontal_muon);
        registry.register_activity_maker("michel_electron", build_michel_electron);
        registry.register_activity_maker("adc_simple_window", build_adc_simple_window);
        registry.register_activity_maker("prescale", build_prescale_activity);
        registry.register_candidate_maker("horizontal_muon", build_horizontal_muon_candidate);
        registry.register_candidate_maker("prescale", build_prescale_candidate);
        registry.register_candidate_maker("bundle_n", build_bundle);
        registry.register_candidate_maker("supernova", build_supernova);
        registry
    }

    /// Adds or replaces an activity maker.
    pub fn register_activity_maker(&mut self, name: &'static str, build: ActivityMakerConstructor) {
        self.activity.insert(name, build);
    }

    /// Adds or replaces a candidate maker.
    pub fn register_candidate_maker(
        &mut self,
        name: &'static str,
        build: CandidateMakerConstructor,
    ) {
        self.candidate.insert(name, build);
    }

    /// Builds the activity maker registered as `name`.
    pub fn activity_maker(&self, name: &str, config: &Value) -> Result<Box<dyn ActivityMaker>> {
        let build = self
            .activity
            .get(name)
            .ok_or_else(|| Error::UnknownMaker(name.to_string()))?;
        build(config)
    }

    /// Builds the candidate maker registered as `name`.
    pub fn candidate_maker(&self, name: &str, config: &Value) -> Result<Box<dyn CandidateMaker>> {
        let build = self
            .candidate
            .get(name)
            .ok_or_else(|| Error::UnknownMaker(name.to_string()))?;
        build(config)
    }

    /// Registered activity maker names, sorted.
    pub fn activity_maker_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.activity.keys().copied()
    }

    /// Registered candidate maker names, sorted.
    pub fn candidate_maker_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.candidate.keys().copied()
    }
}

fn configured<M: Maker>(mut maker: M, defaults: TriggerConfig, value: &Value) -> Result<M> {
    let config = TriggerConfig::from_json_with(defaults, value)?;
    maker.configure(&config)?;
    Ok(maker)
}

fn build_horizontal_muon(value: &Value) -> Result<Box<dyn ActivityMaker>> {
    let maker = HorizontalMuonActivityMaker::new(GeometryTrigger::default());
    Ok(Box::new(configured(maker, TriggerConfig::default(), value)?))
}

fn build_adc_simple_window(value: &Value) -> Result<Box<dyn ActivityMaker>> {
    let maker =
        HorizontalMuonActivityMaker::new(GeometryTrigger::adc_simple_window(TriggerConfig::default()));
    Ok(Box::new(configured(maker, TriggerConfig::default(), value)?))
}

fn build_michel_electron(value: &Value) -> Result<Box<dyn ActivityMaker>> {
    let maker = MichelElectronActivityMaker::new(ShapeTrigger::default());
    Ok(Box::new(configured(maker, TriggerConfig::default(), value)?))
}

fn build_prescale_activity(value: &Value) -> Result<Box<dyn ActivityMaker>> {
    let maker = PrescaleActivityMaker::default();
    Ok(Box::new(configured(maker, TriggerConfig::default(), value)?))
}

fn build_horizontal_muon_candidate(value: &Value) -> Result<Box<dyn CandidateMaker>> {
    let maker = HorizontalMuonCandidateMaker::new(CandidateWindowTrigger::default());
    Ok(Box::new(configured(
        maker,
        TriggerConfig::candidate_defaults(),
        value,
    )?))
}

fn build_prescale_candidate(value: &Value) -> Result<Box<dyn CandidateMaker>> {
    let maker = PrescaleCandidateMaker::default();
    Ok(Box::new(configured(
        maker,
        TriggerConfig::candidate_defaults(),
        value,
    )?))
}

fn build_bundle(value: &Value) -> Result<Box<dyn CandidateMaker>> {
    let maker = BundleCandidateMaker::default();
    Ok(Box::new(configured(
        maker,
        TriggerConfig::candidate_defaults(),
        value,
    )?))
}

fn build_supernova(value: &Value) -> Result<Box<dyn CandidateMaker>> {
    let maker = SupernovaCandidateMaker::default();
    let defaults = TriggerConfig::candidate_defaults().with_window_length(BURST_WINDOW);
    Ok(Box::new(configured(maker, defaults, value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustrig_core::{Activity, Primitive};
    use serde_json::json;

    #[test]
    fn test_builtin_names() {
        let registry = MakerRegistry::with_builtin();
        let names: Vec<_> = registry.activity_maker_names().collect();
        assert_eq!(
            names,
            vec![
                "adc_simple_window",
                "horizontal_muon",
                "michel_electron",
                "prescale"
            ]
        );
        let names: Vec<_> = registry.candidate_maker_names().collect();
        assert_eq!(
            names,
            vec!["bundle_n", "horizontal_muon", "prescale", "supernova"]
        );
    }

    #[test]
    fn test_supernova_from_json() {
        let registry = MakerRegistry::with_builtin();
        let mut maker = registry
            .candidate_maker("supernova", &json!({"activity_threshold": 1, "hit_threshold": 0}))
            .unwrap();
        assert_eq!(maker.name(), "supernova");

        let mut out = Vec::new();
        for t in [0, 400_000_000] {
            let ta = Activity::from_primitive(
                &Primitive::new(1, t, 1),
                rustrig_core::ActivityAlgorithm::Prescale,
            );
            maker.process(&ta, &mut out);
        }
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].time_start, 400_000_000 - BURST_WINDOW);
    }

    #[test]
    fn test_unknown_maker() {
        let registry = MakerRegistry::with_builtin();
        let err = registry.activity_maker("nope", &json!({})).err().unwrap();
        assert!(matches!(err, Error::UnknownMaker(name) if name == "nope"));
    }

    #[test]
    fn test_bad_config_is_reported() {
        let registry = MakerRegistry::with_builtin();
        let err = registry
            .candidate_maker("bundle_n", &json!({"bundle_size": 0, "colour": "red"}))
            .err()
            .unwrap();
        let keys: Vec<_> = err.rejected_keys().iter().map(|k| k.key.as_str()).collect();
        assert!(keys.contains(&"bundle_size"));
        assert!(keys.contains(&"colour"));
    }

    #[test]
    fn test_built_makers_run() {
        let registry = MakerRegistry::with_builtin();
        let mut ta_maker = registry
            .activity_maker("prescale", &json!({"prescale": 2}))
            .unwrap();
        let mut tc_maker = registry
            .candidate_maker("horizontal_muon", &json!({}))
            .unwrap();
        assert_eq!(ta_maker.name(), "prescale");

        let mut activities: Vec<Activity> = Vec::new();
        for i in 0..4 {
            ta_maker.process(&Primitive::new(i, i64::from(i), 1), &mut activities);
        }
        let mut candidates = Vec::new();
        for ta in &activities {
            tc_maker.process(ta, &mut candidates);
        }
        assert_eq!(activities.len(), 2);
        assert_eq!(candidates.len(), 2);
    }
}
