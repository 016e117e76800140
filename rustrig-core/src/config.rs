//! Maker configuration and its validation.
#![allow(clippy::struct_excessive_bools)]

use crate::error::{Error, RejectedKey, RejectedKeys, Result};
use crate::primitive::Timestamp;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How much of the tolerance budget a bridged channel gap consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ToleranceRule {
    /// A gap of `g` channels consumes `g - 1` units (one per missing wire).
    MissingWires,
    /// A gap of `g` channels consumes `g` units.
    GapWidth,
    /// Every bridged gap consumes one unit.
    Flat,
}

impl ToleranceRule {
    /// Tolerance units consumed by bridging from `channel` to `channel + gap`.
    #[inline]
    #[must_use]
    pub fn cost(self, gap: u32) -> u32 {
        match self {
            Self::MissingWires => gap.saturating_sub(1),
            Self::GapWidth => gap,
            Self::Flat => 1,
        }
    }

    /// Configuration name of the rule.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingWires => "missing_wires",
            Self::GapWidth => "gap_width",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for ToleranceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToleranceRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "missing_wires" => Ok(Self::MissingWires),
            "gap_width" => Ok(Self::GapWidth),
            "flat" => Ok(Self::Flat),
            other => Err(format!(
                "unknown tolerance rule `{other}` (expected missing_wires, gap_width or flat)"
            )),
        }
    }
}

/// Options shared by all makers.
///
/// Each maker reads the subset it understands. Defaults mirror the activity
/// level; [`TriggerConfig::candidate_defaults`] gives the candidate level.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerConfig {
    /// Fire when the window ADC sum exceeds `adc_threshold`.
    pub trigger_on_adc: bool,
    /// Fire when the number of distinct channels exceeds `n_channels_threshold`.
    pub trigger_on_n_channels: bool,
    /// Fire when the longest adjacent run exceeds `adjacency_threshold`.
    pub trigger_on_adjacency: bool,
    /// Fire when the incoming primitive's time over threshold exceeds `tot_threshold`.
    pub trigger_on_tot: bool,
    /// Window ADC sum threshold.
    pub adc_threshold: u64,
    /// Distinct channel threshold.
    pub n_channels_threshold: u32,
    /// Adjacent-run length threshold.
    pub adjacency_threshold: u16,
    /// Tolerance budget for gaps in an adjacent run.
    pub adj_tolerance: u16,
    /// Gap consumption rule; `None` selects the maker's own default.
    pub adj_tolerance_rule: Option<ToleranceRule>,
    /// Time over threshold limit (ticks).
    pub tot_threshold: u32,
    /// Window length (ticks).
    pub window_length: Timestamp,
    /// Emit only every `prescale`-th trigger.
    pub prescale: u64,
    /// Activities per bundle.
    pub bundle_size: usize,
    /// Buffered activities needed, exceeded, for a burst candidate.
    pub activity_threshold: usize,
    /// Primitives an activity needs, exceeded, to count towards a burst.
    pub hit_threshold: usize,
    /// Readout margin before a candidate (ticks).
    pub readout_window_ticks_before: Timestamp,
    /// Readout margin after a candidate (ticks).
    pub readout_window_ticks_after: Timestamp,
    /// Debug-log every incoming primitive.
    pub print_tp_info: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            trigger_on_adc: false,
            trigger_on_n_channels: false,
            trigger_on_adjacency: true,
            trigger_on_tot: false,
            adc_threshold: 3_000_000,
            n_channels_threshold: 400,
            adjacency_threshold: 15,
            adj_tolerance: 3,
            adj_tolerance_rule: None,
            tot_threshold: 5000,
            window_length: 8000, // below the ~9375 tick maximum drift
            prescale: 1,
            bundle_size: 1,
            activity_threshold: 6,
            hit_threshold: 3,
            readout_window_ticks_before: 0,
            readout_window_ticks_after: 0,
            print_tp_info: false,
        }
    }
}

impl TriggerConfig {
    /// Activity-level defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate-level defaults: no threshold enabled (one candidate per
    /// activity), wider window, higher thresholds.
    #[must_use]
    pub fn candidate_defaults() -> Self {
        Self {
            trigger_on_adjacency: false,
            adc_threshold: 1_200_000,
            n_channels_threshold: 600,
            window_length: 80_000,
            ..Self::default()
        }
    }

    /// Overlays a JSON object on top of `self`, validating every key.
    ///
    /// On error `self` is left untouched and every rejected key is reported.
    pub fn apply_json(&mut self, value: &Value) -> Result<()> {
        let Value::Object(map) = value else {
            return Err(Error::ConfigNotObject(json_kind(value)));
        };

        let mut staged = self.clone();
        let mut rejected = Vec::new();

        for (key, v) in map {
            let outcome = match key.as_str() {
                "trigger_on_adc" => parse_bool(v).map(|b| staged.trigger_on_adc = b),
                "trigger_on_n_channels" => {
                    parse_bool(v).map(|b| staged.trigger_on_n_channels = b)
                }
                "trigger_on_adjacency" => parse_bool(v).map(|b| staged.trigger_on_adjacency = b),
                "trigger_on_tot" => parse_bool(v).map(|b| staged.trigger_on_tot = b),
                "print_tp_info" => parse_bool(v).map(|b| staged.print_tp_info = b),
                "adc_threshold" => parse_uint(v).map(|n| staged.adc_threshold = n),
                "n_channels_threshold" => parse_uint(v).map(|n| staged.n_channels_threshold = n),
                "adjacency_threshold" => parse_uint(v).map(|n| staged.adjacency_threshold = n),
                "adj_tolerance" => parse_uint(v).map(|n| staged.adj_tolerance = n),
                "tot_threshold" => parse_uint(v).map(|n| staged.tot_threshold = n),
                "prescale" => parse_uint(v).map(|n| staged.prescale = n),
                "bundle_size" => parse_uint(v).map(|n| staged.bundle_size = n),
                "activity_threshold" => parse_uint(v).map(|n| staged.activity_threshold = n),
                "hit_threshold" => parse_uint(v).map(|n| staged.hit_threshold = n),
                "window_length" => parse_ticks(v).map(|t| staged.window_length = t),
                "readout_window_ticks_before" => {
                    parse_ticks(v).map(|t| staged.readout_window_ticks_before = t)
                }
                "readout_window_ticks_after" => {
                    parse_ticks(v).map(|t| staged.readout_window_ticks_after = t)
                }
                "adj_tolerance_rule" => v
                    .as_str()
                    .ok_or_else(|| format!("expected a string, got {}", json_kind(v)))
                    .and_then(ToleranceRule::from_str)
                    .map(|rule| staged.adj_tolerance_rule = Some(rule)),
                _ => Err("unknown key".to_string()),
            };
            if let Err(reason) = outcome {
                rejected.push(RejectedKey::new(key.as_str(), reason));
            }
        }

        staged.check_ranges(&mut rejected);

        if rejected.is_empty() {
            *self = staged;
            Ok(())
        } else {
            Err(Error::InvalidConfig(RejectedKeys(rejected)))
        }
    }

    /// Builds a configuration from `defaults` overlaid with `value`.
    pub fn from_json_with(defaults: Self, value: &Value) -> Result<Self> {
        let mut config = defaults;
        config.apply_json(value)?;
        Ok(config)
    }

    /// Checks value ranges of a programmatically built configuration.
    pub fn validate(&self) -> Result<()> {
        let mut rejected = Vec::new();
        self.check_ranges(&mut rejected);
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(RejectedKeys(rejected)))
        }
    }

    fn check_ranges(&self, rejected: &mut Vec<RejectedKey>) {
        if self.prescale == 0 {
            rejected.push(RejectedKey::new("prescale", "must be at least 1"));
        }
        if self.bundle_size == 0 {
            rejected.push(RejectedKey::new("bundle_size", "must be at least 1"));
        }
        if self.window_length <= 0 {
            rejected.push(RejectedKey::new("window_length", "must be positive"));
        }
        if self.readout_window_ticks_before < 0 {
            rejected.push(RejectedKey::new(
                "readout_window_ticks_before",
                "must not be negative",
            ));
        }
        if self.readout_window_ticks_after < 0 {
            rejected.push(RejectedKey::new(
                "readout_window_ticks_after",
                "must not be negative",
            ));
        }
        rejected.sort_by(|a, b| a.key.cmp(&b.key));
    }

    /// Names of the enabled trigger flags, in evaluation order.
    #[must_use]
    pub fn enabled_triggers(&self) -> Vec<&'static str> {
        [
            (self.trigger_on_adc, "trigger_on_adc"),
            (self.trigger_on_n_channels, "trigger_on_n_channels"),
            (self.trigger_on_adjacency, "trigger_on_adjacency"),
            (self.trigger_on_tot, "trigger_on_tot"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect()
    }

    /// Disables every trigger flag.
    #[must_use]
    pub fn without_triggers(mut self) -> Self {
        self.trigger_on_adc = false;
        self.trigger_on_n_channels = false;
        self.trigger_on_adjacency = false;
        self.trigger_on_tot = false;
        self
    }

    /// Enables the ADC-sum trigger.
    #[must_use]
    pub fn with_adc_trigger(mut self, threshold: u64) -> Self {
        self.trigger_on_adc = true;
        self.adc_threshold = threshold;
        self
    }

    /// Enables the channel-multiplicity trigger.
    #[must_use]
    pub fn with_n_channels_trigger(mut self, threshold: u32) -> Self {
        self.trigger_on_n_channels = true;
        self.n_channels_threshold = threshold;
        self
    }

    /// Enables the adjacency trigger.
    #[must_use]
    pub fn with_adjacency_trigger(mut self, threshold: u16, tolerance: u16) -> Self {
        self.trigger_on_adjacency = true;
        self.adjacency_threshold = threshold;
        self.adj_tolerance = tolerance;
        self
    }

    /// Enables the time-over-threshold trigger.
    #[must_use]
    pub fn with_tot_trigger(mut self, threshold: u32) -> Self {
        self.trigger_on_tot = true;
        self.tot_threshold = threshold;
        self
    }

    /// Sets the tolerance consumption rule.
    #[must_use]
    pub fn with_tolerance_rule(mut self, rule: ToleranceRule) -> Self {
        self.adj_tolerance_rule = Some(rule);
        self
    }

    /// Sets the window length.
    #[must_use]
    pub fn with_window_length(mut self, ticks: Timestamp) -> Self {
        self.window_length = ticks;
        self
    }

    /// Sets the prescale.
    #[must_use]
    pub fn with_prescale(mut self, prescale: u64) -> Self {
        self.prescale = prescale;
        self
    }

    /// Sets the bundle size.
    #[must_use]
    pub fn with_bundle_size(mut self, size: usize) -> Self {
        self.bundle_size = size;
        self
    }

    /// Sets the burst thresholds: buffered activities, and primitives per activity.
    #[must_use]
    pub fn with_burst_thresholds(mut self, activities: usize, hits: usize) -> Self {
        self.activity_threshold = activities;
        self.hit_threshold = hits;
        self
    }

    /// Sets the readout margins.
    #[must_use]
    pub fn with_readout_window(mut self, before: Timestamp, after: Timestamp) -> Self {
        self.readout_window_ticks_before = before;
        self.readout_window_ticks_after = after;
        self
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_bool(value: &Value) -> std::result::Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("expected a boolean, got {}", json_kind(value)))
}

fn parse_uint<T: TryFrom<u64>>(value: &Value) -> std::result::Result<T, String> {
    let raw = value
        .as_u64()
        .ok_or_else(|| format!("expected a non-negative integer, got {}", json_kind(value)))?;
    T::try_from(raw).map_err(|_| format!("value {raw} is out of range"))
}

fn parse_ticks(value: &Value) -> std::result::Result<Timestamp, String> {
    value
        .as_i64()
        .ok_or_else(|| format!("expected an integer tick count, got {}", json_kind(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = TriggerConfig::new();
        assert!(config.trigger_on_adjacency);
        assert_eq!(config.enabled_triggers(), vec!["trigger_on_adjacency"]);
        assert_eq!(config.window_length, 8000);
        assert!(config.validate().is_ok());

        let tc = TriggerConfig::candidate_defaults();
        assert!(tc.enabled_triggers().is_empty());
        assert_eq!(tc.window_length, 80_000);
    }

    #[test]
    fn test_apply_json_overlays_known_keys() {
        let config = TriggerConfig::from_json_with(
            TriggerConfig::default(),
            &json!({
                "trigger_on_n_channels": true,
                "n_channels_threshold": 5,
                "window_length": 60,
                "adj_tolerance_rule": "flat",
                "readout_window_ticks_before": 1000
            }),
        )
        .unwrap();

        assert!(config.trigger_on_n_channels);
        assert_eq!(config.n_channels_threshold, 5);
        assert_eq!(config.window_length, 60);
        assert_eq!(config.adj_tolerance_rule, Some(ToleranceRule::Flat));
        assert_eq!(config.readout_window_ticks_before, 1000);
        // untouched
        assert_eq!(config.activity_threshold, 6);
        assert_eq!(config.adjacency_threshold, 15);
    }

    #[test]
    fn test_apply_json_reports_every_rejected_key() {
        let mut config = TriggerConfig::default();
        let err = config
            .apply_json(&json!({
                "trigger_on_adc": "yes",
                "adjacency_threshold": 70000,
                "prescale": 0,
                "windowlength": 10,
                "adj_tolerance_rule": "sometimes"
            }))
            .unwrap_err();

        let keys: Vec<_> = err.rejected_keys().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys.len(), 5, "{err}");
        for key in [
            "trigger_on_adc",
            "adjacency_threshold",
            "prescale",
            "windowlength",
            "adj_tolerance_rule",
        ] {
            assert!(keys.contains(&key), "missing {key} in {err}");
        }
        // Failed overlay leaves the configuration untouched.
        assert_eq!(config, TriggerConfig::default());
    }

    #[test]
    fn test_burst_threshold_keys() {
        let config = TriggerConfig::from_json_with(
            TriggerConfig::candidate_defaults(),
            &json!({"activity_threshold": 2, "hit_threshold": 0}),
        )
        .unwrap();
        assert_eq!((config.activity_threshold, config.hit_threshold), (2, 0));

        let err = TriggerConfig::default()
            .apply_json(&json!({"hit_threshold": -1}))
            .unwrap_err();
        assert_eq!(err.rejected_keys()[0].key, "hit_threshold");
    }

    #[test]
    fn test_non_object_is_rejected() {
        let mut config = TriggerConfig::default();
        assert!(matches!(
            config.apply_json(&json!([1, 2])),
            Err(Error::ConfigNotObject("an array"))
        ));
    }

    #[test]
    fn test_tolerance_rule_costs() {
        assert_eq!(ToleranceRule::MissingWires.cost(2), 1);
        assert_eq!(ToleranceRule::MissingWires.cost(5), 4);
        assert_eq!(ToleranceRule::GapWidth.cost(3), 3);
        assert_eq!(ToleranceRule::Flat.cost(4), 1);
        assert_eq!("gap_width".parse::<ToleranceRule>(), Ok(ToleranceRule::GapWidth));
    }
}
