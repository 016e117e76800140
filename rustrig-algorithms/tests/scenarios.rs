#![allow(clippy::uninlined_format_args)]
use rustrig_algorithms::{
    AdjacencyScanner, BundleCandidateMaker, GeometryTrigger, HorizontalMuonActivityMaker, Maker,
    MakerRegistry, MichelElectronActivityMaker, ShapeTrigger, ToleranceRule, TriggerConfig,
};
use rustrig_core::{Activity, ActivityAlgorithm, Primitive};
use serde_json::json;

#[test]
fn test_adjacency_fixture() {
    let fixture = [9, 5, 3, 2, 1];
    let cases = [
        (3, ToleranceRule::GapWidth, 5),
        (3, ToleranceRule::MissingWires, 5),
        (3, ToleranceRule::Flat, 5),
        (2, ToleranceRule::GapWidth, 4),
        (2, ToleranceRule::MissingWires, 5),
        (2, ToleranceRule::Flat, 5),
    ];
    for (budget, rule, expected) in cases {
        let got = AdjacencyScanner::new(budget, rule).longest_run(fixture);
        assert_eq!(got, expected, "budget {} rule {}", budget, rule);
    }
}

#[test]
fn test_multiplicity_scenario() {
    let config = TriggerConfig::default()
        .without_triggers()
        .with_n_channels_trigger(5)
        .with_window_length(60);
    let mut maker = HorizontalMuonActivityMaker::new(GeometryTrigger::new(config));

    let mut out = Vec::new();
    for i in 0..7_u32 {
        maker.process(&Primitive::new(i, i64::from(i) * 10, 100), &mut out);
        if i < 6 {
            assert!(out.is_empty(), "emitted early at primitive {}", i + 1);
        }
    }

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].adc_integral, 600);
    assert_eq!(out[0].inputs.len(), 6);
    assert_eq!(out[0].time_start, 0);
    assert_eq!(out[0].time_end, 50);
    assert_eq!(maker.window().len(), 1);
    assert_eq!(maker.window().time_start(), 60);
}

#[test]
fn test_bragg_scenario_through_registry() {
    let registry = MakerRegistry::with_builtin();
    let mut maker = registry
        .activity_maker(
            "michel_electron",
            &json!({"adjacency_threshold": 15, "window_length": 500}),
        )
        .unwrap();

    let mut out = Vec::new();
    for i in 0..20_u32 {
        let adc = 10 * (i + 1);
        let tp = Primitive::new(300 + i, 1000 + i64::from(i) * 5, adc).with_adc_peak(adc);
        maker.process(&tp, &mut out);
    }
    assert!(out.is_empty());

    maker.process(&Primitive::new(5, 2000, 10), &mut out);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].algorithm, ActivityAlgorithm::MichelElectron);
    assert_eq!(out[0].channel_peak, 319);
    assert_eq!(maker.statistics().max_adjacency, 20);
}

#[test]
fn test_flat_charge_profile_is_rejected() {
    let config = TriggerConfig::default().with_window_length(500);
    let mut maker = MichelElectronActivityMaker::new(ShapeTrigger::new(config));

    let mut out = Vec::new();
    for i in 0..20_u32 {
        maker.process(&Primitive::new(300 + i, i64::from(i), 80), &mut out);
    }
    maker.process(&Primitive::new(5, 2000, 10), &mut out);
    assert!(out.is_empty());
    assert_eq!(maker.statistics().triggers_fired, 0);
}

#[test]
fn test_bundle_scenario() {
    let mut maker = BundleCandidateMaker::new(3, 1);
    let mut out = Vec::new();
    for i in 0..9_u32 {
        let ta = Activity::from_primitive(
            &Primitive::new(i, i64::from(i), 1),
            ActivityAlgorithm::Prescale,
        );
        maker.process(&ta, &mut out);
        assert_eq!(out.len(), ((i + 1) / 3) as usize);
    }

    for (n, tc) in out.iter().enumerate() {
        let channels: Vec<u32> = tc.inputs.iter().map(|ta| ta.channel_start).collect();
        let first = u32::try_from(n).unwrap() * 3;
        assert_eq!(channels, vec![first, first + 1, first + 2]);
    }
}
