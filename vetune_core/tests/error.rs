use vetune_core::error::VeError;
use vetune_core::{AfrTargetTable, BinAxis, EngineConfig, EnginePreset};

#[test]
fn non_monotonic_axis_maps_to_invalid_axis() {
    let err = EngineConfig::custom(vec![1000.0, 3000.0, 2000.0], vec![20.0, 40.0], None)
        .expect_err("axis must be strictly increasing");
    match err.downcast_ref::<VeError>() {
        Some(VeError::InvalidAxis(msg)) => assert!(!msg.is_empty()),
        other => panic!("expected InvalidAxis, got: {other:?}"),
    }
}

#[test]
fn empty_axis_maps_to_invalid_axis() {
    let err = BinAxis::new(Vec::new()).expect_err("empty axis");
    assert!(matches!(
        err.downcast_ref::<VeError>(),
        Some(VeError::InvalidAxis(_))
    ));
}

#[test]
fn unknown_preset_name_is_typed() {
    let err = "flathead".parse::<EnginePreset>().unwrap_err();
    assert_eq!(err, VeError::UnknownPreset("flathead".into()));
    assert!(err.to_string().contains("flathead"));
}

#[test]
fn zero_target_is_rejected() {
    let err = AfrTargetTable::new([(50.0, 13.5), (60.0, 0.0)]).expect_err("zero target");
    match err.downcast_ref::<VeError>() {
        Some(VeError::InvalidTarget { map_kpa, afr }) => {
            assert_eq!(*map_kpa, 60.0);
            assert_eq!(*afr, 0.0);
        }
        other => panic!("expected InvalidTarget, got: {other:?}"),
    }
}

#[test]
fn non_finite_target_is_rejected() {
    assert!(AfrTargetTable::new([(50.0, f64::INFINITY)]).is_err());
    assert!(AfrTargetTable::new([(f64::NAN, 13.0)]).is_err());
    assert!(AfrTargetTable::new([(50.0, -13.0)]).is_err());
}

#[test]
fn bad_fallback_is_config_error() {
    let err = AfrTargetTable::default()
        .with_fallback(0.0)
        .expect_err("zero fallback");
    assert!(matches!(
        err.downcast_ref::<VeError>(),
        Some(VeError::Config(_))
    ));
}
