use proptest::prelude::*;
use vetune_core::axis::locate;
use vetune_core::trace::trace;
use vetune_core::{
    AfrTargetTable, BinAxis, CORRECTION_MAX, CORRECTION_MIN, EngineConfig, EnginePreset,
    OperatingPoint, Tick, VeSession,
};

fn custom_rpm_axis() -> BinAxis {
    EngineConfig::from_preset(EnginePreset::Custom).rpm_axis
}

proptest! {
    // Floor index stays in range and the fraction in [0, 1] for any input.
    #[test]
    fn locate_is_bounded(v in -1.0e5f64..1.0e5) {
        let axis = custom_rpm_axis();
        let (i, f) = locate(&axis, v);
        prop_assert!(i <= axis.last_index());
        prop_assert!((0.0..=1.0).contains(&f));
    }

    // Interior values sit between their floor breakpoint and the next one.
    #[test]
    fn locate_brackets_interior_values(v in 1000.0f64..10000.0) {
        let axis = custom_rpm_axis();
        let (i, f) = locate(&axis, v);
        let bins = axis.as_slice();
        prop_assert!(bins[i] <= v);
        prop_assert!(v < bins[i + 1]);
        let back = bins[i] + f * (bins[i + 1] - bins[i]);
        prop_assert!((back - v).abs() < 1e-6);
    }

    // Pruned corners each weigh at most 0.01, so an interior trace keeps
    // nearly all of its weight and never exceeds 1.
    #[test]
    fn interior_trace_weight_is_bounded(
        rpm in 1000.0f64..10000.0,
        map in 20.0f64..110.0,
    ) {
        let cfg = EngineConfig::from_preset(EnginePreset::Custom);
        let t = trace(&cfg, &OperatingPoint::new(rpm, map, 13.0));
        let w = t.total_weight();
        prop_assert!(w > 0.96, "weight {w} at rpm={rpm} map={map}");
        prop_assert!(w <= 1.0 + 1e-9);
        for c in &t.active_cells {
            prop_assert!(c.weight > 0.01 && c.weight <= 1.0);
        }
    }

    // Whatever the samples and targets, corrections stay within the band.
    #[test]
    fn corrections_stay_clamped(
        samples in prop::collection::vec(
            (800.0f64..12000.0, 10.0f64..130.0, 8.01f64..19.99),
            1..200,
        ),
        low_target in 9.0f64..16.0,
        high_target in 9.0f64..16.0,
    ) {
        let targets = AfrTargetTable::new([(40.0, low_target), (90.0, high_target)]).unwrap();
        let mut s = VeSession::builder()
            .with_preset(EnginePreset::Custom)
            .with_targets(targets)
            .build()
            .unwrap();
        for (rpm, map, afr) in samples {
            s.tick(&Tick::live(OperatingPoint::new(rpm, map, afr)));
        }
        for c in s.correction_grid().iter() {
            prop_assert!((CORRECTION_MIN..=CORRECTION_MAX).contains(c), "correction {c}");
        }
    }

    // Repeated identical samples on a breakpoint converge to the clamped ratio.
    #[test]
    fn constant_afr_converges_to_ratio(afr in 8.5f64..19.5, target in 10.0f64..16.0) {
        let targets = AfrTargetTable::new([(50.0, target)]).unwrap();
        let mut s = VeSession::builder()
            .with_preset(EnginePreset::Custom)
            .with_targets(targets)
            .build()
            .unwrap();
        for _ in 0..5 {
            s.tick(&Tick::live(OperatingPoint::new(3000.0, 50.0, afr)));
        }
        let got = *s.correction_grid().get(2, 3).unwrap();
        let want = (afr / target).clamp(CORRECTION_MIN, CORRECTION_MAX);
        prop_assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
    }
}

#[test]
fn breakpoints_snap_exactly() {
    let axis = custom_rpm_axis();
    for (i, &b) in axis.as_slice().iter().enumerate() {
        assert_eq!(locate(&axis, b), (i, 0.0));
    }
}

#[test]
fn out_of_range_clamps_to_ends() {
    let axis = custom_rpm_axis();
    assert_eq!(locate(&axis, 200.0), (0, 0.0));
    assert_eq!(locate(&axis, 25_000.0), (axis.last_index(), 0.0));
}
