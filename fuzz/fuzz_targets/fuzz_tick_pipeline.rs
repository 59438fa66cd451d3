#![no_main]
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vetune_core::{
    CORRECTION_MAX, CORRECTION_MIN, EnginePreset, OperatingPoint, Tick, VeSession,
};

#[derive(Debug, Arbitrary)]
struct Sample {
    rpm: f64,
    map_kpa: f64,
    afr: f64,
    live: bool,
}

fuzz_target!(|input: (u8, Vec<Sample>)| {
    let preset = EnginePreset::ALL[usize::from(input.0) % EnginePreset::ALL.len()];
    let mut s = VeSession::new(preset);
    for smp in &input.1 {
        let point = OperatingPoint::new(smp.rpm, smp.map_kpa, smp.afr);
        s.tick(&Tick { point, live: smp.live });
    }
    for c in s.correction_grid().iter() {
        assert!((CORRECTION_MIN..=CORRECTION_MAX).contains(c));
    }
});
