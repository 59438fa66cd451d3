#![no_main]
use libfuzzer_sys::fuzz_target;
use vetune_core::{AfrTargetTable, EngineConfig, TuningCfg, VeSession};

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also convert and build a session.
    let Ok(cfg) = toml::from_str::<vetune_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let engine = EngineConfig::try_from(&cfg.engine).expect("validated engine converts");
    let targets = AfrTargetTable::try_from(&cfg.targets).expect("validated targets convert");
    VeSession::builder()
        .with_config(engine)
        .with_targets(targets)
        .with_tuning(TuningCfg::from(&cfg.gates))
        .build()
        .expect("validated config builds a session");
});
