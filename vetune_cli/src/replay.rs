//! Session assembly from config and files, and the replay command.

use crate::render;
use eyre::WrapErr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use vetune_config::Config;
use vetune_core::error::Result as CoreResult;
use vetune_core::replay::ReplayTelemetry;
use vetune_core::runner::{RunParams, RunSummary, SamplingMode};
use vetune_core::{AfrTargetTable, EngineConfig, EnginePreset, SamplerCfg, TuningCfg, VeSession};

/// Where target AFRs come from; file flags win over the config table.
#[derive(Debug, Clone, Default)]
pub struct TargetSource {
    pub csv: Option<PathBuf>,
    pub grid: Option<PathBuf>,
}

pub fn load_targets(cfg: &Config, src: &TargetSource) -> eyre::Result<AfrTargetTable> {
    let table = if let Some(path) = &src.csv {
        let rows = vetune_config::load_targets_csv(path)?;
        AfrTargetTable::try_from(rows.as_slice())?
    } else if let Some(path) = &src.grid {
        let grid = vetune_config::load_target_grid_csv(path)?;
        AfrTargetTable::try_from(&grid)?
    } else {
        return AfrTargetTable::try_from(&cfg.targets);
    };
    table.with_fallback(cfg.targets.fallback_afr)
}

/// Build a session from the typed config, optional preset override, and targets.
pub fn build_session(
    cfg: &Config,
    preset: Option<&str>,
    targets: AfrTargetTable,
) -> CoreResult<VeSession> {
    let engine = match preset {
        Some(name) => EngineConfig::from_preset(name.parse::<EnginePreset>()?),
        None => EngineConfig::try_from(&cfg.engine)?,
    };
    let tuning = TuningCfg::from(&cfg.gates);
    VeSession::builder()
        .with_config(engine)
        .with_targets(targets)
        .with_tuning(tuning)
        .build()
}

#[derive(Debug)]
pub struct ReplayOpts<'a> {
    pub log: &'a Path,
    pub hz: Option<u32>,
    pub direct: bool,
    pub out: Option<&'a Path>,
}

/// Replay a telemetry CSV through `session`; writes the grid CSV when asked.
pub fn run_replay(
    cfg: &Config,
    session: &mut VeSession,
    opts: &ReplayOpts<'_>,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    let rows = vetune_config::load_telemetry_csv(opts.log)?;
    tracing::info!(rows = rows.len(), log = ?opts.log, "telemetry log loaded");
    let source = ReplayTelemetry::from_rows(&rows);

    let sampler = SamplerCfg::from(&cfg.sampler);
    let mode = if opts.direct {
        SamplingMode::Direct
    } else {
        SamplingMode::Paced(opts.hz.unwrap_or(sampler.poll_hz))
    };
    let summary = vetune_core::runner::run(
        source,
        session,
        RunParams {
            mode,
            read_timeout_ms: sampler.read_timeout_ms,
            poll_hz: sampler.poll_hz,
            shutdown,
        },
    )?;

    if let Some(out) = opts.out {
        let bytes = render::correction_csv(&session.snapshot())?;
        vetune_core::atomic::write_atomic(out, &bytes)
            .wrap_err_with(|| format!("write correction grid to {}", out.display()))?;
        tracing::info!(path = %out.display(), "correction grid written");
    }
    Ok(summary)
}

/// Print per-outcome tick counts to stderr.
pub fn print_stats(summary: &RunSummary) {
    let s = summary.stats;
    eprintln!("\n--- Replay Stats ---");
    eprintln!("Ticks: {}", s.ticks);
    eprintln!("Accumulated: {}", s.accumulated);
    eprintln!("Traced only (below accumulation floor): {}", s.traced_only);
    eprintln!("Rejected (AFR out of range): {}", s.rejected);
    eprintln!("Idle (paused or below live floor): {}", s.idle);
    eprintln!("Duration (ms): {}", summary.elapsed_ms);
    eprintln!("--------------------\n");
}
