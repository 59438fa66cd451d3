mod cli;
mod error_fmt;
mod render;
mod replay;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::replay::{ReplayOpts, TargetSource};
use clap::Parser;
use eyre::WrapErr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use vetune_config::Config;
use vetune_core::{EngineConfig, EnginePreset, OperatingPoint, Tick};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    let targets = TargetSource {
        csv: cli.targets.clone(),
        grid: cli.target_grid.clone(),
    };

    match cli.cmd {
        Commands::Replay {
            ref log,
            hz,
            direct,
            ref out,
            stats,
        } => {
            let table = replay::load_targets(&cfg, &targets)?;
            let mut session = replay::build_session(&cfg, cli.preset.as_deref(), table)?;

            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = shutdown.clone();
                ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                    .wrap_err("install Ctrl-C handler")?;
            }

            let opts = ReplayOpts {
                log,
                hz,
                direct,
                out: out.as_deref(),
            };
            let summary = replay::run_replay(&cfg, &mut session, &opts, shutdown)?;
            let snap = session.snapshot();

            if stats {
                replay::print_stats(&summary);
            }
            if cli.json {
                let ts = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
                    .unwrap_or(0);
                println!("{}", render::snapshot_json(&snap, &summary, ts));
            } else {
                print!("{}", render::correction_table(&snap));
                println!(
                    "Replay {}: {} ticks, {} accumulated, {} cell hits ({}).",
                    render::end_name(summary.end),
                    summary.stats.ticks,
                    summary.stats.accumulated,
                    snap.total_hits,
                    snap.preset
                );
            }
            Ok(())
        }
        Commands::Presets => {
            print_presets(cli.json);
            Ok(())
        }
        Commands::SelfCheck => self_check(&cfg, cli.preset.as_deref(), &targets, cli.json),
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            toml::from_str::<Config>(&text)
                .wrap_err_with(|| format!("parse config {}", p.display()))?
        }
        None => Config::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &vetune_config::Logging) -> eyre::Result<()> {
    // RUST_LOG wins over --log-level for the console.
    let console_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let (console_json, console_pretty) = if json {
        let layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter);
        (None, Some(layer))
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file must name a file, got '{file}'"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_json)
        .with(console_pretty)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

fn print_presets(json: bool) {
    for p in EnginePreset::ALL {
        let cfg = EngineConfig::from_preset(p);
        let (rows, cols) = cfg.dims();
        let rpm = cfg.rpm_axis.as_slice();
        let map = cfg.map_axis.as_slice();
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "preset": p.name(),
                    "rows": rows,
                    "cols": cols,
                    "max_rpm": cfg.max_rpm,
                    "rpm_bins": rpm,
                    "map_bins": map,
                })
            );
        } else {
            println!(
                "{:<15} {rows:>2} x {cols:<2} rpm {:.0}..{:.0}  map {:.0}..{:.0} kPa  max {:.0} rpm",
                p.name(),
                rpm[0],
                rpm[rows - 1],
                map[0],
                map[cols - 1],
                cfg.max_rpm
            );
        }
    }
}

fn self_check(
    cfg: &Config,
    preset: Option<&str>,
    targets: &TargetSource,
    json: bool,
) -> eyre::Result<()> {
    let table = replay::load_targets(cfg, targets)?;
    let n_targets = table.points().len();
    let mut session = replay::build_session(cfg, preset, table)?;
    let (rows, cols) = session.config().dims();
    let mid_rpm = session.config().rpm_axis.as_slice()[rows / 2];
    let mid_map = session.config().map_axis.as_slice()[cols / 2];
    let status = session.tick(&Tick::live(OperatingPoint::new(mid_rpm, mid_map, 13.0)));
    tracing::debug!(?status, "self-check tick");
    if session.active_trace().is_none() {
        eyre::bail!("self-check tick at {mid_rpm} rpm / {mid_map} kPa produced no trace");
    }
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "preset": session.config().name,
                "rows": rows,
                "cols": cols,
                "targets": n_targets,
            })
        );
    } else {
        println!(
            "OK: preset {} ({rows} x {cols}), {n_targets} target points",
            session.config().name
        );
    }
    Ok(())
}
