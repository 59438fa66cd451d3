//! Text and JSON rendering of session snapshots.

use serde_json::{Value, json};
use std::fmt::Write as _;
use vetune_core::runner::{RunEnd, RunSummary};
use vetune_core::{Grid, VeSnapshot};

/// Correction grid as a fixed-width table. Cells without a single hit show
/// `.` so untouched regions stand out from cells that settled at 1.000.
pub fn correction_table(snap: &VeSnapshot) -> String {
    let mut out = String::new();
    let _ = write!(out, "{:>7}", "rpm\\kPa");
    for m in &snap.map_bins {
        let _ = write!(out, " {m:>6.0}");
    }
    out.push('\n');
    for (r, rpm) in snap.rpm_bins.iter().enumerate() {
        let _ = write!(out, "{rpm:>7.0}");
        for c in 0..snap.map_bins.len() {
            let hits = snap.hits.get(r, c).copied().unwrap_or(0);
            match snap.correction.get(r, c) {
                Some(v) if hits > 0 => {
                    let _ = write!(out, " {v:>6.3}");
                }
                _ => {
                    let _ = write!(out, " {:>6}", ".");
                }
            }
        }
        out.push('\n');
    }
    out
}

pub fn end_name(end: RunEnd) -> &'static str {
    match end {
        RunEnd::EndOfStream => "end_of_stream",
        RunEnd::Shutdown => "shutdown",
    }
}

fn grid_rows<T: Copy + Into<Value>>(g: &Grid<T>) -> Vec<Vec<Value>> {
    (0..g.rows())
        .map(|r| g.row(r).unwrap_or(&[]).iter().map(|&v| v.into()).collect())
        .collect()
}

/// One JSON line describing a finished replay.
pub fn snapshot_json(snap: &VeSnapshot, summary: &RunSummary, timestamp: i64) -> Value {
    let trace = snap.active_trace.as_ref().map(|t| {
        json!({
            "rpm_idx": t.rpm_idx,
            "map_idx": t.map_idx,
            "rpm_frac": t.rpm_frac,
            "map_frac": t.map_frac,
            "cells": t.active_cells.iter().map(|c| json!({
                "rpm_idx": c.rpm_idx,
                "map_idx": c.map_idx,
                "weight": c.weight,
            })).collect::<Vec<_>>(),
        })
    });
    json!({
        "timestamp": timestamp,
        "preset": snap.preset,
        "end": end_name(summary.end),
        "duration_ms": summary.elapsed_ms,
        "ticks": summary.stats.ticks,
        "accumulated": summary.stats.accumulated,
        "rejected": summary.stats.rejected,
        "traced_only": summary.stats.traced_only,
        "idle": summary.stats.idle,
        "total_hits": snap.total_hits,
        "rpm_bins": snap.rpm_bins,
        "map_bins": snap.map_bins,
        "correction": grid_rows(&snap.correction),
        "hits": grid_rows(&snap.hits),
        "active_trace": trace,
    })
}

/// Correction grid as CSV with the same `rpm,<map...>` layout the target
/// grid loader accepts.
pub fn correction_csv(snap: &VeSnapshot) -> eyre::Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["rpm".to_string()];
    header.extend(snap.map_bins.iter().map(|m| format!("{m}")));
    w.write_record(&header)?;
    for (r, rpm) in snap.rpm_bins.iter().enumerate() {
        let mut rec = vec![format!("{rpm}")];
        rec.extend(
            snap.correction
                .row(r)
                .unwrap_or(&[])
                .iter()
                .map(|v| format!("{v:.4}")),
        );
        w.write_record(&rec)?;
    }
    w.into_inner()
        .map_err(|e| eyre::eyre!("flush correction CSV: {}", e.error()))
}
