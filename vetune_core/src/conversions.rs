//! Bridges from `vetune_config` types to `vetune_core` types.

use crate::config::{SamplerCfg, TuningCfg};
use crate::error::{Report, Result};
use crate::preset::{EngineConfig, EnginePreset};
use crate::target::AfrTargetTable;
use vetune_config::{PresetName, TelemetryRow};
use vetune_traits::{OperatingPoint, Tick};

// ── Gates ────────────────────────────────────────────────────────────────────

impl From<&vetune_config::Gates> for TuningCfg {
    fn from(g: &vetune_config::Gates) -> Self {
        Self {
            live_rpm_floor: g.live_rpm_floor,
            accumulate_rpm_floor: g.accumulate_rpm_floor,
            afr_min: g.afr_min,
            afr_max: g.afr_max,
            corner_weight_min: g.corner_weight_min,
            significance_weight: g.significance_weight,
            min_effective_samples: g.min_effective_samples,
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

impl From<PresetName> for EnginePreset {
    fn from(p: PresetName) -> Self {
        match p {
            PresetName::HarleyM8 => Self::HarleyM8,
            PresetName::HarleyTc => Self::HarleyTc,
            PresetName::Sportbike600 => Self::Sportbike600,
            PresetName::Sportbike1000 => Self::Sportbike1000,
            PresetName::Custom => Self::Custom,
        }
    }
}

/// Built-in presets map directly. `custom` takes its axes from the file and
/// falls back to the built-in custom layout for any axis left out.
impl TryFrom<&vetune_config::EngineCfg> for EngineConfig {
    type Error = Report;

    fn try_from(c: &vetune_config::EngineCfg) -> Result<Self> {
        let preset = EnginePreset::from(c.preset);
        if preset != EnginePreset::Custom
            || (c.rpm_bins.is_none() && c.map_bins.is_none() && c.max_rpm.is_none())
        {
            return Ok(Self::from_preset(preset));
        }
        let base = Self::from_preset(EnginePreset::Custom);
        let rpm = c
            .rpm_bins
            .clone()
            .unwrap_or_else(|| base.rpm_axis.as_slice().to_vec());
        let map = c
            .map_bins
            .clone()
            .unwrap_or_else(|| base.map_axis.as_slice().to_vec());
        Self::custom(rpm, map, c.max_rpm)
    }
}

// ── Targets ──────────────────────────────────────────────────────────────────

impl TryFrom<&vetune_config::TargetsCfg> for AfrTargetTable {
    type Error = Report;

    fn try_from(c: &vetune_config::TargetsCfg) -> Result<Self> {
        Self::new(c.table.iter().copied())?.with_fallback(c.fallback_afr)
    }
}

impl TryFrom<&[vetune_config::TargetRow]> for AfrTargetTable {
    type Error = Report;

    fn try_from(rows: &[vetune_config::TargetRow]) -> Result<Self> {
        Self::new(rows.iter().map(|r| (r.map_kpa, r.afr)))
    }
}

impl TryFrom<&vetune_config::TargetGrid> for AfrTargetTable {
    type Error = Report;

    fn try_from(g: &vetune_config::TargetGrid) -> Result<Self> {
        let rows: Vec<&[f64]> = g.rows.iter().map(|(_, r)| r.as_slice()).collect();
        Self::from_grid(&g.map_keys, &rows)
    }
}

// ── Sampler ──────────────────────────────────────────────────────────────────

impl From<&vetune_config::SamplerCfg> for SamplerCfg {
    fn from(c: &vetune_config::SamplerCfg) -> Self {
        Self {
            poll_hz: c.poll_hz,
            read_timeout_ms: c.read_timeout_ms,
        }
    }
}

// ── Telemetry ────────────────────────────────────────────────────────────────

/// One CSV telemetry row as a tick. A missing `live` column means live.
pub fn tick_from_row(r: &TelemetryRow) -> Tick {
    Tick {
        point: OperatingPoint::new(r.rpm, r.map_kpa, r.afr),
        live: r.is_live(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_engine_fills_missing_axis_from_builtin_layout() {
        let cfg = vetune_config::EngineCfg {
            preset: PresetName::Custom,
            rpm_bins: Some(vec![1000.0, 2000.0, 3000.0]),
            map_bins: None,
            max_rpm: None,
        };
        let engine = EngineConfig::try_from(&cfg).unwrap();
        assert_eq!(engine.dims(), (3, 10));
        assert_eq!(engine.max_rpm, 3000.0);
    }

    #[test]
    fn builtin_preset_maps_directly() {
        let cfg = vetune_config::EngineCfg {
            preset: PresetName::HarleyM8,
            ..Default::default()
        };
        let engine = EngineConfig::try_from(&cfg).unwrap();
        assert_eq!(engine, EngineConfig::from_preset(EnginePreset::HarleyM8));
    }

    #[test]
    fn targets_section_carries_fallback() {
        let cfg = vetune_config::TargetsCfg {
            fallback_afr: 13.2,
            table: vec![(60.0, 13.0), (40.0, 14.2)],
        };
        let t = AfrTargetTable::try_from(&cfg).unwrap();
        assert_eq!(t.points(), &[(40.0, 14.2), (60.0, 13.0)]);
        assert_eq!(t.fallback_afr(), 13.2);
    }

    #[test]
    fn grid_targets_average_columns() {
        let g = vetune_config::TargetGrid {
            map_keys: vec![40.0, 80.0],
            rows: vec![(1000.0, vec![14.0, 12.8]), (2000.0, vec![13.0, f64::NAN])],
        };
        let t = AfrTargetTable::try_from(&g).unwrap();
        assert_eq!(t.points(), &[(40.0, 13.5), (80.0, 12.8)]);
    }

    #[test]
    fn telemetry_row_defaults_to_live() {
        let row = TelemetryRow {
            rpm: 2500.0,
            map_kpa: 45.0,
            afr: 13.4,
            live: None,
        };
        let tick = tick_from_row(&row);
        assert!(tick.live);
        assert_eq!(tick.point.rpm, 2500.0);
    }
}
