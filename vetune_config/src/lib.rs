#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and CSV loaders for the live VE correction engine.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Target AFR tables load either as a sparse `map_kpa,afr` CSV or as a full
//!   RPM x MAP grid that the engine column-averages.
//! - Telemetry logs load as `rpm,map_kpa,afr[,live]` rows for replay.
use serde::Deserialize;
use serde::de::Deserializer;
use std::path::Path;

/// Sparse target CSV schema.
///
/// Expected headers:
/// map_kpa,afr
///
/// Example:
/// map_kpa,afr
/// 50,13.5
/// 60,13.0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TargetRow {
    pub map_kpa: f64,
    pub afr: f64,
}

/// One recorded telemetry sample. `live` defaults to true when the column
/// is absent or empty.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TelemetryRow {
    pub rpm: f64,
    pub map_kpa: f64,
    pub afr: f64,
    #[serde(default, deserialize_with = "de_live")]
    pub live: Option<bool>,
}

impl TelemetryRow {
    pub fn is_live(&self) -> bool {
        self.live.unwrap_or(true)
    }
}

/// Full RPM x MAP target grid as maintained by a table editor.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGrid {
    /// Column keys (MAP kPa), in file order.
    pub map_keys: Vec<f64>,
    /// `(rpm, afr per MAP column)` rows.
    pub rows: Vec<(f64, Vec<f64>)>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    HarleyM8,
    HarleyTc,
    #[serde(rename = "sportbike_600")]
    Sportbike600,
    #[serde(rename = "sportbike_1000")]
    Sportbike1000,
    #[default]
    Custom,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct EngineCfg {
    /// Preset selected at startup.
    pub preset: PresetName,
    /// Custom RPM breakpoints; only honored for `preset = "custom"`.
    pub rpm_bins: Option<Vec<f64>>,
    /// Custom MAP breakpoints (kPa); only honored for `preset = "custom"`.
    pub map_bins: Option<Vec<f64>>,
    pub max_rpm: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Gates {
    /// Below this RPM the engine is treated as not running; nothing is traced.
    pub live_rpm_floor: f64,
    /// Below this RPM samples are traced for display but never accumulated.
    pub accumulate_rpm_floor: f64,
    /// Exclusive lower AFR bound for accepted samples.
    pub afr_min: f64,
    /// Exclusive upper AFR bound for accepted samples.
    pub afr_max: f64,
    /// Bilinear corners at or below this weight are dropped from a trace.
    pub corner_weight_min: f64,
    /// Corners at or below this weight do not accumulate.
    pub significance_weight: f64,
    /// Minimum summed weight before a cell gets a correction.
    pub min_effective_samples: f64,
}

impl Default for Gates {
    fn default() -> Self {
        Self {
            live_rpm_floor: 500.0,
            accumulate_rpm_floor: 800.0,
            afr_min: 8.0,
            afr_max: 20.0,
            corner_weight_min: 0.01,
            significance_weight: 0.2,
            min_effective_samples: 3.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TargetsCfg {
    /// Target AFR used when the table is empty.
    pub fallback_afr: f64,
    /// Sparse MAP -> AFR points. Accepts either:
    /// - array of tables: [{ map_kpa = 50, afr = 13.5 }, ...]
    /// - array of tuples: [[50, 13.5], [60, 13.0], ...]
    #[serde(deserialize_with = "de_target_points")]
    pub table: Vec<(f64, f64)>,
}

impl Default for TargetsCfg {
    fn default() -> Self {
        Self {
            fallback_afr: 14.0,
            table: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplerCfg {
    /// Telemetry poll rate for paced replay / live polling.
    pub poll_hz: u32,
    /// Max time to wait on a single telemetry read.
    pub read_timeout_ms: u64,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            poll_hz: 20,
            read_timeout_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub engine: EngineCfg,
    pub gates: Gates,
    pub targets: TargetsCfg,
    pub sampler: SamplerCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetToml {
    Tuple((f64, f64)),
    Table { map_kpa: f64, afr: f64 },
}

fn de_target_points<'de, D>(deserializer: D) -> Result<Vec<(f64, f64)>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<TargetToml>> = Option::deserialize(deserializer)?;
    Ok(opt
        .unwrap_or_default()
        .into_iter()
        .map(|t| match t {
            TargetToml::Tuple(p) => p,
            TargetToml::Table { map_kpa, afr } => (map_kpa, afr),
        })
        .collect())
}

fn de_live<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" => Ok(Some(true)),
        "0" | "false" | "no" => Ok(Some(false)),
        other => Err(serde::de::Error::custom(format!(
            "live must be one of true/false/1/0/yes/no, got '{other}'"
        ))),
    }
}

fn check_bins(field: &str, bins: &[f64]) -> eyre::Result<()> {
    if bins.is_empty() {
        eyre::bail!("{field} must contain at least one breakpoint");
    }
    if let Some(i) = bins.iter().position(|b| !b.is_finite()) {
        eyre::bail!("{field}[{i}] is not a finite number");
    }
    for i in 1..bins.len() {
        if bins[i] <= bins[i - 1] {
            eyre::bail!(
                "{field} must be strictly increasing (index {} = {} is not above {})",
                i,
                bins[i],
                bins[i - 1]
            );
        }
    }
    Ok(())
}

fn check_target_points(field: &str, points: &[(f64, f64)]) -> eyre::Result<()> {
    for (i, (map_kpa, afr)) in points.iter().enumerate() {
        if !map_kpa.is_finite() {
            eyre::bail!("{field}[{i}] map_kpa is not a finite number");
        }
        if !afr.is_finite() || *afr <= 0.0 {
            eyre::bail!("{field}[{i}] afr must be a finite value > 0, got {afr}");
        }
    }
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            if points[i].0 == points[j].0 {
                eyre::bail!(
                    "{field} has duplicate map_kpa {} at index {} and {}",
                    points[i].0,
                    i,
                    j
                );
            }
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Engine
        let custom = matches!(self.engine.preset, PresetName::Custom);
        if let Some(bins) = &self.engine.rpm_bins {
            if !custom {
                eyre::bail!("engine.rpm_bins is only honored when engine.preset = \"custom\"");
            }
            check_bins("engine.rpm_bins", bins)?;
        }
        if let Some(bins) = &self.engine.map_bins {
            if !custom {
                eyre::bail!("engine.map_bins is only honored when engine.preset = \"custom\"");
            }
            check_bins("engine.map_bins", bins)?;
        }
        if let Some(max) = self.engine.max_rpm {
            if !custom {
                eyre::bail!("engine.max_rpm is only honored when engine.preset = \"custom\"");
            }
            if !(max.is_finite() && max > 0.0) {
                eyre::bail!("engine.max_rpm must be > 0");
            }
        }

        // Gates
        let g = &self.gates;
        if !(g.live_rpm_floor.is_finite() && g.live_rpm_floor >= 0.0) {
            eyre::bail!("gates.live_rpm_floor must be >= 0");
        }
        if !(g.accumulate_rpm_floor.is_finite() && g.accumulate_rpm_floor >= g.live_rpm_floor) {
            eyre::bail!("gates.accumulate_rpm_floor must be >= gates.live_rpm_floor");
        }
        if !(g.afr_min.is_finite() && g.afr_min > 0.0) {
            eyre::bail!("gates.afr_min must be > 0");
        }
        if !(g.afr_max.is_finite() && g.afr_max > g.afr_min) {
            eyre::bail!("gates.afr_max must be greater than gates.afr_min");
        }
        if !(0.0..1.0).contains(&g.corner_weight_min) {
            eyre::bail!("gates.corner_weight_min must be in [0.0, 1.0)");
        }
        if !(0.0..1.0).contains(&g.significance_weight) {
            eyre::bail!("gates.significance_weight must be in [0.0, 1.0)");
        }
        if !(g.min_effective_samples.is_finite() && g.min_effective_samples > 0.0) {
            eyre::bail!("gates.min_effective_samples must be > 0");
        }

        // Targets
        if !(self.targets.fallback_afr.is_finite() && self.targets.fallback_afr > 0.0) {
            eyre::bail!("targets.fallback_afr must be > 0");
        }
        check_target_points("targets.table", &self.targets.table)?;

        // Sampler
        if self.sampler.poll_hz == 0 {
            eyre::bail!("sampler.poll_hz must be > 0");
        }
        if self.sampler.read_timeout_ms == 0 {
            eyre::bail!("sampler.read_timeout_ms must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got '{rot}'");
        }

        Ok(())
    }
}

fn open_csv(path: &Path, what: &str) -> eyre::Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open {what} CSV {:?}: {}", path, e))
}

fn header_names(rdr: &mut csv::Reader<std::fs::File>, path: &Path) -> eyre::Result<Vec<String>> {
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?;
    Ok(headers.iter().map(|s| s.to_string()).collect())
}

/// Load a sparse target table. Headers must be exactly `map_kpa,afr`.
pub fn load_targets_csv(path: &Path) -> eyre::Result<Vec<TargetRow>> {
    let mut rdr = open_csv(path, "target")?;
    let actual = header_names(&mut rdr, path)?;
    if actual != ["map_kpa", "afr"] {
        eyre::bail!(
            "target CSV must have headers 'map_kpa,afr', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TargetRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    let points: Vec<(f64, f64)> = rows.iter().map(|r| (r.map_kpa, r.afr)).collect();
    check_target_points("target CSV", &points)?;
    Ok(rows)
}

/// Load a full RPM x MAP target grid.
///
/// The first header must be `rpm`; the remaining headers are MAP keys in kPa.
/// Every row needs one value per MAP column. Empty cells load as NaN and are
/// skipped when the grid is column-averaged.
pub fn load_target_grid_csv(path: &Path) -> eyre::Result<TargetGrid> {
    let mut rdr = open_csv(path, "target grid")?;
    let headers = header_names(&mut rdr, path)?;
    match headers.first().map(String::as_str) {
        Some("rpm") => {}
        _ => eyre::bail!(
            "target grid CSV must start with an 'rpm' header, got: {}",
            headers.join(",")
        ),
    }
    if headers.len() < 2 {
        eyre::bail!("target grid CSV needs at least one MAP column");
    }
    let map_keys = headers[1..]
        .iter()
        .map(|h| {
            h.parse::<f64>()
                .map_err(|_| eyre::eyre!("target grid header '{h}' is not a MAP value"))
        })
        .collect::<eyre::Result<Vec<f64>>>()?;

    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let line = idx + 2;
        let rec = rec.map_err(|e| eyre::eyre!("invalid CSV row {line}: {e}"))?;
        if rec.len() != headers.len() {
            eyre::bail!(
                "invalid CSV row {line}: expected {} fields, got {}",
                headers.len(),
                rec.len()
            );
        }
        let rpm = rec[0]
            .parse::<f64>()
            .map_err(|_| eyre::eyre!("invalid CSV row {line}: rpm '{}' is not a number", &rec[0]))?;
        let mut values = Vec::with_capacity(map_keys.len());
        for field in rec.iter().skip(1) {
            if field.is_empty() {
                values.push(f64::NAN);
            } else {
                let v = field.parse::<f64>().map_err(|_| {
                    eyre::eyre!("invalid CSV row {line}: afr '{field}' is not a number")
                })?;
                values.push(v);
            }
        }
        rows.push((rpm, values));
    }

    Ok(TargetGrid { map_keys, rows })
}

/// Load a telemetry log. Required headers: `rpm`, `map_kpa`, `afr`;
/// an optional `live` column gates individual samples.
pub fn load_telemetry_csv(path: &Path) -> eyre::Result<Vec<TelemetryRow>> {
    let mut rdr = open_csv(path, "telemetry")?;
    let actual = header_names(&mut rdr, path)?;
    for required in ["rpm", "map_kpa", "afr"] {
        if !actual.iter().any(|h| h == required) {
            eyre::bail!(
                "telemetry CSV must have headers 'rpm,map_kpa,afr[,live]', got: {}",
                actual.join(",")
            );
        }
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TelemetryRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = load_toml("").expect("parse");
        assert_eq!(cfg.engine.preset, PresetName::Custom);
        assert_eq!(cfg.gates.live_rpm_floor, 500.0);
        assert_eq!(cfg.gates.accumulate_rpm_floor, 800.0);
        assert_eq!(cfg.targets.fallback_afr, 14.0);
        assert!(cfg.targets.table.is_empty());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn target_table_accepts_tuples_and_tables() {
        let cfg = load_toml(
            r#"
[targets]
table = [[50, 13.5], { map_kpa = 60, afr = 13.0 }]
"#,
        )
        .expect("parse");
        assert_eq!(cfg.targets.table, vec![(50.0, 13.5), (60.0, 13.0)]);
    }

    #[test]
    fn preset_names_are_snake_case() {
        for (name, want) in [
            ("harley_m8", PresetName::HarleyM8),
            ("harley_tc", PresetName::HarleyTc),
            ("sportbike_600", PresetName::Sportbike600),
            ("sportbike_1000", PresetName::Sportbike1000),
            ("custom", PresetName::Custom),
        ] {
            let cfg = load_toml(&format!("[engine]\npreset = \"{name}\"\n")).expect("parse");
            assert_eq!(cfg.engine.preset, want, "{name}");
        }
        assert!(load_toml("[engine]\npreset = \"sportbike600\"\n").is_err());
        assert!(load_toml("[engine]\npreset = \"vtwin\"\n").is_err());
    }

    #[test]
    fn check_bins_rejects_plateaus() {
        let err = check_bins("engine.map_bins", &[20.0, 30.0, 30.0]).expect_err("duplicate");
        assert!(err.to_string().contains("strictly increasing"));
    }
}
