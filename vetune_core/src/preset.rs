//! Engine presets and the active grid geometry.

use std::fmt;
use std::str::FromStr;

use crate::axis::BinAxis;
use crate::error::{Result, VeError};

/// Built-in engine families, each with a fixed RPM x MAP breakpoint layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnginePreset {
    HarleyM8,
    HarleyTc,
    Sportbike600,
    Sportbike1000,
    Custom,
}

impl EnginePreset {
    pub const ALL: [EnginePreset; 5] = [
        EnginePreset::HarleyM8,
        EnginePreset::HarleyTc,
        EnginePreset::Sportbike600,
        EnginePreset::Sportbike1000,
        EnginePreset::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EnginePreset::HarleyM8 => "harley_m8",
            EnginePreset::HarleyTc => "harley_tc",
            EnginePreset::Sportbike600 => "sportbike_600",
            EnginePreset::Sportbike1000 => "sportbike_1000",
            EnginePreset::Custom => "custom",
        }
    }

    fn rpm_bins(self) -> Vec<f64> {
        match self {
            EnginePreset::HarleyM8 | EnginePreset::HarleyTc => {
                let mut v: Vec<f64> = (0..10).map(|i| 750.0 + 250.0 * f64::from(i)).collect();
                let top = if self == EnginePreset::HarleyM8 { 6000 } else { 5500 };
                v.extend((3500..=top).step_by(500).map(f64::from));
                v
            }
            EnginePreset::Sportbike600 => (1..=16).map(|k| f64::from(k) * 1000.0).collect(),
            EnginePreset::Sportbike1000 => (1..=14).map(|k| f64::from(k) * 1000.0).collect(),
            EnginePreset::Custom => (1..=10).map(|k| f64::from(k) * 1000.0).collect(),
        }
    }

    fn map_bins(self) -> Vec<f64> {
        match self {
            EnginePreset::HarleyM8 => (4..=20).map(|k| f64::from(k) * 5.0).collect(),
            EnginePreset::HarleyTc | EnginePreset::Sportbike600 => {
                (2..=10).map(|k| f64::from(k) * 10.0).collect()
            }
            EnginePreset::Sportbike1000 | EnginePreset::Custom => {
                (2..=11).map(|k| f64::from(k) * 10.0).collect()
            }
        }
    }

    fn max_rpm(self) -> f64 {
        match self {
            EnginePreset::HarleyM8 => 6000.0,
            EnginePreset::HarleyTc => 5500.0,
            EnginePreset::Sportbike600 => 16000.0,
            EnginePreset::Sportbike1000 => 14000.0,
            EnginePreset::Custom => 10000.0,
        }
    }
}

impl fmt::Display for EnginePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EnginePreset {
    type Err = VeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        EnginePreset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| VeError::UnknownPreset(s.to_string()))
    }
}

/// The active grid geometry: one RPM axis (rows) and one MAP axis (columns).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub name: String,
    pub rpm_axis: BinAxis,
    pub map_axis: BinAxis,
    pub max_rpm: f64,
}

impl EngineConfig {
    pub fn from_preset(preset: EnginePreset) -> Self {
        Self {
            name: preset.name().to_string(),
            rpm_axis: BinAxis::from_static(preset.rpm_bins()),
            map_axis: BinAxis::from_static(preset.map_bins()),
            max_rpm: preset.max_rpm(),
        }
    }

    /// Externally supplied axes. `max_rpm` defaults to the last RPM breakpoint.
    pub fn custom(rpm_bins: Vec<f64>, map_bins: Vec<f64>, max_rpm: Option<f64>) -> Result<Self> {
        let rpm_axis = BinAxis::new(rpm_bins)?;
        let map_axis = BinAxis::new(map_bins)?;
        let max_rpm = match max_rpm {
            Some(v) if v.is_finite() && v > 0.0 => v,
            Some(v) => {
                return Err(VeError::Config(format!("max_rpm must be > 0, got {v}")).into());
            }
            None => rpm_axis.as_slice()[rpm_axis.last_index()],
        };
        Ok(Self {
            name: EnginePreset::Custom.name().to_string(),
            rpm_axis,
            map_axis,
            max_rpm,
        })
    }

    /// `(rows, cols)` = `(rpm_axis.len(), map_axis.len())`.
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.rpm_axis.len(), self.map_axis.len())
    }
}

impl From<EnginePreset> for EngineConfig {
    fn from(p: EnginePreset) -> Self {
        Self::from_preset(p)
    }
}
