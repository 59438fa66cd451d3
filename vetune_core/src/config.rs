//! Runtime tuning for the tick pipeline.
//!
//! Separate from the TOML-deserialized config in `vetune_config`; see
//! `conversions` for the bridge.

use crate::correction::MIN_EFFECTIVE_SAMPLES;
use crate::trace::CORNER_WEIGHT_MIN;

/// Gates and thresholds applied on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningCfg {
    /// Below this RPM nothing is traced (engine off / cranking).
    pub live_rpm_floor: f64,
    /// Below this RPM samples are traced for display but not accumulated.
    pub accumulate_rpm_floor: f64,
    /// Exclusive AFR bounds for accepted samples.
    pub afr_min: f64,
    pub afr_max: f64,
    /// Bilinear corners at or below this weight are dropped from a trace.
    pub corner_weight_min: f64,
    /// Corners at or below this weight do not accumulate.
    pub significance_weight: f64,
    /// Summed weight a cell needs before its correction moves.
    pub min_effective_samples: f64,
}

impl Default for TuningCfg {
    fn default() -> Self {
        Self {
            live_rpm_floor: 500.0,
            accumulate_rpm_floor: 800.0,
            afr_min: 8.0,
            afr_max: 20.0,
            corner_weight_min: CORNER_WEIGHT_MIN,
            significance_weight: 0.2,
            min_effective_samples: MIN_EFFECTIVE_SAMPLES,
        }
    }
}

/// Telemetry polling parameters for the sampler and runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerCfg {
    pub poll_hz: u32,
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
