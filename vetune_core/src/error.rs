use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VeError {
    #[error("invalid bin axis: {0}")]
    InvalidAxis(String),
    #[error("unknown engine preset: {0}")]
    UnknownPreset(String),
    #[error("invalid target AFR {afr} at {map_kpa} kPa (must be finite and > 0)")]
    InvalidTarget { map_kpa: f64, afr: f64 },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("telemetry error: {0}")]
    Telemetry(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing engine config")]
    MissingEngine,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Why a live, traced sample did not reach the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// AFR outside the accepted open interval.
    AfrOutOfRange,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
