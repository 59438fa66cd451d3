#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Live VE correction engine (I/O-agnostic).
//!
//! Consumes telemetry `Tick`s (RPM, MAP, AFR, live flag) and maintains a
//! per-cell fuel correction grid over an RPM x MAP breakpoint layout. All
//! input goes through `vetune_traits::Telemetry`.
//!
//! ## Pipeline
//!
//! - **Locate**: floor bin plus fractional position on each axis (`axis`)
//! - **Trace**: bilinear corner weights, negligible corners dropped (`trace`)
//! - **Accumulate**: weighted AFR sums per cell, gated on AFR range and
//!   corner weight (`accumulator`)
//! - **Correct**: `mean / target` clamped to a fixed band once a cell has
//!   enough effective samples (`correction`, `target`)
//! - **Session**: owns the active preset and runs the above per tick
//!   (`session`)
//!
//! The engine is single-threaded. `sampler` and `runner` add a polling
//! thread and a run loop around it for live or replayed telemetry.

pub mod accumulator;
pub mod atomic;
pub mod axis;
pub mod config;
pub mod conversions;
pub mod correction;
pub mod error;
pub mod grid;
pub mod mocks;
pub mod preset;
pub mod replay;
pub mod runner;
pub mod sampler;
pub mod session;
pub mod status;
pub mod target;
pub mod trace;
pub mod util;

pub use accumulator::{AccumulatorStore, Cell};
pub use axis::BinAxis;
pub use config::{SamplerCfg, TuningCfg};
pub use correction::{CORRECTION_MAX, CORRECTION_MIN, CorrectionEngine};
pub use error::{BuildError, RejectReason, VeError};
pub use grid::Grid;
pub use preset::{EngineConfig, EnginePreset};
pub use session::{SessionStats, VeSession, VeSessionBuilder, VeSnapshot};
pub use status::TickStatus;
pub use target::AfrTargetTable;
pub use trace::{ActiveCell, CellTrace};
pub use vetune_traits::{OperatingPoint, Telemetry, Tick};
