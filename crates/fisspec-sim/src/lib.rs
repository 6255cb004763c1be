//! # fisspec-sim — Continuous-source decay simulation and spectral binning.
//!
//! Drives the step recurrence
//! `inventory(t+1) = advance(inventory(t) + source, quantum)` and records a
//! downsampled view of it:
//! - [`source::SourceTerm`] — per-step dose injected before every advance
//! - [`binner`] — activity times gamma yields, summed into six energy bins
//! - [`sampler::RowSampler`] — which steps become output rows
//! - [`ledger::ContributionLedger`] — per-row snapshots over a growing nuclide set
//! - [`sink`] — incremental bin series output and the final dense table
//! - [`simulation::Simulation`] — the clock tying it together
//! - [`config::SimConfig`] — validated run configuration

pub mod binner;
pub mod config;
pub mod ledger;
pub mod sampler;
pub mod simulation;
pub mod sink;
pub mod source;
pub mod yields;

pub use binner::bin_inventory;
pub use config::SimConfig;
pub use ledger::{BinRow, ContributionLedger, DenseTable};
pub use sampler::RowSampler;
pub use simulation::{RunSummary, Simulation, SimulationState};
pub use sink::{CsvSink, MemorySink, OutputSink};
pub use source::SourceTerm;
pub use yields::YieldLibrary;
