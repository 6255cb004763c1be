//! Error types for fission-product simulations.
use thiserror::Error;

/// Rejected configuration. Always detected before the first step runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("quantum length must be finite and positive, got {0}")] NonPositiveQuantum(f64),
    #[error("unknown time unit: {0}")] UnknownTimeUnit(String),
    #[error("step count must be finite and at least 1, got {0}")] NonPositiveSteps(f64),
    #[error("output rows must be at least 1, got {0}")] InvalidOutputRows(i64),
    #[error("source rate for {nuclide} is not finite: {rate}")] NonFiniteRate { nuclide: String, rate: f64 },
    #[error("source rate for {nuclide} is negative: {rate}")] NegativeRate { nuclide: String, rate: f64 },
    #[error("invalid nuclide in source term: {0}")] InvalidNuclide(String),
    #[error("load: {0}")] Load(String),
}

/// Problems with static reference data: decay chains and gamma yields.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("invalid nuclide identifier: {0:?}")] InvalidNuclide(String),
    #[error("no gamma yield entry for {0}")] MissingGammaYields(String),
    #[error("invalid gamma line for {nuclide}: {energy_mev} MeV at probability {probability}")] InvalidGammaLine { nuclide: String, energy_mev: f64, probability: f64 },
    #[error("invalid half-life for {nuclide}: {half_life_s} s")] InvalidHalfLife { nuclide: String, half_life_s: f64 },
    #[error("invalid branching for {nuclide}: {reason}")] InvalidBranching { nuclide: String, reason: String },
    #[error("daughter {daughter} of {parent} is missing from decay data")] UnknownDaughter { parent: String, daughter: String },
    #[error("decay chain cycle through {0}")] CyclicChain(String),
    #[error("parse: {0}")] Parse(String),
    #[error("io: {0}")] Io(String),
}

/// Failures inside the decay solver. Fatal to a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecayError {
    #[error("nuclide not in decay data: {0}")] UnknownNuclide(String),
    #[error("degenerate chain: {parent} and {daughter} share decay constant {lambda} /s")] DegenerateChain { parent: String, daughter: String, lambda: f64 },
    #[error("non-finite activity for {0}")] NonFinite(String),
    #[error("quantum must be finite and positive, got {0} s")] InvalidQuantum(f64),
}

/// Output sink failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("io on {path}: {reason}")] Io { path: String, reason: String },
    #[error("row has {got} cells, header has {expected}")] RowWidth { got: usize, expected: usize },
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Data(#[from] DataError),
    #[error(transparent)] Sink(#[from] SinkError),
    #[error("decay failed at step {step}: {source}")] Oracle { step: u64, source: DecayError },
    #[error("binning failed at step {step}: {source}")] Spectrum { step: u64, source: DataError },
}
