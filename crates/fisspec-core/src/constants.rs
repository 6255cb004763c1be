//! Physical and binning constants.

/// Number of gamma energy bins.
pub const BIN_COUNT: usize = 6;

/// Width of every bounded energy bin, in MeV.
pub const BIN_WIDTH_MEV: f64 = 1.0;

pub const SECONDS_PER_MINUTE: f64 = 60.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian year (365.25 days).
pub const SECONDS_PER_YEAR: f64 = 365.25 * SECONDS_PER_DAY;

/// Slack allowed when the branching fractions of a parent are summed.
pub const BRANCHING_TOLERANCE: f64 = 1e-9;

/// Relative gap below which two decay constants in one chain are treated as
/// equal. Closer constants make the Bateman sum cancel catastrophically.
pub const DEGENERACY_TOLERANCE: f64 = 1e-9;
