//! Run configuration.
//!
//! Loaded from a TOML or JSON file with `FISSPEC__`-prefixed environment
//! overrides (`__` separates nested keys, e.g. `FISSPEC__OUTPUT_ROWS=500`),
//! then validated into [`SimConfig`]. Every check runs here, before the first
//! simulation step.
//!
//! ```toml
//! steps = 5256000
//! output_rows = 5000
//!
//! [quantum]
//! length = 6
//! unit = "s"
//!
//! [source_rates]
//! "Xe-142" = 8.07e6
//!
//! [output]
//! bins_path = "out/bins.csv"
//! nuclides_path = "out/nuclides.csv"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use fisspec_core::error::ConfigError;
use fisspec_core::types::{NuclideId, Quantum, TimeUnit};

use crate::sampler::RowSampler;
use crate::source::SourceTerm;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "FISSPEC";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Bin time series CSV, rewritten from scratch at run start.
    pub bins_path: PathBuf,
    /// Dense per-nuclide CSV, written once at run end.
    pub nuclides_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bins_path: PathBuf::from("bins.csv"),
            nuclides_path: PathBuf::from("nuclides.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawQuantum {
    length: f64,
    unit: String,
}

/// Configuration as written, before validation.
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    /// Production rate per nuclide, in Bq per second.
    source_rates: BTreeMap<String, f64>,
    quantum: RawQuantum,
    /// May be fractional; floored at load.
    steps: f64,
    output_rows: i64,
    #[serde(default)]
    output: OutputConfig,
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub source: SourceTerm,
    pub quantum: Quantum,
    pub sampler: RowSampler,
    pub output: OutputConfig,
}

impl SimConfig {
    /// Load from `path` (format from the extension) plus environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::from_settings(settings)
    }

    /// Parse a TOML document, without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::from_settings(settings)
    }

    fn from_settings(settings: ::config::Config) -> Result<Self, ConfigError> {
        let raw: RawConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let unit: TimeUnit = raw.quantum.unit.parse()?;
        let quantum = Quantum::new(raw.quantum.length, unit)?;

        if !raw.steps.is_finite() || raw.steps.floor() < 1.0 {
            return Err(ConfigError::NonPositiveSteps(raw.steps));
        }
        let steps = raw.steps.floor() as u64;

        if raw.output_rows < 1 {
            return Err(ConfigError::InvalidOutputRows(raw.output_rows));
        }
        let sampler = RowSampler::new(steps, raw.output_rows as u64)?;

        let mut rates = BTreeMap::new();
        for (name, rate) in raw.source_rates {
            let nuclide =
                NuclideId::parse(&name).map_err(|_| ConfigError::InvalidNuclide(name.clone()))?;
            if rates.insert(nuclide, rate).is_some() {
                return Err(ConfigError::Load(format!("duplicate source rate for {name}")));
            }
        }
        let source = SourceTerm::from_rates(&rates, quantum)?;

        Ok(Self {
            source,
            quantum,
            sampler,
            output: raw.output,
        })
    }

    pub fn steps(&self) -> u64 {
        self.sampler.steps()
    }
}
