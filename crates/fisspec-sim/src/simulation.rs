//! Simulation clock.
//!
//! Runs `inventory(i+1) = advance(inventory(i) + dose, quantum)` for every step
//! `i` in `0..steps`, bins each new inventory, and hands materialized rows to
//! the ledger and the output sink. All mutable run state lives in
//! [`SimulationState`], so a single step can be driven and inspected on its own.

use serde::Serialize;
use tracing::{debug, info, warn};

use fisspec_core::error::SimError;
use fisspec_core::traits::{DecayOracle, GammaYieldTable};
use fisspec_core::types::Inventory;

use crate::binner::bin_inventory;
use crate::config::SimConfig;
use crate::ledger::{BinRow, ContributionLedger};
use crate::sampler::RowSampler;
use crate::sink::OutputSink;
use crate::source::SourceTerm;

/// Everything that changes while a run progresses.
#[derive(Clone, Debug, Default)]
pub struct SimulationState {
    next_step: u64,
    inventory: Inventory,
    ledger: ContributionLedger,
}

impl SimulationState {
    /// Empty inventory, positioned before step 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the step the next call to [`Simulation::step`] will run.
    pub fn next_step(&self) -> u64 {
        self.next_step
    }

    /// Inventory after the last completed step.
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn ledger(&self) -> &ContributionLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> ContributionLedger {
        self.ledger
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub steps: u64,
    pub sampling_interval: u64,
    pub rows_materialized: u64,
    /// Distinct nuclides seen across all materialized rows.
    pub universe_size: u64,
    /// Intermediate flushes that failed and were retried later.
    pub failed_flushes: u64,
}

pub struct Simulation<'a, O: DecayOracle + ?Sized, Y: GammaYieldTable + ?Sized> {
    oracle: &'a O,
    yields: &'a Y,
    source: SourceTerm,
    sampler: RowSampler,
}

impl<'a, O: DecayOracle + ?Sized, Y: GammaYieldTable + ?Sized> Simulation<'a, O, Y> {
    /// The quantum advanced per step is the one the source dose was built for.
    pub fn new(oracle: &'a O, yields: &'a Y, source: SourceTerm, sampler: RowSampler) -> Self {
        Self {
            oracle,
            yields,
            source,
            sampler,
        }
    }

    pub fn from_config(oracle: &'a O, yields: &'a Y, config: &SimConfig) -> Self {
        Self::new(oracle, yields, config.source.clone(), config.sampler)
    }

    pub fn source(&self) -> &SourceTerm {
        &self.source
    }

    pub fn sampler(&self) -> &RowSampler {
        &self.sampler
    }

    pub fn is_finished(&self, state: &SimulationState) -> bool {
        state.next_step >= self.sampler.steps()
    }

    /// Run one step of the recurrence.
    ///
    /// Returns the recorded row when the step is materialized. On error the
    /// state is left exactly as it was before the call.
    pub fn step(&self, state: &mut SimulationState) -> Result<Option<BinRow>, SimError> {
        let step = state.next_step;
        let dosed = self.source.injected(&state.inventory);
        let next = self
            .oracle
            .advance(&dosed, self.source.quantum())
            .map_err(|source| SimError::Oracle { step, source })?;
        let bins = bin_inventory(&next, self.yields)
            .map_err(|source| SimError::Spectrum { step, source })?;

        state.inventory = next;
        state.next_step += 1;

        if !self.sampler.is_materialized(step) {
            return Ok(None);
        }
        Ok(Some(state.ledger.record(step, bins, &state.inventory)))
    }

    /// Run every step from an empty inventory, writing output to `sink`.
    pub fn run(&self, sink: &mut dyn OutputSink) -> Result<RunSummary, SimError> {
        self.run_from(&mut SimulationState::new(), sink)
    }

    /// Run the remaining steps of `state`, writing output to `sink`.
    ///
    /// Each materialized row is appended as soon as it is recorded. A failed
    /// append is logged and its rows are carried to the front of the next
    /// one. At the end the dense table is written first; a failed dense write
    /// fails the run, and so do bin rows that still cannot be written after
    /// it.
    pub fn run_from(
        &self,
        state: &mut SimulationState,
        sink: &mut dyn OutputSink,
    ) -> Result<RunSummary, SimError> {
        info!(
            steps = self.sampler.steps(),
            interval = self.sampler.interval(),
            rows = self.sampler.row_count(),
            quantum = %self.source.quantum(),
            "simulation started"
        );

        let mut backlog: Vec<BinRow> = Vec::new();
        let mut failed_flushes = 0u64;

        while !self.is_finished(state) {
            let Some(row) = self.step(state)? else {
                continue;
            };
            debug!(
                step = row.step,
                total = row.bins.total(),
                nuclides = state.ledger.universe().len(),
                "row materialized"
            );
            backlog.push(row);
            match sink.append_bins(&backlog) {
                Ok(()) => backlog.clear(),
                Err(e) => {
                    failed_flushes += 1;
                    warn!(error = %e, pending = backlog.len(), "bin flush failed, will retry");
                }
            }
        }

        // The dense table depends only on the ledger, so it is written even
        // when bin rows are still pending.
        let table = state.ledger.dense_table();
        sink.write_dense(&table)?;

        if !backlog.is_empty() {
            if let Err(e) = sink.append_bins(&backlog) {
                warn!(error = %e, pending = backlog.len(), "final bin flush failed");
                return Err(e.into());
            }
            info!(rows = backlog.len(), "flushed pending bin rows");
        }

        let summary = RunSummary {
            steps: self.sampler.steps(),
            sampling_interval: self.sampler.interval(),
            rows_materialized: state.ledger.len() as u64,
            universe_size: state.ledger.universe().len() as u64,
            failed_flushes,
        };
        info!(
            rows = summary.rows_materialized,
            nuclides = summary.universe_size,
            failed_flushes,
            "simulation finished"
        );
        Ok(summary)
    }
}
