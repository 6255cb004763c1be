//! Contribution ledger: bin series plus per-row nuclide snapshots.
//!
//! The set of nuclides seen across rows only grows. Rows recorded before a
//! daughter first appeared have no entry for it; [`ContributionLedger::dense_table`]
//! back-fills those cells with numeric zero.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use fisspec_core::spectrum::BinVector;
use fisspec_core::types::{Inventory, NuclideId};

/// One materialized step of the bin time series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinRow {
    /// Simulation tick at which the row was captured (not a row counter).
    pub step: u64,
    pub bins: BinVector,
}

#[derive(Clone, Debug)]
struct Snapshot {
    step: u64,
    activities: BTreeMap<NuclideId, f64>,
}

#[derive(Clone, Debug, Default)]
pub struct ContributionLedger {
    series: Vec<BinRow>,
    snapshots: Vec<Snapshot>,
    universe: BTreeSet<NuclideId>,
}

impl ContributionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a materialized row and union its nuclides into the universe.
    ///
    /// Only nuclides with nonzero activity are snapshotted.
    pub fn record(&mut self, step: u64, bins: BinVector, inventory: &Inventory) -> BinRow {
        let activities: BTreeMap<NuclideId, f64> = inventory
            .active()
            .map(|(id, a)| (id.clone(), a))
            .collect();
        for nuclide in activities.keys() {
            if !self.universe.contains(nuclide) {
                self.universe.insert(nuclide.clone());
            }
        }
        self.snapshots.push(Snapshot { step, activities });

        let row = BinRow { step, bins };
        self.series.push(row.clone());
        row
    }

    /// Bin rows in recording order.
    pub fn series(&self) -> &[BinRow] {
        &self.series
    }

    /// Every nuclide seen in any recorded row, lexicographically ordered.
    pub fn universe(&self) -> &BTreeSet<NuclideId> {
        &self.universe
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Dense nuclide-by-row table over the current universe; absent cells are 0.
    pub fn dense_table(&self) -> DenseTable {
        let nuclides: Vec<NuclideId> = self.universe.iter().cloned().collect();
        let rows = self
            .snapshots
            .iter()
            .map(|snapshot| DenseRow {
                step: snapshot.step,
                activities: nuclides
                    .iter()
                    .map(|id| snapshot.activities.get(id).copied().unwrap_or(0.0))
                    .collect(),
            })
            .collect();
        DenseTable { nuclides, rows }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DenseRow {
    pub step: u64,
    /// One activity per column of [`DenseTable::nuclides`].
    pub activities: Vec<f64>,
}

/// Per-nuclide activity for every materialized row, with no missing cells.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DenseTable {
    nuclides: Vec<NuclideId>,
    rows: Vec<DenseRow>,
}

impl DenseTable {
    /// Column headers, lexicographic.
    pub fn nuclides(&self) -> &[NuclideId] {
        &self.nuclides
    }

    pub fn rows(&self) -> &[DenseRow] {
        &self.rows
    }

    /// Activity of `nuclide` in row `row`; `None` when either is out of range.
    pub fn activity(&self, row: usize, nuclide: &NuclideId) -> Option<f64> {
        let column = self.nuclides.binary_search(nuclide).ok()?;
        self.rows.get(row).map(|r| r.activities[column])
    }
}
