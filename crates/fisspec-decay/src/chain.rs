//! Decay-chain reference data.
//!
//! JSON layout, keyed by nuclide:
//!
//! ```json
//! {
//!   "Xe-142": { "half_life_s": 1.23, "progeny": [{ "nuclide": "Cs-142", "fraction": 1.0 }] },
//!   "Ce-142": { "half_life_s": null }
//! }
//! ```
//!
//! A missing or `null` half-life marks a stable nuclide. Stable nuclides may
//! not list progeny.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::f64::consts::LN_2;
use std::path::Path;

use serde::{Deserialize, Serialize};

use fisspec_core::constants::BRANCHING_TOLERANCE;
use fisspec_core::error::DataError;
use fisspec_core::types::NuclideId;

/// One decay branch: daughter nuclide and the fraction of decays feeding it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub nuclide: NuclideId,
    pub fraction: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NuclideData {
    /// Half-life in seconds. `None` for stable nuclides.
    #[serde(default)]
    pub half_life_s: Option<f64>,
    #[serde(default)]
    pub progeny: Vec<Branch>,
}

impl NuclideData {
    pub fn stable() -> Self {
        Self::default()
    }

    pub fn radioactive(half_life_s: f64, progeny: Vec<Branch>) -> Self {
        Self {
            half_life_s: Some(half_life_s),
            progeny,
        }
    }

    pub fn is_stable(&self) -> bool {
        self.half_life_s.is_none()
    }

    /// Decay constant in 1/s, zero for stable nuclides.
    pub fn decay_constant(&self) -> f64 {
        self.half_life_s.map_or(0.0, |t| LN_2 / t)
    }
}

/// Validated decay data, ordered so every parent precedes its daughters.
#[derive(Clone, Debug)]
pub struct DecayData {
    nuclides: Vec<NuclideId>,
    entries: Vec<NuclideData>,
    index: HashMap<NuclideId, usize>,
}

impl DecayData {
    /// Validate `entries` and compute the parents-first ordering.
    pub fn from_entries(entries: BTreeMap<NuclideId, NuclideData>) -> Result<Self, DataError> {
        for (id, entry) in &entries {
            validate_entry(id, entry, &entries)?;
        }

        let order = topological_order(&entries)?;
        let index: HashMap<NuclideId, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let mut entries = entries;
        let ordered_entries = order
            .iter()
            .map(|id| entries.remove(id).unwrap_or_default())
            .collect();

        Ok(Self {
            nuclides: order,
            entries: ordered_entries,
            index,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        let raw: BTreeMap<String, NuclideData> =
            serde_json::from_str(json).map_err(|e| DataError::Parse(e.to_string()))?;
        let mut entries = BTreeMap::new();
        for (name, entry) in raw {
            let id = NuclideId::parse(&name)?;
            if entries.insert(id.clone(), entry).is_some() {
                return Err(DataError::Parse(format!("duplicate entry for {id}")));
            }
        }
        Self::from_entries(entries)
    }

    /// Load decay data from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DataError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.nuclides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nuclides.is_empty()
    }

    /// Position of `nuclide` in parents-first order.
    pub fn index_of(&self, nuclide: &NuclideId) -> Option<usize> {
        self.index.get(nuclide).copied()
    }

    pub fn nuclide(&self, index: usize) -> &NuclideId {
        &self.nuclides[index]
    }

    pub fn entry(&self, index: usize) -> &NuclideData {
        &self.entries[index]
    }

    pub fn get(&self, nuclide: &NuclideId) -> Option<&NuclideData> {
        self.index_of(nuclide).map(|i| &self.entries[i])
    }

    /// Nuclides in parents-first order.
    pub fn nuclides(&self) -> &[NuclideId] {
        &self.nuclides
    }
}

fn validate_entry(
    id: &NuclideId,
    entry: &NuclideData,
    all: &BTreeMap<NuclideId, NuclideData>,
) -> Result<(), DataError> {
    let branching = |reason: String| DataError::InvalidBranching {
        nuclide: id.to_string(),
        reason,
    };

    match entry.half_life_s {
        Some(t) if !t.is_finite() || t <= 0.0 => {
            return Err(DataError::InvalidHalfLife {
                nuclide: id.to_string(),
                half_life_s: t,
            });
        }
        None if !entry.progeny.is_empty() => {
            return Err(branching("stable nuclide lists progeny".into()));
        }
        _ => {}
    }

    let mut total = 0.0;
    let mut seen = BTreeSet::new();
    for branch in &entry.progeny {
        if !branch.fraction.is_finite() || !(0.0..=1.0).contains(&branch.fraction) {
            return Err(branching(format!(
                "fraction {} to {} outside [0, 1]",
                branch.fraction, branch.nuclide
            )));
        }
        if &branch.nuclide == id {
            return Err(branching("decays to itself".into()));
        }
        if !seen.insert(&branch.nuclide) {
            return Err(branching(format!("{} listed twice", branch.nuclide)));
        }
        if !all.contains_key(&branch.nuclide) {
            return Err(DataError::UnknownDaughter {
                parent: id.to_string(),
                daughter: branch.nuclide.to_string(),
            });
        }
        total += branch.fraction;
    }
    if total > 1.0 + BRANCHING_TOLERANCE {
        return Err(branching(format!("fractions sum to {total}")));
    }
    Ok(())
}

/// Kahn's algorithm, lexicographic among ready nuclides for a stable order.
fn topological_order(
    entries: &BTreeMap<NuclideId, NuclideData>,
) -> Result<Vec<NuclideId>, DataError> {
    let mut parents: BTreeMap<&NuclideId, usize> = entries.keys().map(|id| (id, 0)).collect();
    for entry in entries.values() {
        for branch in &entry.progeny {
            if let Some(count) = parents.get_mut(&branch.nuclide) {
                *count += 1;
            }
        }
    }

    let mut ready: BTreeSet<&NuclideId> = parents
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(entries.len());

    while let Some(id) = ready.pop_first() {
        order.push(id.clone());
        if let Some(entry) = entries.get(id) {
            for branch in &entry.progeny {
                if let Some(count) = parents.get_mut(&branch.nuclide) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(&branch.nuclide);
                    }
                }
            }
        }
    }

    if order.len() != entries.len() {
        let stuck = parents
            .iter()
            .find(|(_, n)| **n > 0)
            .map(|(id, _)| id.to_string())
            .unwrap_or_default();
        return Err(DataError::CyclicChain(stuck));
    }
    Ok(order)
}
