//! Gamma yield library: per-nuclide gamma lines loaded from JSON.
//!
//! ```json
//! { "Ba-142": [{ "energy_mev": 0.2553, "probability": 0.205 }], "Ce-142": [] }
//! ```
//!
//! An empty list is a valid entry (a nuclide with no gamma emission). A
//! nuclide with no entry at all is a lookup failure.

use std::collections::BTreeMap;
use std::path::Path;

use ordered_float::OrderedFloat;

use fisspec_core::error::DataError;
use fisspec_core::spectrum::GammaLine;
use fisspec_core::traits::GammaYieldTable;
use fisspec_core::types::NuclideId;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct YieldLibrary {
    lines: BTreeMap<NuclideId, Vec<GammaLine>>,
}

impl YieldLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `nuclide`.
    ///
    /// Lines sharing an energy are merged by summing their probabilities;
    /// stored lines are sorted by energy.
    pub fn insert(
        &mut self,
        nuclide: NuclideId,
        lines: impl IntoIterator<Item = GammaLine>,
    ) -> Result<(), DataError> {
        let mut merged: BTreeMap<OrderedFloat<f64>, f64> = BTreeMap::new();
        for line in lines {
            if !line.is_valid() {
                return Err(DataError::InvalidGammaLine {
                    nuclide: nuclide.to_string(),
                    energy_mev: line.energy_mev,
                    probability: line.probability,
                });
            }
            *merged.entry(OrderedFloat(line.energy_mev)).or_insert(0.0) += line.probability;
        }
        let lines = merged
            .into_iter()
            .map(|(energy, probability)| GammaLine::new(energy.into_inner(), probability))
            .collect();
        self.lines.insert(nuclide, lines);
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        let raw: BTreeMap<String, Vec<GammaLine>> =
            serde_json::from_str(json).map_err(|e| DataError::Parse(e.to_string()))?;
        let mut library = Self::new();
        for (name, lines) in raw {
            let nuclide = NuclideId::parse(&name)?;
            if library.lines.contains_key(&nuclide) {
                return Err(DataError::Parse(format!("duplicate entry for {nuclide}")));
            }
            library.insert(nuclide, lines)?;
        }
        Ok(library)
    }

    /// Load a yield library from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DataError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn nuclides(&self) -> impl Iterator<Item = &NuclideId> + '_ {
        self.lines.keys()
    }
}

impl GammaYieldTable for YieldLibrary {
    fn yields(&self, nuclide: &NuclideId) -> Result<&[GammaLine], DataError> {
        self.lines
            .get(nuclide)
            .map(Vec::as_slice)
            .ok_or_else(|| DataError::MissingGammaYields(nuclide.to_string()))
    }

    fn contains(&self, nuclide: &NuclideId) -> bool {
        self.lines.contains_key(nuclide)
    }
}
