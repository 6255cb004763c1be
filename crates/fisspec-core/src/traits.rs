//! Trait interfaces to the simulation's external collaborators.
//!
//! - [`DecayOracle`] — advances an inventory by one quantum (fisspec-decay implements)
//! - [`GammaYieldTable`] — per-nuclide gamma lines (fisspec-sim's yield library implements)

use crate::error::{DataError, DecayError};
use crate::spectrum::GammaLine;
use crate::types::{Inventory, NuclideId, Quantum};

/// Pure transform from an inventory to the inventory one quantum later.
///
/// Must honor every decay chain and branching, and must be deterministic for
/// fixed inputs. Any error is fatal to the run that called it.
pub trait DecayOracle: Send + Sync {
    fn advance(&self, inventory: &Inventory, quantum: &Quantum) -> Result<Inventory, DecayError>;
}

/// Static gamma emission data, loaded once and never mutated.
pub trait GammaYieldTable: Send + Sync {
    /// Gamma lines emitted per decay of `nuclide`.
    ///
    /// A nuclide without an entry is a data-completeness failure
    /// ([`DataError::MissingGammaYields`]), never an implicit zero yield.
    fn yields(&self, nuclide: &NuclideId) -> Result<&[GammaLine], DataError>;

    /// Whether `nuclide` has an entry, even an empty one.
    ///
    /// Default implementation delegates to [`yields`](Self::yields).
    fn contains(&self, nuclide: &NuclideId) -> bool {
        self.yields(nuclide).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeUnit;
    use std::collections::HashMap;

    // ------------------------------------------------------------------
    // Mock: DecayOracle that halves every activity per quantum
    // ------------------------------------------------------------------

    struct HalvingOracle;

    impl DecayOracle for HalvingOracle {
        fn advance(&self, inventory: &Inventory, _quantum: &Quantum) -> Result<Inventory, DecayError> {
            Ok(inventory.iter().map(|(id, a)| (id.clone(), a / 2.0)).collect())
        }
    }

    // ------------------------------------------------------------------
    // Mock: GammaYieldTable backed by a HashMap
    // ------------------------------------------------------------------

    struct MapTable(HashMap<NuclideId, Vec<GammaLine>>);

    impl GammaYieldTable for MapTable {
        fn yields(&self, nuclide: &NuclideId) -> Result<&[GammaLine], DataError> {
            self.0
                .get(nuclide)
                .map(Vec::as_slice)
                .ok_or_else(|| DataError::MissingGammaYields(nuclide.to_string()))
        }
    }

    fn id(s: &str) -> NuclideId {
        NuclideId::parse(s).unwrap()
    }

    #[test]
    fn oracle_is_usable_as_trait_object() {
        let oracle: Box<dyn DecayOracle> = Box::new(HalvingOracle);
        let quantum = Quantum::new(1.0, TimeUnit::Hours).unwrap();
        let inv: Inventory = [(id("I-131"), 8.0)].into_iter().collect();
        let next = oracle.advance(&inv, &quantum).unwrap();
        assert_eq!(next.activity(&id("I-131")), 4.0);
        // Input is untouched.
        assert_eq!(inv.activity(&id("I-131")), 8.0);
    }

    #[test]
    fn contains_defaults_to_lookup() {
        let mut map = HashMap::new();
        map.insert(id("Ce-142"), Vec::new());
        map.insert(id("Cs-137"), vec![GammaLine::new(0.662, 0.851)]);
        let table = MapTable(map);

        assert!(table.contains(&id("Ce-142")));
        assert!(table.contains(&id("Cs-137")));
        assert!(!table.contains(&id("Xe-142")));
        assert_eq!(
            table.yields(&id("Xe-142")),
            Err(DataError::MissingGammaYields("Xe-142".into()))
        );
    }
}
