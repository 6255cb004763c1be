//! Spectral binner: inventory activity weighted by gamma yields, per energy bin.
//!
//! Each nuclide contributes `activity * probability` to the bin holding each
//! of its line energies. Contributions are independent per nuclide and are
//! reduced into one [`BinVector`] in lexicographic nuclide order.

use fisspec_core::error::DataError;
use fisspec_core::spectrum::{BinVector, EnergyBin};
use fisspec_core::traits::GammaYieldTable;
use fisspec_core::types::{Inventory, NuclideId};

/// Bin contribution of a single nuclide at `activity` Bq.
pub fn nuclide_spectrum<Y: GammaYieldTable + ?Sized>(
    nuclide: &NuclideId,
    activity: f64,
    table: &Y,
) -> Result<BinVector, DataError> {
    let mut bins = BinVector::zero();
    for line in table.yields(nuclide)? {
        let bin = EnergyBin::for_energy(line.energy_mev).ok_or_else(|| {
            DataError::InvalidGammaLine {
                nuclide: nuclide.to_string(),
                energy_mev: line.energy_mev,
                probability: line.probability,
            }
        })?;
        bins.add(bin, activity * line.probability);
    }
    Ok(bins)
}

/// Six-bin gamma intensity of `inventory`.
///
/// Fails fast on the first nuclide with nonzero activity that has no entry in
/// `table`; a missing entry is never treated as zero yield.
pub fn bin_inventory<Y: GammaYieldTable + ?Sized>(
    inventory: &Inventory,
    table: &Y,
) -> Result<BinVector, DataError> {
    inventory
        .active()
        .try_fold(BinVector::zero(), |acc, (nuclide, activity)| {
            Ok(acc.merged(&nuclide_spectrum(nuclide, activity, table)?))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yields::YieldLibrary;
    use fisspec_core::spectrum::GammaLine;
    use proptest::prelude::*;

    fn id(s: &str) -> NuclideId {
        NuclideId::parse(s).unwrap()
    }

    fn library(entries: &[(&str, &[(f64, f64)])]) -> YieldLibrary {
        let mut lib = YieldLibrary::new();
        for (name, lines) in entries {
            lib.insert(id(name), lines.iter().map(|(e, p)| GammaLine::new(*e, *p)))
                .unwrap();
        }
        lib
    }

    #[test]
    fn closed_form_single_nuclide() {
        let lib = library(&[("La-142", &[(0.6413, 0.474), (2.3978, 0.133), (3.3, 0.02)])]);
        let inv: Inventory = [(id("La-142"), 1000.0)].into_iter().collect();
        let bins = bin_inventory(&inv, &lib).unwrap();
        assert_eq!(bins.get(EnergyBin::Mev0To1), 474.0);
        assert_eq!(bins.get(EnergyBin::Mev1To2), 0.0);
        assert_eq!(bins.get(EnergyBin::Mev2To3), 133.0);
        assert_eq!(bins.get(EnergyBin::Mev3To4), 20.0);
    }

    #[test]
    fn boundary_energy_goes_to_upper_bin() {
        let lib = library(&[("Aa-1", &[(1.0, 1.0)]), ("Bb-1", &[(5.0, 0.5)])]);
        let inv: Inventory = [(id("Aa-1"), 10.0), (id("Bb-1"), 10.0)].into_iter().collect();
        let bins = bin_inventory(&inv, &lib).unwrap();
        assert_eq!(bins.get(EnergyBin::Mev0To1), 0.0);
        assert_eq!(bins.get(EnergyBin::Mev1To2), 10.0);
        assert_eq!(bins.get(EnergyBin::Mev4To5), 0.0);
        assert_eq!(bins.get(EnergyBin::Mev5Up), 5.0);
    }

    #[test]
    fn missing_yield_entry_fails_fast() {
        let lib = library(&[("Ba-142", &[(0.2553, 0.205)])]);
        let inv: Inventory = [(id("Ba-142"), 1.0), (id("Cs-142"), 1.0)].into_iter().collect();
        assert_eq!(
            bin_inventory(&inv, &lib),
            Err(DataError::MissingGammaYields("Cs-142".into()))
        );
    }

    #[test]
    fn zero_activity_nuclide_needs_no_entry() {
        let lib = library(&[]);
        let mut inv = Inventory::new();
        inv.set(id("Cs-142"), 0.0);
        assert_eq!(bin_inventory(&inv, &lib).unwrap(), BinVector::zero());
    }

    #[test]
    fn empty_entry_contributes_nothing() {
        let lib = library(&[("Ce-142", &[])]);
        let inv: Inventory = [(id("Ce-142"), 50.0)].into_iter().collect();
        assert_eq!(bin_inventory(&inv, &lib).unwrap().total(), 0.0);
    }

    proptest! {
        /// With one certain line per nuclide, total intensity equals total activity.
        #[test]
        fn unit_yields_conserve_activity(
            entries in prop::collection::vec((0.0f64..12.0, 0.0f64..1e9), 1..8),
        ) {
            let mut lib = YieldLibrary::new();
            let mut inv = Inventory::new();
            for (n, (energy, activity)) in entries.iter().enumerate() {
                let nuclide = id(&format!("Xx-{}", n + 1));
                lib.insert(nuclide.clone(), [GammaLine::new(*energy, 1.0)]).unwrap();
                inv.set(nuclide, *activity);
            }
            let bins = bin_inventory(&inv, &lib).unwrap();
            let total = inv.total_activity();
            prop_assert!((bins.total() - total).abs() <= 1e-9 * total.max(1.0));
            prop_assert!(bins.as_array().iter().all(|b| *b >= 0.0));
        }
    }
}
