//! Decay engine implementing the [`DecayOracle`] trait.
//!
//! For a unit number of atoms of parent `i`, the atom count of every
//! descendant `j` is a sum of exponentials (the Bateman solution):
//!
//! `N_j(t) = sum_k a_jk * exp(-lambda_k * t)`
//!
//! The coefficients `a_jk` depend only on the chain, so they are expanded once
//! in [`DecayEngine::new`]. Advancing by a quantum then needs only
//! `exp(-lambda_k * dt)` per nuclide, folded into a sparse activity propagator
//! that is cached per quantum length.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use fisspec_core::constants::DEGENERACY_TOLERANCE;
use fisspec_core::error::DecayError;
use fisspec_core::traits::DecayOracle;
use fisspec_core::types::{Inventory, NuclideId, Quantum, TimeUnit};

use crate::chain::DecayData;

/// Bateman expansion of one descendant `j` of a parent `i`.
#[derive(Debug, Clone)]
struct ChainTerm {
    daughter: usize,
    /// `lambda_j / lambda_i`, converting atom ratios to activity ratios.
    activity_ratio: f64,
    /// `(k, a_jk)` pairs.
    exponentials: Vec<(usize, f64)>,
}

/// Activity propagator for one quantum length.
///
/// `columns[i]` lists `(j, c)`: each Bq of `i` now contributes `c` Bq of `j`
/// one quantum later.
#[derive(Debug)]
struct Propagator {
    columns: Vec<Vec<(usize, f64)>>,
}

/// The production decay oracle: exact linear-chain solution with branching.
pub struct DecayEngine {
    data: DecayData,
    lambdas: Vec<f64>,
    /// Per parent, the expansion of itself and every radioactive descendant.
    solutions: Vec<Vec<ChainTerm>>,
    propagators: RwLock<HashMap<u64, Arc<Propagator>>>,
}

impl DecayEngine {
    /// Expand the Bateman solution for every radioactive nuclide in `data`.
    ///
    /// Fails when two nuclides connected by a chain share a decay constant,
    /// which this closed form cannot represent.
    pub fn new(data: DecayData) -> Result<Self, DecayError> {
        let lambdas: Vec<f64> = (0..data.len())
            .map(|i| data.entry(i).decay_constant())
            .collect();
        let solutions = (0..data.len())
            .map(|i| expand_parent(&data, &lambdas, i))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(nuclides = data.len(), "decay engine ready");
        Ok(Self {
            data,
            lambdas,
            solutions,
            propagators: RwLock::new(HashMap::new()),
        })
    }

    pub fn data(&self) -> &DecayData {
        &self.data
    }

    /// Decay constant of `nuclide` in 1/s, `None` if it is not in the data.
    pub fn decay_constant(&self, nuclide: &NuclideId) -> Option<f64> {
        self.data.index_of(nuclide).map(|i| self.lambdas[i])
    }

    /// Decay `inventory` for `length` units of time in one shot.
    ///
    /// Unlike [`DecayOracle::advance`] the propagator is not cached, so
    /// arbitrary one-off durations do not grow the cache.
    pub fn decay_for(
        &self,
        inventory: &Inventory,
        length: f64,
        unit: TimeUnit,
    ) -> Result<Inventory, DecayError> {
        let dt = length * unit.seconds();
        check_interval(dt)?;
        let propagator = self.build_propagator(dt)?;
        self.apply(&propagator, inventory)
    }

    /// Cached propagator for an interval of `dt` seconds.
    fn propagator(&self, dt: f64) -> Result<Arc<Propagator>, DecayError> {
        let key = dt.to_bits();
        if let Some(found) = self.propagators.read().get(&key) {
            return Ok(Arc::clone(found));
        }
        let built = Arc::new(self.build_propagator(dt)?);
        let mut cache = self.propagators.write();
        Ok(Arc::clone(cache.entry(key).or_insert(built)))
    }

    fn build_propagator(&self, dt: f64) -> Result<Propagator, DecayError> {
        let factors: Vec<f64> = self.lambdas.iter().map(|l| (-l * dt).exp()).collect();

        let mut columns = Vec::with_capacity(self.solutions.len());
        for terms in &self.solutions {
            let mut column = Vec::with_capacity(terms.len());
            for term in terms {
                let atoms: f64 = term
                    .exponentials
                    .iter()
                    .map(|(k, a)| a * factors[*k])
                    .sum();
                let coefficient = term.activity_ratio * atoms;
                if !coefficient.is_finite() {
                    return Err(DecayError::NonFinite(
                        self.data.nuclide(term.daughter).to_string(),
                    ));
                }
                column.push((term.daughter, coefficient));
            }
            columns.push(column);
        }

        debug!(dt_s = dt, nuclides = columns.len(), "built decay propagator");
        Ok(Propagator { columns })
    }

    fn apply(&self, propagator: &Propagator, inventory: &Inventory) -> Result<Inventory, DecayError> {
        let mut activities = vec![0.0; self.data.len()];
        for (nuclide, activity) in inventory.active() {
            let i = self
                .data
                .index_of(nuclide)
                .ok_or_else(|| DecayError::UnknownNuclide(nuclide.to_string()))?;
            for (j, coefficient) in &propagator.columns[i] {
                activities[*j] += coefficient * activity;
            }
        }

        let mut next = Inventory::new();
        for (j, activity) in activities.into_iter().enumerate() {
            if !activity.is_finite() {
                return Err(DecayError::NonFinite(self.data.nuclide(j).to_string()));
            }
            if activity > 0.0 {
                next.set(self.data.nuclide(j).clone(), activity);
            }
        }
        Ok(next)
    }
}

impl DecayOracle for DecayEngine {
    fn advance(&self, inventory: &Inventory, quantum: &Quantum) -> Result<Inventory, DecayError> {
        let dt = quantum.seconds();
        check_interval(dt)?;
        let propagator = self.propagator(dt)?;
        self.apply(&propagator, inventory)
    }
}

fn check_interval(dt: f64) -> Result<(), DecayError> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(DecayError::InvalidQuantum(dt));
    }
    Ok(())
}

/// Bateman coefficients for unit atoms of `parent` and each radioactive descendant.
///
/// Stable nuclides carry no activity and have no progeny, so they are skipped
/// both as sources and as daughters.
fn expand_parent(
    data: &DecayData,
    lambdas: &[f64],
    parent: usize,
) -> Result<Vec<ChainTerm>, DecayError> {
    if lambdas[parent] == 0.0 {
        return Ok(Vec::new());
    }

    // Indices follow parents-first order, so ascending iteration visits every
    // contributing parent of `j` before `j` itself.
    let mut descendants = BTreeSet::new();
    let mut frontier = vec![parent];
    while let Some(n) = frontier.pop() {
        for branch in &data.entry(n).progeny {
            if let Some(d) = data.index_of(&branch.nuclide) {
                if lambdas[d] > 0.0 && descendants.insert(d) {
                    frontier.push(d);
                }
            }
        }
    }

    let mut expansions: BTreeMap<usize, BTreeMap<usize, f64>> = BTreeMap::new();
    expansions.insert(parent, BTreeMap::from([(parent, 1.0)]));

    for &j in &descendants {
        let lambda_j = lambdas[j];
        let mut coefficients: BTreeMap<usize, f64> = BTreeMap::new();
        for (p, p_terms) in &expansions {
            let Some(fraction) = data
                .entry(*p)
                .progeny
                .iter()
                .find(|b| data.index_of(&b.nuclide) == Some(j))
                .map(|b| b.fraction)
            else {
                continue;
            };
            let feed = fraction * lambdas[*p];
            for (&k, &a_pk) in p_terms {
                let numerator = feed * a_pk;
                if numerator == 0.0 {
                    continue;
                }
                let gap = lambda_j - lambdas[k];
                if gap.abs() <= DEGENERACY_TOLERANCE * lambda_j.max(lambdas[k]) {
                    return Err(DecayError::DegenerateChain {
                        parent: data.nuclide(k).to_string(),
                        daughter: data.nuclide(j).to_string(),
                        lambda: lambda_j,
                    });
                }
                *coefficients.entry(k).or_insert(0.0) += numerator / gap;
            }
        }
        // No atoms of `j` at t = 0.
        let own: f64 = -coefficients.values().sum::<f64>();
        coefficients.insert(j, own);
        expansions.insert(j, coefficients);
    }

    let lambda_parent = lambdas[parent];
    Ok(expansions
        .into_iter()
        .map(|(j, coefficients)| ChainTerm {
            daughter: j,
            activity_ratio: lambdas[j] / lambda_parent,
            exponentials: coefficients.into_iter().collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Branch, NuclideData};
    use proptest::prelude::*;
    use std::f64::consts::LN_2;

    fn id(s: &str) -> NuclideId {
        NuclideId::parse(s).unwrap()
    }

    fn branch(s: &str, fraction: f64) -> Branch {
        Branch {
            nuclide: id(s),
            fraction,
        }
    }

    fn engine(entries: Vec<(&str, NuclideData)>) -> DecayEngine {
        let map = entries.into_iter().map(|(n, e)| (id(n), e)).collect();
        DecayEngine::new(DecayData::from_entries(map).unwrap()).unwrap()
    }

    fn seconds(length: f64) -> Quantum {
        Quantum::new(length, TimeUnit::Seconds).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1e-300)
    }

    #[test]
    fn single_nuclide_decays_exponentially() {
        let e = engine(vec![("I-131", NuclideData::radioactive(100.0, vec![]))]);
        let inv: Inventory = [(id("I-131"), 1000.0)].into_iter().collect();
        let next = e.advance(&inv, &seconds(100.0)).unwrap();
        assert!(close(next.activity(&id("I-131")), 500.0));
    }

    #[test]
    fn parent_daughter_matches_bateman() {
        let (t1, t2) = (10.0, 50.0);
        let e = engine(vec![
            ("Aa-10", NuclideData::radioactive(t1, vec![branch("Bb-10", 1.0)])),
            ("Bb-10", NuclideData::radioactive(t2, vec![])),
        ]);
        let (l1, l2) = (LN_2 / t1, LN_2 / t2);
        let a0 = 1.0e6;
        let dt = 7.0;
        let inv: Inventory = [(id("Aa-10"), a0)].into_iter().collect();
        let next = e.advance(&inv, &seconds(dt)).unwrap();

        let parent = a0 * (-l1 * dt).exp();
        let daughter = a0 * l2 / (l2 - l1) * ((-l1 * dt).exp() - (-l2 * dt).exp());
        assert!(close(next.activity(&id("Aa-10")), parent));
        assert!(close(next.activity(&id("Bb-10")), daughter));
    }

    #[test]
    fn branching_splits_activity() {
        let e = engine(vec![
            (
                "Aa-1",
                NuclideData::radioactive(5.0, vec![branch("Bb-1", 0.25), branch("Cc-1", 0.75)]),
            ),
            ("Bb-1", NuclideData::radioactive(1.0e9, vec![])),
            ("Cc-1", NuclideData::radioactive(1.0e9, vec![])),
        ]);
        let inv: Inventory = [(id("Aa-1"), 1.0e9)].into_iter().collect();
        let next = e.advance(&inv, &seconds(1.0)).unwrap();
        let ratio = next.activity(&id("Cc-1")) / next.activity(&id("Bb-1"));
        assert!(close(ratio, 3.0), "ratio {ratio}");
    }

    #[test]
    fn converging_paths_sum() {
        // Aa -> Bb -> Dd and Aa -> Cc -> Dd
        let e = engine(vec![
            (
                "Aa-1",
                NuclideData::radioactive(2.0, vec![branch("Bb-1", 0.5), branch("Cc-1", 0.5)]),
            ),
            ("Bb-1", NuclideData::radioactive(3.0, vec![branch("Dd-1", 1.0)])),
            ("Cc-1", NuclideData::radioactive(4.0, vec![branch("Dd-1", 1.0)])),
            ("Dd-1", NuclideData::radioactive(7.0, vec![])),
        ]);
        let inv: Inventory = [(id("Aa-1"), 100.0)].into_iter().collect();
        // Two half steps must equal one full step.
        let once = e.advance(&inv, &seconds(6.0)).unwrap();
        let half = e.advance(&inv, &seconds(3.0)).unwrap();
        let twice = e.advance(&half, &seconds(3.0)).unwrap();
        for n in ["Aa-1", "Bb-1", "Cc-1", "Dd-1"] {
            assert!(
                close(once.activity(&id(n)), twice.activity(&id(n))),
                "{n}: {} vs {}",
                once.activity(&id(n)),
                twice.activity(&id(n))
            );
        }
        assert!(once.activity(&id("Dd-1")) > 0.0);
    }

    #[test]
    fn stable_daughters_leave_the_inventory() {
        let e = engine(vec![
            ("La-142", NuclideData::radioactive(5466.0, vec![branch("Ce-142", 1.0)])),
            ("Ce-142", NuclideData::stable()),
        ]);
        let inv: Inventory = [(id("La-142"), 10.0)].into_iter().collect();
        let next = e.advance(&inv, &seconds(60.0)).unwrap();
        assert!(!next.contains(&id("Ce-142")));
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn unknown_nuclide_is_an_error() {
        let e = engine(vec![("I-131", NuclideData::radioactive(100.0, vec![]))]);
        let inv: Inventory = [(id("Cs-137"), 1.0)].into_iter().collect();
        assert_eq!(
            e.advance(&inv, &seconds(1.0)).unwrap_err(),
            DecayError::UnknownNuclide("Cs-137".into())
        );
    }

    #[test]
    fn equal_decay_constants_in_a_chain_are_rejected() {
        let map = [
            (id("Aa-1"), NuclideData::radioactive(5.0, vec![branch("Bb-1", 1.0)])),
            (id("Bb-1"), NuclideData::radioactive(5.0, vec![])),
        ]
        .into_iter()
        .collect();
        let err = DecayEngine::new(DecayData::from_entries(map).unwrap())
            .err()
            .unwrap();
        assert!(matches!(err, DecayError::DegenerateChain { .. }));
    }

    #[test]
    fn nearly_equal_decay_constants_in_a_chain_are_rejected() {
        for eps in [1e-12, 1e-14] {
            let map = [
                (id("Aa-1"), NuclideData::radioactive(5.0, vec![branch("Bb-1", 1.0)])),
                (id("Bb-1"), NuclideData::radioactive(5.0 * (1.0 + eps), vec![])),
            ]
            .into_iter()
            .collect();
            let err = DecayEngine::new(DecayData::from_entries(map).unwrap())
                .err()
                .unwrap();
            assert!(matches!(err, DecayError::DegenerateChain { .. }), "eps = {eps}");
        }
    }

    #[test]
    fn close_but_resolvable_constants_stay_accurate() {
        // Half-lives 5 s and 5.0005 s; daughter activity after 5 s from
        // 1e6 Bq of parent, against the equal-constant limit lambda*t*A*e^(-lambda*t).
        let e = engine(vec![
            ("Aa-1", NuclideData::radioactive(5.0, vec![branch("Bb-1", 1.0)])),
            ("Bb-1", NuclideData::radioactive(5.0005, vec![])),
        ]);
        let inv: Inventory = [(id("Aa-1"), 1.0e6)].into_iter().collect();
        let next = e.advance(&inv, &seconds(5.0)).unwrap();
        let limit = LN_2 * 1.0e6 * 0.5;
        let got = next.activity(&id("Bb-1"));
        assert!((got / limit - 1.0).abs() < 1e-3, "{got} vs {limit}");
    }

    #[test]
    fn equal_constants_in_unrelated_chains_are_fine() {
        let e = engine(vec![
            ("Aa-1", NuclideData::radioactive(5.0, vec![])),
            ("Bb-1", NuclideData::radioactive(5.0, vec![])),
        ]);
        assert_eq!(e.decay_constant(&id("Aa-1")), e.decay_constant(&id("Bb-1")));
    }

    #[test]
    fn decay_for_uses_units() {
        let e = engine(vec![("Xe-142", NuclideData::radioactive(3600.0, vec![]))]);
        let inv: Inventory = [(id("Xe-142"), 8.07e6)].into_iter().collect();
        let next = e.decay_for(&inv, 1.0, TimeUnit::Hours).unwrap();
        assert!(close(next.activity(&id("Xe-142")), 8.07e6 / 2.0));
        assert!(e.propagators.read().is_empty());

        assert_eq!(
            e.decay_for(&inv, 0.0, TimeUnit::Hours).unwrap_err(),
            DecayError::InvalidQuantum(0.0)
        );
    }

    #[test]
    fn propagators_are_cached_per_quantum() {
        let e = engine(vec![("I-131", NuclideData::radioactive(100.0, vec![]))]);
        let inv: Inventory = [(id("I-131"), 1.0)].into_iter().collect();
        e.advance(&inv, &seconds(1.0)).unwrap();
        e.advance(&inv, &seconds(1.0)).unwrap();
        e.advance(&inv, &Quantum::new(1.0, TimeUnit::Minutes).unwrap()).unwrap();
        assert_eq!(e.propagators.read().len(), 2);
    }

    #[test]
    fn empty_inventory_stays_empty() {
        let e = engine(vec![("I-131", NuclideData::radioactive(100.0, vec![]))]);
        let next = e.advance(&Inventory::new(), &seconds(1.0)).unwrap();
        assert!(next.is_empty());
    }

    proptest! {
        #[test]
        fn activity_never_negative_and_never_grows_for_single_nuclide(
            half_life in 1e-3f64..1e9,
            activity in 0.0f64..1e12,
            dt in 1e-3f64..1e7,
        ) {
            let e = engine(vec![("Sr-90", NuclideData::radioactive(half_life, vec![]))]);
            let inv: Inventory = [(id("Sr-90"), activity)].into_iter().collect();
            let next = e.advance(&inv, &seconds(dt)).unwrap();
            let after = next.activity(&id("Sr-90"));
            prop_assert!(after >= 0.0);
            prop_assert!(after <= activity);
        }
    }
}
