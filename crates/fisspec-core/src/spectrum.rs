//! Gamma energy bins and per-decay gamma lines.
//!
//! Six fixed, non-overlapping ranges in MeV: `[0,1) [1,2) [2,3) [3,4) [4,5) [5,inf)`.
//! A boundary energy belongs to the upper bin, so exactly 1.0 MeV lands in `[1,2)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{BIN_COUNT, BIN_WIDTH_MEV};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnergyBin {
    Mev0To1,
    Mev1To2,
    Mev2To3,
    Mev3To4,
    Mev4To5,
    Mev5Up,
}

impl EnergyBin {
    /// All bins in ascending energy order.
    pub const ALL: [EnergyBin; BIN_COUNT] = [
        Self::Mev0To1,
        Self::Mev1To2,
        Self::Mev2To3,
        Self::Mev3To4,
        Self::Mev4To5,
        Self::Mev5Up,
    ];

    /// Bin containing `energy_mev`. `None` for negative or NaN energies.
    ///
    /// # Examples
    ///
    /// ```
    /// use fisspec_core::spectrum::EnergyBin;
    /// assert_eq!(EnergyBin::for_energy(0.9999), Some(EnergyBin::Mev0To1));
    /// assert_eq!(EnergyBin::for_energy(1.0), Some(EnergyBin::Mev1To2));
    /// assert_eq!(EnergyBin::for_energy(12.0), Some(EnergyBin::Mev5Up));
    /// assert_eq!(EnergyBin::for_energy(-0.1), None);
    /// ```
    pub fn for_energy(energy_mev: f64) -> Option<Self> {
        if energy_mev.is_nan() || energy_mev < 0.0 {
            return None;
        }
        let index = (energy_mev / BIN_WIDTH_MEV).floor();
        if index >= (BIN_COUNT - 1) as f64 {
            return Some(Self::Mev5Up);
        }
        Some(Self::ALL[index as usize])
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Inclusive lower edge in MeV.
    pub fn lower_mev(&self) -> f64 {
        self.index() as f64 * BIN_WIDTH_MEV
    }

    /// Exclusive upper edge in MeV, `None` for the open-ended top bin.
    pub fn upper_mev(&self) -> Option<f64> {
        match self {
            Self::Mev5Up => None,
            _ => Some(self.lower_mev() + BIN_WIDTH_MEV),
        }
    }

    /// Column label used in output headers, e.g. `1-2MeV`, `5+MeV`.
    pub fn label(&self) -> String {
        match self.upper_mev() {
            Some(upper) => format!("{}-{}MeV", self.lower_mev(), upper),
            None => format!("{}+MeV", self.lower_mev()),
        }
    }
}

impl fmt::Display for EnergyBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Total gamma intensity per energy bin, in photons per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BinVector(pub [f64; BIN_COUNT]);

impl BinVector {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bin: EnergyBin, intensity: f64) {
        self.0[bin.index()] += intensity;
    }

    pub fn get(&self, bin: EnergyBin) -> f64 {
        self.0[bin.index()]
    }

    /// Sum over all six bins.
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn as_array(&self) -> &[f64; BIN_COUNT] {
        &self.0
    }

    /// Element-wise sum, used when partial vectors are reduced together.
    pub fn merged(mut self, other: &BinVector) -> Self {
        for (acc, value) in self.0.iter_mut().zip(other.0.iter()) {
            *acc += value;
        }
        self
    }
}

/// One gamma emission line: photon energy and emission probability per decay.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GammaLine {
    pub energy_mev: f64,
    pub probability: f64,
}

impl GammaLine {
    pub fn new(energy_mev: f64, probability: f64) -> Self {
        Self {
            energy_mev,
            probability,
        }
    }

    /// Energy finite and non-negative, probability finite in `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.energy_mev.is_finite()
            && self.energy_mev >= 0.0
            && self.probability.is_finite()
            && (0.0..=1.0).contains(&self.probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn boundaries_belong_to_upper_bin() {
        for (edge, bin) in [
            (0.0, EnergyBin::Mev0To1),
            (1.0, EnergyBin::Mev1To2),
            (2.0, EnergyBin::Mev2To3),
            (3.0, EnergyBin::Mev3To4),
            (4.0, EnergyBin::Mev4To5),
            (5.0, EnergyBin::Mev5Up),
        ] {
            assert_eq!(EnergyBin::for_energy(edge), Some(bin), "edge {edge}");
        }
    }

    #[test]
    fn top_bin_is_open_ended() {
        assert_eq!(EnergyBin::for_energy(1e6), Some(EnergyBin::Mev5Up));
        assert_eq!(EnergyBin::for_energy(f64::INFINITY), Some(EnergyBin::Mev5Up));
        assert_eq!(EnergyBin::Mev5Up.upper_mev(), None);
    }

    #[test]
    fn nan_and_negative_have_no_bin() {
        assert_eq!(EnergyBin::for_energy(f64::NAN), None);
        assert_eq!(EnergyBin::for_energy(-1e-12), None);
    }

    #[test]
    fn labels() {
        let labels: Vec<String> = EnergyBin::ALL.iter().map(EnergyBin::label).collect();
        assert_eq!(
            labels,
            ["0-1MeV", "1-2MeV", "2-3MeV", "3-4MeV", "4-5MeV", "5+MeV"]
        );
    }

    #[test]
    fn bin_vector_accumulates() {
        let mut v = BinVector::zero();
        v.add(EnergyBin::Mev1To2, 2.0);
        v.add(EnergyBin::Mev1To2, 0.5);
        v.add(EnergyBin::Mev5Up, 1.0);
        assert_eq!(v.get(EnergyBin::Mev1To2), 2.5);
        assert_eq!(v.total(), 3.5);

        let merged = v.merged(&v);
        assert_eq!(merged.get(EnergyBin::Mev5Up), 2.0);
    }

    #[test]
    fn gamma_line_validation() {
        assert!(GammaLine::new(0.662, 0.851).is_valid());
        assert!(GammaLine::new(0.0, 0.0).is_valid());
        assert!(!GammaLine::new(-0.1, 0.5).is_valid());
        assert!(!GammaLine::new(1.0, 1.5).is_valid());
        assert!(!GammaLine::new(f64::NAN, 0.5).is_valid());
    }

    proptest! {
        #[test]
        fn bin_contains_its_energy(energy in 0.0f64..50.0) {
            let bin = EnergyBin::for_energy(energy).unwrap();
            prop_assert!(energy >= bin.lower_mev());
            if let Some(upper) = bin.upper_mev() {
                prop_assert!(energy < upper);
            }
        }
    }
}
