//! Source term injector.
//!
//! A constant production rate per nuclide (Bq per second of operation) is
//! converted once into a per-step dose (`rate * quantum seconds`) and added to
//! the inventory before every decay advance. The source never depletes.

use std::collections::BTreeMap;

use fisspec_core::error::ConfigError;
use fisspec_core::types::{Inventory, NuclideId, Quantum};

#[derive(Clone, Debug, PartialEq)]
pub struct SourceTerm {
    dose: Inventory,
    quantum: Quantum,
}

impl SourceTerm {
    /// Validate `rates` and derive the per-step dose.
    ///
    /// Every rate must be finite and non-negative. Zero rates are accepted and
    /// contribute nothing.
    pub fn from_rates(
        rates: &BTreeMap<NuclideId, f64>,
        quantum: Quantum,
    ) -> Result<Self, ConfigError> {
        let seconds = quantum.seconds();
        let mut dose = Inventory::new();
        for (nuclide, &rate) in rates {
            if !rate.is_finite() {
                return Err(ConfigError::NonFiniteRate {
                    nuclide: nuclide.to_string(),
                    rate,
                });
            }
            if rate < 0.0 {
                return Err(ConfigError::NegativeRate {
                    nuclide: nuclide.to_string(),
                    rate,
                });
            }
            if rate > 0.0 {
                dose.set(nuclide.clone(), rate * seconds);
            }
        }
        Ok(Self { dose, quantum })
    }

    /// Activity added per step, per nuclide.
    pub fn dose(&self) -> &Inventory {
        &self.dose
    }

    pub fn quantum(&self) -> &Quantum {
        &self.quantum
    }

    /// Add one step's dose into `inventory`, inserting nuclides not yet present.
    pub fn inject(&self, inventory: &mut Inventory) {
        for (nuclide, activity) in self.dose.iter() {
            inventory.add(nuclide, activity);
        }
    }

    /// `inventory + dose` as a new value; `inventory` is left untouched.
    pub fn injected(&self, inventory: &Inventory) -> Inventory {
        let mut next = inventory.clone();
        self.inject(&mut next);
        next
    }
}
