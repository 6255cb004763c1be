//! Core simulation types: nuclide identifiers, inventories, time quanta.
//!
//! Activities are in Becquerel throughout. Inventories are ordered maps so
//! that iteration (and therefore floating-point accumulation) is
//! deterministic for a given set of nuclides.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE, SECONDS_PER_YEAR};
use crate::error::{ConfigError, DataError};

/// Canonical isotope identifier: `Symbol-Mass[marker]`, e.g. `Xe-142`, `Tc-99m`.
///
/// Parsing accepts `Xe-142`, `Xe142`, `142Xe`, `xe-142` and the metastable
/// forms `Tc-99m`, `Tc99m`, `99mTc`. Two identifiers are equal iff their
/// canonical strings are equal, and they order lexicographically by it.
///
/// # Examples
///
/// ```
/// use fisspec_core::types::NuclideId;
/// let a = NuclideId::parse("142Xe").unwrap();
/// let b = NuclideId::parse("xe-142").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "Xe-142");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NuclideId(String);

impl NuclideId {
    pub fn parse(text: &str) -> Result<Self, DataError> {
        let invalid = || DataError::InvalidNuclide(text.to_string());
        let compact: String = text.trim().chars().filter(|c| *c != '-').collect();

        let (symbol, mass, marker) = if compact.starts_with(|c: char| c.is_ascii_alphabetic()) {
            // Symbol first: "Xe142", "Tc99m".
            let digits_at = compact.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
            let (symbol, rest) = compact.split_at(digits_at);
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            let (mass, marker) = rest.split_at(digits_end);
            (symbol, mass, marker)
        } else {
            // Mass first: "142Xe", "99mTc", "99mtc". A lowercase marker is
            // followed by an uppercase symbol or by two more letters, so
            // "99Mo" and "99mo" stay molybdenum.
            let digits_end = compact
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(invalid)?;
            let (mass, rest) = compact.split_at(digits_end);
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(m @ ('m' | 'n')), Some(next))
                    if next.is_ascii_uppercase() || rest.len() == 3 =>
                {
                    (&rest[1..], mass, if m == 'm' { "m" } else { "n" })
                }
                _ => (rest, mass, ""),
            }
        };

        if symbol.is_empty() || symbol.len() > 2 || !symbol.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(invalid());
        }
        if mass.is_empty() || mass.len() > 3 {
            return Err(invalid());
        }
        let mass: u16 = mass.parse().map_err(|_| invalid())?;
        if mass == 0 {
            return Err(invalid());
        }
        if !matches!(marker, "" | "m" | "n") {
            return Err(invalid());
        }

        let mut canonical = String::with_capacity(8);
        let mut letters = symbol.chars();
        if let Some(first) = letters.next() {
            canonical.push(first.to_ascii_uppercase());
        }
        canonical.extend(letters.map(|c| c.to_ascii_lowercase()));
        canonical.push('-');
        canonical.push_str(&mass.to_string());
        canonical.push_str(marker);
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NuclideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NuclideId {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NuclideId {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NuclideId> for String {
    fn from(id: NuclideId) -> Self {
        id.0
    }
}

/// Activity of each nuclide at a single instant, in Bq.
///
/// Absent nuclides have zero activity. Stored activities are never negative.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    activities: BTreeMap<NuclideId, f64>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activity of `nuclide` in Bq, zero when absent.
    pub fn activity(&self, nuclide: &NuclideId) -> f64 {
        self.activities.get(nuclide).copied().unwrap_or(0.0)
    }

    /// Set the activity of `nuclide`. Negative round-off is clamped to zero.
    pub fn set(&mut self, nuclide: NuclideId, activity: f64) {
        self.activities.insert(nuclide, activity.max(0.0));
    }

    /// Add `activity` to `nuclide`, inserting it when not yet present.
    pub fn add(&mut self, nuclide: &NuclideId, activity: f64) {
        match self.activities.get_mut(nuclide) {
            Some(existing) => *existing = (*existing + activity).max(0.0),
            None => {
                self.activities.insert(nuclide.clone(), activity.max(0.0));
            }
        }
    }

    pub fn contains(&self, nuclide: &NuclideId) -> bool {
        self.activities.contains_key(nuclide)
    }

    /// Entries in lexicographic nuclide order.
    pub fn iter(&self) -> impl Iterator<Item = (&NuclideId, f64)> + '_ {
        self.activities.iter().map(|(id, a)| (id, *a))
    }

    /// Entries with strictly positive activity.
    pub fn active(&self) -> impl Iterator<Item = (&NuclideId, f64)> + '_ {
        self.iter().filter(|(_, a)| *a > 0.0)
    }

    pub fn nuclides(&self) -> impl Iterator<Item = &NuclideId> + '_ {
        self.activities.keys()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Sum of all activities in Bq.
    pub fn total_activity(&self) -> f64 {
        self.activities.values().sum()
    }
}

impl FromIterator<(NuclideId, f64)> for Inventory {
    fn from_iter<I: IntoIterator<Item = (NuclideId, f64)>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for (nuclide, activity) in iter {
            inventory.add(&nuclide, activity);
        }
        inventory
    }
}

/// Unit of a decay quantum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Years,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => SECONDS_PER_MINUTE,
            Self::Hours => SECONDS_PER_HOUR,
            Self::Days => SECONDS_PER_DAY,
            Self::Years => SECONDS_PER_YEAR,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
            Self::Years => "y",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for TimeUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => Ok(Self::Seconds),
            "m" | "min" | "minute" | "minutes" => Ok(Self::Minutes),
            "h" | "hr" | "hour" | "hours" => Ok(Self::Hours),
            "d" | "day" | "days" => Ok(Self::Days),
            "y" | "yr" | "year" | "years" => Ok(Self::Years),
            _ => Err(ConfigError::UnknownTimeUnit(s.to_string())),
        }
    }
}

impl TryFrom<String> for TimeUnit {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeUnit> for String {
    fn from(unit: TimeUnit) -> Self {
        unit.symbol().to_string()
    }
}

/// Fixed time increment advanced per simulation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantum {
    length: f64,
    unit: TimeUnit,
}

impl Quantum {
    /// Create a quantum of `length` units. The length must be finite and positive.
    pub fn new(length: f64, unit: TimeUnit) -> Result<Self, ConfigError> {
        if !length.is_finite() || length <= 0.0 {
            return Err(ConfigError::NonPositiveQuantum(length));
        }
        Ok(Self { length, unit })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Duration of the quantum in seconds.
    pub fn seconds(&self) -> f64 {
        self.length * self.unit.seconds()
    }
}

impl fmt::Display for Quantum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.length, self.unit)
    }
}
