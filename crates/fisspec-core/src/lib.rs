//! # fisspec-core
//! Foundation types and traits for fission-product decay simulations.
//!
//! - [`types`] — nuclide identifiers, activity inventories, time quanta
//! - [`spectrum`] — the six fixed gamma energy bins and gamma lines
//! - [`traits`] — the seams to the decay solver and the gamma yield data
//! - [`error`] — error enums shared by every crate in the workspace

pub mod constants;
pub mod error;
pub mod spectrum;
pub mod traits;
pub mod types;
