//! # fisspec-decay — Decay-chain data and exact decay engine.
//!
//! - **Chain data**: half-lives, progeny and branching fractions, validated
//!   and ordered parents-before-daughters once at load.
//! - **Bateman solution**: each parent's descendants are expanded into sums
//!   of exponentials, so advancing by a quantum is a sparse
//!   matrix-vector product with no time-stepping error.
//! - **Propagator cache**: the per-quantum coefficients are computed once per
//!   quantum length and shared across steps.

pub mod chain;
pub mod engine;

pub use chain::{Branch, DecayData, NuclideData};
pub use engine::DecayEngine;
