//! # lib-types
//!
//! Core type definitions shared by the block convolution engines.
//!
//! - Sample domain: real, complex and checked fixed-width integer samples
//! - Owned, time-ordered sequences with optional rate metadata

pub mod sample;
pub mod sequence;

pub use sample::Sample;
pub use sequence::Sequence;

/// Re-export num_complex for convenience
pub use num_complex::{Complex32, Complex64};
