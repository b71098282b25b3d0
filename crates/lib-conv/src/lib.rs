//! # lib-conv
//!
//! Block convolution of arbitrarily long sequences against FIR kernels.
//!
//! This crate provides:
//!
//! - **Reference convolution**: direct linear and circular convolution, the
//!   correctness oracle for everything else
//! - **Block partitioning**: zero-padding to whole blocks
//! - **Overlap-add**: independent block convolutions with carried tails
//! - **Overlap-save**: overlapping windows with discarded wraparound
//! - **Block steps**: direct summation or FFT multiply-and-invert per block
//! - **Configuration**: TOML/JSON engine selection and parallel channels
//!
//! Every engine instance owns its carry and output buffers; nothing is
//! shared between runs.

pub mod error;
pub mod reference;
pub mod partition;
pub mod fft;
pub mod block;
pub mod overlap_add;
pub mod overlap_save;
pub mod config;
pub mod engine;

pub use error::{ConvError, ConvResult};
pub use block::{BlockKernel, BlockStrategy, DirectBlock, EngineState, SpectralBlock};
pub use config::{ConvolutionConfig, Method};
pub use engine::{convolve_channels, max_abs_error, BlockEngine};
pub use fft::SpectralSample;
pub use overlap_add::OverlapAdd;
pub use overlap_save::OverlapSave;
