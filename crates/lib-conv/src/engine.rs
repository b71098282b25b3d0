//! Config-driven engine selection and multi-channel convolution.
//!
//! Each channel gets its own engine, so channels share nothing mutable and
//! are convolved in parallel with Rayon. Within a channel blocks are always
//! processed in order.

use crate::block::{boxed_block, BlockKernel};
use crate::config::{ConvolutionConfig, Method};
use crate::error::ConvResult;
use crate::fft::SpectralSample;
use crate::overlap_add::OverlapAdd;
use crate::overlap_save::OverlapSave;
use lib_types::{Sample, Sequence};
use rayon::prelude::*;
use std::ops::{Range, Sub};

/// Boxed block step selected at runtime.
pub type DynBlock<T> = Box<dyn BlockKernel<T> + Send>;

/// An engine built from a [`ConvolutionConfig`].
pub enum BlockEngine<T: Sample> {
    /// Overlap-add engine.
    Add(OverlapAdd<T, DynBlock<T>>),
    /// Overlap-save engine.
    Save(OverlapSave<T, DynBlock<T>>),
}

impl<T: SpectralSample> BlockEngine<T> {
    /// Build the engine described by `config` for `kernel`.
    pub fn from_config(config: &ConvolutionConfig, kernel: &[T]) -> ConvResult<Self> {
        config.validate()?;
        let block = boxed_block(kernel, config.strategy)?;

        tracing::debug!(
            "BlockEngine: method={:?}, strategy={:?}, block_len={}, kernel_len={}",
            config.method,
            config.strategy,
            config.block_len,
            kernel.len()
        );

        Ok(match config.method {
            Method::OverlapAdd => Self::Add(OverlapAdd::with_block(block, config.block_len)?),
            Method::OverlapSave => Self::Save(OverlapSave::with_block(block, config.block_len)?),
        })
    }
}

impl<T: Sample> BlockEngine<T> {
    /// Convolve a whole sequence, returning `signal.len() + Nh - 1` samples.
    pub fn convolve(&mut self, signal: &[T]) -> ConvResult<Vec<T>> {
        match self {
            Self::Add(engine) => engine.convolve(signal),
            Self::Save(engine) => engine.convolve(signal),
        }
    }

    /// Convolve a [`Sequence`], keeping its rate metadata.
    pub fn convolve_sequence(&mut self, signal: &Sequence<T>) -> ConvResult<Sequence<T>> {
        let samples = self.convolve(signal.as_slice())?;
        Ok(signal.with_samples(samples))
    }

    /// First output index guaranteed to equal direct convolution.
    pub fn valid_from(&self) -> usize {
        match self {
            Self::Add(_) => 0,
            Self::Save(engine) => engine.transient_samples(),
        }
    }

    /// Configured method.
    pub fn method(&self) -> Method {
        match self {
            Self::Add(_) => Method::OverlapAdd,
            Self::Save(_) => Method::OverlapSave,
        }
    }
}

/// Convolve independent channels against one kernel in parallel.
///
/// Output `i` corresponds to `channels[i]`. The first failing channel fails
/// the whole call.
pub fn convolve_channels<T: SpectralSample>(
    config: &ConvolutionConfig,
    channels: &[Vec<T>],
    kernel: &[T],
) -> ConvResult<Vec<Vec<T>>> {
    config.validate()?;
    tracing::debug!("Convolving {} channels", channels.len());

    channels
        .par_iter()
        .map(|channel| BlockEngine::from_config(config, kernel)?.convolve(channel))
        .collect()
}

/// Largest absolute deviation between `actual` and `expected` over `range`.
///
/// The range is clipped to the shorter sequence; an empty overlap yields 0.
pub fn max_abs_error<T>(actual: &[T], expected: &[T], range: Range<usize>) -> f64
where
    T: Sample + Sub<Output = T>,
{
    let end = range.end.min(actual.len()).min(expected.len());
    let start = range.start.min(end);
    actual[start..end]
        .iter()
        .zip(&expected[start..end])
        .map(|(&a, &e)| (a - e).magnitude())
        .fold(0.0, f64::max)
}
