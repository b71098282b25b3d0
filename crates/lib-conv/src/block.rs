//! Per-block convolution step.
//!
//! Both engines delegate the arithmetic of a single block to a
//! [`BlockKernel`]. Two implementations satisfy the same contract:
//!
//! - [`DirectBlock`]: direct summation, works for every [`Sample`] type
//!   including checked integers
//! - [`SpectralBlock`]: FFT multiply-and-invert, for real and complex
//!   floating-point samples; cheaper for long kernels

use crate::error::{ConvError, ConvResult};
use crate::fft::{FftEngine, SpectralFilter, SpectralSample};
use crate::reference;
use lib_types::Sample;
use serde::{Deserialize, Serialize};

/// Lifecycle of one convolution run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineState {
    /// No block processed since construction or the last reset.
    #[default]
    Idle,
    /// At least one block processed; carry holds live state.
    Processing,
    /// Carry flushed; the run is complete.
    Done,
}

/// How each block is convolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStrategy {
    /// Direct summation.
    #[default]
    Direct,
    /// FFT multiply-and-invert.
    Spectral,
}

/// Convolution of one block against a fixed kernel.
pub trait BlockKernel<T: Sample> {
    /// Kernel length `Nh`.
    fn kernel_len(&self) -> usize;

    /// Linear convolution of `block`.
    ///
    /// `output.len()` must be `block.len() + kernel_len() - 1`.
    fn linear(&mut self, block: &[T], output: &mut [T]) -> ConvResult<()>;

    /// Circular convolution with period `window.len()`.
    ///
    /// `output.len()` must equal `window.len()`, which must be at least
    /// `kernel_len()`. Only `output[skip..]` is computed; the first `skip`
    /// samples are zeroed and can never report an overflow.
    fn circular(&mut self, window: &[T], skip: usize, output: &mut [T]) -> ConvResult<()>;
}

impl<T: Sample, K: BlockKernel<T> + ?Sized> BlockKernel<T> for Box<K> {
    fn kernel_len(&self) -> usize {
        (**self).kernel_len()
    }

    fn linear(&mut self, block: &[T], output: &mut [T]) -> ConvResult<()> {
        (**self).linear(block, output)
    }

    fn circular(&mut self, window: &[T], skip: usize, output: &mut [T]) -> ConvResult<()> {
        (**self).circular(window, skip, output)
    }
}

/// Block step by direct summation.
#[derive(Clone, Debug)]
pub struct DirectBlock<T> {
    taps: Vec<T>,
}

impl<T: Sample> DirectBlock<T> {
    /// Create a direct block step for `kernel`.
    pub fn new(kernel: &[T]) -> ConvResult<Self> {
        if kernel.is_empty() {
            return Err(ConvError::invalid("kernel", "length must be at least 1"));
        }
        Ok(Self {
            taps: kernel.to_vec(),
        })
    }
}

impl<T: Sample> BlockKernel<T> for DirectBlock<T> {
    fn kernel_len(&self) -> usize {
        self.taps.len()
    }

    fn linear(&mut self, block: &[T], output: &mut [T]) -> ConvResult<()> {
        reference::convolve_into(block, &self.taps, output)
    }

    fn circular(&mut self, window: &[T], skip: usize, output: &mut [T]) -> ConvResult<()> {
        reference::circular_convolve_tail_into(window, &self.taps, skip, output)
    }
}

/// Block step by FFT.
///
/// Kernel spectra are computed lazily for each transform size and kept; an
/// engine only ever uses one linear size and one circular size.
pub struct SpectralBlock<T: SpectralSample> {
    taps: Vec<T>,
    engine: FftEngine<T::Real>,
    linear: Option<SpectralFilter<T>>,
    circular: Option<SpectralFilter<T>>,
}

impl<T: SpectralSample> SpectralBlock<T> {
    /// Create a spectral block step for `kernel`.
    pub fn new(kernel: &[T]) -> ConvResult<Self> {
        if kernel.is_empty() {
            return Err(ConvError::invalid("kernel", "length must be at least 1"));
        }
        Ok(Self {
            taps: kernel.to_vec(),
            engine: FftEngine::new(),
            linear: None,
            circular: None,
        })
    }

    /// Transform plans held across filter rebuilds.
    pub fn cached_plans(&self) -> usize {
        self.engine.cached_plans()
    }

    fn filter<'a>(
        engine: &mut FftEngine<T::Real>,
        slot: &'a mut Option<SpectralFilter<T>>,
        taps: &[T],
        size: usize,
    ) -> ConvResult<&'a mut SpectralFilter<T>> {
        if slot.as_ref().map_or(true, |f| f.size() != size) {
            *slot = Some(SpectralFilter::new(engine, taps, size)?);
        }
        slot.as_mut()
            .ok_or_else(|| ConvError::invalid("size", "spectral filter unavailable"))
    }
}

impl<T: SpectralSample> BlockKernel<T> for SpectralBlock<T> {
    fn kernel_len(&self) -> usize {
        self.taps.len()
    }

    fn linear(&mut self, block: &[T], output: &mut [T]) -> ConvResult<()> {
        if block.is_empty() {
            return Err(ConvError::invalid("signal", "length must be at least 1"));
        }
        let size = block.len() + self.taps.len() - 1;
        if output.len() != size {
            return Err(ConvError::invalid(
                "output",
                format!("expected {} samples, got {}", size, output.len()),
            ));
        }
        Self::filter(&mut self.engine, &mut self.linear, &self.taps, size)?.apply(block, output)
    }

    fn circular(&mut self, window: &[T], skip: usize, output: &mut [T]) -> ConvResult<()> {
        if output.len() != window.len() {
            return Err(ConvError::invalid(
                "output",
                format!("expected {} samples, got {}", window.len(), output.len()),
            ));
        }
        if skip > output.len() {
            return Err(ConvError::invalid(
                "skip",
                format!("cannot skip {} of {} samples", skip, output.len()),
            ));
        }
        Self::filter(&mut self.engine, &mut self.circular, &self.taps, window.len())?
            .apply(window, output)?;
        output[..skip].fill(T::zero());
        Ok(())
    }
}

/// Build a boxed block step for `strategy`.
pub fn boxed_block<T: SpectralSample>(
    kernel: &[T],
    strategy: BlockStrategy,
) -> ConvResult<Box<dyn BlockKernel<T> + Send>> {
    Ok(match strategy {
        BlockStrategy::Direct => Box::new(DirectBlock::new(kernel)?),
        BlockStrategy::Spectral => Box::new(SpectralBlock::new(kernel)?),
    })
}
