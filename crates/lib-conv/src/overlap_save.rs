//! Overlap-save block convolution.
//!
//! Each window of `N1` input samples is circularly convolved with the
//! kernel. The window overlaps the previous one by `Nh - 1` samples (the
//! carry), so only `step = N1 - Nh + 1` new input samples enter per window.
//! The first `Nh - 1` outputs of every circular convolution are corrupted by
//! wraparound; the remaining `step` outputs equal the linear convolution and
//! are kept.
//!
//! # Boundary artifact
//!
//! Windows are aligned with the input: window `i` covers input
//! `[i * step, i * step + N1)` and its valid outputs land at
//! `[i * step + Nh - 1, i * step + N1)`. Later windows discard their
//! wraparound prefix because the previous window already produced those
//! positions, but the first window has no predecessor and its wraparound
//! prefix is emitted as-is at `[0, Nh - 1)`. Those
//! [`transient_samples`](OverlapSave::transient_samples) do not match direct
//! convolution; every later index does.
//!
//! # Streaming
//!
//! The first [`push_block`](OverlapSave::push_block) takes `N1` samples and
//! emits `N1` outputs; each later push takes and emits `step` samples.
//! [`finish`](OverlapSave::finish) flushes the `Nh - 1` tail samples.

use crate::block::{BlockKernel, DirectBlock, EngineState, SpectralBlock};
use crate::error::{ConvError, ConvResult};
use crate::fft::SpectralSample;
use crate::partition;
use lib_types::Sample;
use std::marker::PhantomData;

/// Overlap-save convolution engine.
pub struct OverlapSave<T: Sample, K: BlockKernel<T> = DirectBlock<T>> {
    /// Per-window convolution step.
    block: K,

    /// Window length (`N1`).
    block_len: usize,

    /// Carry length (`Nh - 1`).
    overlap: usize,

    /// New input samples per window (`N1 - Nh + 1`).
    step: usize,

    /// Trailing input samples of the previous window.
    carry: Vec<T>,

    /// Current window: carry followed by fresh input.
    window: Vec<T>,

    /// Circular convolution of the current window.
    raw: Vec<T>,

    state: EngineState,
    blocks_processed: usize,

    /// Input samples consumed since the last reset.
    consumed: usize,

    _sample: PhantomData<T>,
}

impl<T: Sample> OverlapSave<T> {
    /// Create an engine using direct summation per window.
    pub fn new(kernel: &[T], block_len: usize) -> ConvResult<Self> {
        Self::with_block(DirectBlock::new(kernel)?, block_len)
    }
}

impl<T: SpectralSample> OverlapSave<T, SpectralBlock<T>> {
    /// Create an engine using FFT per window.
    pub fn spectral(kernel: &[T], block_len: usize) -> ConvResult<Self> {
        Self::with_block(SpectralBlock::new(kernel)?, block_len)
    }
}

impl<T: Sample, K: BlockKernel<T>> OverlapSave<T, K> {
    /// Create an engine around an arbitrary block step.
    ///
    /// Requires `block_len > kernel_len - 1` so that every window advances.
    pub fn with_block(block: K, block_len: usize) -> ConvResult<Self> {
        let kernel_len = block.kernel_len();
        if kernel_len == 0 {
            return Err(ConvError::invalid("kernel", "length must be at least 1"));
        }
        if block_len == 0 {
            return Err(ConvError::invalid("block_len", "block length must be at least 1"));
        }
        let overlap = kernel_len - 1;
        if block_len <= overlap {
            return Err(ConvError::invalid(
                "block_len",
                format!(
                    "block length {} must exceed kernel length - 1 = {} for overlap-save",
                    block_len, overlap
                ),
            ));
        }
        let step = block_len - overlap;

        tracing::debug!(
            "OverlapSave: block_len={}, kernel_len={}, step={}",
            block_len,
            kernel_len,
            step
        );

        Ok(Self {
            block,
            block_len,
            overlap,
            step,
            carry: vec![T::zero(); overlap],
            window: vec![T::zero(); block_len],
            raw: vec![T::zero(); block_len],
            state: EngineState::Idle,
            blocks_processed: 0,
            consumed: 0,
            _sample: PhantomData,
        })
    }

    /// Window length.
    #[inline]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Kernel length.
    #[inline]
    pub fn kernel_len(&self) -> usize {
        self.overlap + 1
    }

    /// Valid output samples produced per window after the first.
    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Number of leading output samples that carry the first window's
    /// wraparound artifact.
    #[inline]
    pub fn transient_samples(&self) -> usize {
        self.overlap
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Windows processed since the last reset.
    #[inline]
    pub fn blocks_processed(&self) -> usize {
        self.blocks_processed
    }

    /// Input samples the next [`push_block`](Self::push_block) expects.
    #[inline]
    pub fn expected_input_len(&self) -> usize {
        match self.state {
            EngineState::Idle => self.block_len,
            _ => self.step,
        }
    }

    /// Discard any in-flight state and return to `Idle`.
    pub fn reset(&mut self) {
        self.carry.fill(T::zero());
        self.state = EngineState::Idle;
        self.blocks_processed = 0;
        self.consumed = 0;
    }

    /// Convolve a whole sequence.
    ///
    /// Returns exactly `signal.len() + Nh - 1` samples. The first
    /// [`transient_samples`](Self::transient_samples) of them hold the
    /// first window's wraparound values.
    pub fn convolve(&mut self, signal: &[T]) -> ConvResult<Vec<T>> {
        if signal.is_empty() {
            return Err(ConvError::invalid("signal", "length must be at least 1"));
        }
        self.reset();
        let output_len = signal.len() + self.overlap;
        let last_index = output_len - 1;
        let mut output = vec![T::zero(); output_len];

        // The first window is read straight from the input; later windows
        // keep the carry in front and take `step` fresh samples.
        partition::copy_window(signal, 0, &mut self.window);

        // Input index of the current window's first sample.
        let mut cursor = 0;
        loop {
            let write_start = match self.state {
                EngineState::Idle => 0,
                _ => cursor + self.overlap,
            };
            let valid = self.process_window(cursor)?;
            write_clipped(&mut output, write_start, valid);

            if cursor + self.block_len - 1 >= last_index {
                break;
            }
            cursor += self.step;
            partition::copy_window(
                signal,
                cursor + self.overlap,
                &mut self.window[self.overlap..],
            );
        }
        self.state = EngineState::Done;

        tracing::debug!(
            "OverlapSave: {} samples in {} windows",
            signal.len(),
            self.blocks_processed
        );

        Ok(output)
    }

    /// Push the next run of input samples.
    ///
    /// The slice must hold exactly [`expected_input_len`](Self::expected_input_len)
    /// samples. Appends the same number of output samples to `output`.
    pub fn push_block(&mut self, fresh: &[T], output: &mut Vec<T>) -> ConvResult<()> {
        if self.state == EngineState::Done {
            return Err(ConvError::InvalidState {
                operation: "push a block",
                state: self.state,
            });
        }
        let expected = self.expected_input_len();
        if fresh.len() != expected {
            return Err(ConvError::invalid(
                "block",
                format!("expected {} samples, got {}", expected, fresh.len()),
            ));
        }

        let offset = self.block_len - expected;
        self.window[offset..].copy_from_slice(fresh);
        self.consumed += expected;

        let cursor = self.consumed - self.block_len;
        let valid = self.process_window(cursor)?;
        output.extend_from_slice(valid);
        Ok(())
    }

    /// Flush the tail, appending the final `Nh - 1` samples to `output`.
    ///
    /// Nothing is emitted if no block was pushed.
    pub fn finish(&mut self, output: &mut Vec<T>) -> ConvResult<()> {
        if self.state == EngineState::Done {
            return Err(ConvError::InvalidState {
                operation: "finish",
                state: self.state,
            });
        }
        if self.state == EngineState::Processing {
            let mut remaining = self.overlap;
            while remaining > 0 {
                self.window[self.overlap..].fill(T::zero());
                self.consumed += self.step;
                let cursor = self.consumed - self.block_len;
                let valid = self.process_window(cursor)?;
                let take = remaining.min(valid.len());
                output.extend_from_slice(&valid[..take]);
                remaining -= take;
            }
        }
        self.state = EngineState::Done;
        Ok(())
    }

    /// Convolve the window, roll the carry and return the valid outputs.
    ///
    /// `self.window` must already hold the carry followed by fresh input.
    /// For the first window all `N1` outputs are returned; afterwards only
    /// the `step` outputs past the wraparound prefix.
    fn process_window(&mut self, cursor: usize) -> ConvResult<&[T]> {
        let first = self.state == EngineState::Idle;

        // The wraparound prefix of later windows is discarded, so it is
        // never computed.
        let skip = if first { 0 } else { self.overlap };
        self.block
            .circular(&self.window, skip, &mut self.raw)
            .map_err(|e| e.offset_by(cursor))?;

        // Next window starts with this window's last Nh - 1 input samples.
        self.carry.copy_from_slice(&self.window[self.step..]);
        self.window[..self.overlap].copy_from_slice(&self.carry);

        self.state = EngineState::Processing;
        self.blocks_processed += 1;
        tracing::trace!("OverlapSave: window {} at {}", self.blocks_processed, cursor);

        if first {
            Ok(&self.raw[..])
        } else {
            Ok(&self.raw[self.overlap..])
        }
    }
}

/// Copy `src` into `dst` at `start`, dropping whatever falls past the end.
fn write_clipped<T: Copy>(dst: &mut [T], start: usize, src: &[T]) {
    if start >= dst.len() {
        return;
    }
    let n = src.len().min(dst.len() - start);
    dst[start..start + n].copy_from_slice(&src[..n]);
}
