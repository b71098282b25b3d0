//! Overlap-add block convolution.
//!
//! The input is cut into non-overlapping blocks of `N1` samples. Each block
//! is linearly convolved with the kernel, giving `N1 + Nh - 1` samples; the
//! trailing `Nh - 1` samples spill into the next block's output range and
//! are carried forward and added there.
//!
//! Because every block is a true linear convolution there is no wraparound,
//! and the result equals direct convolution over the whole output for any
//! block length `N1 >= 1`.
//!
//! # Streaming
//!
//! [`OverlapAdd::push_block`] and [`OverlapAdd::finish`] expose the same
//! loop incrementally. Blocks must arrive in time order; each push emits `N1`
//! finished samples and `finish` emits the final `Nh - 1`.

use crate::block::{BlockKernel, DirectBlock, EngineState, SpectralBlock};
use crate::error::{ConvError, ConvResult};
use crate::fft::SpectralSample;
use crate::partition;
use lib_types::Sample;
use std::marker::PhantomData;

/// Overlap-add convolution engine.
pub struct OverlapAdd<T: Sample, K: BlockKernel<T> = DirectBlock<T>> {
    /// Per-block convolution step.
    block: K,

    /// Input samples per block (`N1`).
    block_len: usize,

    /// Carry length (`Nh - 1`).
    overlap: usize,

    /// Reconciled tail of the previous block, added into the next one.
    carry: Vec<T>,

    /// Raw convolution of the current block (`N1 + Nh - 1`).
    raw: Vec<T>,

    state: EngineState,
    blocks_processed: usize,
    _sample: PhantomData<T>,
}

impl<T: Sample> OverlapAdd<T> {
    /// Create an engine using direct summation per block.
    pub fn new(kernel: &[T], block_len: usize) -> ConvResult<Self> {
        Self::with_block(DirectBlock::new(kernel)?, block_len)
    }
}

impl<T: SpectralSample> OverlapAdd<T, SpectralBlock<T>> {
    /// Create an engine using FFT per block.
    pub fn spectral(kernel: &[T], block_len: usize) -> ConvResult<Self> {
        Self::with_block(SpectralBlock::new(kernel)?, block_len)
    }
}

impl<T: Sample, K: BlockKernel<T>> OverlapAdd<T, K> {
    /// Create an engine around an arbitrary block step.
    pub fn with_block(block: K, block_len: usize) -> ConvResult<Self> {
        let kernel_len = block.kernel_len();
        if kernel_len == 0 {
            return Err(ConvError::invalid("kernel", "length must be at least 1"));
        }
        if block_len == 0 {
            return Err(ConvError::invalid("block_len", "block length must be at least 1"));
        }
        let overlap = kernel_len - 1;

        tracing::debug!(
            "OverlapAdd: block_len={}, kernel_len={}, raw_len={}",
            block_len,
            kernel_len,
            block_len + overlap
        );

        Ok(Self {
            block,
            block_len,
            overlap,
            carry: vec![T::zero(); overlap],
            raw: vec![T::zero(); block_len + overlap],
            state: EngineState::Idle,
            blocks_processed: 0,
            _sample: PhantomData,
        })
    }

    /// Input samples per block.
    #[inline]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Kernel length.
    #[inline]
    pub fn kernel_len(&self) -> usize {
        self.overlap + 1
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Blocks processed since the last reset.
    #[inline]
    pub fn blocks_processed(&self) -> usize {
        self.blocks_processed
    }

    /// Discard any in-flight state and return to `Idle`.
    pub fn reset(&mut self) {
        self.carry.fill(T::zero());
        self.state = EngineState::Idle;
        self.blocks_processed = 0;
    }

    /// Convolve a whole sequence.
    ///
    /// Returns exactly `signal.len() + Nh - 1` samples. Any previous run is
    /// discarded first.
    pub fn convolve(&mut self, signal: &[T]) -> ConvResult<Vec<T>> {
        self.reset();
        let padded = partition::zero_pad(signal, self.block_len)?;
        let output_len = signal.len() + self.overlap;
        let mut output = vec![T::zero(); output_len];

        for (i, block) in padded.blocks().enumerate() {
            let cursor = i * self.block_len;
            if cursor >= signal.len() {
                break;
            }
            let finished = self.process_block(block, cursor)?;
            write_clipped(&mut output, cursor, finished);
        }

        // The last block's tail extends past its nominal write window.
        write_clipped(&mut output, padded.padded_len(), &self.carry);
        self.state = EngineState::Done;

        tracing::debug!(
            "OverlapAdd: {} samples in {} blocks ({} padded)",
            signal.len(),
            self.blocks_processed,
            padded.padding()
        );

        Ok(output)
    }

    /// Push the next block of exactly `block_len()` samples.
    ///
    /// Appends `block_len()` finished output samples to `output`.
    pub fn push_block(&mut self, block: &[T], output: &mut Vec<T>) -> ConvResult<()> {
        if self.state == EngineState::Done {
            return Err(ConvError::InvalidState {
                operation: "push a block",
                state: self.state,
            });
        }
        if block.len() != self.block_len {
            return Err(ConvError::invalid(
                "block",
                format!("expected {} samples, got {}", self.block_len, block.len()),
            ));
        }
        let cursor = self.blocks_processed * self.block_len;
        let finished = self.process_block(block, cursor)?;
        output.extend_from_slice(finished);
        Ok(())
    }

    /// Flush the carry, appending the final `Nh - 1` samples to `output`.
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
            output.extend_from_slice(&self.carry);
            self.carry.fill(T::zero());
        }
        self.state = EngineState::Done;
        Ok(())
    }

    /// Convolve one block, reconcile it with the carry and roll the carry.
    ///
    /// Returns the `block_len` samples that no later block can touch.
    fn process_block(&mut self, block: &[T], cursor: usize) -> ConvResult<&[T]> {
        self.block
            .linear(block, &mut self.raw)
            .map_err(|e| e.offset_by(cursor))?;

        if self.state == EngineState::Processing {
            for (i, (r, &c)) in self.raw.iter_mut().zip(&self.carry).enumerate() {
                *r = r
                    .add_acc(c)
                    .ok_or(ConvError::NumericOverflow { index: cursor + i })?;
            }
        }

        // Save the reconciled tail so that carries longer than one block
        // keep accumulating.
        let n1 = self.block_len;
        self.carry.copy_from_slice(&self.raw[n1..]);

        self.state = EngineState::Processing;
        self.blocks_processed += 1;
        tracing::trace!("OverlapAdd: block {} at {}", self.blocks_processed, cursor);

        Ok(&self.raw[..n1])
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::convolve;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
            let scale = e.abs().max(1.0);
            assert!(
                (a - e).abs() <= tol * scale,
                "Mismatch at index {}: {} vs {}",
                i,
                a,
                e
            );
        }
    }

    fn random_signal(rng: &mut StdRng, len: usize) -> Vec<f64> {
        (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_known_sequence() {
        let x: Vec<f64> = (1..=12).map(f64::from).collect();
        let h = [-1.0, -2.0, -3.0];

        let mut engine = OverlapAdd::new(&h, 4).unwrap();
        let result = engine.convolve(&x).unwrap();

        assert_eq!(result, convolve(&x, &h).unwrap());
        assert_eq!(engine.blocks_processed(), 3);
        assert_eq!(engine.state(), EngineState::Done);
    }

    #[test]
    fn test_padded_input() {
        // 13 samples with N1 = 4 needs 3 zeros of padding
        let x: Vec<f64> = (1..=13).map(f64::from).collect();
        let h = [-1.0, -2.0, -3.0];

        let mut engine = OverlapAdd::new(&h, 4).unwrap();
        let result = engine.convolve(&x).unwrap();

        assert_eq!(result.len(), 15);
        assert_eq!(result, convolve(&x, &h).unwrap());
    }

    #[test]
    fn test_block_size_invariance() {
        let mut rng = StdRng::seed_from_u64(7);
        let x = random_signal(&mut rng, 97);
        let h = random_signal(&mut rng, 11);
        let direct = convolve(&x, &h).unwrap();

        for n1 in [1, 2, 3, 5, 10, 11, 16, 96, 97, 200] {
            let result = OverlapAdd::new(&h, n1).unwrap().convolve(&x).unwrap();
            assert_close(&result, &direct, 1e-9);
        }
    }

    #[test]
    fn test_random_equivalence() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..50 {
            let nx = rng.gen_range(1..120);
            let nh = rng.gen_range(1..24);
            let n1 = rng.gen_range(1..40);
            let x = random_signal(&mut rng, nx);
            let h = random_signal(&mut rng, nh);

            let direct = convolve(&x, &h).unwrap();
            let result = OverlapAdd::new(&h, n1).unwrap().convolve(&x).unwrap();
            assert_close(&result, &direct, 1e-9);

            let spectral = OverlapAdd::spectral(&h, n1).unwrap().convolve(&x).unwrap();
            assert_close(&spectral, &direct, 1e-9);
        }
    }

    #[test]
    fn test_block_shorter_than_carry() {
        // N1 = 2 < Nh - 1 = 4: each carry spans more than one block
        let x: Vec<f64> = (1..=9).map(f64::from).collect();
        let h = [1.0, 2.0, 3.0, 4.0, 5.0];
        let result = OverlapAdd::new(&h, 2).unwrap().convolve(&x).unwrap();
        assert_eq!(result, convolve(&x, &h).unwrap());
    }

    #[test]
    fn test_single_tap_kernel_scales() {
        let x = [1.0, -2.0, 3.5, 0.0, 4.0];
        let result = OverlapAdd::new(&[2.5], 2).unwrap().convolve(&x).unwrap();
        assert_eq!(result, vec![2.5, -5.0, 8.75, 0.0, 10.0]);
    }

    #[test]
    fn test_integer_samples() {
        let x: Vec<i64> = (1..=10).collect();
        let h = [3, -1, 2];
        let result = OverlapAdd::new(&h, 3).unwrap().convolve(&x).unwrap();
        assert_eq!(result, convolve(&x, &h).unwrap());
    }

    #[test]
    fn test_integer_overflow_reports_global_index() {
        // Second block sums x[2] + x[3] into output index 3
        let x = [0, 0, i32::MAX, i32::MAX];
        let result = OverlapAdd::new(&[1, 1], 2).unwrap().convolve(&x);
        assert!(matches!(result, Err(ConvError::NumericOverflow { index: 3 })));

        // Carry of x[1] * h[1] overflows when added into output index 2
        let x = [0, i32::MAX, 1, 0];
        let result = OverlapAdd::new(&[1, 1], 2).unwrap().convolve(&x);
        assert!(matches!(result, Err(ConvError::NumericOverflow { index: 2 })));
    }

    #[test]
    fn test_streaming_matches_batch() {
        let mut rng = StdRng::seed_from_u64(42);
        let x = random_signal(&mut rng, 64);
        let h = random_signal(&mut rng, 9);

        let mut engine = OverlapAdd::new(&h, 8).unwrap();
        let mut streamed = Vec::new();
        for block in x.chunks(8) {
            engine.push_block(block, &mut streamed).unwrap();
        }
        assert_eq!(engine.state(), EngineState::Processing);
        engine.finish(&mut streamed).unwrap();

        assert_close(&streamed, &convolve(&x, &h).unwrap(), 1e-9);
    }

    #[test]
    fn test_streaming_state_machine() {
        let mut engine = OverlapAdd::new(&[1.0, 1.0], 2).unwrap();
        let mut out = Vec::new();

        assert!(matches!(
            engine.push_block(&[1.0], &mut out),
            Err(ConvError::InvalidArgument { name: "block", .. })
        ));

        engine.push_block(&[1.0, 2.0], &mut out).unwrap();
        engine.finish(&mut out).unwrap();
        assert_eq!(out, vec![1.0, 3.0, 2.0]);

        assert!(matches!(
            engine.push_block(&[1.0, 2.0], &mut out),
            Err(ConvError::InvalidState { .. })
        ));
        assert!(matches!(
            engine.finish(&mut out),
            Err(ConvError::InvalidState { .. })
        ));

        engine.reset();
        assert_eq!(engine.state(), EngineState::Idle);
        out.clear();
        engine.push_block(&[0.0, 1.0], &mut out).unwrap();
        engine.finish(&mut out).unwrap();
        assert_eq!(out, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_finish_without_blocks_emits_nothing() {
        let mut add = OverlapAdd::new(&[1.0, 2.0, 3.0], 4).unwrap();
        let mut out = Vec::new();
        add.finish(&mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(add.state(), EngineState::Done);

        let mut save = crate::overlap_save::OverlapSave::new(&[1.0, 2.0, 3.0], 4).unwrap();
        save.finish(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_engine_is_reusable() {
        let h = [0.5, 0.5];
        let mut engine = OverlapAdd::new(&h, 3).unwrap();
        let first = engine.convolve(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        let second = engine.convolve(&[2.0]).unwrap();
        assert_eq!(first, vec![0.5, 1.0, 1.0, 1.0, 0.5]);
        assert_eq!(second, vec![1.0, 1.0]);
    }

    #[test]
    fn test_invalid_arguments() {
        let empty: [f64; 0] = [];
        assert!(matches!(
            OverlapAdd::new(&[1.0], 0),
            Err(ConvError::InvalidArgument { name: "block_len", .. })
        ));
        assert!(matches!(
            OverlapAdd::new(&empty, 4),
            Err(ConvError::InvalidArgument { name: "kernel", .. })
        ));
        assert!(OverlapAdd::new(&[1.0], 4).unwrap().convolve(&empty).is_err());
    }
}
