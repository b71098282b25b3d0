//! FFT-based block convolution using rustfft.
//!
//! This module provides:
//! - [`SpectralSample`], the sample types that can pass through a transform
//! - [`FftEngine`], a planner wrapper with plan caching
//! - [`SpectralFilter`], a kernel spectrum for one transform size, applied
//!   by multiply-and-invert
//!
//! A transform of size `n` computes the `n`-point circular convolution.
//! Zero-padding the block to `block_len + kernel_len - 1` turns that into
//! the linear convolution.

use crate::error::{ConvError, ConvResult};
use lib_types::Sample;
use num_complex::{Complex, Complex32, Complex64};
use num_traits::{FromPrimitive, One, Zero};
use rustfft::{Fft, FftNum, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;

/// A sample type that can be moved into and out of the complex domain.
pub trait SpectralSample: Sample {
    /// Real scalar type of the transform.
    type Real: FftNum;

    /// Lift into the complex domain.
    fn to_complex(self) -> Complex<Self::Real>;

    /// Return from the complex domain. Real samples keep the real part.
    fn from_complex(value: Complex<Self::Real>) -> Self;
}

impl SpectralSample for f32 {
    type Real = f32;

    #[inline]
    fn to_complex(self) -> Complex32 {
        Complex32::new(self, 0.0)
    }

    #[inline]
    fn from_complex(value: Complex32) -> Self {
        value.re
    }
}

impl SpectralSample for f64 {
    type Real = f64;

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }

    #[inline]
    fn from_complex(value: Complex64) -> Self {
        value.re
    }
}

impl SpectralSample for Complex32 {
    type Real = f32;

    #[inline]
    fn to_complex(self) -> Complex32 {
        self
    }

    #[inline]
    fn from_complex(value: Complex32) -> Self {
        value
    }
}

impl SpectralSample for Complex64 {
    type Real = f64;

    #[inline]
    fn to_complex(self) -> Complex64 {
        self
    }

    #[inline]
    fn from_complex(value: Complex64) -> Self {
        value
    }
}

/// FFT engine with cached plans.
///
/// Plans are kept per length and direction. The engine holds only the
/// `Arc`ed plans, never a planner, so it stays `Send` and can live inside a
/// block step that moves between threads.
pub struct FftEngine<R: FftNum> {
    forward: HashMap<usize, Arc<dyn Fft<R>>>,
    inverse: HashMap<usize, Arc<dyn Fft<R>>>,
}

impl<R: FftNum> FftEngine<R> {
    /// Create a new FFT engine.
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            inverse: HashMap::new(),
        }
    }

    /// Get a cached forward FFT plan.
    pub fn get_fft_forward(&mut self, len: usize) -> Arc<dyn Fft<R>> {
        Arc::clone(
            self.forward
                .entry(len)
                .or_insert_with(|| FftPlanner::new().plan_fft_forward(len)),
        )
    }

    /// Get a cached inverse FFT plan.
    pub fn get_fft_inverse(&mut self, len: usize) -> Arc<dyn Fft<R>> {
        Arc::clone(
            self.inverse
                .entry(len)
                .or_insert_with(|| FftPlanner::new().plan_fft_inverse(len)),
        )
    }

    /// Number of distinct plans held.
    pub fn cached_plans(&self) -> usize {
        self.forward.len() + self.inverse.len()
    }
}

impl<R: FftNum> Default for FftEngine<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-computed kernel spectrum for one transform size.
pub struct SpectralFilter<T: SpectralSample> {
    /// FFT of the zero-padded kernel.
    kernel_fft: Vec<Complex<T::Real>>,

    /// Working buffer for the block spectrum.
    buffer: Vec<Complex<T::Real>>,

    /// Scratch space shared by both plans.
    scratch: Vec<Complex<T::Real>>,

    /// 1 / size, applied after the inverse transform.
    scale: T::Real,

    fft_forward: Arc<dyn Fft<T::Real>>,
    fft_inverse: Arc<dyn Fft<T::Real>>,
}

impl<T: SpectralSample> SpectralFilter<T> {
    /// Prepare a filter of transform size `size` for `kernel`.
    pub fn new(engine: &mut FftEngine<T::Real>, kernel: &[T], size: usize) -> ConvResult<Self> {
        if kernel.is_empty() {
            return Err(ConvError::invalid("kernel", "length must be at least 1"));
        }
        if size < kernel.len() {
            return Err(ConvError::invalid(
                "size",
                format!(
                    "transform size {} is smaller than kernel length {}",
                    size,
                    kernel.len()
                ),
            ));
        }
        let scale = T::Real::from_usize(size)
            .map(|n| T::Real::one() / n)
            .ok_or_else(|| ConvError::invalid("size", "transform size not representable"))?;

        let fft_forward = engine.get_fft_forward(size);
        let fft_inverse = engine.get_fft_inverse(size);
        let scratch_len = fft_forward
            .get_inplace_scratch_len()
            .max(fft_inverse.get_inplace_scratch_len());
        let mut scratch = vec![Complex::zero(); scratch_len];

        let mut kernel_fft: Vec<Complex<T::Real>> =
            kernel.iter().map(|&h| h.to_complex()).collect();
        kernel_fft.resize(size, Complex::zero());
        fft_forward.process_with_scratch(&mut kernel_fft, &mut scratch);

        Ok(Self {
            kernel_fft,
            buffer: vec![Complex::zero(); size],
            scratch,
            scale,
            fft_forward,
            fft_inverse,
        })
    }

    /// Transform size.
    #[inline]
    pub fn size(&self) -> usize {
        self.kernel_fft.len()
    }

    /// Circular convolution of `input`, zero-padded to `size()`, into `output`.
    ///
    /// `input` may be shorter than the transform; `output` receives the first
    /// `output.len()` samples of the result.
    pub fn apply(&mut self, input: &[T], output: &mut [T]) -> ConvResult<()> {
        let size = self.size();
        if input.len() > size || output.len() > size {
            return Err(ConvError::invalid(
                "input",
                format!(
                    "block of {} -> {} samples does not fit transform size {}",
                    input.len(),
                    output.len(),
                    size
                ),
            ));
        }

        for (slot, &x) in self.buffer.iter_mut().zip(input) {
            *slot = x.to_complex();
        }
        self.buffer[input.len()..].fill(Complex::zero());

        self.fft_forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        // Multiply with kernel FFT (frequency domain convolution)
        for (c, h) in self.buffer.iter_mut().zip(&self.kernel_fft) {
            *c = *c * *h;
        }

        self.fft_inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (out, c) in output.iter_mut().zip(&self.buffer) {
            *out = T::from_complex(*c * self.scale);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference;

    #[test]
    fn test_linear_via_zero_padding() {
        let x: Vec<f64> = (1..=8).map(f64::from).collect();
        let h = [-10.0, -11.0, -12.0];
        let n = x.len() + h.len() - 1;

        let mut engine = FftEngine::new();
        let mut filter = SpectralFilter::new(&mut engine, &h, n).unwrap();
        let mut out = vec![0.0; n];
        filter.apply(&x, &mut out).unwrap();

        let direct = reference::convolve(&x, &h).unwrap();
        for (i, (&d, &f)) in direct.iter().zip(out.iter()).enumerate() {
            assert!((d - f).abs() < 1e-9, "Mismatch at index {}: {} vs {}", i, d, f);
        }
    }

    #[test]
    fn test_circular_matches_direct() {
        let x = [1.0f64, 2.0, 3.0, 4.0];
        let mut engine = FftEngine::new();
        let mut filter = SpectralFilter::new(&mut engine, &x, 4).unwrap();
        let mut out = [0.0; 4];
        filter.apply(&x, &mut out).unwrap();

        let direct = reference::circular_convolve(&x, &x, 4).unwrap();
        for (&d, &f) in direct.iter().zip(out.iter()) {
            assert!((d - f).abs() < 1e-9);
        }
    }

    #[test]
    fn test_complex_samples() {
        let x = [Complex64::new(1.0, -1.0), Complex64::new(0.5, 2.0)];
        let h = [Complex64::new(0.0, 1.0), Complex64::new(3.0, 0.0)];

        let mut engine = FftEngine::new();
        let mut filter = SpectralFilter::new(&mut engine, &h, 3).unwrap();
        let mut out = [Complex64::zero(); 3];
        filter.apply(&x, &mut out).unwrap();

        let direct = reference::convolve(&x, &h).unwrap();
        for (&d, &f) in direct.iter().zip(out.iter()) {
            assert!((d - f).norm() < 1e-9);
        }
    }

    #[test]
    fn test_non_power_of_two_size() {
        let x: Vec<f32> = (0..7).map(|i| i as f32 * 0.5).collect();
        let h = [1.0f32, -1.0];
        let mut engine = FftEngine::new();
        let mut filter = SpectralFilter::new(&mut engine, &h, 11).unwrap();
        assert_eq!(filter.size(), 11);

        let mut out = [0.0f32; 11];
        filter.apply(&x, &mut out).unwrap();
        let direct = reference::convolve(&x, &h).unwrap();
        for (&d, &f) in direct.iter().zip(out.iter()) {
            assert!((d - f).abs() < 1e-4);
        }
    }

    #[test]
    fn test_engine_reuses_plans() {
        let mut engine = FftEngine::<f64>::new();
        let a = engine.get_fft_forward(16);
        let b = engine.get_fft_forward(16);
        assert!(Arc::ptr_eq(&a, &b));
        engine.get_fft_inverse(16);
        engine.get_fft_forward(9);
        assert_eq!(engine.cached_plans(), 3);
    }

    #[test]
    fn test_size_smaller_than_kernel() {
        let mut engine = FftEngine::<f64>::new();
        let result = SpectralFilter::new(&mut engine, &[1.0, 2.0, 3.0], 2);
        assert!(matches!(result, Err(ConvError::InvalidArgument { name: "size", .. })));
    }

    #[test]
    fn test_oversized_block_rejected() {
        let mut engine = FftEngine::<f64>::new();
        let mut filter = SpectralFilter::new(&mut engine, &[1.0], 4).unwrap();
        let mut out = [0.0; 4];
        assert!(filter.apply(&[0.0; 5], &mut out).is_err());
    }
}
