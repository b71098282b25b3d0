//! Sample domain for convolution.
//!
//! Engines are generic over [`Sample`], which covers real and complex
//! floating-point samples as well as fixed-width integers. Floating-point
//! accumulation never fails; integer accumulation is checked so that
//! overflow can be reported instead of wrapping silently.

use num_complex::{Complex32, Complex64};
use num_traits::Zero;
use std::fmt::Debug;

/// A value that can be convolved.
pub trait Sample: Zero + Copy + Debug + PartialEq + Send + Sync + 'static {
    /// `self + rhs`, or `None` on overflow.
    fn add_acc(self, rhs: Self) -> Option<Self>;

    /// `self + a * b`, or `None` on overflow.
    fn mul_acc(self, a: Self, b: Self) -> Option<Self>;

    /// Magnitude as `f64`, used for error measurement.
    fn magnitude(self) -> f64;
}

macro_rules! impl_float_sample {
    ($($t:ty),*) => {$(
        impl Sample for $t {
            #[inline]
            fn add_acc(self, rhs: Self) -> Option<Self> {
                Some(self + rhs)
            }

            #[inline]
            fn mul_acc(self, a: Self, b: Self) -> Option<Self> {
                Some(self + a * b)
            }

            #[inline]
            fn magnitude(self) -> f64 {
                self.abs() as f64
            }
        }
    )*};
}

macro_rules! impl_complex_sample {
    ($($t:ty),*) => {$(
        impl Sample for $t {
            #[inline]
            fn add_acc(self, rhs: Self) -> Option<Self> {
                Some(self + rhs)
            }

            #[inline]
            fn mul_acc(self, a: Self, b: Self) -> Option<Self> {
                Some(self + a * b)
            }

            #[inline]
            fn magnitude(self) -> f64 {
                self.norm() as f64
            }
        }
    )*};
}

macro_rules! impl_int_sample {
    ($($t:ty),*) => {$(
        impl Sample for $t {
            #[inline]
            fn add_acc(self, rhs: Self) -> Option<Self> {
                self.checked_add(rhs)
            }

            #[inline]
            fn mul_acc(self, a: Self, b: Self) -> Option<Self> {
                self.checked_add(a.checked_mul(b)?)
            }

            #[inline]
            fn magnitude(self) -> f64 {
                (self as f64).abs()
            }
        }
    )*};
}

impl_float_sample!(f32, f64);
impl_complex_sample!(Complex32, Complex64);
impl_int_sample!(i32, i64);
