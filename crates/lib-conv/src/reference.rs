//! Direct convolution.
//!
//! These are O(Nx*Nh) and serve as the correctness oracle for the block
//! engines and as the per-block step of [`DirectBlock`](crate::block::DirectBlock).

use crate::error::{ConvError, ConvResult};
use lib_types::Sample;

/// Direct linear convolution of `signal` with `kernel`.
///
/// Returns `signal.len() + kernel.len() - 1` samples with
/// `y[n] = sum_k signal[k] * kernel[n - k]`.
pub fn convolve<T: Sample>(signal: &[T], kernel: &[T]) -> ConvResult<Vec<T>> {
    check_lengths(signal, kernel)?;
    let mut output = vec![T::zero(); signal.len() + kernel.len() - 1];
    convolve_into(signal, kernel, &mut output)?;
    Ok(output)
}

/// Direct linear convolution into a caller-provided buffer.
///
/// `output` must hold exactly `signal.len() + kernel.len() - 1` samples; it
/// is overwritten.
pub fn convolve_into<T: Sample>(signal: &[T], kernel: &[T], output: &mut [T]) -> ConvResult<()> {
    check_lengths(signal, kernel)?;
    let expected = signal.len() + kernel.len() - 1;
    if output.len() != expected {
        return Err(ConvError::invalid(
            "output",
            format!("expected {} samples, got {}", expected, output.len()),
        ));
    }

    output.fill(T::zero());
    for (i, &s) in signal.iter().enumerate() {
        for (j, &k) in kernel.iter().enumerate() {
            let n = i + j;
            output[n] = output[n]
                .mul_acc(s, k)
                .ok_or(ConvError::NumericOverflow { index: n })?;
        }
    }

    Ok(())
}

/// `n`-point circular convolution of `signal` with `kernel`.
///
/// `signal` is zero-padded (or truncated) to `n`. With
/// `n >= signal.len() + kernel.len() - 1` the result equals the linear
/// convolution followed by zeros.
pub fn circular_convolve<T: Sample>(signal: &[T], kernel: &[T], n: usize) -> ConvResult<Vec<T>> {
    check_lengths(signal, kernel)?;
    let mut window = vec![T::zero(); n];
    let take = signal.len().min(n);
    window[..take].copy_from_slice(&signal[..take]);

    let mut output = vec![T::zero(); n];
    circular_convolve_into(&window, kernel, &mut output)?;
    Ok(output)
}

/// Circular convolution over a full window into `output`.
///
/// The period is `window.len()`, which must equal `output.len()` and be at
/// least `kernel.len()`.
pub fn circular_convolve_into<T: Sample>(
    window: &[T],
    kernel: &[T],
    output: &mut [T],
) -> ConvResult<()> {
    circular_convolve_tail_into(window, kernel, 0, output)
}

/// Circular convolution computing only `output[skip..]`.
///
/// `output[..skip]` is zeroed and never accumulated, so an overflow in
/// samples the caller discards is not reported.
pub fn circular_convolve_tail_into<T: Sample>(
    window: &[T],
    kernel: &[T],
    skip: usize,
    output: &mut [T],
) -> ConvResult<()> {
    check_lengths(window, kernel)?;
    let n = window.len();
    if output.len() != n {
        return Err(ConvError::invalid(
            "output",
            format!("expected {} samples, got {}", n, output.len()),
        ));
    }
    if kernel.len() > n {
        return Err(ConvError::invalid(
            "n",
            format!("period {} is shorter than kernel length {}", n, kernel.len()),
        ));
    }
    if skip > n {
        return Err(ConvError::invalid(
            "skip",
            format!("cannot skip {} of {} samples", skip, n),
        ));
    }

    output[..skip].fill(T::zero());
    for (j, out) in output.iter_mut().enumerate().skip(skip) {
        let mut acc = T::zero();
        for (k, &h) in kernel.iter().enumerate() {
            let idx = (j + n - k) % n;
            acc = acc
                .mul_acc(window[idx], h)
                .ok_or(ConvError::NumericOverflow { index: j })?;
        }
        *out = acc;
    }

    Ok(())
}

fn check_lengths<T>(signal: &[T], kernel: &[T]) -> ConvResult<()> {
    if signal.is_empty() {
        return Err(ConvError::invalid("signal", "length must be at least 1"));
    }
    if kernel.is_empty() {
        return Err(ConvError::invalid("kernel", "length must be at least 1"));
    }
    Ok(())
}
