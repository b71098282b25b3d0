//! Block partitioning.
//!
//! Splits an input sequence into fixed-size blocks, zero-padding the tail so
//! that the padded length is a multiple of the block length. Padded zeros
//! contribute nothing to a convolution; they only keep block indexing exact.

use crate::error::{ConvError, ConvResult};
use lib_types::Sample;
use std::slice::ChunksExact;

/// Number of zeros needed to round `len` up to a multiple of `block_len`.
pub fn padding_for(len: usize, block_len: usize) -> ConvResult<usize> {
    if len == 0 {
        return Err(ConvError::invalid("len", "sequence length must be at least 1"));
    }
    if block_len == 0 {
        return Err(ConvError::invalid("block_len", "block length must be at least 1"));
    }
    Ok((block_len - len % block_len) % block_len)
}

/// A sequence zero-padded to a whole number of blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Padded<T> {
    samples: Vec<T>,
    original_len: usize,
    block_len: usize,
}

impl<T: Sample> Padded<T> {
    /// Padded samples: the original followed by `padding()` zeros.
    #[inline]
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// Length before padding.
    #[inline]
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Length after padding, always a multiple of the block length.
    #[inline]
    pub fn padded_len(&self) -> usize {
        self.samples.len()
    }

    /// Number of zeros appended.
    #[inline]
    pub fn padding(&self) -> usize {
        self.samples.len() - self.original_len
    }

    /// Block length the sequence was padded for.
    #[inline]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Number of blocks.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.samples.len() / self.block_len
    }

    /// Iterate over the blocks in time order.
    pub fn blocks(&self) -> ChunksExact<'_, T> {
        self.samples.chunks_exact(self.block_len)
    }

    /// Consume, returning the padded samples.
    pub fn into_samples(self) -> Vec<T> {
        self.samples
    }
}

/// Zero-pad `signal` to the next multiple of `block_len`.
///
/// A signal that is already a multiple is returned unchanged; a signal
/// shorter than one block is padded to exactly one block.
pub fn zero_pad<T: Sample>(signal: &[T], block_len: usize) -> ConvResult<Padded<T>> {
    let pad = padding_for(signal.len(), block_len)?;
    let mut samples = Vec::with_capacity(signal.len() + pad);
    samples.extend_from_slice(signal);
    samples.resize(signal.len() + pad, T::zero());

    Ok(Padded {
        samples,
        original_len: signal.len(),
        block_len,
    })
}

/// Copy `src[start..start + dst.len()]` into `dst`.
///
/// Positions past the end of `src` are filled with zeros, so windows that
/// run off the end of the input read as zero-padded.
pub fn copy_window<T: Sample>(src: &[T], start: usize, dst: &mut [T]) {
    let available = src.len().saturating_sub(start).min(dst.len());
    if available > 0 {
        dst[..available].copy_from_slice(&src[start..start + available]);
    }
    dst[available..].fill(T::zero());
}
