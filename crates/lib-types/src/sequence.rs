//! Time-ordered sample sequences.
//!
//! A [`Sequence`] is an owned run of samples indexed from 0. Sample order is
//! time order; nothing in this crate ever reorders samples.
//!
//! Sequences carry an optional sample rate so that data decoded from audio
//! or synthesized at a known rate keeps that metadata through convolution.
//! The rate has no influence on the convolution itself.

use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// An owned, time-ordered sequence of samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sequence<T> {
    /// Sample values in time order.
    pub samples: Vec<T>,

    /// Sample rate in Hz, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<f64>,
}

impl<T: Sample> Sequence<T> {
    /// Create a sequence without rate metadata.
    pub fn new(samples: Vec<T>) -> Self {
        Self {
            samples,
            sample_rate: None,
        }
    }

    /// Create a sequence sampled at `sample_rate` Hz.
    pub fn with_rate(samples: Vec<T>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate: Some(sample_rate),
        }
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the sequence holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Borrow the samples.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.samples
    }

    /// Replace the samples, keeping the rate metadata.
    pub fn with_samples<U: Sample>(&self, samples: Vec<U>) -> Sequence<U> {
        Sequence {
            samples,
            sample_rate: self.sample_rate,
        }
    }
}

impl<T> Deref for Sequence<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_survives_serde() {
        let seq = Sequence::with_rate(vec![0.25f64, -0.5], 48_000.0);
        let json = serde_json::to_string(&seq).unwrap();
        let back: Sequence<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seq);

        let bare: Sequence<f64> = serde_json::from_str(r#"{"samples":[1.0]}"#).unwrap();
        assert_eq!(bare.sample_rate, None);
    }

    #[test]
    fn test_new_has_no_rate() {
        let seq = Sequence::new(vec![1, 2, 3]);
        assert_eq!(seq.sample_rate, None);
        assert_eq!(seq.len(), 3);
        assert!(!seq.is_empty());
        assert_eq!(&seq[1..], &[2, 3]);
    }

    #[test]
    fn test_with_samples_keeps_rate() {
        let seq = Sequence::with_rate(vec![1.0f64], 8_000.0);
        let out = seq.with_samples(vec![2.0f64, 3.0]);
        assert_eq!(out.sample_rate, Some(8_000.0));
        assert_eq!(out.len(), 2);
    }
}
