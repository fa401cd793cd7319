//! Multi-exponential lifetime spectra.
//!
//! A spectrum is stored flat as `[amp_0, tau_0, amp_1, tau_1, ...]`, the
//! layout fitting drivers hand over. Amplitudes are never normalized.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_AMPLITUDE, UNSET_LIFETIME};
use crate::error::ConfigError;

/// Ordered `(amplitude, lifetime)` pairs of a sum-of-exponentials decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LifetimeSpectrum {
    flat: Vec<f64>,
}

impl Default for LifetimeSpectrum {
    /// One component with amplitude 1 and an unset (zero) lifetime.
    fn default() -> Self {
        Self {
            flat: vec![DEFAULT_AMPLITUDE, UNSET_LIFETIME],
        }
    }
}

impl LifetimeSpectrum {
    /// Create the default single-component spectrum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a spectrum from a flat amplitude/lifetime sequence.
    pub fn from_flat(flat: Vec<f64>) -> Result<Self, ConfigError> {
        if flat.len() % 2 != 0 {
            return Err(ConfigError::OddSpectrumLength(flat.len()));
        }
        Ok(Self { flat })
    }

    /// Build a spectrum from explicit pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        let flat = pairs.iter().flat_map(|&(a, tau)| [a, tau]).collect();
        Self { flat }
    }

    /// The flat `[amp, tau, ...]` sequence.
    pub fn as_flat(&self) -> &[f64] {
        &self.flat
    }

    /// Replace the whole sequence.
    pub fn set_flat(&mut self, flat: Vec<f64>) -> Result<(), ConfigError> {
        if flat.len() % 2 != 0 {
            return Err(ConfigError::OddSpectrumLength(flat.len()));
        }
        self.flat = flat;
        Ok(())
    }

    /// Iterate `(amplitude, lifetime)` pairs in order.
    pub fn components(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.flat.chunks_exact(2).map(|c| (c[0], c[1]))
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.flat.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    /// Reject lifetimes that are not strictly positive and finite.
    ///
    /// Non-positive lifetimes are a configuration error, never a silent
    /// zero contribution.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flat.len() % 2 != 0 {
            return Err(ConfigError::OddSpectrumLength(self.flat.len()));
        }
        for (index, (_, lifetime)) in self.components().enumerate() {
            if !(lifetime.is_finite() && lifetime > 0.0) {
                return Err(ConfigError::NonPositiveLifetime { index, lifetime });
            }
        }
        Ok(())
    }

    /// Species-averaged lifetime `Σ a·τ / Σ a`.
    ///
    /// Returns `None` when the amplitudes sum to zero.
    pub fn amplitude_weighted_lifetime(&self) -> Option<f64> {
        let (num, den) = self
            .components()
            .fold((0.0, 0.0), |(n, d), (a, tau)| (n + a * tau, d + a));
        (den != 0.0).then(|| num / den)
    }

    /// Fluorescence-averaged lifetime `Σ a·τ² / Σ a·τ`.
    ///
    /// Returns `None` when `Σ a·τ` is zero.
    pub fn intensity_weighted_lifetime(&self) -> Option<f64> {
        let (num, den) = self
            .components()
            .fold((0.0, 0.0), |(n, d), (a, tau)| (n + a * tau * tau, d + a * tau));
        (den != 0.0).then(|| num / den)
    }
}
