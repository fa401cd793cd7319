//! Trait interfaces for decay models.
//!
//! [`DecayModel`] is the contract between a model and whatever drives it:
//! a fitting loop that swaps lifetimes and re-evaluates, or a composite model
//! that superposes several components onto one shared curve.

use crate::curve::TimeCurve;
use crate::error::ConvolutionError;

/// A model that can be evaluated onto a time axis.
///
/// Evaluation accumulates: it adds into `target.y` and never overwrites, so
/// several models can be summed into one curve by calling each in turn.
pub trait DecayModel: Send + Sync {
    /// Add this model's values into `target` over the model's channel window.
    fn evaluate(&self, target: &mut TimeCurve) -> Result<(), ConvolutionError>;

    /// Evaluate onto a fresh zero-valued curve over `axis`.
    ///
    /// Default implementation delegates to [`evaluate`](Self::evaluate).
    fn convolve(&self, axis: &[f64]) -> Result<TimeCurve, ConvolutionError> {
        let mut curve = TimeCurve::from_x(axis.to_vec());
        self.evaluate(&mut curve)?;
        Ok(curve)
    }
}
