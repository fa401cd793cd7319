//! Time-channel curves.
//!
//! A [`TimeCurve`] pairs an ordered time axis with one value per channel. It
//! is the unit of both the instrument response function and the model output.
//! Monotonicity of `x` is the caller's responsibility; only the
//! `len(x) == len(y)` invariant is enforced.

use serde::{Deserialize, Serialize};

use crate::error::CurveError;

/// An ordered time axis `x` with aligned values `y`.
///
/// Constructors and setters keep `x` and `y` the same length. A curve that
/// arrives through deserialization is not checked until it is used, so
/// consumers call [`validate`](Self::validate) at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeCurve {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TimeCurve {
    /// Build a curve from an axis and values of the same length.
    pub fn try_new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, CurveError> {
        if x.len() != y.len() {
            return Err(CurveError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        Ok(Self { x, y })
    }

    /// Build a curve from an axis alone; every value starts at zero.
    pub fn from_x(x: Vec<f64>) -> Self {
        let y = vec![0.0; x.len()];
        Self { x, y }
    }

    /// A curve sharing this curve's axis with all values zeroed.
    pub fn zeroed_like(&self) -> Self {
        Self::from_x(self.x.clone())
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Mutable access to the values. The slice cannot change length.
    pub fn y_mut(&mut self) -> &mut [f64] {
        &mut self.y
    }

    /// Replace the axis. Fails if the new axis does not match `len(y)`.
    pub fn set_x(&mut self, x: Vec<f64>) -> Result<(), CurveError> {
        if x.len() != self.y.len() {
            return Err(CurveError::LengthMismatch {
                x: x.len(),
                y: self.y.len(),
            });
        }
        self.x = x;
        Ok(())
    }

    /// Replace the values. Fails if they do not match `len(x)`.
    pub fn set_y(&mut self, y: Vec<f64>) -> Result<(), CurveError> {
        if y.len() != self.x.len() {
            return Err(CurveError::LengthMismatch {
                x: self.x.len(),
                y: y.len(),
            });
        }
        self.y = y;
        Ok(())
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Check the length invariant and that the curve has at least one channel.
    pub fn validate(&self) -> Result<(), CurveError> {
        if self.x.len() != self.y.len() {
            return Err(CurveError::LengthMismatch {
                x: self.x.len(),
                y: self.y.len(),
            });
        }
        if self.x.is_empty() {
            return Err(CurveError::Empty);
        }
        Ok(())
    }

    /// Width of the first channel, `x[1] - x[0]`.
    ///
    /// The uniform-step kernels assume every channel has this width.
    /// Returns `None` for curves with fewer than two channels.
    pub fn uniform_dt(&self) -> Option<f64> {
        first_width(&self.x)
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        self.y.iter().sum()
    }

    /// Consume the curve, returning `(x, y)`.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.x, self.y)
    }
}

/// `x[1] - x[0]`, or `None` for an axis with fewer than two samples.
pub fn first_width(x: &[f64]) -> Option<f64> {
    match x {
        [x0, x1, ..] => Some(x1 - x0),
        _ => None,
    }
}

/// `n` evenly spaced samples over `[start, stop]`, both endpoints included.
///
/// `n == 1` yields `[start]`; `n == 0` yields an empty axis.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = stop;
            out
        }
    }
}
