//! Shared fixtures for the integration tests.

use tcspc_core::curve::{linspace, TimeCurve};
use tcspc_core::settings::{ConvolutionMethod, ConvolutionSettings};
use tcspc_core::spectrum::LifetimeSpectrum;
use tcspc_decay::DecayConvolution;

/// Channels of the reference axis.
pub const REFERENCE_CHANNELS: usize = 32;

/// Last time value of the reference axis.
pub const REFERENCE_SPAN: f64 = 20.0;

/// Centre of the reference IRF.
pub const REFERENCE_IRF_CENTER: f64 = 2.0;

/// Standard deviation of the reference IRF.
pub const REFERENCE_IRF_WIDTH: f64 = 0.1;

/// `[0, 20]` in 32 evenly spaced channels.
pub fn reference_axis() -> Vec<f64> {
    linspace(0.0, REFERENCE_SPAN, REFERENCE_CHANNELS)
}

/// Unit-area Gaussian sampled on `x`.
pub fn gaussian(x: &[f64], center: f64, width: f64) -> Vec<f64> {
    let norm = 1.0 / (width * (2.0 * std::f64::consts::PI).sqrt());
    x.iter()
        .map(|&t| {
            let d = t - center;
            norm * (-d * d / (2.0 * width * width)).exp()
        })
        .collect()
}

/// Gaussian IRF on `x`.
pub fn gaussian_irf(x: Vec<f64>, center: f64, width: f64) -> TimeCurve {
    let y = gaussian(&x, center, width);
    TimeCurve::try_new(x, y).expect("gaussian has one value per channel")
}

/// The reference IRF: centre 2.0, width 0.1 on the reference axis.
pub fn reference_irf() -> TimeCurve {
    gaussian_irf(reference_axis(), REFERENCE_IRF_CENTER, REFERENCE_IRF_WIDTH)
}

/// Reference engine: spectrum `[1, 4]`, period 100, full window.
pub fn reference_engine(method: ConvolutionMethod) -> DecayConvolution {
    DecayConvolution::new(reference_irf(), LifetimeSpectrum::from_pairs(&[(1.0, 4.0)]))
        .with_settings(ConvolutionSettings::with_method(method))
        .expect("default settings are valid")
}

/// Every `step`-th value of `values`, starting at index 0.
pub fn every_nth(values: &[f64], step: usize) -> Vec<f64> {
    values.iter().step_by(step).copied().collect()
}

/// Assert `actual` and `expected` agree to a relative tolerance.
pub fn assert_rel_close(actual: &[f64], expected: &[f64], rtol: f64) {
    assert_eq!(actual.len(), expected.len(), "length");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let tol = rtol * e.abs().max(a.abs());
        assert!((a - e).abs() <= tol, "index {i}: got {a:e}, expected {e:e}");
    }
}
