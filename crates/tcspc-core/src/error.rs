//! Error types for TCSPC decay modelling.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    #[error("length mismatch: x has {x} values, y has {y}")] LengthMismatch { x: usize, y: usize },
    #[error("empty curve")] Empty,
    #[error("axis mismatch: irf has {irf} channels, target has {target}")] AxisMismatch { irf: usize, target: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown convolution method code: {0}")] UnknownMethod(i64),
    #[error("lifetime spectrum has odd length {0}")] OddSpectrumLength(usize),
    #[error("non-positive lifetime {lifetime} at component {index}")] NonPositiveLifetime { index: usize, lifetime: f64 },
    #[error("invalid excitation period: {0}")] InvalidPeriod(f64),
    #[error("invalid irf background: {0}")] InvalidBackground(f64),
    #[error("invalid irf shift: {0}")] InvalidShift(f64),
    #[error("settings: {0}")] Settings(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("start {start} outside [0, {len}]")] StartOutOfRange { start: usize, len: usize },
    #[error("start {start} after stop {stop}")] StartAfterStop { start: usize, stop: usize },
    #[error("invalid stop index: {0}")] InvalidStop(i64),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvolutionError {
    #[error(transparent)] Curve(#[from] CurveError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Range(#[from] RangeError),
    #[error("zero total intensity in window")] ZeroIntensity,
}
