//! Convolution method selection, channel windows and scalar settings.
//!
//! [`ConvolutionSettings`] groups every scalar knob of a convolution so it can
//! be built programmatically, defaulted, or loaded from JSON. Method codes are
//! part of the external interface and never change.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EXCITATION_PERIOD, OPEN_STOP};
use crate::error::{ConfigError, RangeError};

/// The closed set of convolution algorithms.
///
/// Discriminants are the stable external codes.
///
/// # Examples
///
/// ```
/// use tcspc_core::ConvolutionMethod;
/// assert_eq!(ConvolutionMethod::default(), ConvolutionMethod::Fast);
/// assert_eq!(ConvolutionMethod::Fast.code(), 3);
/// assert_eq!(ConvolutionMethod::try_from(0i64), Ok(ConvolutionMethod::FastPeriodicTime));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
#[repr(u8)]
pub enum ConvolutionMethod {
    /// Arbitrary time axis, repeated excitation.
    FastPeriodicTime = 0,
    /// Arbitrary time axis, single excitation pulse.
    FastTime = 1,
    /// Uniform channel width, repeated excitation.
    FastPeriodic = 2,
    /// Uniform channel width, single excitation pulse.
    #[default]
    Fast = 3,
    /// [`Fast`](Self::Fast) evaluated with AVX lanes when the CPU supports it.
    FastAvx = 4,
    /// [`FastPeriodic`](Self::FastPeriodic) evaluated with AVX lanes when the CPU supports it.
    FastPeriodicAvx = 5,
}

impl ConvolutionMethod {
    /// Every method, in code order.
    pub const ALL: [ConvolutionMethod; 6] = [
        Self::FastPeriodicTime,
        Self::FastTime,
        Self::FastPeriodic,
        Self::Fast,
        Self::FastAvx,
        Self::FastPeriodicAvx,
    ];

    /// Stable integer code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether contributions of earlier excitation pulses are included.
    pub fn is_periodic(self) -> bool {
        matches!(
            self,
            Self::FastPeriodicTime | Self::FastPeriodic | Self::FastPeriodicAvx
        )
    }

    /// Whether the kernel recomputes the decay factor for every channel step
    /// instead of assuming a uniform width.
    pub fn follows_time_axis(self) -> bool {
        matches!(self, Self::FastPeriodicTime | Self::FastTime)
    }

    /// Whether the method asks for the vectorized kernel.
    pub fn is_vectorized(self) -> bool {
        matches!(self, Self::FastAvx | Self::FastPeriodicAvx)
    }

    /// Conventional upper-case identifier, e.g. `FAST_PERIODIC_TIME`.
    pub fn name(self) -> &'static str {
        match self {
            Self::FastPeriodicTime => "FAST_PERIODIC_TIME",
            Self::FastTime => "FAST_TIME",
            Self::FastPeriodic => "FAST_PERIODIC",
            Self::Fast => "FAST",
            Self::FastAvx => "FAST_AVX",
            Self::FastPeriodicAvx => "FAST_PERIODIC_AVX",
        }
    }
}

impl TryFrom<i64> for ConvolutionMethod {
    type Error = ConfigError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|m| i64::from(m.code()) == code)
            .ok_or(ConfigError::UnknownMethod(code))
    }
}

impl From<ConvolutionMethod> for i64 {
    fn from(method: ConvolutionMethod) -> Self {
        i64::from(method.code())
    }
}

impl fmt::Display for ConvolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A channel window `[start, stop)` where an open `stop` means "through the
/// last channel" and is resolved against the curve length at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelWindow {
    pub start: usize,
    pub stop: Option<usize>,
}

impl ChannelWindow {
    /// The window covering every channel.
    pub fn full() -> Self {
        Self::default()
    }

    /// Build a window from the raw external form, where `stop == -1` is open.
    pub fn from_raw(start: usize, stop: i64) -> Result<Self, RangeError> {
        let stop = match stop {
            OPEN_STOP => None,
            s if s < 0 => return Err(RangeError::InvalidStop(s)),
            s => Some(s as usize),
        };
        Ok(Self { start, stop })
    }

    /// The raw external `stop`, `-1` when open.
    pub fn raw_stop(&self) -> i64 {
        self.stop.map_or(OPEN_STOP, |s| s as i64)
    }

    /// Resolve against a curve of `len` channels.
    ///
    /// `stop` beyond the curve is clamped to `len`; `start` beyond the curve
    /// or past the resolved stop is an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tcspc_core::ChannelWindow;
    /// assert_eq!(ChannelWindow::full().resolve(32), Ok(0..32));
    /// assert_eq!(ChannelWindow::from_raw(4, 100).unwrap().resolve(32), Ok(4..32));
    /// ```
    pub fn resolve(&self, len: usize) -> Result<Range<usize>, RangeError> {
        if self.start > len {
            return Err(RangeError::StartOutOfRange {
                start: self.start,
                len,
            });
        }
        let stop = self.stop.map_or(len, |s| s.min(len));
        if self.start > stop {
            return Err(RangeError::StartAfterStop {
                start: self.start,
                stop,
            });
        }
        Ok(self.start..stop)
    }
}

/// Scalar configuration of a decay convolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionSettings {
    /// Algorithm, serialized as its integer code.
    pub convolution_method: ConvolutionMethod,
    /// Time between excitation pulses (periodic methods only).
    pub excitation_period: f64,
    /// Fractional circular shift of the IRF, in channels.
    pub irf_shift_channels: f64,
    /// Constant subtracted from every IRF sample, floored at zero.
    pub irf_background_counts: f64,
    /// First channel written.
    pub start: usize,
    /// One past the last channel written; `-1` for "through the end".
    pub stop: i64,
}

impl Default for ConvolutionSettings {
    fn default() -> Self {
        Self {
            convolution_method: ConvolutionMethod::default(),
            excitation_period: DEFAULT_EXCITATION_PERIOD,
            irf_shift_channels: 0.0,
            irf_background_counts: 0.0,
            start: 0,
            stop: OPEN_STOP,
        }
    }
}

impl ConvolutionSettings {
    /// Default settings with the given method.
    pub fn with_method(method: ConvolutionMethod) -> Self {
        Self {
            convolution_method: method,
            ..Self::default()
        }
    }

    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Settings(e.to_string()))
    }

    /// Check the scalar settings that do not depend on a curve.
    ///
    /// The excitation period is only checked for periodic methods.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.convolution_method.is_periodic()
            && !(self.excitation_period.is_finite() && self.excitation_period > 0.0)
        {
            return Err(ConfigError::InvalidPeriod(self.excitation_period));
        }
        if !(self.irf_background_counts.is_finite() && self.irf_background_counts >= 0.0) {
            return Err(ConfigError::InvalidBackground(self.irf_background_counts));
        }
        if !self.irf_shift_channels.is_finite() {
            return Err(ConfigError::InvalidShift(self.irf_shift_channels));
        }
        Ok(())
    }

    /// The channel window described by `start` / `stop`.
    pub fn window(&self) -> Result<ChannelWindow, RangeError> {
        ChannelWindow::from_raw(self.start, self.stop)
    }
}
