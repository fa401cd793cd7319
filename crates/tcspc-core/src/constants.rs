//! Numeric constants and configuration defaults.

/// Default time between excitation pulses, in the units of the time axis.
pub const DEFAULT_EXCITATION_PERIOD: f64 = 100.0;

/// Amplitude of the single component of a default [`LifetimeSpectrum`](crate::LifetimeSpectrum).
pub const DEFAULT_AMPLITUDE: f64 = 1.0;

/// Lifetime of the default component. Zero means "not set yet".
pub const UNSET_LIFETIME: f64 = 0.0;

/// Raw `stop` value meaning "through the last channel".
pub const OPEN_STOP: i64 = -1;

/// Exponent below which `exp` is evaluated as exactly zero.
///
/// `exp(-708)` ≈ 3.3e-308 is still a normal `f64`; anything smaller would
/// land in the subnormal range.
pub const EXP_UNDERFLOW_ARG: f64 = -708.0;

/// Smallest magnitude kept in a corrected IRF. Smaller values are flushed to zero.
pub const IRF_FLUSH_THRESHOLD: f64 = f64::MIN_POSITIVE;
