//! # tcspc-core
//! Foundation types and traits for TCSPC decay modelling.
//!
//! Everything here is plain data plus validation: the time axis / value
//! container ([`curve::TimeCurve`]), the multi-exponential model
//! ([`spectrum::LifetimeSpectrum`]), the scalar configuration of a
//! convolution ([`settings::ConvolutionSettings`]) and the error surface.
//! The numeric work lives in `tcspc-decay`.

pub mod constants;
pub mod curve;
pub mod error;
pub mod settings;
pub mod spectrum;
pub mod traits;

pub use curve::TimeCurve;
pub use error::{ConfigError, ConvolutionError, CurveError, RangeError};
pub use settings::{ChannelWindow, ConvolutionMethod, ConvolutionSettings};
pub use spectrum::LifetimeSpectrum;
pub use traits::DecayModel;
