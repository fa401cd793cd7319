//! # tcspc-decay: fluorescence decay convolution engine.
//!
//! Turns a multi-exponential lifetime model and a measured instrument
//! response into the curve a TCSPC instrument would record:
//! - **IRF correction**: background subtraction floored at zero and a
//!   fractional circular shift with linear interpolation.
//! - **Recurrence kernels**: the O(N²) convolution sum evaluated in O(N) per
//!   lifetime, on uniform or arbitrary time axes.
//! - **Periodic excitation**: tails of earlier pulses folded in as a
//!   geometric series that seeds the recurrence.
//! - **AVX lanes**: four lifetimes per register, selected at runtime.
//! - **Lifetime estimates**: method-of-moments lifetime of measured data in
//!   channel units, and the mean arrival time of the model.

pub mod engine;
pub mod irf;
pub mod kernel;
pub mod lifetime;
pub mod simd;

pub use engine::DecayConvolution;
pub use irf::correct_irf;
pub use simd::{avx_available, Strategy};
pub use tcspc_core::traits::DecayModel;
