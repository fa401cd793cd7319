//! AVX variant of the uniform-step kernel.
//!
//! Lifetime components are packed four to a 256-bit register and advanced
//! through the recurrence together. Each lane performs exactly the same
//! multiply and add sequence as [`kernel::convolve_uniform`], and lane
//! results are added into the output in component order, so the two kernels
//! agree bit for bit.
//!
//! On CPUs or targets without AVX the scalar kernel runs instead. Callers
//! never see an error for a missing instruction set; the returned
//! [`Strategy`] says which path was taken.

use std::fmt;

use crate::kernel;

/// Which kernel implementation actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Scalar,
    Avx,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Scalar => f.write_str("scalar"),
            Strategy::Avx => f.write_str("avx"),
        }
    }
}

/// Lanes per 256-bit register of `f64`.
pub const LANES: usize = 4;

/// Whether the running CPU supports AVX.
pub fn avx_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::arch::is_x86_feature_detected!("avx")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

/// Uniform-step convolution using AVX when available.
pub fn convolve_uniform_vectorized(
    components: &[(f64, f64)],
    irf: &[f64],
    dt: f64,
    period: Option<f64>,
    out: &mut [f64],
) -> Strategy {
    #[cfg(target_arch = "x86_64")]
    {
        if avx_available() {
            // SAFETY: AVX support was checked at runtime just above.
            unsafe { avx::convolve_uniform(components, irf, dt, period, out) };
            return Strategy::Avx;
        }
    }
    kernel::convolve_uniform(components, irf, dt, period, out);
    Strategy::Scalar
}

/// Per-lane constants for one group of up to four components.
#[cfg(target_arch = "x86_64")]
struct LaneGroup {
    amplitude: [f64; LANES],
    decay: [f64; LANES],
    seed: [f64; LANES],
    used: usize,
}

#[cfg(target_arch = "x86_64")]
impl LaneGroup {
    fn pack(group: &[(f64, f64)], irf: &[f64], dt: f64, period: Option<f64>) -> Self {
        let l2 = 0.5 * dt;
        let mut lanes = LaneGroup {
            amplitude: [0.0; LANES],
            decay: [0.0; LANES],
            seed: [0.0; LANES],
            used: group.len().min(LANES),
        };
        for (k, &(amplitude, tau)) in group.iter().take(LANES).enumerate() {
            let carry = period.map_or(0.0, |p| kernel::periodic_carry_uniform(irf, dt, tau, p));
            lanes.amplitude[k] = amplitude;
            lanes.decay[k] = kernel::safe_exp(-dt / tau);
            lanes.seed[k] = carry + l2 * irf[0];
        }
        lanes
    }
}

#[cfg(target_arch = "x86_64")]
mod avx {
    use std::arch::x86_64::{
        _mm256_add_pd, _mm256_loadu_pd, _mm256_mul_pd, _mm256_set1_pd, _mm256_storeu_pd,
    };

    use super::{LANES, LaneGroup};

    /// # Safety
    ///
    /// The CPU must support AVX.
    #[target_feature(enable = "avx")]
    pub unsafe fn convolve_uniform(
        components: &[(f64, f64)],
        irf: &[f64],
        dt: f64,
        period: Option<f64>,
        out: &mut [f64],
    ) {
        let n = out.len().min(irf.len());
        if n == 0 {
            return;
        }
        let mut lane_out = [0.0f64; LANES];

        for group in components.chunks(LANES) {
            let lanes = LaneGroup::pack(group, irf, dt, period);
            // SAFETY: every pointer comes from a live `[f64; LANES]` and the
            // caller guarantees AVX.
            unsafe {
                let amp = _mm256_loadu_pd(lanes.amplitude.as_ptr());
                let e = _mm256_loadu_pd(lanes.decay.as_ptr());
                let l2 = _mm256_set1_pd(0.5 * dt);
                let mut s = _mm256_loadu_pd(lanes.seed.as_ptr());

                _mm256_storeu_pd(lane_out.as_mut_ptr(), _mm256_mul_pd(amp, s));
                for v in &lane_out[..lanes.used] {
                    out[0] += v;
                }

                for i in 1..n {
                    let prev = _mm256_set1_pd(irf[i - 1]);
                    let cur = _mm256_set1_pd(irf[i]);
                    let inner = _mm256_add_pd(_mm256_mul_pd(prev, e), cur);
                    s = _mm256_add_pd(_mm256_mul_pd(s, e), _mm256_mul_pd(l2, inner));
                    _mm256_storeu_pd(lane_out.as_mut_ptr(), _mm256_mul_pd(amp, s));
                    for v in &lane_out[..lanes.used] {
                        out[i] += v;
                    }
                }
            }
        }
    }
}
