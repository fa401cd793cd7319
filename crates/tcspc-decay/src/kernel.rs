//! Scalar convolution kernels.
//!
//! Every kernel evaluates, for each lifetime component `(a, τ)`, the
//! trapezoidal running sum
//!
//! ```text
//! S_0 = ½·h_0·irf[0]
//! S_i = e_i·S_{i-1} + ½·h_i·(e_i·irf[i-1] + irf[i]),   e_i = exp(-h_i/τ)
//! ```
//!
//! and adds `a·S_i` into `out[i]`. This is the convolution
//! `Σ_j irf[j]·exp(-(x_i - x_j)/τ)` in O(N) per component instead of O(N²).
//!
//! Uniform kernels take `h_i = dt` for every step, so `e` is computed once per
//! lifetime. Time-axis kernels recompute `h_i` and `e_i` from `x` each step.
//!
//! Periodic kernels add the tails of all earlier excitation pulses. The
//! single-pulse sum at the last channel inside one period, carried forward
//! one period and summed as a geometric series, seeds `S_0`.
//!
//! `out.len()` is the number of channels evaluated (the resolved window stop).
//! The IRF and axis may be longer; periodic seeding always looks at the full
//! first period of the IRF.

use tcspc_core::constants::EXP_UNDERFLOW_ARG;
use tcspc_core::curve::first_width;

/// `exp(arg)`, returning exactly zero where the result would be subnormal.
#[inline]
pub fn safe_exp(arg: f64) -> f64 {
    if arg < EXP_UNDERFLOW_ARG {
        0.0
    } else {
        arg.exp()
    }
}

/// Steady-state contribution of all earlier pulses at channel 0.
///
/// `tail` is the single-pulse sum at a channel `span` after channel 0. It
/// decays for `period - span` to reach channel 0 of the next pulse, and every
/// older pulse adds another factor `exp(-period/τ)`:
/// `tail·exp(-(period - span)/τ) / (1 - exp(-period/τ))`.
pub fn geometric_carry(tail: f64, span: f64, tau: f64, period: f64) -> f64 {
    let denom = -(-period / tau).exp_m1();
    if denom <= 0.0 {
        return 0.0;
    }
    let carry = tail * safe_exp(-(period - span) / tau) / denom;
    if carry.is_finite() { carry } else { 0.0 }
}

/// Carry for the uniform-step kernels.
pub fn periodic_carry_uniform(irf: &[f64], dt: f64, tau: f64, period: f64) -> f64 {
    let Some(&first) = irf.first() else {
        return 0.0;
    };
    let e = safe_exp(-dt / tau);
    let l2 = 0.5 * dt;
    let mut s = l2 * first;
    let mut last = 0;
    for j in 1..irf.len() {
        if j as f64 * dt >= period {
            break;
        }
        s = s * e + l2 * (irf[j - 1] * e + irf[j]);
        last = j;
    }
    geometric_carry(s, last as f64 * dt, tau, period)
}

/// Carry for the time-axis kernels.
pub fn periodic_carry_time(irf: &[f64], x: &[f64], tau: f64, period: f64) -> f64 {
    let n = irf.len().min(x.len());
    if n == 0 {
        return 0.0;
    }
    let mut s = 0.5 * first_width(x).unwrap_or(0.0) * irf[0];
    let mut last = 0;
    for j in 1..n {
        if x[j] - x[0] >= period {
            break;
        }
        let h = x[j] - x[j - 1];
        let e = safe_exp(-h / tau);
        s = s * e + 0.5 * h * (irf[j - 1] * e + irf[j]);
        last = j;
    }
    geometric_carry(s, x[last] - x[0], tau, period)
}

/// Uniform-step convolution. `period` switches on periodic excitation.
pub fn convolve_uniform(
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
    let l2 = 0.5 * dt;
    for &(amplitude, tau) in components {
        let e = safe_exp(-dt / tau);
        let carry = period.map_or(0.0, |p| periodic_carry_uniform(irf, dt, tau, p));
        let mut s = carry + l2 * irf[0];
        out[0] += amplitude * s;
        for i in 1..n {
            s = s * e + l2 * (irf[i - 1] * e + irf[i]);
            out[i] += amplitude * s;
        }
    }
}

/// Time-axis convolution for arbitrary (possibly non-uniform) `x`.
pub fn convolve_time(
    components: &[(f64, f64)],
    irf: &[f64],
    x: &[f64],
    period: Option<f64>,
    out: &mut [f64],
) {
    let n = out.len().min(irf.len()).min(x.len());
    if n == 0 {
        return;
    }
    let h0 = first_width(x).unwrap_or(0.0);
    for &(amplitude, tau) in components {
        let carry = period.map_or(0.0, |p| periodic_carry_time(irf, x, tau, p));
        let mut s = carry + 0.5 * h0 * irf[0];
        out[0] += amplitude * s;
        for i in 1..n {
            let h = x[i] - x[i - 1];
            let e = safe_exp(-h / tau);
            s = s * e + 0.5 * h * (irf[i - 1] * e + irf[i]);
            out[i] += amplitude * s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn axis(n: usize, dt: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dt).collect()
    }

    /// O(N²) trapezoidal reference: each IRF interval contributes the
    /// average of its two endpoint terms.
    fn direct(components: &[(f64, f64)], irf: &[f64], x: &[f64], n: usize) -> Vec<f64> {
        let mut out = vec![0.0; n];
        for &(a, tau) in components {
            for i in 0..n {
                let mut s = 0.5 * (x[1] - x[0]) * irf[0] * (-(x[i] - x[0]) / tau).exp();
                for j in 1..=i {
                    let h = x[j] - x[j - 1];
                    s += 0.5
                        * h
                        * (irf[j - 1] * (-(x[i] - x[j - 1]) / tau).exp()
                            + irf[j] * (-(x[i] - x[j]) / tau).exp());
                }
                out[i] += a * s;
            }
        }
        out
    }

    fn assert_close(a: &[f64], b: &[f64], rtol: f64) {
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            let tol = rtol * x.abs().max(y.abs()) + 1e-300;
            assert!((x - y).abs() <= tol, "channel {i}: {x} vs {y}");
        }
    }

    // --- safe_exp ---

    #[test]
    fn safe_exp_underflows_to_zero() {
        assert_eq!(safe_exp(-800.0), 0.0);
        assert_eq!(safe_exp(0.0), 1.0);
        assert!(safe_exp(-707.0) > 0.0);
    }

    // --- single pulse ---

    #[test]
    fn impulse_response_is_exponential() {
        let mut irf = vec![0.0; 16];
        irf[0] = 2.0;
        let mut out = vec![0.0; 16];
        convolve_uniform(&[(1.0, 3.0)], &irf, 0.5, None, &mut out);
        // S_0 = ½·dt·2 and S_i = S_{i-1}·e + ½·dt·e·irf[0] at i = 1.
        assert!((out[0] - 0.5).abs() < 1e-15);
        let e = (-0.5f64 / 3.0).exp();
        assert!((out[1] - 2.0 * 0.5 * e).abs() < 1e-15);
        for i in 2..16 {
            assert!((out[i] / out[i - 1] - e).abs() < 1e-12);
        }
    }

    #[test]
    fn uniform_matches_direct_sum() {
        let x = axis(40, 0.25);
        let irf: Vec<f64> = x.iter().map(|&t| (-(t - 2.0) * (t - 2.0)).exp()).collect();
        let comps = [(0.7, 1.3), (0.3, 5.0)];
        let mut fast = vec![0.0; 40];
        convolve_uniform(&comps, &irf, 0.25, None, &mut fast);
        assert_close(&fast, &direct(&comps, &irf, &x, 40), 1e-10);
    }

    #[test]
    fn time_kernel_handles_irregular_axis() {
        let x: Vec<f64> = (0..30).map(|i| (i as f64 * 0.2).powf(1.3)).collect();
        let irf: Vec<f64> = x.iter().map(|&t| (-(t - 1.0) * (t - 1.0) * 4.0).exp()).collect();
        let comps = [(1.0, 2.0)];
        let mut fast = vec![0.0; 30];
        convolve_time(&comps, &irf, &x, None, &mut fast);
        assert_close(&fast, &direct(&comps, &irf, &x, 30), 1e-10);
    }

    #[test]
    fn time_and_uniform_agree_on_uniform_axis() {
        let x = axis(64, 0.1);
        let irf: Vec<f64> = x.iter().map(|&t| (-(t - 1.0) * (t - 1.0) * 10.0).exp()).collect();
        let comps = [(1.0, 0.8), (2.0, 3.0), (0.5, 0.05)];
        let mut u = vec![0.0; 64];
        let mut t = vec![0.0; 64];
        convolve_uniform(&comps, &irf, 0.1, None, &mut u);
        convolve_time(&comps, &irf, &x, None, &mut t);
        assert_close(&u, &t, 1e-12);
    }

    #[test]
    fn short_out_evaluates_prefix_only() {
        let irf = vec![1.0; 10];
        let mut full = vec![0.0; 10];
        let mut prefix = vec![0.0; 4];
        convolve_uniform(&[(1.0, 2.0)], &irf, 1.0, None, &mut full);
        convolve_uniform(&[(1.0, 2.0)], &irf, 1.0, None, &mut prefix);
        assert_eq!(&full[..4], &prefix[..]);
    }

    #[test]
    fn kernels_accumulate() {
        let irf = vec![0.0, 1.0, 0.0, 0.0];
        let mut out = vec![10.0; 4];
        convolve_uniform(&[(1.0, 1.0)], &irf, 1.0, None, &mut out);
        assert_eq!(out[0], 10.0);
        assert!(out[1] > 10.0);
    }

    #[test]
    fn empty_inputs_are_no_ops() {
        let mut out: Vec<f64> = Vec::new();
        convolve_uniform(&[(1.0, 1.0)], &[], 1.0, Some(10.0), &mut out);
        convolve_time(&[(1.0, 1.0)], &[], &[], Some(10.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn tiny_lifetime_stays_finite() {
        let irf = vec![1.0; 8];
        let mut out = vec![0.0; 8];
        convolve_uniform(&[(1.0, 1e-300)], &irf, 1.0, Some(5.0), &mut out);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    // --- periodic ---

    #[test]
    fn periodic_equals_explicit_pulse_train() {
        // Period of 8 channels on a 8-channel window: summing many explicitly
        // repeated pulses must reproduce the geometric-series carry.
        let dt = 0.5;
        let n = 8;
        let period = n as f64 * dt;
        let irf: Vec<f64> = (0..n).map(|i| if i == 1 { 1.0 } else { 0.0 }).collect();
        let comps = [(1.0, 1.5)];

        let mut periodic = vec![0.0; n];
        convolve_uniform(&comps, &irf, dt, Some(period), &mut periodic);

        let pulses = 60;
        let long_irf: Vec<f64> = (0..n * pulses).map(|i| irf[i % n]).collect();
        let mut train = vec![0.0; n * pulses];
        convolve_uniform(&comps, &long_irf, dt, None, &mut train);
        let last = &train[n * (pulses - 1)..];

        assert_close(&periodic, last, 1e-9);
    }

    #[test]
    fn periodic_adds_only_positive_tail() {
        let dt = 0.25;
        let irf: Vec<f64> = (0..32).map(|i| if i == 4 { 1.0 } else { 0.0 }).collect();
        let mut single = vec![0.0; 32];
        let mut periodic = vec![0.0; 32];
        convolve_uniform(&[(1.0, 2.0)], &irf, dt, None, &mut single);
        convolve_uniform(&[(1.0, 2.0)], &irf, dt, Some(10.0), &mut periodic);
        for (s, p) in single.iter().zip(&periodic) {
            assert!(p > s, "periodic {p} must exceed single {s}");
        }
    }

    #[test]
    fn long_period_converges_to_single_pulse() {
        let irf = vec![0.0, 1.0, 0.5, 0.0, 0.0, 0.0];
        let mut single = vec![0.0; 6];
        let mut periodic = vec![0.0; 6];
        convolve_uniform(&[(1.0, 1.0)], &irf, 1.0, None, &mut single);
        convolve_uniform(&[(1.0, 1.0)], &irf, 1.0, Some(1e4), &mut periodic);
        assert_eq!(single, periodic);
    }

    #[test]
    fn period_shorter_than_window_ignores_later_irf() {
        let irf = vec![1.0, 0.0, 0.0, 0.0, 50.0, 0.0];
        let c = periodic_carry_uniform(&irf, 1.0, 2.0, 3.0);
        let without_spike = periodic_carry_uniform(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1.0, 2.0, 3.0);
        assert_eq!(c, without_spike);
    }

    #[test]
    fn carry_uniform_and_time_agree() {
        let x = axis(20, 0.3);
        let irf: Vec<f64> = x.iter().map(|&t| (-(t - 0.9) * (t - 0.9) * 20.0).exp()).collect();
        let a = periodic_carry_uniform(&irf, 0.3, 1.7, 12.5);
        let b = periodic_carry_time(&irf, &x, 1.7, 12.5);
        assert!((a - b).abs() <= 1e-12 * a.abs());
    }

    #[test]
    fn geometric_carry_degenerate_denominator() {
        assert_eq!(geometric_carry(1.0, 0.0, f64::MAX, 1e-300), 0.0);
    }

    proptest! {
        #[test]
        fn uniform_matches_time_kernel(
            dt in 0.01f64..1.0,
            tau in 0.05f64..20.0,
            center in 0usize..16,
            period in prop::option::of(1.0f64..200.0),
        ) {
            let n = 24;
            let x = axis(n, dt);
            let irf: Vec<f64> = (0..n).map(|i| if i == center { 1.0 } else { 0.01 }).collect();
            let mut u = vec![0.0; n];
            let mut t = vec![0.0; n];
            convolve_uniform(&[(1.0, tau)], &irf, dt, period, &mut u);
            convolve_time(&[(1.0, tau)], &irf, &x, period, &mut t);
            for (a, b) in u.iter().zip(&t) {
                prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(b.abs()) + 1e-300);
            }
        }

        #[test]
        fn output_non_negative_for_non_negative_irf(
            irf in proptest::collection::vec(0.0f64..10.0, 2..40),
            tau in 0.01f64..50.0,
            periodic in any::<bool>(),
        ) {
            let mut out = vec![0.0; irf.len()];
            let period = periodic.then_some(7.0);
            convolve_uniform(&[(1.0, tau)], &irf, 0.2, period, &mut out);
            prop_assert!(out.iter().all(|&v| v >= 0.0 && v.is_finite()));
        }

        #[test]
        fn linear_in_amplitude(
            a in 0.1f64..10.0,
            tau in 0.1f64..10.0,
        ) {
            let irf = vec![0.0, 1.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0];
            let mut one = vec![0.0; 8];
            let mut scaled = vec![0.0; 8];
            convolve_uniform(&[(1.0, tau)], &irf, 0.5, Some(6.0), &mut one);
            convolve_uniform(&[(a, tau)], &irf, 0.5, Some(6.0), &mut scaled);
            for (o, s) in one.iter().zip(&scaled) {
                prop_assert!((o * a - s).abs() <= 1e-12 * s.abs().max(1e-300));
            }
        }
    }
}
