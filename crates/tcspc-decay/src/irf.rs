//! Instrument response correction.
//!
//! The convolution kernel is not the raw IRF but a corrected copy:
//! 1. a constant background is subtracted and the result floored at zero;
//! 2. the curve is shifted by a fractional number of channels, circularly,
//!    with linear interpolation between neighbouring channels;
//! 3. magnitudes below the smallest normal `f64` are flushed to zero.
//!
//! A positive shift moves content toward lower channel indices: channel `i`
//! reads the input at `i + shift`. Content pushed before the first channel
//! re-enters at the last, so a shift of `+10` carries an early peak around to
//! the end of the curve.

use tcspc_core::constants::IRF_FLUSH_THRESHOLD;
use tcspc_core::curve::TimeCurve;
use tcspc_core::error::CurveError;
use tracing::trace;

/// Subtract `background` from every sample, flooring at zero.
pub fn subtract_background(values: &[f64], background: f64) -> Vec<f64> {
    values.iter().map(|&v| (v - background).max(0.0)).collect()
}

/// Circularly shift `values` by `shift` channels.
///
/// Channel `i` of the result takes the value at position `i + shift` of the
/// input, linearly interpolated, indices taken modulo `len`. Shifting by a
/// multiple of `len` is the identity.
pub fn circular_shift(values: &[f64], shift: f64) -> Vec<f64> {
    let n = values.len();
    if n == 0 || shift == 0.0 {
        return values.to_vec();
    }

    // Reduce to [0, n) first so `floor` stays exact for large shifts.
    let s = shift.rem_euclid(n as f64);
    let whole = s.floor();
    let frac = s - whole;
    // rem_euclid can round up to exactly n for tiny negative shifts.
    let k = (whole as usize) % n;

    (0..n)
        .map(|i| {
            let lo = (i + k) % n;
            let hi = (lo + 1) % n;
            if frac == 0.0 {
                values[lo]
            } else {
                (1.0 - frac) * values[lo] + frac * values[hi]
            }
        })
        .collect()
}

/// Replace magnitudes below the smallest normal float with zero.
pub fn flush_tiny(values: &mut [f64]) {
    for v in values.iter_mut() {
        if v.abs() < IRF_FLUSH_THRESHOLD {
            *v = 0.0;
        }
    }
}

/// Background-subtract, shift and flush an IRF. The input is not modified.
pub fn correct_irf(irf: &TimeCurve, background: f64, shift: f64) -> Result<TimeCurve, CurveError> {
    irf.validate()?;
    let floored = subtract_background(irf.y(), background);
    let mut shifted = circular_shift(&floored, shift);
    flush_tiny(&mut shifted);
    trace!(channels = irf.len(), background, shift, "irf: corrected");
    TimeCurve::try_new(irf.x().to_vec(), shifted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn peak_index(v: &[f64]) -> usize {
        v.iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap()
    }

    fn spike(n: usize, at: usize) -> Vec<f64> {
        let mut v = vec![0.0; n];
        v[at] = 1.0;
        v
    }

    // --- background ---

    #[test]
    fn background_floors_at_zero() {
        let v = subtract_background(&[0.5, 2.0, 10.0], 1.0);
        assert_eq!(v, vec![0.0, 1.0, 9.0]);
    }

    #[test]
    fn zero_background_is_identity() {
        let raw = [0.0, 3.5, 1e30];
        assert_eq!(subtract_background(&raw, 0.0), raw.to_vec());
    }

    // --- shift ---

    #[test]
    fn zero_shift_is_identity() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(circular_shift(&v, 0.0), v);
    }

    #[test]
    fn positive_shift_wraps_early_peak_to_end() {
        let v = spike(32, 3);
        assert_eq!(peak_index(&circular_shift(&v, 10.0)), 25);
    }

    #[test]
    fn positive_shift_reads_later_channel() {
        let v: Vec<f64> = (0..32).map(f64::from).collect();
        let shifted = circular_shift(&v, 10.0);
        assert_eq!(shifted[0], 10.0);
        assert_eq!(shifted[21], 31.0);
        assert_eq!(shifted[22], 0.0);
    }

    #[test]
    fn negative_shift_moves_toward_higher_channels() {
        let v = spike(32, 3);
        assert_eq!(peak_index(&circular_shift(&v, -10.0)), 13);
    }

    #[test]
    fn negative_shift_past_end_wraps_to_start() {
        let v = spike(8, 6);
        let shifted = circular_shift(&v, -3.0);
        assert_eq!(shifted, spike(8, 1));
    }

    #[test]
    fn full_length_shift_is_identity() {
        let v = vec![0.1, 0.7, 0.2, 0.0, 5.0];
        assert_eq!(circular_shift(&v, 5.0), v);
        assert_eq!(circular_shift(&v, -10.0), v);
    }

    #[test]
    fn half_channel_shift_interpolates() {
        let v = spike(4, 1);
        let shifted = circular_shift(&v, 0.5);
        assert_eq!(shifted, vec![0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn negative_fractional_shift_interpolates() {
        let v = spike(4, 1);
        let shifted = circular_shift(&v, -0.25);
        assert_eq!(shifted[0], 0.0);
        assert!((shifted[1] - 0.75).abs() < 1e-15);
        assert!((shifted[2] - 0.25).abs() < 1e-15);
        assert_eq!(shifted[3], 0.0);
    }

    #[test]
    fn tiny_negative_shift_does_not_index_out_of_bounds() {
        let v = vec![1.0, 2.0, 3.0];
        let shifted = circular_shift(&v, -1e-300);
        assert_eq!(shifted.len(), 3);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(circular_shift(&[], 2.5).is_empty());
    }

    // --- flush ---

    #[test]
    fn subnormals_flushed() {
        let mut v = vec![9.4e-315, 3.9e-217, -1e-320];
        flush_tiny(&mut v);
        assert_eq!(v, vec![0.0, 3.9e-217, 0.0]);
    }

    #[test]
    fn correct_irf_rejects_empty() {
        let irf = TimeCurve::from_x(Vec::new());
        assert_eq!(correct_irf(&irf, 0.0, 0.0), Err(CurveError::Empty));
    }

    #[test]
    fn correct_irf_keeps_axis_and_input() {
        let irf = TimeCurve::try_new(vec![0.0, 1.0, 2.0], vec![1.0, 5.0, 2.0]).unwrap();
        let corrected = correct_irf(&irf, 1.5, 1.0).unwrap();
        assert_eq!(corrected.x(), irf.x());
        assert_eq!(corrected.y(), &[3.5, 0.5, 0.0]);
        assert_eq!(irf.y(), &[1.0, 5.0, 2.0]);
    }

    proptest! {
        #[test]
        fn background_above_max_zeroes_everything(
            values in proptest::collection::vec(0.0f64..1e6, 1..64),
            extra in 0.0f64..10.0,
        ) {
            let max = values.iter().cloned().fold(0.0, f64::max);
            let out = subtract_background(&values, max + extra);
            prop_assert!(out.iter().all(|&v| v == 0.0));
        }

        #[test]
        fn integer_shift_round_trips(
            values in proptest::collection::vec(-1e3f64..1e3, 1..64),
            s in -200i32..200,
        ) {
            let there = circular_shift(&values, s as f64);
            let back = circular_shift(&there, -(s as f64));
            prop_assert_eq!(back, values);
        }

        #[test]
        fn fractional_shift_preserves_total(
            values in proptest::collection::vec(0.0f64..1e3, 1..64),
            s in -100.0f64..100.0,
        ) {
            let total: f64 = values.iter().sum();
            let shifted: f64 = circular_shift(&values, s).iter().sum();
            prop_assert!((total - shifted).abs() <= 1e-9 * total.max(1.0));
        }

        #[test]
        fn shift_by_len_is_identity(
            values in proptest::collection::vec(-1e3f64..1e3, 1..64),
            m in -3i32..4,
        ) {
            let n = values.len() as f64;
            prop_assert_eq!(circular_shift(&values, m as f64 * n), values);
        }
    }
}
