//! Intensity-weighted moments, on a time axis or in channel units.

/// `Σ x·y / Σ y`, or `None` when the intensity sums to zero or is not finite.
pub fn first_moment(x: &[f64], y: &[f64]) -> Option<f64> {
    let (weighted, total) = x
        .iter()
        .zip(y)
        .fold((0.0, 0.0), |(w, t), (&xi, &yi)| (w + xi * yi, t + yi));
    if total == 0.0 || !total.is_finite() {
        return None;
    }
    let moment = weighted / total;
    moment.is_finite().then_some(moment)
}

/// Difference of first moments: the mean delay of `data` relative to `irf`.
///
/// For a single-exponential decay convolved with the IRF this recovers the
/// lifetime, independent of IRF shape, as long as both curves are fully
/// contained in the window.
pub fn moment_delay(x: &[f64], data: &[f64], irf: &[f64]) -> Option<f64> {
    Some(first_moment(x, data)? - first_moment(x, irf)?)
}

/// Nominal channel width of an axis: its span divided by the channel count.
///
/// This is the width the channel-unit lifetime estimate is scaled by. It is
/// slightly smaller than the spacing `span / (len - 1)` of a uniform axis.
pub fn channel_width(x: &[f64]) -> Option<f64> {
    match x {
        [] => None,
        [first, .., last] => Some((last - first) / x.len() as f64),
        [_] => Some(0.0),
    }
}

/// Mean delay of `data` relative to `irf` in channels.
///
/// `start` is the absolute index of the first sample, so windows of one
/// curve share a channel origin.
pub fn channel_delay(start: usize, data: &[f64], irf: &[f64]) -> Option<f64> {
    let channels: Vec<f64> = (start..start + data.len()).map(|i| i as f64).collect();
    moment_delay(&channels, data, irf)
}
