//! Decay convolution engine implementing the [`DecayModel`] trait.
//!
//! [`DecayConvolution`] holds a shared IRF, a shared lifetime spectrum and the
//! scalar [`ConvolutionSettings`]. Nothing is precomputed: every evaluation
//! takes short read locks on the shared values, corrects the IRF afresh and
//! runs the kernel selected by the configured method. A fitting driver can
//! therefore keep a handle to the spectrum, rewrite it between calls, and see
//! the change on the next evaluation.

use std::ops::Range;
use std::sync::Arc;

use parking_lot::RwLock;
use tcspc_core::curve::TimeCurve;
use tcspc_core::error::{ConfigError, ConvolutionError, CurveError};
use tcspc_core::settings::{ChannelWindow, ConvolutionMethod, ConvolutionSettings};
use tcspc_core::spectrum::LifetimeSpectrum;
use tcspc_core::traits::DecayModel;
use tracing::debug;

use crate::irf::correct_irf;
use crate::kernel;
use crate::lifetime::{channel_delay, channel_width, first_moment};
use crate::simd::{self, Strategy};

/// Multi-exponential decay convolved with an instrument response.
#[derive(Debug, Clone)]
pub struct DecayConvolution {
    irf: Arc<RwLock<TimeCurve>>,
    spectrum: Arc<RwLock<LifetimeSpectrum>>,
    settings: ConvolutionSettings,
}

impl DecayConvolution {
    /// An engine that owns its IRF and spectrum, with default settings.
    pub fn new(irf: TimeCurve, spectrum: LifetimeSpectrum) -> Self {
        Self::from_parts(
            Arc::new(RwLock::new(irf)),
            Arc::new(RwLock::new(spectrum)),
            ConvolutionSettings::default(),
        )
    }

    /// An engine reading from shared IRF and spectrum handles.
    pub fn from_parts(
        irf: Arc<RwLock<TimeCurve>>,
        spectrum: Arc<RwLock<LifetimeSpectrum>>,
        settings: ConvolutionSettings,
    ) -> Self {
        Self {
            irf,
            spectrum,
            settings,
        }
    }

    /// Replace all scalar settings after validating them.
    pub fn with_settings(mut self, settings: ConvolutionSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    // --- shared inputs ---

    /// Handle to the shared IRF.
    pub fn irf(&self) -> Arc<RwLock<TimeCurve>> {
        Arc::clone(&self.irf)
    }

    /// Replace the IRF contents. Other holders of the handle see the change.
    pub fn set_irf(&self, irf: TimeCurve) {
        *self.irf.write() = irf;
    }

    /// Handle to the shared lifetime spectrum.
    pub fn lifetime_spectrum(&self) -> Arc<RwLock<LifetimeSpectrum>> {
        Arc::clone(&self.spectrum)
    }

    /// Replace the spectrum contents. Other holders of the handle see the change.
    pub fn set_lifetime_spectrum(&self, spectrum: LifetimeSpectrum) {
        *self.spectrum.write() = spectrum;
    }

    /// Flat `[a0, τ0, a1, τ1, …]` copy of the current spectrum.
    pub fn lifetime_spectrum_flat(&self) -> Vec<f64> {
        self.spectrum.read().as_flat().to_vec()
    }

    /// Replace the spectrum from its flat form.
    pub fn set_lifetime_spectrum_flat(&self, flat: Vec<f64>) -> Result<(), ConfigError> {
        self.spectrum.write().set_flat(flat)
    }

    // --- scalar settings ---

    pub fn settings(&self) -> &ConvolutionSettings {
        &self.settings
    }

    pub fn convolution_method(&self) -> ConvolutionMethod {
        self.settings.convolution_method
    }

    pub fn set_convolution_method(&mut self, method: ConvolutionMethod) {
        self.settings.convolution_method = method;
    }

    /// Select the method by its stable integer code.
    pub fn set_convolution_method_code(&mut self, code: i64) -> Result<(), ConfigError> {
        self.settings.convolution_method = ConvolutionMethod::try_from(code)?;
        Ok(())
    }

    pub fn excitation_period(&self) -> f64 {
        self.settings.excitation_period
    }

    pub fn set_excitation_period(&mut self, period: f64) -> Result<(), ConfigError> {
        if !(period.is_finite() && period > 0.0) {
            return Err(ConfigError::InvalidPeriod(period));
        }
        self.settings.excitation_period = period;
        Ok(())
    }

    pub fn irf_shift_channels(&self) -> f64 {
        self.settings.irf_shift_channels
    }

    pub fn set_irf_shift_channels(&mut self, shift: f64) -> Result<(), ConfigError> {
        if !shift.is_finite() {
            return Err(ConfigError::InvalidShift(shift));
        }
        self.settings.irf_shift_channels = shift;
        Ok(())
    }

    pub fn irf_background_counts(&self) -> f64 {
        self.settings.irf_background_counts
    }

    pub fn set_irf_background_counts(&mut self, background: f64) -> Result<(), ConfigError> {
        if !(background.is_finite() && background >= 0.0) {
            return Err(ConfigError::InvalidBackground(background));
        }
        self.settings.irf_background_counts = background;
        Ok(())
    }

    pub fn start(&self) -> usize {
        self.settings.start
    }

    pub fn set_start(&mut self, start: usize) {
        self.settings.start = start;
    }

    /// Raw window stop; `-1` means through the last channel.
    pub fn stop(&self) -> i64 {
        self.settings.stop
    }

    /// Set the raw window stop. Negative values other than `-1` are rejected.
    pub fn set_stop(&mut self, stop: i64) -> Result<(), ConvolutionError> {
        self.settings.stop = ChannelWindow::from_raw(self.settings.start, stop)?.raw_stop();
        Ok(())
    }

    // --- evaluation ---

    /// The IRF after background subtraction and shift, as the kernels see it.
    pub fn corrected_irf(&self) -> Result<TimeCurve, ConvolutionError> {
        self.settings.validate()?;
        let irf = self.irf.read();
        Ok(correct_irf(
            &irf,
            self.settings.irf_background_counts,
            self.settings.irf_shift_channels,
        )?)
    }

    /// Resolve the window against `len` channels.
    fn window(&self, len: usize) -> Result<Range<usize>, ConvolutionError> {
        Ok(self.settings.window()?.resolve(len)?)
    }

    /// Corrected IRF checked against a curve of `len` channels.
    fn corrected_irf_for(&self, len: usize) -> Result<TimeCurve, ConvolutionError> {
        let corrected = self.corrected_irf()?;
        if corrected.len() != len {
            return Err(CurveError::AxisMismatch {
                irf: corrected.len(),
                target: len,
            }
            .into());
        }
        Ok(corrected)
    }

    /// Run the configured kernel over channels `[0, out.len())` of `target`.
    fn run_kernel(
        &self,
        components: &[(f64, f64)],
        irf: &[f64],
        target: &TimeCurve,
        out: &mut [f64],
    ) -> Strategy {
        let method = self.settings.convolution_method;
        let period = method
            .is_periodic()
            .then_some(self.settings.excitation_period);
        if method.follows_time_axis() {
            kernel::convolve_time(components, irf, target.x(), period, out);
            return Strategy::Scalar;
        }
        let dt = target.uniform_dt().unwrap_or(0.0);
        if method.is_vectorized() {
            simd::convolve_uniform_vectorized(components, irf, dt, period, out)
        } else {
            kernel::convolve_uniform(components, irf, dt, period, out);
            Strategy::Scalar
        }
    }

    /// Add the model into `target.y` over the configured window.
    ///
    /// All inputs are validated before anything is written, so on error the
    /// target is unchanged.
    pub fn evaluate(&self, target: &mut TimeCurve) -> Result<(), ConvolutionError> {
        target.validate()?;
        self.settings.validate()?;
        let range = self.window(target.len())?;

        let components: Vec<(f64, f64)> = {
            let spectrum = self.spectrum.read();
            spectrum.validate()?;
            spectrum.components().collect()
        };
        let corrected = self.corrected_irf_for(target.len())?;

        let mut model = vec![0.0; range.end];
        let strategy = self.run_kernel(&components, corrected.y(), target, &mut model);

        for (dst, v) in target.y_mut()[range.clone()].iter_mut().zip(&model[range.clone()]) {
            *dst += v;
        }

        debug!(
            method = %self.settings.convolution_method,
            %strategy,
            components = components.len(),
            start = range.start,
            stop = range.end,
            "convolution: evaluated"
        );
        Ok(())
    }

    /// Method-of-moments lifetime of measured `data`.
    ///
    /// The mean channel of `data` minus the mean channel of the corrected
    /// IRF, both over the configured window, times the nominal channel width
    /// `(x[N-1] - x[0]) / N` of `data`'s axis. On an all-ones curve over the
    /// 32-channel `[0, 20]` axis with the IRF peaked at channel 3 this is
    /// 7.8125.
    pub fn mean_lifetime(&self, data: &TimeCurve) -> Result<f64, ConvolutionError> {
        data.validate()?;
        let width = channel_width(data.x()).ok_or(CurveError::Empty)?;
        self.moment_lifetime(data, width)
    }

    /// [`mean_lifetime`](Self::mean_lifetime) with an explicit channel width,
    /// e.g. the true spacing `x[1] - x[0]` of a uniform axis.
    pub fn moment_lifetime(
        &self,
        data: &TimeCurve,
        channel_width: f64,
    ) -> Result<f64, ConvolutionError> {
        data.validate()?;
        let range = self.window(data.len())?;
        let corrected = self.corrected_irf_for(data.len())?;
        let delay = channel_delay(
            range.start,
            &data.y()[range.clone()],
            &corrected.y()[range],
        )
        .ok_or(ConvolutionError::ZeroIntensity)?;
        let tau = delay * channel_width;
        debug!(tau, delay, channel_width, "convolution: moment lifetime");
        Ok(tau)
    }

    /// Intensity-weighted mean arrival time of the model over the window.
    ///
    /// The model is evaluated onto a zeroed copy of `curve`'s axis; the
    /// values of `curve` are neither read nor modified.
    pub fn mean_arrival_time(&self, curve: &TimeCurve) -> Result<f64, ConvolutionError> {
        let mut work = curve.zeroed_like();
        self.evaluate(&mut work)?;
        let range = self.window(work.len())?;
        let t = first_moment(&work.x()[range.clone()], &work.y()[range])
            .ok_or(ConvolutionError::ZeroIntensity)?;
        debug!(t, "convolution: mean arrival time");
        Ok(t)
    }
}

impl DecayModel for DecayConvolution {
    fn evaluate(&self, target: &mut TimeCurve) -> Result<(), ConvolutionError> {
        DecayConvolution::evaluate(self, target)
    }
}
