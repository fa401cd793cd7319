//! TCSPC decay model binary.
//!
//! Synthesizes a Gaussian instrument response, convolves it with a
//! multi-exponential lifetime spectrum and prints the model curve as JSON:
//! `{"x": [...], "y": [...], "mean_lifetime": ..., "mean_arrival_time": ...}`.
//! The mean lifetime is the method-of-moments estimate of the model curve
//! itself.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tcspc_core::curve::{linspace, TimeCurve};
use tcspc_core::settings::{ConvolutionMethod, ConvolutionSettings};
use tcspc_core::spectrum::LifetimeSpectrum;
use tcspc_decay::{avx_available, DecayConvolution};
use tracing::info;

/// Evaluate a TCSPC decay model on a synthetic Gaussian IRF.
#[derive(Parser, Debug)]
#[command(
    name = "tcspc-model",
    version,
    about = "Convolve a lifetime spectrum with a Gaussian IRF and print the curve as JSON"
)]
struct Args {
    /// Number of time channels
    #[arg(long, default_value_t = 256)]
    channels: usize,

    /// Time of the last channel; the first is at zero
    #[arg(long, default_value_t = 25.0)]
    span: f64,

    /// Centre of the Gaussian IRF
    #[arg(long, default_value_t = 2.0)]
    irf_center: f64,

    /// Standard deviation of the Gaussian IRF
    #[arg(long, default_value_t = 0.1)]
    irf_width: f64,

    /// Flat lifetime spectrum: amplitude,lifetime[,amplitude,lifetime...]
    #[arg(long, value_delimiter = ',', default_value = "1,4", allow_hyphen_values = true)]
    spectrum: Vec<f64>,

    /// Convolution method code (0..=5)
    #[arg(long, default_value_t = i64::from(ConvolutionMethod::default()))]
    method: i64,

    /// Excitation period for periodic methods
    #[arg(long, default_value_t = tcspc_core::constants::DEFAULT_EXCITATION_PERIOD)]
    period: f64,

    /// Fractional circular IRF shift in channels
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    shift: f64,

    /// Constant background subtracted from the IRF
    #[arg(long, default_value_t = 0.0)]
    background: f64,

    /// First channel of the window
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// One past the last channel of the window; -1 for the whole curve
    #[arg(long, default_value_t = tcspc_core::constants::OPEN_STOP, allow_hyphen_values = true)]
    stop: i64,

    /// JSON settings file; replaces method, period, shift, background and window flags
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

/// Everything needed to build and run one model evaluation.
#[derive(Debug, Clone, PartialEq)]
struct ModelConfig {
    axis: Vec<f64>,
    irf_center: f64,
    irf_width: f64,
    spectrum: LifetimeSpectrum,
    settings: ConvolutionSettings,
}

impl Args {
    /// Convert CLI args into a ModelConfig and the log format.
    fn into_config(self) -> Result<(ModelConfig, String)> {
        if self.channels < 2 {
            anyhow::bail!("need at least 2 channels, got {}", self.channels);
        }
        if !(self.irf_width.is_finite() && self.irf_width > 0.0) {
            anyhow::bail!("IRF width must be positive, got {}", self.irf_width);
        }

        let settings = match &self.settings {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading settings file {}", path.display()))?;
                ConvolutionSettings::from_json(&text)
                    .with_context(|| format!("parsing settings file {}", path.display()))?
            }
            None => {
                let settings = ConvolutionSettings {
                    convolution_method: ConvolutionMethod::try_from(self.method)?,
                    excitation_period: self.period,
                    irf_shift_channels: self.shift,
                    irf_background_counts: self.background,
                    start: self.start,
                    stop: self.stop,
                };
                settings.validate()?;
                settings
            }
        };
        settings.window()?;

        let spectrum = LifetimeSpectrum::from_flat(self.spectrum)?;
        spectrum.validate()?;

        let config = ModelConfig {
            axis: linspace(0.0, self.span, self.channels),
            irf_center: self.irf_center,
            irf_width: self.irf_width,
            spectrum,
            settings,
        };
        Ok((config, self.log_format))
    }
}

impl ModelConfig {
    /// Unit-area Gaussian IRF on the configured axis.
    fn irf(&self) -> Result<TimeCurve> {
        let norm = 1.0 / (self.irf_width * (2.0 * std::f64::consts::PI).sqrt());
        let y = self
            .axis
            .iter()
            .map(|&t| {
                let d = t - self.irf_center;
                norm * (-d * d / (2.0 * self.irf_width * self.irf_width)).exp()
            })
            .collect();
        Ok(TimeCurve::try_new(self.axis.clone(), y)?)
    }

    fn engine(&self) -> Result<DecayConvolution> {
        let engine = DecayConvolution::new(self.irf()?, self.spectrum.clone())
            .with_settings(self.settings.clone())?;
        Ok(engine)
    }
}

/// Evaluate the model and render the output document.
fn run(config: &ModelConfig) -> Result<serde_json::Value> {
    let engine = config.engine()?;
    let mut curve = TimeCurve::from_x(config.axis.clone());
    engine.evaluate(&mut curve).context("evaluating model")?;
    let mean_lifetime = engine.mean_lifetime(&curve).context("computing mean lifetime")?;
    let mean_arrival_time = engine
        .mean_arrival_time(&curve)
        .context("computing mean arrival time")?;
    info!(
        channels = curve.len(),
        method = %config.settings.convolution_method,
        mean_lifetime,
        mean_arrival_time,
        "model: evaluated"
    );
    let (x, y) = curve.into_parts();
    Ok(json!({
        "x": x,
        "y": y,
        "mean_lifetime": mean_lifetime,
        "mean_arrival_time": mean_arrival_time,
    }))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let pretty = args.pretty;
    let log_level = args.log_level.clone();
    let (config, log_format) = args.into_config()?;

    init_logging(&log_level, &log_format);
    info!("TCSPC model v{}", env!("CARGO_PKG_VERSION"));
    info!(avx = avx_available(), "model: cpu features");

    let doc = run(&config)?;
    let text = if pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    println!("{text}");
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so stdout carries only the JSON document. Pass
/// `format = "json"` for structured JSON logs; any other value gives text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
