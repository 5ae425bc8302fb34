use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};

use exg_spectral::{
    log_freqs, psd_multitaper, psd_welch, tfr_from_config, Average, Baseline, BaselineMode,
    EpochedSeries, MorletConfig, MultitaperConfig, NCycles, WelchConfig, WindowKind,
};

#[derive(Parser)]
#[command(name = "spectral", about = "PSD and Morlet time-frequency analysis of epoched EEG")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Welch,
    Multitaper,
}

#[derive(Subcommand)]
enum Command {
    /// Power spectral density → safetensors (`freqs`, `psd`)
    Psd {
        /// epochs.safetensors (`epochs` [E, C, T], `sfreq`, optional `tmin`, `ch_names`)
        #[arg(long)]
        input: PathBuf,

        /// Output path
        #[arg(long)]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = Method::Welch)]
        method: Method,

        /// Lowest frequency kept, Hz
        #[arg(long, default_value_t = 0.0)]
        fmin: f64,

        /// Highest frequency kept, Hz (default: Nyquist)
        #[arg(long)]
        fmax: Option<f64>,

        /// Welch segment length in samples (default: min(256, T))
        #[arg(long)]
        n_per_seg: Option<usize>,

        /// Welch FFT length (default: n_per_seg)
        #[arg(long)]
        n_fft: Option<usize>,

        /// Welch segment overlap fraction in [0, 1)
        #[arg(long, default_value_t = 0.0)]
        overlap: f64,

        /// hann | hamming | boxcar
        #[arg(long, default_value = "hann")]
        window: WindowKind,

        /// mean | median | none
        #[arg(long, default_value = "mean")]
        average: Average,

        /// Multitaper bandwidth in Hz (default: N·W = 4)
        #[arg(long)]
        bandwidth: Option<f64>,

        /// Multitaper adaptive weights
        #[arg(long)]
        adaptive: bool,
    },

    /// Morlet power + ITC → safetensors (`freqs`, `times`, `power`, `itc`)
    Tfr {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value_t = 6.0)]
        fmin: f64,

        #[arg(long, default_value_t = 35.0)]
        fmax: f64,

        /// Number of log-spaced frequencies
        #[arg(long, default_value_t = 8)]
        n_freqs: usize,

        /// n_cycles = freq / divisor
        #[arg(long, default_value_t = 2.0)]
        cycles_divisor: f64,

        #[arg(long, default_value_t = 1)]
        decim: usize,

        /// Skip inter-trial coherence
        #[arg(long)]
        no_itc: bool,

        /// Baseline start in seconds (default: first sample)
        #[arg(long, allow_hyphen_values = true)]
        baseline_start: Option<f64>,

        /// Baseline end in seconds (default: last sample)
        #[arg(long, allow_hyphen_values = true)]
        baseline_end: Option<f64>,

        /// mean | ratio | logratio | percent | zscore | zlogratio;
        /// no baseline correction when omitted
        #[arg(long)]
        mode: Option<BaselineMode>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Psd {
            input, output, method, fmin, fmax, n_per_seg, n_fft, overlap, window, average,
            bandwidth, adaptive,
        } => {
            let epochs = load(&input)?;
            let fmax = fmax.unwrap_or(f64::INFINITY);
            let psd = match method {
                Method::Welch => psd_welch(&epochs, &WelchConfig {
                    fmin, fmax, n_per_seg, n_fft, overlap, window, average,
                })?,
                Method::Multitaper => psd_multitaper(&epochs, &MultitaperConfig {
                    fmin, fmax, bandwidth, adaptive,
                    ..MultitaperConfig::default()
                })?,
            };
            info!("PSD {:?}, {} bins from {:.2} Hz", psd.shape(), psd.freqs.len(),
                psd.freqs.first().copied().unwrap_or(f64::NAN));
            psd.save(&output).with_context(|| format!("writing {}", output.display()))?;
            info!("Written → {}", output.display());
        }

        Command::Tfr {
            input, output, fmin, fmax, n_freqs, cycles_divisor, decim, no_itc,
            baseline_start, baseline_end, mode,
        } => {
            let epochs = load(&input)?;
            let cfg = MorletConfig {
                freqs: log_freqs(fmin, fmax, n_freqs),
                n_cycles: NCycles::Proportional(cycles_divisor),
                decim,
                return_itc: !no_itc,
                ..MorletConfig::default()
            };
            let mut tfr = tfr_from_config(&epochs, &cfg)?;
            info!("TFR power {:?} over {} epochs", tfr.power.dim(), tfr.n_epochs);

            if let Some(mode) = mode {
                let baseline = Baseline::new(baseline_start, baseline_end);
                tfr = tfr.apply_baseline(&baseline, mode)?;
                info!("Baseline {mode:?} over {baseline_start:?} .. {baseline_end:?} s");
            }
            tfr.save(&output).with_context(|| format!("writing {}", output.display()))?;
            info!("Written → {}", output.display());
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<EpochedSeries> {
    let epochs = EpochedSeries::load(path)?;
    info!("Loaded {} epochs × {} ch × {} samples @ {} Hz",
        epochs.n_epochs(), epochs.n_channels(), epochs.n_times(), epochs.sfreq());
    Ok(epochs)
}
