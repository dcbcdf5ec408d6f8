//! FPGA Link
//!
//! Feeds signed 8-bit waveform samples and FIR coefficients to an FPGA over
//! its USB-UART bridge (115200 baud, 8N1).
//!
//! # Usage
//!
//! ```bash
//! # Stream a waveform and record the filtered output
//! fpga-link stream -i waveform_test/waveform_sample.txt -o waveform_test/fpga_sampling.txt
//!
//! # Load filter taps from a file, or inline
//! fpga-link coefficients load -i coeffs.txt
//! fpga-link coefficients load -c 3 -5 12 40 12 -5 3
//!
//! # Print taps as VHDL assignments for the FPGA design
//! fpga-link coefficients vhdl -i coeffs.txt
//!
//! # List serial ports
//! fpga-link ports
//! ```

mod codec;
mod coefficients;
mod config;
mod error;
mod input;
mod link;
mod output;
mod stream;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use coefficients::{render_vhdl, CoefficientLoader, DEFAULT_VHDL_ARRAY};
use config::AppConfig;
use error::{OutputError, PipelineError};
use link::{LinkConfig, SerialLink};
use output::ReplyFile;
use stream::{Progress, RunReport, SampleStreamer};

/// FPGA Link
///
/// Stream samples and filter coefficients to an FPGA over a serial link
#[derive(Parser)]
#[command(name = "fpga-link")]
#[command(version = "0.1.0")]
#[command(about = "Stream samples and FIR coefficients to an FPGA over a serial link")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./fpga-link.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send samples and record the FPGA's reply to each
    Stream {
        /// Serial device used to talk to the FPGA
        #[arg(long)]
        usb: Option<String>,

        /// File with the samples to send
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// File receiving the FPGA output, one value per line
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Magnitude above which a sample triggers a warning
        #[arg(long)]
        threshold: Option<u64>,

        /// Give up on a reply after this many milliseconds (0 waits forever)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print every reply value
        #[arg(long, conflicts_with = "quiet")]
        echo: bool,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// FIR coefficient operations
    #[command(subcommand)]
    Coefficients(CoefficientCommands),

    /// List available serial ports
    Ports,
}

#[derive(Subcommand)]
enum CoefficientCommands {
    /// Write coefficients to the FPGA
    Load {
        /// Serial device used to talk to the FPGA
        #[arg(long)]
        usb: Option<String>,

        /// File with the coefficients
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Coefficients given directly (overrides the file)
        #[arg(short, long, num_args = 1.., allow_negative_numbers = true)]
        coeff: Vec<i64>,

        /// Magnitude above which a coefficient triggers a warning
        #[arg(long)]
        threshold: Option<u64>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print coefficients as VHDL array assignments
    Vhdl {
        /// File with the coefficients
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Coefficients given directly (overrides the file)
        #[arg(short, long, num_args = 1.., allow_negative_numbers = true)]
        coeff: Vec<i64>,

        /// Name of the coefficient array in the design
        #[arg(long, default_value = DEFAULT_VHDL_ARRAY)]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Stream {
            usb,
            input,
            output,
            threshold,
            timeout_ms,
            echo,
            quiet,
        } => {
            let mut config = AppConfig::load(cli.config.as_deref())?;
            if let Some(usb) = usb {
                config.link.device = usb;
            }
            if let Some(ms) = timeout_ms {
                config.link.timeout_ms = ms;
            }
            let progress = if quiet {
                Progress::Quiet
            } else if echo {
                Progress::Echo
            } else {
                config.stream.progress
            };

            handle_stream(
                config.link.to_link_config(),
                input.unwrap_or(config.stream.input),
                output.unwrap_or(config.stream.output),
                SampleStreamer::new(threshold.unwrap_or(config.stream.threshold))
                    .with_progress(progress),
            )
        }
        Commands::Coefficients(cmd) => {
            let config = AppConfig::load(cli.config.as_deref())?;
            handle_coefficients(cmd, config)
        }
        Commands::Ports => link::port::print_ports(),
    }
}

fn handle_stream(
    link_config: LinkConfig,
    input_path: PathBuf,
    output_path: PathBuf,
    streamer: SampleStreamer,
) -> Result<()> {
    println!(
        "{} Using interface {}",
        "[*]".cyan().bold(),
        link_config.device.white().bold()
    );
    println!(
        " === {}  -> FPGA ->  {} ===",
        input_path.display(),
        output_path.display()
    );

    let samples = input::read_values(&input_path)?;
    println!("{} {} values acquired", "[OK]".green().bold(), samples.len());

    let mut out = ReplyFile::create(&output_path)?;
    let mut link = SerialLink::open(link_config)?;

    let result = streamer.run(&samples, &mut link, &mut out);
    let flushed = out.finish();
    let report = settle_run(result, flushed, out.lines(), out.path())?;

    print_summary(&report, "samples sent");
    println!(
        "{} End of buffer: {} replies written to {}",
        "[OK]".green().bold(),
        out.lines(),
        out.path().display()
    );

    Ok(())
}

/// Combine the run outcome with the final flush of the reply file.
///
/// A flush failure is never dropped: alone it fails the run, and after a
/// halted run it is attached as context to the halting error.
fn settle_run(
    result: Result<RunReport, PipelineError>,
    flushed: Result<(), OutputError>,
    lines: usize,
    path: &Path,
) -> Result<RunReport> {
    match (result, flushed) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(flush_err)) => Err(flush_err.into()),
        (Err(err), Ok(())) => {
            eprintln!(
                "{} Halted at element {}; {} replies kept in {}",
                "[ERROR]".red().bold(),
                err.index(),
                lines,
                path.display()
            );
            Err(err.into())
        }
        (Err(err), Err(flush_err)) => {
            eprintln!(
                "{} Halted at element {}; {} may hold fewer than {} replies",
                "[ERROR]".red().bold(),
                err.index(),
                path.display(),
                lines
            );
            Err(anyhow::Error::new(err).context(format!("additionally, {}", flush_err)))
        }
    }
}

fn handle_coefficients(cmd: CoefficientCommands, config: AppConfig) -> Result<()> {
    match cmd {
        CoefficientCommands::Load {
            usb,
            input,
            coeff,
            threshold,
            quiet,
        } => {
            let mut link_config = config.link.to_link_config();
            if let Some(usb) = usb {
                link_config.device = usb;
            }
            println!(
                "{} Using interface {}",
                "[*]".cyan().bold(),
                link_config.device.white().bold()
            );

            let values = load_coefficients(coeff, input, &config)?;
            println!("{} Coefficients: {:?}", "[*]".cyan().bold(), values);

            let loader = CoefficientLoader::new(threshold.unwrap_or(config.coefficients.threshold))
                .with_progress(if quiet { Progress::Quiet } else { Progress::Dots });

            let mut link = SerialLink::open(link_config)?;
            println!("{} Writing {} coefficients", "[TX]".cyan().bold(), values.len());
            let report = loader.run(&values, &mut link)?;

            print_summary(&report, "coefficients written");
            println!("{} End of buffer", "[OK]".green().bold());
        }

        CoefficientCommands::Vhdl { input, coeff, name } => {
            let values = load_coefficients(coeff, input, &config)?;
            let vhdl = render_vhdl(&values, &name)?;

            println!("-- {} taps, 8-bit two's complement", values.len());
            println!("{}", vhdl);
        }
    }

    Ok(())
}

/// Inline values win over the file; the file comes from the flag or config.
fn load_coefficients(
    inline: Vec<i64>,
    file: Option<PathBuf>,
    config: &AppConfig,
) -> Result<Vec<i64>> {
    if !inline.is_empty() {
        return Ok(input::inline_values(&inline)?);
    }

    let path = file.unwrap_or_else(|| config.coefficients.input.clone());
    println!(
        "{} Reading coefficients from {}",
        "[*]".cyan().bold(),
        path.display()
    );
    Ok(input::read_values(&path)?)
}

fn print_summary(report: &RunReport, what: &str) {
    println!("{} {} {}", "[*]".cyan().bold(), report.processed, what);
    if !report.warnings.is_empty() {
        println!(
            "{} {} values above the warning threshold (first: element {} = {})",
            "[WARNING]".yellow().bold(),
            report.warnings.len(),
            report.warnings[0].index,
            report.warnings[0].value
        );
    }
}
