//! FIR coefficient loading
//!
//! Coefficients are written one byte each, in order. The FPGA does not
//! answer, so nothing is read back.

use crate::codec;
use crate::error::{EncodingError, PipelineError};
use crate::link::ByteChannel;
use crate::stream::{Progress, RunReport};

/// Default advisory magnitude for coefficients
pub const DEFAULT_COEFF_THRESHOLD: u64 = 120;

/// Name of the coefficient array in the FPGA design
pub const DEFAULT_VHDL_ARRAY: &str = "ca";

/// Write-only loader for filter taps
#[derive(Debug, Clone)]
pub struct CoefficientLoader {
    threshold: u64,
    progress: Progress,
}

impl Default for CoefficientLoader {
    fn default() -> Self {
        Self::new(DEFAULT_COEFF_THRESHOLD)
    }
}

impl CoefficientLoader {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            progress: Progress::Quiet,
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Write every coefficient to `channel`, halting at the first failure.
    pub fn run<C>(&self, input: &[i64], channel: &mut C) -> Result<RunReport, PipelineError>
    where
        C: ByteChannel + ?Sized,
    {
        let mut report = RunReport::default();

        for (index, &value) in input.iter().enumerate() {
            report.check_threshold(index, value, self.threshold);

            let byte = codec::encode(value)
                .map_err(|source| PipelineError::Encoding { index, source })?;
            channel
                .write_byte(byte)
                .map_err(|source| PipelineError::Transport { index, source })?;
            log::debug!("coeff[{}]: {} ({:02x})", index, value, byte);

            report.processed += 1;
            match self.progress {
                Progress::Dots => println!("."),
                Progress::Echo => println!("coeff[{}]: {}", index, value),
                Progress::Quiet => {}
            }
        }

        Ok(report)
    }
}

/// Render coefficients as VHDL signal assignments, five per line:
///
/// ```text
/// ca(0) <= X"05";  ca(1) <= X"fd";  ...
/// ```
pub fn render_vhdl(values: &[i64], array_name: &str) -> Result<String, EncodingError> {
    let mut out = String::new();

    for (index, &value) in values.iter().enumerate() {
        out.push_str(&format!(
            "{}({}) <= X\"{}\";  ",
            array_name,
            index,
            codec::to_hex(value)?
        ));
        if index % 5 == 4 {
            out.truncate(out.trim_end().len());
            out.push('\n');
        }
    }

    Ok(out.trim_end().to_string())
}
