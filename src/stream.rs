//! Sample streaming
//!
//! Sends each sample as one byte and waits for the FPGA's one-byte answer
//! before sending the next. Requests are never pipelined: the reply to
//! element `i` is the `i`-th value pushed to the sink.

use crate::codec;
use crate::error::PipelineError;
use crate::link::ByteChannel;
use crate::output::ReplySink;
use serde::Deserialize;

/// Default advisory magnitude for samples
pub const DEFAULT_SAMPLE_THRESHOLD: u64 = 101;

/// How progress is shown during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Progress {
    /// A dot roughly every tenth of the input
    #[default]
    Dots,
    /// Every reply value
    Echo,
    Quiet,
}

impl Progress {
    fn report(&self, index: usize, total: usize, reply: i8) {
        match self {
            Progress::Dots => {
                let step = (total / 10).max(1);
                if index % step == 0 {
                    println!(".");
                }
            }
            Progress::Echo => println!("fpga[{}]: {}", index, reply),
            Progress::Quiet => {}
        }
    }
}

/// A value above the advisory threshold. Still transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdWarning {
    pub index: usize,
    pub value: i64,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Elements written to the device
    pub processed: usize,
    pub warnings: Vec<ThresholdWarning>,
}

impl RunReport {
    /// Record a threshold warning if `value` exceeds `threshold`
    pub(crate) fn check_threshold(&mut self, index: usize, value: i64, threshold: u64) {
        if codec::is_over_threshold(value, threshold) {
            log::warn!(
                "limit threshold warning: element {} = {} exceeds |{}|",
                index,
                value,
                threshold
            );
            self.warnings.push(ThresholdWarning { index, value });
        }
    }
}

/// Request/reply streamer for waveform samples
#[derive(Debug, Clone)]
pub struct SampleStreamer {
    threshold: u64,
    progress: Progress,
}

impl Default for SampleStreamer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_THRESHOLD)
    }
}

impl SampleStreamer {
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

    /// Stream `input` through `channel`, pushing each decoded reply to `sink`.
    ///
    /// Halts at the first encoding, transport, or output failure. Replies
    /// pushed before the failure are left in the sink, so on error the sink
    /// holds exactly `err.index()` values.
    pub fn run<C, S>(
        &self,
        input: &[i64],
        channel: &mut C,
        sink: &mut S,
    ) -> Result<RunReport, PipelineError>
    where
        C: ByteChannel + ?Sized,
        S: ReplySink + ?Sized,
    {
        let mut report = RunReport::default();

        for (index, &value) in input.iter().enumerate() {
            report.check_threshold(index, value, self.threshold);

            let byte = codec::encode(value)
                .map_err(|source| PipelineError::Encoding { index, source })?;

            channel
                .write_byte(byte)
                .map_err(|source| PipelineError::Transport { index, source })?;
            let reply = channel
                .read_byte()
                .map_err(|source| PipelineError::Transport { index, source })?;
            let decoded = codec::decode(reply);
            log::debug!("sample[{}]: {} -> {}", index, value, decoded);

            sink.push(decoded)
                .map_err(|source| PipelineError::Output { index, source })?;
            report.processed += 1;

            self.progress.report(index, input.len(), decoded);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::link::testing::ScriptedChannel;
    use crate::output::ReplyFile;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_echo_round_trip() {
        let mut channel = ScriptedChannel::echo();
        let mut out: Vec<i8> = Vec::new();

        let report = SampleStreamer::new(101)
            .run(&[5, -3, 0, 127], &mut channel, &mut out)
            .unwrap();

        assert_eq!(out, vec![5, -3, 0, 127]);
        assert_eq!(report.processed, 4);
        // |127| > 101 is flagged, but the byte still goes out
        assert_eq!(
            report.warnings,
            vec![ThresholdWarning {
                index: 3,
                value: 127
            }]
        );
        assert_eq!(channel.written, vec![0x05, 0xfd, 0x00, 0x7f]);
        assert_eq!(channel.reads, 4);
    }

    #[test]
    fn test_replies_decoded_in_order() {
        // Output depends only on what the device sends back
        let mut channel = ScriptedChannel::scripted(&[0x80, 0x01, 0xff]);
        let mut out: Vec<i8> = Vec::new();

        SampleStreamer::default()
            .run(&[1, 2, 3], &mut channel, &mut out)
            .unwrap();

        assert_eq!(out, vec![-128, 1, -1]);
    }

    #[test]
    fn test_out_of_range_halts_before_write() {
        let mut channel = ScriptedChannel::echo();
        let mut out: Vec<i8> = Vec::new();

        let err = SampleStreamer::new(101)
            .run(&[150], &mut channel, &mut out)
            .unwrap_err();

        assert!(matches!(err, PipelineError::Encoding { index: 0, .. }));
        assert!(out.is_empty());
        assert!(channel.written.is_empty());
    }

    #[test]
    fn test_out_of_range_keeps_partial_output() {
        let mut channel = ScriptedChannel::echo();
        let mut out: Vec<i8> = Vec::new();

        let err = SampleStreamer::new(101)
            .run(&[1, 2, -200, 4], &mut channel, &mut out)
            .unwrap_err();

        assert_eq!(err.index(), 2);
        assert_eq!(out, vec![1, 2]);
        assert_eq!(channel.written.len(), 2);
    }

    #[test]
    fn test_threshold_warning_still_transmits() {
        let mut channel = ScriptedChannel::scripted(&[42]);
        let mut out: Vec<i8> = Vec::new();

        let report = SampleStreamer::new(101)
            .run(&[110], &mut channel, &mut out)
            .unwrap();

        assert_eq!(
            report.warnings,
            vec![ThresholdWarning {
                index: 0,
                value: 110
            }]
        );
        assert_eq!(channel.written, vec![110]);
        assert_eq!(out, vec![42]);
    }

    #[test]
    fn test_write_failure_truncates_output() {
        let mut channel = ScriptedChannel::echo().fail_write_at(3);
        let mut out: Vec<i8> = Vec::new();

        let err = SampleStreamer::default()
            .run(&[1, 2, 3, 4, 5], &mut channel, &mut out)
            .unwrap_err();

        match err {
            PipelineError::Transport { index, source } => {
                assert_eq!(index, 3);
                assert!(matches!(source, TransportError::Write(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_read_failure_truncates_output() {
        let mut channel = ScriptedChannel::echo().fail_read_at(1);
        let mut out: Vec<i8> = Vec::new();

        let err = SampleStreamer::default()
            .run(&[7, 8, 9], &mut channel, &mut out)
            .unwrap_err();

        assert!(matches!(err, PipelineError::Transport { index: 1, .. }));
        assert_eq!(out, vec![7]);
        // The request byte went out before the read failed
        assert_eq!(channel.written, vec![7, 8]);
    }

    #[test]
    fn test_reply_file_keeps_lines_before_read_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fpga_sampling.txt");
        let mut channel = ScriptedChannel::echo().fail_read_at(2);
        let mut out = ReplyFile::create(&path).unwrap();

        let err = SampleStreamer::default()
            .run(&[1, -2, 3, 4], &mut channel, &mut out)
            .unwrap_err();
        out.finish().unwrap();

        assert_eq!(err.index(), 2);
        assert_eq!(out.lines(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1\n-2\n");
    }

    #[test]
    fn test_progress_modes_do_not_change_data() {
        let input: Vec<i64> = (-20..20).collect();
        for progress in [Progress::Dots, Progress::Echo, Progress::Quiet] {
            let mut channel = ScriptedChannel::echo();
            let mut out: Vec<i8> = Vec::new();
            SampleStreamer::default()
                .with_progress(progress)
                .run(&input, &mut channel, &mut out)
                .unwrap();
            assert_eq!(out.iter().map(|&v| i64::from(v)).collect::<Vec<_>>(), input);
        }
    }
}
