//! Score sources: where samples come from
//!
//! The perception provider is external; this seam lets hosts feed the loop
//! from a live provider, a recorded trace, or a fixed script.

use serde::Deserialize;
use std::collections::VecDeque;
use std::io::BufRead;
use std::time::Duration;

use crate::core::sample_parser::SampleParser;
use crate::error::ShutterError;
use crate::types::ScoreSample;

/// A sample with its optional offset from the start of the recording
#[derive(Debug, Clone, PartialEq)]
pub struct TimedSample {
    pub sample: ScoreSample,
    pub offset: Option<Duration>,
}

impl TimedSample {
    pub fn untimed(sample: ScoreSample) -> Self {
        Self {
            sample,
            offset: None,
        }
    }

    pub fn at_ms(sample: ScoreSample, ms: u64) -> Self {
        Self {
            sample,
            offset: Some(Duration::from_millis(ms)),
        }
    }
}

/// Producer of per-frame samples
pub trait ScoreSource {
    /// Next frame; `None` when the source is exhausted
    fn next_sample(&mut self) -> Option<Result<TimedSample, ShutterError>>;
}

/// In-memory list of samples
#[derive(Debug, Default)]
pub struct ScriptedSource {
    frames: VecDeque<TimedSample>,
}

impl ScriptedSource {
    pub fn new(samples: impl IntoIterator<Item = ScoreSample>) -> Self {
        Self {
            frames: samples.into_iter().map(TimedSample::untimed).collect(),
        }
    }

    /// Same sample repeated `count` times
    pub fn repeat(sample: ScoreSample, count: usize) -> Self {
        Self::new(std::iter::repeat(sample).take(count))
    }

    pub fn timed(frames: impl IntoIterator<Item = TimedSample>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl ScoreSource for ScriptedSource {
    fn next_sample(&mut self) -> Option<Result<TimedSample, ShutterError>> {
        self.frames.pop_front().map(Ok)
    }
}

/// JSON trace line: a sample plus optional `t_ms`
#[derive(Debug, Deserialize)]
struct TraceLine {
    #[serde(default)]
    t_ms: Option<u64>,
    #[serde(flatten)]
    sample: ScoreSample,
}

/// Recorded trace, one frame per line (JSON or text line protocol)
pub struct TraceSource<R: BufRead> {
    reader: R,
    parser: SampleParser,
    line_no: usize,
}

impl<R: BufRead> TraceSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: SampleParser::new(),
            line_no: 0,
        }
    }

    /// Lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    fn parse_line(&self, line: &str) -> Result<TimedSample, ShutterError> {
        if line.starts_with('{') {
            let parsed: TraceLine =
                serde_json::from_str(line).map_err(|e| ShutterError::from(e).at_line(self.line_no))?;
            Ok(TimedSample {
                sample: parsed.sample,
                offset: parsed.t_ms.map(Duration::from_millis),
            })
        } else {
            self.parser
                .parse(line)
                .map(TimedSample::untimed)
                .map_err(|e| e.at_line(self.line_no))
        }
    }
}

impl<R: BufRead> ScoreSource for TraceSource<R> {
    fn next_sample(&mut self) -> Option<Result<TimedSample, ShutterError>> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(self.parse_line(line));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
