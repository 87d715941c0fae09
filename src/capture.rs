//! Scoped capture of the console sinks with chronological write records

use crate::console::{self, StreamTag};
use crate::utils::{lock_ignore_poison, split_lines};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("an output capture is already active; nested or overlapping capture is not supported")]
    AlreadyActive,
}

/// One timestamped, stream-tagged record of a single write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEntry {
    pub tag: StreamTag,
    pub content: String,
    /// Time of the write, relative to the start of the capture.
    pub elapsed: Duration,
}

/// Accumulating buffers shared between the console sinks and the guard.
pub(crate) struct CaptureBuffers {
    started: Instant,
    out: Vec<u8>,
    err: Vec<u8>,
    entries: Vec<OutputEntry>,
}

impl CaptureBuffers {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            out: Vec::new(),
            err: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, tag: StreamTag, text: &str) {
        match tag {
            StreamTag::Stdout => self.out.extend_from_slice(text.as_bytes()),
            StreamTag::Stderr => self.err.extend_from_slice(text.as_bytes()),
        }
        self.entries.push(OutputEntry {
            tag,
            content: text.to_string(),
            elapsed: self.started.elapsed(),
        });
    }
}

/// Everything written to the console sinks during one capture window.
///
/// All accessors are side-effect-free and never fail for captured content.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    out: Vec<u8>,
    err: Vec<u8>,
    entries: Vec<OutputEntry>,
}

impl CapturedOutput {
    /// Grouped stdout content.
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    /// Grouped stderr content.
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.err).into_owned()
    }

    /// Grouped combined content: all of stdout, then all of stderr.
    pub fn all(&self) -> String {
        let mut combined = self.stdout();
        combined.push_str(&self.stderr());
        combined
    }

    pub fn stdout_bytes(&self) -> &[u8] {
        &self.out
    }

    pub fn stderr_bytes(&self) -> &[u8] {
        &self.err
    }

    /// Entry contents concatenated in the exact order the writes occurred,
    /// regardless of stream.
    pub fn chronological_content(&self) -> String {
        self.entries.iter().map(|e| e.content.as_str()).collect()
    }

    /// The chronological entry list, one entry per write call.
    pub fn entries(&self) -> &[OutputEntry] {
        &self.entries
    }

    pub fn chronological_lines(&self) -> Vec<String> {
        split_lines(&self.chronological_content())
    }

    pub fn stdout_lines(&self) -> Vec<String> {
        split_lines(&self.stdout())
    }

    pub fn stderr_lines(&self) -> Vec<String> {
        split_lines(&self.stderr())
    }

    /// Lines of the grouped combined content.
    pub fn all_lines(&self) -> Vec<String> {
        split_lines(&self.all())
    }

    pub fn stdout_contains(&self, needle: &str) -> bool {
        self.stdout().contains(needle)
    }

    pub fn stderr_contains(&self, needle: &str) -> bool {
        self.stderr().contains(needle)
    }

    /// True when either stream contains the needle.
    pub fn contains(&self, needle: &str) -> bool {
        self.stdout_contains(needle) || self.stderr_contains(needle)
    }

    /// True only when both streams saw zero bytes written.
    pub fn is_empty(&self) -> bool {
        self.out.is_empty() && self.err.is_empty()
    }
}

/// Guard for one capture window over the console sinks.
///
/// While the guard is alive, every sink dispatch is buffered and recorded
/// chronologically instead of reaching the real streams. Dropping the guard
/// restores pass-through on every exit path, including panics.
pub struct OutputCapture {
    buffers: Arc<Mutex<CaptureBuffers>>,
    restored: bool,
}

impl OutputCapture {
    /// Begins capturing both console sinks.
    ///
    /// Fails with [`CaptureError::AlreadyActive`] when a capture is already
    /// installed; overlapping windows are not a supported contract.
    pub fn begin() -> Result<Self, CaptureError> {
        let buffers = Arc::new(Mutex::new(CaptureBuffers::new()));
        if !console::install_capture(buffers.clone()) {
            return Err(CaptureError::AlreadyActive);
        }
        debug!("console capture installed");
        Ok(Self {
            buffers,
            restored: false,
        })
    }

    /// Restores the sinks and returns the frozen snapshot of everything
    /// written during the window.
    pub fn finish(mut self) -> CapturedOutput {
        self.restore();
        let buffers = lock_ignore_poison(&self.buffers);
        CapturedOutput {
            out: buffers.out.clone(),
            err: buffers.err.clone(),
            entries: buffers.entries.clone(),
        }
    }

    fn restore(&mut self) {
        if !self.restored {
            console::uninstall_capture(&self.buffers);
            self.restored = true;
            debug!("console capture restored");
        }
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        self.restore();
    }
}
