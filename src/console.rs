//! Process-wide console sink pair with swap-in capture support
//!
//! All console traffic of code under test (and of [`ConsoleHandler`]) flows
//! through the two sinks exposed here. With no capture installed, each
//! dispatch passes through to the real stdout/stderr. While a capture is
//! installed, dispatches are recorded into its buffers instead and never
//! reach the real streams. One discrete print call maps to exactly one
//! dispatch.
//!
//! [`ConsoleHandler`]: crate::logging::ConsoleHandler

use crate::capture::CaptureBuffers;
use crate::utils::lock_ignore_poison;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};

/// Identifies which of the two standard streams a write went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamTag {
    Stdout,
    Stderr,
}

impl StreamTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamTag::Stdout => "stdout",
            StreamTag::Stderr => "stderr",
        }
    }
}

static ACTIVE_CAPTURE: OnceLock<Mutex<Option<Arc<Mutex<CaptureBuffers>>>>> = OnceLock::new();

fn active_capture() -> &'static Mutex<Option<Arc<Mutex<CaptureBuffers>>>> {
    ACTIVE_CAPTURE.get_or_init(|| Mutex::new(None))
}

/// Installs capture buffers as the destination for both sinks.
///
/// Returns `false` when another capture is already installed; the caller
/// treats that as a refused (nested) acquisition.
pub(crate) fn install_capture(buffers: Arc<Mutex<CaptureBuffers>>) -> bool {
    let mut slot = lock_ignore_poison(active_capture());
    if slot.is_some() {
        return false;
    }
    *slot = Some(buffers);
    true
}

/// Removes the given capture buffers, restoring pass-through to the real
/// streams. Removing buffers that are no longer installed is a no-op, so
/// restoration is idempotent.
pub(crate) fn uninstall_capture(buffers: &Arc<Mutex<CaptureBuffers>>) {
    let mut slot = lock_ignore_poison(active_capture());
    if let Some(active) = slot.as_ref() {
        if Arc::ptr_eq(active, buffers) {
            *slot = None;
        }
    }
}

fn dispatch(tag: StreamTag, text: &str) {
    // The slot lock is held across the write so that entries from different
    // threads keep their cross-stream call order.
    let slot = lock_ignore_poison(active_capture());
    match slot.as_ref() {
        Some(buffers) => lock_ignore_poison(buffers).record(tag, text),
        None => match tag {
            StreamTag::Stdout => {
                let mut handle = io::stdout().lock();
                let _ = handle.write_all(text.as_bytes());
                let _ = handle.flush();
            }
            StreamTag::Stderr => {
                let mut handle = io::stderr().lock();
                let _ = handle.write_all(text.as_bytes());
            }
        },
    }
}

/// A lightweight handle for one of the two console sinks.
#[derive(Debug, Clone, Copy)]
pub struct Stream {
    tag: StreamTag,
}

/// The standard-output sink.
pub fn out() -> Stream {
    Stream {
        tag: StreamTag::Stdout,
    }
}

/// The standard-error sink.
pub fn err() -> Stream {
    Stream {
        tag: StreamTag::Stderr,
    }
}

impl Stream {
    pub fn tag(&self) -> StreamTag {
        self.tag
    }

    /// Writes the textual form of a value. One call, one dispatch.
    pub fn print<T: fmt::Display>(&self, value: T) {
        dispatch(self.tag, &value.to_string());
    }

    /// Writes the textual form of a value followed by a newline, as a
    /// single dispatch.
    pub fn println<T: fmt::Display>(&self, value: T) {
        dispatch(self.tag, &format!("{value}\n"));
    }

    /// Writes pre-built format arguments as a single dispatch.
    pub fn print_fmt(&self, args: fmt::Arguments<'_>) {
        dispatch(self.tag, &args.to_string());
    }
}

impl Write for Stream {
    /// Each `write` call is recorded as one dispatch; bytes are decoded
    /// lossily for the chronological record.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        dispatch(self.tag, &String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
