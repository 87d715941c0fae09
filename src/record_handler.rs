//! In-memory log-record sink for assertions

use crate::logging::{Handler, Level, LogRecord};
use crate::utils::lock_ignore_poison;
use regex::Regex;
use std::any::Any;
use std::sync::Mutex;

#[derive(Default)]
struct BufferState {
    records: Vec<LogRecord>,
    messages: Vec<Option<String>>,
    closed: bool,
}

/// A [`Handler`] that accumulates accepted records and their extracted
/// messages in two parallel ordered buffers.
///
/// Queries return defensive snapshots, never live references, and tolerate
/// absent messages throughout (absent messages never match but are not
/// filtered out of the record list). Closing clears all buffered state and
/// silently drops subsequent publishes; clear and close are idempotent.
pub struct TestLogHandler {
    level: Mutex<Level>,
    state: Mutex<BufferState>,
}

impl TestLogHandler {
    /// A handler accepting every level.
    pub fn new() -> Self {
        Self::with_level(Level::Trace)
    }

    /// A handler accepting only records at or above `level`.
    pub fn with_level(level: Level) -> Self {
        Self {
            level: Mutex::new(level),
            state: Mutex::new(BufferState::default()),
        }
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.state).records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the buffered records.
    pub fn records(&self) -> Vec<LogRecord> {
        lock_ignore_poison(&self.state).records.clone()
    }

    /// Snapshot of the extracted messages, parallel to [`records`](Self::records).
    pub fn messages(&self) -> Vec<Option<String>> {
        lock_ignore_poison(&self.state).messages.clone()
    }

    pub fn last_record(&self) -> Option<LogRecord> {
        lock_ignore_poison(&self.state).records.last().cloned()
    }

    /// First record whose message contains `needle`. An empty needle or no
    /// match yields `None`, never an error.
    pub fn first_containing(&self, needle: &str) -> Option<LogRecord> {
        if needle.is_empty() {
            return None;
        }
        lock_ignore_poison(&self.state)
            .records
            .iter()
            .find(|record| message_contains(record, needle))
            .cloned()
    }

    /// Last record whose message contains `needle`, with the same
    /// not-found semantics as [`first_containing`](Self::first_containing).
    pub fn last_containing(&self, needle: &str) -> Option<LogRecord> {
        if needle.is_empty() {
            return None;
        }
        lock_ignore_poison(&self.state)
            .records
            .iter()
            .rfind(|record| message_contains(record, needle))
            .cloned()
    }

    /// Exact full-message match.
    pub fn contains_message(&self, message: &str) -> bool {
        lock_ignore_poison(&self.state)
            .records
            .iter()
            .any(|record| record.message.as_deref() == Some(message))
    }

    /// Number of records whose message contains `needle`; zero for an
    /// empty needle.
    pub fn count_containing(&self, needle: &str) -> usize {
        if needle.is_empty() {
            return 0;
        }
        lock_ignore_poison(&self.state)
            .records
            .iter()
            .filter(|record| message_contains(record, needle))
            .count()
    }

    /// Records at or above `level`.
    pub fn records_at_or_above(&self, level: Level) -> Vec<LogRecord> {
        lock_ignore_poison(&self.state)
            .records
            .iter()
            .filter(|record| level.allows(record.level))
            .cloned()
            .collect()
    }

    /// True when any message matches the pattern.
    pub fn any_matches(&self, pattern: &Regex) -> bool {
        lock_ignore_poison(&self.state)
            .records
            .iter()
            .any(|record| {
                record
                    .message
                    .as_deref()
                    .is_some_and(|message| pattern.is_match(message))
            })
    }

    /// Empties both buffers. Idempotent.
    pub fn clear(&self) {
        let mut state = lock_ignore_poison(&self.state);
        state.records.clear();
        state.messages.clear();
    }
}

impl Default for TestLogHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn message_contains(record: &LogRecord, needle: &str) -> bool {
    record
        .message
        .as_deref()
        .is_some_and(|message| message.contains(needle))
}

impl Handler for TestLogHandler {
    fn publish(&self, record: &LogRecord) {
        if !self.level().allows(record.level) {
            return;
        }
        let mut state = lock_ignore_poison(&self.state);
        if state.closed {
            return;
        }
        state.records.push(record.clone());
        state.messages.push(record.message.clone());
    }

    /// Clears all buffered state and drops subsequent publishes.
    /// Re-closing is not an error.
    fn close(&self) {
        let mut state = lock_ignore_poison(&self.state);
        state.records.clear();
        state.messages.clear();
        state.closed = true;
    }

    fn level(&self) -> Level {
        *lock_ignore_poison(&self.level)
    }

    fn set_level(&self, level: Level) {
        *lock_ignore_poison(&self.level) = level;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
