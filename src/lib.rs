//! TestKit - helpers that plug into a test harness
//!
//! This crate provides independent utilities consumed through a narrow
//! lifecycle contract: scoped console-output capture with chronological
//! write records, randomized test-input generation, retry of flaky test
//! bodies, scoped logger configuration with save/restore, CI environment
//! gating, and an in-memory log-record sink for assertions.

pub mod capture;
pub mod console;
pub mod env_condition;
pub mod harness;
pub mod logger_state;
pub mod logging;
pub mod random;
pub mod record_handler;
pub mod retry;
pub mod utils;

pub use capture::{CaptureError, CapturedOutput, OutputCapture, OutputEntry};
pub use console::StreamTag;
pub use env_condition::{Enablement, forbid_ci, is_ci, require_ci};
pub use harness::{CaptureHooks, LoggerHooks, TestContext, TestHooks};
pub use logging::{ConsoleHandler, Handler, Level, LogRecord, Logger};
pub use random::{IntRange, RandomError, RandomSource, StringSpec, resolve};
pub use record_handler::TestLogHandler;
pub use retry::{Interrupter, RetryConfig, run_with_retry, run_with_retry_unwinding};
