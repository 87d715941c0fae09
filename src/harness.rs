//! The narrow seam a host test runner drives: a test identity value, a
//! lifecycle-hook trait, and hook adapters for the capture and logger
//! components.

use crate::capture::{CapturedOutput, OutputCapture};
use crate::logger_state;
use crate::logging::{Handler, Level, Logger};
use crate::utils::lock_ignore_poison;
use anyhow::Result;
use std::sync::{Arc, Mutex};

/// Identifies one test invocation. The suite doubles as the owner key for
/// saved logger state, so concurrently running suites stay isolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    pub suite: String,
    pub test: String,
}

impl TestContext {
    pub fn new(suite: impl Into<String>, test: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            test: test.into(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{}::{}", self.suite, self.test)
    }
}

/// Lifecycle callbacks invoked by the host runner around each test method.
pub trait TestHooks {
    fn before_test(&self, cx: &TestContext) -> Result<()>;

    fn after_test(&self, cx: &TestContext) -> Result<()>;

    fn on_test_failure(&self, _cx: &TestContext, _failure: &anyhow::Error) -> Result<()> {
        Ok(())
    }
}

/// Hook adapter that opens an output capture before the test and freezes
/// it afterwards.
#[derive(Default)]
pub struct CaptureHooks {
    active: Mutex<Option<OutputCapture>>,
    finished: Mutex<Option<CapturedOutput>>,
}

impl CaptureHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The frozen output of the last completed capture window, if any.
    pub fn captured(&self) -> Option<CapturedOutput> {
        lock_ignore_poison(&self.finished).clone()
    }

    /// Removes and returns the frozen output of the last completed window.
    pub fn take_captured(&self) -> Option<CapturedOutput> {
        lock_ignore_poison(&self.finished).take()
    }
}

impl TestHooks for CaptureHooks {
    fn before_test(&self, _cx: &TestContext) -> Result<()> {
        let capture = OutputCapture::begin()?;
        *lock_ignore_poison(&self.active) = Some(capture);
        Ok(())
    }

    /// Safe when `before_test` never ran: with no active capture this is a
    /// no-op.
    fn after_test(&self, _cx: &TestContext) -> Result<()> {
        if let Some(capture) = lock_ignore_poison(&self.active).take() {
            *lock_ignore_poison(&self.finished) = Some(capture.finish());
        }
        Ok(())
    }
}

/// Hook adapter that attaches a handler and level to a logger for the
/// test's duration, restoring the prior configuration afterwards.
pub struct LoggerHooks {
    logger: Arc<Logger>,
    level: Level,
    handler: Option<Arc<dyn Handler>>,
}

impl LoggerHooks {
    pub fn new(logger: Arc<Logger>, level: Level) -> Self {
        Self {
            logger,
            level,
            handler: None,
        }
    }

    /// Attach a pre-built handler instead of a fresh console handler.
    pub fn with_handler(logger: Arc<Logger>, level: Level, handler: Arc<dyn Handler>) -> Self {
        Self {
            logger,
            level,
            handler: Some(handler),
        }
    }
}

impl TestHooks for LoggerHooks {
    fn before_test(&self, cx: &TestContext) -> Result<()> {
        logger_state::attach(&cx.suite, &self.logger, self.level, self.handler.clone())?;
        Ok(())
    }

    fn after_test(&self, cx: &TestContext) -> Result<()> {
        logger_state::restore(&cx.suite, &self.logger);
        Ok(())
    }
}
