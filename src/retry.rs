//! Re-invocation of failing test bodies with an optional, interruptible
//! inter-attempt delay

use anyhow::{Result, anyhow};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Configuration for retrying a flaky test body.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first. Must be positive.
    pub max_attempts: u32,

    /// Pause between a failed attempt and the next one.
    pub delay: Duration,

    /// Name used when logging failed attempts.
    pub display_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
            display_name: String::new(),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }
}

/// Shared handle for interrupting a pending retry delay.
///
/// The flag stays set after an interruption so callers can observe it, the
/// same way an interrupted thread keeps its interrupted status.
#[derive(Clone, Default)]
pub struct Interrupter {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Interrupter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupts any pending delay and marks the handle interrupted.
    pub fn interrupt(&self) {
        let (flag, condvar) = &*self.state;
        let mut interrupted = flag.lock().unwrap_or_else(|e| e.into_inner());
        *interrupted = true;
        condvar.notify_all();
    }

    pub fn is_interrupted(&self) -> bool {
        let (flag, _) = &*self.state;
        *flag.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleeps for `duration` unless interrupted first. Returns true when the
    /// sleep ended because of an interruption.
    fn sleep(&self, duration: Duration) -> bool {
        let (flag, condvar) = &*self.state;
        let deadline = Instant::now() + duration;
        let mut interrupted = flag.lock().unwrap_or_else(|e| e.into_inner());

        while !*interrupted {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _timeout) = condvar
                .wait_timeout(interrupted, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            interrupted = guard;
        }

        true
    }
}

/// Runs `body` up to `config.max_attempts` times, pausing between attempts.
///
/// A success at any attempt is overall success. The final attempt's failure
/// is propagated unchanged; earlier failures are logged and recovered. An
/// interrupted delay stops retrying immediately: the interruption is
/// attached as context while the last observed test failure remains the
/// root cause.
pub fn run_with_retry<F>(
    config: &RetryConfig,
    interrupter: Option<&Interrupter>,
    mut body: F,
) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    if config.max_attempts == 0 {
        return Err(anyhow!("max_attempts must be positive, got 0"));
    }

    let name = if config.display_name.is_empty() {
        "test"
    } else {
        config.display_name.as_str()
    };

    let mut attempt = 1;
    loop {
        match body() {
            Ok(()) => {
                if attempt > 1 {
                    info!(
                        "Test \"{}\" succeeded on attempt {}/{}.",
                        name, attempt, config.max_attempts
                    );
                }
                return Ok(());
            }
            Err(failure) => {
                if attempt == config.max_attempts {
                    return Err(failure);
                }

                warn!(
                    "Test \"{}\" failed attempt {}/{}: {:#}. Retrying in {}ms.",
                    name,
                    attempt,
                    config.max_attempts,
                    failure,
                    config.delay.as_millis()
                );

                if !config.delay.is_zero() {
                    let interrupted = match interrupter {
                        Some(handle) => handle.sleep(config.delay),
                        None => {
                            thread::sleep(config.delay);
                            false
                        }
                    };
                    if interrupted {
                        warn!(
                            "Retry delay for \"{}\" was interrupted; giving up after attempt {}/{}.",
                            name, attempt, config.max_attempts
                        );
                        return Err(failure.context(format!(
                            "retry delay interrupted after attempt {}/{}",
                            attempt, config.max_attempts
                        )));
                    }
                }

                attempt += 1;
            }
        }
    }
}

/// Like [`run_with_retry`], but for a body that signals failure by
/// panicking. Each panic is unwound and converted into that attempt's
/// failure, preserving the payload text.
pub fn run_with_retry_unwinding<F>(
    config: &RetryConfig,
    interrupter: Option<&Interrupter>,
    mut body: F,
) -> Result<()>
where
    F: FnMut(),
{
    run_with_retry(config, interrupter, || {
        panic::catch_unwind(AssertUnwindSafe(&mut body))
            .map_err(|payload| anyhow!("{}", panic_message(&payload)))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
