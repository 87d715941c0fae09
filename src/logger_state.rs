//! Save and restore of per-logger configuration around a test
//!
//! State is keyed by (owner, logger identity) in a process-wide map so
//! that concurrently running test suites touching different loggers never
//! clobber each other's snapshots. Sharing one logger across concurrently
//! running owners is the caller's responsibility.

use crate::logging::{ConsoleHandler, Handler, Level, Logger};
use crate::record_handler::TestLogHandler;
use crate::utils::lock_ignore_poison;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LoggerStateError {
    #[error("logger state for owner \"{owner}\" and logger \"{logger}\" is already saved; restore it before attaching again")]
    AlreadyAttached { owner: String, logger: String },
}

/// A named logger keys by name; an anonymous one by object identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LoggerKey {
    Named(String),
    Identity(usize),
}

fn key_for(logger: &Arc<Logger>) -> LoggerKey {
    match logger.name() {
        Some(name) => LoggerKey::Named(name.to_string()),
        None => LoggerKey::Identity(Arc::as_ptr(logger) as usize),
    }
}

fn logger_label(logger: &Arc<Logger>) -> String {
    match logger.name() {
        Some("") => "<root>".to_string(),
        Some(name) => name.to_string(),
        None => "<anonymous>".to_string(),
    }
}

/// Snapshot of a logger's configuration, held between attach and restore.
struct SavedState {
    level: Level,
    use_parent_handlers: bool,
    handlers: Vec<Arc<dyn Handler>>,
    added: Arc<dyn Handler>,
    /// Prior level of a caller-supplied handler, restored on the handler
    /// itself during cleanup.
    reused_prior_level: Option<Level>,
    /// Whether attach created the handler; created handlers are closed on
    /// restore to release their resources.
    created_by_attach: bool,
}

static SAVED: OnceLock<Mutex<HashMap<(String, LoggerKey), SavedState>>> = OnceLock::new();

fn saved_map() -> &'static Mutex<HashMap<(String, LoggerKey), SavedState>> {
    SAVED.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Captures the logger's current level, parent-handler flag, and handler
/// list, then attaches the supplied handler (or a fresh [`ConsoleHandler`]),
/// sets `level` on both logger and handler, and disables parent
/// propagation to prevent duplicate output through ancestor loggers.
pub fn attach(
    owner: &str,
    logger: &Arc<Logger>,
    level: Level,
    handler: Option<Arc<dyn Handler>>,
) -> Result<(), LoggerStateError> {
    let key = (owner.to_string(), key_for(logger));

    let (added, reused_prior_level, created_by_attach) = match handler {
        Some(existing) => {
            let prior = existing.level();
            (existing, Some(prior), false)
        }
        None => (Arc::new(ConsoleHandler::new()) as Arc<dyn Handler>, None, true),
    };

    {
        let mut saved = lock_ignore_poison(saved_map());
        if saved.contains_key(&key) {
            return Err(LoggerStateError::AlreadyAttached {
                owner: owner.to_string(),
                logger: logger_label(logger),
            });
        }
        saved.insert(
            key,
            SavedState {
                level: logger.level(),
                use_parent_handlers: logger.use_parent_handlers(),
                handlers: logger.handlers(),
                added: added.clone(),
                reused_prior_level,
                created_by_attach,
            },
        );
    }

    logger.add_handler(added.clone());
    added.set_level(level);
    logger.set_level(level);
    logger.set_use_parent_handlers(false);

    debug!(
        "attached handler to logger \"{}\" at {} for owner \"{}\"",
        logger_label(logger),
        level,
        owner
    );
    Ok(())
}

/// Restores the configuration saved by [`attach`] for this (owner, logger)
/// pair. Primary restoration (handler list, level, parent flag) always
/// runs before secondary cleanup (restoring a reused handler's level,
/// closing a created handler, clearing a [`TestLogHandler`]'s records).
/// Restoring with no saved state is a no-op.
pub fn restore(owner: &str, logger: &Arc<Logger>) {
    let key = (owner.to_string(), key_for(logger));
    let Some(state) = lock_ignore_poison(saved_map()).remove(&key) else {
        return;
    };

    logger.remove_handler(&state.added);
    logger.set_level(state.level);
    logger.set_use_parent_handlers(state.use_parent_handlers);
    logger.set_handlers(state.handlers);

    if let Some(prior) = state.reused_prior_level {
        state.added.set_level(prior);
    }
    if state.created_by_attach {
        state.added.close();
    }
    if let Some(test_handler) = state.added.as_any().downcast_ref::<TestLogHandler>() {
        test_handler.clear();
    }

    debug!(
        "restored logger \"{}\" for owner \"{}\"",
        logger_label(logger),
        owner
    );
}
