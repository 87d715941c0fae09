//! The named-logger model managed during tests: hierarchical loggers with
//! per-logger levels, ordered handler lists, and parent propagation.
//!
//! Loggers are process-wide. [`Logger::named`] interns by dot-separated
//! name under a root logger named `""`; [`Logger::anonymous`] creates an
//! unregistered logger parented at the root, identified only by object
//! identity.

use crate::console;
use crate::utils::lock_ignore_poison;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::SystemTime;

/// Severity levels, ordered. `Off` disables: it is never published and a
/// handler or logger set to `Off` accepts nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    /// Standard threshold filtering: a record passes when its level is at
    /// or above this one and is not `Off`.
    pub fn allows(self, record: Level) -> bool {
        record != Level::Off && record >= self
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One published log event. The message may be absent; queries tolerate
/// that everywhere.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub logger: String,
    pub level: Level,
    pub message: Option<String>,
    pub at: SystemTime,
}

/// Destination for published records. Publish applies the handler's own
/// level filter; the logger's level was already applied upstream.
pub trait Handler: Send + Sync {
    fn publish(&self, record: &LogRecord);

    fn flush(&self) {}

    fn close(&self) {}

    fn level(&self) -> Level;

    fn set_level(&self, level: Level);

    /// Concrete-type access, used to recognize specific handler kinds
    /// during restoration.
    fn as_any(&self) -> &dyn Any;
}

/// Handler that formats records as single lines on the console stderr
/// sink, so an active output capture observes them.
pub struct ConsoleHandler {
    level: Mutex<Level>,
}

impl ConsoleHandler {
    pub fn new() -> Self {
        Self {
            level: Mutex::new(Level::Info),
        }
    }
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for ConsoleHandler {
    fn publish(&self, record: &LogRecord) {
        if !self.level().allows(record.level) {
            return;
        }
        console::err().println(format!(
            "{} [{}] {}",
            record.level,
            record.logger,
            record.message.as_deref().unwrap_or("<null>")
        ));
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

struct LoggerInner {
    level: Level,
    use_parent_handlers: bool,
    handlers: Vec<Arc<dyn Handler>>,
}

impl LoggerInner {
    fn new() -> Self {
        Self {
            level: Level::Info,
            use_parent_handlers: true,
            handlers: Vec::new(),
        }
    }
}

/// A named (or anonymous) logger with a level, an ordered handler list,
/// and a parent-propagation flag.
pub struct Logger {
    name: Option<String>,
    parent: Option<Arc<Logger>>,
    inner: Mutex<LoggerInner>,
}

static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Logger>>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, Arc<Logger>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

impl Logger {
    /// The root logger, named `""`.
    pub fn root() -> Arc<Logger> {
        Logger::named("")
    }

    /// Interns a logger by dot-separated name, creating it and its parent
    /// chain on first lookup.
    pub fn named(name: &str) -> Arc<Logger> {
        let mut loggers = lock_ignore_poison(registry());
        Self::named_locked(&mut loggers, name)
    }

    fn named_locked(loggers: &mut HashMap<String, Arc<Logger>>, name: &str) -> Arc<Logger> {
        if let Some(existing) = loggers.get(name) {
            return existing.clone();
        }

        let parent = if name.is_empty() {
            None
        } else {
            let parent_name = name.rsplit_once('.').map(|(head, _)| head).unwrap_or("");
            Some(Self::named_locked(loggers, parent_name))
        };

        let logger = Arc::new(Logger {
            name: Some(name.to_string()),
            parent,
            inner: Mutex::new(LoggerInner::new()),
        });
        loggers.insert(name.to_string(), logger.clone());
        logger
    }

    /// An unregistered logger identified only by object identity, parented
    /// at the root.
    pub fn anonymous() -> Arc<Logger> {
        Arc::new(Logger {
            name: None,
            parent: Some(Logger::root()),
            inner: Mutex::new(LoggerInner::new()),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn level(&self) -> Level {
        lock_ignore_poison(&self.inner).level
    }

    pub fn set_level(&self, level: Level) {
        lock_ignore_poison(&self.inner).level = level;
    }

    pub fn use_parent_handlers(&self) -> bool {
        lock_ignore_poison(&self.inner).use_parent_handlers
    }

    pub fn set_use_parent_handlers(&self, use_parent: bool) {
        lock_ignore_poison(&self.inner).use_parent_handlers = use_parent;
    }

    /// Snapshot of the ordered handler list.
    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        lock_ignore_poison(&self.inner).handlers.clone()
    }

    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        lock_ignore_poison(&self.inner).handlers.push(handler);
    }

    /// Removes a handler by identity. Unknown handlers are ignored.
    pub fn remove_handler(&self, handler: &Arc<dyn Handler>) {
        lock_ignore_poison(&self.inner)
            .handlers
            .retain(|existing| !Arc::ptr_eq(existing, handler));
    }

    /// Replaces the entire handler list.
    pub fn set_handlers(&self, handlers: Vec<Arc<dyn Handler>>) {
        lock_ignore_poison(&self.inner).handlers = handlers;
    }

    /// Publishes a record at `level` with an optional message. Records
    /// below the logger's level are dropped; accepted records go to this
    /// logger's handlers and then walk the parent chain while each
    /// logger's `use_parent_handlers` flag holds. Ancestor logger levels
    /// do not re-filter; only handler levels do.
    pub fn log_record(&self, level: Level, message: Option<String>) {
        if level == Level::Off {
            return;
        }
        if !self.level().allows(level) {
            return;
        }

        let record = LogRecord {
            logger: self
                .name
                .clone()
                .unwrap_or_else(|| "<anonymous>".to_string()),
            level,
            message,
            at: SystemTime::now(),
        };
        self.publish_up(&record);
    }

    fn publish_up(&self, record: &LogRecord) {
        for handler in self.handlers() {
            handler.publish(record);
        }
        if self.use_parent_handlers() {
            if let Some(parent) = &self.parent {
                parent.publish_up(record);
            }
        }
    }

    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.log_record(level, Some(message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::Trace, message);
    }
}
