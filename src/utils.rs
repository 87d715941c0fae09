use std::sync::{Mutex, MutexGuard};

/// Splits text into lines, treating `\n`, `\r\n`, and `\r` as terminators.
///
/// A trailing terminator does not produce a trailing empty line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => lines.push(std::mem::take(&mut current)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Locks a mutex, recovering the guard if a panicking test thread poisoned it.
pub fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
