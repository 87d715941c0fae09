//! Enabling or disabling tests based on the `CI` environment marker

use std::env;

/// The environment variable whose presence (any value, empty included)
/// signals a CI/CD environment.
pub const CI_ENV_VAR: &str = "CI";

/// True iff the `CI` variable is set, independent of its value.
pub fn is_ci() -> bool {
    env::var_os(CI_ENV_VAR).is_some()
}

/// An enable/disable decision with the reason behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enablement {
    Enabled(String),
    Disabled(String),
}

impl Enablement {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Enablement::Enabled(_))
    }

    pub fn reason(&self) -> &str {
        match self {
            Enablement::Enabled(reason) | Enablement::Disabled(reason) => reason,
        }
    }
}

/// Enabled only in a CI/CD environment.
pub fn require_ci() -> Enablement {
    if is_ci() {
        Enablement::Enabled(format!("environment variable {CI_ENV_VAR} is set"))
    } else {
        Enablement::Disabled(format!("environment variable {CI_ENV_VAR} is not set"))
    }
}

/// Disabled in a CI/CD environment. Reads the same variable as
/// [`require_ci`] but does not depend on its state.
pub fn forbid_ci() -> Enablement {
    if is_ci() {
        Enablement::Disabled(format!("environment variable {CI_ENV_VAR} is set"))
    } else {
        Enablement::Enabled(format!("environment variable {CI_ENV_VAR} is not set"))
    }
}

/// Returns early from the surrounding test unless running on CI, printing
/// the reason through the console stderr sink.
#[macro_export]
macro_rules! skip_unless_ci {
    () => {
        if let $crate::env_condition::Enablement::Disabled(reason) =
            $crate::env_condition::require_ci()
        {
            $crate::console::err().println(format!("skipping test: {reason}"));
            return;
        }
    };
}

/// Returns early from the surrounding test when running on CI, printing
/// the reason through the console stderr sink.
#[macro_export]
macro_rules! skip_on_ci {
    () => {
        if let $crate::env_condition::Enablement::Disabled(reason) =
            $crate::env_condition::forbid_ci()
        {
            $crate::console::err().println(format!("skipping test: {reason}"));
            return;
        }
    };
}
