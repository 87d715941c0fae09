//! Tests for CI environment gating

use std::env;
use std::sync::{Mutex, OnceLock};
use testkit::env_condition::{CI_ENV_VAR, Enablement, forbid_ci, is_ci, require_ci};
use testkit::{skip_on_ci, skip_unless_ci};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serializes tests that mutate the process environment, restoring the
/// prior value afterwards.
fn with_ci_var<F: FnOnce()>(value: Option<&str>, body: F) {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    let prior = env::var_os(CI_ENV_VAR);

    unsafe {
        match value {
            Some(v) => env::set_var(CI_ENV_VAR, v),
            None => env::remove_var(CI_ENV_VAR),
        }
    }

    body();

    unsafe {
        match prior {
            Some(v) => env::set_var(CI_ENV_VAR, v),
            None => env::remove_var(CI_ENV_VAR),
        }
    }
}

#[test]
fn presence_counts_regardless_of_value() {
    with_ci_var(Some("true"), || assert!(is_ci()));
    with_ci_var(Some(""), || {
        assert!(is_ci(), "an empty value still signals CI")
    });
    with_ci_var(None, || assert!(!is_ci()));
}

#[test]
fn require_ci_enables_only_on_ci() {
    with_ci_var(Some("1"), || {
        let decision = require_ci();
        assert!(decision.is_enabled(), "reason: {}", decision.reason());
    });
    with_ci_var(None, || {
        let decision = require_ci();
        assert!(!decision.is_enabled());
        assert!(decision.reason().contains(CI_ENV_VAR), "reason: {}", decision.reason());
    });
}

#[test]
fn forbid_ci_disables_only_on_ci() {
    with_ci_var(Some("1"), || {
        let decision = forbid_ci();
        assert!(matches!(decision, Enablement::Disabled(_)));
    });
    with_ci_var(None, || {
        let decision = forbid_ci();
        assert!(decision.is_enabled(), "reason: {}", decision.reason());
    });
}

#[test]
fn the_two_polarities_are_independent_reads() {
    with_ci_var(Some("anything"), || {
        assert!(require_ci().is_enabled());
        assert!(!forbid_ci().is_enabled());
    });
    with_ci_var(None, || {
        assert!(!require_ci().is_enabled());
        assert!(forbid_ci().is_enabled());
    });
}

fn body_guarded_by_skip_unless_ci(ran: &mut bool) {
    skip_unless_ci!();
    *ran = true;
}

fn body_guarded_by_skip_on_ci(ran: &mut bool) {
    skip_on_ci!();
    *ran = true;
}

#[test]
fn skip_unless_ci_returns_early_off_ci() {
    with_ci_var(None, || {
        let mut ran = false;
        body_guarded_by_skip_unless_ci(&mut ran);
        assert!(!ran, "the body must be skipped off CI");
    });
    with_ci_var(Some("1"), || {
        let mut ran = false;
        body_guarded_by_skip_unless_ci(&mut ran);
        assert!(ran, "the body must run on CI");
    });
}

#[test]
fn skip_on_ci_returns_early_on_ci() {
    with_ci_var(Some("1"), || {
        let mut ran = false;
        body_guarded_by_skip_on_ci(&mut ran);
        assert!(!ran, "the body must be skipped on CI");
    });
    with_ci_var(None, || {
        let mut ran = false;
        body_guarded_by_skip_on_ci(&mut ran);
        assert!(ran, "the body must run off CI");
    });
}
