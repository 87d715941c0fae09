//! Tests for retrying flaky test bodies

mod common;

use anyhow::anyhow;
use common::test_util::init_tracing;
use std::time::{Duration, Instant};
use testkit::{Interrupter, RetryConfig, run_with_retry, run_with_retry_unwinding};

#[test]
fn succeeds_once_a_transient_failure_clears() {
    init_tracing();
    let config = RetryConfig::new(5);
    let mut calls = 0;

    let result = run_with_retry(&config, None, || {
        calls += 1;
        if calls < 3 {
            Err(anyhow!("transient failure {calls}"))
        } else {
            Ok(())
        }
    });

    assert!(result.is_ok(), "two failures within five attempts: {result:?}");
    assert_eq!(calls, 3, "success must stop further attempts");
}

#[test]
fn always_failing_body_surfaces_the_final_attempt_unchanged() {
    init_tracing();
    let config = RetryConfig {
        max_attempts: 4,
        display_name: "always_failing".to_string(),
        ..RetryConfig::default()
    };
    let mut calls = 0;

    let result = run_with_retry(&config, None, || {
        calls += 1;
        Err(anyhow!("attempt {calls} failed"))
    });

    assert_eq!(calls, 4, "first failure plus three retries");
    let error = result.expect_err("body never succeeds");
    assert_eq!(
        error.to_string(),
        "attempt 4 failed",
        "the final attempt's failure propagates unwrapped"
    );
}

#[test]
fn single_attempt_propagates_the_first_failure_immediately() {
    let config = RetryConfig::new(1);
    let mut calls = 0;

    let result = run_with_retry(&config, None, || {
        calls += 1;
        Err(anyhow!("not configured for retry"))
    });

    assert_eq!(calls, 1);
    assert_eq!(result.expect_err("fails").to_string(), "not configured for retry");
}

#[test]
fn zero_attempts_is_invalid_configuration() {
    let config = RetryConfig::new(0);
    let mut calls = 0;

    let result = run_with_retry(&config, None, || {
        calls += 1;
        Ok(())
    });

    assert_eq!(calls, 0, "the body must never run");
    let message = result.expect_err("invalid configuration").to_string();
    assert!(message.contains("positive"), "message: {message}");
}

#[test]
fn configured_delay_separates_attempts() {
    let config = RetryConfig {
        max_attempts: 3,
        delay: Duration::from_millis(30),
        ..RetryConfig::default()
    };

    let started = Instant::now();
    let result = run_with_retry(&config, None, || Err(anyhow!("never passes")));
    let elapsed = started.elapsed();

    assert!(result.is_err());
    assert!(
        elapsed >= Duration::from_millis(60),
        "two delays of 30ms expected, elapsed {elapsed:?}"
    );
}

#[test]
fn interrupted_delay_stops_retrying_and_keeps_the_original_failure() {
    let interrupter = Interrupter::new();
    interrupter.interrupt();

    let config = RetryConfig {
        max_attempts: 5,
        delay: Duration::from_secs(60),
        ..RetryConfig::default()
    };
    let mut calls = 0;

    let started = Instant::now();
    let result = run_with_retry(&config, Some(&interrupter), || {
        calls += 1;
        Err(anyhow!("substantive failure"))
    });

    assert_eq!(calls, 1, "an interrupted delay must stop further attempts");
    assert!(started.elapsed() < Duration::from_secs(10), "must not sleep out the full delay");

    let error = result.expect_err("fails");
    assert!(
        error.to_string().contains("interrupted"),
        "interruption recorded as context: {error:#}"
    );
    assert_eq!(
        error.root_cause().to_string(),
        "substantive failure",
        "the test failure stays the primary error"
    );
    assert!(
        interrupter.is_interrupted(),
        "the interrupted status must remain observable"
    );
}

#[test]
fn interrupt_from_another_thread_wakes_a_pending_delay() {
    let interrupter = Interrupter::new();
    let remote = interrupter.clone();
    let waker = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        remote.interrupt();
    });

    let config = RetryConfig {
        max_attempts: 2,
        delay: Duration::from_secs(60),
        ..RetryConfig::default()
    };

    let started = Instant::now();
    let result = run_with_retry(&config, Some(&interrupter), || Err(anyhow!("flaky")));
    let elapsed = started.elapsed();

    waker.join().expect("waker thread");
    assert!(result.is_err());
    assert!(
        elapsed < Duration::from_secs(10),
        "interrupt must cut the delay short, elapsed {elapsed:?}"
    );
}

#[test]
fn panicking_body_is_unwound_and_retried() {
    init_tracing();
    let config = RetryConfig::new(5);
    let mut calls = 0;

    let result = run_with_retry_unwinding(&config, None, || {
        calls += 1;
        assert!(calls >= 3, "transient panic {calls}");
    });

    assert!(result.is_ok(), "panics within budget recover: {result:?}");
    assert_eq!(calls, 3);
}

#[test]
fn panic_payload_text_is_preserved_in_the_final_failure() {
    let config = RetryConfig::new(3);
    let mut calls = 0;

    let result = run_with_retry_unwinding(&config, None, || {
        calls += 1;
        panic!("kaboom {calls}");
    });

    assert_eq!(calls, 3);
    let message = result.expect_err("always panics").to_string();
    assert!(message.contains("kaboom 3"), "message: {message}");
}
