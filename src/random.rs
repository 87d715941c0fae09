//! Randomized test-input generation: bounded integers, strings over a
//! character set, and lists or unique sets thereof.
//!
//! Values come from a cryptographically strong generator so they can stand
//! in for security-sensitive-looking fixtures such as fake tokens.

use rand::Rng;
use rand::prelude::IndexedRandom;
use rand::rngs::ThreadRng;
use std::collections::HashSet;
use thiserror::Error;

/// The default character set: upper- and lowercase ASCII letters and digits.
pub const DEFAULT_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Unique-set generation draws at most this many times the requested size
/// before giving up.
const UNIQUE_RETRY_FACTOR: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RandomError {
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: i64, max: i64 },

    #[error("string length must be positive")]
    InvalidLength,

    #[error("character set must not be empty")]
    EmptyAlphabet,

    #[error("cannot generate {requested} unique values from a domain of {available}")]
    DomainTooSmall { requested: usize, available: u128 },

    #[error("could not generate {requested} unique values within {attempts} draws")]
    Exhausted { requested: usize, attempts: usize },
}

/// Inclusive integer bounds for generated values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl Default for IntRange {
    fn default() -> Self {
        Self { min: 0, max: 100 }
    }
}

impl IntRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    fn validate(&self) -> Result<(), RandomError> {
        if self.min > self.max {
            return Err(RandomError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Number of distinct values in the range.
    fn domain_size(&self) -> u128 {
        let span = (self.max as i128) - (self.min as i128);
        span as u128 + 1
    }
}

/// Shape of a generated string: exact length and the character set to draw
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringSpec {
    pub length: usize,
    pub alphabet: String,
}

impl Default for StringSpec {
    fn default() -> Self {
        Self {
            length: 10,
            alphabet: DEFAULT_ALPHABET.to_string(),
        }
    }
}

impl StringSpec {
    pub fn new(length: usize, alphabet: impl Into<String>) -> Self {
        Self {
            length,
            alphabet: alphabet.into(),
        }
    }

    fn validate(&self) -> Result<(), RandomError> {
        if self.length == 0 {
            return Err(RandomError::InvalidLength);
        }
        if self.alphabet.is_empty() {
            return Err(RandomError::EmptyAlphabet);
        }
        Ok(())
    }

    /// Number of distinct strings representable: distinct characters raised
    /// to the length, saturating at `u128::MAX`.
    fn domain_size(&self) -> u128 {
        let distinct = self.alphabet.chars().collect::<HashSet<char>>().len() as u128;
        u32::try_from(self.length)
            .ok()
            .and_then(|length| distinct.checked_pow(length))
            .unwrap_or(u128::MAX)
    }
}

/// Resolution precedence for injected-value configuration: the per-input
/// configuration wins, otherwise the per-method one, otherwise the default.
pub fn resolve<T: Clone + Default>(site: Option<&T>, method: Option<&T>) -> T {
    site.or(method).cloned().unwrap_or_default()
}

/// Generator for randomized test inputs, backed by a CSPRNG.
pub struct RandomSource {
    rng: ThreadRng,
}

impl RandomSource {
    pub fn new() -> Self {
        // rand::rng() is a cryptographically secure generator; weaker
        // sources would be a functional regression for token-like fixtures.
        Self { rng: rand::rng() }
    }

    /// A single integer in `[min, max]`. `min == max` always yields exactly
    /// that value.
    pub fn int_in(&mut self, range: &IntRange) -> Result<i64, RandomError> {
        range.validate()?;
        Ok(self.rng.random_range(range.min..=range.max))
    }

    /// A string of exactly `length` characters, each drawn from the
    /// alphabet.
    pub fn string(&mut self, spec: &StringSpec) -> Result<String, RandomError> {
        spec.validate()?;
        let chars: Vec<char> = spec.alphabet.chars().collect();
        let mut result = String::with_capacity(spec.length);
        for _ in 0..spec.length {
            let c = chars
                .choose(&mut self.rng)
                .copied()
                .ok_or(RandomError::EmptyAlphabet)?;
            result.push(c);
        }
        Ok(result)
    }

    /// An ordered list of `count` integers; duplicates allowed.
    pub fn int_list(&mut self, count: usize, range: &IntRange) -> Result<Vec<i64>, RandomError> {
        range.validate()?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.rng.random_range(range.min..=range.max));
        }
        Ok(values)
    }

    /// An ordered list of `count` strings; duplicates allowed.
    pub fn string_list(
        &mut self,
        count: usize,
        spec: &StringSpec,
    ) -> Result<Vec<String>, RandomError> {
        spec.validate()?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.string(spec)?);
        }
        Ok(values)
    }

    /// A set of `count` distinct integers.
    ///
    /// Fails with [`RandomError::DomainTooSmall`] before any draw when the
    /// range cannot hold `count` distinct values, and with
    /// [`RandomError::Exhausted`] when the bounded retry budget runs out
    /// despite a sufficient domain.
    pub fn int_set(&mut self, count: usize, range: &IntRange) -> Result<HashSet<i64>, RandomError> {
        range.validate()?;
        let available = range.domain_size();
        if count as u128 > available {
            return Err(RandomError::DomainTooSmall {
                requested: count,
                available,
            });
        }

        let budget = count.saturating_mul(UNIQUE_RETRY_FACTOR);
        let mut values = HashSet::with_capacity(count);
        let mut attempts = 0;
        while values.len() < count {
            if attempts >= budget {
                return Err(RandomError::Exhausted {
                    requested: count,
                    attempts,
                });
            }
            attempts += 1;
            values.insert(self.rng.random_range(range.min..=range.max));
        }
        Ok(values)
    }

    /// A set of `count` distinct strings, with the same failure semantics
    /// as [`int_set`](Self::int_set). The domain is the distinct characters
    /// of the alphabet raised to the length.
    pub fn string_set(
        &mut self,
        count: usize,
        spec: &StringSpec,
    ) -> Result<HashSet<String>, RandomError> {
        spec.validate()?;
        let available = spec.domain_size();
        if count as u128 > available {
            return Err(RandomError::DomainTooSmall {
                requested: count,
                available,
            });
        }

        let budget = count.saturating_mul(UNIQUE_RETRY_FACTOR);
        let mut values = HashSet::with_capacity(count);
        let mut attempts = 0;
        while values.len() < count {
            if attempts >= budget {
                return Err(RandomError::Exhausted {
                    requested: count,
                    attempts,
                });
            }
            attempts += 1;
            values.insert(self.string(spec)?);
        }
        Ok(values)
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}
