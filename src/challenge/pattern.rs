//! Symbols and master-pattern generation.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A single discrete pattern symbol (`1..=4` in the shipped puzzle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub u8);

impl From<u8> for Symbol {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive range of symbols a pattern may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRange {
    min: Symbol,
    max: Symbol,
}

impl SymbolRange {
    /// Creates a range, rejecting `min > max`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the bounds are inverted.
    pub fn new(min: Symbol, max: Symbol) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidValue {
                field: "symbol_range".to_string(),
                value: format!("{min}..={max}"),
                expected: "min_symbol <= max_symbol".to_string(),
            });
        }
        Ok(Self { min, max })
    }

    pub(crate) const fn new_unchecked(min: Symbol, max: Symbol) -> Self {
        Self { min, max }
    }

    /// Smallest symbol in the range.
    #[must_use]
    pub const fn min(&self) -> Symbol {
        self.min
    }

    /// Largest symbol in the range.
    #[must_use]
    pub const fn max(&self) -> Symbol {
        self.max
    }

    /// Whether `symbol` lies inside the range.
    #[must_use]
    pub const fn contains(&self, symbol: Symbol) -> bool {
        symbol.0 >= self.min.0 && symbol.0 <= self.max.0
    }

    /// Iterates every symbol in the range in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + use<> {
        (self.min.0..=self.max.0).map(Symbol)
    }
}

impl std::fmt::Display for SymbolRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// The full target sequence for one challenge run.
///
/// Round `r` shows and expects the prefix of length `r`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MasterPattern(Vec<Symbol>);

impl MasterPattern {
    /// Draws `len` symbols uniformly from `range`. Repeats are allowed.
    pub fn generate<R: Rng + ?Sized>(len: u32, range: SymbolRange, rng: &mut R) -> Self {
        let symbols = (0..len)
            .map(|_| Symbol(rng.random_range(range.min.0..=range.max.0)))
            .collect();
        Self(symbols)
    }

    /// Wraps an explicit symbol sequence.
    #[must_use]
    pub const fn from_symbols(symbols: Vec<Symbol>) -> Self {
        Self(symbols)
    }

    /// Number of symbols (equal to the round count).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the pattern is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Symbol expected at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Symbol> {
        self.0.get(index).copied()
    }

    /// The prefix shown in `round` (1-indexed). Clamped to the pattern length.
    #[must_use]
    pub fn prefix(&self, round: u32) -> &[Symbol] {
        let end = usize::try_from(round).map_or(self.0.len(), |r| r.min(self.0.len()));
        &self.0[..end]
    }

    /// All symbols.
    #[must_use]
    pub fn as_slice(&self) -> &[Symbol] {
        &self.0
    }
}

impl std::fmt::Display for MasterPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        f.write_str(&joined)
    }
}

/// Supplies a fresh master pattern for every run.
pub trait PatternSource: Send {
    /// Produces the pattern for the next run.
    fn next_pattern(&mut self, total_rounds: u32, range: SymbolRange) -> MasterPattern;
}

/// Uniform random patterns from a [`StdRng`].
#[derive(Debug)]
pub struct RandomPatterns {
    rng: StdRng,
}

impl RandomPatterns {
    /// Seeds from the operating system.
    #[must_use]
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic patterns for a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PatternSource for RandomPatterns {
    fn next_pattern(&mut self, total_rounds: u32, range: SymbolRange) -> MasterPattern {
        MasterPattern::generate(total_rounds, range, &mut self.rng)
    }
}

/// Hands out pre-scripted patterns in order, then falls back to random.
///
/// Useful for replaying a known sequence in tests and demos.
#[derive(Debug)]
pub struct ScriptedPatterns {
    queue: VecDeque<MasterPattern>,
    fallback: RandomPatterns,
}

impl ScriptedPatterns {
    /// Creates a source that yields `patterns` first.
    #[must_use]
    pub fn new<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = u8>,
    {
        Self {
            queue: patterns
                .into_iter()
                .map(|p| MasterPattern::from_symbols(p.into_iter().map(Symbol).collect()))
                .collect(),
            fallback: RandomPatterns::seeded(0),
        }
    }
}

impl PatternSource for ScriptedPatterns {
    fn next_pattern(&mut self, total_rounds: u32, range: SymbolRange) -> MasterPattern {
        self.queue
            .pop_front()
            .unwrap_or_else(|| self.fallback.next_pattern(total_rounds, range))
    }
}
