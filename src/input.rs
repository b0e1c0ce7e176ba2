//! Keyboard-line input mapping.
//!
//! The terminal session reads whole lines. A line of digits submits one
//! symbol per digit, so `241` enters `2`, `4`, `1` in order.

use crate::challenge::{Symbol, SymbolRange};

/// A command decoded from one line of player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Enter a symbol.
    Symbol(Symbol),
    /// Shoot the trigger enemy.
    Fire,
    /// Abandon the current run.
    Cancel,
    /// Leave the session.
    Quit,
}

/// Maps input lines to commands for a symbol range.
#[derive(Debug, Clone, Copy)]
pub struct KeyMap {
    range: SymbolRange,
}

impl KeyMap {
    /// Creates a mapping that accepts digits inside `range`.
    #[must_use]
    pub const fn new(range: SymbolRange) -> Self {
        Self { range }
    }

    /// Decodes one line.
    ///
    /// An empty line or `s` fires, `c` cancels, `q` quits. Otherwise each
    /// in-range digit becomes a symbol and every other character is
    /// skipped.
    #[must_use]
    pub fn parse_line(&self, line: &str) -> Vec<KeyCommand> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "s" | "shoot" => vec![KeyCommand::Fire],
            "c" | "cancel" => vec![KeyCommand::Cancel],
            "q" | "quit" | "exit" => vec![KeyCommand::Quit],
            other => other
                .chars()
                .filter_map(|c| c.to_digit(10))
                .filter_map(|d| u8::try_from(d).ok())
                .map(Symbol)
                .filter(|s| self.range.contains(*s))
                .map(KeyCommand::Symbol)
                .collect(),
        }
    }

    /// One-line help text for the prompt.
    #[must_use]
    pub fn help(&self) -> String {
        format!(
            "keys: {}-{} enter symbols, <enter>/s shoot, c cancel, q quit",
            self.range.min(),
            self.range.max()
        )
    }
}
