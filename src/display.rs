//! Line-oriented console rendering of the challenge overlay.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::challenge::{ChallengeDisplay, Symbol};

const TITLE_MEMORIZE: &str = "MEMORIZE THE PATTERN";
const TITLE_REPEAT: &str = "REPEAT THE SEQUENCE";
const ROUND_COMPLETE: &str = "ROUND COMPLETE";
const SUCCESS: &str = "CHALLENGE COMPLETE! OPENING WALL...";
const FAILURE: &str = "CHALLENGE FAILED! RESETTING LEVEL...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    Correct(Symbol),
    Wrong(Symbol),
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("_"),
            Self::Correct(symbol) => write!(f, "{symbol}"),
            Self::Wrong(symbol) => write!(f, "{symbol}!"),
        }
    }
}

struct Screen<W> {
    out: W,
    visible: bool,
    slots: Vec<Slot>,
}

impl<W: Write> Screen<W> {
    // Write errors are swallowed: a broken terminal must not stall a run.
    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn render_slots(&mut self) {
        let row = self
            .slots
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        self.line(&format!("  {row}"));
    }
}

/// Renders the challenge to any [`Write`] sink, one line per update.
///
/// Calls made while the overlay is hidden are dropped.
pub struct ConsoleDisplay<W> {
    screen: Mutex<Screen<W>>,
}

impl<W> std::fmt::Debug for ConsoleDisplay<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleDisplay").finish_non_exhaustive()
    }
}

impl ConsoleDisplay<std::io::Stdout> {
    /// Renders to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleDisplay<W> {
    /// Renders to `out`.
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self {
            screen: Mutex::new(Screen {
                out,
                visible: false,
                slots: Vec::new(),
            }),
        }
    }

    fn screen(&self) -> MutexGuard<'_, Screen<W>> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the overlay is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.screen().visible
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.screen
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .out
    }
}

impl<W: Write + Send> ChallengeDisplay for ConsoleDisplay<W> {
    fn show(&self) {
        let mut screen = self.screen();
        if !screen.visible {
            screen.visible = true;
            screen.slots.clear();
            screen.line("=== PATTERN CHALLENGE ===");
        }
    }

    fn hide(&self) {
        let mut screen = self.screen();
        if screen.visible {
            screen.visible = false;
            screen.slots.clear();
            screen.line("=========================");
        }
    }

    fn show_pattern(&self, symbols: &[Symbol], round: u32, total_rounds: u32) {
        let mut screen = self.screen();
        if !screen.visible {
            return;
        }
        screen.slots = symbols.iter().copied().map(Slot::Correct).collect();
        screen.line(&format!("{TITLE_MEMORIZE}  ROUND {round}/{total_rounds}"));
        screen.render_slots();
    }

    fn show_input_slots(&self, round: u32) {
        let mut screen = self.screen();
        if !screen.visible {
            return;
        }
        let count = usize::try_from(round).unwrap_or(0);
        screen.slots = vec![Slot::Empty; count];
        screen.line(TITLE_REPEAT);
        screen.render_slots();
    }

    fn show_input_feedback(&self, symbol: Symbol, correct: bool, position: usize) {
        let mut screen = self.screen();
        if !screen.visible {
            return;
        }
        let Some(index) = position.checked_sub(1) else {
            return;
        };
        let Some(slot) = screen.slots.get_mut(index) else {
            return;
        };
        *slot = if correct {
            Slot::Correct(symbol)
        } else {
            Slot::Wrong(symbol)
        };
        screen.render_slots();
    }

    fn show_round_complete(&self) {
        let mut screen = self.screen();
        if screen.visible {
            screen.line(ROUND_COMPLETE);
        }
    }

    fn show_success(&self) {
        let mut screen = self.screen();
        if screen.visible {
            screen.line(SUCCESS);
        }
    }

    fn show_failure(&self) {
        let mut screen = self.screen();
        if screen.visible {
            screen.line(FAILURE);
        }
    }
}
