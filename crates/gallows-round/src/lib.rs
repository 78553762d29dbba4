//! Hangman round engine for Gallows.
//!
//! A [`Round`] is pure state: no I/O, no clock, no players. The game
//! session feeds it a tries budget, a secret word and a stream of letters,
//! and reads back the mask, the remaining tries and the outcome.
//!
//! # Phases
//!
//! ```text
//!   AwaitingWord ──set_secret──→ Guessing ──guess──→ Guessing
//!                                   │
//!                                   ├──(word complete)──→ Won
//!                                   └──(budget spent)───→ Lost
//! ```
//!
//! A guess always costs one try, right or wrong. The budget is spent once
//! `tries_used > tries_allowed`, so a picker who allows 5 tries gives
//! the guessers up to six guesses, the last of which only counts for the
//! picker.

mod error;

pub use error::RoundError;

use gallows_protocol::{normalize_guess, normalize_secret, validate_max_tries};

// ---------------------------------------------------------------------------
// Phase & outcome
// ---------------------------------------------------------------------------

/// Where a round is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Tries budget set, waiting for the picker's word.
    AwaitingWord,
    /// Accepting guesses.
    Guessing,
    /// Every letter revealed within budget.
    Won,
    /// The budget ran out.
    Lost,
}

/// Who takes the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The word was completed within budget.
    GuessersWon,
    /// The word survived the budget; the picker scores.
    PickerWon,
}

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

/// One hangman round.
#[derive(Debug, Clone)]
pub struct Round {
    secret: Vec<char>,
    /// Same length as `secret`; `None` until the letter is guessed.
    revealed: Vec<Option<char>>,
    tries_used: u32,
    tries_allowed: u32,
    phase: RoundPhase,
}

impl Round {
    /// Starts a round with the picker's tries budget.
    pub fn new(tries_allowed: u32) -> Result<Self, RoundError> {
        let tries_allowed =
            validate_max_tries(tries_allowed).ok_or(RoundError::InvalidMaxTries(tries_allowed))?;
        Ok(Self {
            secret: Vec::new(),
            revealed: Vec::new(),
            tries_used: 0,
            tries_allowed,
            phase: RoundPhase::AwaitingWord,
        })
    }

    /// Sets the secret word (lower-cased) and opens guessing.
    pub fn set_secret(&mut self, word: &str) -> Result<(), RoundError> {
        self.expect_phase(RoundPhase::AwaitingWord, "set the secret")?;
        let word = normalize_secret(word).ok_or_else(|| RoundError::InvalidSecret(word.into()))?;

        self.secret = word.chars().collect();
        self.revealed = vec![None; self.secret.len()];
        self.phase = RoundPhase::Guessing;

        tracing::debug!(len = self.secret.len(), tries = self.tries_allowed, "round armed");
        Ok(())
    }

    /// Applies one guess and reports whether the letter is in the word.
    ///
    /// Costs one try whatever the answer, and reveals every hidden slot
    /// holding the letter. Guessing an already revealed letter is allowed
    /// and still costs a try.
    pub fn guess(&mut self, letter: char) -> Result<bool, RoundError> {
        self.expect_phase(RoundPhase::Guessing, "guess")?;
        let letter = normalize_guess(letter).ok_or(RoundError::InvalidGuess(letter))?;

        self.tries_used += 1;

        let mut found = false;
        for (slot, &actual) in self.revealed.iter_mut().zip(&self.secret) {
            if actual == letter {
                found = true;
                if slot.is_none() {
                    *slot = Some(letter);
                }
            }
        }

        if !self.within_budget() {
            self.phase = RoundPhase::Lost;
        } else if self.is_won() {
            self.phase = RoundPhase::Won;
        }

        tracing::debug!(
            %letter,
            found,
            tries_used = self.tries_used,
            phase = ?self.phase,
            "guess applied"
        );
        Ok(found)
    }

    /// Whether every letter of the word is revealed.
    pub fn is_won(&self) -> bool {
        !self.secret.is_empty() && self.revealed.iter().all(Option::is_some)
    }

    /// Whether the guessers are still inside their tries budget.
    pub fn within_budget(&self) -> bool {
        self.tries_used <= self.tries_allowed
    }

    /// Whether no further guesses will be taken.
    pub fn is_over(&self) -> bool {
        matches!(self.phase, RoundPhase::Won | RoundPhase::Lost)
    }

    /// The result, judged by the budget alone: a round that ends within
    /// budget goes to the guessers.
    pub fn outcome(&self) -> Outcome {
        if self.within_budget() {
            Outcome::GuessersWon
        } else {
            Outcome::PickerWon
        }
    }

    /// The mask sent as `M=…`: one slot per letter, `None` if hidden.
    pub fn mask(&self) -> Vec<Option<char>> {
        self.revealed.clone()
    }

    /// Tries remaining before the budget is spent, never negative.
    pub fn tries_left(&self) -> u32 {
        self.tries_allowed.saturating_sub(self.tries_used)
    }

    pub fn tries_used(&self) -> u32 {
        self.tries_used
    }

    pub fn tries_allowed(&self) -> u32 {
        self.tries_allowed
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// The secret word, once set.
    pub fn secret(&self) -> String {
        self.secret.iter().collect()
    }

    fn expect_phase(&self, wanted: RoundPhase, action: &'static str) -> Result<(), RoundError> {
        if self.phase == wanted {
            Ok(())
        } else {
            Err(RoundError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }
}
