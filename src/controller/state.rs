use crate::types::{Guess, PlayerStatus, PriceQuote};

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Locally decremented copy of the pending guess's remaining seconds.
///
/// Every seed bumps `generation`, so a timer started for an older seed can tell
/// that it has been superseded and stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: Option<u64>,
    generation: u64,
    /// (guess_id, server seconds) the current value was seeded from.
    source: Option<(String, u64)>,
}

impl Countdown {
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while the counter still has seconds to count down.
    pub fn is_running(&self) -> bool {
        matches!(self.remaining, Some(n) if n > 0)
    }

    pub fn seed(&mut self, secs: u64) {
        self.remaining = Some(secs);
        self.generation += 1;
    }

    pub fn clear(&mut self) {
        self.remaining = None;
        self.source = None;
    }

    /// Reseeds only when the guess or the server's remaining seconds changed
    /// since the last seed. Returns true if a reseed happened.
    pub fn follow(&mut self, status: &PlayerStatus) -> bool {
        match status.pending_remaining() {
            Some((guess, secs)) => {
                let source = (guess.guess_id.clone(), secs);
                if self.source.as_ref() == Some(&source) && self.remaining.is_some() {
                    return false;
                }
                self.seed(secs);
                self.source = Some(source);
                true
            }
            None => {
                self.clear();
                false
            }
        }
    }

    /// One-second step for the timer that owns `generation`. Returns whether the
    /// countdown is still running afterwards; false for a superseded generation.
    pub fn tick(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        match self.remaining {
            Some(n) if n > 0 => {
                self.remaining = Some(n - 1);
                n - 1 > 0
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Everything the controller knows. Service entities are cached copies that are
/// only ever replaced whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub player_id: Option<String>,
    pub status: Option<PlayerStatus>,
    pub price: Option<PriceQuote>,
    pub loading: bool,
    pub started: bool,
    pub error: Option<String>,
    pub countdown: Countdown,
    /// Bumped by every reset. Requests started under an older epoch discard
    /// their results.
    epoch: u64,
}

impl ViewState {
    pub fn pending_guess(&self) -> Option<&Guess> {
        self.status.as_ref().and_then(|s| s.pending_guess.as_ref())
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn score(&self) -> i64 {
        self.status.as_ref().map_or(0, |s| s.player.score)
    }

    /// Whether the UP/DOWN actions are available.
    pub fn can_submit_guess(&self) -> bool {
        if self.loading || self.price.is_none() || self.player_id.is_none() {
            return false;
        }
        if self.pending_guess().is_some() {
            return false;
        }
        let server_remaining = self
            .status
            .as_ref()
            .and_then(|s| s.time_remaining_seconds)
            .unwrap_or(0);
        server_remaining == 0
    }

    pub fn apply_status(&mut self, status: PlayerStatus) -> bool {
        let reseeded = self.countdown.follow(&status);
        self.status = Some(status);
        reseeded
    }

    /// Back to the initial view. The countdown generation keeps counting so a
    /// timer from before the reset can never match a later seed.
    pub fn reset(&mut self) {
        let generation = self.countdown.generation;
        let epoch = self.epoch + 1;
        *self = ViewState::default();
        self.countdown.generation = generation;
        self.epoch = epoch;
    }

    pub fn screen(&self) -> Screen<'_> {
        if !self.started {
            return Screen::Landing {
                loading: self.loading,
                error: self.error.as_deref(),
            };
        }

        let panel = match self.pending_guess() {
            Some(guess) => GuessPanel::Pending {
                guess,
                countdown: match self.countdown.remaining() {
                    Some(n) if n > 0 => CountdownDisplay::Remaining(n),
                    Some(_) => CountdownDisplay::AwaitingResolution,
                    None => CountdownDisplay::Hidden,
                },
            },
            None => GuessPanel::Prediction {
                enabled: self.can_submit_guess(),
            },
        };

        Screen::Game(GameScreen {
            score: self.score(),
            price: self.price.as_ref(),
            panel,
            error: self.error.as_deref(),
            loading: self.loading,
        })
    }
}

// ---------------------------------------------------------------------------
// Derived view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Screen<'a> {
    Landing { loading: bool, error: Option<&'a str> },
    Game(GameScreen<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameScreen<'a> {
    pub score: i64,
    /// None renders as a zero price with an "inaccurate" hint.
    pub price: Option<&'a PriceQuote>,
    pub panel: GuessPanel<'a>,
    pub error: Option<&'a str>,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuessPanel<'a> {
    Prediction { enabled: bool },
    Pending { guess: &'a Guess, countdown: CountdownDisplay },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownDisplay {
    Remaining(u64),
    /// Counter hit zero; waiting for the service to resolve.
    AwaitingResolution,
    Hidden,
}
