pub mod game;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use game::{GameController, Outcome, WeakController};
pub use session::GameSession;
pub use state::{Countdown, CountdownDisplay, GameScreen, GuessPanel, Screen, ViewState};
