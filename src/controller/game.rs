use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{messages, PLAYER_ID_KEY};
use crate::controller::state::ViewState;
use crate::service::GameService;
use crate::storage::KeyValueStore;
use crate::types::Direction;

/// Result of a user-initiated operation, distinguishing guarded no-ops from
/// requests that actually went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A request was sent and succeeded.
    Done,
    /// A request was sent and failed; the error slot holds the message.
    Failed,
    /// Nothing was sent because a guard rejected the call.
    Skipped,
}

/// What a start request resolved to before any network call.
enum StartPlan {
    Busy,
    Resume(String),
    Create(u64),
}

struct Inner {
    service: Arc<dyn GameService>,
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<ViewState>,
}

/// Game View Controller. Cheap to clone; all clones drive the same state.
///
/// State lives in a `watch` channel and is only mutated in short synchronous
/// sections, never across an await, so concurrent operations interleave at
/// request boundaries and the last write wins.
#[derive(Clone)]
pub struct GameController {
    inner: Arc<Inner>,
}

/// Non-owning handle for timer tasks. Upgrading fails once every
/// [`GameController`] is gone.
#[derive(Clone)]
pub struct WeakController {
    inner: Weak<Inner>,
}

impl WeakController {
    pub fn upgrade(&self) -> Option<GameController> {
        self.inner.upgrade().map(|inner| GameController { inner })
    }
}

impl GameController {
    pub fn new(service: Arc<dyn GameService>, store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _rx) = watch::channel(ViewState::default());
        Self {
            inner: Arc::new(Inner { service, store, state }),
        }
    }

    pub fn downgrade(&self) -> WeakController {
        WeakController {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut out = None;
        self.inner.state.send_modify(|s| out = Some(f(s)));
        match out {
            Some(r) => r,
            None => unreachable!("send_modify runs its closure exactly once"),
        }
    }

    /// Applies `f` only if no reset happened since `epoch` was read.
    fn update_current<R>(&self, epoch: u64, f: impl FnOnce(&mut ViewState) -> R) -> Option<R> {
        self.update(|s| (s.epoch() == epoch).then(|| f(s)))
    }

    fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|s| s.error = Some(message));
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Rebinds a stored identity, then loads price and (if bound) status together.
    pub async fn initialize(&self) {
        if let Some(player_id) = self.inner.store.get(PLAYER_ID_KEY) {
            info!(player_id = %player_id, "Restored stored player identity");
            self.update(|s| {
                s.player_id = Some(player_id);
                s.started = true;
            });
        }

        tokio::join!(self.refresh_price(), self.refresh_status());
    }

    pub async fn refresh_price(&self) -> Outcome {
        let epoch = self.snapshot().epoch();
        let result = self.inner.service.fetch_price().await;

        let applied = match result {
            Ok(quote) => self.update_current(epoch, |s| s.price = Some(quote)).map(|()| Outcome::Done),
            Err(e) => {
                warn!("Price fetch failed: {e}");
                self.update_current(epoch, |s| s.error = Some(messages::PRICE_FAILED.to_string()))
                    .map(|()| Outcome::Failed)
            }
        };
        applied.unwrap_or_else(|| {
            debug!("Price answer dropped after reset");
            Outcome::Skipped
        })
    }

    pub async fn refresh_status(&self) -> Outcome {
        let Some(player_id) = self.snapshot().player_id else {
            return Outcome::Skipped;
        };

        match self.inner.service.fetch_player(&player_id).await {
            Ok(status) => {
                // Drop answers for an identity that was reset while in flight.
                let applied = self.update(|s| {
                    if s.player_id.as_deref() != Some(player_id.as_str()) {
                        return false;
                    }
                    if s.apply_status(status) {
                        debug!(player_id = %player_id, remaining = ?s.countdown.remaining(), "Countdown seeded");
                    }
                    true
                });
                if applied { Outcome::Done } else { Outcome::Skipped }
            }
            Err(e) => {
                warn!(player_id = %player_id, "Player status fetch failed: {e}");
                self.set_error(messages::STATUS_FAILED);
                Outcome::Failed
            }
        }
    }

    /// Starts the game, reusing a known identity without touching the network.
    /// At most one creation request is in flight at a time.
    pub async fn create_player(&self) -> Outcome {
        let store = &self.inner.store;
        let plan = self.update(|s| {
            if s.loading {
                return StartPlan::Busy;
            }
            s.error = None;
            if let Some(player_id) = s.player_id.clone().or_else(|| store.get(PLAYER_ID_KEY)) {
                s.player_id = Some(player_id.clone());
                s.started = true;
                return StartPlan::Resume(player_id);
            }
            s.loading = true;
            StartPlan::Create(s.epoch())
        });

        let epoch = match plan {
            StartPlan::Busy => {
                debug!("Start ignored: request already in flight");
                return Outcome::Skipped;
            }
            StartPlan::Resume(player_id) => {
                info!(player_id = %player_id, "Player already exists, resuming game");
                return Outcome::Skipped;
            }
            StartPlan::Create(epoch) => epoch,
        };

        match self.inner.service.create_player().await {
            Ok(player) => {
                let player_id = player.player_id;
                // The player exists remotely either way; record it so a later
                // start rebinds instead of creating another.
                if let Err(e) = self.inner.store.set(PLAYER_ID_KEY, &player_id) {
                    warn!(player_id = %player_id, "Could not persist player identity: {e}");
                }
                info!(player_id = %player_id, "Created new player");
                let bound = self.update_current(epoch, |s| {
                    s.player_id = Some(player_id);
                    s.started = true;
                    s.loading = false;
                });
                match bound {
                    Some(()) => Outcome::Done,
                    None => {
                        debug!("Game was reset while creating player; not starting");
                        Outcome::Skipped
                    }
                }
            }
            Err(e) => {
                warn!("Player creation failed: {e}");
                self.update_current(epoch, |s| {
                    s.error = Some(messages::CREATE_FAILED.to_string());
                    s.loading = false;
                });
                Outcome::Failed
            }
        }
    }

    /// Submits a guess at the current quote and refreshes status right after.
    pub async fn submit_guess(&self, direction: Direction) -> Outcome {
        let guarded = self.update(|s| {
            let (Some(player_id), Some(price)) = (s.player_id.clone(), s.price.as_ref().map(|q| q.price)) else {
                return None;
            };
            if !s.can_submit_guess() {
                return None;
            }
            s.error = None;
            s.loading = true;
            Some((player_id, price, s.epoch()))
        });
        let Some((player_id, price, epoch)) = guarded else {
            debug!(direction = %direction, "Guess ignored: not available right now");
            return Outcome::Skipped;
        };

        info!(player_id = %player_id, direction = %direction, price, "Submitting guess");
        match self.inner.service.submit_guess(&player_id, direction, price).await {
            Ok(()) => {
                self.refresh_status().await;
                self.update_current(epoch, |s| s.loading = false);
                Outcome::Done
            }
            Err(e) => {
                warn!(player_id = %player_id, direction = %direction, "Guess submission failed: {e}");
                let message = e
                    .service_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| messages::GUESS_FAILED.to_string());
                self.update_current(epoch, |s| {
                    s.error = Some(message);
                    s.loading = false;
                });
                Outcome::Failed
            }
        }
    }

    /// Clears in-memory state. The stored identity stays so the next start
    /// rebinds to the same player.
    pub fn reset_game(&self) {
        info!("Resetting game view");
        self.update(ViewState::reset);
    }

    pub fn dismiss_error(&self) {
        self.update(|s| s.error = None);
    }

    /// Poll step: price and, when an identity is bound, status.
    pub async fn tick(&self) {
        tokio::join!(self.refresh_price(), self.refresh_status());
    }

    /// One countdown second for the timer seeded at `generation`.
    pub fn countdown_tick(&self, generation: u64) -> bool {
        self.update(|s| s.countdown.tick(generation))
    }
}
