//! Game service double shared by the controller tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::service::GameService;
use crate::types::{Direction, Guess, GuessStatus, Player, PlayerStatus, PriceQuote};

/// In-memory game service that counts calls and records guesses.
#[derive(Default)]
pub(crate) struct FakeService {
    pub(crate) price_calls: AtomicUsize,
    pub(crate) create_calls: AtomicUsize,
    pub(crate) status_calls: AtomicUsize,
    pub(crate) guesses: Mutex<Vec<(String, Direction, f64)>>,
    pub(crate) fail_price: bool,
    pub(crate) fail_create: bool,
    pub(crate) fail_status: bool,
    pub(crate) reject_guess: Option<Option<String>>,
    pub(crate) remaining_after_guess: u64,
    /// Latency added to price, create and guess calls so concurrent calls interleave.
    pub(crate) latency: Option<Duration>,
}

impl FakeService {
    pub(crate) fn ok() -> Self {
        Self { remaining_after_guess: 60, ..Default::default() }
    }

    pub(crate) fn slow(latency: Duration) -> Self {
        Self { latency: Some(latency), ..Self::ok() }
    }

    async fn wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl GameService for FakeService {
    async fn fetch_price(&self) -> Result<PriceQuote> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail_price {
            return Err(AppError::Service { status: 429, message: None });
        }
        Ok(PriceQuote {
            id: Some("q".to_string()),
            price: 50000.0,
            timestamp: None,
            age_seconds: Some(3.0),
            is_stale: Some(false),
        })
    }

    async fn create_player(&self) -> Result<Player> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail_create {
            return Err(AppError::Service { status: 500, message: None });
        }
        Ok(Player {
            player_id: "p-new".to_string(),
            score: 0,
            created_at: None,
            last_active: None,
        })
    }

    async fn fetch_player(&self, player_id: &str) -> Result<PlayerStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_status {
            return Err(AppError::Service { status: 503, message: None });
        }
        let pending = self.guesses.lock().unwrap().last().cloned();
        Ok(PlayerStatus {
            player: Player {
                player_id: player_id.to_string(),
                score: 1,
                created_at: None,
                last_active: None,
            },
            time_remaining_seconds: pending.as_ref().map(|_| self.remaining_after_guess),
            pending_guess: pending.map(|(id, direction, price)| Guess {
                guess_id: "g-1".to_string(),
                player_id: id,
                direction,
                price_at_guess: price,
                guess_timestamp: Utc::now(),
                status: GuessStatus::Pending,
                resolved_at: None,
                resolved_price: None,
                correct: None,
                points_awarded: None,
            }),
        })
    }

    async fn submit_guess(&self, player_id: &str, direction: Direction, current_price: f64) -> Result<()> {
        self.wait().await;
        if let Some(message) = &self.reject_guess {
            return Err(AppError::Service { status: 400, message: message.clone() });
        }
        self.guesses
            .lock()
            .unwrap()
            .push((player_id.to_string(), direction, current_price));
        Ok(())
    }
}
