use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Guess direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessStatus {
    Pending,
    Resolved,
}

// ---------------------------------------------------------------------------
// Service-owned entities (local copies only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub player_id: String,
    /// +1 per correct guess, -1 per incorrect one. Can go negative.
    pub score: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guess {
    pub guess_id: String,
    pub player_id: String,
    pub direction: Direction,
    pub price_at_guess: f64,
    pub guess_timestamp: DateTime<Utc>,
    pub status: GuessStatus,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolved_price: Option<f64>,
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default)]
    pub points_awarded: Option<i64>,
}

/// `GET /players/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub player: Player,
    #[serde(default)]
    pub pending_guess: Option<Guess>,
    /// Whole seconds until the pending guess may resolve. Fractional or negative
    /// values from the service are rounded up and clamped at zero.
    #[serde(default, deserialize_with = "whole_seconds")]
    pub time_remaining_seconds: Option<u64>,
}

impl PlayerStatus {
    /// Remaining seconds of the pending guess, only when both are present.
    pub fn pending_remaining(&self) -> Option<(&Guess, u64)> {
        match (&self.pending_guess, self.time_remaining_seconds) {
            (Some(guess), Some(secs)) => Some((guess, secs)),
            _ => None,
        }
    }
}

/// `GET /btc/price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    #[serde(default)]
    pub id: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub age_seconds: Option<f64>,
    #[serde(default)]
    pub is_stale: Option<bool>,
}

impl PriceQuote {
    pub fn stale(&self) -> bool {
        self.is_stale.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Request / response envelopes
// ---------------------------------------------------------------------------

/// `POST /players` answer.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlayerResponse {
    pub player: Player,
}

/// `POST /players/{id}/guess` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub direction: Direction,
    pub current_price: f64,
}

/// Shape of a rejected request's body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

fn whole_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map(|secs| if secs <= 0.0 { 0 } else { secs.ceil() as u64 }))
}
