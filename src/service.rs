use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::{
    CreatePlayerResponse, Direction, GuessRequest, Player, PlayerStatus, PriceQuote,
    ServiceErrorBody,
};

/// The remote game service. It owns players, guesses, resolution and scoring;
/// the client only reads and submits.
#[async_trait]
pub trait GameService: Send + Sync {
    async fn fetch_price(&self) -> Result<PriceQuote>;
    async fn create_player(&self) -> Result<Player>;
    async fn fetch_player(&self, player_id: &str) -> Result<PlayerStatus>;
    async fn submit_guess(&self, player_id: &str, direction: Direction, current_price: f64) -> Result<()>;
}

/// reqwest-backed client for the game service REST API.
pub struct HttpGameService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpGameService {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let base_url = base_url.into();
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| AppError::Config(format!("invalid service URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!("service URL {base_url} cannot carry a path")));
        }
        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.api_url.clone(), cfg.http_timeout)
    }

    /// Appends `segments` to the base path, percent-encoding each one so a
    /// player id can never change the route.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Turns a non-2xx response into `AppError::Service`, keeping the body's
    /// `error` field when it parses.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ServiceErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());
        Err(AppError::Service { status: status.as_u16(), message })
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let bytes = Self::check(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl GameService for HttpGameService {
    async fn fetch_price(&self) -> Result<PriceQuote> {
        let resp = self.client.get(self.url(&["btc", "price"])).send().await?;
        let quote: PriceQuote = Self::read_json(resp).await?;
        debug!(price = quote.price, stale = quote.stale(), "Fetched BTC price");
        Ok(quote)
    }

    async fn create_player(&self) -> Result<Player> {
        let resp = self.client.post(self.url(&["players"])).send().await?;
        let created: CreatePlayerResponse = Self::read_json(resp).await?;
        Ok(created.player)
    }

    async fn fetch_player(&self, player_id: &str) -> Result<PlayerStatus> {
        let resp = self
            .client
            .get(self.url(&["players", player_id]))
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn submit_guess(&self, player_id: &str, direction: Direction, current_price: f64) -> Result<()> {
        let body = GuessRequest { direction, current_price };
        let resp = self
            .client
            .post(self.url(&["players", player_id, "guess"]))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct ServerState {
        guesses: Arc<Mutex<Vec<(String, Value)>>>,
    }

    async fn spawn_server(state: ServerState) -> String {
        let app = Router::new()
            .route(
                "/btc/price",
                get(|| async {
                    Json(json!({"id": "q1", "price": 50000.5, "timestamp": "2024-05-01T10:00:00Z", "ageSeconds": 4, "isStale": false}))
                }),
            )
            .route(
                "/players",
                post(|| async { Json(json!({"player": {"playerId": "p-new", "score": 0}})) }),
            )
            .route(
                "/players/:id",
                get(|Path(id): Path<String>| async move {
                    if id == "missing" {
                        return Err((StatusCode::NOT_FOUND, Json(json!({"error": "Player not found"}))));
                    }
                    Ok(Json(json!({"player": {"playerId": id, "score": 7}})))
                }),
            )
            .route(
                "/players/:id/guess",
                post(
                    |State(state): State<ServerState>, Path(id): Path<String>, Json(body): Json<Value>| async move {
                        if id == "busy" {
                            return Err((
                                StatusCode::CONFLICT,
                                Json(json!({"error": "Player already has a pending guess"})),
                            ));
                        }
                        if id == "broken" {
                            return Err((StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))));
                        }
                        state.guesses.lock().unwrap().push((id, body));
                        Ok(StatusCode::CREATED)
                    },
                ),
            )
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn fetches_price_and_player() {
        let base = spawn_server(ServerState::default()).await;
        let service = HttpGameService::new(base, None).unwrap();

        let quote = service.fetch_price().await.unwrap();
        assert_eq!(quote.price, 50000.5);
        assert_eq!(quote.age_seconds, Some(4.0));

        let player = service.create_player().await.unwrap();
        assert_eq!(player.player_id, "p-new");

        let status = service.fetch_player("p-new").await.unwrap();
        assert_eq!(status.player.score, 7);
        assert!(status.pending_guess.is_none());
    }

    #[tokio::test]
    async fn guess_posts_direction_and_current_price() {
        let state = ServerState::default();
        let base = spawn_server(state.clone()).await;
        let service = HttpGameService::new(base, None).unwrap();

        service.submit_guess("p-1", Direction::Up, 50000.0).await.unwrap();

        let guesses = state.guesses.lock().unwrap();
        assert_eq!(guesses.len(), 1);
        assert_eq!(guesses[0].0, "p-1");
        assert_eq!(guesses[0].1, json!({"direction": "UP", "currentPrice": 50000.0}));
    }

    #[tokio::test]
    async fn rejected_guess_carries_server_reason() {
        let base = spawn_server(ServerState::default()).await;
        let service = HttpGameService::new(base, None).unwrap();

        let err = service.submit_guess("busy", Direction::Down, 1.0).await.unwrap_err();
        assert!(matches!(err, AppError::Service { status: 409, .. }));
        assert_eq!(err.service_message(), Some("Player already has a pending guess"));

        let err = service.submit_guess("broken", Direction::Down, 1.0).await.unwrap_err();
        assert!(matches!(err, AppError::Service { status: 500, .. }));
        assert_eq!(err.service_message(), None);
    }

    #[tokio::test]
    async fn unknown_player_is_a_service_error() {
        let base = spawn_server(ServerState::default()).await;
        let service = HttpGameService::new(base, None).unwrap();

        let err = service.fetch_player("missing").await.unwrap_err();
        assert!(matches!(err, AppError::Service { status: 404, .. }));
    }

    #[tokio::test]
    async fn player_id_is_one_encoded_path_segment() {
        let state = ServerState::default();
        let base = spawn_server(state.clone()).await;
        let service = HttpGameService::new(base, None).unwrap();

        let status = service.fetch_player("a/b?c").await.unwrap();
        assert_eq!(status.player.player_id, "a/b?c");

        service.submit_guess("x/y", Direction::Up, 2.0).await.unwrap();
        assert_eq!(state.guesses.lock().unwrap()[0].0, "x/y");
    }

    #[test]
    fn service_url_must_parse() {
        assert!(matches!(HttpGameService::new("not a url", None), Err(AppError::Config(_))));
        assert!(matches!(HttpGameService::new("mailto:a@b.c", None), Err(AppError::Config(_))));
    }

    #[test]
    fn base_path_is_kept() {
        let service = HttpGameService::new("https://guru.example.com/api/", None).unwrap();
        assert_eq!(
            service.url(&["players", "p 1", "guess"]).as_str(),
            "https://guru.example.com/api/players/p%201/guess"
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = HttpGameService::new(format!("http://{addr}"), Some(Duration::from_secs(2))).unwrap();
        assert!(matches!(service.fetch_price().await, Err(AppError::Http(_))));
    }
}
