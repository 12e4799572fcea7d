use crate::{Error, Result, TableActions, TableQueries};
use fairdeal_types::{
    api::{CommitRequest, CommitStatus, Participants, RevealRequest, RevealStatus},
    GameState, TableId,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// HTTP client for a fairdeal table gateway.
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    client: reqwest::Client,
}

impl Client {
    /// Create a new client for the given gateway URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let scheme = base_url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(Error::InvalidScheme(scheme.to_string()));
        }

        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    fn table_url(&self, table: TableId, suffix: &str) -> Result<Url> {
        let path = if suffix.is_empty() {
            format!("table/{table}")
        } else {
            format!("table/{table}/{suffix}")
        };
        Ok(self.base_url.join(&path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::FailedWithBody { status, body });
        }
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize>(&self, url: Url, body: &B) -> Result<()> {
        debug!(%url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::FailedWithBody { status, body });
        }
        Ok(())
    }

    async fn post_empty(&self, url: Url) -> Result<()> {
        self.post_json(url, &serde_json::json!({})).await
    }
}

impl TableQueries for Client {
    type Error = Error;

    async fn game_state(&self, table: TableId) -> Result<GameState> {
        self.get_json(self.table_url(table, "")?).await
    }

    async fn commit_status(&self, table: TableId) -> Result<Vec<bool>> {
        let status: CommitStatus = self.get_json(self.table_url(table, "commits")?).await?;
        Ok(status.committed)
    }

    async fn reveal_status(&self, table: TableId) -> Result<Vec<bool>> {
        let status: RevealStatus = self.get_json(self.table_url(table, "reveals")?).await?;
        Ok(status.revealed)
    }

    async fn players_in_hand(&self, table: TableId) -> Result<Vec<u8>> {
        let roster: Participants =
            self.get_json(self.table_url(table, "participants")?).await?;
        Ok(roster.seats)
    }
}

impl TableActions for Client {
    async fn start_hand(&self, table: TableId) -> Result<()> {
        self.post_empty(self.table_url(table, "start")?).await
    }

    async fn submit_commit(&self, table: TableId, commitment: [u8; 32]) -> Result<()> {
        let body = CommitRequest {
            commitment: hex::encode(commitment),
        };
        self.post_json(self.table_url(table, "commit")?, &body).await
    }

    async fn reveal_secret(&self, table: TableId, payload: Vec<u8>) -> Result<()> {
        let body = RevealRequest {
            payload: hex::encode(payload),
        };
        self.post_json(self.table_url(table, "reveal")?, &body).await
    }

    async fn leave_table(&self, table: TableId) -> Result<()> {
        self.post_empty(self.table_url(table, "leave")?).await
    }

    async fn leave_after_hand(&self, table: TableId) -> Result<()> {
        self.post_empty(self.table_url(table, "leave-after-hand")?).await
    }

    async fn cancel_leave_after_hand(&self, table: TableId) -> Result<()> {
        self.post_empty(self.table_url(table, "leave-after-hand/cancel")?)
            .await
    }

    async fn sit_out(&self, table: TableId) -> Result<()> {
        self.post_empty(self.table_url(table, "sit-out")?).await
    }

    async fn sit_in(&self, table: TableId) -> Result<()> {
        self.post_empty(self.table_url(table, "sit-in")?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State as AxumState,
        http::StatusCode as AxumStatusCode,
        routing::{get, post},
        Json, Router,
    };
    use fairdeal_types::Phase;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tokio::time::{sleep, Duration};

    async fn serve_router(router: Router) -> (String, tokio::task::JoinHandle<()>) {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let actual_addr = listener.local_addr().unwrap();
        let base_url = format!("http://{actual_addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .unwrap();
        });

        sleep(Duration::from_millis(50)).await;
        (base_url, handle)
    }

    fn sample_state() -> GameState {
        GameState {
            phase: Phase::Commit,
            hand_number: 3,
            paused: false,
            seats: vec![],
            action_on: None,
        }
    }

    #[test]
    fn test_client_invalid_scheme() {
        let result = Client::new("ftp://example.com");
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(matches!(err, Error::InvalidScheme(_)));
            assert_eq!(
                err.to_string(),
                "invalid URL scheme: ftp (expected http or https)"
            );
        }

        assert!(Client::new("http://localhost:8080").is_ok());
        assert!(Client::new("https://localhost:8080").is_ok());
    }

    #[tokio::test]
    async fn test_queries_deserialize_gateway_responses() {
        let router = Router::new()
            .route("/table/7", get(|| async { Json(sample_state()) }))
            .route(
                "/table/7/commits",
                get(|| async {
                    Json(CommitStatus {
                        committed: vec![true, false],
                    })
                }),
            )
            .route(
                "/table/7/reveals",
                get(|| async {
                    Json(RevealStatus {
                        revealed: vec![false, false],
                    })
                }),
            )
            .route(
                "/table/7/participants",
                get(|| async { Json(Participants { seats: vec![0, 3] }) }),
            );

        let (base_url, handle) = serve_router(router).await;
        let client = Client::new(&base_url).unwrap();

        let state = client.game_state(7).await.unwrap();
        assert_eq!(state.phase, Phase::Commit);
        assert_eq!(state.hand_number, 3);

        assert_eq!(client.commit_status(7).await.unwrap(), vec![true, false]);
        assert_eq!(client.reveal_status(7).await.unwrap(), vec![false, false]);
        assert_eq!(client.players_in_hand(7).await.unwrap(), vec![0, 3]);

        handle.abort();
    }

    #[tokio::test]
    async fn test_submit_commit_sends_hex_commitment() {
        let seen: Arc<Mutex<Vec<CommitRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/table/1/commit",
                post(
                    |AxumState(seen): AxumState<Arc<Mutex<Vec<CommitRequest>>>>,
                     Json(body): Json<CommitRequest>| async move {
                        seen.lock().unwrap().push(body);
                        AxumStatusCode::OK
                    },
                ),
            )
            .with_state(seen.clone());

        let (base_url, handle) = serve_router(router).await;
        let client = Client::new(&base_url).unwrap();

        let commitment = [0xabu8; 32];
        client.submit_commit(1, commitment).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].commitment, hex::encode(commitment));

        handle.abort();
    }

    #[tokio::test]
    async fn test_reveal_sends_hex_payload() {
        let seen: Arc<Mutex<Vec<RevealRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/table/1/reveal",
                post(
                    |AxumState(seen): AxumState<Arc<Mutex<Vec<RevealRequest>>>>,
                     Json(body): Json<RevealRequest>| async move {
                        seen.lock().unwrap().push(body);
                        AxumStatusCode::OK
                    },
                ),
            )
            .with_state(seen.clone());

        let (base_url, handle) = serve_router(router).await;
        let client = Client::new(&base_url).unwrap();

        let payload = b"deadbeef".to_vec();
        client.reveal_secret(1, payload.clone()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].payload, hex::encode(payload));

        handle.abort();
    }

    #[tokio::test]
    async fn test_action_failure_carries_gateway_message() {
        let router = Router::new().route(
            "/table/9/start",
            post(|| async { (AxumStatusCode::CONFLICT, "hand already running") }),
        );

        let (base_url, handle) = serve_router(router).await;
        let client = Client::new(&base_url).unwrap();

        let err = client.start_hand(9).await.expect_err("start should fail");
        let Error::FailedWithBody { status, body } = err else {
            panic!("expected FailedWithBody, got {err:?}");
        };
        assert_eq!(status, reqwest::StatusCode::CONFLICT);
        assert_eq!(body, "hand already running");

        handle.abort();
    }
}
