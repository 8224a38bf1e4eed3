#![allow(dead_code, missing_docs, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rstest::fixture;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;

pub const CLIENT_ID: &str = "daemon";
pub const CLIENT_SECRET: &str = "s3cr3t";
pub const VALID_CODE: &str = "GOOD-CODE";

pub fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

/// Builds an unsigned JWT carrying the given claims.
pub fn jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT","kid":"test-key"}"#);
    let claims = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{claims}.c2lnbmF0dXJl")
}

type Recorded = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// A local OAuth2 token server.
///
/// - `POST /oauth2/token` issues tokens for [`CLIENT_ID`]/[`CLIENT_SECRET`] and [`VALID_CODE`],
/// - `POST /moved/token` redirects to the real endpoint.
#[derive(Debug)]
pub struct TokenServer {
    base_uri: String,
    requests: Recorded,
    handle: JoinHandle<()>,
}

impl TokenServer {
    pub async fn start() -> anyhow::Result<Self> {
        let requests = Recorded::default();
        let app = Router::new()
            .route("/oauth2/token", post(issue_token))
            .route("/moved/token", post(moved))
            .with_state(Arc::clone(&requests));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("binding token server")?;
        let addr = listener.local_addr()?;
        info!(%addr, "token server listening");

        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                tracing::error!(%error, "token server stopped");
            }
        });

        Ok(Self {
            base_uri: format!("http://{addr}"),
            requests,
            handle,
        })
    }

    /// The service URI of the issuing endpoint.
    pub fn service_uri(&self) -> String {
        format!("{}/oauth2", self.base_uri)
    }

    /// A service URI whose token endpoint answers with a redirection.
    pub fn moved_service_uri(&self) -> String {
        format!("{}/moved/", self.base_uri)
    }

    /// The forms received so far.
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests().len()
    }
}

impl Drop for TokenServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[fixture]
pub async fn token_server() -> TokenServer {
    init_tracing();
    match TokenServer::start().await {
        Ok(server) => server,
        Err(error) => {
            panic!("fail to start token server: {error:?}");
        }
    }
}

async fn issue_token(
    State(requests): State<Recorded>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let count = {
        let mut requests = requests.lock().unwrap_or_else(PoisonError::into_inner);
        requests.push(form.clone());
        requests.len()
    };
    let field = |name: &str| form.get(name).map(String::as_str);

    if field("client_id") != Some(CLIENT_ID) || field("client_secret") != Some(CLIENT_SECRET) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "invalid_client",
                "error_description": "Client authentication failed",
            })),
        )
            .into_response();
    }

    match field("grant_type") {
        Some("client_credentials") => Json(json!({
            "token_type": "Bearer",
            "access_token": format!("cc-token-{count}"),
            "expires_in": 3600,
            "scope": field("scope"),
        }))
        .into_response(),
        Some("authorization_code") if field("code") == Some(VALID_CODE) => {
            let access_token = jwt(&json!({
                "iss": "http://127.0.0.1",
                "sub": "alice",
                "aud": ["orders", "profile"],
                "exp": 1_900_000_000,
            }));
            // some servers send the lifetime as a string
            Json(json!({
                "token_type": "Bearer",
                "access_token": access_token,
                "expires_in": "1800",
            }))
            .into_response()
        }
        Some("authorization_code") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        )
            .into_response(),
    }
}

async fn moved() -> Redirect {
    Redirect::temporary("/oauth2/token")
}
