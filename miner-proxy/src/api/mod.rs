//! HTTP surface of the proxy.
//!
//! One route: `GET /?command=<name>`. A recognized name answers 200 with
//! a `{status, output}` envelope; a missing or unknown name answers 400
//! with `{error}` and never reaches a subprocess. HEAD answers 200 with
//! the JSON content type and no body regardless of the query; other
//! methods get a 405.

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::command::{CommandKind, Invocation};
use crate::config::Config;
use crate::enrich;
use crate::exec::{self, CommandOutcome};
use crate::net;

/// Shared application state for the request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Error payload for malformed requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
struct CommandQuery {
    command: Option<String>,
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    query: Option<Query<CommandQuery>>,
) -> Response {
    // HEAD answers 200 with the JSON content type and no body, no matter
    // what the query says.
    if method == Method::HEAD {
        return (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")])
            .into_response();
    }
    let Some(Query(query)) = query else {
        return bad_request("malformed query string");
    };
    let Some(name) = query.command else {
        return bad_request("command query parameter is required");
    };
    let Ok(kind) = CommandKind::from_str(&name) else {
        debug!(command = %name, "rejecting unknown command");
        return bad_request("invalid command");
    };

    let outcome = match kind.resolve(&state.config, SystemTime::now()) {
        Invocation::Health => CommandOutcome::success("ok"),
        Invocation::MyIp => match net::outbound_ipv4() {
            Ok(ip) => CommandOutcome::success(ip.to_string()),
            Err(e) => {
                warn!(error = %e, "could not determine outbound address");
                CommandOutcome::error(e.to_string())
            }
        },
        Invocation::Spawn(spec) => {
            let mut outcome = exec::run(&spec).await;
            enrich::apply(kind, &state.config, &mut outcome);
            outcome
        }
    };

    info!(command = %kind, status = ?outcome.status, "served command");
    (StatusCode::OK, Json(outcome)).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    let error = ErrorResponse {
        error: message.into(),
    };
    (StatusCode::BAD_REQUEST, Json(error)).into_response()
}

/// Build the proxy routes.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(dispatch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::net::SocketAddr;
    use tempfile::TempDir;

    async fn serve(config: Config) -> SocketAddr {
        let app = routes(AppState::new(config));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn config() -> Config {
        Config::parse_from(["miner-proxyd"])
    }

    async fn get_json(addr: SocketAddr, path: &str) -> (StatusCode, serde_json::Value) {
        let resp = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn health_works_without_a_miner_installed() {
        let addr = serve(config()).await;
        let (status, body) = get_json(addr, "/?command=health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["output"], "ok");
    }

    #[tokio::test]
    async fn missing_command_is_a_bad_request() {
        let addr = serve(config()).await;
        let (status, body) = get_json(addr, "/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_command_is_a_bad_request() {
        let addr = serve(config()).await;
        let (status, body) = get_json(addr, "/?command=reboot").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid command");
    }

    #[tokio::test]
    async fn command_names_are_case_sensitive() {
        let addr = serve(config()).await;
        let (status, _) = get_json(addr, "/?command=Health").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn check_executable_tracks_file_presence() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("overline_gpu_miner");
        std::fs::write(&exe, b"#!/bin/sh\n").unwrap();

        let mut cfg = config();
        cfg.miner_executable = exe.clone();
        let addr = serve(cfg).await;
        let (status, body) = get_json(addr, "/?command=check_executable").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert!(body["output"].as_str().unwrap().contains("overline_gpu_miner"));

        let mut cfg = config();
        cfg.miner_executable = dir.path().join("not_there");
        let addr = serve(cfg).await;
        let (_, body) = get_json(addr, "/?command=check_executable").await;
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn action_log_tails_the_configured_file() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("action.log");
        let lines: Vec<String> = (1..=25).map(|i| format!("action {i}")).collect();
        std::fs::write(&log, lines.join("\n")).unwrap();

        let mut cfg = config();
        cfg.action_log = log;
        let addr = serve(cfg).await;
        let (status, body) = get_json(addr, "/?command=action_log").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        let output = body["output"].as_str().unwrap();
        assert!(output.starts_with("action 6"));
        assert!(output.ends_with("action 25"));
    }

    #[tokio::test]
    async fn head_answers_with_json_content_type_and_no_body() {
        let addr = serve(config()).await;
        let client = reqwest::Client::new();
        let resp = client
            .head(format!("http://{addr}/?command=health"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(
            resp.headers()["content-type"].to_str().unwrap(),
            "application/json"
        );
        assert!(resp.bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bare_head_is_ok_without_a_command() {
        let addr = serve(config()).await;
        let client = reqwest::Client::new();
        let resp = client
            .head(format!("http://{addr}/"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(
            resp.headers()["content-type"].to_str().unwrap(),
            "application/json"
        );
        assert!(resp.bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn undecodable_query_still_gets_the_json_error_envelope() {
        let addr = serve(config()).await;
        // %FF decodes to a non-UTF-8 byte, which the query extractor
        // cannot deserialize.
        let resp = reqwest::get(format!("http://{addr}/?command=%FF"))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
        assert_eq!(
            resp.headers()["content-type"].to_str().unwrap(),
            "application/json"
        );
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "malformed query string");
    }

    #[tokio::test]
    async fn post_is_not_allowed() {
        let addr = serve(config()).await;
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://{addr}/?command=health"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 405);
    }
}
