//! HTTP transport: the web solve form, the JSON solve endpoint and MCP over
//! Streamable HTTP. Health and info are plain responses.

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager,
    tower::{StreamableHttpServerConfig, StreamableHttpService},
};
use serde::Deserialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::Result;
use crate::server::SavantServer;
use crate::service::{Solve, SolveResponse};

const SSE_KEEPALIVE: Duration = Duration::from_secs(15);

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Savant Optimizer</title>
<style>
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }
textarea { width: 100%; min-height: 8rem; }
pre { background: #f4f4f4; padding: 1rem; white-space: pre-wrap; }
</style>
</head>
<body>
<h1>Savant Optimizer</h1>
<form id="solve-form" method="post" action="/solve">
  <label for="problem_description">Problem description</label>
  <textarea id="problem_description" name="problem_description" required></textarea>
  <label for="additional_info">Additional information</label>
  <textarea id="additional_info" name="additional_info"></textarea>
  <button type="submit">Solve</button>
</form>
<div id="questions"></div>
<pre id="result"></pre>
<script>
document.getElementById("solve-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const body = {
    problem_description: document.getElementById("problem_description").value,
    additional_info: document.getElementById("additional_info").value,
  };
  const result = document.getElementById("result");
  const questions = document.getElementById("questions");
  result.textContent = "Solving...";
  questions.innerHTML = "";
  const response = await fetch("/solve", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(body),
  });
  const data = await response.json();
  if (data.needs_more_info) {
    const list = document.createElement("ol");
    for (const q of data.questions) {
      const item = document.createElement("li");
      item.textContent = q;
      list.appendChild(item);
    }
    questions.appendChild(list);
    result.textContent = data.log;
  } else if (data.detail) {
    result.textContent = data.detail.log;
  } else {
    result.textContent = data.solution;
  }
});
</script>
</body>
</html>
"#;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub solver: Arc<dyn Solve>,
    pub config: Arc<Config>,
}

/// Body of `POST /solve`, as JSON or an urlencoded form
#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    pub problem_description: String,
    #[serde(default)]
    pub additional_info: String,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "name": "savant",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.llm.model,
        "base_url": state.config.llm.base_url,
        "clingo_path": state.config.solver.clingo_path,
        "mcp_path": state.config.server.mcp_path,
    }))
}

fn error_response(error: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "detail": {
                "error": error,
                "log": format!("Error occurred while solving: {}", error),
            }
        })),
    )
        .into_response()
}

fn parse_solve_request(headers: &HeaderMap, body: &[u8]) -> std::result::Result<SolveRequest, String> {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    let request: SolveRequest = if is_form {
        serde_qs::from_bytes(body).map_err(|e| format!("Invalid form body: {}", e))?
    } else {
        serde_json::from_slice(body).map_err(|e| format!("Invalid JSON body: {}", e))?
    };
    if request.problem_description.trim().is_empty() {
        return Err("problem_description must not be empty".to_string());
    }
    Ok(request)
}

/// Solve endpoint
pub async fn solve_handler(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match parse_solve_request(&headers, &body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("rejected solve request: {}", e);
            return error_response(&e);
        }
    };

    let response = state
        .solver
        .solve(&request.problem_description, &request.additional_info)
        .await;

    match response {
        SolveResponse::NeedsMoreInfo { questions } => Json(json!({
            "needs_more_info": true,
            "questions": questions,
            "log": "Please provide more information to solve this problem.",
        }))
        .into_response(),
        SolveResponse::Solved { solution, .. } => Json(json!({
            "solution": solution,
            "log": "Problem solved successfully.",
        }))
        .into_response(),
        SolveResponse::Failed { error } => error_response(&error),
    }
}

/// Build the full application router: web routes plus MCP at the configured path
pub fn build_router(server: SavantServer) -> Router {
    let state = HttpState {
        solver: server.solver.clone(),
        config: server.config.clone(),
    };

    let path = server.config.server.mcp_path.clone();
    let session_mgr = Arc::new(LocalSessionManager::default());
    let server_factory = server.clone();
    let mcp_service: StreamableHttpService<SavantServer, _> = StreamableHttpService::new(
        move || Ok(server_factory.clone()),
        session_mgr,
        StreamableHttpServerConfig {
            stateful_mode: true,
            sse_keep_alive: Some(SSE_KEEPALIVE),
            ..Default::default()
        },
    );

    Router::new()
        .route("/", get(index_handler))
        .route("/solve", post(solve_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .nest_service(path.as_str(), mcp_service)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(
            |req: axum::http::Request<Body>, next: axum::middleware::Next| async move {
                let method = req.method().clone();
                let uri_path = req.uri().path().to_string();
                let start = std::time::Instant::now();
                let resp = next.run(req).await;
                tracing::info!(
                    %method,
                    path = %uri_path,
                    status = resp.status().as_u16(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "http request"
                );
                resp
            },
        ))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(server: SavantServer) -> Result<()> {
    let bind = server.config.bind_address();
    let mcp_path = server.config.server.mcp_path.clone();
    let app = build_router(server);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener on {}: {}", bind, e))?;

    tracing::info!("Starting web interface on {} (MCP at {})", bind, mcp_path);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
