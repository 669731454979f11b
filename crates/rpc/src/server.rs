use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ensgw_alias_registry::{AliasClaim, AliasError, AliasRegistry};
use ensgw_gateway::{CcipGateway, GatewayError};
use ensgw_types::{decode_address, encode_address, Address, AliasEntry};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<CcipGateway>,
    pub registry: Arc<AliasRegistry>,
    pub start_time: Instant,
    pub req_count: Arc<AtomicUsize>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(gateway: Arc<CcipGateway>, registry: Arc<AliasRegistry>) -> Self {
        Self {
            gateway,
            registry,
            start_time: Instant::now(),
            req_count: Arc::new(AtomicUsize::new(0)),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    signer: String,
    uptime_secs: u64,
    req_total: u64,
}

#[derive(Debug, Deserialize)]
struct CcipPostRequest {
    sender: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct CcipResponse {
    data: String,
}

#[derive(Debug, Serialize)]
struct AliasEntryView {
    address: String,
    alias: String,
}

impl From<AliasEntry> for AliasEntryView {
    fn from(entry: AliasEntry) -> Self {
        Self {
            address: encode_address(&entry.address),
            alias: entry.alias,
        }
    }
}

/// JSON body shape of an error.
///
/// CCIP-Read clients read `message`; the alias UI reads `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorShape {
    Message,
    Error,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
    shape: ErrorShape,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
            shape: ErrorShape::Error,
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    fn ccip(mut self) -> Self {
        self.shape = ErrorShape::Message;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.shape {
            ErrorShape::Message => serde_json::json!({ "message": self.message }),
            ErrorShape::Error => serde_json::json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let api = if err.is_client_error() {
            ApiError::bad_request(err.to_string())
        } else if err.is_unavailable() {
            ApiError::service_unavailable(err.to_string())
        } else {
            ApiError::internal(err.to_string())
        };
        api.ccip()
    }
}

impl From<AliasError> for ApiError {
    fn from(err: AliasError) -> Self {
        match err {
            AliasError::NotAuthorized { .. } => ApiError::forbidden(err.to_string()),
            err if err.is_client_error() => ApiError::bad_request(err.to_string()),
            err if err.is_unavailable() => ApiError::service_unavailable(err.to_string()),
            err => ApiError::internal(err.to_string()),
        }
    }
}

pub async fn start_server<F>(state: AppState, addr: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!(
        "Gateway listening on {}",
        listener.local_addr().context("listener has no local address")?
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("RPC server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {addr}"))
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .route("/aliases", get(handle_list_aliases))
        .route(
            "/aliases/:address",
            get(handle_get_alias).post(handle_claim_alias),
        )
        .route("/", axum::routing::post(handle_ccip_post))
        .route("/:sender/:data", get(handle_ccip_get))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        signer: encode_address(&state.gateway.signer_address()),
        uptime_secs: state.uptime_seconds(),
        req_total,
    })
}

async fn handle_metrics(State(state): State<SharedState>) -> Response {
    let req_total = state.record_request();
    let uptime = state.uptime_seconds();

    let mut metrics =
        "# HELP ensgw_http_requests_total Total number of HTTP requests handled\n".to_string();
    metrics.push_str("# TYPE ensgw_http_requests_total counter\n");
    metrics.push_str(&format!("ensgw_http_requests_total {req_total}\n"));
    metrics.push_str("# HELP ensgw_uptime_seconds Uptime of the gateway in seconds\n");
    metrics.push_str("# TYPE ensgw_uptime_seconds gauge\n");
    metrics.push_str(&format!("ensgw_uptime_seconds {uptime}\n"));

    if let Some(handle) = &state.metrics {
        metrics.push_str(&handle.render());
    }

    let mut response = Response::new(Body::from(metrics));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}

async fn handle_ccip_get(
    State(state): State<SharedState>,
    AxumPath((sender, data)): AxumPath<(String, String)>,
) -> Result<Json<CcipResponse>, ApiError> {
    state.record_request();
    let data = data.strip_suffix(".json").unwrap_or(&data);
    answer_ccip(&state, &sender, data).await
}

async fn handle_ccip_post(
    State(state): State<SharedState>,
    body: Result<Json<CcipPostRequest>, JsonRejection>,
) -> Result<Json<CcipResponse>, ApiError> {
    state.record_request();
    let Json(request) = body.map_err(|err| ApiError::bad_request(err.body_text()).ccip())?;
    answer_ccip(&state, &request.sender, &request.data).await
}

async fn answer_ccip(
    state: &AppState,
    sender: &str,
    data: &str,
) -> Result<Json<CcipResponse>, ApiError> {
    let sender = parse_address(sender, "sender").map_err(ApiError::ccip)?;
    let calldata = parse_hex_bytes(data, "data").map_err(ApiError::ccip)?;

    let response = state.gateway.handle(&sender, &calldata).await?;
    debug!(%sender, valid_until = response.valid_until, "served CCIP-Read response");
    Ok(Json(CcipResponse {
        data: response.to_hex(),
    }))
}

async fn handle_list_aliases(
    State(state): State<SharedState>,
) -> Result<Json<Vec<AliasEntryView>>, ApiError> {
    state.record_request();
    let entries = state.registry.list().await?;
    Ok(Json(entries.into_iter().map(AliasEntryView::from).collect()))
}

async fn handle_get_alias(
    State(state): State<SharedState>,
    AxumPath(address): AxumPath<String>,
) -> Result<Json<Option<String>>, ApiError> {
    state.record_request();
    let owner = parse_address(&address, "address")?;
    Ok(Json(state.registry.alias_of(&owner).await?))
}

async fn handle_claim_alias(
    State(state): State<SharedState>,
    AxumPath(address): AxumPath<String>,
    body: Result<Json<AliasClaim>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    state.record_request();
    let owner = parse_address(&address, "address")?;
    let Json(claim) = body.map_err(|err| {
        warn!(error = %err, "rejected malformed alias claim body");
        ApiError::bad_request("alias and signature are required")
    })?;

    let alias = state
        .registry
        .claim(&owner, &claim.alias, &claim.signature)
        .await?;
    Ok(Json(alias))
}

fn parse_address(value: &str, field: &str) -> Result<Address, ApiError> {
    decode_address(value)
        .map_err(|err| ApiError::bad_request(format!("invalid {field}: {err}")))
}

fn parse_hex_bytes(value: &str, field: &str) -> Result<Vec<u8>, ApiError> {
    let normalized = value
        .trim()
        .strip_prefix("0x")
        .or_else(|| value.trim().strip_prefix("0X"))
        .ok_or_else(|| ApiError::bad_request(format!("invalid {field}: expected 0x-prefixed hex")))?;

    hex::decode(normalized)
        .map_err(|_| ApiError::bad_request(format!("invalid {field}: expected hex string")))
}
