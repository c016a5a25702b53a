use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Json, Router,
        extract::{
            ConnectInfo, State, WebSocketUpgrade, ws::rejection::WebSocketUpgradeRejection,
        },
        http::{HeaderMap, Method, StatusCode, Uri},
        response::{IntoResponse, Response},
        routing::get,
    },
    bytes::Bytes,
    stubwire_engine::{HttpMatchEvent, MessagingEngine},
    stubwire_matching::Request,
    tokio::net::TcpListener,
    tower_http::trace::TraceLayer,
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use stubwire_metrics::{counter, gateway as gw_metrics, labels};

#[cfg(feature = "prometheus")]
use axum::http::header;

use crate::{state::GatewayState, ws::handle_connection};

/// Path of the liveness endpoint. Every other path is stub territory.
pub const HEALTH_PATH: &str = "/__health";

/// Path of the Prometheus scrape endpoint (`prometheus` feature).
pub const METRICS_PATH: &str = "/__metrics";

/// Build the gateway router.
///
/// `GET /__health` reports liveness and, with the `prometheus` feature,
/// `GET /__metrics` serves the scrape output. Any other request either
/// upgrades to a WebSocket channel or is reported to the message engine as a
/// plain HTTP request and answered with 404.
pub fn build_gateway_app(state: GatewayState) -> Router {
    let router = Router::new().route(HEALTH_PATH, get(health_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route(METRICS_PATH, get(metrics_handler));

    router
        .fallback(stub_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn start_gateway(
    state: GatewayState,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "stubwire listening");
    serve(listener, state, shutdown).await
}

/// Serve on an already-bound listener.
///
/// When `shutdown` resolves every open channel is closed so upgraded
/// connections do not hold the server open.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let closing: Arc<MessagingEngine> = Arc::clone(state.engine());
    let app = build_gateway_app(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.await;
        info!(
            channels = closing.channels().len(),
            "shutting down, closing channels"
        );
        closing.channels().clear();
    })
    .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let engine = state.engine();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "channels": engine.channels().open_count(),
        "messageStubs": engine.stubs().len(),
    }))
}

#[cfg(feature = "prometheus")]
async fn metrics_handler(State(state): State<GatewayState>) -> Response {
    match state.metrics() {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not enabled").into_response(),
    }
}

async fn stub_handler(
    State(state): State<GatewayState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = to_request(&method, &uri, &headers, &body);
    match upgrade {
        Ok(ws) => {
            debug!(remote = %remote_addr, url = %request.url, "ws: upgrade requested");
            ws.on_upgrade(move |socket| handle_connection(socket, state, request))
        },
        Err(_) => {
            debug!(
                remote = %remote_addr,
                method = %request.method,
                url = %request.url,
                "http request reported to message engine"
            );
            #[cfg(feature = "metrics")]
            counter!(gw_metrics::HTTP_REQUESTS_TOTAL, labels::METHOD => request.method.clone())
                .increment(1);
            let url = request.url.clone();
            state
                .engine()
                .after_http_match(&HttpMatchEvent::new(request, None))
                .await;
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "message": "No HTTP stub matched this request",
                    "url": url,
                })),
            )
                .into_response()
        },
    }
}

/// The engine's view of an axum request. Non-UTF-8 header values are skipped.
fn to_request(method: &Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) -> Request {
    let url = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let mut request = Request::new(method.as_str(), url);
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            request.add_header(name.as_str(), value);
        }
    }
    if !body.is_empty() {
        request.body = Some(String::from_utf8_lossy(body).into_owned());
    }
    request
}
