use std::future::Future;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;

/// Encode every metric of `registry` in the Prometheus text exposition format
pub fn render(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
}

async fn handle_metrics(State(registry): State<Registry>) -> Response {
    match render(&registry) {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("unable to encode metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

/// Build the router serving `registry` on `/metrics` and `/`
pub fn router(registry: Registry) -> Router {
    Router::new()
        .route("/", get(handle_metrics))
        .route("/metrics", get(handle_metrics))
        .with_state(registry)
}

/// Serve `registry` on `listener` until `shutdown` completes
pub async fn serve<F>(listener: TcpListener, registry: Registry, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("serving metrics on http://{}/metrics", addr);
    }
    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown)
        .await
}
