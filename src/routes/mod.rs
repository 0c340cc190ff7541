// HTTP routes

mod http;

use axum::http::{Method, header};
use axum::{Router, routing::get};
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::store::SnapshotStore;
use crate::worker::CollectorHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<SnapshotStore>,
}

/// Requests running longer than `request_timeout` are answered with `408 Request Timeout`.
pub fn app(store: Arc<SnapshotStore>, request_timeout: Duration) -> Router {
    let state = AppState { store };
    let router = Router::new()
        .route("/api/metrics", get(http::metrics_handler)) // GET, OPTIONS /api/metrics
        .route("/version", get(http::version_handler)) // GET /version
        .route("/healthz", get(http::healthz_handler)) // GET /healthz
        .route("/readyz", get(http::readyz_handler)); // GET /readyz
    with_middleware(router, request_timeout).with_state(state)
}

// The CORS layer answers every OPTIONS request itself (preflight or not) with 200 and an
// empty body, so OPTIONS never reaches a route.
fn with_middleware<S>(router: Router<S>, request_timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
}

/// Serves `app` until `signal` resolves, then shuts down in order: the collector stops and
/// its in-flight cycle finishes (requests are still served meanwhile), then open requests
/// drain for at most `grace`. Past the deadline the server is dropped with a warning.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    collector: CollectorHandle,
    grace: Duration,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = drain_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            collector.shutdown().await;
            result?;
            anyhow::bail!("HTTP server exited unexpectedly");
        }
        _ = signal => {
            tracing::info!("Received shutdown signal");
        }
    }

    let stop_collector = collector.shutdown();
    tokio::pin!(stop_collector);
    tokio::select! {
        result = &mut server => {
            stop_collector.await;
            result?;
            anyhow::bail!("HTTP server exited unexpectedly");
        }
        _ = &mut stop_collector => {}
    }

    let _ = drain_tx.send(());
    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => result?,
        Err(_) => {
            // Dropping the server future closes the listener; remaining connections die with the runtime.
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Graceful shutdown did not complete in time; forcing close"
            );
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
