use anyhow::Result;
use kmonitor::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    tracing::info!(version = version::VERSION, "Starting {}", version::NAME);

    let app_config = config::AppConfig::load()?;
    let cluster = cluster::ClusterConfig::resolve(app_config.cluster.kubeconfig.as_deref())?;
    let source = metrics_source::MetricsApiClient::new(
        &cluster,
        app_config.collection.fetch_timeout(),
    )?;
    tracing::info!(server = %cluster.server, "Metrics API client ready");

    let store = Arc::new(store::SnapshotStore::new());
    let collector = worker::Collector::new(
        Arc::new(source),
        worker::CollectorConfig {
            interval: app_config.collection.interval(),
            fetch_timeout: app_config.collection.fetch_timeout(),
        },
    );
    let publish_store = store.clone();
    let collector_handle = collector.start(move |snapshot| publish_store.publish(snapshot));

    let app = routes::app(store, app_config.server.request_timeout());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    routes::serve(
        listener,
        app,
        collector_handle,
        app_config.server.shutdown_grace(),
        shutdown_signal(),
    )
    .await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable; waiting for Ctrl+C only");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
