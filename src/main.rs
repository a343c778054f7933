//! Acta server
//!
//! Fills the reception and decommission acta templates with submitted form
//! data and serves the remembered service/model defaults.

use acta_overlay::config::Config;
use acta_overlay::server::{AppState, router};
use acta_overlay::store::RecordStore;
use acta_overlay::OverlayRenderer;
use acta_overlay::template::{TemplateCheck, TemplateSource, check_templates};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acta_overlay=debug,acta_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting acta server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Template directory: {}", config.templates.dir.display());
    tracing::info!("Floor policy: {:?}", config.render.floor_policy);

    let source: Box<dyn TemplateSource> = Box::new(config.template_source());
    for (report_type, check) in check_templates(source.as_ref()) {
        match check {
            TemplateCheck::Ready(report) => tracing::info!(
                report = %report_type,
                pages = report.page_count,
                version = %report.pdf_version,
                sha256 = %report.sha256,
                "template ready"
            ),
            TemplateCheck::Missing => {
                tracing::warn!(report = %report_type, "template missing, requests will get 404")
            }
            TemplateCheck::Unusable(reason) => {
                tracing::warn!(report = %report_type, %reason, "template unusable")
            }
        }
    }

    let store = config.record_store();
    tracing::info!("Record store mode: {}", store.mode());

    let renderer = OverlayRenderer::new(source).with_options(config.render);
    let app = router(AppState::new(renderer, store));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
