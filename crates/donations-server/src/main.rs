mod cleanup;
mod config;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use donations_api::forms_client::HttpFormsDirectory;
use donations_api::{AppState, AppStateInner};
use donations_db::Database;
use donations_ledger::{DetachedForms, DonationLedger, FormsDirectory, IntegrityKey};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "donations=debug,donations_api=debug,donations_ledger=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let db = Arc::new(Database::open(&config.db_path)?);

    let forms: Arc<dyn FormsDirectory> = match &config.forms_api_url {
        Some(url) => {
            info!("Forms directory at {}", url);
            Arc::new(HttpFormsDirectory::new(url.clone(), config.forms_api_key.clone()))
        }
        None => {
            warn!("DONATIONS_FORMS_API_URL unset; form names and entry write-through are disabled");
            Arc::new(DetachedForms)
        }
    };

    info!("{} donation form(s) configured", config.donation_forms.len());
    let ledger = DonationLedger::new(
        db,
        forms,
        config.donation_forms,
        config.trigger,
        IntegrityKey::new(&config.form_secret),
    );

    let state: AppState = Arc::new(AppStateInner {
        ledger,
        jwt_secret: config.jwt_secret,
        hook_secret: config.hook_secret,
        site: config.site,
    });

    if let Some(hours) = config.retention_hours {
        info!("Retention: {} hours", hours);
        tokio::spawn(cleanup::run_retention_loop(state.clone(), hours, 3600));
    }

    let router = app(state, &config.assets_dir);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Donations server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Ledger routes plus static assets. Pages, assets and mutations share one
/// origin, so no CORS layer is installed and browsers refuse cross-origin reads.
fn app(state: AppState, assets_dir: &Path) -> Router {
    donations_api::router(state)
        .nest_service("/assets", ServeDir::new(assets_dir))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
