use std::sync::Arc;

use legal_navigator::chat::{
    AppState, DemoTurnProcessor, PersistentTurnProcessor, TurnProcessor, chat_routes,
};
use legal_navigator::config::{DatabaseTarget, ServerConfig, ServerMode};
use legal_navigator::form::ConversationMachine;
use legal_navigator::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("⚖️  Legal Navigator v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Mode: {}", config.mode.as_str());

    let machine = ConversationMachine::appearance_form();

    // ── Turn processing ─────────────────────────────────────────────────
    let state = match config.mode {
        ServerMode::Demo => {
            eprintln!("   Database: none (demo)");
            let processor: Arc<dyn TurnProcessor> = Arc::new(DemoTurnProcessor::new(machine));
            AppState {
                processor,
                db: None,
                mode: config.mode,
            }
        }
        ServerMode::Live => {
            let db: Arc<dyn Database> = Arc::new(open_database(&config.database).await);
            let processor: Arc<dyn TurnProcessor> =
                Arc::new(PersistentTurnProcessor::new(Arc::clone(&db), machine));
            AppState {
                processor,
                db: Some(db),
                mode: config.mode,
            }
        }
    };

    let app = chat_routes(state, config.cors_origin.as_deref());

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("   Chat API: http://{addr}/api/chat");
    eprintln!("   PDF API: http://{addr}/api/generate-pdf\n");
    tracing::info!(addr = %addr, mode = config.mode.as_str(), "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Open the configured database, exiting if it cannot be reached.
async fn open_database(target: &DatabaseTarget) -> LibSqlBackend {
    let (result, description) = match target {
        DatabaseTarget::Local(path) => (
            LibSqlBackend::new_local(path).await,
            path.display().to_string(),
        ),
        DatabaseTarget::Remote { url, auth_token } => {
            (LibSqlBackend::new_remote(url, auth_token).await, url.clone())
        }
    };
    match result {
        Ok(db) => {
            eprintln!("   Database: {description}");
            db
        }
        Err(e) => {
            eprintln!("Error: Failed to open database at {description}: {e}");
            std::process::exit(1);
        }
    }
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived shutdown signal...");
}
