use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paygate::config::Config;
use paygate::gateway::HttpStatusGateway;
use paygate::handlers;
use paygate::redirect::RedirectPolicy;
use paygate::session::SessionIssuer;
use paygate::settlement::SqliteSettlementStore;
use paygate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "paygate")]
#[command(about = "Payment-callback verification and session issuance service")]
struct Cli {
    /// Generate a fresh Ed25519 session signing key and exit
    #[arg(long)]
    generate_signing_key: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.generate_signing_key {
        let (seed, public) = SessionIssuer::generate_keypair();
        println!("SESSION_SIGNING_KEY={}", seed);
        println!("public key: {}", public);
        return;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paygate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    // A missing signing key is fatal to each settled callback, not to the
    // process: requests fail closed until the key is configured.
    let issuer = match SessionIssuer::from_config(&config.session) {
        Ok(issuer) => Some(Arc::new(issuer)),
        Err(e) => {
            tracing::error!("session issuer unavailable, settled callbacks will fail closed: {}", e);
            None
        }
    };

    let settlement = Arc::new(
        SqliteSettlementStore::open(&config.settlement_db_path)
            .expect("Failed to open settlement ledger"),
    );

    let redirects =
        RedirectPolicy::from_config(&config.redirects).expect("Invalid redirect configuration");

    let state = AppState {
        gateway_config: config.gateway.clone(),
        gateway: Arc::new(HttpStatusGateway::from_config(&config.gateway)),
        issuer,
        redirects,
        settlement,
    };

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Paygate server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
