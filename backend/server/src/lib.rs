//! Documentation of a raffle backend.
//!
//! Users pay an amount and receive unique 5-digit ticket numbers. An operator later draws the
//! winners from every issued number, optionally forcing specific numbers into the first places.
//!
//!
//!
//! # General Infrastructure
//! - Frontend talks to this server over JSON
//! - Server is stateless between requests, all shared state lives in the number store
//! - Store is either Redis (deployments) or an in-process map (local runs, tests)
//! - Ticket uniqueness is enforced by the store, the issuer's membership check is only a shortcut
//!
//!
//!
//! # Endpoints
//!
//! Issue tickets, one per full unit price paid.
//! ```text
//! POST /api/generate-number { "monto": 9000 }
//! 201 { "numbers": [48213, 10577, 93120] }
//! ```
//!
//! Draw winners. Manual placements are optional and may be `null`.
//! ```text
//! POST /api/realizar-sorteo { "cantidadGanadores": 3, "primerPuestoManual": 48213, "segundoPuestoManual": null }
//! 200 { "ganadores": [48213, 93120, 10577] }
//! ```
//!
//! List the pool.
//! ```text
//! GET /api/numbers
//! 200 { "numbers": [10577, 48213, 93120] }
//! ```
//!
//! Errors come back as 400 or 500 with `{ "message": "..." }`.
//!
//!
//!
//! # Notes
//!
//! ## Rejection sampling
//! New numbers are drawn at random and redrawn on collision. With 90,000 possible numbers
//! this stays cheap for any realistic raffle, but it degrades as the pool fills up. Each
//! ticket is capped at `RAFFLE_MAX_ATTEMPTS` candidates so a full pool fails instead of spinning.
//!
//! ## Repeat winners
//! Draws never mark numbers as claimed. Drawing twice can return the same winners.
//!
//!
//!
//! # Setup
//!
//! Run against Redis (default).
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 RUST_LOG=info cargo run -p raffle
//! ```
//!
//! Run with the in-memory store, nothing survives a restart.
//! ```sh
//! RAFFLE_STORE=memory RUST_LOG=info cargo run -p raffle
//! ```
//!
//! Hammer a running server and check the pool for duplicates.
//! ```sh
//! cargo run -p tester -- --requests 200 --concurrency 16 --amount 9000 --winners 3
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod draw;
pub mod error;
pub mod issuer;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;

use config::{Config, StoreKind};
use database::RedisStore;
use routes::{draw_handler, issue_handler, numbers_handler};
use state::AppState;
use store::{MemoryStore, NumberStore};

pub fn router<S: NumberStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/generate-number", post(issue_handler::<S>))
        .route("/api/realizar-sorteo", post(draw_handler::<S>))
        .route("/api/numbers", get(numbers_handler::<S>))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load();

    info!("Initializing state...");
    let app = match config.store {
        StoreKind::Memory => {
            warn!("Using in-memory store, tickets are lost on restart");
            build(&config, MemoryStore::new())
        }
        StoreKind::Redis => {
            info!("Connecting to Redis at {}", config.redis_url);
            let store = RedisStore::connect(&config.redis_url)
                .await
                .expect("Redis misconfigured!");
            build(&config, store)
        }
    };

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .expect("Failed to bind address");
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("Server shut down");
}

fn build<S: NumberStore>(config: &Config, store: S) -> Router {
    let state = AppState::new(config.raffle.clone(), store);

    let rules = state.draw_engine.config();
    info!(
        "Raffle rules: {} per ticket, numbers {}..={}, {} attempts per ticket",
        rules.unit_price, rules.min_number, rules.max_number, rules.max_attempts
    );

    router(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
