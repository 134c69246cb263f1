// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitcal API Server
//!
//! Calendar backend for a fitness-tracking app: accounts, revocable
//! token sessions and owner-scoped events.

use fitcal::{
    config::{Config, StorageBackend},
    db::{CredentialStore, FirestoreDb, MemoryStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, storage = ?config.storage, "Starting Fitcal API");

    if config.jwt_signing_key.is_none() {
        tracing::warn!("JWT_SECRET_KEY is not set; logins and authenticated routes will fail");
    }

    // One store handle for the life of the process
    let db: Arc<dyn CredentialStore> = match config.storage {
        StorageBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            tracing::info!(project = %config.gcp_project_id, "Firestore connected");
            Arc::new(db)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    match db.prune_revocations(chrono::Utc::now()).await {
        Ok(pruned) => tracing::info!(pruned, "Pruned expired revocations"),
        Err(e) => tracing::warn!(error = %e, "Failed to prune expired revocations"),
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
    });

    // Build router
    let app = fitcal::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fitcal=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
