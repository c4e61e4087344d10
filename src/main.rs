// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, sync::Arc};

use idp_auth::{
    api::router,
    auth::{HttpKeySetSource, KeyDirectory, TokenVerifier},
    config::{AuthSettings, LogFormat, ServerSettings},
    state::AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let server = ServerSettings::from_env()?;
    init_tracing(server.log_format);

    let auth = AuthSettings::from_env()?;
    info!(jwks_url = %auth.jwks_url, "Loaded authentication settings");

    let source = HttpKeySetSource::new(auth.jwks_url.clone(), auth.directory.fetch_timeout)?;
    let directory = Arc::new(KeyDirectory::new(Arc::new(source), auth.directory));

    // Warm the cache so the first request doesn't pay for the fetch.
    match directory.refresh().await {
        Ok(snapshot) => info!(keys = snapshot.len(), "Fetched identity provider signing keys"),
        Err(e) => warn!(error = %e, "Initial key set fetch failed; will retry on demand"),
    }

    let verifier = Arc::new(TokenVerifier::new(directory, auth.verifier));
    let app = router(AppState::new(verifier));

    let listener = TcpListener::bind(server.addr).await?;
    info!(addr = %server.addr, "IdP auth server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
