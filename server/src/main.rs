// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Form Service
//!
//! Accepts form-encoded submissions, checks them against the shared form
//! document and relays accepted ones by mail.
//!
//! ## Configuration
//!
//! Process settings come from environment variables (a `.env` file is read
//! if present):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `CONTACT_CONFIG_PATH`: Shared form document (default: config/mailer.config.json)
//! - `SUBMIT_PATH`: Submission route (default: /submit)
//! - `RATE_STORE`: `file` or `memory` (default: file)
//! - `ALLOWED_ORIGINS`: Comma separated CORS origins (default: none)
//! - `METRICS_ENABLED`, `METRICS_PATH`: Prometheus endpoint (default: on, /metrics)
//!
//! Validation, limits, mail and texts live in the form document, which is
//! reloaded on every request.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_form_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(
        bind_addr = %config.bind_addr,
        config_path = %config.config_path.display(),
        submit_path = %config.submit_path,
        rate_store = ?config.rate_store,
        metrics = config.metrics.enabled,
        "Starting contact form service"
    );

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
