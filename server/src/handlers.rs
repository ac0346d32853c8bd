// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact form service.
//!
//! The shared form document is reloaded on every request, so edits take
//! effect without a restart. Responses are always JSON `{ok, message,
//! errors?}` and every text in them has been through the HTML sanitizer.

use crate::config::{RateStoreBackend, ServerConfig};
use crate::limiter::{BucketStore, FileBucketStore, MemoryBucketStore, RateLimiter};
use crate::mailer::Mailer;
use crate::metrics::Metrics;
use crate::pipeline::{Outcome, SubmissionPipeline};
use axum::{
    extract::{rejection::FormRejection, ConnectInfo, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use contact_form_common::config::MessagesConfig;
use contact_form_common::sanitize::sanitize_html;
use contact_form_common::{Config, SubmissionRequest, ValidationResult};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Shared application state.
pub struct AppState {
    pub config: ServerConfig,
    pub metrics: Metrics,
    /// Buckets for the in-process backend; unused with the file backend.
    pub memory_store: Arc<MemoryBucketStore>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> prometheus::Result<Self> {
        Ok(Self {
            config,
            metrics: Metrics::new()?,
            memory_store: Arc::new(MemoryBucketStore::new()),
        })
    }

    fn bucket_store(&self, form: &Config) -> Arc<dyn BucketStore> {
        match self.config.rate_store {
            RateStoreBackend::Memory => self.memory_store.clone(),
            RateStoreBackend::File => Arc::new(FileBucketStore::new(form.limits.rate_store_dir())),
        }
    }

    fn load_form_config(&self) -> Option<Config> {
        match Config::load(&self.config.config_path) {
            Ok(config) => Some(config),
            Err(e) => {
                error!(path = %self.config.config_path.display(), error = %e, "Failed to load form config");
                self.metrics.record("config_error");
                None
            }
        }
    }
}

/// Submission response body.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationResult>,
}

impl SubmitResponse {
    fn failed(message: &str) -> Self {
        Self {
            ok: false,
            message: sanitize_html(message),
            errors: None,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-form-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn config_unavailable() -> Response {
    let fallback = MessagesConfig::default();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(SubmitResponse::failed(&fallback.fail_html)),
    )
        .into_response()
}

/// The parts of the form document the page needs.
pub async fn client_config(State(state): State<Arc<AppState>>) -> Response {
    match state.load_form_config() {
        Some(config) => Json(config.client_view()).into_response(),
        None => config_unavailable(),
    }
}

/// Handle a form submission.
///
/// A body that is missing or cannot be decoded is judged as a submission
/// with every field empty.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    form: Result<Form<SubmissionRequest>, FormRejection>,
) -> Response {
    let identifier = addr.ip().to_string();
    let request = match form {
        Ok(Form(request)) => request,
        Err(e) => {
            debug!(identifier = %identifier, error = %e, "Unreadable form body, treating fields as empty");
            SubmissionRequest::default()
        }
    };

    let Some(config) = state.load_form_config() else {
        return config_unavailable();
    };

    let limiter = RateLimiter::new(state.bucket_store(&config), config.limits.rate_limit_per_hour);
    let mailer = Mailer::from_config(&config.mail);
    let outcome = SubmissionPipeline::new(&config, &limiter, &mailer)
        .submit(&request, &identifier, Utc::now())
        .await;

    state.metrics.record(outcome.label());
    respond(&config.messages, outcome)
}

/// Map a pipeline outcome to its HTTP response.
pub fn respond(messages: &MessagesConfig, outcome: Outcome) -> Response {
    match outcome {
        Outcome::Sent => (
            StatusCode::OK,
            Json(SubmitResponse {
                ok: true,
                message: sanitize_html(&messages.success_html),
                errors: None,
            }),
        )
            .into_response(),
        Outcome::Invalid(result) => (
            StatusCode::BAD_REQUEST,
            Json(SubmitResponse {
                ok: false,
                message: sanitize_html(&messages.bad_request_html),
                errors: Some(result.sanitized()),
            }),
        )
            .into_response(),
        Outcome::RateLimited { retry_after } => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.as_secs().to_string())],
            Json(SubmitResponse::failed(&messages.rate_html)),
        )
            .into_response(),
        Outcome::SendFailed(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SubmitResponse::failed(&messages.fail_html)),
        )
            .into_response(),
    }
}

/// Anything but POST on the submit path.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(SubmitResponse::failed("Method not allowed.")),
    )
        .into_response()
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(origin = %o, "Ignoring malformed allowed origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/config", get(client_config))
        .route(
            &state.config.submit_path,
            post(submit).fallback(method_not_allowed),
        );

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    let mut app = app.layer(TraceLayer::new_for_http());
    if !state.config.allowed_origins.is_empty() {
        app = app.layer(cors_layer(&state.config.allowed_origins));
    }

    app.with_state(state)
}
