// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Form Server
//!
//! Submission endpoint for the contact form:
//!
//! - Per-submitter fixed-window hourly rate limiting
//! - Field validation shared with the form page
//! - Mail composition with header sanitization
//! - File, SMTP and sendmail delivery backends
//! - JSON responses with sanitized user-facing texts

pub mod config;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod message;
pub mod metrics;
pub mod pipeline;

pub use config::ServerConfig;
pub use handlers::{router, AppState};
pub use limiter::{Decision, RateLimiter};
pub use mailer::{DispatchError, MailTransport, Mailer};
pub use pipeline::{Outcome, SubmissionPipeline};
