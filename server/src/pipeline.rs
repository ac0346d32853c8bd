// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission pipeline.
//!
//! A submission is rate checked, then validated, then composed and handed
//! to the configured transport. Every path ends in exactly one [`Outcome`];
//! nothing is retried.

use crate::limiter::{Decision, RateLimiter};
use crate::mailer::{DispatchError, MailTransport};
use crate::message::compose;
use chrono::{DateTime, Utc};
use contact_form_common::{validate, Config, SubmissionRequest, ValidationResult};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Why an accepted submission was not delivered.
#[derive(Debug, Error)]
pub enum SendFailure {
    #[error("no recipients configured")]
    NoRecipients,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Terminal state of one submission.
#[derive(Debug)]
pub enum Outcome {
    Sent,
    Invalid(ValidationResult),
    RateLimited { retry_after: Duration },
    SendFailed(SendFailure),
}

impl Outcome {
    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Sent => "sent",
            Outcome::Invalid(_) => "invalid",
            Outcome::RateLimited { .. } => "rate_limited",
            Outcome::SendFailed(_) => "send_failed",
        }
    }
}

/// One request's view of the config, limiter and transport.
pub struct SubmissionPipeline<'a> {
    pub config: &'a Config,
    pub limiter: &'a RateLimiter,
    pub transport: &'a dyn MailTransport,
}

impl<'a> SubmissionPipeline<'a> {
    pub fn new(config: &'a Config, limiter: &'a RateLimiter, transport: &'a dyn MailTransport) -> Self {
        Self {
            config,
            limiter,
            transport,
        }
    }

    /// Run `request` from `identifier` through to a terminal outcome.
    ///
    /// The rate check runs first, so rejected and invalid submissions still
    /// count against the submitter's hourly allowance.
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Outcome {
        if let Decision::Denied { retry_after } = self.limiter.admit(identifier, now.timestamp()).await {
            info!(
                identifier,
                retry_after_secs = retry_after.as_secs(),
                "Submission rate limited"
            );
            return Outcome::RateLimited { retry_after };
        }

        let request = request.trimmed();
        let result = validate(&request, &self.config.rules);
        if !result.is_valid() {
            info!(identifier, invalid_fields = result.errors().len(), "Submission rejected");
            return Outcome::Invalid(result);
        }

        if self.config.mail.to.is_empty() {
            warn!("No recipients configured, dropping submission");
            return Outcome::SendFailed(SendFailure::NoRecipients);
        }

        let message = compose(&self.config.mail, &request, identifier, now);
        match self.transport.send(&message).await {
            Ok(()) => {
                info!(identifier, recipients = message.to.len(), "Submission sent");
                Outcome::Sent
            }
            Err(e) => {
                warn!(identifier, error = %e, "Mail dispatch failed");
                Outcome::SendFailed(e.into())
            }
        }
    }
}
