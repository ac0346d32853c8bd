// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Form Common
//!
//! Everything that must mean the same thing on the form page and on the
//! submission endpoint:
//!
//! - Config document model with documented defaults
//! - Rule compiler for ECMAScript-style patterns and flags
//! - Field validation with shared error texts
//! - HTML and mail-header sanitizers
//!
//! The crate does no network I/O and needs no async runtime.

pub mod config;
pub mod rules;
pub mod sanitize;
pub mod validator;

pub use config::{Config, ConfigError};
pub use rules::{compile, CompiledRules, Matcher, RuleError, RuleSpec};
pub use validator::{validate, Field, FormValidator, SubmissionRequest, ValidationResult};
