// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rule compiler.
//!
//! Rules live once, in the shared config document, as ECMAScript-style
//! pattern source plus a flag string. Every consumer compiles them through
//! [`compile`], so a pattern means the same thing on the form page and on the
//! submission endpoint.
//!
//! Dialect notes:
//! - `\d` and `\w` keep their ASCII meaning and `\b` is an ASCII word
//!   boundary, as in ECMAScript. `\B` stays Unicode-aware.
//! - Without `s`, `.` stops at every ECMAScript line terminator
//!   (`\n`, `\r`, U+2028, U+2029), not only at `\n`.
//! - Inside a class, a `-` is either a range operator or a literal, as in
//!   ECMAScript; `--` is never class difference. `[\b]` is a backspace.
//! - `\p{L}`, `\p{M}` and other Unicode property escapes are always
//!   available; the `u` flag is implied.
//! - `g` and `y` only affect stateful matching and are ignored.
//! - Look-around and back-references are not part of the dialect and fail
//!   to compile.

use crate::config::{FieldMessages, ValidationConfig};
use regex::{Regex, RegexBuilder};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;
use tracing::debug;

/// Phone pattern used when the document does not provide one.
pub const DEFAULT_PHONE_PATTERN: &str = r"^\+?\d{7,15}$";

/// URL heuristic used when the document does not provide one: a scheme or
/// `www.` prefix, or anything shaped like a domain name.
pub const DEFAULT_URL_PATTERN: &str = r"(?:https?:\/\/|www\.)\S+|(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+(?:[a-z]{2,}|xn--[a-z0-9-]{2,})";

/// Flags applied to the URL pattern when none are configured.
pub const DEFAULT_URL_FLAGS: &str = "i";

/// Letters, combining marks, apostrophe, hyphen, dot and whitespace; at
/// least two of them.
pub const NAME_PATTERN: &str = r"^[\p{L}\p{M}'\-\.\s]{2,}$";

/// Rule compilation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("unsupported regex flag {flag:?}")]
    UnsupportedFlag { flag: char },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A rule as stored in the config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub pattern: String,
    pub flags: String,
}

impl RuleSpec {
    pub fn new(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    /// Strip a legacy `/body/flags` wrapper if the pattern carries one.
    ///
    /// Flags written inside the wrapper win over the configured flags when
    /// they are non-empty.
    pub fn unwrapped(&self) -> RuleSpec {
        let pattern = self.pattern.as_str();
        if let Some(rest) = pattern.strip_prefix('/') {
            if let Some(end) = rest.rfind('/') {
                let suffix = &rest[end + 1..];
                if suffix.chars().all(|c| c.is_ascii_alphabetic()) {
                    let flags = if suffix.is_empty() {
                        self.flags.clone()
                    } else {
                        suffix.to_string()
                    };
                    return RuleSpec::new(&rest[..end], flags);
                }
            }
        }
        self.clone()
    }
}

/// Parsed flag set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_all: bool,
}

impl Flags {
    pub fn parse(flags: &str) -> Result<Self, RuleError> {
        let mut parsed = Flags::default();
        for flag in flags.chars() {
            match flag {
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_all = true,
                'u' | 'g' | 'y' => {}
                other => return Err(RuleError::UnsupportedFlag { flag: other }),
            }
        }
        Ok(parsed)
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub enum Matcher {
    Pattern(Regex),
    /// Structural email check used when no email pattern is configured.
    EmailShape,
}

impl Matcher {
    pub fn test(&self, input: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(input),
            Matcher::EmailShape => looks_like_email(input),
        }
    }
}

/// Compile a pattern and its flags into a [`Matcher`].
pub fn compile(pattern: &str, flags: &str) -> Result<Matcher, RuleError> {
    let spec = RuleSpec::new(pattern, flags).unwrapped();
    let parsed = Flags::parse(&spec.flags)?;
    let source = translate(&spec.pattern, parsed.dot_all);

    RegexBuilder::new(&source)
        .case_insensitive(parsed.case_insensitive)
        .multi_line(parsed.multi_line)
        .dot_matches_new_line(parsed.dot_all)
        .build()
        .map(Matcher::Pattern)
        .map_err(|e| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Rewrite ECMAScript syntax whose meaning differs in the `regex` crate.
fn translate(pattern: &str, dot_all: bool) -> String {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push('\\');
                    break;
                };
                match next {
                    'd' => out.push_str("[0-9]"),
                    'D' => out.push_str("[^0-9]"),
                    'w' => out.push_str("[0-9A-Za-z_]"),
                    'W' => out.push_str("[^0-9A-Za-z_]"),
                    'b' => out.push_str(r"(?-u:\b)"),
                    '/' => out.push('/'),
                    _ => {
                        out.push('\\');
                        out.push(next);
                    }
                }
            }
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
                translate_class(&mut chars, &mut out);
            }
            '.' if !dot_all => out.push_str(r"[^\n\r\x{2028}\x{2029}]"),
            _ => out.push(c),
        }
    }

    out
}

/// Copy one class body up to and including its `]`.
///
/// Every `-` that is not a range operator is escaped, so `regex` never
/// reads `--` as set difference. `[`, `&` and `~` are literal here too.
fn translate_class(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    // an atom that may open a range was just written
    let mut range_start = false;
    // a range operator was just written
    let mut range_open = false;

    while let Some(c) = chars.next() {
        match c {
            ']' => {
                out.push(']');
                return;
            }
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push('\\');
                    return;
                };
                match next {
                    'd' => out.push_str("0-9"),
                    'w' => out.push_str("0-9A-Za-z_"),
                    'D' => out.push_str("[^0-9]"),
                    'W' => out.push_str("[^0-9A-Za-z_]"),
                    // backspace inside a class
                    'b' => out.push_str(r"\x08"),
                    '/' => out.push('/'),
                    _ => {
                        out.push('\\');
                        out.push(next);
                    }
                }
                if matches!(next, 'd' | 'w' | 'D' | 'W' | 's' | 'S' | 'p' | 'P') {
                    range_start = false;
                    range_open = false;
                } else {
                    atom(&mut range_start, &mut range_open);
                }
            }
            '-' if range_start && chars.peek() != Some(&']') => {
                out.push('-');
                range_start = false;
                range_open = true;
            }
            '-' | '[' | '&' | '~' => {
                out.push('\\');
                out.push(c);
                atom(&mut range_start, &mut range_open);
            }
            _ => {
                out.push(c);
                atom(&mut range_start, &mut range_open);
            }
        }
    }
}

/// Record a class atom: it completes an open range, or may start one.
fn atom(range_start: &mut bool, range_open: &mut bool) {
    *range_start = !*range_open;
    *range_open = false;
}

fn looks_like_email(input: &str) -> bool {
    if input.chars().any(char::is_whitespace) {
        return false;
    }
    match input.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Every rule the validation engine needs, compiled once per config load.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub name: Matcher,
    pub email: Matcher,
    pub phone: Matcher,
    pub url: Matcher,
    pub min_message_length: usize,
    pub require_phone: bool,
    pub block_urls: bool,
    pub messages: FieldMessages,
}

/// Which configured rule failed to compile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {field} rule: {source}")]
pub struct RuleCompileError {
    pub field: &'static str,
    #[source]
    pub source: RuleError,
}

impl CompiledRules {
    pub fn compile(
        validation: &ValidationConfig,
        messages: &FieldMessages,
    ) -> Result<Self, RuleCompileError> {
        let name = compile(NAME_PATTERN, "u").map_err(|source| RuleCompileError {
            field: "name",
            source,
        })?;

        let email = match configured(&validation.email_regex) {
            Some(pattern) => compile(pattern, flags_or(&validation.email_regex_flags, ""))
                .map_err(|source| RuleCompileError {
                    field: "email",
                    source,
                })?,
            None => {
                debug!("No email pattern configured, using structural check");
                Matcher::EmailShape
            }
        };

        let phone = compile(
            configured(&validation.phone_regex).unwrap_or(DEFAULT_PHONE_PATTERN),
            flags_or(&validation.phone_regex_flags, ""),
        )
        .map_err(|source| RuleCompileError {
            field: "phone",
            source,
        })?;

        let url = compile(
            configured(&validation.url_regex).unwrap_or(DEFAULT_URL_PATTERN),
            flags_or(&validation.url_regex_flags, DEFAULT_URL_FLAGS),
        )
        .map_err(|source| RuleCompileError {
            field: "url",
            source,
        })?;

        Ok(Self {
            name,
            email,
            phone,
            url,
            min_message_length: validation.min_message_length,
            require_phone: validation.require_phone,
            block_urls: validation.block_urls,
            messages: messages.clone(),
        })
    }
}

fn configured(pattern: &Option<String>) -> Option<&str> {
    pattern.as_deref().filter(|p| !p.is_empty())
}

fn flags_or<'a>(flags: &'a Option<String>, default: &'a str) -> &'a str {
    flags.as_deref().unwrap_or(default)
}
