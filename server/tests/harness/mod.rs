// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for driving the contact form router.
//!
//! Builds a router over a throwaway form document and lets tests submit
//! from arbitrary peer addresses.

#![allow(dead_code)]

pub mod fixture;
pub mod generators;
pub mod metrics;
