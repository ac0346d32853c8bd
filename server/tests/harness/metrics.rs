// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tallies for abuse simulation results.

use axum::http::StatusCode;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Collects response outcomes during a simulation.
#[derive(Debug, Default)]
pub struct FloodMetrics {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    /// Count of responses by status code
    statuses: HashMap<u16, usize>,
    /// Count of accepted submissions by peer
    accepted_per_ip: HashMap<String, usize>,
}

impl FloodMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Record one response.
    pub fn record(&mut self, status: StatusCode, ip: &str) {
        *self.statuses.entry(status.as_u16()).or_insert(0) += 1;
        if status == StatusCode::OK {
            *self.accepted_per_ip.entry(ip.to_string()).or_insert(0) += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.statuses.values().sum()
    }

    pub fn count(&self, status: StatusCode) -> usize {
        self.statuses.get(&status.as_u16()).copied().unwrap_or(0)
    }

    /// Most submissions accepted from any single peer.
    pub fn max_accepted_per_ip(&self) -> usize {
        self.accepted_per_ip.values().copied().max().unwrap_or(0)
    }

    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Get block rate (ratio of rejected to total).
    pub fn block_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (total - self.count(StatusCode::OK)) as f64 / total as f64
    }
}

impl std::fmt::Display for FloodMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Flood Report ===")?;
        writeln!(f, "Duration:        {} ms", self.duration().as_millis())?;
        writeln!(f, "Total Requests:  {}", self.total())?;
        writeln!(f, "Accepted (200):  {}", self.count(StatusCode::OK))?;
        writeln!(f, "Invalid (400):   {}", self.count(StatusCode::BAD_REQUEST))?;
        writeln!(f, "Limited (429):   {}", self.count(StatusCode::TOO_MANY_REQUESTS))?;
        writeln!(f, "Failed (500):    {}", self.count(StatusCode::INTERNAL_SERVER_ERROR))?;
        writeln!(f, "Block Rate:      {:.1}%", self.block_rate() * 100.0)?;
        Ok(())
    }
}
