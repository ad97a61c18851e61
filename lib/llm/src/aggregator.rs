// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Latency collection and the end of run summary.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AggregateError {
    #[error("No request completed successfully; nothing to summarize")]
    EmptyResult,

    #[error("Elapsed wall clock time must be positive, got {0:?}")]
    InvalidElapsed(Duration),

    #[error("Latency record {index} has zero output tokens")]
    ZeroOutputTokens { index: usize },
}

/// One successful request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyRecord {
    pub prompt_token_count: usize,
    pub output_token_count: usize,
    /// Wall clock from the first attempt to the first successful response
    pub latency_seconds: f64,
}

impl LatencyRecord {
    pub fn new(prompt_token_count: usize, output_token_count: usize, latency: Duration) -> Self {
        Self {
            prompt_token_count,
            output_token_count,
            latency_seconds: latency.as_secs_f64(),
        }
    }

    pub fn total_token_count(&self) -> usize {
        self.prompt_token_count + self.output_token_count
    }
}

/// Append-only record sink shared by the dispatch tasks of one run.
///
/// Clones share the same underlying storage.
#[derive(Debug, Clone, Default)]
pub struct LatencyCollector {
    records: Arc<Mutex<Vec<LatencyRecord>>>,
}

impl LatencyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: LatencyRecord) {
        self.records.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Copy of the records collected so far, in completion order
    pub fn snapshot(&self) -> Vec<LatencyRecord> {
        self.records.lock().clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub total_time_seconds: f64,
    pub throughput_rps: f64,
    pub mean_latency_seconds: f64,
    pub mean_latency_per_token_seconds: f64,
    pub mean_latency_per_output_token_seconds: f64,
    pub completed: usize,
    pub failed: usize,
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total time: {:.2} s", self.total_time_seconds)?;
        writeln!(f, "Throughput: {:.2} requests/s", self.throughput_rps)?;
        writeln!(f, "Average latency: {:.2} s", self.mean_latency_seconds)?;
        writeln!(
            f,
            "Average latency per token: {:.2} s",
            self.mean_latency_per_token_seconds
        )?;
        write!(
            f,
            "Average latency per output token: {:.2} s",
            self.mean_latency_per_output_token_seconds
        )
    }
}

/// Summarize a finished run.
///
/// Throughput is computed over `sample_count`, the number of requests that were emitted, so
/// requests that failed still count towards the offered load. All means are plain arithmetic
/// means over `records`.
pub fn summarize(
    records: &[LatencyRecord],
    elapsed: Duration,
    sample_count: usize,
) -> Result<BenchmarkReport, AggregateError> {
    if records.is_empty() {
        return Err(AggregateError::EmptyResult);
    }
    if elapsed.is_zero() {
        return Err(AggregateError::InvalidElapsed(elapsed));
    }
    if let Some(index) = records.iter().position(|r| r.output_token_count == 0) {
        return Err(AggregateError::ZeroOutputTokens { index });
    }

    let n = records.len() as f64;
    let mut latency = 0.0;
    let mut per_token = 0.0;
    let mut per_output_token = 0.0;
    for record in records {
        latency += record.latency_seconds;
        per_token += record.latency_seconds / record.total_token_count() as f64;
        per_output_token += record.latency_seconds / record.output_token_count as f64;
    }

    let total_time_seconds = elapsed.as_secs_f64();
    Ok(BenchmarkReport {
        total_time_seconds,
        throughput_rps: sample_count as f64 / total_time_seconds,
        mean_latency_seconds: latency / n,
        mean_latency_per_token_seconds: per_token / n,
        mean_latency_per_output_token_seconds: per_output_token / n,
        completed: records.len(),
        failed: sample_count.saturating_sub(records.len()),
    })
}
