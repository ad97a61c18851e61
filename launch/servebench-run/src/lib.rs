// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use servebench_llm::{BenchmarkReport, GenerateClient, load_workload, run_benchmark};

mod flags;
pub use flags::Flags;

pub async fn run(flags: Flags) -> anyhow::Result<BenchmarkReport> {
    let config = flags.benchmark_config()?;
    tracing::info!(
        %config,
        retry = ?config.retry,
        deadline = ?config.deadline,
        "benchmark configuration"
    );

    //
    // Workload
    //

    let workload = load_workload(&config)
        .await
        .with_context(|| format!("preparing workload from {}", config.dataset.display()))?;

    //
    // Run
    //

    let client = GenerateClient::from_env()?;
    tracing::debug!(http = ?client.config(), "http client");
    let report = run_benchmark(&config, workload, Arc::new(client)).await?;

    if let Some(path) = &flags.output_json {
        write_report(path, &report)?;
        tracing::info!(path = %path.display(), "wrote report");
    }

    Ok(report)
}

/// Write the report as pretty printed JSON
pub fn write_report(path: &Path, report: &BenchmarkReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("writing report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_report() {
        let report = BenchmarkReport {
            total_time_seconds: 2.0,
            throughput_rps: 1.0,
            mean_latency_seconds: 1.5,
            mean_latency_per_token_seconds: 0.05,
            mean_latency_per_output_token_seconds: 0.1,
            completed: 2,
            failed: 0,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_report(&path, &report).unwrap();

        let written: BenchmarkReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, report);
    }

    #[test]
    fn test_write_report_missing_directory() {
        let report = BenchmarkReport {
            total_time_seconds: 1.0,
            throughput_rps: 1.0,
            mean_latency_seconds: 1.0,
            mean_latency_per_token_seconds: 0.1,
            mean_latency_per_output_token_seconds: 0.2,
            completed: 1,
            failed: 0,
        };
        let err = write_report(Path::new("/nonexistent/dir/report.json"), &report).unwrap_err();
        assert!(err.to_string().contains("writing report"));
    }
}
