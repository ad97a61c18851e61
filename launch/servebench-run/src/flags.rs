// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use servebench_llm::{
    Backend, BenchmarkConfig, BenchmarkError, RequestRate, RetryPolicy,
    tokenizers::DEFAULT_REVISION,
};

/// Benchmark the online serving throughput of an LLM backend
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Flags {
    /// Backend request schema: vllm (a) or tgi (b)
    #[arg(long, default_value = "vllm")]
    pub backend: Backend,

    #[arg(long, default_value = "localhost")]
    pub host: String,

    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Path to the conversational JSON dataset
    #[arg(long)]
    pub dataset: PathBuf,

    /// Tokenizer file, directory containing tokenizer.json, or Hugging Face repository
    #[arg(long)]
    pub tokenizer: String,

    /// Hub revision when --tokenizer names a repository
    #[arg(long, default_value = DEFAULT_REVISION)]
    pub tokenizer_revision: String,

    /// Number of candidate generations per prompt
    #[arg(long, default_value_t = 1)]
    pub best_of: u32,

    #[arg(long)]
    pub use_beam_search: bool,

    /// Number of prompts to process
    #[arg(long, default_value_t = 1000)]
    pub num_prompts: usize,

    /// Requests per second. With "inf" every request is sent at time zero, otherwise arrivals
    /// follow a Poisson process with this rate.
    #[arg(long, default_value = "inf")]
    pub request_rate: RequestRate,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Resends after a backend error before the request is given up. Unlimited if unset.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Pause before resending after a backend error, e.g. "200ms"
    #[arg(long, value_parser = humantime::parse_duration, default_value = "0s")]
    pub retry_backoff: Duration,

    /// Resends after a connection or timeout failure
    #[arg(long, default_value_t = 0)]
    pub transport_retries: u32,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    pub transport_backoff: Duration,

    /// Cancel requests still outstanding after this long, e.g. "30m"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub deadline: Option<Duration>,

    /// Also write the report as JSON to this file
    #[arg(long)]
    pub output_json: Option<PathBuf>,
}

impl Flags {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_application_retries: self.max_retries,
            application_backoff: self.retry_backoff,
            max_transport_retries: self.transport_retries,
            transport_backoff: self.transport_backoff,
        }
    }

    pub fn benchmark_config(&self) -> Result<BenchmarkConfig, BenchmarkError> {
        BenchmarkConfig::builder()
            .backend(self.backend)
            .host(self.host.clone())
            .port(self.port)
            .dataset(self.dataset.clone())
            .tokenizer(self.tokenizer.clone())
            .tokenizer_revision(self.tokenizer_revision.clone())
            .best_of(self.best_of)
            .use_beam_search(self.use_beam_search)
            .num_prompts(self.num_prompts)
            .request_rate(self.request_rate)
            .seed(self.seed)
            .retry(self.retry_policy())
            .deadline(self.deadline)
            .build()
    }
}
