// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Benchmark driver.
//!
//! One driver consumes the arrival stream and spawns a task per record; pacing only delays the
//! driver, so requests already in flight are never held back by the schedule. Every task shares
//! the run's [`LatencyCollector`]. Once all tasks have joined the records are summarized.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use derive_builder::Builder;
use futures::StreamExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::aggregator::{AggregateError, BenchmarkReport, LatencyCollector, summarize};
use crate::client::GenerateTransport;
use crate::dataset::{DatasetError, DatasetRecord, LengthFilter, sample_requests};
use crate::dispatcher::{DispatchError, Dispatcher, RetryPolicy};
use crate::protocols::{Backend, GENERATE_PATH, SamplingOptions};
use crate::scheduler::{ArrivalSchedule, RequestRate, SchedulerError};
use crate::tokenizers::{self, TokenizerError};

#[derive(Debug, thiserror::Error)]
pub enum BenchmarkError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Builder, Validate)]
#[builder(build_fn(private, name = "build_internal"), setter(into))]
pub struct BenchmarkConfig {
    #[builder(default)]
    pub backend: Backend,

    #[builder(default = "\"localhost\".to_string()")]
    pub host: String,

    #[builder(default = "8000")]
    pub port: u16,

    /// Conversational JSON dataset
    pub dataset: PathBuf,

    /// Tokenizer file, directory or hub repository id
    pub tokenizer: String,

    #[builder(default = "tokenizers::DEFAULT_REVISION.to_string()")]
    pub tokenizer_revision: String,

    #[validate(range(min = 1))]
    #[builder(default = "1")]
    pub best_of: u32,

    #[builder(default)]
    pub use_beam_search: bool,

    #[validate(range(min = 1))]
    #[builder(default = "1000")]
    pub num_prompts: usize,

    #[builder(default)]
    pub request_rate: RequestRate,

    /// Seeds both the workload sampler and the arrival schedule
    #[builder(default)]
    pub seed: u64,

    #[builder(default)]
    pub retry: RetryPolicy,

    /// Cancel requests still outstanding after this long
    #[builder(default)]
    pub deadline: Option<Duration>,
}

impl BenchmarkConfig {
    pub fn builder() -> BenchmarkConfigBuilder {
        BenchmarkConfigBuilder::default()
    }

    pub fn api_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, GENERATE_PATH)
    }

    pub fn sampling_options(&self) -> SamplingOptions {
        SamplingOptions {
            best_of: self.best_of,
            use_beam_search: self.use_beam_search,
        }
    }

    pub fn validate_backend(&self) -> Result<(), BenchmarkError> {
        if self.use_beam_search && !self.backend.supports_beam_search() {
            return Err(BenchmarkError::Config(format!(
                "the {} backend does not support beam search",
                self.backend
            )));
        }
        Ok(())
    }
}

impl BenchmarkConfigBuilder {
    /// Build and validate the configuration
    pub fn build(&self) -> Result<BenchmarkConfig, BenchmarkError> {
        let config = self
            .build_internal()
            .map_err(|err| BenchmarkError::Config(err.to_string()))?;
        config
            .validate()
            .map_err(|err| BenchmarkError::Config(err.to_string()))?;
        config.validate_backend()?;
        Ok(config)
    }
}

impl fmt::Display for BenchmarkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "backend={}, url={}, dataset={}, tokenizer={}@{}, best_of={}, use_beam_search={}, \
             num_prompts={}, request_rate={}, seed={}",
            self.backend,
            self.api_url(),
            self.dataset.display(),
            self.tokenizer,
            self.tokenizer_revision,
            self.best_of,
            self.use_beam_search,
            self.num_prompts,
            self.request_rate,
            self.seed,
        )
    }
}

/// Resolve the tokenizer and sample `num_prompts` records from the dataset.
///
/// Tokenizing a large dataset is CPU bound and runs on the blocking pool.
pub async fn load_workload(config: &BenchmarkConfig) -> Result<Vec<DatasetRecord>, BenchmarkError> {
    let tokenizer =
        tokenizers::resolve_tokenizer(&config.tokenizer, &config.tokenizer_revision).await?;
    let path = config.dataset.clone();
    let count = config.num_prompts;
    let seed = config.seed;

    let workload = tokio::task::spawn_blocking(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        sample_requests(
            &path,
            count,
            tokenizer.as_ref(),
            &LengthFilter::default(),
            &mut rng,
        )
    })
    .await??;
    Ok(workload)
}

/// Drive `workload` against the backend and summarize the run.
///
/// A request that fails is logged and counted; it does not stop the run. The run only fails
/// when no request completed.
pub async fn run_benchmark(
    config: &BenchmarkConfig,
    workload: Vec<DatasetRecord>,
    transport: Arc<dyn GenerateTransport>,
) -> Result<BenchmarkReport, BenchmarkError> {
    let sample_count = workload.len();
    let collector = LatencyCollector::new();
    let dispatcher = Arc::new(
        Dispatcher::builder()
            .transport(transport)
            .api_url(config.api_url())
            .backend(config.backend)
            .options(config.sampling_options())
            .retry(config.retry.clone())
            .collector(collector.clone())
            .build()
            .map_err(|err| BenchmarkError::Config(err.to_string()))?,
    );
    let schedule = ArrivalSchedule::new(config.request_rate, config.seed)?;

    let cancel = CancellationToken::new();
    let deadline_timer = config.deadline.map(|deadline| {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            tracing::warn!(?deadline, "deadline reached, cancelling outstanding requests");
            token.cancel();
        })
    });

    tracing::info!(
        requests = sample_count,
        url = dispatcher.api_url(),
        rate = %config.request_rate,
        "starting benchmark"
    );

    let start = Instant::now();
    let mut tasks = JoinSet::new();
    let mut emitted = 0usize;
    let arrivals = schedule.arrivals(workload);
    tokio::pin!(arrivals);

    loop {
        let record = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = arrivals.next() => match next {
                Some(record) => record,
                None => break,
            },
        };
        emitted += 1;

        let dispatcher = dispatcher.clone();
        let token = cancel.clone();
        tasks.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = dispatcher.dispatch(&record) => Some(result),
            }
        });
    }

    let mut errors = 0usize;
    let mut cancelled = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(Ok(dispatched))) => {
                tracing::trace!(attempts = dispatched.attempts, "request completed");
            }
            Ok(Some(Err(err))) => {
                errors += 1;
                tracing::warn!(error = %err, "request failed");
            }
            Ok(None) => cancelled += 1,
            Err(err) => {
                errors += 1;
                tracing::error!(error = %err, "dispatch task panicked");
            }
        }
    }
    let elapsed = start.elapsed();

    if let Some(timer) = deadline_timer {
        timer.abort();
    }

    tracing::info!(
        completed = collector.len(),
        errors,
        cancelled,
        not_sent = sample_count - emitted,
        elapsed = ?elapsed,
        "benchmark finished"
    );

    let records = collector.snapshot();
    Ok(summarize(&records, elapsed, sample_count)?)
}
