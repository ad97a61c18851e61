// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Sends one record to the backend until it succeeds and records its end to end latency.
//!
//! A response body carrying an `error` field means the backend is overloaded or otherwise
//! unable to serve the request right now; the identical request is sent again. The recorded
//! latency runs from before the first attempt to the first successful response, so time spent
//! retrying is part of the measurement.

use std::sync::Arc;
use std::time::Duration;

use derive_builder::Builder;
use tokio::time::Instant;

use crate::aggregator::{LatencyCollector, LatencyRecord};
use crate::client::GenerateTransport;
use crate::dataset::DatasetRecord;
use crate::protocols::{Backend, GenerateOutcome, SamplingOptions};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("Response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Backend still reported an error after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl DispatchError {
    pub fn transport(err: impl Into<BoxError>) -> Self {
        DispatchError::Transport(err.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DispatchError::Transport(_))
    }
}

/// How failed attempts are retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Resends allowed after an application error; `None` retries until the backend succeeds
    pub max_application_retries: Option<u32>,
    pub application_backoff: Duration,
    /// Resends allowed after a network level failure
    pub max_transport_retries: u32,
    pub transport_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_application_retries: None,
            application_backoff: Duration::ZERO,
            max_transport_retries: 0,
            transport_backoff: Duration::from_secs(1),
        }
    }
}

/// Outcome of a successful dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatched {
    pub latency: LatencyRecord,
    /// POSTs issued, including the successful one
    pub attempts: u32,
}

#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct Dispatcher {
    transport: Arc<dyn GenerateTransport>,

    #[builder(setter(into))]
    api_url: String,

    #[builder(default)]
    backend: Backend,

    #[builder(default)]
    options: SamplingOptions,

    #[builder(default)]
    retry: RetryPolicy,

    /// Successful dispatches are appended here
    #[builder(default)]
    collector: LatencyCollector,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn collector(&self) -> &LatencyCollector {
        &self.collector
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn dispatch(&self, record: &DatasetRecord) -> Result<Dispatched, DispatchError> {
        let request = self.backend.build_request(record, &self.options);
        let start = Instant::now();

        let mut attempts: u32 = 0;
        let mut application_retries: u32 = 0;
        let mut transport_retries: u32 = 0;

        loop {
            attempts += 1;
            match self.transport.post(&self.api_url, &request).await {
                Ok(body) => match GenerateOutcome::classify(&body) {
                    GenerateOutcome::Complete => break,
                    GenerateOutcome::Retry(message) => {
                        if let Some(limit) = self.retry.max_application_retries
                            && application_retries >= limit
                        {
                            return Err(DispatchError::RetriesExhausted {
                                attempts,
                                last_error: message,
                            });
                        }
                        application_retries += 1;
                        tracing::debug!(
                            attempts,
                            error = %message,
                            "backend reported an error, resending"
                        );
                        pause(self.retry.application_backoff).await;
                    }
                },
                Err(err)
                    if err.is_transport() && transport_retries < self.retry.max_transport_retries =>
                {
                    transport_retries += 1;
                    tracing::warn!(
                        attempts,
                        retry = transport_retries,
                        max_retries = self.retry.max_transport_retries,
                        error = %err,
                        "request failed, retrying"
                    );
                    pause(self.retry.transport_backoff).await;
                }
                Err(err) => return Err(err),
            }
        }

        let latency = LatencyRecord::new(
            record.prompt_token_count,
            record.output_token_count,
            start.elapsed(),
        );
        self.collector.push(latency);

        Ok(Dispatched { latency, attempts })
    }
}

async fn pause(backoff: Duration) {
    if !backoff.is_zero() {
        tokio::time::sleep(backoff).await;
    }
}
