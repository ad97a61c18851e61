// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport for the `/generate` endpoint

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use servebench_runtime::config::{env_parse, environment_names::http as env_http};

use crate::dispatcher::DispatchError;
use crate::protocols::GenerateRequest;

const DEFAULT_USER_AGENT: &str = "Benchmark Client";

/// Generation of long completions under load can take a very long time; the server reports
/// overload through the response body rather than by stalling.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 3 * 60 * 60;

const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub user_agent: String,
    /// Total timeout of a single POST, connect through body
    pub request_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = env_parse::<u64>(env_http::SERVEBENCH_HTTP_REQUEST_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(secs);
        }

        let pool_size = env_parse::<usize>(env_http::SERVEBENCH_HTTP_POOL_MAX_IDLE_PER_HOST);
        if let Some(pool_size) = pool_size {
            config.pool_max_idle_per_host = pool_size;
        }

        if let Ok(agent) = std::env::var(env_http::SERVEBENCH_HTTP_USER_AGENT)
            && !agent.is_empty()
        {
            config.user_agent = agent;
        }

        config
    }
}

/// Sends one generation request and returns the decoded body.
///
/// HTTP status codes are not interpreted: the backends report errors in the JSON body, which the
/// dispatcher inspects.
#[async_trait]
pub trait GenerateTransport: Send + Sync {
    async fn post(&self, url: &str, request: &GenerateRequest) -> Result<Value, DispatchError>;
}

pub struct GenerateClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl GenerateClient {
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(DispatchError::transport)?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, DispatchError> {
        Self::with_config(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl GenerateTransport for GenerateClient {
    async fn post(&self, url: &str, request: &GenerateRequest) -> Result<Value, DispatchError> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(DispatchError::transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(DispatchError::transport)?;
        tracing::trace!(%status, bytes = body.len(), "generate response");

        Ok(serde_json::from_slice(&body)?)
    }
}
