// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable name constants for centralized management across the codebase
//!
//! ## Organization
//!
//! Environment variables are organized by functional area:
//! - **Logging**: Log level, configuration file, output format
//! - **Runtime**: Tokio runtime configuration
//! - **Http**: Outbound HTTP client used to drive the target server

/// Logging and tracing environment variables
pub mod logging {
    /// Log level (e.g., "debug", "info", "warn", "error")
    pub const SERVEBENCH_LOG: &str = "SERVEBENCH_LOG";

    /// Path to logging configuration file
    pub const SERVEBENCH_LOGGING_CONFIG_PATH: &str = "SERVEBENCH_LOGGING_CONFIG_PATH";

    /// Enable JSONL logging format
    pub const SERVEBENCH_LOGGING_JSONL: &str = "SERVEBENCH_LOGGING_JSONL";

    /// Disable ANSI terminal colors in logs
    pub const SERVEBENCH_DISABLE_ANSI_LOGGING: &str = "SERVEBENCH_DISABLE_ANSI_LOGGING";

    /// Use local timezone for logging timestamps (default is UTC)
    pub const SERVEBENCH_LOG_USE_LOCAL_TZ: &str = "SERVEBENCH_LOG_USE_LOCAL_TZ";
}

/// Runtime configuration environment variables
pub mod runtime {
    /// Prefix shared by every runtime setting
    pub const SERVEBENCH_RUNTIME_PREFIX: &str = "SERVEBENCH_RUNTIME_";

    /// Number of async worker threads for Tokio runtime
    pub const SERVEBENCH_RUNTIME_NUM_WORKER_THREADS: &str = "SERVEBENCH_RUNTIME_NUM_WORKER_THREADS";

    /// Maximum number of blocking threads for Tokio runtime
    pub const SERVEBENCH_RUNTIME_MAX_BLOCKING_THREADS: &str =
        "SERVEBENCH_RUNTIME_MAX_BLOCKING_THREADS";
}

/// Outbound HTTP client environment variables
pub mod http {
    /// Total timeout for one generate call, in seconds
    pub const SERVEBENCH_HTTP_REQUEST_TIMEOUT_SECS: &str = "SERVEBENCH_HTTP_REQUEST_TIMEOUT_SECS";

    /// Idle connections kept per host
    pub const SERVEBENCH_HTTP_POOL_MAX_IDLE_PER_HOST: &str =
        "SERVEBENCH_HTTP_POOL_MAX_IDLE_PER_HOST";

    /// User-Agent header sent with every request
    pub const SERVEBENCH_HTTP_USER_AGENT: &str = "SERVEBENCH_HTTP_USER_AGENT";
}
