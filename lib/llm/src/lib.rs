// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Servebench LLM
//!
//! Load generator for LLM serving backends: samples a workload from a conversational dataset,
//! paces it with a burst or Poisson arrival process, dispatches every request concurrently with
//! retry on backend errors and reports throughput and latency.

pub mod aggregator;
pub mod benchmark;
pub mod client;
pub mod dataset;
pub mod dispatcher;
pub mod protocols;
pub mod scheduler;
pub mod tokenizers;

pub use aggregator::{BenchmarkReport, LatencyCollector, LatencyRecord};
pub use benchmark::{BenchmarkConfig, BenchmarkError, load_workload, run_benchmark};
pub use client::{ClientConfig, GenerateClient, GenerateTransport};
pub use dataset::DatasetRecord;
pub use dispatcher::{DispatchError, Dispatcher, RetryPolicy};
pub use protocols::Backend;
pub use scheduler::RequestRate;
