// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Servebench runtime: process-wide logging and Tokio runtime settings shared by the
//! benchmark library and its launcher.

pub mod config;
pub use config::RuntimeConfig;

pub mod logging;
