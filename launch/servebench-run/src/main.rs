// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use servebench_run::Flags;
use servebench_runtime::RuntimeConfig;

fn main() -> anyhow::Result<()> {
    servebench_runtime::logging::init();
    let flags = Flags::parse();

    let runtime_config = RuntimeConfig::from_settings()?;
    tracing::debug!(%runtime_config, "tokio runtime");
    let runtime = runtime_config.create_runtime()?;

    let report = runtime.block_on(servebench_run::run(flags))?;
    println!("{report}");
    Ok(())
}
