// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Request arrival pacing.
//!
//! A finite workload is turned into a timed stream. With an infinite rate every item is emitted
//! back to back; with a finite rate the gap after each item is drawn from an exponential
//! distribution, which makes the arrivals a Poisson process. Pacing only delays the next
//! emission, never work that has already been handed out.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Invalid request rate '{0}': expected 'inf' or a positive number of requests per second")]
    InvalidRate(String),
}

/// Target arrival rate in requests per second
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RequestRate {
    /// Every request is sent at time zero
    #[default]
    Infinite,
    /// Poisson arrivals with this mean rate
    PerSecond(f64),
}

impl RequestRate {
    pub fn new(rate: f64) -> Result<Self, SchedulerError> {
        if rate == f64::INFINITY {
            Ok(RequestRate::Infinite)
        } else if rate.is_finite() && rate > 0.0 {
            Ok(RequestRate::PerSecond(rate))
        } else {
            Err(SchedulerError::InvalidRate(rate.to_string()))
        }
    }
}

impl FromStr for RequestRate {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rate: f64 = s
            .trim()
            .parse()
            .map_err(|_| SchedulerError::InvalidRate(s.to_string()))?;
        RequestRate::new(rate)
    }
}

impl fmt::Display for RequestRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestRate::Infinite => write!(f, "inf"),
            RequestRate::PerSecond(rate) => write!(f, "{rate}"),
        }
    }
}

/// Seeded source of inter-arrival delays.
///
/// Owned by the single driver that emits requests; it is never shared with dispatch tasks so a
/// given seed always reproduces the same arrival pattern.
#[derive(Debug)]
pub struct ArrivalSchedule {
    interval: Option<Exp<f64>>,
    rng: StdRng,
}

impl ArrivalSchedule {
    pub fn new(rate: RequestRate, seed: u64) -> Result<Self, SchedulerError> {
        let interval = match rate {
            RequestRate::Infinite => None,
            RequestRate::PerSecond(lambda) => Some(
                Exp::new(lambda).map_err(|_| SchedulerError::InvalidRate(lambda.to_string()))?,
            ),
        };
        Ok(Self {
            interval,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Delay before the next emission, `None` in burst mode.
    ///
    /// Draws too large for a `Duration` (vanishingly small rates) saturate to `Duration::MAX`.
    pub fn next_interval(&mut self) -> Option<Duration> {
        let exp = self.interval.as_ref()?;
        let secs = exp.sample(&mut self.rng);
        Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }

    /// Emit `items` in order, sleeping between emissions according to the rate.
    ///
    /// No delay follows the final item.
    pub fn arrivals<T>(mut self, items: Vec<T>) -> impl Stream<Item = T>
    where
        T: Send + 'static,
    {
        stream! {
            let total = items.len();
            for (index, item) in items.into_iter().enumerate() {
                yield item;

                if index + 1 == total {
                    break;
                }
                if let Some(delay) = self.next_interval() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
