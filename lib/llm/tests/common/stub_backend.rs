// SPDX-FileCopyrightText: Copyright (c) 2024-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! In-process `/generate` server for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// `{"error": ...}` for the first `n` calls, then a completion
    ErrorsThenSuccess { n: usize, status: StatusCode },
    /// A body that is not JSON
    Garbage,
}

struct StubState {
    reply: Reply,
    calls: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
}

pub struct StubBackend {
    addr: SocketAddr,
    state: Arc<StubState>,
    cancel: CancellationToken,
}

impl StubBackend {
    pub async fn start(reply: Reply) -> Self {
        let state = Arc::new(StubState {
            reply,
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/generate", post(generate))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
        });

        Self {
            addr,
            state,
            cancel,
        }
    }

    /// Always answers with a completion
    pub async fn healthy() -> Self {
        Self::start(Reply::ErrorsThenSuccess {
            n: 0,
            status: StatusCode::OK,
        })
        .await
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self) -> String {
        format!("http://{}/generate", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.state.bodies.lock().clone()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn generate(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let call = state.calls.fetch_add(1, Ordering::SeqCst);
    state.bodies.lock().push(body);

    match state.reply {
        Reply::ErrorsThenSuccess { n, status } if call < n => (
            status,
            Json(json!({"error": format!("server busy ({call})")})),
        )
            .into_response(),
        Reply::ErrorsThenSuccess { .. } => {
            (StatusCode::OK, Json(json!({"text": ["a completion"]}))).into_response()
        }
        Reply::Garbage => (StatusCode::OK, "<html>oops</html>").into_response(),
    }
}

/// A local address nothing is listening on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
