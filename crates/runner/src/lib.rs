// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! beast-runner: the external executor contract.
//!
//! The orchestrator never interprets command IR; it hands a task hash and
//! resolved input hashes to a [`TaskRunner`] and gets back an outcome. The
//! default [`InProcessRunner`] resolves the task's IR and input blobs,
//! evaluates through a pluggable [`Evaluator`], and stores the result.

mod inprocess;
#[cfg(any(test, feature = "test-support"))]
mod test_support;

pub use inprocess::InProcessRunner;
#[cfg(any(test, feature = "test-support"))]
pub use test_support::{FakeCall, FakeRunner, OpEvaluator, PlannedResult};

use async_trait::async_trait;
use beast_core::{Hash, Value};
use beast_storage::ObjectStore;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors from a runner that are not task outcomes.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("cancelled")]
    Cancelled,
    #[error("task blob {0} does not decode")]
    TaskCorrupt(Hash),
    #[error(transparent)]
    Storage(#[from] beast_core::Error),
}

/// Per-execution context handed to a runner.
#[derive(Clone)]
pub struct RunContext {
    /// Cooperative cancellation; runners must stop promptly when it fires.
    pub cancel: CancellationToken,
    /// Streaming stdout chunks, when the caller wants them.
    pub stdout: Option<mpsc::Sender<Vec<u8>>>,
    /// Streaming stderr chunks.
    pub stderr: Option<mpsc::Sender<Vec<u8>>>,
    /// The execution was forced past the cache.
    pub force: bool,
}

impl Default for RunContext {
    fn default() -> Self {
        Self { cancel: CancellationToken::new(), stdout: None, stderr: None, force: false }
    }
}

impl RunContext {
    async fn emit_stdout(&self, chunk: Vec<u8>) {
        if let Some(tx) = &self.stdout {
            let _ = tx.send(chunk).await;
        }
    }

    async fn emit_stderr(&self, chunk: Vec<u8>) {
        if let Some(tx) = &self.stderr {
            let _ = tx.send(chunk).await;
        }
    }
}

/// How one task run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    /// The task produced a value; its blob is already stored.
    Success { output_hash: Hash },
    /// The task body signalled failure (non-zero exit). Part of normal
    /// workflow, not an engine fault.
    Failed { exit_code: i32 },
    /// The executor itself broke.
    Error { message: String },
}

/// Result of one task run.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRunResult {
    pub state: RunState,
    pub duration_ms: u64,
}

/// Pluggable task executor.
#[async_trait]
pub trait TaskRunner: Clone + Send + Sync + 'static {
    /// Execute the task stored at `task_hash` against the given input
    /// value blobs, in declared order.
    async fn execute(
        &self,
        store: Arc<dyn ObjectStore>,
        task_hash: &Hash,
        input_hashes: &[Hash],
        ctx: RunContext,
    ) -> Result<TaskRunResult, RunnerError>;
}

/// The opaque evaluation primitive behind the default runner. An IR
/// interpreter plugs in here; the engine knows nothing about the bytes.
pub trait Evaluator: Clone + Send + Sync + 'static {
    fn evaluate(&self, ir: &[u8], inputs: &[Value], io: &mut EvalIo) -> Result<Value, EvalError>;
}

/// Output captured during evaluation, forwarded to the run context.
#[derive(Debug, Default)]
pub struct EvalIo {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl EvalIo {
    pub fn print(&mut self, line: &str) {
        self.stdout.extend_from_slice(line.as_bytes());
        self.stdout.push(b'\n');
    }

    pub fn eprint(&mut self, line: &str) {
        self.stderr.extend_from_slice(line.as_bytes());
        self.stderr.push(b'\n');
    }
}

/// Failure modes of an evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The task body failed; maps to a `failed` execution record.
    #[error("task exited with code {0}")]
    Exit(i32),
    /// The evaluator broke; maps to an `error` execution record.
    #[error("{0}")]
    Fault(String),
}
