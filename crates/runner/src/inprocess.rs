// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default in-process runner.

use crate::{EvalError, Evaluator, RunContext, RunState, RunnerError, TaskRunResult, TaskRunner};
use async_trait::async_trait;
use beast_core::{codec, Hash, TaskObject, Value};
use beast_storage::{tree, ObjectStore};
use std::sync::Arc;
use std::time::Instant;

/// Runs tasks inside the orchestrator process through an [`Evaluator`].
///
/// Evaluation happens on the blocking pool so a long computation cannot
/// stall the driver loop; cancellation is honored between resolution steps
/// and while the evaluation is in flight.
#[derive(Clone)]
pub struct InProcessRunner<E> {
    evaluator: E,
}

impl<E: Evaluator> InProcessRunner<E> {
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl<E: Evaluator> TaskRunner for InProcessRunner<E> {
    async fn execute(
        &self,
        store: Arc<dyn ObjectStore>,
        task_hash: &Hash,
        input_hashes: &[Hash],
        ctx: RunContext,
    ) -> Result<TaskRunResult, RunnerError> {
        let started = Instant::now();

        let task_bytes = store.read(task_hash).await?;
        let task: TaskObject =
            codec::from_slice(&task_bytes).map_err(|_| RunnerError::TaskCorrupt(*task_hash))?;

        let ir = store.read(&task.command_ir).await?;

        let mut inputs: Vec<Value> = Vec::with_capacity(input_hashes.len());
        for input_hash in input_hashes {
            if ctx.cancel.is_cancelled() {
                return Err(RunnerError::Cancelled);
            }
            let (_, value) = tree::dataset_read(store.as_ref(), input_hash).await?;
            inputs.push(value);
        }

        if ctx.cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        let evaluator = self.evaluator.clone();
        let eval = tokio::task::spawn_blocking(move || {
            let mut io = crate::EvalIo::default();
            let result = evaluator.evaluate(&ir, &inputs, &mut io);
            (result, io)
        });

        let (result, io) = tokio::select! {
            joined = eval => match joined {
                Ok(output) => output,
                Err(join_err) => {
                    return Ok(TaskRunResult {
                        state: RunState::Error { message: format!("evaluator panicked: {join_err}") },
                        duration_ms: elapsed_ms(started),
                    });
                }
            },
            () = ctx.cancel.cancelled() => return Err(RunnerError::Cancelled),
        };

        if !io.stdout.is_empty() {
            ctx.emit_stdout(io.stdout.clone()).await;
        }
        if !io.stderr.is_empty() {
            ctx.emit_stderr(io.stderr.clone()).await;
        }

        let state = match result {
            Ok(value) => {
                let output_hash = tree::dataset_write(store.as_ref(), &value).await?;
                RunState::Success { output_hash }
            }
            Err(EvalError::Exit(exit_code)) => RunState::Failed { exit_code },
            Err(EvalError::Fault(message)) => RunState::Error { message },
        };

        let duration_ms = elapsed_ms(started);
        tracing::debug!(task = %task_hash.short(), duration_ms, "task evaluated");
        Ok(TaskRunResult { state, duration_ms })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
#[path = "inprocess_tests.rs"]
mod tests;
