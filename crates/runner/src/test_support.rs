// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes for other crates' tests.

use crate::{
    EvalError, EvalIo, Evaluator, RunContext, RunState, RunnerError, TaskRunResult, TaskRunner,
};
use async_trait::async_trait;
use beast_core::{codec, Hash, Value};
use beast_storage::{tree, ObjectStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Arithmetic evaluator for tests. The IR is a beast2-encoded struct:
///
/// `{op: "const", arg: v}` returns `arg`;
/// `{op: "scale", arg: n}` returns `input0 * n`;
/// `{op: "sum"}` / `{op: "product"}` fold integer inputs;
/// `{op: "fail", arg: code}` exits non-zero;
/// `{op: "fault", arg: msg}` raises;
/// an optional `say` field is printed to stdout first.
#[derive(Clone, Default)]
pub struct OpEvaluator {
    evaluations: Arc<AtomicUsize>,
}

impl OpEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `evaluate` actually ran. Cache hits never increment
    /// this.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    /// Encode an IR struct for [`OpEvaluator`].
    pub fn ir(op: &str, arg: Option<Value>) -> Vec<u8> {
        let mut fields = indexmap::IndexMap::new();
        fields.insert("op".to_string(), Value::String(op.to_string()));
        if let Some(arg) = arg {
            fields.insert("arg".to_string(), arg);
        }
        // Encoding a plain value map cannot fail
        codec::to_vec(&Value::Struct(fields)).unwrap_or_default()
    }

    fn ints(inputs: &[Value]) -> Result<Vec<i64>, EvalError> {
        inputs
            .iter()
            .map(|value| {
                value.as_int().ok_or_else(|| {
                    EvalError::Fault(format!("expected integer input, got {:?}", value.value_type()))
                })
            })
            .collect()
    }
}

impl Evaluator for OpEvaluator {
    fn evaluate(&self, ir: &[u8], inputs: &[Value], io: &mut EvalIo) -> Result<Value, EvalError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);

        let ir = codec::decode_value(ir)
            .map_err(|err| EvalError::Fault(format!("undecodable ir: {err}")))?;
        let op = ir
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| EvalError::Fault("ir has no op".to_string()))?;

        if let Some(text) = ir.get("say").and_then(Value::as_str) {
            io.print(text);
        }

        match op {
            "const" => ir
                .get("arg")
                .cloned()
                .ok_or_else(|| EvalError::Fault("const without arg".to_string())),
            "scale" => {
                let factor = ir
                    .get("arg")
                    .and_then(Value::as_int)
                    .ok_or_else(|| EvalError::Fault("scale without integer arg".to_string()))?;
                let ints = Self::ints(inputs)?;
                let first = ints
                    .first()
                    .ok_or_else(|| EvalError::Fault("scale needs one input".to_string()))?;
                Ok(Value::Int(first * factor))
            }
            "sum" => Ok(Value::Int(Self::ints(inputs)?.iter().sum())),
            "product" => Ok(Value::Int(Self::ints(inputs)?.iter().product())),
            "fail" => {
                let code = ir.get("arg").and_then(Value::as_int).unwrap_or(1);
                io.eprint("task failed");
                Err(EvalError::Exit(code as i32))
            }
            "fault" => {
                let message =
                    ir.get("arg").and_then(Value::as_str).unwrap_or("fault").to_string();
                Err(EvalError::Fault(message))
            }
            other => Err(EvalError::Fault(format!("unknown op {other:?}"))),
        }
    }
}

/// What a [`FakeRunner`] should do for a given task.
#[derive(Debug, Clone)]
pub enum PlannedResult {
    /// Store this value and succeed.
    Success(Value),
    Failed(i32),
    Error(String),
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct FakeCall {
    pub task_hash: Hash,
    pub input_hashes: Vec<Hash>,
    pub force: bool,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<FakeCall>,
    planned: HashMap<Hash, PlannedResult>,
}

/// Scripted runner for orchestrator tests: records every invocation and
/// returns the planned outcome for the task (default: success with `0`).
#[derive(Clone, Default)]
pub struct FakeRunner {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self, task_hash: Hash, result: PlannedResult) {
        self.inner.lock().planned.insert(task_hash, result);
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }
}

#[async_trait]
impl TaskRunner for FakeRunner {
    async fn execute(
        &self,
        store: Arc<dyn ObjectStore>,
        task_hash: &Hash,
        input_hashes: &[Hash],
        ctx: RunContext,
    ) -> Result<TaskRunResult, RunnerError> {
        if ctx.cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }
        let planned = {
            let mut state = self.inner.lock();
            state.calls.push(FakeCall {
                task_hash: *task_hash,
                input_hashes: input_hashes.to_vec(),
                force: ctx.force,
            });
            state.planned.get(task_hash).cloned()
        };
        let state = match planned.unwrap_or(PlannedResult::Success(Value::Int(0))) {
            PlannedResult::Success(value) => {
                let output_hash = tree::dataset_write(store.as_ref(), &value).await?;
                RunState::Success { output_hash }
            }
            PlannedResult::Failed(exit_code) => RunState::Failed { exit_code },
            PlannedResult::Error(message) => RunState::Error { message },
        };
        Ok(TaskRunResult { state, duration_ms: 0 })
    }
}
