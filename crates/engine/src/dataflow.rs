// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataflow orchestrator.
//!
//! A single cooperatively-scheduled driver owns the execution state behind
//! an async mutex; in-flight tasks are spawned units reporting back over a
//! completion channel, bounded by `concurrency`. Every state transition is
//! persisted before the loop continues, so a successor process can always
//! reconstruct the execution. Cancellation persists `cancelled` first, then
//! drains in-flight tasks; after the abort is observed no dataset mutation
//! reaches the workspace.

use crate::cache::{self, CacheDecision};
use crate::graph;
use crate::state_store::ExecutionStateStore;
use beast_core::{
    Clock, DataflowState, DataflowStatus, Error, ExecutionEvent, ExecutionId, ExecutionStatus,
    Hash, LockKind, Result, SequencedEvent, SystemClock, TaskStatus,
};
use beast_runner::{RunContext, RunState, RunnerError, TaskRunResult, TaskRunner};
use beast_storage::lock::LockHandle;
use beast_storage::{process, ExecutionStore, Repository};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Options for one execution.
pub struct DataflowOptions {
    pub concurrency: usize,
    /// Execute every task even on a cache hit.
    pub force: bool,
    /// Run only these tasks (plus their transitive dependencies).
    pub filter: Option<Vec<String>>,
    /// External abort signal; a fresh token is created when absent.
    pub cancel: Option<CancellationToken>,
    /// Adopt an already-held workspace lock instead of acquiring one.
    pub lock: Option<LockHandle>,
    /// Live event feed, in emission order.
    pub events: Option<mpsc::Sender<SequencedEvent>>,
    /// Task stdout chunks as `(task, bytes)`.
    pub stdout: Option<mpsc::Sender<(String, Vec<u8>)>>,
    /// Task stderr chunks as `(task, bytes)`.
    pub stderr: Option<mpsc::Sender<(String, Vec<u8>)>>,
}

impl Default for DataflowOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            force: false,
            filter: None,
            cancel: None,
            lock: None,
            events: None,
            stdout: None,
            stderr: None,
        }
    }
}

/// Handle to a running execution.
pub struct DataflowHandle {
    id: u64,
    workspace: String,
    store: Arc<dyn ExecutionStateStore>,
    cancel: CancellationToken,
    join: tokio::task::JoinHandle<Result<DataflowState>>,
}

impl std::fmt::Debug for DataflowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataflowHandle")
            .field("id", &self.id)
            .field("workspace", &self.workspace)
            .finish()
    }
}

impl DataflowHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request cancellation. Cooperative: in-flight executors are signalled
    /// and the driver drains them before finalizing.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current persisted execution state.
    pub async fn status(&self) -> Result<DataflowState> {
        self.store
            .read(&self.workspace, self.id)
            .await?
            .ok_or_else(|| Error::Internal(format!("execution {} vanished", self.id)))
    }

    /// Events with `seq` greater than `since_seq`.
    pub async fn events_since(&self, since_seq: u64) -> Result<Vec<SequencedEvent>> {
        self.store.events_since(&self.workspace, self.id, since_seq).await
    }

    /// Wait for the driver to finish. Raises `DataflowAborted` with the
    /// partial results after a cancellation.
    pub async fn wait(self) -> Result<DataflowState> {
        self.join
            .await
            .map_err(|err| Error::Internal(format!("driver task panicked: {err}")))?
    }
}

/// Start a dataflow execution on a workspace.
pub async fn start<R: TaskRunner>(
    repo: Repository,
    workspace: &str,
    runner: R,
    store: Arc<dyn ExecutionStateStore>,
    opts: DataflowOptions,
) -> Result<DataflowHandle> {
    start_with_clock(repo, workspace, runner, store, opts, SystemClock).await
}

/// [`start`] with an explicit clock, for tests that control time.
pub async fn start_with_clock<R: TaskRunner, C: Clock>(
    repo: Repository,
    workspace: &str,
    runner: R,
    store: Arc<dyn ExecutionStateStore>,
    mut opts: DataflowOptions,
    clock: C,
) -> Result<DataflowHandle> {
    // Fail fast before touching the lock file
    let _ = repo.workspace_get(workspace)?;

    let lock = match opts.lock.take() {
        Some(lock) if lock.workspace() == workspace => lock,
        Some(lock) => {
            return Err(Error::Internal(format!(
                "adopted lock is for workspace {}, not {workspace}",
                lock.workspace()
            )))
        }
        None => repo.lock_workspace(workspace, LockKind::Dataflow).await?,
    };

    recover_incomplete(&repo, workspace, store.as_ref(), clock.wall()).await?;

    // Re-read under the lock: a deploy may have raced the first read
    let workspace_state = repo.workspace_get(workspace)?;
    if !workspace_state.is_deployed() {
        return Err(Error::WorkspaceNotDeployed(workspace.to_string()));
    }
    let (_, package) = repo.workspace_package(&workspace_state).await?;
    let built = graph::build(&repo, workspace, &package, opts.filter.as_deref()).await?;

    // Tasks with null inputs hand the canonical null blob to executors
    cache::ensure_null_blob(&repo).await?;

    let id = store.next_execution_id(workspace).await?;
    let now = clock.wall();
    let mut state = DataflowState {
        id,
        repo: repo.layout().root().to_path_buf(),
        workspace: workspace.to_string(),
        status: DataflowStatus::Running,
        started_at: now,
        completed_at: None,
        concurrency: opts.concurrency.max(1),
        force: opts.force,
        filter: opts.filter.clone(),
        pid: process::current_pid(),
        boot_id: process::boot_id(),
        graph: built.graph,
        tasks: built.tasks,
        counters: built.counters,
        events: Vec::new(),
    };
    for event in built.init_events {
        state.record_event(event, now);
    }
    store.create(&state).await?;
    tracing::info!(workspace, id, tasks = state.tasks.len(), "dataflow started");

    let cancel = opts.cancel.clone().unwrap_or_default();
    let driver = Driver {
        repo,
        workspace: workspace.to_string(),
        runner,
        store: Arc::clone(&store),
        state: Arc::new(Mutex::new(state)),
        cancel: cancel.clone(),
        clock,
        concurrency: opts.concurrency.max(1),
        force: opts.force,
        events_tx: opts.events.take(),
        stdout_tx: opts.stdout.take(),
        stderr_tx: opts.stderr.take(),
    };
    let join = tokio::spawn(async move {
        let result = driver.run().await;
        // Lock released here, in every exit path
        drop(lock);
        result
    });

    Ok(DataflowHandle { id, workspace: workspace.to_string(), store, cancel, join })
}

/// Handle a `running` execution state left behind by a previous process:
/// adopt nothing, mark it failed, unless its driver is genuinely alive.
async fn recover_incomplete(
    repo: &Repository,
    workspace: &str,
    store: &dyn ExecutionStateStore,
    now: DateTime<Utc>,
) -> Result<()> {
    let Some(mut previous) = store.incomplete(workspace).await? else {
        return Ok(());
    };
    if process::is_recorded_process_alive(previous.pid, 0, &previous.boot_id) {
        // We hold the lock, so this should be unreachable; fail loudly.
        return Err(Error::Dataflow(format!(
            "execution {} of workspace {workspace} is still running in pid {}",
            previous.id, previous.pid
        )));
    }

    tracing::warn!(
        workspace,
        id = previous.id,
        pid = previous.pid,
        "marking interrupted execution as failed"
    );
    for task in previous.tasks.values_mut() {
        match task.status {
            TaskStatus::InProgress => {
                task.status = TaskStatus::Failed;
                task.error = Some("interrupted by crash".to_string());
                task.completed_at = Some(now);
            }
            TaskStatus::Waiting | TaskStatus::Ready => {
                task.status = TaskStatus::Skipped;
            }
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped => {}
        }
    }
    previous.status = DataflowStatus::Failed;
    previous.completed_at = Some(now);
    previous.record_event(ExecutionEvent::Finalize { status: DataflowStatus::Failed }, now);
    store.update(&previous).await?;
    // The interrupted driver never reached its commit point for the
    // in-progress tasks, so the workspace root is untouched; its orphan
    // blobs are garbage collector food.
    Ok(())
}

/// One settled in-flight task.
struct TaskOutcome {
    name: String,
    record_id: ExecutionId,
    task_hash: Hash,
    inputs_hash: Hash,
    started_at: DateTime<Utc>,
    result: std::result::Result<TaskRunResult, RunnerError>,
}

struct Driver<R, C> {
    repo: Repository,
    workspace: String,
    runner: R,
    store: Arc<dyn ExecutionStateStore>,
    state: Arc<Mutex<DataflowState>>,
    cancel: CancellationToken,
    clock: C,
    concurrency: usize,
    force: bool,
    events_tx: Option<mpsc::Sender<SequencedEvent>>,
    stdout_tx: Option<mpsc::Sender<(String, Vec<u8>)>>,
    stderr_tx: Option<mpsc::Sender<(String, Vec<u8>)>>,
}

impl<R: TaskRunner, C: Clock> Driver<R, C> {
    async fn run(&self) -> Result<DataflowState> {
        let (done_tx, mut done_rx) = mpsc::channel::<TaskOutcome>(64);
        let mut running = 0usize;
        let mut aborted = false;

        loop {
            if !aborted {
                running += self.dispatch_ready(self.concurrency - running, &done_tx).await?;
            }

            if running == 0 {
                break;
            }

            tokio::select! {
                outcome = done_rx.recv() => {
                    // Senders outlive the loop; recv cannot return None here
                    if let Some(outcome) = outcome {
                        running -= 1;
                        self.apply_outcome(outcome, aborted).await?;
                    }
                }
                () = self.cancel.cancelled(), if !aborted => {
                    aborted = true;
                    self.observe_abort().await?;
                }
            }
        }

        self.finalize(aborted).await
    }

    /// Dispatch ready tasks until the slots are spent or the queue empties.
    /// Cache hits complete inline and never consume a slot.
    async fn dispatch_ready(
        &self,
        mut slots: usize,
        done_tx: &mpsc::Sender<TaskOutcome>,
    ) -> Result<usize> {
        let mut spawned = 0usize;
        while slots > 0 {
            let mut state = self.state.lock().await;
            let Some(name) = state.ready_names().into_iter().next() else { break };
            let node = state
                .graph
                .get(&name)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("task {name} missing from graph")))?;

            let input_hashes = cache::resolve_inputs(&self.repo, &self.workspace, &node.inputs)
                .await?
                .ok_or_else(|| {
                    Error::Dataflow(format!("ready task {name} has unresolved inputs"))
                })?;
            let inputs_hash = cache::inputs_hash(&input_hashes);

            if !self.force {
                if let CacheDecision::Hit { output_hash } =
                    cache::lookup(self.repo.executions(), &node.task_hash, &inputs_hash)?
                {
                    self.repo
                        .workspace_commit_dataset(&self.workspace, &node.output, output_hash)
                        .await?;
                    let now = self.clock.wall();
                    if let Some(task) = state.task_mut(&name) {
                        task.status = TaskStatus::Completed;
                        task.cached = true;
                        task.output_hash = Some(output_hash);
                        task.completed_at = Some(now);
                    }
                    state.counters.cached += 1;
                    self.emit(&mut state, ExecutionEvent::Cached { task: name.clone(), output_hash })
                        .await;
                    state.promote_ready();
                    self.store.update(&state).await?;
                    tracing::debug!(task = %name, "cache hit");
                    continue;
                }
            }

            // Cache miss: record the attempt and hand off to the executor
            let record_id = ExecutionId::generate();
            let started_at = self.clock.wall();
            self.repo.executions().put(
                &node.task_hash,
                &inputs_hash,
                &record_id,
                &ExecutionStatus::Running {
                    pid: process::current_pid(),
                    start_time: process::process_start_time(process::current_pid()).unwrap_or(0),
                    boot_id: process::boot_id(),
                },
            )?;
            if let Some(task) = state.task_mut(&name) {
                task.status = TaskStatus::InProgress;
                task.started_at = Some(started_at);
            }
            self.emit(&mut state, ExecutionEvent::Start { task: name.clone() }).await;
            self.store.update(&state).await?;
            drop(state);

            self.spawn_task(
                name,
                node.task_hash,
                input_hashes,
                inputs_hash,
                record_id,
                started_at,
                done_tx.clone(),
            );
            spawned += 1;
            slots -= 1;
        }
        Ok(spawned)
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_task(
        &self,
        name: String,
        task_hash: Hash,
        input_hashes: Vec<Hash>,
        inputs_hash: Hash,
        record_id: ExecutionId,
        started_at: DateTime<Utc>,
        done_tx: mpsc::Sender<TaskOutcome>,
    ) {
        let runner = self.runner.clone();
        let objects = self.repo.object_store();
        let cancel = self.cancel.child_token();

        let stdout = self.spawn_output_pump(name.clone(), task_hash, inputs_hash, record_id, true);
        let stderr = self.spawn_output_pump(name.clone(), task_hash, inputs_hash, record_id, false);

        let force = self.force;
        tokio::spawn(async move {
            let ctx = RunContext { cancel, stdout: Some(stdout), stderr: Some(stderr), force };
            let result = runner.execute(objects, &task_hash, &input_hashes, ctx).await;
            let _ = done_tx
                .send(TaskOutcome { name, record_id, task_hash, inputs_hash, started_at, result })
                .await;
        });
    }

    /// Tee one output stream into the execution record's capture file and
    /// the caller's channel.
    fn spawn_output_pump(
        &self,
        task: String,
        task_hash: Hash,
        inputs_hash: Hash,
        record_id: ExecutionId,
        is_stdout: bool,
    ) -> mpsc::Sender<Vec<u8>> {
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(16);
        let executions: ExecutionStore = self.repo.executions().clone();
        let user_tx = if is_stdout { self.stdout_tx.clone() } else { self.stderr_tx.clone() };
        tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                let appended = if is_stdout {
                    executions.append_stdout(&task_hash, &inputs_hash, &record_id, &chunk)
                } else {
                    executions.append_stderr(&task_hash, &inputs_hash, &record_id, &chunk)
                };
                if let Err(err) = appended {
                    tracing::warn!(task = %task, error = %err, "output capture failed");
                }
                if let Some(user_tx) = &user_tx {
                    let _ = user_tx.send((task.clone(), chunk)).await;
                }
            }
        });
        tx
    }

    /// Apply one settled task under the state mutex: execution record,
    /// workspace write, task transition, counters, events, propagation.
    async fn apply_outcome(&self, outcome: TaskOutcome, aborted: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        let now = self.clock.wall();
        let executions = self.repo.executions();
        let output_path = state.graph.get(&outcome.name).map(|node| node.output.clone());

        match outcome.result {
            Ok(TaskRunResult { state: RunState::Success { output_hash }, duration_ms }) => {
                // After an observed abort the workspace is frozen; the
                // execution record still remembers the success.
                if !aborted {
                    let path = output_path.ok_or_else(|| {
                        Error::Internal(format!("task {} missing from graph", outcome.name))
                    })?;
                    self.repo
                        .workspace_commit_dataset(&self.workspace, &path, output_hash)
                        .await?;
                }
                executions.put(
                    &outcome.task_hash,
                    &outcome.inputs_hash,
                    &outcome.record_id,
                    &ExecutionStatus::Success {
                        output_hash,
                        started_at: outcome.started_at,
                        completed_at: now,
                    },
                )?;
                if let Some(task) = state.task_mut(&outcome.name) {
                    task.status = TaskStatus::Completed;
                    task.output_hash = Some(output_hash);
                    task.duration_ms = Some(duration_ms);
                    task.completed_at = Some(now);
                }
                state.counters.executed += 1;
                self.emit(&mut state, ExecutionEvent::Complete {
                    task: outcome.name.clone(),
                    output_hash,
                    duration_ms,
                })
                .await;
                if !aborted {
                    state.promote_ready();
                }
            }
            Ok(TaskRunResult { state: RunState::Failed { exit_code }, duration_ms }) => {
                executions.put(
                    &outcome.task_hash,
                    &outcome.inputs_hash,
                    &outcome.record_id,
                    &ExecutionStatus::Failed { exit_code, completed_at: now },
                )?;
                if let Some(task) = state.task_mut(&outcome.name) {
                    task.status = TaskStatus::Failed;
                    task.exit_code = Some(exit_code);
                    task.duration_ms = Some(duration_ms);
                    task.completed_at = Some(now);
                }
                state.counters.failed += 1;
                self.emit(&mut state, ExecutionEvent::Failed {
                    task: outcome.name.clone(),
                    exit_code,
                })
                .await;
                self.skip_downstream(&mut state, &outcome.name).await;
            }
            Ok(TaskRunResult { state: RunState::Error { ref message }, duration_ms }) => {
                let message = message.clone();
                self.record_error(&mut state, &outcome, message, Some(duration_ms), now).await?;
            }
            Err(RunnerError::Cancelled) => {
                executions.put(
                    &outcome.task_hash,
                    &outcome.inputs_hash,
                    &outcome.record_id,
                    &ExecutionStatus::Error { message: "cancelled".to_string(), completed_at: now },
                )?;
                if let Some(task) = state.task_mut(&outcome.name) {
                    task.status = TaskStatus::Failed;
                    task.error = Some("cancelled".to_string());
                    task.completed_at = Some(now);
                }
            }
            Err(ref err) => {
                self.record_error(&mut state, &outcome, err.to_string(), None, now).await?;
            }
        }

        self.store.update(&state).await?;
        Ok(())
    }

    async fn record_error(
        &self,
        state: &mut DataflowState,
        outcome: &TaskOutcome,
        message: String,
        duration_ms: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.repo.executions().put(
            &outcome.task_hash,
            &outcome.inputs_hash,
            &outcome.record_id,
            &ExecutionStatus::Error { message: message.clone(), completed_at: now },
        )?;
        if let Some(task) = state.task_mut(&outcome.name) {
            task.status = TaskStatus::Failed;
            task.error = Some(message.clone());
            task.duration_ms = duration_ms;
            task.completed_at = Some(now);
        }
        state.counters.failed += 1;
        self.emit(state, ExecutionEvent::Error { task: outcome.name.clone(), message }).await;
        self.skip_downstream(state, &outcome.name).await;
        Ok(())
    }

    async fn skip_downstream(&self, state: &mut DataflowState, failed: &str) {
        for (task, dependency) in state.skip_dependents(failed) {
            self.emit(state, ExecutionEvent::InputUnavailable {
                task,
                failed_dependency: dependency,
            })
            .await;
        }
    }

    /// Persist `cancelled` the moment the abort is observed, so it
    /// survives repeated signals and process death.
    async fn observe_abort(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.status = DataflowStatus::Cancelled;
        self.emit(&mut state, ExecutionEvent::Cancel).await;
        self.store.update(&state).await?;
        tracing::info!(workspace = %self.workspace, id = state.id, "dataflow cancelled");
        Ok(())
    }

    async fn finalize(&self, aborted: bool) -> Result<DataflowState> {
        let mut state = self.state.lock().await;
        let now = self.clock.wall();

        // Anything still pending can no longer run
        let names: Vec<String> = state
            .tasks
            .iter()
            .filter(|(_, task)| !task.status.is_terminal() && task.status != TaskStatus::InProgress)
            .map(|(name, _)| name.clone())
            .collect();
        for name in names {
            if let Some(task) = state.task_mut(&name) {
                task.status = TaskStatus::Skipped;
            }
            state.counters.skipped += 1;
            if !aborted {
                let blocking = state
                    .graph
                    .get(&name)
                    .and_then(|node| {
                        node.depends_on.iter().find(|dep| {
                            state.task(dep).map(|t| t.status != TaskStatus::Completed).unwrap_or(true)
                        })
                    })
                    .cloned()
                    .unwrap_or_else(|| "unresolved input".to_string());
                self.emit(&mut state, ExecutionEvent::InputUnavailable {
                    task: name,
                    failed_dependency: blocking,
                })
                .await;
            }
        }

        let status = if aborted {
            DataflowStatus::Cancelled
        } else if state.any_failed() {
            DataflowStatus::Failed
        } else {
            DataflowStatus::Completed
        };
        state.status = status;
        state.completed_at = Some(now);
        self.emit(&mut state, ExecutionEvent::Finalize { status }).await;
        self.store.update(&state).await?;
        tracing::info!(
            workspace = %self.workspace,
            id = state.id,
            status = %status,
            executed = state.counters.executed,
            cached = state.counters.cached,
            failed = state.counters.failed,
            skipped = state.counters.skipped,
            "dataflow finished"
        );

        if aborted {
            return Err(Error::DataflowAborted { partial: Box::new(state.clone()) });
        }
        Ok(state.clone())
    }

    /// Record an event in the state and mirror it to the caller's channel.
    async fn emit(&self, state: &mut DataflowState, event: ExecutionEvent) {
        let at = self.clock.wall();
        let seq = state.record_event(event.clone(), at);
        if let Some(events_tx) = &self.events_tx {
            let _ = events_tx.send(SequencedEvent { seq, at, event }).await;
        }
    }
}

#[cfg(test)]
#[path = "dataflow_tests.rs"]
mod tests;
