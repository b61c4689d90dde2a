// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency graph construction.
//!
//! A task depends on every other task whose declared output path is one of
//! its inputs. Readiness at start: a task with no pending dependency whose
//! inputs are all value-resolved is `ready`; a task with an unassigned
//! input nobody will produce is `skipped` up front (with an
//! `input_unavailable` event); everything else is `waiting`. With a filter,
//! the selected tasks plus their transitive dependencies run and the rest
//! are skipped silently.

use beast_core::{
    Counters, DataRef, Error, ExecutionEvent, Hash, PackageObject, Result, TaskNode, TaskObject,
    TaskState, TaskStatus,
};
use beast_storage::{Repository, Resolved};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// The graph and initial per-task states for one execution.
#[derive(Debug)]
pub struct BuiltGraph {
    pub graph: IndexMap<String, TaskNode>,
    pub tasks: IndexMap<String, TaskState>,
    pub counters: Counters,
    /// `input_unavailable` events for tasks skipped at build time.
    pub init_events: Vec<ExecutionEvent>,
}

/// Build the graph for a workspace's deployed package.
pub async fn build(
    repo: &Repository,
    workspace: &str,
    package: &PackageObject,
    filter: Option<&[String]>,
) -> Result<BuiltGraph> {
    // Decode every task declaration
    let mut declarations: IndexMap<String, (Hash, TaskObject)> = IndexMap::new();
    for (name, task_hash) in &package.tasks {
        let task = repo.read_task_object(task_hash).await?;
        declarations.insert(name.clone(), (*task_hash, task));
    }

    // Who produces which path
    let mut producers: HashMap<String, String> = HashMap::new();
    for (name, (_, task)) in &declarations {
        producers.insert(task.output.to_string(), name.clone());
    }

    let selected = select(&declarations, &producers, filter)?;

    // Nodes, with dependencies restricted to selected producers
    let mut graph: IndexMap<String, TaskNode> = IndexMap::new();
    for (name, (task_hash, task)) in &declarations {
        let mut depends_on = Vec::new();
        for input in &task.inputs {
            if let Some(producer) = producers.get(&input.to_string()) {
                if selected.contains(producer) && !depends_on.contains(producer) {
                    depends_on.push(producer.clone());
                }
            }
        }
        graph.insert(name.clone(), TaskNode {
            name: name.clone(),
            task_hash: *task_hash,
            inputs: task.inputs.clone(),
            output: task.output.clone(),
            depends_on,
        });
    }

    reject_cycles(&graph, &selected)?;

    // Initial statuses
    let mut tasks: IndexMap<String, TaskState> = IndexMap::new();
    let mut counters = Counters::default();
    let mut init_events = Vec::new();
    for (name, node) in &graph {
        if !selected.contains(name) {
            tasks.insert(name.clone(), TaskState {
                status: TaskStatus::Skipped,
                ..TaskState::default()
            });
            counters.skipped += 1;
            continue;
        }

        let mut unavailable: Option<String> = None;
        for input in &node.inputs {
            let produced = producers
                .get(&input.to_string())
                .is_some_and(|producer| selected.contains(producer));
            if produced {
                continue;
            }
            let reference = match repo.workspace_resolve(workspace, input).await? {
                Resolved::Leaf(reference) => reference,
                Resolved::Branch(_) => return Err(Error::DatasetNotFound(input.clone())),
            };
            if reference == DataRef::Unassigned {
                unavailable = Some(input.to_string());
                break;
            }
        }

        let status = match unavailable {
            Some(dependency) => {
                counters.skipped += 1;
                init_events.push(ExecutionEvent::InputUnavailable {
                    task: name.clone(),
                    failed_dependency: dependency,
                });
                TaskStatus::Skipped
            }
            None if node.depends_on.is_empty() => TaskStatus::Ready,
            None => TaskStatus::Waiting,
        };
        tasks.insert(name.clone(), TaskState { status, ..TaskState::default() });
    }

    // Tasks downstream of a build-time skip can never run either
    let mut frontier: Vec<String> = tasks
        .iter()
        .filter(|(name, task)| task.status == TaskStatus::Skipped && selected.contains(*name))
        .map(|(name, _)| name.clone())
        .collect();
    while let Some(upstream) = frontier.pop() {
        let dependents: Vec<String> = graph
            .values()
            .filter(|node| node.depends_on.contains(&upstream))
            .map(|node| node.name.clone())
            .collect();
        for name in dependents {
            let Some(task) = tasks.get_mut(&name) else { continue };
            if task.status == TaskStatus::Skipped {
                continue;
            }
            task.status = TaskStatus::Skipped;
            counters.skipped += 1;
            init_events.push(ExecutionEvent::InputUnavailable {
                task: name.clone(),
                failed_dependency: upstream.clone(),
            });
            frontier.push(name);
        }
    }

    Ok(BuiltGraph { graph, tasks, counters, init_events })
}

/// The set of tasks that will run: everything, or the filter plus its
/// transitive dependencies.
fn select(
    declarations: &IndexMap<String, (Hash, TaskObject)>,
    producers: &HashMap<String, String>,
    filter: Option<&[String]>,
) -> Result<HashSet<String>> {
    let Some(filter) = filter else {
        return Ok(declarations.keys().cloned().collect());
    };

    let mut selected = HashSet::new();
    let mut frontier: Vec<String> = Vec::new();
    for name in filter {
        if !declarations.contains_key(name) {
            return Err(Error::TaskNotFound(name.clone()));
        }
        frontier.push(name.clone());
    }
    while let Some(name) = frontier.pop() {
        if !selected.insert(name.clone()) {
            continue;
        }
        // A selected task pulls in the producers of its inputs
        if let Some((_, task)) = declarations.get(&name) {
            for input in &task.inputs {
                if let Some(producer) = producers.get(&input.to_string()) {
                    frontier.push(producer.clone());
                }
            }
        }
    }
    Ok(selected)
}

/// Kahn's algorithm over the selected subgraph; leftovers mean a cycle.
fn reject_cycles(graph: &IndexMap<String, TaskNode>, selected: &HashSet<String>) -> Result<()> {
    let mut pending: HashMap<&str, usize> = HashMap::new();
    for name in selected {
        if let Some(node) = graph.get(name) {
            pending.insert(name.as_str(), node.depends_on.len());
        }
    }

    let mut queue: Vec<&str> =
        pending.iter().filter(|(_, count)| **count == 0).map(|(name, _)| *name).collect();
    let mut visited = 0usize;
    while let Some(name) = queue.pop() {
        visited += 1;
        for node in graph.values() {
            if node.depends_on.iter().any(|dep| dep == name) {
                if let Some(count) = pending.get_mut(node.name.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push(node.name.as_str());
                    }
                }
            }
        }
    }

    if visited != pending.len() {
        let stuck: Vec<&str> = pending
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, _)| *name)
            .collect();
        return Err(Error::Dataflow(format!("dependency cycle involving {}", stuck.join(", "))));
    }
    Ok(())
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
