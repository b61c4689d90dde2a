// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::packages::PackageDef;
use beast_core::codec::ValueType;
use beast_core::TaskObject;
use indexmap::IndexMap;
use tempfile::tempdir;

fn path(s: &str) -> DataPath {
    DataPath::parse(s).unwrap()
}

async fn repo_with_package(dir: &tempfile::TempDir) -> Repository {
    let repo = Repository::init(dir.path()).unwrap();
    let ir = crate::object::ObjectStore::write(repo.store(), b"ir").await.unwrap();
    let structure = beast_core::Structure::branch([
        ("inputs", beast_core::Structure::branch([(
            "value",
            beast_core::Structure::leaf(ValueType::Int),
        )])),
        ("outputs", beast_core::Structure::branch([(
            "result",
            beast_core::Structure::leaf(ValueType::Int),
        )])),
    ]);
    let mut tasks = IndexMap::new();
    tasks.insert("compute".to_string(), TaskObject {
        command_ir: ir,
        inputs: vec![path(".inputs.value")],
        output: path(".outputs.result"),
    });
    let def = PackageDef { structure, tasks, initial: Vec::new() };
    repo.package_import("compute", "1.0.0", &def).await.unwrap();
    repo
}

#[tokio::test]
async fn create_get_list_remove() {
    let dir = tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    assert!(matches!(repo.workspace_get("ws"), Err(Error::WorkspaceNotFound(_))));

    repo.workspace_create("ws").unwrap();
    let state = repo.workspace_get("ws").unwrap();
    assert!(!state.is_deployed());
    assert_eq!(state.root, None);

    assert!(matches!(repo.workspace_create("ws"), Err(Error::WorkspaceExists(_))));
    assert_eq!(repo.workspace_list().unwrap(), ["ws"]);

    repo.workspace_remove("ws").await.unwrap();
    assert!(matches!(repo.workspace_get("ws"), Err(Error::WorkspaceNotFound(_))));
}

#[tokio::test]
async fn deploy_binds_package_and_root() {
    let dir = tempdir().unwrap();
    let repo = repo_with_package(&dir).await;
    repo.workspace_create("ws").unwrap();

    repo.workspace_deploy("ws", "compute", "1.0.0").await.unwrap();

    let state = repo.workspace_get("ws").unwrap();
    let deployment = state.deployment.as_ref().unwrap();
    assert_eq!(deployment.package_name, "compute");
    assert_eq!(deployment.package_version, "1.0.0");

    let (_, package) = repo.package_resolve("compute", "1.0.0").await.unwrap();
    assert_eq!(state.root, Some(package.data.root));
}

#[tokio::test]
async fn deploy_missing_package_fails() {
    let dir = tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    repo.workspace_create("ws").unwrap();
    assert!(matches!(
        repo.workspace_deploy("ws", "ghost", "1.0.0").await,
        Err(Error::PackageNotFound(_))
    ));
}

#[tokio::test]
async fn deploy_respects_the_lock() {
    let dir = tempdir().unwrap();
    let repo = repo_with_package(&dir).await;
    repo.workspace_create("ws").unwrap();

    let _held = repo.lock_workspace("ws", beast_core::LockKind::Dataflow).await.unwrap();
    assert!(matches!(
        repo.workspace_deploy("ws", "compute", "1.0.0").await,
        Err(Error::WorkspaceLocked { .. })
    ));
}

#[tokio::test]
async fn set_and_get_dataset() {
    let dir = tempdir().unwrap();
    let repo = repo_with_package(&dir).await;
    repo.workspace_create("ws").unwrap();
    repo.workspace_deploy("ws", "compute", "1.0.0").await.unwrap();

    assert_eq!(repo.workspace_get_dataset("ws", &path(".inputs.value")).await.unwrap(), None);

    repo.workspace_set_dataset("ws", &path(".inputs.value"), &Value::Int(7)).await.unwrap();

    let (value_type, value) =
        repo.workspace_get_dataset("ws", &path(".inputs.value")).await.unwrap().unwrap();
    assert_eq!(value_type, ValueType::Int);
    assert_eq!(value, Value::Int(7));

    // Each set swaps the root
    let root_before = repo.workspace_get("ws").unwrap().root;
    repo.workspace_set_dataset("ws", &path(".inputs.value"), &Value::Int(8)).await.unwrap();
    assert_ne!(repo.workspace_get("ws").unwrap().root, root_before);
}

#[tokio::test]
async fn set_dataset_requires_deploy() {
    let dir = tempdir().unwrap();
    let repo = repo_with_package(&dir).await;
    repo.workspace_create("ws").unwrap();

    assert!(matches!(
        repo.workspace_set_dataset("ws", &path(".inputs.value"), &Value::Int(1)).await,
        Err(Error::WorkspaceNotDeployed(_))
    ));
}

#[tokio::test]
async fn set_dataset_rejects_unknown_paths() {
    let dir = tempdir().unwrap();
    let repo = repo_with_package(&dir).await;
    repo.workspace_create("ws").unwrap();
    repo.workspace_deploy("ws", "compute", "1.0.0").await.unwrap();

    assert!(matches!(
        repo.workspace_set_dataset("ws", &path(".no.such"), &Value::Int(1)).await,
        Err(Error::DatasetNotFound(_))
    ));
}

#[tokio::test]
async fn remove_fails_while_locked() {
    let dir = tempdir().unwrap();
    let repo = repo_with_package(&dir).await;
    repo.workspace_create("ws").unwrap();

    let _held = repo.lock_workspace("ws", beast_core::LockKind::Dataflow).await.unwrap();
    assert!(matches!(repo.workspace_remove("ws").await, Err(Error::WorkspaceLocked { .. })));
}
