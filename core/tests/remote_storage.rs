//! Remote-mode integration tests against the SSH test container.
//!
//! Container: `openssh` on port 2201 (`tests/docker/docker-compose.yml`).
//! Each test works below its own freshly created remote root and removes
//! it afterwards. Skips gracefully if the container is not running.

mod common;

use std::collections::BTreeSet;

use common::{require_docker, PORT_SSH};
use filebridge_core::backends::ssh::test_connection;
use filebridge_core::config::ConfigUpdate;
use filebridge_core::mode::StorageMode;
use filebridge_core::tree::file_paths;
use filebridge_core::Storage;
use tempfile::TempDir;

/// Storage rooted at a new, unique remote directory.
async fn remote_storage(dir: &TempDir) -> (Storage, String) {
    let name = format!("filebridge-{}", common::rand_suffix());
    let storage = Storage::new(common::remote_config(dir.path(), &name));
    assert_eq!(storage.mode(), StorageMode::Remote);

    // Create the root from its parent, then switch back to it.
    let root = storage.get_config().remote_root_path;
    storage
        .set_config(&ConfigUpdate {
            remote_root_path: Some(common::REMOTE_TEST_ROOT.to_string()),
            ..Default::default()
        })
        .unwrap();
    assert!(storage.create_folder(&name, "").await.unwrap());
    storage
        .set_config(&ConfigUpdate {
            remote_root_path: Some(root),
            ..Default::default()
        })
        .unwrap();
    (storage, name)
}

async fn cleanup(storage: &Storage, name: &str) {
    storage
        .set_config(&ConfigUpdate {
            remote_root_path: Some(common::REMOTE_TEST_ROOT.to_string()),
            ..Default::default()
        })
        .unwrap();
    storage.delete_entry(name).await.unwrap();
}

#[tokio::test]
async fn probe_succeeds_against_container() {
    require_docker!(PORT_SSH);
    assert!(test_connection(&common::ssh_password_config(PORT_SSH)).await);

    let dir = TempDir::new().unwrap();
    let storage = Storage::new(common::remote_config(dir.path(), "unused"));
    assert!(storage.test_connectivity().await);
}

#[tokio::test]
async fn probe_with_wrong_password_is_false() {
    require_docker!(PORT_SSH);
    let mut config = common::ssh_password_config(PORT_SSH);
    config.password = Some("wrong".into());
    assert!(!test_connection(&config).await);
}

#[tokio::test]
async fn upload_round_trip_with_nested_target() {
    require_docker!(PORT_SSH);
    let dir = TempDir::new().unwrap();
    let (storage, name) = remote_storage(&dir).await;

    let content = "remote line 1\nremote line 2\n";
    let upload = common::stage_upload(dir.path(), "report.txt", content.as_bytes());
    storage.write_file(&upload, "a/b/c").await.unwrap();
    assert_eq!(storage.read_file("a/b/c/report.txt").await.unwrap(), content);

    storage.write_file(&upload, "").await.unwrap();
    assert_eq!(storage.read_file("report.txt").await.unwrap(), content);

    cleanup(&storage, &name).await;
}

#[tokio::test]
async fn create_folder_twice_and_recursive_delete() {
    require_docker!(PORT_SSH);
    let dir = TempDir::new().unwrap();
    let (storage, name) = remote_storage(&dir).await;

    assert!(storage.create_folder("reports", "").await.unwrap());
    assert!(!storage.create_folder("reports", "").await.unwrap());
    let upload = common::stage_upload(dir.path(), "q1.csv", b"a,b\n1,2\n");
    storage.write_file(&upload, "reports/2024").await.unwrap();

    let entries = storage.list_entries("").await.unwrap();
    assert_eq!(entries.iter().filter(|e| e.name == "reports").count(), 1);

    assert!(storage.delete_entry("reports").await.unwrap());
    assert!(!storage.delete_entry("reports").await.unwrap());

    cleanup(&storage, &name).await;
}

#[tokio::test]
async fn tree_and_aggregate_agree_and_hide_dotfiles() {
    require_docker!(PORT_SSH);
    let dir = TempDir::new().unwrap();
    let (storage, name) = remote_storage(&dir).await;

    for (file, target) in [("a.js", "src"), ("b.js", "src/nested"), ("README.md", ""), (".env", "")] {
        let upload = common::stage_upload(dir.path(), file, b"content\n");
        storage.write_file(&upload, target).await.unwrap();
    }

    let tree = storage.get_tree("").await.unwrap();
    let aggregate = storage.get_all_files_aggregate("").await.unwrap();
    let from_tree: BTreeSet<_> = file_paths(&tree).into_iter().collect();
    let from_aggregate: BTreeSet<_> = aggregate.into_iter().map(|f| f.path).collect();
    assert_eq!(from_tree, from_aggregate);
    assert!(!from_tree.contains(".env"));
    assert_eq!(from_tree.len(), 3);

    let listing = storage.list_entries("").await.unwrap();
    assert!(listing.iter().all(|e| !e.name.starts_with('.')));

    let outline = storage.get_outline("").await.unwrap();
    assert!(outline.find("📁 src/").unwrap() < outline.find("📄 README.md").unwrap());

    cleanup(&storage, &name).await;
}

#[tokio::test]
async fn symlink_loops_and_dangling_links_are_not_followed() {
    require_docker!(PORT_SSH);
    let dir = TempDir::new().unwrap();
    let (storage, name) = remote_storage(&dir).await;

    let upload = common::stage_upload(dir.path(), "a.txt", b"alpha");
    storage.write_file(&upload, "").await.unwrap();
    let root = format!("{}/{name}", common::REMOTE_TEST_ROOT);
    let output = storage
        .execute_remote_command(&format!(
            "ln -s {root} {root}/l1 && ln -s {root} {root}/l2 && ln -s {root}/nowhere {root}/broken.txt"
        ))
        .await
        .unwrap();
    assert_eq!(output.code, 0, "{}", output.stderr);

    let tree = tokio::time::timeout(std::time::Duration::from_secs(30), storage.get_tree(""))
        .await
        .expect("tree walk did not terminate")
        .unwrap();
    assert_eq!(tree.len(), 4);
    for link in ["l1", "l2"] {
        let node = tree.iter().find(|n| n.name == link).unwrap();
        assert!(node.children.as_ref().is_some_and(Vec::is_empty));
    }

    let aggregate = storage.get_all_files_aggregate("").await.unwrap();
    let paths: Vec<_> = aggregate.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["a.txt", "broken.txt"]);
    assert_eq!(aggregate[0].content, "alpha");
    assert!(aggregate[1].content.starts_with("[error reading file:"));

    cleanup(&storage, &name).await;
}

#[tokio::test]
async fn read_missing_is_not_found() {
    require_docker!(PORT_SSH);
    let dir = TempDir::new().unwrap();
    let (storage, name) = remote_storage(&dir).await;

    let err = storage.read_file("ghost.txt").await.unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");

    cleanup(&storage, &name).await;
}

#[tokio::test]
async fn remote_command_reports_exit_code() {
    require_docker!(PORT_SSH);
    let dir = TempDir::new().unwrap();
    let storage = Storage::new(common::remote_config(dir.path(), "unused"));

    let output = storage
        .execute_remote_command("echo hello; echo oops >&2; exit 3")
        .await
        .unwrap();
    assert_eq!(output.code, 3);
    assert_eq!(output.stdout.trim(), "hello");
    assert_eq!(output.stderr.trim(), "oops");
}
