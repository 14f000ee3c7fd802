mod common;

use std::path::Path;

use branchdiff::*;
use common::write_file;
use git2::{Repository, Signature};

const ORG: &str = "00D5g000004ABCDEF";

/// A project whose source-tracking store tracks `A.cls`, `C.cls` and `notes.txt`.
fn tracked_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path();
    let tracking = status::tracking_git_dir(project, ORG);
    std::fs::create_dir_all(&tracking).unwrap();

    let repo = Repository::init_bare(&tracking).unwrap();
    repo.set_workdir(project, false).unwrap();

    let files = ["force-app/A.cls", "force-app/C.cls", "notes.txt"];
    for rel in files {
        write_file(project, rel, "v1\n");
    }
    let mut index = repo.index().unwrap();
    for rel in files {
        index.add_path(Path::new(rel)).unwrap();
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "sync", &tree, &[])
        .unwrap();
    dir
}

#[test]
fn only_changed_classes_are_deployable() {
    let dir = tracked_project();
    let project = dir.path();
    write_file(project, "force-app/A.cls", "v2\n");
    write_file(project, "force-app/B.cls", "untracked\n");
    write_file(project, "notes.txt", "v2\n");
    std::fs::remove_file(project.join("force-app/C.cls")).unwrap();

    let handle = RepoHandle::open(project, OpenOptions::default());
    let set = handle.deployable(&DeployQuery::new(ORG)).unwrap();

    let expected: ChangeSet = [project.join("force-app/A.cls")].into_iter().collect();
    assert_eq!(set, expected);
}

#[test]
fn entry_point_matches_handle() {
    let dir = tracked_project();
    write_file(dir.path(), "force-app/C.cls", "v2\n");

    let set = deployable_classes(dir.path(), ORG).unwrap();
    assert!(set.contains(dir.path().join("force-app/C.cls")));
    assert_eq!(set.len(), 1);
}

#[test]
fn other_extension() {
    let dir = tracked_project();
    write_file(dir.path(), "notes.txt", "v2\n");
    write_file(dir.path(), "force-app/A.cls", "v2\n");

    let handle = RepoHandle::open(dir.path(), OpenOptions::default());
    let set = handle
        .deployable(&DeployQuery::new(ORG).extension(".txt"))
        .unwrap();
    let expected: ChangeSet = [dir.path().join("notes.txt")].into_iter().collect();
    assert_eq!(set, expected);
}

#[test]
fn nothing_changed() {
    let dir = tracked_project();
    let handle = RepoHandle::open(dir.path(), OpenOptions::default());
    assert!(handle.deployable(&DeployQuery::new(ORG)).unwrap().is_empty());
}

#[test]
fn missing_tracking_store() {
    let dir = tempfile::tempdir().unwrap();
    let handle = RepoHandle::open(dir.path(), OpenOptions::default());
    let err = handle.deployable(&DeployQuery::new(ORG)).unwrap_err();
    assert!(matches!(err, Error::LocalChangeFailed { .. }));
}
