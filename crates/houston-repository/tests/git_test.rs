//! Integration tests for the git adapter against a local bare repository.

use std::collections::BTreeMap;
use std::path::Path;

use git2::{Oid, Repository, Signature};
use houston_repository::{GitRepository, SourceControl};

/// Write a tree for `files`, nesting directories on `/`.
fn write_tree(repo: &Repository, files: &[(&str, &str)]) -> Oid {
    let mut direct = Vec::new();
    let mut nested: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for (path, content) in files {
        match path.split_once('/') {
            Some((dir, rest)) => nested.entry(dir).or_default().push((rest, *content)),
            None => direct.push((*path, *content)),
        }
    }

    let mut builder = repo.treebuilder(None).unwrap();
    for (name, content) in direct {
        let blob = repo.blob(content.as_bytes()).unwrap();
        builder.insert(name, blob, 0o100644).unwrap();
    }
    for (dir, children) in nested {
        let subtree = write_tree(repo, &children);
        builder.insert(dir, subtree, 0o040000).unwrap();
    }
    builder.write().unwrap()
}

fn commit_branch(repo: &Repository, branch: &str, files: &[(&str, &str)]) {
    let tree = repo.find_tree(write_tree(repo, files)).unwrap();
    let sig = Signature::now("Houston", "houston@example.com").unwrap();
    repo.commit(
        Some(&format!("refs/heads/{branch}")),
        &sig,
        &sig,
        &format!("{branch} files"),
        &tree,
        &[],
    )
    .unwrap();
}

fn fixture(dir: &Path) -> String {
    let path = dir.join("origin.git");
    let repo = Repository::init_bare(&path).unwrap();
    commit_branch(&repo, "master", &[("README.md", "master"), ("src/main.vala", "x")]);
    commit_branch(&repo, "deb-packaging", &[("debian/control", "Source: app")]);
    commit_branch(&repo, "loki", &[("README.md", "loki")]);
    repo.set_head("refs/heads/master").unwrap();

    let head = repo.refname_to_id("refs/heads/master").unwrap();
    let target = repo.find_object(head, None).unwrap();
    repo.tag_lightweight("1.0.0", &target, false).unwrap();

    path.to_string_lossy().to_string()
}

#[tokio::test]
async fn test_list_references() {
    let dir = tempfile::tempdir().unwrap();
    let repo = GitRepository::new(fixture(dir.path()));

    let mut references = repo.references().await.unwrap();
    references.sort();
    assert_eq!(
        references,
        vec![
            "refs/heads/deb-packaging",
            "refs/heads/loki",
            "refs/heads/master",
            "refs/tags/1.0.0",
        ]
    );
}

#[tokio::test]
async fn test_clone_branch() {
    let dir = tempfile::tempdir().unwrap();
    let repo = GitRepository::new(fixture(dir.path()));

    let target = dir.path().join("checkout");
    repo.clone(&target, "refs/heads/deb-packaging").await.unwrap();

    assert_eq!(
        std::fs::read_to_string(target.join("debian/control")).unwrap(),
        "Source: app"
    );
    assert!(!target.join("README.md").exists());
}

#[tokio::test]
async fn test_clone_short_branch_name_and_tag() {
    let dir = tempfile::tempdir().unwrap();
    let repo = GitRepository::new(fixture(dir.path()));

    let loki = dir.path().join("loki");
    repo.clone(&loki, "loki").await.unwrap();
    assert_eq!(std::fs::read_to_string(loki.join("README.md")).unwrap(), "loki");

    let tagged = dir.path().join("tag");
    repo.clone(&tagged, "refs/tags/1.0.0").await.unwrap();
    assert_eq!(std::fs::read_to_string(tagged.join("README.md")).unwrap(), "master");
    assert!(tagged.join("src/main.vala").exists());
}

#[tokio::test]
async fn test_clone_unknown_reference_fails() {
    let dir = tempfile::tempdir().unwrap();
    let repo = GitRepository::new(fixture(dir.path()));
    let result = repo.clone(&dir.path().join("x"), "refs/heads/nope").await;
    assert!(result.is_err());
}
