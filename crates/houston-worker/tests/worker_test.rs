//! Worker lifecycle: setup, run, stop, upload and teardown.

mod common;

use std::sync::Arc;

use common::{
    FakeRuntime, Outcome, Scripted, app_repository, config, context, init_tracing, trace, worker,
};
use houston_repository::MemoryRepository;
use houston_types::{BuildTarget, Log};
use houston_worker::{Worker, WorkerError, WorkerState, WrapperTask, constructor};

#[test]
fn test_new_requires_references() {
    let dir = tempfile::tempdir().unwrap();
    let err = Worker::new(
        config(dir.path()),
        Arc::new(app_repository()),
        Arc::new(FakeRuntime::new()),
        context().with_references(Vec::<String>::new()),
    )
    .unwrap_err();
    assert!(matches!(err, WorkerError::NoReferences));
}

#[tokio::test]
async fn test_setup_materializes_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Arc::new(app_repository());
    let mut worker = worker(dir.path(), repository.clone(), Arc::new(FakeRuntime::new()));
    assert_eq!(worker.state(), WorkerState::Created);
    assert!(worker.workspace().is_none());

    worker.setup().await.unwrap();
    let workspace = worker.workspace().unwrap().to_path_buf();
    assert!(workspace.starts_with(dir.path().join("workspaces")));
    assert_eq!(worker.state(), WorkerState::SetUp);

    assert_eq!(
        repository.cloned(),
        vec!["refs/heads/master", "refs/heads/loki", "refs/heads/deb-packaging"]
    );
    for n in 0..3 {
        assert!(workspace.join("repository").join(n.to_string()).is_dir());
    }

    let clean = workspace.join("clean");
    assert_eq!(std::fs::read_to_string(clean.join("README.md")).unwrap(), "loki");
    assert!(clean.join("src/main.vala").is_file());
    assert!(clean.join("debian/control").is_file());

    let dirty = workspace.join("dirty");
    assert_eq!(std::fs::read_to_string(dirty.join("README.md")).unwrap(), "loki");
    assert!(dirty.join("debian/rules").is_file());

    // Second call is a no-op.
    worker.setup().await.unwrap();
    assert_eq!(worker.workspace().unwrap(), workspace);
    assert_eq!(repository.cloned().len(), 3);

    worker.teardown().await;
}

#[tokio::test]
async fn test_setup_reports_missing_reference() {
    let dir = tempfile::tempdir().unwrap();
    init_tracing();
    let mut worker = Worker::new(
        config(dir.path()),
        Arc::new(app_repository()),
        Arc::new(FakeRuntime::new()),
        context().with_references(["refs/heads/feature"]),
    )
    .unwrap();

    let err = worker.setup().await.unwrap_err();
    assert!(matches!(err, WorkerError::Setup(ref title) if title == "Reference not found"));
    assert!(worker.fails());
    assert!(worker.logs()[0].body.contains("`refs/heads/feature`"));

    worker.teardown().await;
    assert!(worker.workspace().is_none());
}

#[tokio::test]
async fn test_failed_setup_leaves_no_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let seen = trace();
    let a = seen.clone();
    let mut worker = Worker::new(
        config(dir.path()),
        Arc::new(app_repository()),
        Arc::new(FakeRuntime::new()),
        context().with_references(["refs/heads/feature"]),
    )
    .unwrap()
    .with_tasks(vec![constructor(move || Scripted::new("after", Outcome::Pass, &a))]);

    assert!(worker.setup().await.is_err());
    assert!(worker.workspace().is_none());
    assert_eq!(worker.state(), WorkerState::Created);
    assert!(std::fs::read_dir(dir.path().join("workspaces")).unwrap().next().is_none());

    // Setup is attempted again rather than treated as done.
    assert!(matches!(worker.setup().await, Err(WorkerError::Setup(_))));

    let err = worker.run().await.unwrap_err();
    assert!(matches!(err, WorkerError::Setup(_)));
    assert!(seen.lock().is_empty());
    assert!(worker.workspace().is_none());
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut worker = worker(dir.path(), Arc::new(app_repository()), Arc::new(FakeRuntime::new()));

    worker.teardown().await;
    assert_eq!(worker.state(), WorkerState::TornDown);

    worker.setup().await.unwrap();
    let workspace = worker.workspace().unwrap().to_path_buf();
    assert!(workspace.is_dir());

    worker.teardown().await;
    worker.teardown().await;
    assert!(!workspace.exists());
    assert!(worker.workspace().is_none());
}

#[tokio::test]
async fn test_error_stops_before_next_top_level_task() {
    let dir = tempfile::tempdir().unwrap();
    let seen = trace();
    let (a, b, c) = (seen.clone(), seen.clone(), seen.clone());

    let mut worker = worker(dir.path(), Arc::new(app_repository()), Arc::new(FakeRuntime::new()))
        .with_tasks(vec![
            constructor(move || {
                let (a, b) = (a.clone(), b.clone());
                WrapperTask::new(
                    "first",
                    vec![
                        constructor(move || Scripted::new("a", Outcome::Log(Log::error("broken")), &a)),
                        constructor(move || Scripted::new("b", Outcome::Pass, &b)),
                    ],
                )
            }),
            constructor(move || Scripted::new("c", Outcome::Pass, &c)),
        ]);

    worker.run().await.unwrap();

    // The stop flag does not interrupt the wrapper already in flight.
    assert_eq!(*seen.lock(), vec!["a", "b"]);
    assert_eq!(worker.state(), WorkerState::Stopped);
    assert!(worker.fails());
    assert!(!worker.passes());

    worker.teardown().await;
}

#[tokio::test]
async fn test_top_level_leaf_log_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let seen = trace();
    let (a, b) = (seen.clone(), seen.clone());

    let mut worker = worker(dir.path(), Arc::new(app_repository()), Arc::new(FakeRuntime::new()))
        .with_tasks(vec![
            constructor(move || Scripted::new("a", Outcome::Log(Log::error("leaf")), &a)),
            constructor(move || Scripted::new("b", Outcome::Pass, &b)),
        ]);

    worker.run().await.unwrap();
    assert_eq!(*seen.lock(), vec!["a"]);
    assert_eq!(worker.logs()[0].title, "leaf");
    assert!(worker.fails());

    worker.teardown().await;
}

#[tokio::test]
async fn test_passes_with_only_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let seen = trace();
    let a = seen.clone();

    let mut worker = worker(dir.path(), Arc::new(app_repository()), Arc::new(FakeRuntime::new()))
        .with_tasks(vec![constructor(move || {
            let a = a.clone();
            WrapperTask::new(
                "checks",
                vec![constructor(move || Scripted::new("a", Outcome::Log(Log::warn("style")), &a))],
            )
        })]);

    worker.run().await.unwrap();
    assert_eq!(worker.state(), WorkerState::Completed);
    assert!(worker.passes());

    let summary = worker.report_summary();
    assert_eq!(summary.warning_count(), 1);
    assert_eq!(summary.error_count(), 0);

    worker.teardown().await;
}

#[tokio::test]
async fn test_execute_uploads_issues_and_tears_down() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Arc::new(app_repository().with_log_publishing());
    let seen = trace();
    let a = seen.clone();

    let mut worker = worker(dir.path(), repository.clone(), Arc::new(FakeRuntime::new()))
        .with_tasks(vec![constructor(move || {
            let a = a.clone();
            WrapperTask::new(
                "checks",
                vec![
                    constructor({
                        let a = a.clone();
                        move || Scripted::new("w", Outcome::Log(Log::warn("style")), &a)
                    }),
                    constructor({
                        let a = a.clone();
                        move || Scripted::new("e", Outcome::Log(Log::error("missing")), &a)
                    }),
                    constructor(move || Scripted::new("i", Outcome::Log(Log::info("note")), &a)),
                ],
            )
        })]);

    worker.execute().await.unwrap();

    assert_eq!(worker.state(), WorkerState::TornDown);
    assert!(worker.workspace().is_none());
    assert!(std::fs::read_dir(dir.path().join("workspaces")).unwrap().next().is_none());

    let uploads = repository.uploaded_logs();
    let titles: Vec<_> = uploads.iter().map(|(log, _, _)| log.title.as_str()).collect();
    assert_eq!(titles, vec!["style", "missing"]);
    assert!(uploads.iter().all(|(_, stage, reference)| stage == "review" && reference == "refs/heads/master"));
    assert!(repository.uploaded_packages().is_empty());

    let context = worker.into_context();
    assert_eq!(context.logs.len(), 3);
}

#[tokio::test]
async fn test_execute_tears_down_after_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Arc::new(app_repository().with_log_publishing());
    let seen = trace();
    let a = seen.clone();

    let mut worker = worker(dir.path(), repository.clone(), Arc::new(FakeRuntime::new()))
        .with_tasks(vec![constructor(move || Scripted::new("a", Outcome::Fatal("boom"), &a))]);

    let err = worker.execute().await.unwrap_err();
    assert!(matches!(err, WorkerError::Io(_)));
    assert_eq!(worker.state(), WorkerState::TornDown);
    assert!(std::fs::read_dir(dir.path().join("workspaces")).unwrap().next().is_none());
    assert!(repository.uploaded_logs().is_empty());
}

#[tokio::test]
async fn test_upload_skips_absent_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Arc::new(app_repository());
    let mut worker = worker(dir.path(), repository.clone(), Arc::new(FakeRuntime::new()))
        .with_tasks(Vec::new());

    worker.report(Log::error("broken"));
    worker.context_mut().package = Some(houston_types::Package {
        path: dir.path().join("app.deb"),
        name: "app".into(),
        description: "App".into(),
        kind: houston_types::PackageKind::Deb,
    });

    worker.upload().await.unwrap();
    assert!(repository.uploaded_logs().is_empty());
    assert!(repository.uploaded_packages().is_empty());
}

#[tokio::test]
async fn test_build_matrix_with_packaging_branches() {
    let dir = tempfile::tempdir().unwrap();
    let repository = MemoryRepository::new("mem://app").with_empty_references([
        "refs/heads/deb-packaging-loki",
        "refs/heads/deb-packaging-juno",
        "refs/heads/deb-packaging",
        "refs/heads/juno",
        "refs/heads/loki",
        "refs/heads/master",
    ]);
    let worker = Worker::new(
        config(dir.path()),
        Arc::new(repository),
        Arc::new(FakeRuntime::new()),
        context().with_references(["refs/heads/loki"]).with_distribution("loki"),
    )
    .unwrap();

    assert_eq!(
        worker.build_matrix().await.unwrap(),
        vec![
            BuildTarget::new("amd64", "loki", "deb"),
            BuildTarget::new("amd64", "juno", "deb"),
        ]
    );
}

#[tokio::test]
async fn test_build_matrix_without_distribution_branches() {
    let dir = tempfile::tempdir().unwrap();
    let repository = MemoryRepository::new("mem://app")
        .with_empty_references(["refs/heads/deb-packaging", "refs/heads/master"]);
    let worker = Worker::new(
        config(dir.path()),
        Arc::new(repository),
        Arc::new(FakeRuntime::new()),
        context().with_references(["refs/heads/loki"]).with_distribution("loki"),
    )
    .unwrap();

    assert_eq!(
        worker.build_matrix().await.unwrap(),
        vec![BuildTarget::new("amd64", "juno", "deb")]
    );
}
