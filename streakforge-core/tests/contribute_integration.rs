use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use streakforge_core::analytics::ContributionRecord;
use streakforge_core::config::{
    Cadence, CommitIdentity, GenerationConfig, McpSettings, ParallelConfig, PatternConfig,
    PushPolicy, RepoConfig, Settings,
};
use streakforge_core::contract::{MockContributionStore, MockNotifier};
use streakforge_core::contribute::{run_pass, targets_from, OutcomeStatus};
use streakforge_core::generate::{GeneratorStack, Tier};
use streakforge_core::mcp::McpClient;
use streakforge_core::notify::{Event, Level};
use streakforge_core::retry::RetryPolicy;

fn git(cwd: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("git should be runnable");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Fresh bare repository acting as the hosted remote.
fn bare_remote(root: &Path) -> PathBuf {
    let remote = root.join("origin.git");
    std::fs::create_dir_all(&remote).unwrap();
    git(&remote, &["-c", "init.defaultBranch=main", "init", "--bare"]);
    remote
}

fn settings_for(remote_url: String, root: &Path) -> Settings {
    Settings {
        repositories: vec![RepoConfig {
            slug: "local/fixture".to_string(),
            url: Some(remote_url),
            branch: "main".to_string(),
        }],
        workdir: root.join("work"),
        cadence: Cadence {
            min_commits: 1,
            max_commits: 1,
            min_interval_hours: 0.0,
            max_interval_hours: 0.0,
        },
        patterns: PatternConfig::default(),
        generation: GenerationConfig::default(),
        split_commits: None,
        push: PushPolicy::default(),
        parallel: ParallelConfig::default(),
        analytics_path: root.join("contributions.jsonl"),
        identity: CommitIdentity::default(),
    }
}

fn capturing_notifier() -> (MockNotifier, Arc<Mutex<Vec<Event>>>) {
    let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().returning(move |event| {
        sink.lock().unwrap().push(event);
        Ok(())
    });
    (notifier, events)
}

fn capturing_store() -> (MockContributionStore, Arc<Mutex<Vec<ContributionRecord>>>) {
    let records: Arc<Mutex<Vec<ContributionRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = records.clone();
    let mut store = MockContributionStore::new();
    store.expect_append().returning(move |record| {
        sink.lock().unwrap().push(record.clone());
        Ok(())
    });
    (store, records)
}

#[tokio::test]
async fn single_pass_produces_exactly_one_commit() {
    let dir = tempfile::tempdir().unwrap();
    let remote = bare_remote(dir.path());
    let settings = settings_for(format!("file://{}", remote.display()), dir.path());
    settings.validate().expect("fixture settings must validate");

    let stack = GeneratorStack::with_floor(vec![]);
    let (notifier, _events) = capturing_notifier();
    let (store, records) = capturing_store();
    let mut targets = targets_from(&settings);

    let report = run_pass(&settings, &stack, &notifier, &store, None, &mut targets).await;

    assert_eq!(report.completed(), 1, "summary: {}", report.summary());
    assert_eq!(
        report.outcomes[0].status,
        OutcomeStatus::Completed { commits: 1 }
    );

    // The remote really received exactly one commit.
    assert_eq!(git(&remote, &["rev-list", "--count", "main"]), "1");

    // The committed file holds non-empty content.
    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.commit_count(), 1);
    let committed = settings
        .workdir
        .join("local_fixture")
        .join(&record.files[0]);
    let content = std::fs::read_to_string(&committed).unwrap();
    assert!(!content.trim().is_empty());

    // The push confirmed before the timestamp moved.
    assert!(targets[0].last_contribution.is_some());
}

#[tokio::test]
async fn a_completed_repository_is_skipped_until_due_again() {
    let dir = tempfile::tempdir().unwrap();
    let remote = bare_remote(dir.path());
    let mut settings = settings_for(format!("file://{}", remote.display()), dir.path());

    let stack = GeneratorStack::with_floor(vec![]);
    let (notifier, _events) = capturing_notifier();
    let (store, _records) = capturing_store();
    let mut targets = targets_from(&settings);

    let first = run_pass(&settings, &stack, &notifier, &store, None, &mut targets).await;
    assert_eq!(first.completed(), 1);

    // Raise the interval so the freshly stamped repository is no longer due.
    settings.cadence.min_interval_hours = 1000.0;
    settings.cadence.max_interval_hours = 2000.0;
    let second = run_pass(&settings, &stack, &notifier, &store, None, &mut targets).await;
    assert_eq!(second.skipped(), 1, "summary: {}", second.summary());
    assert_eq!(git(&remote, &["rev-list", "--count", "main"]), "1");
}

#[tokio::test]
async fn failure_in_one_repository_does_not_affect_others() {
    let dir = tempfile::tempdir().unwrap();
    let remote = bare_remote(dir.path());
    let mut settings = settings_for(format!("file://{}", remote.display()), dir.path());
    settings.repositories.insert(
        0,
        RepoConfig {
            slug: "local/broken".to_string(),
            url: Some(format!("file://{}/does-not-exist.git", dir.path().display())),
            branch: "main".to_string(),
        },
    );

    let stack = GeneratorStack::with_floor(vec![]);
    let (notifier, events) = capturing_notifier();
    let (store, _records) = capturing_store();
    let mut targets = targets_from(&settings);

    let report = run_pass(&settings, &stack, &notifier, &store, None, &mut targets).await;

    assert_eq!(report.failed(), 1, "summary: {}", report.summary());
    assert_eq!(report.completed(), 1, "summary: {}", report.summary());
    let healthy = report
        .outcomes
        .iter()
        .find(|o| o.slug == "local/fixture")
        .unwrap();
    assert!(matches!(
        healthy.status,
        OutcomeStatus::Completed { commits: 1 }
    ));
    assert_eq!(git(&remote, &["rev-list", "--count", "main"]), "1");

    // The broken repository surfaced as an error-level event.
    let events = events.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| e.level == Level::Error && e.message.contains("local/broken")));
}

#[tokio::test]
async fn parallel_pass_processes_every_repository() {
    let dir = tempfile::tempdir().unwrap();
    let remote_a = bare_remote(&dir.path().join("a"));
    let remote_b = {
        let root = dir.path().join("b");
        bare_remote(&root)
    };
    let mut settings = settings_for(format!("file://{}", remote_a.display()), dir.path());
    settings.repositories.push(RepoConfig {
        slug: "local/second".to_string(),
        url: Some(format!("file://{}", remote_b.display())),
        branch: "main".to_string(),
    });
    settings.parallel = ParallelConfig {
        enabled: true,
        workers: 2,
    };

    let stack = GeneratorStack::with_floor(vec![]);
    let (notifier, _events) = capturing_notifier();
    let (store, _records) = capturing_store();
    let mut targets = targets_from(&settings);

    let report = run_pass(&settings, &stack, &notifier, &store, None, &mut targets).await;

    assert_eq!(report.completed(), 2, "summary: {}", report.summary());
    assert_eq!(git(&remote_a, &["rev-list", "--count", "main"]), "1");
    assert_eq!(git(&remote_b, &["rev-list", "--count", "main"]), "1");
}

/// Minimal HTTP stub that answers 500 to everything, counting hits.
async fn spawn_failing_service() -> (String, Arc<AtomicUsize>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf).await;
            let _ = stream
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                )
                .await;
            let _ = stream.shutdown().await;
        }
    });
    (format!("http://{addr}"), hits)
}

#[tokio::test]
async fn exhausted_ai_retries_fall_back_and_emit_an_error_event() {
    let dir = tempfile::tempdir().unwrap();
    let remote = bare_remote(dir.path());
    let settings = settings_for(format!("file://{}", remote.display()), dir.path());

    let (endpoint, hits) = spawn_failing_service().await;
    let mcp_settings = McpSettings {
        endpoint,
        max_retries: 3,
        timeout_secs: 5,
        chance: 1.0,
    };
    let client = McpClient::new(&mcp_settings, "test-key")
        .unwrap()
        .with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_factor: 2.0,
            jitter: false,
        });
    let stack = GeneratorStack::with_floor(vec![Tier {
        generator: Arc::new(client),
        entry_chance: 1.0,
    }]);

    let (notifier, events) = capturing_notifier();
    let (store, _records) = capturing_store();
    let mut targets = targets_from(&settings);

    let report = run_pass(&settings, &stack, &notifier, &store, None, &mut targets).await;

    // The run still produced exactly one commit via the template floor.
    assert_eq!(report.completed(), 1, "summary: {}", report.summary());
    assert_eq!(git(&remote, &["rev-list", "--count", "main"]), "1");

    // The whole retry budget was spent against the service.
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    // An error-level event called out the AI fallback.
    let events = events.lock().unwrap();
    assert!(
        events
            .iter()
            .any(|e| e.level == Level::Error && e.title.contains("AI generation fell back")),
        "events: {events:?}"
    );
}

#[tokio::test]
async fn a_repository_with_a_fresh_timestamp_is_never_touched() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_for(
        format!("file://{}/never-created.git", dir.path().display()),
        dir.path(),
    );
    settings.cadence.min_interval_hours = 1000.0;
    settings.cadence.max_interval_hours = 2000.0;

    let stack = GeneratorStack::with_floor(vec![]);
    let (notifier, events) = capturing_notifier();
    let (store, _records) = capturing_store();
    let mut targets = targets_from(&settings);
    targets[0].last_contribution = Some(Utc::now());

    let report = run_pass(&settings, &stack, &notifier, &store, None, &mut targets).await;

    assert_eq!(report.skipped(), 1, "summary: {}", report.summary());
    // The scheduler skipped before any git operation: the working copy was
    // never created.
    assert!(!settings.workdir.join("local_fixture").exists());
    let events = events.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| e.level == Level::Info && e.title.contains("Repository skipped")));
}
