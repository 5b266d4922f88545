//! End-to-end collection against a mock GitHub API.

#![expect(
    clippy::panic_in_result_fn,
    reason = "Test assertions are expected to panic on failure"
)]

use std::sync::Arc;
use std::time::Duration;

use prsnap::github::clock::test_support::{FixedClock, RecordingSleeper};
use prsnap::snapshot::{CheckConclusion, CheckSource, PullRequestState, ReviewState};
use prsnap::telemetry::test_support::RecordingTelemetrySink;
use prsnap::{
    ActivityCollector, ClientSettings, HttpGateway, IntakeError, PersonalAccessToken,
    RenderOptions, Resource, TelemetryEvent, TransportClient, write_summary,
};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const NOW: u64 = 1_700_000_000;
const MERGE_SHA: &str = "9f8e7d6c5b4a39281706f5e4d3c2b1a098765432";
const REPO: &str = "/repos/octo/widgets";
const PULL: &str = "/repos/octo/widgets/pulls/42";

struct Harness {
    server: MockServer,
    sleeper: Arc<RecordingSleeper>,
    telemetry: Arc<RecordingTelemetrySink>,
    gateway: HttpGateway,
}

async fn harness() -> Result<Harness, Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let sleeper = Arc::new(RecordingSleeper::default());
    let telemetry = Arc::new(RecordingTelemetrySink::default());
    let token = PersonalAccessToken::new("ghp_integration")?;
    let client = TransportClient::new(ClientSettings::for_base(Url::parse(&server.uri())?), token)?
        .with_clock(Arc::new(FixedClock(NOW)))
        .with_sleeper(sleeper.clone())
        .with_telemetry(telemetry.clone());

    Ok(Harness {
        server,
        sleeper,
        telemetry,
        gateway: HttpGateway::new(client),
    })
}

fn user(login: &str) -> Value {
    json!({"login": login})
}

fn commit(sha_digit: char, message: &str, author: &str, date: &str) -> Value {
    json!({
        "sha": sha_digit.to_string().repeat(40),
        "html_url": format!("https://github.com/octo/widgets/commit/{sha_digit}"),
        "commit": {
            "message": message,
            "author": {"name": author, "email": "dev@example.com", "date": date}
        }
    })
}

async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a merged pull request whose commits span two pages.
async fn mount_merged_pull_request(server: &MockServer) {
    mount_json(
        server,
        PULL,
        json!({
            "number": 42,
            "title": "Teach widgets to spin",
            "state": "closed",
            "html_url": "https://github.com/octo/widgets/pull/42",
            "user": user("octocat"),
            "body": "Spinning support.\n\nFixes #7 and resolves #9.",
            "created_at": "2024-03-01T09:00:00Z",
            "merged": true,
            "merged_at": "2024-03-02T17:30:00Z",
            "merged_by": user("maintainer"),
            "merge_commit_sha": MERGE_SHA,
            "base": {"ref": "main"},
            "head": {"ref": "feature/spin"},
            "labels": [{"name": "enhancement"}]
        }),
    )
    .await;

    let commits = format!("{PULL}/commits");
    let next = format!(
        "<{}{commits}?per_page=100&page=2>; rel=\"next\"",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path(commits.as_str()))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([commit(
            'b',
            "Document spinning",
            "Grace",
            "2024-03-01T12:00:00Z"
        )])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(commits.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", next.as_str())
                .set_body_json(json!([commit(
                    'a',
                    "Add spin()\n\nLonger explanation.",
                    "Ada",
                    "2024-03-01T10:00:00Z"
                )])),
        )
        .mount(server)
        .await;

    mount_json(
        server,
        &format!("{PULL}/files"),
        json!([
            {"filename": "src/spin.rs", "status": "added", "additions": 40, "deletions": 0},
            {"filename": "src/lib.rs", "status": "modified", "additions": 2, "deletions": 1},
            {"filename": "docs/spinning.md", "status": "renamed", "additions": 0,
             "deletions": 0, "previous_filename": "docs/rotation.md"}
        ]),
    )
    .await;
    mount_json(
        server,
        &format!("{REPO}/issues/42/comments"),
        json!([
            {"id": 100, "user": user("grace"), "body": "Looks promising",
             "created_at": "2024-03-01T11:00:00Z"},
            {"id": 101, "user": user("octocat"), "body": null,
             "created_at": "2024-03-02T08:00:00Z"}
        ]),
    )
    .await;
    mount_json(
        server,
        &format!("{PULL}/comments"),
        json!([
            {"id": 200, "user": user("reviewer"), "body": "Off by one?",
             "created_at": "2024-03-01T15:00:00Z", "path": "src/spin.rs", "line": 12}
        ]),
    )
    .await;
    mount_json(
        server,
        &format!("{PULL}/reviews"),
        json!([
            {"id": 300, "user": user("reviewer"), "state": "CHANGES_REQUESTED",
             "submitted_at": "2024-03-01T16:00:00Z", "body": "Please fix"},
            {"id": 301, "user": user("reviewer"), "state": "APPROVED",
             "submitted_at": "2024-03-01T16:00:00Z", "body": ""}
        ]),
    )
    .await;
    mount_json(
        server,
        &format!("{REPO}/commits/{MERGE_SHA}/check-runs"),
        json!({
            "total_count": 2,
            "check_runs": [
                {"name": "test", "status": "completed", "conclusion": "success",
                 "started_at": "2024-03-02T17:00:00Z", "completed_at": "2024-03-02T17:02:30Z",
                 "app": {"name": "GitHub Actions"}},
                {"name": "lint", "status": "in_progress", "conclusion": null}
            ]
        }),
    )
    .await;
    mount_json(
        server,
        &format!("{REPO}/commits/{MERGE_SHA}/status"),
        json!({
            "state": "failure",
            "statuses": [
                {"context": "test", "state": "failure"},
                {"context": "ci/legacy", "state": "error",
                 "target_url": "https://ci.example.com/42"}
            ]
        }),
    )
    .await;
}

#[tokio::test]
async fn collects_a_merged_pull_request_end_to_end() -> TestResult {
    let harness = harness().await?;
    mount_merged_pull_request(&harness.server).await;
    let collector = ActivityCollector::new(&harness.gateway, harness.telemetry.as_ref());

    let snapshot = collector.collect("octo", "widgets", 42, None).await?;

    assert_eq!(snapshot.state(), PullRequestState::Merged);
    assert_eq!(snapshot.merge_commit_sha().as_str(), MERGE_SHA);
    assert_eq!(snapshot.linked_issues(), &[7, 9]);
    let authors: Vec<_> = snapshot.commits().iter().map(|c| c.author.as_str()).collect();
    assert_eq!(authors, vec!["Ada", "Grace"], "both commit pages in order");
    assert_eq!(
        (snapshot.total_additions(), snapshot.total_deletions()),
        (42, 1)
    );
    let comment_ids: Vec<_> = snapshot.comments().iter().map(|c| c.id).collect();
    assert_eq!(comment_ids, vec![100, 200, 101]);
    let review_states: Vec<_> = snapshot.reviews().iter().map(|r| r.state).collect();
    assert_eq!(
        review_states,
        vec![ReviewState::ChangesRequested, ReviewState::Approved],
        "equal submission times keep server order"
    );
    let checks: Vec<_> = snapshot
        .check_runs()
        .iter()
        .map(|c| (c.name.as_str(), c.conclusion, c.source))
        .collect();
    assert_eq!(
        checks,
        vec![
            ("test", CheckConclusion::Success, CheckSource::CheckRun),
            ("lint", CheckConclusion::Pending, CheckSource::CheckRun),
            ("ci/legacy", CheckConclusion::Failure, CheckSource::CommitStatus),
        ]
    );
    assert_eq!(
        snapshot.check_runs().first().and_then(|c| c.duration),
        Some(Duration::from_secs(150))
    );
    assert_eq!(
        snapshot.participants(),
        &["octocat", "maintainer", "grace", "reviewer", "Ada", "Grace"]
    );
    assert!(harness.sleeper.pauses().is_empty(), "no retries were needed");
    Ok(())
}

#[tokio::test]
async fn collected_snapshot_renders_to_markdown() -> TestResult {
    let harness = harness().await?;
    mount_merged_pull_request(&harness.server).await;
    let collector = ActivityCollector::new(&harness.gateway, harness.telemetry.as_ref());
    let snapshot = collector.collect("octo", "widgets", 42, None).await?;

    let mut rendered = Vec::new();
    write_summary(&mut rendered, &snapshot, &RenderOptions::default())?;
    let markdown = String::from_utf8(rendered)?;

    assert!(markdown.starts_with("# 🟣 PR #42: Teach widgets to spin"));
    assert!(markdown.contains("## Commits (2)"));
    assert!(markdown.contains("`docs/rotation.md` → `docs/spinning.md`"));
    assert!(markdown.contains("**@reviewer** on `src/spin.rs:12`"));
    assert!(markdown.ends_with(
        "*Summary for PR #42 at 9f8e7d6: 2 commits, 3 comments, 2 reviews, 3 checks, 3 files changed*\n"
    ));
    Ok(())
}

#[tokio::test]
async fn exhausted_rate_limit_aborts_collection() -> TestResult {
    let harness = harness().await?;
    mount_merged_pull_request(&harness.server).await;
    let reset = NOW + 60;
    Mock::given(method("GET"))
        .and(path(format!("{PULL}/reviews")))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.to_string().as_str())
                .set_body_json(json!({"message": "API rate limit exceeded for user"})),
        )
        .with_priority(1)
        .mount(&harness.server)
        .await;
    let collector = ActivityCollector::new(&harness.gateway, harness.telemetry.as_ref());

    let result = collector.collect("octo", "widgets", 42, None).await;

    assert!(
        matches!(
            result,
            Err(IntakeError::RateLimited {
                resource: Resource::Reviews,
                reset_at: Some(value),
                ..
            }) if value == reset
        ),
        "expected RateLimited for reviews, got {result:?}"
    );
    assert!(
        harness.sleeper.pauses().contains(&Duration::from_secs(60)),
        "the client waits for the reset before retrying"
    );
    assert!(harness.telemetry.events().iter().any(|event| matches!(
        event,
        TelemetryEvent::FetchFailed {
            resource: Resource::Reviews,
            ..
        }
    )));
    Ok(())
}

#[tokio::test]
async fn missing_pull_request_is_not_found() -> TestResult {
    let harness = harness().await?;
    Mock::given(method("GET"))
        .and(path(PULL))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .expect(1)
        .mount(&harness.server)
        .await;
    let collector = ActivityCollector::new(&harness.gateway, harness.telemetry.as_ref());

    let result = collector.collect("octo", "widgets", 42, None).await;

    assert!(
        matches!(
            result,
            Err(IntakeError::NotFound {
                resource: Resource::PullRequest,
                ..
            })
        ),
        "expected NotFound, got {result:?}"
    );
    Ok(())
}

#[tokio::test]
async fn invalid_locator_sends_no_requests() -> TestResult {
    let harness = harness().await?;
    let collector = ActivityCollector::new(&harness.gateway, harness.telemetry.as_ref());

    let result = collector.collect("octo", "widgets", 0, None).await;

    assert!(
        matches!(result, Err(IntakeError::Validation { .. })),
        "expected Validation, got {result:?}"
    );
    let requests = harness
        .server
        .received_requests()
        .await
        .map_or(0, |received| received.len());
    assert_eq!(requests, 0);
    Ok(())
}
