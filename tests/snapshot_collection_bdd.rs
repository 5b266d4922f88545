//! Behavioural tests for pull request snapshot collection.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use prsnap::github::clock::test_support::{FixedClock, RecordingSleeper};
use prsnap::snapshot::CheckConclusion;
use prsnap::{
    ActivityCollector, ClientSettings, HttpGateway, IntakeError, NoopTelemetrySink,
    PersonalAccessToken, Snapshot, TransportClient,
};
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use serde_json::{Value, json};
use tokio::runtime::Runtime;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOW: u64 = 1_700_000_000;
const REPO: &str = "/repos/octo/widgets";
const MERGE_SHA: &str = "c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00";

/// Shared runtime wrapper that can be stored in rstest-bdd Slot.
#[derive(Clone)]
struct SharedRuntime(Rc<RefCell<Runtime>>);

impl SharedRuntime {
    fn new(runtime: Runtime) -> Self {
        Self(Rc::new(RefCell::new(runtime)))
    }

    fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.0.borrow().block_on(future)
    }
}

#[derive(ScenarioState, Default)]
struct CollectionState {
    runtime: Slot<SharedRuntime>,
    server: Slot<MockServer>,
    token: Slot<String>,
    snapshot: Slot<Snapshot>,
    error: Slot<IntakeError>,
}

#[fixture]
fn collection_state() -> CollectionState {
    CollectionState::default()
}

fn harness_error(message: impl Into<String>) -> IntakeError {
    IntakeError::Configuration {
        message: message.into(),
    }
}

/// Ensures the runtime and server are initialised in `CollectionState`.
fn ensure_runtime_and_server(state: &CollectionState) -> Result<SharedRuntime, IntakeError> {
    if state.runtime.with_ref(|_| ()).is_none() {
        let runtime = Runtime::new().map_err(|error| IntakeError::Io {
            message: format!("failed to create Tokio runtime: {error}"),
        })?;
        state.runtime.set(SharedRuntime::new(runtime));
    }

    let shared_runtime = state
        .runtime
        .get()
        .ok_or_else(|| harness_error("runtime not initialised"))?;

    if state.server.with_ref(|_| ()).is_none() {
        state.server.set(shared_runtime.block_on(MockServer::start()));
    }

    Ok(shared_runtime)
}

fn mount_all(state: &CollectionState, mocks: Vec<Mock>) -> Result<(), IntakeError> {
    let runtime = ensure_runtime_and_server(state)?;
    state
        .server
        .with_ref(|server| {
            for mock in mocks {
                runtime.block_on(mock.mount(server));
            }
        })
        .ok_or_else(|| harness_error("mock server not initialised"))
}

fn json_mock(route: String, body: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

fn pull_request_body(pr: u64, merged: bool) -> Value {
    json!({
        "number": pr,
        "title": format!("Pull request {pr}"),
        "state": if merged { "closed" } else { "open" },
        "html_url": format!("https://github.com/octo/widgets/pull/{pr}"),
        "user": {"login": "octocat"},
        "body": "Closes #5",
        "created_at": "2024-05-01T09:00:00Z",
        "merged": merged,
        "merged_at": if merged { json!("2024-05-02T09:00:00Z") } else { Value::Null },
        "merge_commit_sha": if merged { json!(MERGE_SHA) } else { Value::Null },
        "base": {"ref": "main"},
        "head": {"ref": format!("topic-{pr}")}
    })
}

#[given("a mock GitHub API serving merged pull request {pr:u64} with {count:u64} commits")]
fn seed_merged_pull_request(
    collection_state: &CollectionState,
    pr: u64,
    count: u64,
) -> Result<(), IntakeError> {
    let pull = format!("{REPO}/pulls/{pr}");
    let commits: Vec<_> = (0..count)
        .map(|index| {
            json!({
                "sha": format!("{index:040x}"),
                "commit": {
                    "message": format!("Step {index}"),
                    "author": {"name": "Ada", "date": "2024-05-01T10:00:00Z"}
                }
            })
        })
        .collect();

    mount_all(
        collection_state,
        vec![
            json_mock(pull.clone(), pull_request_body(pr, true)),
            json_mock(format!("{pull}/commits"), json!(commits)),
            json_mock(format!("{pull}/files"), json!([])),
            json_mock(format!("{pull}/comments"), json!([])),
            json_mock(format!("{pull}/reviews"), json!([])),
            json_mock(format!("{REPO}/issues/{pr}/comments"), json!([])),
            json_mock(
                format!("{REPO}/commits/{MERGE_SHA}/check-runs"),
                json!({"check_runs": [
                    {"name": "build", "status": "completed", "conclusion": "success"}
                ]}),
            ),
            json_mock(
                format!("{REPO}/commits/{MERGE_SHA}/status"),
                json!({"statuses": []}),
            ),
        ],
    )
}

#[given("a mock GitHub API serving open pull request {pr:u64}")]
fn seed_open_pull_request(collection_state: &CollectionState, pr: u64) -> Result<(), IntakeError> {
    mount_all(
        collection_state,
        vec![json_mock(
            format!("{REPO}/pulls/{pr}"),
            pull_request_body(pr, false),
        )],
    )
}

#[given("the commits endpoint for pull request {pr:u64} stays rate limited")]
fn seed_rate_limited_commits(
    collection_state: &CollectionState,
    pr: u64,
) -> Result<(), IntakeError> {
    let limited = Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls/{pr}/commits")))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", (NOW + 1).to_string().as_str())
                .set_body_json(json!({"message": "API rate limit exceeded"})),
        )
        .with_priority(1);
    mount_all(collection_state, vec![limited])
}

#[given("a mock GitHub API that rejects credentials for pull request {pr:u64}")]
fn seed_rejecting_server(collection_state: &CollectionState, pr: u64) -> Result<(), IntakeError> {
    let rejecting = Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls/{pr}")))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        );
    mount_all(collection_state, vec![rejecting])
}

#[given("a personal access token {token}")]
fn remember_token(collection_state: &CollectionState, token: String) {
    collection_state.token.set(token);
}

/// Splits `owner/repo#number`.
fn parse_target(target: &str) -> Result<(&str, &str, u64), IntakeError> {
    let (owner, rest) = target
        .split_once('/')
        .ok_or_else(|| harness_error(format!("target {target} has no owner")))?;
    let (repo, number) = rest
        .rsplit_once('#')
        .ok_or_else(|| harness_error(format!("target {target} has no number")))?;
    let parsed = number
        .parse()
        .map_err(|error| harness_error(format!("target {target}: {error}")))?;
    Ok((owner, repo, parsed))
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[when("the collector gathers {target}")]
fn gather(collection_state: &CollectionState, target: String) -> Result<(), IntakeError> {
    let (owner, repo, number) = parse_target(target.trim_matches('"'))?;
    let runtime = ensure_runtime_and_server(collection_state)?;
    let server_url = collection_state
        .server
        .with_ref(MockServer::uri)
        .ok_or_else(|| harness_error("mock server URL missing"))?;
    let base = Url::parse(&server_url).map_err(|error| harness_error(error.to_string()))?;
    let token_value = collection_state
        .token
        .get()
        .ok_or_else(|| harness_error("token not set"))?;
    let token = PersonalAccessToken::new(token_value)?;
    let client = TransportClient::new(ClientSettings::for_base(base), token)
        .map_err(|error| harness_error(error.to_string()))?
        .with_clock(Arc::new(FixedClock(NOW)))
        .with_sleeper(Arc::new(RecordingSleeper::default()));
    let gateway = HttpGateway::new(client);
    let telemetry = NoopTelemetrySink;

    let result = runtime.block_on(async {
        ActivityCollector::new(&gateway, &telemetry)
            .collect(owner, repo, number, None)
            .await
    });

    match result {
        Ok(snapshot) => {
            drop(collection_state.error.take());
            collection_state.snapshot.set(snapshot);
        }
        Err(error) => {
            drop(collection_state.snapshot.take());
            collection_state.error.set(error);
        }
    }
    Ok(())
}

fn with_snapshot<T>(
    collection_state: &CollectionState,
    read: impl FnOnce(&Snapshot) -> T,
) -> Result<T, IntakeError> {
    collection_state.snapshot.with_ref(read).ok_or_else(|| {
        let cause = collection_state
            .error
            .with_ref(ToString::to_string)
            .unwrap_or_else(|| "nothing was collected".to_owned());
        harness_error(format!("snapshot missing: {cause}"))
    })
}

fn stored_error(collection_state: &CollectionState) -> Result<IntakeError, IntakeError> {
    collection_state
        .error
        .with_ref(Clone::clone)
        .ok_or_else(|| harness_error("expected collection to fail"))
}

#[then("the snapshot reports {count:u64} commits")]
fn assert_commit_count(collection_state: &CollectionState, count: u64) -> Result<(), IntakeError> {
    let actual = with_snapshot(collection_state, |snapshot| snapshot.commits().len() as u64)?;
    if actual == count {
        Ok(())
    } else {
        Err(harness_error(format!(
            "expected {count} commits but found {actual}"
        )))
    }
}

#[then("the snapshot links issue {issue:u64}")]
fn assert_linked_issue(collection_state: &CollectionState, issue: u64) -> Result<(), IntakeError> {
    let linked = with_snapshot(collection_state, |snapshot| snapshot.linked_issues().to_vec())?;
    if linked.contains(&issue) {
        Ok(())
    } else {
        Err(harness_error(format!(
            "issue {issue} not among linked issues {linked:?}"
        )))
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd passes owned step arguments"
)]
#[then("the snapshot reports check {name} as success")]
fn assert_successful_check(
    collection_state: &CollectionState,
    name: String,
) -> Result<(), IntakeError> {
    let passed = with_snapshot(collection_state, |snapshot| {
        snapshot
            .check_runs()
            .iter()
            .any(|check| check.name == name && check.conclusion == CheckConclusion::Success)
    })?;
    if passed {
        Ok(())
    } else {
        Err(harness_error(format!("check {name} did not succeed")))
    }
}

#[then("collection fails with a validation error")]
fn assert_validation_error(collection_state: &CollectionState) -> Result<(), IntakeError> {
    match stored_error(collection_state)? {
        IntakeError::Validation { .. } => Ok(()),
        other => Err(harness_error(format!(
            "expected Validation variant, got {other:?}"
        ))),
    }
}

#[then("collection fails because the rate limit was exceeded")]
fn assert_rate_limited(collection_state: &CollectionState) -> Result<(), IntakeError> {
    match stored_error(collection_state)? {
        IntakeError::RateLimited {
            reset_at: Some(reset),
            ..
        } if reset == NOW + 1 => Ok(()),
        other => Err(harness_error(format!(
            "expected RateLimited variant, got {other:?}"
        ))),
    }
}

#[then("collection fails with an authentication error")]
fn assert_authentication_error(collection_state: &CollectionState) -> Result<(), IntakeError> {
    match stored_error(collection_state)? {
        IntakeError::Authentication { message, .. }
            if message.to_lowercase().contains("credentials") =>
        {
            Ok(())
        }
        other => Err(harness_error(format!(
            "expected Authentication variant, got {other:?}"
        ))),
    }
}

#[scenario(path = "tests/features/snapshot_collection.feature", index = 0)]
fn collect_merged_pull_request(collection_state: CollectionState) {
    let _ = collection_state;
}

#[scenario(path = "tests/features/snapshot_collection.feature", index = 1)]
fn refuse_unmerged_pull_request(collection_state: CollectionState) {
    let _ = collection_state;
}

#[scenario(path = "tests/features/snapshot_collection.feature", index = 2)]
fn give_up_on_exhausted_rate_limit(collection_state: CollectionState) {
    let _ = collection_state;
}

#[scenario(path = "tests/features/snapshot_collection.feature", index = 3)]
fn reject_revoked_token(collection_state: CollectionState) {
    let _ = collection_state;
}
