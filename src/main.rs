//! prsnap CLI entrypoint: collect a pull request snapshot and store it as a
//! git note.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use prsnap::actions::{Annotation, StepOutputs, running_in_actions, write_annotation};
use prsnap::{
    ActivityCollector, Git2NotesStore, HttpGateway, IntakeError, NoopTelemetrySink, NotesStore,
    PrSnapConfig, Snapshot, StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink,
    TransportClient, write_summary,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if running_in_actions()
                && write_annotation(&mut io::stdout().lock(), Annotation::Error, &error.to_string())
                    .is_err()
            {
                return ExitCode::FAILURE;
            }
            if writeln!(io::stderr().lock(), "error: {error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), IntakeError> {
    let config = load_config()?;
    init_tracing(&config.log_level)?;
    config.validate()?;

    let (owner, repo) = config.repository_identity()?;
    let number = config.require_pr_number()?;
    let token = config.resolve_token()?;
    let workflow = running_in_actions();
    let telemetry: Arc<dyn TelemetrySink> = if config.telemetry_jsonl {
        Arc::new(StderrJsonlTelemetrySink)
    } else {
        Arc::new(NoopTelemetrySink)
    };

    let client = TransportClient::new(config.client_settings()?, token.clone())
        .map_err(|error| IntakeError::Configuration {
            message: error.to_string(),
        })?
        .with_telemetry(Arc::clone(&telemetry));
    let gateway = HttpGateway::new(client);
    let collector = ActivityCollector::new(&gateway, telemetry.as_ref())
        .with_timeout(config.collection_timeout());
    let snapshot = collector
        .collect(&owner, &repo, number, config.merge_commit_sha.as_deref())
        .await?;

    if !snapshot.is_merged() && config.merge_commit_sha.is_some() {
        warn!(
            number,
            sha = %snapshot.merge_commit_sha(),
            "pull request is not merged; summarising checks for the supplied commit"
        );
        telemetry.record(TelemetryEvent::UnmergedWithExplicitSha {
            number,
            sha: snapshot.merge_commit_sha().to_string(),
        });
        annotate(
            workflow,
            Annotation::Notice,
            &format!("PR #{number} is not merged"),
        )?;
    }

    let summary = render(&snapshot, &config)?;
    let store = Git2NotesStore::open(config.repository_path(), &config.notes_ref)?
        .with_token(token);
    store.add_note(snapshot.merge_commit_sha(), &summary, true)?;
    if config.no_push {
        info!("skipping notes push");
        annotate(
            workflow,
            Annotation::Notice,
            &format!(
                "Git note created but not pushed. Run: git push {} {}",
                config.remote,
                store.notes_ref()
            ),
        )?;
    } else {
        store.push(&config.remote)?;
        annotate(
            workflow,
            Annotation::Notice,
            &format!("Pushed PR summary for #{number} to {}", config.remote),
        )?;
    }

    let outputs = StepOutputs::default()
        .with("pr_number", number.to_string())
        .with("commit_sha", snapshot.merge_commit_sha().to_string())
        .with("notes_ref", store.notes_ref())
        .with("summary_length", summary.chars().count().to_string());
    if let Some(path) = outputs.publish()? {
        info!(%path, "published step outputs");
    }

    write_outcome(&snapshot, store.notes_ref())
}

/// Emits a workflow annotation when running as an Actions step.
fn annotate(enabled: bool, level: Annotation, message: &str) -> Result<(), IntakeError> {
    if !enabled {
        return Ok(());
    }
    write_annotation(&mut io::stdout().lock(), level, message).map_err(|error| IntakeError::Io {
        message: error.to_string(),
    })
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<PrSnapConfig, IntakeError> {
    PrSnapConfig::load().map_err(|error| IntakeError::Configuration {
        message: error.to_string(),
    })
}

/// Installs a stderr subscriber filtered by `RUST_LOG`, or by `level` when
/// `RUST_LOG` is unset.
fn init_tracing(level: &str) -> Result<(), IntakeError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|error| IntakeError::Configuration {
            message: format!("invalid log_level {level:?}: {error}"),
        })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| IntakeError::Configuration {
            message: format!("failed to initialise logging: {error}"),
        })
}

fn render(snapshot: &Snapshot, config: &PrSnapConfig) -> Result<String, IntakeError> {
    let mut buffer = Vec::new();
    write_summary(&mut buffer, snapshot, &config.render_options())?;
    String::from_utf8(buffer).map_err(|error| IntakeError::Io {
        message: error.to_string(),
    })
}

fn write_outcome(snapshot: &Snapshot, notes_ref: &str) -> Result<(), IntakeError> {
    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "Stored summary of PR #{} ({} commits, {} comments, {} reviews, {} checks) on {} in {notes_ref}",
        snapshot.number(),
        snapshot.commits().len(),
        snapshot.comments().len(),
        snapshot.reviews().len(),
        snapshot.check_runs().len(),
        snapshot.merge_commit_sha().short(),
    )
    .map_err(|error| IntakeError::Io {
        message: error.to_string(),
    })
}
