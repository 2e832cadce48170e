use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use imghost_core::{
    format_size, mime_hint, normalize_directory, update, ContentSource, FileCandidate,
    ItemRowView, ItemStatus, Msg, QueueError, UploadQueue,
};
use imghost_engine::{ContentStore, GithubStore};
use imghost_logging::{imghost_error, imghost_info, LogDestination};
use log::LevelFilter;

use super::cli::{Cli, LogTarget};
use super::config::{load_config, TOKEN_ENV_VAR};
use super::effects::EffectRunner;
use super::observer::ConsoleObserver;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub uploaded: usize,
    pub failed: usize,
}

/// One upload session: what to send, where, and how.
pub(crate) struct BatchPlan {
    pub files: Vec<FileCandidate>,
    pub target_directory: String,
    pub concurrency_limit: usize,
}

pub fn run_app(cli: Cli) -> anyhow::Result<RunSummary> {
    init_logging(&cli);

    let mut config = load_config(&cli.config);
    config.apply_token_override(std::env::var(TOKEN_ENV_VAR).ok());
    let repo = config.repo_config();
    imghost_info!("Using {:?}", repo);

    let browse = GithubStore::new(config.store_settings(), repo.clone())
        .context("failed to build the GitHub client")?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let root = config.root_dir();

    if cli.list_dirs {
        let dirs = runtime
            .block_on(browse.list_directories(&root))
            .context("failed to list folders")?;
        for dir in dirs {
            println!("{dir}");
        }
        return Ok(RunSummary::default());
    }

    if let Some(path) = cli.mkdir.as_deref() {
        let dir = normalize_directory(path);
        runtime
            .block_on(browse.create_directory(&dir))
            .with_context(|| format!("failed to create folder {dir}"))?;
        println!("Created {dir}");
        return Ok(RunSummary::default());
    }

    if cli.files.is_empty() {
        bail!("no files given; pass image paths, --list-dirs or --mkdir");
    }

    let target = cli
        .target
        .as_deref()
        .map(normalize_directory)
        .filter(|dir| !dir.is_empty())
        .unwrap_or_else(|| config.default_target());
    runtime.block_on(ensure_target_directory(&browse, &target))?;

    let plan = BatchPlan {
        files: file_candidates(&cli.files)?,
        target_directory: target.clone(),
        concurrency_limit: cli.threads.unwrap_or(config.upload.concurrency_limit),
    };
    // The upload engine runs on its own runtime, so it gets its own client.
    let store: Arc<dyn ContentStore> = Arc::new(
        GithubStore::new(config.store_settings(), repo)
            .context("failed to build the GitHub client")?,
    );
    let mut observer = ConsoleObserver::new(std::io::stdout());
    let summary = upload_batch(store, plan, &mut observer, &mut prompt_retry)?;

    match runtime.block_on(browse.list_files(&target)) {
        Ok(files) => {
            println!("Files in {target}:");
            for file in files {
                println!("  {} ({})", file.name, format_size(file.size));
            }
        }
        Err(err) => imghost_error!("Failed to refresh listing of {}: {}", target, err),
    }

    Ok(summary)
}

/// Creates `target` unless it already exists.
pub(crate) async fn ensure_target_directory(
    store: &dyn ContentStore,
    target: &str,
) -> anyhow::Result<()> {
    let exists = store
        .directory_exists(target)
        .await
        .with_context(|| format!("failed to look up folder {target}"))?;
    if exists {
        return Ok(());
    }
    imghost_info!("Target folder {} is missing; creating it", target);
    store
        .create_directory(target)
        .await
        .with_context(|| format!("failed to create folder {target}"))
}

/// Lists the failed items and asks on the terminal whether to send them
/// again. Never retries without a terminal to ask on.
fn prompt_retry(failed: &[ItemRowView]) -> bool {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return false;
    }
    println!("{} upload(s) failed:", failed.len());
    for row in failed {
        println!(
            "  {} ({})",
            row.name,
            row.error.as_deref().unwrap_or("unknown error")
        );
    }
    print!("Retry them? [y/N] ");
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if stdin.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match cli.log_to {
        LogTarget::File => LogDestination::File(&cli.log_file),
        LogTarget::Terminal => LogDestination::Terminal,
        LogTarget::Both => LogDestination::Both(&cli.log_file),
    };
    imghost_logging::initialize(destination, level);
}

/// Describes files on disk for the queue. Content is read when uploading.
pub(crate) fn file_candidates(paths: &[PathBuf]) -> anyhow::Result<Vec<FileCandidate>> {
    paths
        .iter()
        .map(|path| {
            let metadata = std::fs::metadata(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            if !metadata.is_file() {
                bail!("{} is not a file", path.display());
            }
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(FileCandidate::new(
                name,
                metadata.len(),
                ContentSource::File(path.clone()),
            ))
        })
        .collect()
}

/// Runs the queue until every item settled. Failed items are only sent again
/// when `confirm_retry` approves the list of failures.
pub(crate) fn upload_batch<W: Write>(
    store: Arc<dyn ContentStore>,
    plan: BatchPlan,
    observer: &mut ConsoleObserver<W>,
    confirm_retry: &mut dyn FnMut(&[ItemRowView]) -> bool,
) -> anyhow::Result<RunSummary> {
    let runner = EffectRunner::new(store).context("failed to start the upload engine")?;
    let mut queue = UploadQueue::new();

    dispatch(&mut queue, &runner, observer, Msg::ConcurrencyChanged(plan.concurrency_limit))
        .context("invalid thread count")?;
    dispatch(
        &mut queue,
        &runner,
        observer,
        Msg::TargetDirectoryChanged(plan.target_directory),
    )
    .context("invalid target folder")?;

    let added = update(&mut queue, Msg::FilesAdded(plan.files)).context("nothing to upload")?;
    for item in queue.items() {
        observer.register(item.id(), item.name());
    }
    runner.run(added, observer);

    dispatch(&mut queue, &runner, observer, Msg::StartClicked)?;
    loop {
        while !queue.is_quiescent() {
            if let Some(msg) = runner.next_msg(POLL_INTERVAL) {
                if let Err(err) = dispatch(&mut queue, &runner, observer, msg) {
                    imghost_error!("Dropped engine message: {}", err);
                }
            }
        }

        let failed: Vec<ItemRowView> = queue
            .view()
            .rows
            .into_iter()
            .filter(|row| row.can_retry)
            .collect();
        if failed.is_empty() || !confirm_retry(&failed) {
            break;
        }
        imghost_info!("Retrying {} failed upload(s)", failed.len());
        for row in failed {
            dispatch(&mut queue, &runner, observer, Msg::RetryClicked(row.item_id))?;
        }
    }

    let summary = RunSummary {
        uploaded: queue.count(ItemStatus::Done),
        failed: queue.count(ItemStatus::Error),
    };
    print_summary(observer.writer(), &queue, summary);
    Ok(summary)
}

fn print_summary<W: Write>(out: &mut W, queue: &UploadQueue, summary: RunSummary) {
    for row in queue.view().rows {
        let outcome = row
            .raw_url
            .as_deref()
            .or(row.error.as_deref())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {} ({}, {}) {}: {}",
            row.name,
            row.size_label,
            mime_hint(&row.name).unwrap_or("application/octet-stream"),
            row.status.label(),
            outcome
        );
    }
    let _ = writeln!(out, "{} uploaded, {} failed", summary.uploaded, summary.failed);
}

fn dispatch<W: Write>(
    queue: &mut UploadQueue,
    runner: &EffectRunner,
    observer: &mut ConsoleObserver<W>,
    msg: Msg,
) -> Result<(), QueueError> {
    let effects = update(queue, msg)?;
    runner.run(effects, observer);
    Ok(())
}
