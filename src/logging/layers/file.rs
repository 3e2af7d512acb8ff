use crate::logging::config::LoggingConfig;
use crate::Result;
use anyhow::{anyhow, bail, Context};
use std::fs::{self, OpenOptions};
use std::path::{Component, Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::{self as tracing_fmt, format};
use tracing_subscriber::layer::Layered;
use tracing_subscriber::registry::LookupSpan;

pub const LOG_FILE_NAME: &str = "flowguard.log";
const STATE_DIR: &str = ".flowguard";

/// One JSON object per event, appended to the log file.
pub type JsonFileLayer<S> =
    tracing_fmt::Layer<S, format::JsonFields, format::Format<format::Json>, NonBlocking>;

/// The file sink is `None` when disabled in config.
pub type FileLayerStack<S> = Layered<Option<JsonFileLayer<S>>, S>;

/// `<workspace>/.flowguard/logs/flowguard.log` unless `log_dir` says otherwise.
/// A relative `log_dir` is taken from the workspace (or home) and may not climb out of it.
pub fn log_file_path(config: &LoggingConfig, workspace_root: Option<&Path>) -> Result<PathBuf> {
    let directory = match &config.log_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => {
            if dir.components().any(|c| matches!(c, Component::ParentDir)) {
                bail!("logging.log_dir '{}' must stay inside its base directory", dir.display());
            }
            base_dir(workspace_root)?.join(dir)
        }
        None => base_dir(workspace_root)?.join(STATE_DIR).join("logs"),
    };
    Ok(directory.join(LOG_FILE_NAME))
}

fn base_dir(workspace_root: Option<&Path>) -> Result<PathBuf> {
    match workspace_root {
        Some(root) => Ok(root.to_path_buf()),
        None => dirs_next::home_dir().ok_or_else(|| anyhow!("no workspace or home directory for logs")),
    }
}

/// Open `log_file` for appending behind a non-blocking writer. The guard must
/// outlive the command or buffered events are lost.
pub fn file_layer<S>(
    log_file: &Path,
    enabled: bool,
) -> Result<(Option<JsonFileLayer<S>>, Option<WorkerGuard>)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if !enabled {
        return Ok((None, None));
    }
    if let Some(directory) = log_file.parent() {
        fs::create_dir_all(directory)
            .with_context(|| format!("failed to create log directory {}", directory.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    let layer = tracing_fmt::layer()
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(writer);
    Ok((Some(layer), Some(guard)))
}
