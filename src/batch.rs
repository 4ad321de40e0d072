use crate::watermark::{LogoVariant, WatermarkError, WatermarkSpec, process_image};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// One batch of photos to watermark with a single logo setup.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub items: Vec<PathBuf>,
    pub spec: Arc<WatermarkSpec>,
    pub output_directory: PathBuf,
    pub jpeg_quality: u8,
}

/// Progress notifications sent while the worker runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
        source: PathBuf,
    },
    Finished {
        index: usize,
        source: PathBuf,
        output: PathBuf,
        variant: LogoVariant,
    },
    Failed {
        index: usize,
        source: PathBuf,
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Source and output path of each watermarked photo
    pub succeeded: Vec<(PathBuf, PathBuf)>,
    /// Source path and error message of each photo that failed
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Where the watermarked copy of `source` goes.
///
/// The file name is kept; if that would overwrite the source itself a
/// `_watermarked` suffix is added to the stem.
pub fn output_path_for(source: &Path, output_directory: &Path) -> Result<PathBuf, WatermarkError> {
    let file_name = source.file_name().ok_or(WatermarkError::InvalidPath)?;
    let candidate = output_directory.join(file_name);

    let same_file = match (candidate.canonicalize(), source.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => candidate == source,
    };
    if !same_file {
        return Ok(candidate);
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{}_watermarked.{}", stem, ext.to_string_lossy()),
        None => format!("{}_watermarked", stem),
    };
    Ok(output_directory.join(name))
}

/// `path` with its directory resolved, so different spellings of the same
/// location compare equal even when the file does not exist yet.
fn normalize(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Output paths handed out so far in one batch.
///
/// Starts out holding every input, so no output lands on a photo that is
/// still waiting to be read.
pub(crate) struct OutputClaims {
    claimed: HashSet<PathBuf>,
}

impl OutputClaims {
    pub(crate) fn new(items: &[PathBuf]) -> Self {
        Self {
            claimed: items.iter().map(|item| normalize(item)).collect(),
        }
    }

    /// Output path for `source` that no other item of the batch uses:
    /// `name.ext`, then `name_1.ext`, `name_2.ext`, ...
    pub(crate) fn claim(
        &mut self,
        source: &Path,
        output_directory: &Path,
    ) -> Result<PathBuf, WatermarkError> {
        let preferred = output_path_for(source, output_directory)?;
        if self.claimed.insert(normalize(&preferred)) {
            return Ok(preferred);
        }

        let stem = preferred
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = preferred
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut counter = 1;
        loop {
            let candidate = output_directory.join(format!("{}_{}{}", stem, counter, extension));
            if self.claimed.insert(normalize(&candidate)) {
                debug!("Output {:?} already taken, using {:?}", preferred, candidate);
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}

fn process_item(
    job: &BatchJob,
    source: &Path,
    claims: &mut OutputClaims,
) -> Result<(PathBuf, LogoVariant), WatermarkError> {
    let output = claims.claim(source, &job.output_directory)?;
    let outcome = process_image(source, &output, &job.spec, job.jpeg_quality)?;
    Ok((output, outcome.variant))
}

fn send(progress: &Option<mpsc::UnboundedSender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = progress {
        // The receiver may have gone away; the batch still runs to completion
        let _ = tx.send(event);
    }
}

/// Run the batch sequentially on one blocking worker thread.
///
/// A failing item is logged, reported through `progress` and the report,
/// and the next item is processed.
pub async fn run_batch(
    job: BatchJob,
    progress: Option<mpsc::UnboundedSender<BatchEvent>>,
) -> Result<BatchReport, WatermarkError> {
    tokio::fs::create_dir_all(&job.output_directory).await?;

    tokio::task::spawn_blocking(move || {
        let started_at = Utc::now();
        let total = job.items.len();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut claims = OutputClaims::new(&job.items);

        info!(
            "Watermarking {} photo(s) into {:?}",
            total, job.output_directory
        );

        for (index, source) in job.items.iter().enumerate() {
            send(
                &progress,
                BatchEvent::Started {
                    index,
                    total,
                    source: source.clone(),
                },
            );

            match process_item(&job, source, &mut claims) {
                Ok((output, variant)) => {
                    info!("Watermarked {:?} -> {:?}", source, output);
                    send(
                        &progress,
                        BatchEvent::Finished {
                            index,
                            source: source.clone(),
                            output: output.clone(),
                            variant,
                        },
                    );
                    succeeded.push((source.clone(), output));
                }
                Err(e) => {
                    error!("Failed to watermark {:?}: {}", source, e);
                    send(
                        &progress,
                        BatchEvent::Failed {
                            index,
                            source: source.clone(),
                            error: e.to_string(),
                        },
                    );
                    failed.push((source.clone(), e.to_string()));
                }
            }
        }

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            succeeded,
            failed,
        };
        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        report
    })
    .await
    .map_err(|e| WatermarkError::IoError(std::io::Error::other(e)))
}
