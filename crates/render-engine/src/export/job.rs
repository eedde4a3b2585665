//! Concurrent export jobs.
//!
//! Every job runs on its own task with its own status channel and cancel
//! flag. A failing job only ever changes its own status.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use mosaic_common::error::{MosaicError, MosaicResult};

use super::encoder::EncoderWorker;
use super::pipeline::{export, ExportArtifact, ExportRequest};
use super::{ExportProgress, ExportStage, ExportStatus, ProgressCallback};
use crate::fonts::FontBook;
use crate::media::lock;

pub type JobId = Uuid;

/// Caller's view of one running export.
#[derive(Debug)]
pub struct ExportHandle {
    id: JobId,
    status: watch::Receiver<ExportStatus>,
    cancel: Arc<AtomicBool>,
    task: JoinHandle<MosaicResult<ExportArtifact>>,
}

impl ExportHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> ExportStatus {
        self.status.borrow().clone()
    }

    /// A receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<ExportStatus> {
        self.status.clone()
    }

    /// Ask the job to stop after the frame in progress.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Wait for the job to end.
    pub async fn wait(self) -> MosaicResult<ExportArtifact> {
        self.task
            .await
            .map_err(|e| MosaicError::encode(format!("export task failed: {e}")))?
    }
}

#[derive(Debug)]
struct JobEntry {
    status: watch::Receiver<ExportStatus>,
    cancel: Arc<AtomicBool>,
}

/// Registry of export jobs started in this session.
#[derive(Debug, Default)]
pub struct ExportJobs {
    fonts: Arc<FontBook>,
    jobs: Mutex<HashMap<JobId, JobEntry>>,
}

impl ExportJobs {
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self {
            fonts,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Start an export on the Tokio runtime. When `output` is given the
    /// artifact is also written there before the job reports done.
    pub fn start(
        &self,
        request: ExportRequest,
        worker: Box<dyn EncoderWorker>,
        output: Option<PathBuf>,
    ) -> ExportHandle {
        let id = Uuid::new_v4();
        let (status_tx, status_rx) = watch::channel(ExportStatus::Preparing);
        let status_tx = Arc::new(status_tx);
        let cancel = Arc::new(AtomicBool::new(false));
        lock(&self.jobs).insert(
            id,
            JobEntry {
                status: status_rx.clone(),
                cancel: Arc::clone(&cancel),
            },
        );

        let fonts = Arc::clone(&self.fonts);
        let flag = Arc::clone(&cancel);
        let task = tokio::spawn(async move {
            let progress_tx = Arc::clone(&status_tx);
            let on_progress: ProgressCallback = Box::new(move |p: ExportProgress| {
                if let Some(status) = status_for_progress(&p) {
                    progress_tx.send_replace(status);
                }
            });
            tracing::info!(job = %id, format = request.options.format.extension(), "Export job started");

            let mut result = export(&request, fonts, worker, &flag, Some(&on_progress)).await;
            if let (Ok(artifact), Some(path)) = (&result, &output) {
                if let Err(err) = artifact.write_to(path).await {
                    result = Err(err);
                }
            }

            let status = match &result {
                Ok(artifact) => ExportStatus::Done {
                    bytes: artifact.bytes.len(),
                    output: output.clone(),
                },
                Err(err) => {
                    tracing::warn!(job = %id, error = %err, "Export job failed");
                    ExportStatus::Error {
                        message: err.to_string(),
                    }
                }
            };
            status_tx.send_replace(status);
            result
        });

        ExportHandle {
            id,
            status: status_rx,
            cancel,
            task,
        }
    }

    pub fn status(&self, id: &JobId) -> Option<ExportStatus> {
        lock(&self.jobs).get(id).map(|job| job.status.borrow().clone())
    }

    pub fn cancel(&self, id: &JobId) -> bool {
        match lock(&self.jobs).get(id) {
            Some(job) => {
                job.cancel.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn ids(&self) -> Vec<JobId> {
        lock(&self.jobs).keys().copied().collect()
    }

    /// Forget finished jobs. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut jobs = lock(&self.jobs);
        let before = jobs.len();
        jobs.retain(|_, job| !job.status.borrow().is_finished());
        before - jobs.len()
    }
}

fn status_for_progress(progress: &ExportProgress) -> Option<ExportStatus> {
    match progress.stage {
        ExportStage::Preparing => Some(ExportStatus::Preparing),
        ExportStage::Rendering => Some(ExportStatus::Rendering {
            frames: progress.frames_rendered,
            total: progress.total_frames,
        }),
        ExportStage::Finalizing => Some(ExportStatus::Rendering {
            frames: progress.total_frames,
            total: progress.total_frames,
        }),
        ExportStage::Complete => None,
    }
}
