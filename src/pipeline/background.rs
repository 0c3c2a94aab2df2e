//! Background processing runner.
//!
//! Upload handling is fire-and-forget: the caller persists a `Pending`
//! analysis, submits a job here and returns. A dedicated worker thread
//! drains the queue and pushes each finished record to the completion
//! callback. Shutdown is graceful: the in-flight job finishes, queued
//! jobs after it are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{AnalysisRecord, LabProvider};

use super::llm::LlmClient;
use super::orchestrator::PatientContext;
use super::processor::AnalysisProcessor;

/// Queue poll granularity for shutdown responsiveness.
const POLL_INTERVAL_MS: u64 = 500;

/// One queued upload.
#[derive(Debug)]
pub struct ProcessingJob {
    pub analysis: AnalysisRecord,
    pub file_bytes: Vec<u8>,
    pub content_type: String,
    pub lab_hint: Option<LabProvider>,
    pub patient: PatientContext,
}

/// Handle for the background worker thread.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on
/// `Drop`; dropping the handle joins the worker.
pub struct BackgroundRunner {
    sender: Option<mpsc::Sender<ProcessingJob>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl BackgroundRunner {
    /// Spawn the worker. `on_complete` receives every record in its
    /// terminal state, `Completed` and `Failed` alike.
    pub fn start<L, F>(processor: AnalysisProcessor<L>, on_complete: F) -> Self
    where
        L: LlmClient + Send + Sync + 'static,
        F: Fn(AnalysisRecord) + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<ProcessingJob>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();

        let handle = std::thread::spawn(move || {
            tracing::info!("background analysis runner started");
            worker_loop(&receiver, &processor, &on_complete, &flag);
            tracing::info!("background analysis runner shut down");
        });

        Self {
            sender: Some(sender),
            shutdown,
            handle: Some(handle),
        }
    }

    /// Queue an upload for processing. Fails only after shutdown, handing
    /// the job back to the caller.
    pub fn submit(&self, job: ProcessingJob) -> Result<(), ProcessingJob> {
        match &self.sender {
            Some(sender) => sender.send(job).map_err(|e| e.0),
            None => Err(job),
        }
    }

    /// Request graceful shutdown. The in-flight job (if any) completes.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.sender.take();
    }
}

impl Drop for BackgroundRunner {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn worker_loop<L: LlmClient>(
    receiver: &mpsc::Receiver<ProcessingJob>,
    processor: &AnalysisProcessor<L>,
    on_complete: &dyn Fn(AnalysisRecord),
    shutdown: &AtomicBool,
) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        match receiver.recv_timeout(Duration::from_millis(POLL_INTERVAL_MS)) {
            Ok(mut job) => {
                processor.process(
                    &mut job.analysis,
                    &job.file_bytes,
                    &job.content_type,
                    job.lab_hint,
                    job.patient,
                );
                on_complete(job.analysis);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
