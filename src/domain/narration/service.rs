use super::error::NarrationError;
use super::report::{PlanSummary, RunReport};
use crate::domain::chunking::{chunk_text, TextChunk};
use crate::domain::ledger::{ChunkJob, JobLedger};
use crate::domain::merge::Merger;
use crate::domain::synthesis::{
    ChunkOutcome, ChunkProcessor, EventSink, RunEvent, SessionSupervisor,
};
use crate::infrastructure::codec::AudioCodec;
use crate::infrastructure::config::{ConfigError, RunSettings};
use crate::infrastructure::sessions::SessionFactory;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;

/// Long text in, one merged audio file out
#[async_trait]
pub trait NarrationServiceApi: Send + Sync {
    /// Chunk `text` and report which chunks `output_dir` still lacks
    fn plan(&self, text: &str, output_dir: &Path) -> Result<PlanSummary, NarrationError>;

    /// Synthesize every missing chunk, then merge if the set is complete.
    ///
    /// Chunk failures and session aborts end up in the report, not in the error.
    async fn synthesize(&self, text: &str, output_dir: &Path) -> Result<RunReport, NarrationError>;

    /// Merge the chunks already in `output_dir` without synthesizing anything
    fn merge_existing(&self, text: &str, output_dir: &Path) -> Result<PathBuf, NarrationError>;
}

pub struct NarrationService {
    factory: Arc<dyn SessionFactory>,
    codec: Arc<dyn AudioCodec>,
    settings: RunSettings,
    events: Arc<dyn EventSink>,
    interrupt: Arc<Notify>,
}

impl NarrationService {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        codec: Arc<dyn AudioCodec>,
        settings: RunSettings,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            factory,
            codec,
            settings,
            events,
            interrupt: Arc::new(Notify::new()),
        }
    }

    /// Stop processing and close the session once `interrupt` is notified. The run
    /// still returns a report and files already placed are kept for the next run.
    pub fn with_interrupt(mut self, interrupt: Arc<Notify>) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn prepare(
        &self,
        text: &str,
        output_dir: &Path,
    ) -> Result<(Vec<TextChunk>, JobLedger), NarrationError> {
        let template = self.settings.validate()?;
        if let Some(index) = template.index_of(&self.settings.final_filename, self.codec.extension()) {
            return Err(ConfigError::Setting(format!(
                "final filename {:?} is the file name of chunk {index}",
                self.settings.final_filename
            ))
            .into());
        }
        let chunks = chunk_text(text, self.settings.max_length);
        if chunks.is_empty() {
            return Err(NarrationError::EmptyInput);
        }

        let ledger = JobLedger::new(output_dir, template, self.codec.extension());
        Ok((chunks, ledger))
    }

    /// Run `pending` through one supervised session, stopping early if the session
    /// cannot be restarted any more or the run is interrupted. The session is closed
    /// either way.
    async fn process_pending(&self, ledger: &JobLedger, pending: Vec<ChunkJob>, report: &mut RunReport) {
        let mut supervisor = SessionSupervisor::new(
            self.factory.clone(),
            self.settings.max_restarts,
            self.events.clone(),
        );
        let mut processor = ChunkProcessor::new(
            ledger.clone(),
            self.codec.clone(),
            self.settings.processor_settings(),
            self.events.clone(),
        );

        let aborted = tokio::select! {
            aborted = self.process_queue(&mut processor, &mut supervisor, pending, report) => aborted,
            _ = self.interrupt.notified() => {
                tracing::warn!("Run interrupted, closing the session");
                Some("run interrupted".to_string())
            }
        };

        if let Some(reason) = aborted {
            self.events.emit(&RunEvent::RunAborted {
                reason: reason.clone(),
            });
            report.aborted = Some(reason);
        }

        supervisor.close().await;
        report.restarts = supervisor.restarts();
    }

    /// Process `pending` in order, returning why the queue was abandoned if the session
    /// could not be kept alive
    async fn process_queue(
        &self,
        processor: &mut ChunkProcessor,
        supervisor: &mut SessionSupervisor,
        pending: Vec<ChunkJob>,
        report: &mut RunReport,
    ) -> Option<String> {
        let total = pending.len();
        for (position, mut job) in pending.into_iter().enumerate() {
            match processor.process(supervisor, &mut job).await {
                Ok(ChunkOutcome::Completed(result)) => {
                    report.newly_completed.push(result.index);

                    let delay = self.settings.inter_chunk_delay;
                    if position + 1 < total && !delay.is_zero() {
                        tracing::debug!(delay_secs = delay.as_secs_f64(), "Waiting before next chunk");
                        tokio::time::sleep(delay).await;
                    }
                }
                Ok(ChunkOutcome::Failed(failed)) => report.failed.push(failed),
                Err(e) => return Some(e.to_string()),
            }
        }
        None
    }

    /// Merge from what is on disk, recording the outcome in `report`
    fn merge_into_report(&self, ledger: &JobLedger, report: &mut RunReport) {
        let results = ledger.completed(report.expected);
        report.completed = results.len();
        report.missing = ledger.missing(report.expected);

        if !report.missing.is_empty() {
            self.events.emit(&RunEvent::MergeSkipped {
                missing: report.missing.clone(),
            });
            return;
        }

        let merger = Merger::new(self.codec.clone());
        match merger.merge(
            ledger.output_dir(),
            &results,
            report.expected,
            &self.settings.final_filename,
        ) {
            Ok(path) => {
                self.events.emit(&RunEvent::MergeCompleted {
                    path: path.clone(),
                    chunks: results.len(),
                });
                report.merged = Some(path);
            }
            Err(e) => {
                let reason = e.to_string();
                self.events.emit(&RunEvent::MergeFailed {
                    reason: reason.clone(),
                });
                report.merge_error = Some(reason);
            }
        }
    }
}

#[async_trait]
impl NarrationServiceApi for NarrationService {
    fn plan(&self, text: &str, output_dir: &Path) -> Result<PlanSummary, NarrationError> {
        let (chunks, ledger) = self.prepare(text, output_dir)?;
        let plan = ledger.plan(&chunks);

        Ok(PlanSummary {
            total: chunks.len(),
            pending: plan.pending_indices(),
            already_done: plan.already_done.iter().map(|r| r.index).collect(),
        })
    }

    async fn synthesize(&self, text: &str, output_dir: &Path) -> Result<RunReport, NarrationError> {
        let (chunks, ledger) = self.prepare(text, output_dir)?;
        ledger.ensure_output_dir()?;
        ledger.sweep_partials()?;

        let plan = ledger.plan(&chunks);
        self.events.emit(&RunEvent::RunPlanned {
            total: chunks.len(),
            pending: plan.pending.len(),
            already_done: plan.already_done.len(),
        });

        let mut report = RunReport::new(
            self.factory.provider(),
            output_dir.to_path_buf(),
            chunks.len(),
            plan.already_done.len(),
        );

        if plan.is_complete() {
            tracing::info!("All chunks already present, no session needed");
        } else {
            self.process_pending(&ledger, plan.pending, &mut report).await;
        }

        self.merge_into_report(&ledger, &mut report);
        report.finished_at = Utc::now();
        Ok(report)
    }

    fn merge_existing(&self, text: &str, output_dir: &Path) -> Result<PathBuf, NarrationError> {
        let (chunks, ledger) = self.prepare(text, output_dir)?;
        let results = ledger.completed(chunks.len());

        let path = Merger::new(self.codec.clone()).merge(
            output_dir,
            &results,
            chunks.len(),
            &self.settings.final_filename,
        )?;
        self.events.emit(&RunEvent::MergeCompleted {
            path: path.clone(),
            chunks: chunks.len(),
        });
        Ok(path)
    }
}

/// Read the whole input document. Fails before any session work if it is not UTF-8.
pub async fn read_input(path: &Path) -> Result<String, NarrationError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| NarrationError::Input {
            path: path.to_path_buf(),
            source,
        })?;

    String::from_utf8(bytes).map_err(|_| NarrationError::NotUtf8 {
        path: path.to_path_buf(),
    })
}
