//! Streaming batch analysis — one persisted record per submitted file.
//!
//! Files are processed strictly sequentially. For each file the pipeline
//! streams fragments to the observer as they arrive while accumulating the
//! full text, and only commits a record once the fragment sequence has fully
//! drained — a mid-stream failure discards the partial buffer. A failure on
//! one file never aborts the rest of the batch; only the upfront credential
//! check does.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::db::{self, open_database};
use crate::llm::LlmClient;

use super::{build_analysis_prompt, PipelineError};

/// One uploaded file: original name plus raw bytes.
///
/// The name is display-only — not validated, not required to be unique.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Progress event emitted while a batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnalysisEvent {
    FileStarted { filename: String },
    /// One incremental piece of generated text, in arrival order.
    Fragment { text: String },
    FileCompleted { filename: String, record_id: i64 },
    FileSkipped { filename: String, reason: String },
    FileFailed { filename: String, error: String },
}

/// Final outcome for one file of the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome")]
pub enum FileOutcome {
    Completed { filename: String, record_id: i64 },
    Skipped { filename: String, reason: String },
    Failed { filename: String, error: String },
}

/// Per-file outcomes for a whole batch, in submission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Completed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Failed { .. }))
            .count()
    }
}

/// Orchestrates per-file submission, stream accumulation, and persistence.
pub struct AnalysisPipeline<C: LlmClient> {
    client: C,
    /// Gate checked before any service call; the client carries its own copy
    /// of the key for the actual requests.
    credential: Option<String>,
    db_path: PathBuf,
    model: String,
    inter_file_delay: Duration,
}

impl<C: LlmClient> AnalysisPipeline<C> {
    pub fn new(client: C, credential: Option<String>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            credential,
            db_path: db_path.into(),
            model: config::DEFAULT_MODEL.to_string(),
            inter_file_delay: Duration::from_secs(config::DEFAULT_INTER_FILE_DELAY_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_inter_file_delay(mut self, delay: Duration) -> Self {
        self.inter_file_delay = delay;
        self
    }

    /// Process a batch of files sequentially.
    ///
    /// Returns `Err` only when no credential is available — that check runs
    /// before any service call. Every per-file failure is isolated: recorded
    /// in the report, reported to the observer, and the batch continues. No
    /// retries anywhere.
    pub fn run_batch(
        &self,
        files: &[FileInput],
        observer: &mut dyn FnMut(AnalysisEvent),
    ) -> Result<BatchReport, PipelineError> {
        if self
            .credential
            .as_deref()
            .map_or(true, |key| key.trim().is_empty())
        {
            return Err(PipelineError::MissingCredential);
        }

        let mut report = BatchReport::default();

        for (index, file) in files.iter().enumerate() {
            let size = file.bytes.len() as u64;
            if size > config::MAX_FILE_BYTES {
                let reason = PipelineError::FileTooLarge {
                    size,
                    limit: config::MAX_FILE_BYTES,
                }
                .to_string();
                tracing::warn!(file = %file.name, size, "skipping oversized file");
                observer(AnalysisEvent::FileSkipped {
                    filename: file.name.clone(),
                    reason: reason.clone(),
                });
                report.outcomes.push(FileOutcome::Skipped {
                    filename: file.name.clone(),
                    reason,
                });
                // No service call happened, so no rate-limit pause either
                continue;
            }

            observer(AnalysisEvent::FileStarted {
                filename: file.name.clone(),
            });

            match self.analyze_one(file, observer) {
                Ok(record_id) => {
                    observer(AnalysisEvent::FileCompleted {
                        filename: file.name.clone(),
                        record_id,
                    });
                    report.outcomes.push(FileOutcome::Completed {
                        filename: file.name.clone(),
                        record_id,
                    });
                }
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "analysis failed, continuing batch");
                    observer(AnalysisEvent::FileFailed {
                        filename: file.name.clone(),
                        error: e.to_string(),
                    });
                    report.outcomes.push(FileOutcome::Failed {
                        filename: file.name.clone(),
                        error: e.to_string(),
                    });
                }
            }

            if index + 1 < files.len() {
                std::thread::sleep(self.inter_file_delay);
            }
        }

        Ok(report)
    }

    /// Analyze one file: decode, prompt, stream, then persist exactly once.
    fn analyze_one(
        &self,
        file: &FileInput,
        observer: &mut dyn FnMut(AnalysisEvent),
    ) -> Result<i64, PipelineError> {
        // Undecodable byte sequences are replaced, never fatal
        let content = String::from_utf8_lossy(&file.bytes);
        let prompt = build_analysis_prompt(&content);

        let mut on_fragment = |fragment: &str| {
            observer(AnalysisEvent::Fragment {
                text: fragment.to_string(),
            });
        };
        let summary = self
            .client
            .generate_streaming(&self.model, &prompt, &mut on_fragment)?;

        // The stream has drained; commit the accumulated text. Fresh scoped
        // connection per write so concurrent batches cannot cross-talk.
        let conn = open_database(&self.db_path)?;
        let created_at = db::format_timestamp(chrono::Local::now());
        let record_id = db::insert_record(&conn, &file.name, &summary, &created_at)?;

        tracing::info!(file = %file.name, record_id, chars = summary.len(), "analysis persisted");
        Ok(record_id)
    }
}
