//! One full instruction cycle against a live document.
//!
//! 1. Extract, annotate and publish the shape snapshot, while uploading the
//!    document file.
//! 2. Locate the active slide.
//! 3. Ask the instruction source for code, if both preparation steps worked.
//! 4. Dispatch whatever code came back.
//!
//! Failed preparation steps are retried. Nothing here returns an error: every
//! failure ends up in the [`SessionReport`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, Instrument};

use crate::active_slide::{active_slide, SlideSelection};
use crate::config::DeckhandConfig;
use crate::dispatch::{DispatchResult, Dispatcher, FragmentRuntime};
use crate::document::DocumentHost;
use crate::extract::{extract_snapshot, ExtractionReport};
use crate::instruction::{InstructionRequest, InstructionSource, InstructionStatus};
use crate::obs;
use crate::publish::{
    publish_per_slide, publish_snapshot, upload_document, DocumentFileSource, DocumentUploader,
    PublishOutcome, SnapshotTransport,
};

/// The backend-facing collaborators a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub snapshots: Arc<dyn SnapshotTransport>,
    pub uploader: Arc<dyn DocumentUploader>,
    pub file: Arc<dyn DocumentFileSource>,
    pub instructions: Arc<dyn InstructionSource>,
}

/// How one step of a session went.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub succeeded: bool,
    pub attempts: u32,
    pub error: Option<String>,
}

impl StepReport {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            attempts: 0,
            error: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub snapshot: StepReport,
    pub records: usize,
    pub skipped_shapes: usize,
    pub failed_slides: usize,
    pub publish: Vec<PublishOutcome>,
    pub upload: StepReport,
    pub selection: SlideSelection,
    pub instruction: StepReport,
    /// Message returned alongside the code, if any.
    pub message: Option<String>,
    pub dispatch: Option<DispatchResult>,
}

impl SessionReport {
    /// True when code was obtained and every unit of it succeeded.
    pub fn succeeded(&self) -> bool {
        self.dispatch
            .as_ref()
            .is_some_and(|result| result.overall_succeeded)
    }
}

pub struct Session {
    host: Arc<dyn DocumentHost>,
    collaborators: Collaborators,
    dispatcher: Dispatcher,
    config: DeckhandConfig,
}

impl Session {
    pub fn new(
        host: Arc<dyn DocumentHost>,
        collaborators: Collaborators,
        runtime: Arc<dyn FragmentRuntime>,
        config: DeckhandConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&host), runtime, config.dispatch_config());
        Self {
            host,
            collaborators,
            dispatcher,
            config,
        }
    }

    pub async fn run(&self, instruction: &str) -> SessionReport {
        let pass_id = uuid::Uuid::new_v4().to_string();
        self.run_cycle(instruction)
            .instrument(obs::pass_span("session", &pass_id))
            .await
    }

    async fn run_cycle(&self, instruction: &str) -> SessionReport {
        let ((snapshot, extraction, publish), upload) =
            tokio::join!(self.prepare_snapshot(), self.upload());

        let mut report = SessionReport {
            snapshot,
            publish,
            upload,
            ..SessionReport::default()
        };
        if let Some(extraction) = extraction {
            report.records = extraction.records.len();
            report.skipped_shapes = extraction.skipped_shapes.len();
            report.failed_slides = extraction.failed_slides.len();
        }

        report.selection = active_slide(Arc::clone(&self.host)).await;

        if !(report.snapshot.succeeded && report.upload.succeeded) {
            report.instruction =
                StepReport::skipped("skipped: snapshot or document upload did not succeed");
            obs::emit_session_finished(false, 0);
            return report;
        }

        let request = InstructionRequest::new(instruction, report.selection);
        let response = match self.collaborators.instructions.request_code(&request).await {
            Ok(response) => response,
            Err(e) => {
                report.instruction = StepReport {
                    succeeded: false,
                    attempts: 1,
                    error: Some(e.to_string()),
                };
                obs::emit_session_finished(false, 0);
                return report;
            }
        };
        report.message = response.message.clone();

        let Some(code) = response.code_input() else {
            let reason = match response.status {
                InstructionStatus::Success | InstructionStatus::PartialSuccess => {
                    "no code returned".to_string()
                }
                _ => format!(
                    "instruction failed: {}",
                    response.message.as_deref().unwrap_or("no message")
                ),
            };
            report.instruction = StepReport {
                succeeded: false,
                attempts: 1,
                error: Some(reason),
            };
            obs::emit_session_finished(false, 0);
            return report;
        };
        report.instruction = StepReport {
            succeeded: true,
            attempts: 1,
            error: None,
        };

        let result = self.dispatcher.dispatch(code).await;
        obs::emit_session_finished(result.overall_succeeded, result.outcomes.len());
        report.dispatch = Some(result);
        report
    }

    /// Extract, annotate and publish, retrying the whole step on failure.
    async fn prepare_snapshot(
        &self,
    ) -> (StepReport, Option<ExtractionReport>, Vec<PublishOutcome>) {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let (extraction, publish, error) = match extract_snapshot(Arc::clone(&self.host)).await
            {
                Ok(extraction) => {
                    let publish = self.publish(&extraction).await;
                    let error = publish.iter().find(|o| !o.succeeded).map(|o| {
                        o.error
                            .clone()
                            .unwrap_or_else(|| format!("publishing {} failed", o.destination))
                    });
                    (Some(extraction), publish, error)
                }
                Err(e) => (None, Vec::new(), Some(format!("extraction failed: {e}"))),
            };

            match error {
                None => {
                    let step = StepReport {
                        succeeded: true,
                        attempts,
                        error: None,
                    };
                    return (step, extraction, publish);
                }
                Some(error) if attempts > self.config.retry_attempts => {
                    let step = StepReport {
                        succeeded: false,
                        attempts,
                        error: Some(error),
                    };
                    return (step, extraction, publish);
                }
                Some(error) => obs::emit_step_retry("snapshot", attempts, &error),
            }
        }
    }

    async fn publish(&self, extraction: &ExtractionReport) -> Vec<PublishOutcome> {
        let transport = self.collaborators.snapshots.as_ref();
        if self.config.per_slide {
            publish_per_slide(transport, &self.config.snapshot, &extraction.records).await
        } else {
            vec![publish_snapshot(transport, &self.config.snapshot, &extraction.records).await]
        }
    }

    async fn upload(&self) -> StepReport {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = upload_document(
                self.collaborators.file.as_ref(),
                self.collaborators.uploader.as_ref(),
                &self.config.upload_filename,
                &self.config.upload_filetype,
            )
            .await;

            match result {
                Ok(_) => {
                    debug!(attempts, "document upload finished");
                    return StepReport {
                        succeeded: true,
                        attempts,
                        error: None,
                    };
                }
                Err(e) if attempts > self.config.retry_attempts => {
                    return StepReport {
                        succeeded: false,
                        attempts,
                        error: Some(e.to_string()),
                    }
                }
                Err(e) => obs::emit_step_retry("upload", attempts, &e.to_string()),
            }
        }
    }
}
