//! Workflow state machine.
//!
//! Every transition goes through [`Workflow::dispatch`], keyed on the current phase and the
//! incoming input. The function is synchronous: it never performs I/O, it only says which call
//! the driver must issue next. See `orchestrator` for the async side.

use crate::error::{ServiceError, WorkflowError};
use crate::model::{ResultSet, VideoAsset, WorkflowEvent, WorkflowPhase};

/// Network call the driver must issue on behalf of the workflow.
#[derive(Debug, Clone)]
pub enum Call {
    Upload(VideoAsset),
    Run,
    Results,
}

/// Outcome of a call, fed back into the workflow when it resolves.
#[derive(Debug, Clone)]
pub enum Completion {
    Upload(Result<(), ServiceError>),
    Run(Result<(), ServiceError>),
    Results(Result<ResultSet, ServiceError>),
}

#[derive(Debug, Clone)]
pub enum Input {
    SubmitUpload(Option<VideoAsset>),
    StartProcessing,
    Completed(Completion),
}

/// What a single dispatch produced.
#[derive(Debug, Default)]
pub struct Step {
    pub events: Vec<WorkflowEvent>,
    pub call: Option<Call>,
}

impl Step {
    fn ignored() -> Self {
        Self::default()
    }

    /// True when the input was rejected by the guard table.
    pub fn is_noop(&self) -> bool {
        self.events.is_empty() && self.call.is_none()
    }
}

pub struct Workflow {
    phase: WorkflowPhase,
    results: ResultSet,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            phase: WorkflowPhase::Idle,
            results: Vec::new(),
        }
    }

    pub fn phase(&self) -> &WorkflowPhase {
        &self.phase
    }

    /// Most recent result set; empty until a results fetch succeeds.
    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn dispatch(&mut self, input: Input) -> Step {
        match (&self.phase, input) {
            (phase, Input::SubmitUpload(Some(asset))) if phase.accepts_upload() => {
                tracing::info!(
                    file = %asset.file_name,
                    bytes = asset.contents.len(),
                    "submitting upload"
                );
                self.results.clear();
                let mut step = Step {
                    events: vec![WorkflowEvent::ClearResults],
                    call: Some(Call::Upload(asset)),
                };
                self.enter(WorkflowPhase::Uploading, "Uploading video...", &mut step);
                step
            }
            (WorkflowPhase::UploadedReady, Input::StartProcessing) => {
                tracing::info!("starting highlight generation");
                let mut step = Step {
                    events: Vec::new(),
                    call: Some(Call::Run),
                };
                self.enter(
                    WorkflowPhase::Processing,
                    "Processing video for highlights...",
                    &mut step,
                );
                step
            }
            (WorkflowPhase::Uploading, Input::Completed(Completion::Upload(res))) => {
                let mut step = Step::default();
                match res {
                    Ok(()) => {
                        tracing::info!("upload accepted");
                        self.enter(
                            WorkflowPhase::UploadedReady,
                            "Video uploaded! Ready to generate highlights.",
                            &mut step,
                        );
                    }
                    Err(e) => self.fail(WorkflowError::Upload(e), &mut step),
                }
                step
            }
            (WorkflowPhase::Processing, Input::Completed(Completion::Run(res))) => {
                let mut step = Step::default();
                match res {
                    Ok(()) => {
                        tracing::info!("processing finished, fetching results");
                        // Still Processing: the results fetch is part of the same attempt.
                        step.events.push(WorkflowEvent::Status(
                            "Processing complete! Fetching results...".into(),
                        ));
                        step.call = Some(Call::Results);
                    }
                    Err(e) => self.fail(WorkflowError::Processing(e), &mut step),
                }
                step
            }
            (WorkflowPhase::Processing, Input::Completed(Completion::Results(res))) => {
                let mut step = Step::default();
                match res {
                    Ok(set) if set.is_empty() => {
                        tracing::info!("results fetched, no highlights");
                        self.enter(WorkflowPhase::ResultsReady, "No highlights found.", &mut step);
                    }
                    Ok(set) => {
                        tracing::info!(count = set.len(), "results fetched");
                        self.results = set.clone();
                        step.events.push(WorkflowEvent::Render(set));
                        self.enter(WorkflowPhase::ResultsReady, "Highlights ready!", &mut step);
                    }
                    Err(e) => self.fail(WorkflowError::Results(e), &mut step),
                }
                step
            }
            (phase, Input::Completed(c)) => {
                tracing::warn!(phase = phase.label(), completion = ?c, "completion without a matching call");
                Step::ignored()
            }
            (phase, Input::SubmitUpload(asset)) => {
                tracing::debug!(
                    phase = phase.label(),
                    has_file = asset.is_some(),
                    "ignoring submit-upload"
                );
                Step::ignored()
            }
            (phase, Input::StartProcessing) => {
                tracing::debug!(phase = phase.label(), "ignoring start-processing");
                Step::ignored()
            }
        }
    }

    fn enter(&mut self, phase: WorkflowPhase, status: &str, step: &mut Step) {
        let enabled = phase.accepts_start_processing();
        self.phase = phase.clone();
        step.events.push(WorkflowEvent::PhaseChanged(phase));
        step.events.push(WorkflowEvent::Status(status.to_string()));
        step.events.push(WorkflowEvent::StartProcessingEnabled(enabled));
    }

    fn fail(&mut self, err: WorkflowError, step: &mut Step) {
        tracing::warn!(stage = err.stage().as_str(), error = %err, "workflow attempt failed");
        let phase = WorkflowPhase::Failed {
            stage: err.stage(),
            message: err.message(),
        };
        self.enter(phase, &err.status_text(), step);
    }
}
