//! Controller sequencing against a scripted in-memory highlight service.

use async_trait::async_trait;
use bytes::Bytes;
use sportsight_client::error::ServiceError;
use sportsight_client::model::{
    HighlightResult, ResultSet, Stage, UiCommand, VideoAsset, WorkflowEvent, WorkflowPhase,
};
use sportsight_client::orchestrator::run_controller;
use sportsight_client::render;
use sportsight_client::service::HighlightService;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

/// Replays queued outcomes per endpoint and records every call made.
#[derive(Default)]
struct Scripted {
    uploads: Mutex<VecDeque<Result<(), ServiceError>>>,
    runs: Mutex<VecDeque<Result<(), ServiceError>>>,
    results: Mutex<VecDeque<Result<ResultSet, ServiceError>>>,
    calls: Mutex<Vec<&'static str>>,
    /// When set, `run` waits for a permit before answering.
    run_gate: Option<Arc<Semaphore>>,
}

impl Scripted {
    fn then_upload(self, r: Result<(), ServiceError>) -> Self {
        self.uploads.lock().unwrap().push_back(r);
        self
    }

    fn then_run(self, r: Result<(), ServiceError>) -> Self {
        self.runs.lock().unwrap().push_back(r);
        self
    }

    fn then_results(self, r: Result<ResultSet, ServiceError>) -> Self {
        self.results.lock().unwrap().push_back(r);
        self
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.run_gate = Some(gate);
        self
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HighlightService for Scripted {
    async fn upload(&self, _asset: VideoAsset) -> Result<(), ServiceError> {
        self.record("upload");
        self.uploads.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn run(&self) -> Result<(), ServiceError> {
        self.record("run");
        if let Some(gate) = &self.run_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.runs.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn results(&self) -> Result<ResultSet, ServiceError> {
        self.record("results");
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_clip(&self, _clip_url: &str) -> Result<Bytes, ServiceError> {
        self.record("clip");
        Ok(Bytes::new())
    }
}

struct Harness {
    service: Arc<Scripted>,
    cmd_tx: mpsc::UnboundedSender<UiCommand>,
    event_rx: mpsc::UnboundedReceiver<WorkflowEvent>,
    handle: JoinHandle<WorkflowPhase>,
}

impl Harness {
    fn start(service: Scripted) -> Self {
        let service = Arc::new(service);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_controller(service.clone(), event_tx, cmd_rx));
        Self {
            service,
            cmd_tx,
            event_rx,
            handle,
        }
    }

    fn send(&self, cmd: UiCommand) {
        self.cmd_tx.send(cmd).expect("controller alive");
    }

    fn submit(&self) {
        self.send(UiCommand::SubmitUpload(Some(VideoAsset::new(
            "match.mp4",
            vec![1u8; 32],
        ))));
    }

    /// Collect events through the first phase change matching `pred`, including the status
    /// and enable signal that close that transition.
    async fn until_phase(&mut self, pred: impl Fn(&WorkflowPhase) -> bool) -> Vec<WorkflowEvent> {
        let mut seen = Vec::new();
        let fut = async {
            let mut hit = false;
            while let Some(ev) = self.event_rx.recv().await {
                if matches!(&ev, WorkflowEvent::PhaseChanged(p) if pred(p)) {
                    hit = true;
                }
                let closes = matches!(ev, WorkflowEvent::StartProcessingEnabled(_));
                seen.push(ev);
                if hit && closes {
                    return;
                }
            }
            panic!("controller stopped before the expected phase");
        };
        tokio::time::timeout(Duration::from_secs(5), fut)
            .await
            .expect("timed out waiting for phase");
        seen
    }

    async fn finish(self) -> (WorkflowPhase, Vec<&'static str>) {
        let _ = self.cmd_tx.send(UiCommand::Quit);
        let phase = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("controller did not stop")
            .expect("controller panicked");
        (phase, self.service.calls())
    }
}

fn statuses(events: &[WorkflowEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            WorkflowEvent::Status(s) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

fn last_enable(events: &[WorkflowEvent]) -> Option<bool> {
    events.iter().rev().find_map(|e| match e {
        WorkflowEvent::StartProcessingEnabled(b) => Some(*b),
        _ => None,
    })
}

fn rejected(status: u16, body: &str) -> ServiceError {
    ServiceError::Status {
        status,
        body: Some(body.into()),
    }
}

fn goal() -> HighlightResult {
    HighlightResult {
        clip_url: "/c/1.mp4".into(),
        caption: "Goal".into(),
    }
}

// ---------------------------------------------------------------------------
// scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_success_enables_generation() {
    let mut h = Harness::start(Scripted::default().then_upload(Ok(())));
    h.submit();
    let events = h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;

    assert_eq!(
        statuses(&events).last().copied(),
        Some("Video uploaded! Ready to generate highlights.")
    );
    assert_eq!(last_enable(&events), Some(true));

    let (phase, calls) = h.finish().await;
    assert_eq!(phase, WorkflowPhase::UploadedReady);
    assert_eq!(calls, vec!["upload"]);
}

#[tokio::test]
async fn run_failure_never_fetches_results() {
    let mut h = Harness::start(
        Scripted::default()
            .then_upload(Ok(()))
            .then_run(Err(rejected(500, "encoder busy"))),
    );
    h.submit();
    h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;
    h.send(UiCommand::StartProcessing);
    let events = h.until_phase(|p| matches!(p, WorkflowPhase::Failed { .. })).await;

    assert!(events.contains(&WorkflowEvent::PhaseChanged(WorkflowPhase::Failed {
        stage: Stage::Processing,
        message: "encoder busy".into(),
    })));
    let (phase, calls) = h.finish().await;
    assert!(matches!(phase, WorkflowPhase::Failed { stage: Stage::Processing, .. }));
    assert_eq!(calls, vec!["upload", "run"]);
}

#[tokio::test]
async fn empty_results_are_informational() {
    let mut h = Harness::start(
        Scripted::default()
            .then_upload(Ok(()))
            .then_run(Ok(()))
            .then_results(Ok(Vec::new())),
    );
    h.submit();
    h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;
    h.send(UiCommand::StartProcessing);
    let events = h.until_phase(|p| !p.is_busy()).await;

    assert_eq!(statuses(&events).last().copied(), Some("No highlights found."));
    assert!(!events
        .iter()
        .any(|e| matches!(e, WorkflowEvent::PhaseChanged(WorkflowPhase::Failed { .. }))));
    let (phase, calls) = h.finish().await;
    assert_eq!(phase, WorkflowPhase::ResultsReady);
    assert_eq!(calls, vec!["upload", "run", "results"]);
}

#[tokio::test]
async fn results_render_single_card() {
    let mut h = Harness::start(
        Scripted::default()
            .then_upload(Ok(()))
            .then_run(Ok(()))
            .then_results(Ok(vec![goal()])),
    );
    h.submit();
    h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;
    h.send(UiCommand::StartProcessing);
    let events = h.until_phase(|p| *p == WorkflowPhase::ResultsReady).await;

    let set = events
        .iter()
        .find_map(|e| match e {
            WorkflowEvent::Render(set) => Some(set.clone()),
            _ => None,
        })
        .expect("render instruction");
    let cards = render::cards(&set);
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].download_filename, "highlight_1.mp4");
    assert_eq!(
        statuses(&events),
        vec![
            "Processing video for highlights...",
            "Processing complete! Fetching results...",
            "Highlights ready!"
        ]
    );
    h.finish().await;
}

#[tokio::test]
async fn upload_rejection_status_is_exact() {
    let mut h = Harness::start(Scripted::default().then_upload(Err(rejected(413, "file too large"))));
    h.submit();
    let events = h.until_phase(|p| matches!(p, WorkflowPhase::Failed { .. })).await;

    assert_eq!(
        statuses(&events),
        vec!["Uploading video...", "Upload failed: file too large"]
    );
    let (phase, _) = h.finish().await;
    assert_eq!(
        phase,
        WorkflowPhase::Failed {
            stage: Stage::Upload,
            message: "file too large".into()
        }
    );
}

#[tokio::test]
async fn results_transport_failure_lands_in_failed() {
    let mut h = Harness::start(
        Scripted::default()
            .then_upload(Ok(()))
            .then_run(Ok(()))
            .then_results(Err(ServiceError::Transport("reset by peer".into()))),
    );
    h.submit();
    h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;
    h.send(UiCommand::StartProcessing);
    let events = h.until_phase(|p| !p.is_busy()).await;

    assert_eq!(statuses(&events).last().copied(), Some("Error fetching results."));
    let (phase, _) = h.finish().await;
    assert!(matches!(phase, WorkflowPhase::Failed { stage: Stage::Results, .. }));
}

// ---------------------------------------------------------------------------
// guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_clicks_issue_one_run() {
    let gate = Arc::new(Semaphore::new(0));
    let mut h = Harness::start(
        Scripted::default()
            .then_upload(Ok(()))
            .then_run(Ok(()))
            .then_results(Ok(vec![goal()]))
            .gated(gate.clone()),
    );
    h.submit();
    h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;

    for _ in 0..5 {
        h.send(UiCommand::StartProcessing);
    }
    h.until_phase(|p| *p == WorkflowPhase::Processing).await;
    // Let the controller drain the extra clicks while the run is held.
    tokio::time::sleep(Duration::from_millis(50)).await;
    for _ in 0..3 {
        h.send(UiCommand::StartProcessing);
        h.submit();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    gate.add_permits(1);

    h.until_phase(|p| *p == WorkflowPhase::ResultsReady).await;
    let (_, calls) = h.finish().await;
    assert_eq!(calls, vec!["upload", "run", "results"]);
}

#[tokio::test]
async fn start_before_upload_is_ignored() {
    let mut h = Harness::start(Scripted::default().then_upload(Ok(())));
    h.send(UiCommand::StartProcessing);
    h.send(UiCommand::SubmitUpload(None));
    h.submit();
    h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;

    let (_, calls) = h.finish().await;
    assert_eq!(calls, vec!["upload"]);
}

#[tokio::test]
async fn new_upload_after_results_clears_rendering() {
    let mut h = Harness::start(
        Scripted::default()
            .then_upload(Ok(()))
            .then_upload(Err(rejected(400, "No selected file")))
            .then_run(Ok(()))
            .then_results(Ok(vec![goal()])),
    );
    h.submit();
    h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;
    h.send(UiCommand::StartProcessing);
    h.until_phase(|p| *p == WorkflowPhase::ResultsReady).await;

    h.submit();
    let events = h.until_phase(|p| matches!(p, WorkflowPhase::Failed { .. })).await;
    let clear = events
        .iter()
        .position(|e| *e == WorkflowEvent::ClearResults)
        .expect("clear instruction");
    let uploading = events
        .iter()
        .position(|e| *e == WorkflowEvent::PhaseChanged(WorkflowPhase::Uploading))
        .expect("uploading phase");
    assert!(clear < uploading);
    assert!(!events.iter().any(|e| matches!(e, WorkflowEvent::Render(_))));

    // Failed still accepts a fresh upload.
    h.submit();
    h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;
    let (_, calls) = h.finish().await;
    assert_eq!(calls, vec!["upload", "run", "results", "upload", "upload"]);
}

#[tokio::test]
async fn quit_waits_for_chained_calls() {
    let gate = Arc::new(Semaphore::new(0));
    let mut h = Harness::start(
        Scripted::default()
            .then_upload(Ok(()))
            .then_run(Ok(()))
            .then_results(Ok(vec![goal()]))
            .gated(gate.clone()),
    );
    h.submit();
    h.until_phase(|p| *p == WorkflowPhase::UploadedReady).await;
    h.send(UiCommand::StartProcessing);
    h.until_phase(|p| *p == WorkflowPhase::Processing).await;

    h.send(UiCommand::Quit);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!h.handle.is_finished());
    gate.add_permits(1);

    let (phase, calls) = h.finish().await;
    assert_eq!(phase, WorkflowPhase::ResultsReady);
    assert_eq!(calls, vec!["upload", "run", "results"]);
}

#[tokio::test]
async fn closed_command_channel_stops_controller() {
    let h = Harness::start(Scripted::default());
    let Harness { cmd_tx, handle, .. } = h;
    drop(cmd_tx);
    let phase = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("controller did not stop")
        .expect("controller panicked");
    assert_eq!(phase, WorkflowPhase::Idle);
}
