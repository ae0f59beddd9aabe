//! Workflow controller.
//!
//! Owns the workflow state, issues at most one service call at a time, and emits events for
//! presentation layers.

use crate::model::{UiCommand, WorkflowEvent, WorkflowPhase};
use crate::service::HighlightService;
use crate::workflow::{Call, Completion, Input, Workflow};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Start the service call the workflow asked for. The future owns everything it needs.
fn issue<S>(service: &Arc<S>, call: Call) -> BoxFuture<'static, Completion>
where
    S: HighlightService + 'static,
{
    let service = Arc::clone(service);
    match call {
        Call::Upload(asset) => async move { Completion::Upload(service.upload(asset).await) }.boxed(),
        Call::Run => async move { Completion::Run(service.run().await) }.boxed(),
        Call::Results => async move { Completion::Results(service.results().await) }.boxed(),
    }
}

/// Feed one input through the workflow, forward its events, and start any call it requests.
fn step<S>(
    workflow: &mut Workflow,
    input: Input,
    service: &Arc<S>,
    event_tx: &UnboundedSender<WorkflowEvent>,
    in_flight: &mut Option<BoxFuture<'static, Completion>>,
) where
    S: HighlightService + 'static,
{
    let step = workflow.dispatch(input);
    for ev in step.events {
        let _ = event_tx.send(ev);
    }
    if let Some(call) = step.call {
        // The busy phases reject every user action, so nothing can already be in flight here.
        debug_assert!(in_flight.is_none());
        *in_flight = Some(issue(service, call));
    }
}

/// Drive the workflow from UI commands until `Quit` (or the command channel closes).
///
/// Commands that arrive while a call is in flight are checked against the current phase and
/// dropped if illegal; they are never queued. Calls are never cancelled: quitting waits for the
/// in-flight call, and for any call it chains into, to resolve first.
///
/// Returns the phase the session ended in.
pub async fn run_controller<S>(
    service: Arc<S>,
    event_tx: UnboundedSender<WorkflowEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> WorkflowPhase
where
    S: HighlightService + 'static,
{
    let mut workflow = Workflow::new();
    let mut in_flight: Option<BoxFuture<'static, Completion>> = None;
    let mut commands_open = true;
    let mut quit_pending = false;

    let _ = event_tx.send(WorkflowEvent::PhaseChanged(workflow.phase().clone()));
    let _ = event_tx.send(WorkflowEvent::StartProcessingEnabled(false));

    loop {
        if quit_pending && in_flight.is_none() {
            break;
        }

        tokio::select! {
            cmd = cmd_rx.recv(), if commands_open && !quit_pending => {
                match cmd {
                    Some(UiCommand::SubmitUpload(asset)) => {
                        step(&mut workflow, Input::SubmitUpload(asset), &service, &event_tx, &mut in_flight);
                    }
                    Some(UiCommand::StartProcessing) => {
                        step(&mut workflow, Input::StartProcessing, &service, &event_tx, &mut in_flight);
                    }
                    Some(UiCommand::Quit) => {
                        quit_pending = true;
                    }
                    None => {
                        commands_open = false;
                        quit_pending = true;
                    }
                }
            }
            // Only borrow the in-flight future here; it must survive the cmd branch winning.
            done = async {
                match in_flight.as_mut() {
                    Some(fut) => fut.await,
                    None => futures::future::pending().await,
                }
            } => {
                in_flight = None;
                step(&mut workflow, Input::Completed(done), &service, &event_tx, &mut in_flight);
            }
        }
    }

    tracing::debug!(phase = workflow.phase().label(), "controller stopped");
    workflow.phase().clone()
}
