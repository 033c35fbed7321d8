//! Reports of what a run is doing.

use mlbchat_model::{ResultFragment, ToolDescriptor, ToolUseRequest};
use tracing::Level;

use crate::conversation::Transcript;
use crate::orchestrator::{Stage, StopReason};

/// Receives reports from a run as it moves through its stages.
///
/// All methods have empty default implementations. Methods are called
/// from within the run and should return quickly.
#[allow(unused_variables)]
pub trait RunObserver: Send + Sync {
    /// The run entered `stage`.
    fn on_stage(&self, stage: Stage) {}

    /// The tool catalog has been fetched.
    fn on_catalog(&self, catalog: &[ToolDescriptor]) {}

    /// Generation call number `query` is about to be sent with
    /// `transcript`.
    fn on_generation(&self, query: u32, transcript: &Transcript) {}

    /// A piece of text streamed in from the model.
    fn on_text_delta(&self, delta: &str) {}

    /// A tool request is about to be resolved.
    fn on_tool_call(&self, request: &ToolUseRequest) {}

    /// A tool request has been resolved.
    fn on_tool_result(
        &self,
        tool_use_id: &str,
        content: &[ResultFragment],
        is_error: bool,
    ) {
    }

    /// The scripted prompt at `index` is being appended.
    fn on_follow_up(&self, index: usize, prompt: &str) {}

    /// The run finished after `queries_spent` generation calls.
    fn on_terminated(&self, reason: StopReason, queries_spent: u32) {}
}

/// An observer that turns reports into `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_stage(&self, stage: Stage) {
        trace!(?stage, "stage changed");
    }

    fn on_catalog(&self, catalog: &[ToolDescriptor]) {
        let names: Vec<_> = catalog.iter().map(|t| t.name.as_str()).collect();
        info!("{} tools available: {}", names.len(), names.join(", "));
    }

    fn on_generation(&self, query: u32, transcript: &Transcript) {
        if !tracing::enabled!(Level::DEBUG) {
            return;
        }
        match serde_json::to_string_pretty(transcript) {
            Ok(json) => debug!(query, "sending transcript:\n{json}"),
            Err(err) => debug!(query, "failed to dump transcript: {err}"),
        }
    }

    fn on_text_delta(&self, delta: &str) {
        trace!("text delta: {delta:?}");
    }

    fn on_tool_call(&self, request: &ToolUseRequest) {
        info!(
            id = %request.id,
            "calling {} with {}", request.name, request.input
        );
    }

    fn on_tool_result(
        &self,
        tool_use_id: &str,
        content: &[ResultFragment],
        is_error: bool,
    ) {
        if is_error {
            warn!(id = tool_use_id, "tool failed: {content:?}");
        } else {
            debug!(
                id = tool_use_id,
                "tool returned {} fragments",
                content.len()
            );
        }
    }

    fn on_follow_up(&self, index: usize, prompt: &str) {
        info!("follow-up #{}: {prompt}", index + 1);
    }

    fn on_terminated(&self, reason: StopReason, queries_spent: u32) {
        info!(?reason, queries_spent, "run finished");
    }
}
