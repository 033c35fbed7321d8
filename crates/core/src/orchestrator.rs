mod builder;
mod state;

use std::sync::Arc;
use std::time::Duration;

use mlbchat_model::{ContentBlock, ModelRequest, ToolUseRequest};
use tracing::Instrument;

pub use builder::OrchestratorBuilder;
pub use state::Stage;

use crate::cancel::CancelSignal;
use crate::conversation::Transcript;
use crate::error::RunError;
use crate::followup::{Continuation, FollowUpScript, ReplyClassifier};
use crate::model_client::ModelClient;
use crate::observer::RunObserver;
use crate::tool::{Executor as ToolExecutor, ToolSource};
use state::RunState;

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The model gave a plain-text answer and no follow-up was due.
    Answered,
    /// The generation call count exceeded the ceiling.
    QueryCeiling,
}

/// The result of a finished run.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    /// Everything exchanged during the run.
    pub transcript: Transcript,
    /// The number of generation calls made.
    pub queries_spent: u32,
    /// The number of scripted prompts appended.
    pub follow_ups_injected: usize,
    /// Why the run ended.
    pub stop_reason: StopReason,
}

/// Drives a conversation between a model and a set of tools.
///
/// Each run fetches the tool catalog once, then alternates between the
/// model and the tools until the model answers in plain text with no
/// follow-up due, or the query ceiling is exceeded. Everything within a
/// run happens in order: tool requests are resolved one after the other,
/// in the order the model made them, and every request is answered before
/// the model is called again.
///
/// Runs share nothing, an orchestrator can serve several runs at once.
pub struct Orchestrator {
    model_client: ModelClient,
    tool_source: Arc<dyn ToolSource>,
    system_prompt: String,
    follow_ups: FollowUpScript,
    classifier: Arc<dyn ReplyClassifier>,
    observer: Arc<dyn RunObserver>,
    query_ceiling: u32,
    tool_timeout: Option<Duration>,
}

impl Orchestrator {
    /// Runs a conversation opened by `opening_prompt`.
    #[inline]
    pub async fn run<S: Into<String>>(
        &self,
        opening_prompt: S,
    ) -> Result<RunOutcome, RunError> {
        self.run_cancellable(opening_prompt, CancelSignal::never())
            .await
    }

    /// Like [`run`](Self::run), but gives up at the next catalog fetch,
    /// generation call or tool invocation once `cancel` fires.
    pub async fn run_cancellable<S: Into<String>>(
        &self,
        opening_prompt: S,
        cancel: CancelSignal,
    ) -> Result<RunOutcome, RunError> {
        let opening_prompt = opening_prompt.into();
        async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("run cancelled");
                    self.observer.on_stage(Stage::Terminated);
                    Err(RunError::Cancelled)
                }
                outcome = self.drive(opening_prompt) => outcome,
            }
        }
        .instrument(debug_span!("orchestrator run"))
        .await
    }

    async fn drive(
        &self,
        opening_prompt: String,
    ) -> Result<RunOutcome, RunError> {
        let mut state = RunState::default();
        self.observer.on_stage(state.stage);

        let executor =
            ToolExecutor::load(Arc::clone(&self.tool_source), self.tool_timeout)
                .await
                .map_err(RunError::Catalog)?;
        self.observer.on_catalog(executor.catalog());

        let mut transcript = Transcript::new();
        transcript.push_user_text(opening_prompt);

        while !state.is_done() {
            self.enter(&mut state, Stage::Generating);
            state.queries_spent += 1;
            self.observer.on_generation(state.queries_spent, &transcript);

            let request = ModelRequest {
                system: self.system_prompt.clone(),
                turns: transcript.turns().to_vec(),
                tools: executor.catalog().to_vec(),
            };
            let observer = Arc::clone(&self.observer);
            let response = self
                .model_client
                .send_request(request, move |delta| {
                    observer.on_text_delta(&delta);
                })
                .await
                .map_err(RunError::Generation)?;

            let tool_requests: Vec<ToolUseRequest> = response
                .blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some(ToolUseRequest {
                            id: id.clone(),
                            name: name.clone(),
                            input: input.clone(),
                        })
                    }
                    _ => None,
                })
                .collect();
            transcript.push_assistant(response.blocks)?;

            if !tool_requests.is_empty() {
                self.enter(&mut state, Stage::AwaitingTools);
                for tool_request in &tool_requests {
                    self.observer.on_tool_call(tool_request);
                    let outcome = executor.execute(tool_request).await;
                    self.observer.on_tool_result(
                        &tool_request.id,
                        &outcome.content,
                        outcome.is_error,
                    );
                    transcript.answer(
                        &tool_request.id,
                        outcome.content,
                        outcome.is_error,
                    )?;
                }
            }

            // The ceiling takes precedence: a run never ends on a
            // follow-up the model hasn't seen.
            if state.queries_spent > self.query_ceiling {
                warn!(
                    "query ceiling reached after {} calls",
                    state.queries_spent
                );
                state.finish(StopReason::QueryCeiling);
                break;
            }

            if let Some(reply) = transcript.plain_text_answer() {
                match self.next_follow_up(&state, reply) {
                    Some(prompt) => {
                        self.enter(&mut state, Stage::AwaitingFollowUp);
                        self.observer
                            .on_follow_up(state.canned_prompt_index, prompt);
                        transcript.push_user_text(prompt);
                        state.canned_prompt_index += 1;
                    }
                    None => state.finish(StopReason::Answered),
                }
            }
        }

        self.enter(&mut state, Stage::Terminated);
        let stop_reason = state.stop_reason.unwrap_or(StopReason::Answered);
        self.observer.on_terminated(stop_reason, state.queries_spent);

        Ok(RunOutcome {
            transcript,
            queries_spent: state.queries_spent,
            follow_ups_injected: state.canned_prompt_index,
            stop_reason,
        })
    }

    fn next_follow_up(&self, state: &RunState, reply: &str) -> Option<&str> {
        let prompt = self.follow_ups.get(state.canned_prompt_index)?;
        match self.classifier.classify(reply) {
            Continuation::Continue => Some(prompt),
            Continuation::Stop => {
                debug!("classifier ended the run early");
                None
            }
        }
    }

    #[inline]
    fn enter(&self, state: &mut RunState, stage: Stage) {
        state.stage = stage;
        self.observer.on_stage(stage);
    }
}
