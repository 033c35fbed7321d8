//! The trade analyses, from the naive question to the tool-assisted
//! conversation.

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use mlbchat_core::conversation::Transcript;
use mlbchat_core::tool::ToolSource;
use mlbchat_core::{
    CancelSignal, Orchestrator, OrchestratorBuilder, RunError, RunOutcome,
};
use mlbchat_model::ModelProvider;

use crate::prompts;

const GENERAL_MANAGER: &str = "GM";
const TRADES: &str = "trades";

/// Runs analyses against one model.
///
/// Every analysis builds its own orchestrator, so an analyst can be shared
/// by concurrent analyses.
#[derive(Clone)]
pub struct Analyst<P> {
    provider: P,
    tool_source: Option<Arc<dyn ToolSource>>,
    retries: u32,
    retry_interval: Duration,
    cancel: CancelSignal,
}

impl<P: ModelProvider + Clone + 'static> Analyst<P> {
    /// Creates an analyst talking to `provider`, with no tools and no
    /// retries.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            tool_source: None,
            retries: 0,
            retry_interval: Duration::from_secs(2),
            cancel: CancelSignal::never(),
        }
    }

    /// Sets the tools offered to the tool-assisted analysis.
    #[inline]
    pub fn with_tool_source(mut self, source: Arc<dyn ToolSource>) -> Self {
        self.tool_source = Some(source);
        self
    }

    /// Retries a run up to `retries` more times when the model fails
    /// transiently.
    #[inline]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the delay before the first retry. Later retries back off
    /// exponentially.
    #[inline]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Makes all runs stop once `cancel` fires.
    #[inline]
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Asks a question unrelated to baseball, to check that the model
    /// answers at all.
    pub async fn motivational_answer(&self) -> Result<String, RunError> {
        let orchestrator = self
            .orchestrator()
            .with_system_prompt(prompts::MOTIVATIONAL_SYSTEM_PROMPT)
            .build();
        let outcome = self
            .run(&orchestrator, prompts::GOOD_LIFE_QUESTION.to_owned())
            .await?;
        Ok(answer_of(&outcome))
    }

    /// Asks which trades `team_name` should make, with no context at all.
    pub async fn simpleton_trade(
        &self,
        team_name: &str,
    ) -> Result<String, RunError> {
        let orchestrator = self.orchestrator().build();
        let prompt = prompts::brain_dead_prompt(TRADES, team_name);
        let outcome = self.run(&orchestrator, prompt).await?;
        Ok(answer_of(&outcome))
    }

    /// Asks the model, cast as the general manager of `team_name`, to
    /// evaluate the team and propose trades.
    pub async fn role_based_trade(
        &self,
        team_name: &str,
    ) -> Result<String, RunError> {
        let orchestrator = self
            .orchestrator()
            .with_system_prompt(prompts::role_based_system_prompt(
                GENERAL_MANAGER,
                team_name,
            ))
            .build();
        let prompt =
            prompts::role_based_prompt(GENERAL_MANAGER, TRADES, team_name);
        let outcome = self.run(&orchestrator, prompt).await?;
        Ok(answer_of(&outcome))
    }

    /// Lets the general manager of `team_name` research the team with the
    /// tools, then walks it through the scripted follow-ups.
    pub async fn tools_trade(
        &self,
        team_name: &str,
    ) -> Result<Transcript, RunError> {
        let mut builder = self
            .orchestrator()
            .with_system_prompt(prompts::role_based_system_prompt(
                GENERAL_MANAGER,
                team_name,
            ))
            .with_follow_ups(prompts::trade_follow_ups(team_name));
        if let Some(source) = &self.tool_source {
            builder = builder.with_shared_tool_source(Arc::clone(source));
        }
        let orchestrator = builder.build();

        let prompt = prompts::first_step_tool_prompt(team_name);
        let outcome = self.run(&orchestrator, prompt).await?;
        info!(
            team = team_name,
            "tool-assisted analysis ended ({:?}) after {} queries",
            outcome.stop_reason,
            outcome.queries_spent
        );
        Ok(outcome.transcript)
    }

    #[inline]
    fn orchestrator(&self) -> OrchestratorBuilder {
        OrchestratorBuilder::with_model_provider(self.provider.clone())
    }

    async fn run(
        &self,
        orchestrator: &Orchestrator,
        opening_prompt: String,
    ) -> Result<RunOutcome, RunError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_interval)
            .with_max_elapsed_time(None)
            .build();

        let mut attempts = 0;
        backoff::future::retry(policy, || {
            attempts += 1;
            let last_attempt = attempts > self.retries;
            let run = orchestrator
                .run_cancellable(opening_prompt.clone(), self.cancel.clone());
            async move {
                run.await.map_err(|err| {
                    if err.is_transient() && !last_attempt {
                        warn!("run failed, retrying: {err}");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }
}

fn answer_of(outcome: &RunOutcome) -> String {
    outcome
        .transcript
        .plain_text_answer()
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use mlbchat_core::cancellation;
    use mlbchat_model::{ContentBlock, Role, ToolUseRequest};
    use mlbchat_test_model::{PresetFailure, PresetResponse, TestModelProvider};
    use serde_json::json;

    use super::*;

    fn analyst_with(
        steps: Vec<PresetResponse>,
    ) -> (Analyst<TestModelProvider>, TestModelProvider) {
        let mut provider = TestModelProvider::default();
        for step in steps {
            provider.add_assistant_response_step(step);
        }
        (Analyst::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn test_single_question_flavors() {
        let (analyst, provider) =
            analyst_with(vec![PresetResponse::text("Buy pitching.")]);

        let answer = analyst.simpleton_trade("Mets").await.unwrap();
        assert_eq!(answer, "Buy pitching.");
        let answer = analyst.role_based_trade("Mets").await.unwrap();
        assert_eq!(answer, "Buy pitching.");

        let requests = provider.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].system, "");
        assert_eq!(
            requests[0].turns[0].content[0].as_text(),
            Some("What trades should the Mets make before the deadline?")
        );
        assert!(requests[1].system.starts_with("You are the General Manager"));
        assert!(requests.iter().all(|r| r.tools.is_empty()));
    }

    #[tokio::test]
    async fn test_motivational_answer() {
        let (analyst, provider) =
            analyst_with(vec![PresetResponse::text("Be kind.")]);
        assert_eq!(analyst.motivational_answer().await.unwrap(), "Be kind.");

        let request = &provider.recorded_requests()[0];
        assert_eq!(request.system, prompts::MOTIVATIONAL_SYSTEM_PROMPT);
        assert_eq!(
            request.turns[0].content[0].as_text(),
            Some(prompts::GOOD_LIFE_QUESTION)
        );
    }

    #[tokio::test]
    async fn test_tools_trade_walks_the_script() {
        let (analyst, provider) = analyst_with(vec![
            PresetResponse::tool_use(ToolUseRequest {
                id: "toolu_1".to_owned(),
                name: "get_standings".to_owned(),
                input: json!({}),
            }),
            PresetResponse::text("Evaluation."),
            PresetResponse::text("Specific trades."),
            PresetResponse::text("More partners."),
        ]);

        // Without tools, the request is answered with an error and the
        // conversation goes on.
        let transcript = analyst.tools_trade("Mets").await.unwrap();
        assert_eq!(provider.recorded_requests().len(), 4);
        assert_eq!(transcript.len(), 8);

        let turns = transcript.turns();
        assert!(matches!(
            &turns[2].content[..],
            [ContentBlock::ToolResult { is_error: true, .. }]
        ));
        assert_eq!(turns[4].role, Role::User);
        assert!(
            turns[4].content[0]
                .as_text()
                .unwrap()
                .contains("specific trade candidates on the Mets")
        );
        assert_eq!(transcript.plain_text_answer(), Some("More partners."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let (analyst, provider) = analyst_with(vec![PresetResponse::failing(
            PresetFailure::Overloaded,
        )]);
        let analyst = analyst
            .with_retries(2)
            .with_retry_interval(Duration::from_millis(10));

        let err = analyst.simpleton_trade("Mets").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(provider.recorded_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let (analyst, provider) =
            analyst_with(vec![PresetResponse::failing(PresetFailure::Other)]);
        let analyst = analyst.with_retries(2);

        let err = analyst.simpleton_trade("Mets").await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(provider.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_runs_are_not_retried() {
        let (analyst, provider) =
            analyst_with(vec![PresetResponse::text("Never sent.")]);
        let (canceller, signal) = cancellation();
        let analyst = analyst.with_retries(2).with_cancel_signal(signal);
        canceller.cancel();

        let err = analyst.role_based_trade("Mets").await.unwrap_err();
        assert!(matches!(err, RunError::Cancelled));
        assert!(provider.recorded_requests().is_empty());
    }
}
