use super::StopReason;

/// The stages of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Fetching the tool catalog, before any generation call.
    #[default]
    AwaitingCatalog,
    /// Waiting for the model.
    Generating,
    /// Resolving the tool requests of the last assistant turn.
    AwaitingTools,
    /// A scripted follow-up prompt is being appended.
    AwaitingFollowUp,
    /// The run is over.
    Terminated,
}

/// The counters of one run, mutated only at the transition points of the
/// loop.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub stage: Stage,
    pub queries_spent: u32,
    pub canned_prompt_index: usize,
    pub stop_reason: Option<StopReason>,
}

impl RunState {
    #[inline]
    pub fn is_done(&self) -> bool {
        self.stop_reason.is_some()
    }

    #[inline]
    pub fn finish(&mut self, reason: StopReason) {
        self.stop_reason.get_or_insert(reason);
    }
}
