//! Scripted follow-up prompts and the policy deciding when to use them.

/// The ordered prompts injected after plain-text answers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FollowUpScript {
    prompts: Vec<String>,
}

impl FollowUpScript {
    /// Creates a script from prompts, in injection order.
    pub fn new<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompts: prompts.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the prompt at `index`, if the script is that long.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.prompts.get(index).map(String::as_str)
    }

    /// Returns the number of prompts.
    #[inline]
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Returns whether the script has no prompt.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

/// Whether a run should go on after a plain-text answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Continuation {
    /// Inject the next scripted prompt, if any remains.
    Continue,
    /// Finish the run with this answer.
    Stop,
}

/// Classifies plain-text answers of the model.
///
/// The script decides how many follow-ups a run can get at most; the
/// classifier can only end a run earlier.
pub trait ReplyClassifier: Send + Sync {
    /// Classifies `reply`.
    fn classify(&self, reply: &str) -> Continuation;
}

impl<F> ReplyClassifier for F
where
    F: Fn(&str) -> Continuation + Send + Sync,
{
    #[inline]
    fn classify(&self, reply: &str) -> Continuation {
        self(reply)
    }
}

/// A classifier that lets the script run to its end.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysContinue;

impl ReplyClassifier for AlwaysContinue {
    #[inline]
    fn classify(&self, _reply: &str) -> Continuation {
        Continuation::Continue
    }
}
