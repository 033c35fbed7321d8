use std::error::Error as StdError;
use std::fmt::{self, Display};

use mlbchat_model::ModelProviderError;

use crate::conversation::TranscriptError;
use crate::tool;

/// Why a run failed. Hitting the query ceiling is not a failure.
#[derive(Debug)]
pub enum RunError {
    /// The tool catalog could not be fetched.
    Catalog(tool::Error),
    /// The chat completion endpoint failed.
    Generation(Box<dyn ModelProviderError>),
    /// The model produced content that cannot be appended.
    Transcript(TranscriptError),
    /// The run was cancelled. The partial transcript is discarded.
    Cancelled,
}

impl RunError {
    /// Returns whether retrying the whole run may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RunError::Generation(err) => err.kind().is_transient(),
            _ => false,
        }
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Catalog(err) => {
                write!(f, "failed to fetch the tool catalog: {err}")
            }
            RunError::Generation(err) => {
                write!(f, "generation failed ({}): {err}", err.kind())
            }
            RunError::Transcript(err) => write!(f, "invalid completion: {err}"),
            RunError::Cancelled => write!(f, "run cancelled"),
        }
    }
}

impl StdError for RunError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RunError::Catalog(err) => Some(err),
            RunError::Transcript(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TranscriptError> for RunError {
    #[inline]
    fn from(err: TranscriptError) -> Self {
        RunError::Transcript(err)
    }
}
