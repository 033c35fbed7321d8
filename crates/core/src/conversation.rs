//! Conversation-related types.

use std::collections::HashSet;
use std::error::Error as StdError;
use std::fmt::{self, Display};

use mlbchat_model::{ContentBlock, ResultFragment, Role, Turn};
use serde::{Serialize, Serializer};

/// A transcript operation that would break the request/result pairing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriptError {
    /// An assistant turn without any content.
    EmptyTurn,
    /// An assistant turn carrying a tool result. Results are only ever
    /// produced locally, through [`Transcript::answer`].
    UnexpectedToolResult,
    /// A tool request reusing an identifier already seen in the transcript.
    DuplicateRequestId(String),
    /// A result for an identifier that has no unanswered request.
    NotPending(String),
}

impl Display for TranscriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptError::EmptyTurn => write!(f, "assistant turn is empty"),
            TranscriptError::UnexpectedToolResult => {
                write!(f, "assistant turn carries a tool result")
            }
            TranscriptError::DuplicateRequestId(id) => {
                write!(f, "tool request id {id:?} is already in use")
            }
            TranscriptError::NotPending(id) => {
                write!(f, "no pending tool request with id {id:?}")
            }
        }
    }
}

impl StdError for TranscriptError {}

/// The ordered, append-only record of one run.
///
/// Every tool result appended through [`Transcript::answer`] pairs with
/// exactly one earlier request that was still unanswered.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    // Unanswered request ids, in the order they were requested.
    pending: Vec<String>,
    request_ids: HashSet<String>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user turn with a single text block.
    pub fn push_user_text<S: Into<String>>(&mut self, text: S) {
        self.turns.push(Turn::user_text(text));
    }

    /// Appends an assistant turn. Tool requests among `blocks` become
    /// pending until answered.
    pub fn push_assistant(
        &mut self,
        blocks: Vec<ContentBlock>,
    ) -> Result<(), TranscriptError> {
        if blocks.is_empty() {
            return Err(TranscriptError::EmptyTurn);
        }

        let mut new_ids = HashSet::new();
        for block in &blocks {
            match block {
                ContentBlock::Text { .. } => {}
                ContentBlock::ToolUse { id, .. } => {
                    if self.request_ids.contains(id)
                        || !new_ids.insert(id.as_str())
                    {
                        return Err(TranscriptError::DuplicateRequestId(
                            id.clone(),
                        ));
                    }
                }
                ContentBlock::ToolResult { .. } => {
                    return Err(TranscriptError::UnexpectedToolResult);
                }
            }
        }

        for block in &blocks {
            if let ContentBlock::ToolUse { id, .. } = block {
                self.request_ids.insert(id.clone());
                self.pending.push(id.clone());
            }
        }
        self.turns.push(Turn::assistant(blocks));
        Ok(())
    }

    /// Appends a user turn answering the pending request `tool_use_id`.
    pub fn answer(
        &mut self,
        tool_use_id: &str,
        content: Vec<ResultFragment>,
        is_error: bool,
    ) -> Result<(), TranscriptError> {
        let Some(idx) = self.pending.iter().position(|id| id == tool_use_id)
        else {
            return Err(TranscriptError::NotPending(tool_use_id.to_owned()));
        };
        let tool_use_id = self.pending.remove(idx);
        self.turns.push(Turn {
            role: Role::User,
            content: vec![ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            }],
        });
        Ok(())
    }

    /// Returns the ids of requests that have not been answered yet.
    #[inline]
    pub fn pending_requests(&self) -> &[String] {
        &self.pending
    }

    /// Returns the plain-text reply if the last turn is an assistant turn
    /// whose sole content is one text block.
    ///
    /// A turn mixing text and tool requests is not a plain answer.
    pub fn plain_text_answer(&self) -> Option<&str> {
        let last = self.turns.last()?;
        match (last.role, last.content.as_slice()) {
            (Role::Assistant, [block]) => block.as_text(),
            _ => None,
        }
    }

    /// Returns whether the last turn is a plain-text answer.
    #[inline]
    pub fn is_plain_text_answer(&self) -> bool {
        self.plain_text_answer().is_some()
    }

    /// Returns all turns in order.
    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns whether no turn has been appended.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Consumes the transcript, returning its turns.
    #[inline]
    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

impl Serialize for Transcript {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.turns)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tool_use(id: &str) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_owned(),
            name: "get_standings".to_owned(),
            input: json!({}),
        }
    }

    #[test]
    fn test_request_result_pairing() {
        let mut transcript = Transcript::new();
        transcript.push_user_text("Evaluate the Mets.");
        transcript
            .push_assistant(vec![tool_use("t1"), tool_use("t2")])
            .unwrap();
        assert_eq!(transcript.pending_requests(), ["t1", "t2"]);
        assert!(!transcript.is_plain_text_answer());

        transcript
            .answer("t2", vec![ResultFragment::text("NL East")], false)
            .unwrap();
        assert_eq!(transcript.pending_requests(), ["t1"]);
        assert_eq!(
            transcript.answer("t2", vec![], false),
            Err(TranscriptError::NotPending("t2".to_owned()))
        );
        assert_eq!(
            transcript.answer("t9", vec![], false),
            Err(TranscriptError::NotPending("t9".to_owned()))
        );
        transcript.answer("t1", vec![], true).unwrap();
        assert!(transcript.pending_requests().is_empty());
        assert_eq!(transcript.len(), 4);

        // Ids stay reserved after they are answered.
        assert_eq!(
            transcript.push_assistant(vec![tool_use("t1")]),
            Err(TranscriptError::DuplicateRequestId("t1".to_owned()))
        );

        // Results are appended in the order they were answered.
        let turns = transcript.into_turns();
        let answered: Vec<_> = turns[2..]
            .iter()
            .map(|turn| match &turn.content[0] {
                ContentBlock::ToolResult {
                    tool_use_id,
                    is_error,
                    ..
                } => (tool_use_id.as_str(), *is_error),
                block => panic!("unexpected block: {block:?}"),
            })
            .collect();
        assert_eq!(answered, [("t2", false), ("t1", true)]);
    }

    #[test]
    fn test_rejected_assistant_turns() {
        let mut transcript = Transcript::new();
        assert_eq!(
            transcript.push_assistant(vec![]),
            Err(TranscriptError::EmptyTurn)
        );
        assert_eq!(
            transcript.push_assistant(vec![tool_use("a"), tool_use("a")]),
            Err(TranscriptError::DuplicateRequestId("a".to_owned()))
        );
        assert_eq!(
            transcript.push_assistant(vec![ContentBlock::ToolResult {
                tool_use_id: "a".to_owned(),
                content: vec![],
                is_error: false,
            }]),
            Err(TranscriptError::UnexpectedToolResult)
        );
        // Rejected turns leave no trace.
        assert!(transcript.is_empty());
        assert!(transcript.pending_requests().is_empty());
    }

    #[test]
    fn test_plain_text_answer() {
        let mut transcript = Transcript::new();
        transcript.push_user_text("Hi");
        assert!(!transcript.is_plain_text_answer());

        transcript
            .push_assistant(vec![
                ContentBlock::Text {
                    text: "Let me check.".to_owned(),
                },
                tool_use("t1"),
            ])
            .unwrap();
        assert!(!transcript.is_plain_text_answer());

        transcript.answer("t1", vec![], false).unwrap();
        transcript
            .push_assistant(vec![ContentBlock::Text {
                text: "Sell at the deadline.".to_owned(),
            }])
            .unwrap();
        assert_eq!(
            transcript.plain_text_answer(),
            Some("Sell at the deadline.")
        );
    }

    #[test]
    fn test_serialize() {
        let mut transcript = Transcript::new();
        transcript.push_user_text("Hi");
        transcript.push_assistant(vec![tool_use("t1")]).unwrap();
        transcript
            .answer("t1", vec![ResultFragment::text("ok")], false)
            .unwrap();

        assert_eq!(
            serde_json::to_value(&transcript).unwrap(),
            json!([
                { "role": "user", "content": [{ "type": "text", "text": "Hi" }] },
                {
                    "role": "assistant",
                    "content": [{
                        "type": "tool_use",
                        "id": "t1",
                        "name": "get_standings",
                        "input": {}
                    }]
                },
                {
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": "t1",
                        "content": [{ "type": "text", "text": "ok" }]
                    }]
                }
            ])
        );
    }
}
