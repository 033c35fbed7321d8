use std::collections::VecDeque;
use std::fmt::{self, Display};

use bytes::Bytes;
use reqwest::Response;

/// Reading the next chunk from the underlying body failed.
#[derive(Debug, PartialEq, Eq)]
pub struct Error;

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to read the response body")
    }
}

impl std::error::Error for Error {}

/// An adapter for streaming byte chunks.
pub enum Chunks {
    /// Chunks of a live HTTP response body.
    Response(Response),
    /// Preloaded chunks, mostly useful for tests.
    VecDeque(VecDeque<Bytes>),
}

impl Chunks {
    /// Streams the body of `response`.
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    /// Streams preloaded chunks in order.
    pub fn from_vec_deque(vec: VecDeque<Bytes>) -> Self {
        Chunks::VecDeque(vec)
    }

    /// Returns the next chunk, or `None` once the body is exhausted.
    #[inline]
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Response(response) => {
                let Ok(chunk) = response.chunk().await else {
                    return Err(Error);
                };
                Ok(chunk)
            }
            Chunks::VecDeque(vec) => Ok(vec.pop_front()),
        }
    }
}
