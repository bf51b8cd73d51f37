#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

/// A transport failure while reading the body.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(pub String);

enum Source {
    Http(Response),
    #[cfg(test)]
    Memory(VecDeque<Bytes>),
}

/// The raw byte chunks of a streamed response body.
pub struct Chunks {
    source: Source,
    received: usize,
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Self::new(Source::Http(response))
    }

    #[cfg(test)]
    #[inline]
    pub fn from_vec_deque(chunks: VecDeque<Bytes>) -> Self {
        Self::new(Source::Memory(chunks))
    }

    fn new(source: Source) -> Self {
        Self {
            source,
            received: 0,
        }
    }

    /// Returns the next chunk, or `None` once the body has ended.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        let chunk = match &mut self.source {
            Source::Http(response) => response
                .chunk()
                .await
                .map_err(|err| Error(err.to_string()))?,
            #[cfg(test)]
            Source::Memory(chunks) => chunks.pop_front(),
        };
        match &chunk {
            Some(chunk) => self.received += chunk.len(),
            None => trace!("body ended after {} bytes", self.received),
        }
        Ok(chunk)
    }
}
