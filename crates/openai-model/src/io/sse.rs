use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only the `data` field matters to the callers, an event yields its data
/// lines joined by line feeds. Comments, other fields and events without
/// data are skipped.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(data) = self.try_parse_event()? {
                return Ok(Some(data));
            }

            // Not enough data buffered for a whole event, read more. A
            // trailing partial event is dropped at the end of stream.
            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::Chunks)?
            else {
                return Ok(None);
            };
            // Only line feeds are treated as line endings.
            self.buf
                .extend(bytes.iter().copied().filter(|b| *b != b'\r'));
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        while let Some(end) = self.buf.windows(2).position(|w| w == b"\n\n") {
            // Events are decoded as a whole, so a multi-byte character
            // split across chunks is fine.
            let block: Vec<u8> = self.buf.drain(..end + 2).collect();
            let Ok(block) = str::from_utf8(&block[..end]) else {
                return Err(Error::InvalidPayload);
            };
            if let Some(data) = parse_data(block) {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }
}

fn parse_data(block: &str) -> Option<String> {
    let mut data_lines = Vec::new();
    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "data" => data_lines.push(value),
            "event" => trace!("sse event: {value}"),
            _ => {}
        }
    }
    (!data_lines.is_empty()).then(|| data_lines.join("\n"))
}
