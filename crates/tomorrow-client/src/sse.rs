//! Incremental framing for the analysis stream body.
//!
//! The backend speaks server-sent events (`data:` lines terminated by a blank
//! line), but bare newline-delimited JSON objects are accepted as well.

/// Largest line or assembled event the decoder will hold.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("stream frame exceeds {limit} bytes")]
    TooLong { limit: usize },
}

/// Splits a byte stream into complete payload strings.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// `data:` lines of the event being assembled.
    data: Option<String>,
    limit: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_FRAME_BYTES)
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            data: None,
            limit,
        }
    }

    /// Feed one body chunk. Returns every payload completed by it, in order.
    ///
    /// Only the new bytes are searched for line ends; the buffered remainder
    /// is known to hold none.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FrameError> {
        let mut from = self.buf.len();
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            if end - start > self.limit {
                return Err(self.overflow());
            }
            let line = String::from_utf8_lossy(&self.buf[start..end]).into_owned();
            self.feed_line(line.trim_end_matches('\r'), &mut frames)?;
            start = end + 1;
            from = start;
        }
        self.buf.drain(..start);

        if self.buf.len() > self.limit {
            return Err(self.overflow());
        }
        Ok(frames)
    }

    /// Flush at end of body. A trailing JSON line without a newline is
    /// returned; a half-assembled SSE event is discarded.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        let pending = self.data.take();
        let line = String::from_utf8_lossy(&rest);
        let line = line.trim_end_matches('\r');
        (pending.is_none() && line.starts_with('{')).then(|| line.to_string())
    }

    fn overflow(&mut self) -> FrameError {
        self.buf.clear();
        self.data = None;
        FrameError::TooLong { limit: self.limit }
    }

    fn feed_line(&mut self, line: &str, frames: &mut Vec<String>) -> Result<(), FrameError> {
        if line.is_empty() {
            if let Some(data) = self.data.take() {
                frames.push(data);
            }
            return Ok(());
        }
        if self.data.is_none() && line.starts_with('{') {
            frames.push(line.to_string());
            return Ok(());
        }
        if line.starts_with(':') {
            return Ok(());
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        // event, id and retry carry nothing the consumer needs
        if field != "data" {
            return Ok(());
        }
        let assembled = self.data.as_ref().map_or(0, |data| data.len() + 1);
        if assembled + value.len() > self.limit {
            return Err(self.overflow());
        }
        match &mut self.data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            },
            None => self.data = Some(value.to_string()),
        }
        Ok(())
    }
}
