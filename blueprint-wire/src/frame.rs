//! Frame decoding for chunked response bodies.
//!
//! HTTP bodies arrive in chunks that have nothing to do with the logical
//! units of the wire format. [`FrameDecoder`] buffers across chunk
//! boundaries and yields complete [`Frame`]s as soon as they are available.
//!
//! Two framing disciplines are supported:
//!
//! - [`Framing::Lines`]: newline-delimited text, as used by Server-Sent
//!   Events (OpenAI, Anthropic).
//! - [`Framing::BalancedJson`]: an un-delimited concatenation of JSON
//!   objects, as produced by Google's `streamGenerateContent` (the objects
//!   are wrapped in a JSON array that arrives piecemeal).

/// How a byte stream is split into frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One frame per newline-terminated line.
    Lines,
    /// One frame per brace-balanced JSON object.
    BalancedJson,
}

/// One complete logical unit of a streaming wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A single line with its terminator (and any trailing `\r`) removed.
    Line(String),
    /// A parsed JSON object.
    Json(serde_json::Value),
}

/// Incremental decoder from byte chunks to [`Frame`]s.
///
/// ```
/// use blueprint_wire::{Frame, FrameDecoder, Framing};
///
/// let mut decoder = FrameDecoder::new(Framing::Lines);
/// assert!(decoder.push(b"data: hel").is_empty());
/// assert_eq!(decoder.push(b"lo\n"), vec![Frame::Line("data: hello".into())]);
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    utf8: Utf8Carry,
    buf: String,
    scan: BraceScan,
}

impl FrameDecoder {
    /// Create a decoder for the given framing discipline.
    #[must_use]
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            utf8: Utf8Carry::default(),
            buf: String::new(),
            scan: BraceScan::default(),
        }
    }

    /// The framing discipline this decoder applies.
    #[must_use]
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Feed one chunk and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.utf8.decode(chunk, &mut self.buf);
        match self.framing {
            Framing::Lines => self.drain_lines(),
            Framing::BalancedJson => self.drain_objects(),
        }
    }

    /// Signal end of stream and return any frame recoverable from the
    /// leftover buffer.
    ///
    /// The decoder is left empty and may be reused for a new stream.
    pub fn finish(&mut self) -> Vec<Frame> {
        self.utf8.flush(&mut self.buf);
        let mut frames = match self.framing {
            Framing::Lines => self.drain_lines(),
            Framing::BalancedJson => self.drain_objects(),
        };

        let rest = std::mem::take(&mut self.buf);
        self.scan = BraceScan::default();

        match self.framing {
            Framing::Lines => {
                let line = rest.trim_end_matches(['\r', '\n']);
                if !line.trim().is_empty() {
                    frames.push(Frame::Line(line.to_string()));
                }
            }
            Framing::BalancedJson => {
                let candidate = rest
                    .trim()
                    .trim_start_matches(['[', ','])
                    .trim_end_matches([']', ','])
                    .trim();
                if !candidate.is_empty() {
                    match serde_json::from_str::<serde_json::Value>(candidate) {
                        Ok(value) => frames.push(Frame::Json(value)),
                        Err(e) => {
                            tracing::trace!(error = %e, "discarding unparseable stream tail");
                        }
                    }
                }
            }
        }

        frames
    }

    fn drain_lines(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(newline_pos) = self.buf.find('\n') {
            let line = self.buf[..newline_pos].trim_end_matches('\r').to_string();
            self.buf.drain(..=newline_pos);
            frames.push(Frame::Line(line));
        }
        frames
    }

    fn drain_objects(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        let consumed = self.scan.scan(&self.buf, &mut frames);
        if consumed > 0 {
            self.buf.drain(..consumed);
            self.scan.shift(consumed);
        }
        frames
    }
}

/// Brace-depth scanner state, kept across chunks so each byte is visited once.
///
/// All positions are byte offsets into the decoder buffer.
#[derive(Debug, Default)]
struct BraceScan {
    /// Next offset to scan.
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Offset of the `{` that opened the current top-level span.
    start: Option<usize>,
}

impl BraceScan {
    /// Scan `buf` from the saved position, pushing every parseable span.
    ///
    /// Returns the length of the consumed prefix: everything up to and
    /// including the last span that parsed. Spans that fail to parse stay
    /// in the buffer.
    fn scan(&mut self, buf: &str, frames: &mut Vec<Frame>) -> usize {
        let mut consumed = 0;

        for (offset, byte) in buf.as_bytes()[self.pos..].iter().enumerate() {
            let i = self.pos + offset;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if *byte == b'\\' {
                    self.escaped = true;
                } else if *byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' if self.depth > 0 => self.in_string = true,
                b'{' => {
                    if self.depth == 0 {
                        self.start = Some(i);
                    }
                    self.depth += 1;
                }
                b'}' if self.depth > 0 => {
                    self.depth -= 1;
                    if self.depth == 0
                        && let Some(start) = self.start.take()
                    {
                        match serde_json::from_str::<serde_json::Value>(&buf[start..=i]) {
                            Ok(value) => {
                                frames.push(Frame::Json(value));
                                consumed = i + 1;
                            }
                            Err(e) => {
                                tracing::trace!(error = %e, "balanced span is not valid JSON");
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        self.pos = buf.len();
        consumed
    }

    /// Rebase saved offsets after `n` bytes were drained from the buffer.
    fn shift(&mut self, n: usize) {
        self.pos -= n;
        self.start = self.start.map(|s| s - n);
    }
}

/// Carries incomplete UTF-8 sequences from one chunk to the next.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    /// Decode `chunk` (prefixed by any carried bytes) into `out`.
    ///
    /// A sequence cut off at the end of the chunk is held back; invalid
    /// sequences become U+FFFD.
    fn decode(&mut self, chunk: &[u8], out: &mut String) {
        self.pending.extend_from_slice(chunk);
        let mut start = 0;

        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
    }

    /// Emit whatever is still carried, lossily.
    fn flush(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            out.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
    }
}
