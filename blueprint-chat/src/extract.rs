//! Locating the blueprint embedded in a model reply.
//!
//! A reply mixes prose with T3D text. The T3D is found by three rules of
//! decreasing priority:
//!
//! 1. a fenced block tagged `blueprint` or `t3d` (case-insensitive);
//! 2. an untagged fenced block containing `Begin Object`;
//! 3. raw text from the first `Begin Object` on.
//!
//! While streaming, fenced blocks may still be open and run to the end of
//! the text. The terminal pass only accepts closed matches.

/// Marker that every blueprint contains.
pub const START_MARKER: &str = "Begin Object";

/// Marker closing each T3D object.
pub const END_MARKER: &str = "End Object";

const FENCE: &str = "```";
const TAGS: [&str; 2] = ["blueprint", "t3d"];

/// Tracks the blueprint candidate of one reply.
#[derive(Debug, Clone, Default)]
pub struct BlueprintExtractor {
    last: Option<String>,
}

impl BlueprintExtractor {
    /// Create an extractor with nothing surfaced yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the running text mid-stream.
    ///
    /// Returns the candidate blueprint when it contains [`START_MARKER`] and
    /// differs from the previously surfaced one; `None` otherwise.
    pub fn observe(&mut self, text: &str) -> Option<String> {
        let candidate = streaming_candidate(text)?;
        if !candidate.contains(START_MARKER) || self.last.as_deref() == Some(candidate) {
            return None;
        }
        let candidate = candidate.to_string();
        self.last = Some(candidate.clone());
        Some(candidate)
    }

    /// Final pass over the complete reply.
    ///
    /// Requires a terminated match and returns it trimmed, even when it
    /// equals the last streaming candidate.
    pub fn finish(&mut self, text: &str) -> Option<String> {
        let candidate = terminal_candidate(text)?.trim();
        if candidate.is_empty() || !candidate.contains(START_MARKER) {
            return None;
        }
        let candidate = candidate.to_string();
        self.last = Some(candidate.clone());
        Some(candidate)
    }

    /// The most recently surfaced candidate.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Forget the surfaced candidate for a new reply.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// One fenced block; `closed` is false while its closing fence is missing.
struct FencedBlock<'a> {
    content: &'a str,
    closed: bool,
}

fn is_blueprint_tag(info: &str) -> bool {
    TAGS.iter().any(|t| info.eq_ignore_ascii_case(t))
}

/// Whether an info line names a code language, as opposed to prose that
/// happens to follow a stray fence.
fn is_language_tag(info: &str) -> bool {
    !info.is_empty()
        && info
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '#'))
}

/// Blocks whose opening info line satisfies `accept`, in order.
///
/// A block only opens once its info line is complete. Fences opening
/// blocks in another language are skipped together with their body; any
/// other unaccepted fence is skipped on its own, so inline backticks in
/// prose never shift the pairing.
fn fenced_blocks(text: &str, accept: impl Fn(&str) -> bool) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(FENCE) {
        let info_start = pos + found + FENCE.len();
        let Some(newline) = text[info_start..].find('\n') else {
            break;
        };
        let info = text[info_start..info_start + newline].trim_end();
        let body = info_start + newline + 1;
        let close = text[body..].find(FENCE).map(|c| body + c);

        if accept(info.trim_start()) {
            blocks.push(FencedBlock {
                content: &text[body..close.unwrap_or(text.len())],
                closed: close.is_some(),
            });
        } else if !is_language_tag(info) {
            pos = info_start;
            continue;
        }
        match close {
            Some(close) => pos = close + FENCE.len(),
            None => break,
        }
    }
    blocks
}

/// Highest-priority candidate, allowing open blocks and partial objects.
///
/// A tagged block wins even before it contains the start marker, which
/// keeps prose after it from being picked up by the lower tiers.
fn streaming_candidate(text: &str) -> Option<&str> {
    if let Some(block) = fenced_blocks(text, is_blueprint_tag).first() {
        return Some(block.content);
    }
    if let Some(block) = fenced_blocks(text, str::is_empty)
        .iter()
        .find(|b| b.content.contains(START_MARKER))
    {
        return Some(block.content);
    }

    let start = text.find(START_MARKER)?;
    let end = match text.rfind(END_MARKER) {
        Some(end) if end > start => end + END_MARKER.len(),
        _ => text.len(),
    };
    Some(&text[start..end])
}

/// Highest-priority terminated candidate.
fn terminal_candidate(text: &str) -> Option<&str> {
    if let Some(block) = fenced_blocks(text, is_blueprint_tag)
        .iter()
        .find(|b| b.closed)
    {
        return Some(block.content);
    }
    if let Some(block) = fenced_blocks(text, str::is_empty)
        .iter()
        .find(|b| b.closed && contains_object(b.content))
    {
        return Some(block.content);
    }

    let start = text.find(START_MARKER)?;
    let end = text.rfind(END_MARKER).filter(|&end| end > start)?;
    Some(&text[start..end + END_MARKER.len()])
}

/// Whether `s` has a start marker followed later by an end marker.
fn contains_object(s: &str) -> bool {
    s.find(START_MARKER)
        .is_some_and(|start| s[start..].contains(END_MARKER))
}
