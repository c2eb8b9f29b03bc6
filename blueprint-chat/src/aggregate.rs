//! Running text of the assistant reply for one turn.

/// Concatenates text deltas, in receive order, into the running reply.
///
/// The running text only grows until [`reset`](Self::reset) starts a new
/// turn.
#[derive(Debug, Clone, Default)]
pub struct DeltaAggregator {
    text: String,
}

impl DeltaAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `delta` and return the whole running text.
    ///
    /// An empty delta changes nothing and returns `None`, so callers notify
    /// only on real growth.
    pub fn append(&mut self, delta: &str) -> Option<&str> {
        if delta.is_empty() {
            return None;
        }
        self.text.push_str(delta);
        Some(&self.text)
    }

    /// The running text so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Discard the running text for a new turn.
    pub fn reset(&mut self) {
        self.text.clear();
    }

    /// Take the running text, leaving the aggregator empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}
