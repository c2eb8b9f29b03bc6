//! Chat session: transcript ownership and the per-turn streaming driver.

use blueprint_provider::{ChatClient, DeltaStream, Message, ProviderSettings, Role};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::aggregate::DeltaAggregator;
use crate::error::ChatError;
use crate::extract::BlueprintExtractor;

/// Receives the progress of a turn.
///
/// Callbacks run on the task driving [`ChatSession::send`], in the order
/// the deltas arrive.
pub trait TurnObserver {
    /// The assistant reply grew; `text` is the whole reply so far.
    fn on_transcript(&mut self, text: &str);

    /// A new blueprint candidate was found in the reply.
    fn on_blueprint(&mut self, blueprint: &str) {
        let _ = blueprint;
    }
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The provider finished the reply.
    Completed,
    /// The cancellation token fired before the reply finished.
    Cancelled,
}

/// Result of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The assistant reply received, possibly partial when cancelled.
    pub text: String,
    /// The terminal blueprint extraction, or the last streaming candidate
    /// when cancelled.
    pub blueprint: Option<String>,
    /// Whether the reply completed.
    pub status: TurnStatus,
}

/// A conversation with the active provider.
///
/// The provider settings are a snapshot taken at construction. Each turn
/// owns its running text and extraction state; `send` takes `&mut self`, so
/// only one reply streams at a time.
#[derive(Debug, Clone)]
pub struct ChatSession {
    client: ChatClient,
    settings: ProviderSettings,
    transcript: Vec<Message>,
}

impl ChatSession {
    /// Create a session with an empty transcript.
    #[must_use]
    pub fn new(client: ChatClient, settings: ProviderSettings) -> Self {
        Self {
            client,
            settings,
            transcript: Vec::new(),
        }
    }

    /// Seed the transcript, e.g. with a restored conversation.
    #[must_use]
    pub fn with_transcript(mut self, transcript: Vec<Message>) -> Self {
        self.transcript = transcript;
        self
    }

    /// Messages exchanged so far.
    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// The provider settings snapshot.
    #[must_use]
    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Replace the provider settings; applies from the next turn.
    pub fn set_settings(&mut self, settings: ProviderSettings) {
        self.settings = settings;
    }

    /// Start a new conversation.
    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Send `prompt` and stream the reply.
    ///
    /// `blueprint` is the current canonical blueprint text sent as context.
    /// The user message is appended before the request; the assistant
    /// message is appended with the first delta and then updated in place.
    /// On a transport error the partial reply stays in the transcript and
    /// the error is returned. When `cancel` fires, no further callbacks are
    /// made and the outcome reports [`TurnStatus::Cancelled`].
    pub async fn send<O>(
        &mut self,
        prompt: &str,
        blueprint: &str,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError>
    where
        O: TurnObserver + ?Sized,
    {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }
        let config = self.settings.require_active()?.clone();

        self.transcript.push(Message::user(prompt));
        tracing::debug!(
            provider = %config.kind,
            history = self.transcript.len(),
            "starting chat turn"
        );

        let stream = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("chat turn cancelled before the reply started");
                return Ok(TurnOutcome {
                    text: String::new(),
                    blueprint: None,
                    status: TurnStatus::Cancelled,
                });
            }
            opened = self.client.stream_chat(&config, &self.transcript, blueprint) => {
                opened.map_err(|e| {
                    tracing::error!(error = %e, "chat request failed");
                    e
                })?
            }
        };

        self.consume(stream, observer, cancel).await
    }

    /// Drive an open reply stream to completion, cancellation or error.
    async fn consume<O>(
        &mut self,
        mut stream: DeltaStream,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError>
    where
        O: TurnObserver + ?Sized,
    {
        let mut aggregator = DeltaAggregator::new();
        let mut extractor = BlueprintExtractor::new();

        let status = loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => break TurnStatus::Cancelled,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(delta)) => {
                    let Some(text) = aggregator.append(&delta) else {
                        continue;
                    };
                    self.update_reply(text);
                    observer.on_transcript(text);
                    if cancel.is_cancelled() {
                        break TurnStatus::Cancelled;
                    }
                    if let Some(candidate) = extractor.observe(text) {
                        observer.on_blueprint(&candidate);
                    }
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, received = aggregator.text().len(), "chat stream aborted");
                    return Err(e.into());
                }
                None => break TurnStatus::Completed,
            }
        };

        let blueprint = match status {
            TurnStatus::Completed => {
                let terminal = extractor.finish(aggregator.text());
                if let Some(candidate) = &terminal {
                    observer.on_blueprint(candidate);
                }
                terminal
            }
            TurnStatus::Cancelled => {
                tracing::debug!("chat turn cancelled mid-stream");
                extractor.last().map(str::to_string)
            }
        };

        tracing::debug!(?status, chars = aggregator.text().len(), "chat turn finished");
        Ok(TurnOutcome {
            text: aggregator.take(),
            blueprint,
            status,
        })
    }

    /// Write `text` into the trailing assistant message, appending one if
    /// the turn has none yet.
    fn update_reply(&mut self, text: &str) {
        match self.transcript.last_mut() {
            Some(last) if last.role == Role::Assistant => {
                last.content.clear();
                last.content.push_str(text);
            }
            _ => self.transcript.push(Message::assistant(text)),
        }
    }
}
