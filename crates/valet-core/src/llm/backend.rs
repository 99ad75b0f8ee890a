//! The model-backend event-stream contract.
//!
//! A backend turns (profile, messages, options) into an ordered event stream
//! {text, tool-call, tool-result, done}, terminated exactly once by `Done`.
//! Tool results are fed back into the open stream through a continuation
//! channel; the backend then emits a `ToolResult` event and resumes
//! generation, bounded by the `max_steps` option.
//!
//! Provider internals (wire protocol, SSE parsing, retries) live outside this
//! crate; implementations only need to drive a [`ModelStreamHandle`].

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use valet_types::llm::{BackendError, ChatMessage, StreamEvent, StreamOptions, ToolReturn};
use valet_types::profile::ProfileConfig;

/// Buffer size for stream event and continuation channels.
const STREAM_BUFFER: usize = 64;

/// A model inference backend.
///
/// Boxed futures keep the trait object-safe so the orchestrator can hold any
/// backend as `Arc<dyn ModelBackend>`.
pub trait ModelBackend: Send + Sync {
    /// Open a streaming generation session.
    fn open_stream(
        &self,
        profile: &ProfileConfig,
        messages: Vec<ChatMessage>,
        options: StreamOptions,
    ) -> BoxFuture<'_, Result<ModelStream, BackendError>>;
}

/// Consumer side of an open generation session.
///
/// The orchestrator pulls events with [`next_event`] and answers `ToolCall`
/// events through [`submit_tool_result`].
///
/// [`next_event`]: ModelStream::next_event
/// [`submit_tool_result`]: ModelStream::submit_tool_result
pub struct ModelStream {
    events: mpsc::Receiver<Result<StreamEvent, BackendError>>,
    continuations: mpsc::Sender<ToolReturn>,
}

impl ModelStream {
    /// Create a connected (producer handle, consumer stream) pair.
    pub fn channel() -> (ModelStreamHandle, ModelStream) {
        let (event_tx, event_rx) = mpsc::channel(STREAM_BUFFER);
        let (continuation_tx, continuation_rx) = mpsc::channel(STREAM_BUFFER);
        (
            ModelStreamHandle {
                events: event_tx,
                continuations: continuation_rx,
            },
            ModelStream {
                events: event_rx,
                continuations: continuation_tx,
            },
        )
    }

    /// Receive the next event, or `None` once the producer has hung up.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, BackendError>> {
        self.events.recv().await
    }

    /// Feed a tool result back so generation resumes with it in context.
    pub async fn submit_tool_result(&self, ret: ToolReturn) -> Result<(), BackendError> {
        self.continuations
            .send(ret)
            .await
            .map_err(|_| BackendError::Stream("continuation channel closed".to_string()))
    }
}

/// Producer side of an open generation session, driven by implementations.
pub struct ModelStreamHandle {
    events: mpsc::Sender<Result<StreamEvent, BackendError>>,
    continuations: mpsc::Receiver<ToolReturn>,
}

impl ModelStreamHandle {
    /// Emit the next stream event. Returns `false` once the consumer is gone.
    pub async fn emit(&self, event: StreamEvent) -> bool {
        self.events.send(Ok(event)).await.is_ok()
    }

    /// Emit a stream failure.
    pub async fn fail(&self, err: BackendError) -> bool {
        self.events.send(Err(err)).await.is_ok()
    }

    /// Wait for the consumer to feed back a tool result.
    pub async fn next_tool_result(&mut self) -> Option<ToolReturn> {
        self.continuations.recv().await
    }
}
