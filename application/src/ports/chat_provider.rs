//! Chat provider port
//!
//! Defines the interface for communicating with model providers.
//! Implementations (adapters) live outside this core; the chat client
//! pool only requires that failures are distinguishable as transient or
//! not, so it can decide whether to retry.

use async_trait::async_trait;
use serde_json::json;
use stagecraft_domain::{Message, ProviderReply, ToolSchema};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by a provider adapter
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Retriable: network hiccups, 5xx, provider overload
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// Not retriable: malformed request, auth failure, unknown model
    #[error("Provider rejected the request: {0}")]
    NonTransient(String),

    /// The provider did not answer within its own timeout
    #[error("Provider timed out")]
    Timeout,
}

impl ProviderError {
    /// Whether the chat client pool may retry this failure
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_) | ProviderError::Timeout)
    }
}

/// A tool made available to the model for one call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: &ToolSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: schema.to_json_schema(),
        }
    }

    /// Render in the wire shape providers expect for a tool list entry
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.schema,
        })
    }
}

/// An event in a streaming provider response
#[derive(Debug, Clone)]
pub enum ProviderStreamEvent {
    /// A text chunk from the model
    Delta(String),
    /// The complete structured reply (signals stream end)
    Completed(ProviderReply),
    /// An error that occurred during streaming
    Error(String),
}

/// Handle for consuming a streaming provider response.
///
/// Wraps an `mpsc::Receiver<ProviderStreamEvent>` and provides a
/// convenience method for collecting the final reply when the caller
/// does not care about individual deltas.
pub struct ProviderStream {
    pub receiver: mpsc::Receiver<ProviderStreamEvent>,
}

impl ProviderStream {
    pub fn new(receiver: mpsc::Receiver<ProviderStreamEvent>) -> Self {
        Self { receiver }
    }

    /// Drain the stream and return the completed reply.
    pub async fn collect_reply(mut self) -> Result<ProviderReply, ProviderError> {
        let mut text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                ProviderStreamEvent::Delta(chunk) => text.push_str(&chunk),
                ProviderStreamEvent::Completed(reply) => return Ok(reply),
                ProviderStreamEvent::Error(e) => return Err(ProviderError::Transient(e)),
            }
        }
        // Channel closed without Completed — fall back to collected text
        Ok(ProviderReply::from_text(text))
    }
}

/// Port for model-provider communication.
///
/// `send_streaming` has a default implementation wrapping `send`, so
/// non-streaming adapters work without changes.
#[async_trait]
pub trait ChatProviderPort: Send + Sync {
    /// Send a message list plus tool definitions, get a structured reply
    async fn send(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ProviderReply, ProviderError>;

    /// Streaming variant producing an ordered, finite sequence of events
    async fn send_streaming(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ProviderStream, ProviderError> {
        let reply = self.send(messages, tools).await?;
        let (tx, rx) = mpsc::channel(1);
        // If the receiver is dropped, that's fine
        let _ = tx.send(ProviderStreamEvent::Completed(reply)).await;
        Ok(ProviderStream::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl ChatProviderPort for EchoProvider {
        async fn send(
            &self,
            messages: &[Message],
            _tools: &[ToolDescriptor],
        ) -> Result<ProviderReply, ProviderError> {
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
            Ok(ProviderReply::from_text(format!("echo: {}", last)))
        }
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Transient("503".into()).is_transient());
        assert!(ProviderError::Timeout.is_transient());
        assert!(!ProviderError::NonTransient("400".into()).is_transient());
    }

    #[tokio::test]
    async fn default_streaming_wraps_send() {
        let provider = EchoProvider;
        let stream = provider
            .send_streaming(&[Message::user("hi")], &[])
            .await
            .unwrap();
        let reply = stream.collect_reply().await.unwrap();
        assert_eq!(reply.text_content(), "echo: hi");
    }

    #[test]
    fn descriptor_renders_wire_shape() {
        let descriptor = ToolDescriptor::new("get_weather", "Weather lookup", &ToolSchema::new());
        let json = descriptor.to_json();
        assert_eq!(json["name"], "get_weather");
        assert_eq!(json["input_schema"]["type"], "object");
    }
}
