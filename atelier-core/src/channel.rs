//! Chat-channel boundary.
//!
//! The transport (receiving messages, resolving attachments, delivering
//! replies) lives outside this crate. The router only needs the outbound
//! half below. Send failures are logged by the caller and never retried.

use crate::message::Sender;
use async_trait::async_trait;
use thiserror::Error;

/// Channel error type.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Channel not ready")]
    NotReady,
}

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Outbound operations the router needs from the chat transport.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Human-readable channel name, for logs.
    fn name(&self) -> &'static str;

    /// Deliver a text reply to the conversation `to` writes from.
    async fn send_text(&self, to: &Sender, text: &str) -> ChannelResult<()>;

    /// Deliver an image by URL to the conversation `to` writes from.
    async fn send_image_url(&self, to: &Sender, url: &str) -> ChannelResult<()>;
}
