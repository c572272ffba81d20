//! Identity and inbound message types.
//!
//! Senders are identified by an opaque user id plus an optional group id.
//! The `(user, group)` pair forms the conversation key that addresses one
//! workflow slot: the same user in two groups gets two independent slots,
//! and two users in the same group never collide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque stable identifier of a user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque stable identifier of a group chat.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Who sent an inbound event, and from where.
///
/// Doubles as the outbound reply address: replies go back to the
/// conversation the event arrived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user: UserId,
    /// Absent for direct messages.
    pub group: Option<GroupId>,
}

impl Sender {
    /// A sender in a direct (private) conversation.
    pub fn direct(user: impl Into<UserId>) -> Self {
        Self {
            user: user.into(),
            group: None,
        }
    }

    /// A sender posting inside a group chat.
    pub fn in_group(user: impl Into<UserId>, group: impl Into<GroupId>) -> Self {
        Self {
            user: user.into(),
            group: Some(group.into()),
        }
    }

    pub const fn is_group(&self) -> bool {
        self.group.is_some()
    }

    /// The workflow slot this sender's messages belong to.
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey {
            user: self.user.clone(),
            group: self.group.clone(),
        }
    }
}

impl From<UserId> for Sender {
    fn from(user: UserId) -> Self {
        Self { user, group: None }
    }
}

/// Uniquely identifies one conversation's workflow slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    user: UserId,
    group: Option<GroupId>,
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}@{}", self.user, group),
            None => write!(f, "{}", self.user),
        }
    }
}

/// Raw image payload, already resolved to bytes by the chat transport.
///
/// Equality is exact content equality, which is what duplicate
/// suppression in a collecting session keys on.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData(Vec<u8>);

impl ImageData {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // payloads can be megabytes; never dump them into logs
        write!(f, "ImageData({} bytes)", self.0.len())
    }
}

/// An inbound chat event as the router consumes it.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A text message (may or may not be a command).
    Text { sender: Sender, text: String },
    /// An image message, payload already fetched by the transport.
    Image { sender: Sender, image: ImageData },
}

impl InboundEvent {
    pub const fn sender(&self) -> &Sender {
        match self {
            Self::Text { sender, .. } | Self::Image { sender, .. } => sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_key_distinguishes_groups() {
        let direct = Sender::direct("u1").conversation_key();
        let in_a = Sender::in_group("u1", "g-a").conversation_key();
        let in_b = Sender::in_group("u1", "g-b").conversation_key();

        assert_ne!(direct, in_a);
        assert_ne!(in_a, in_b);
        assert_eq!(in_a, Sender::in_group("u1", "g-a").conversation_key());
    }

    #[test]
    fn test_conversation_key_distinguishes_users() {
        let a = Sender::in_group("u1", "g").conversation_key();
        let b = Sender::in_group("u2", "g").conversation_key();
        assert_ne!(a, b);
    }

    #[test]
    fn test_image_data_equality_is_content_equality() {
        let a = ImageData::new(vec![1, 2, 3]);
        let b = ImageData::new(vec![1, 2, 3]);
        let c = ImageData::new(vec![1, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_image_data_debug_does_not_dump_bytes() {
        let img = ImageData::new(vec![0u8; 1024]);
        assert_eq!(format!("{img:?}"), "ImageData(1024 bytes)");
    }
}
