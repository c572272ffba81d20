//! Per-conversation image-collecting sessions.
//!
//! A session is the accumulating state of one multi-step workflow: its
//! kind, its prompt, and the ordered, de-duplicated images collected so
//! far. The [`SessionStore`] owns every live session, keyed by
//! conversation, with at most one session per key. Opening a new session
//! silently replaces a prior uncompleted one.
//!
//! Expiry is a lazy, configurable policy: a session untouched for longer
//! than the store's TTL is dropped at first access. With no TTL configured
//! (the default) sessions live until completed or replaced.

use crate::message::{ConversationKey, ImageData};
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// The workflow kind a session is collecting images for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Generate with prompt plus reference images; closed by the end command
    Imagine,
    /// Merge two or more images; closed by the end command
    Blend,
    /// Text description of a single image; auto-submits on first image
    Describe,
}

impl SessionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Imagine => "imagine",
            Self::Blend => "blend",
            Self::Describe => "describe",
        }
    }

    /// Images required before the workflow may be submitted.
    pub const fn min_images(self) -> usize {
        match self {
            Self::Imagine | Self::Describe => 1,
            Self::Blend => 2,
        }
    }
}

/// Accumulating state for one pending workflow.
#[derive(Debug, Clone)]
pub struct ImageSession {
    key: ConversationKey,
    kind: SessionKind,
    prompt: String,
    images: Vec<ImageData>,
    touched: Instant,
}

impl ImageSession {
    pub fn new(key: ConversationKey, kind: SessionKind, prompt: impl Into<String>) -> Self {
        Self {
            key,
            kind,
            prompt: prompt.into(),
            images: Vec::new(),
            touched: Instant::now(),
        }
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub const fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn images(&self) -> &[ImageData] {
        &self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Append an image, skipping byte-identical duplicates and empty
    /// payloads. Returns whether the image was actually added.
    pub fn push_image(&mut self, image: ImageData) -> bool {
        if image.is_empty() || self.images.contains(&image) {
            return false;
        }
        self.images.push(image);
        true
    }

    /// Consume the session, yielding its collected images in arrival order.
    pub fn into_images(self) -> Vec<ImageData> {
        self.images
    }

    fn touch(&mut self) {
        self.touched = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.touched.elapsed()
    }
}

/// Owner of all live sessions, one slot per conversation key.
///
/// Backed by a sharded concurrent map; each operation addresses exactly
/// one key, so conversations never contend on each other's state.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<ConversationKey, ImageSession>,
    ttl: Option<Duration>,
}

impl SessionStore {
    /// A store whose sessions expire after `ttl` of inactivity.
    /// `None` means sessions never expire.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    fn is_expired(&self, session: &ImageSession) -> bool {
        self.ttl.is_some_and(|ttl| session.idle_for() >= ttl)
    }

    /// Drop the session for `key` if it has outlived the TTL.
    fn evict_if_expired(&self, key: &ConversationKey) {
        let expired = self
            .sessions
            .get(key)
            .is_some_and(|entry| self.is_expired(&entry));
        if expired {
            self.sessions.remove(key);
            tracing::debug!(conversation = %key, "expired session dropped");
        }
    }

    /// Open a session, replacing any existing one for the same key.
    pub fn open(&self, session: ImageSession) {
        let key = session.key().clone();
        if let Some(previous) = self.sessions.insert(key.clone(), session) {
            tracing::debug!(
                conversation = %key,
                discarded = previous.kind().as_str(),
                "open session replaced",
            );
        }
    }

    /// The kind of the live session for `key`, if any.
    pub fn kind_of(&self, key: &ConversationKey) -> Option<SessionKind> {
        self.evict_if_expired(key);
        self.sessions.get(key).map(|entry| entry.kind())
    }

    /// Mutate the live session for `key` in place, refreshing its idle
    /// clock. Returns `None` when no live session exists.
    pub fn with_session<R>(
        &self,
        key: &ConversationKey,
        f: impl FnOnce(&mut ImageSession) -> R,
    ) -> Option<R> {
        self.evict_if_expired(key);
        let mut entry = self.sessions.get_mut(key)?;
        entry.touch();
        Some(f(&mut entry))
    }

    /// Take the live session for `key` out of the store.
    pub fn close(&self, key: &ConversationKey) -> Option<ImageSession> {
        self.evict_if_expired(key);
        self.sessions.remove(key).map(|(_, session)| session)
    }

    /// Discard any session for `key`. No-op when none exists.
    pub fn remove(&self, key: &ConversationKey) {
        self.sessions.remove(key);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Sender;

    fn key(user: &str) -> ConversationKey {
        Sender::direct(user).conversation_key()
    }

    fn img(byte: u8) -> ImageData {
        ImageData::new(vec![byte; 4])
    }

    #[test]
    fn test_push_image_dedups_by_content() {
        let mut session = ImageSession::new(key("u"), SessionKind::Imagine, "a fox");
        assert!(session.push_image(img(1)));
        assert!(session.push_image(img(2)));
        assert!(!session.push_image(img(1)));
        assert_eq!(session.image_count(), 2);
    }

    #[test]
    fn test_push_image_rejects_empty_payload() {
        let mut session = ImageSession::new(key("u"), SessionKind::Blend, "");
        assert!(!session.push_image(ImageData::new(Vec::new())));
        assert_eq!(session.image_count(), 0);
    }

    #[test]
    fn test_open_replaces_existing_session() {
        let store = SessionStore::new(None);
        let k = key("u");
        let mut first = ImageSession::new(k.clone(), SessionKind::Imagine, "a fox");
        first.push_image(img(1));
        store.open(first);

        store.open(ImageSession::new(k.clone(), SessionKind::Blend, ""));

        let session = store.close(&k).unwrap();
        assert_eq!(session.kind(), SessionKind::Blend);
        assert_eq!(session.image_count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let store = SessionStore::new(None);
        store.remove(&key("nobody"));
        assert!(store.close(&key("nobody")).is_none());
    }

    #[test]
    fn test_sessions_are_independent_per_key() {
        let store = SessionStore::new(None);
        store.open(ImageSession::new(key("a"), SessionKind::Imagine, "one"));
        store.open(ImageSession::new(key("b"), SessionKind::Blend, ""));

        store.with_session(&key("a"), |s| {
            s.push_image(img(1));
        });

        assert_eq!(store.with_session(&key("b"), |s| s.image_count()), Some(0));
        assert_eq!(store.with_session(&key("a"), |s| s.image_count()), Some(1));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let store = SessionStore::new(Some(Duration::ZERO));
        store.open(ImageSession::new(key("u"), SessionKind::Describe, ""));
        assert_eq!(store.kind_of(&key("u")), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let store = SessionStore::new(None);
        store.open(ImageSession::new(key("u"), SessionKind::Imagine, "x"));
        assert_eq!(store.kind_of(&key("u")), Some(SessionKind::Imagine));
    }
}
