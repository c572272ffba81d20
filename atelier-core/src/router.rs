//! Command routing: the per-conversation workflow state machine.
//!
//! Every inbound event runs through the same gauntlet: access check,
//! parse, then a transition on the conversation's current state (idle, or
//! collecting images for a pad/blend/describe workflow). External calls to
//! the generation service and the chat channel are the only await points;
//! everything else completes synchronously, so events of one conversation
//! are handled strictly in arrival order as long as the host feeds them in
//! order.
//!
//! Error posture, in order of severity:
//! - missing input or too few images: corrective reply, state untouched
//! - access denied: silent drop
//! - service failure: the service's message is relayed verbatim and the
//!   session lifecycle proceeds exactly as on success
//! - channel failure: logged, never retried

use crate::access::{AccessPolicy, AccessRecord};
use crate::channel::ChatChannel;
use crate::command::{CommandKind, ParsedCommand, PrefixTable};
use crate::message::{ConversationKey, ImageData, InboundEvent, Sender};
use crate::service::{GenerationService, ServiceResult, Submission, TaskId};
use crate::session::{ImageSession, SessionKind, SessionStore};
use atelier_common::Config;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const MSG_NEED_PROMPT: &str = "✏ Send a description of the image to generate";
const MSG_NEED_TASK_ID: &str = "✏ Send a task id";
const MSG_NEED_PAD_PROMPT: &str =
    "✏ Send a description to open pad mode, then one or more images";
const MSG_NO_OPEN_MODE: &str = "✏ Open a workflow first: pad, blend, or describe";

/// Dispatches parsed commands and inbound images against per-conversation
/// session state, and relays generation-service results back to the chat.
pub struct CommandRouter {
    config: Config,
    prefixes: PrefixTable,
    sessions: SessionStore,
    access: RwLock<AccessRecord>,
    service: Arc<dyn GenerationService>,
    channel: Arc<dyn ChatChannel>,
}

impl CommandRouter {
    pub fn new(
        config: Config,
        record: AccessRecord,
        service: Arc<dyn GenerationService>,
        channel: Arc<dyn ChatChannel>,
    ) -> Self {
        let prefixes = PrefixTable::from_config(&config.prefixes);
        let sessions = SessionStore::new(config.session_ttl_secs.map(Duration::from_secs));
        Self {
            config,
            prefixes,
            sessions,
            access: RwLock::new(record),
            service,
            channel,
        }
    }

    /// The live session map. Host code normally has no business here;
    /// exposed for inspection and tests.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Shared access record. Admin surfaces mutate it through this lock
    /// (single writer); the router only reads, except for usage counts.
    pub fn access(&self) -> &RwLock<AccessRecord> {
        &self.access
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle one inbound event to completion.
    pub async fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Text { sender, text } => self.handle_text(&sender, &text).await,
            InboundEvent::Image { sender, image } => self.handle_image(&sender, image).await,
        }
    }

    /// Handle an inbound text message. Non-commands are ignored.
    pub async fn handle_text(&self, sender: &Sender, text: &str) {
        let text = text.trim();
        if text.is_empty() || !self.permitted(sender).await {
            return;
        }

        let Some(command) = self.prefixes.parse(text) else {
            return;
        };

        tracing::debug!(
            user = %sender.user,
            command = command.kind.as_str(),
            "command received",
        );
        self.dispatch(sender, command).await;
    }

    /// Handle an inbound image. Without an open session it is ignored.
    pub async fn handle_image(&self, sender: &Sender, image: ImageData) {
        if image.is_empty() {
            tracing::debug!(user = %sender.user, "empty image payload dropped");
            return;
        }
        if !self.permitted(sender).await {
            return;
        }

        let key = sender.conversation_key();
        let Some((kind, count)) = self.sessions.with_session(&key, |session| {
            session.push_image(image);
            (session.kind(), session.image_count())
        }) else {
            tracing::debug!(user = %sender.user, "image without open session ignored");
            return;
        };

        if kind == SessionKind::Describe && count == 1 {
            // describe completes on its first image, no end command needed
            let Some(session) = self.sessions.close(&key) else {
                return;
            };
            if !self.within_quota(sender).await {
                return;
            }
            let Some(image) = session.into_images().into_iter().next() else {
                return;
            };
            let result = self.service.submit_describe(&image).await;
            self.record_use(sender).await;
            self.relay_submission(sender, "describe", result).await;
        } else if self.config.tip {
            let hint = format!(
                "✅ Image {count} added\n✏ Send more images or {} to finish",
                self.config.prefixes.end_hint(),
            );
            self.reply(sender, &hint).await;
        }
    }

    async fn dispatch(&self, sender: &Sender, command: ParsedCommand) {
        let key = sender.conversation_key();
        let ParsedCommand { kind, remainder } = command;

        match kind {
            CommandKind::Imagine => {
                if remainder.is_empty() {
                    self.reply(sender, MSG_NEED_PROMPT).await;
                    return;
                }
                self.sessions.remove(&key);
                if !self.within_quota(sender).await {
                    return;
                }
                let result = self.service.submit_imagine(&remainder, &[]).await;
                self.record_use(sender).await;
                self.relay_submission(sender, "imagine", result).await;
            }
            CommandKind::Up => {
                if remainder.is_empty() {
                    self.reply(sender, MSG_NEED_TASK_ID).await;
                    return;
                }
                self.sessions.remove(&key);
                if !self.within_quota(sender).await {
                    return;
                }
                let result = self.service.submit_upscale(&TaskId::new(remainder)).await;
                self.record_use(sender).await;
                self.relay_submission(sender, "up", result).await;
            }
            CommandKind::Pad => {
                if remainder.is_empty() {
                    self.reply(sender, MSG_NEED_PAD_PROMPT).await;
                    return;
                }
                self.sessions
                    .open(ImageSession::new(key, SessionKind::Imagine, remainder));
                if self.config.tip {
                    let hint = format!(
                        "✨ Pad mode open\n✏ Send one or more images, then {} to finish",
                        self.config.prefixes.end_hint(),
                    );
                    self.reply(sender, &hint).await;
                }
            }
            CommandKind::Blend => {
                self.sessions
                    .open(ImageSession::new(key, SessionKind::Blend, remainder));
                if self.config.tip {
                    let hint = format!(
                        "✨ Blend mode open\n✏ Send two or more images, then {} to finish",
                        self.config.prefixes.end_hint(),
                    );
                    self.reply(sender, &hint).await;
                }
            }
            CommandKind::Describe => {
                self.sessions
                    .open(ImageSession::new(key, SessionKind::Describe, remainder));
                if self.config.tip {
                    self.reply(sender, "✨ Describe mode open\n✏ Send one image")
                        .await;
                }
            }
            CommandKind::End => self.finish_session(sender, &key).await,
            CommandKind::Fetch => {
                if remainder.is_empty() {
                    self.reply(sender, MSG_NEED_TASK_ID).await;
                    return;
                }
                self.sessions.remove(&key);
                match self.service.fetch_status(&TaskId::new(remainder)).await {
                    Ok(status) => {
                        self.reply(sender, &status.note).await;
                        if let Some(url) = status.image_url {
                            if let Err(e) = self.channel.send_image_url(sender, &url).await {
                                tracing::warn!(
                                    channel = self.channel.name(),
                                    error = %e,
                                    "failed to deliver result image",
                                );
                            }
                        }
                    }
                    Err(e) => self.reply(sender, &e.to_string()).await,
                }
            }
            CommandKind::Reroll => {
                if remainder.is_empty() {
                    self.reply(sender, MSG_NEED_TASK_ID).await;
                    return;
                }
                self.sessions.remove(&key);
                if !self.within_quota(sender).await {
                    return;
                }
                let result = self.service.reroll(&TaskId::new(remainder)).await;
                self.record_use(sender).await;
                self.relay_submission(sender, "reroll", result).await;
            }
            CommandKind::Queue => {
                self.sessions.remove(&key);
                match self.service.queue_status().await {
                    Ok(report) => self.reply(sender, &report.note).await,
                    Err(e) => self.reply(sender, &e.to_string()).await,
                }
            }
        }
    }

    /// Close the open workflow if its image requirement is met, otherwise
    /// prompt for more and leave it untouched.
    async fn finish_session(&self, sender: &Sender, key: &ConversationKey) {
        let Some(kind) = self.sessions.kind_of(key) else {
            self.reply(sender, MSG_NO_OPEN_MODE).await;
            return;
        };

        let count = self
            .sessions
            .with_session(key, |session| session.image_count())
            .unwrap_or(0);

        match kind {
            SessionKind::Imagine => {
                if count < SessionKind::Imagine.min_images() {
                    let hint = format!(
                        "✏ Pad mode needs at least one image before {}",
                        self.config.prefixes.end_hint(),
                    );
                    self.reply(sender, &hint).await;
                    return;
                }
                let Some(session) = self.sessions.close(key) else {
                    return;
                };
                if !self.within_quota(sender).await {
                    return;
                }
                let prompt = session.prompt().to_string();
                let images = session.into_images();
                let result = self.service.submit_imagine(&prompt, &images).await;
                self.record_use(sender).await;
                self.relay_submission(sender, "imagine", result).await;
            }
            SessionKind::Blend => {
                if count < SessionKind::Blend.min_images() {
                    let hint = format!(
                        "✏ Blend mode needs at least two images before {}",
                        self.config.prefixes.end_hint(),
                    );
                    self.reply(sender, &hint).await;
                    return;
                }
                let Some(session) = self.sessions.close(key) else {
                    return;
                };
                if !self.within_quota(sender).await {
                    return;
                }
                let images = session.into_images();
                let result = self.service.submit_blend(&images, None).await;
                self.record_use(sender).await;
                self.relay_submission(sender, "blend", result).await;
            }
            SessionKind::Describe => {
                // describe never waits for the end command; nothing to close
                tracing::debug!(conversation = %key, "end ignored for describe session");
            }
        }
    }

    async fn permitted(&self, sender: &Sender) -> bool {
        let record = self.access.read().await;
        let decision = AccessPolicy::evaluate(&record, self.config.enabled, sender);
        if !decision.is_allowed() {
            // silent by design: unauthorized senders get no reply at all
            tracing::debug!(user = %sender.user, "sender denied, event dropped");
        }
        decision.is_allowed()
    }

    /// Whether `sender` may still submit today. Sends the quota reply
    /// itself when the answer is no.
    async fn within_quota(&self, sender: &Sender) -> bool {
        if self.config.daily_limit == 0 {
            return true;
        }
        let used = {
            let record = self.access.read().await;
            if record.is_admin(&sender.user) {
                return true;
            }
            record.usage.count_on(&sender.user, Utc::now().date_naive())
        };
        if used >= self.config.daily_limit {
            tracing::info!(
                user = %sender.user,
                used,
                limit = self.config.daily_limit,
                "daily limit reached",
            );
            let text = format!(
                "⛔ Daily limit reached ({} per day), try again tomorrow",
                self.config.daily_limit,
            );
            self.reply(sender, &text).await;
            return false;
        }
        true
    }

    /// Count a submission against `sender` and persist the record.
    async fn record_use(&self, sender: &Sender) {
        if self.config.daily_limit == 0 {
            return;
        }
        let mut record = self.access.write().await;
        if record.is_admin(&sender.user) {
            return;
        }
        let count = record.usage.record(&sender.user, Utc::now().date_naive());
        tracing::debug!(user = %sender.user, count, "usage recorded");

        let path = self.config.access_record_file();
        if let Err(e) = record.save(&path) {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "failed to persist access record",
            );
        }
    }

    async fn relay_submission(
        &self,
        sender: &Sender,
        op: &'static str,
        result: ServiceResult<Submission>,
    ) {
        match result {
            Ok(submission) => {
                tracing::info!(
                    op,
                    task_id = %submission.task_id,
                    user = %sender.user,
                    "task submitted",
                );
                self.reply(sender, &submission.note).await;
            }
            Err(e) => {
                tracing::warn!(op, user = %sender.user, error = %e, "submission failed");
                self.reply(sender, &e.to_string()).await;
            }
        }
    }

    async fn reply(&self, sender: &Sender, text: &str) {
        if let Err(e) = self.channel.send_text(sender, text).await {
            tracing::warn!(
                channel = self.channel.name(),
                error = %e,
                "failed to deliver reply",
            );
        }
    }
}
