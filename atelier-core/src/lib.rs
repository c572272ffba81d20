//! Atelier Core - command dispatch and multi-turn session engine.
//!
//! Sits between a chat message stream and an asynchronous image-generation
//! service:
//! - parses short textual commands out of free-form messages
//! - tracks per-conversation image-collecting workflows across messages
//! - enforces admin/whitelist/blacklist access control
//! - relays generation results and errors back to the chat
//!
//! The chat transport and the generation backend are collaborators behind
//! the [`channel::ChatChannel`] and [`service::GenerationService`] traits;
//! this crate implements neither wire protocol.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod access;
pub mod channel;
pub mod command;
pub mod message;
pub mod router;
pub mod service;
pub mod session;

pub use access::{AccessPolicy, AccessRecord, Decision, UsageLedger};
pub use channel::{ChannelError, ChannelResult, ChatChannel};
pub use command::{CommandKind, ParsedCommand, PrefixTable};
pub use message::{ConversationKey, GroupId, ImageData, InboundEvent, Sender, UserId};
pub use router::CommandRouter;
pub use service::{
    GenerationService, QueueReport, ServiceError, ServiceResult, Submission, TaskId, TaskStatus,
};
pub use session::{ImageSession, SessionKind, SessionStore};
