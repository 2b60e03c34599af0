//! Domain models for feed entities

mod message;
mod narrow;
mod subscription;

pub use message::{Message, MessageBuilder, MessageId, Recipient, StreamId, UserId, flags};
pub use narrow::{Filter, NarrowTerm};
pub use subscription::Subscription;
