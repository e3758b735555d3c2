//! Step Dispatch Module
//!
//! Hands step work to downstream subsystems as one-way messages.
//!
//! - [`router`]: Step type to topic mapping and payload construction
//! - [`publisher`]: The publisher seam and its transports

pub mod publisher;
pub mod router;

pub use publisher::{
    ChannelPublisher, MemoryPublisher, MessagePublisher, OutboundMessage, OutboxPublisher,
};
pub use router::{topic_for, DispatchRouter};
