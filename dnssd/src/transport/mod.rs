//! Multicast transport: one tokio task per bound interface address.

#[cfg(test)]
mod transport_test;

mod listener;
mod manager;

use std::sync::Arc;

use crate::message::Message;

pub(crate) use manager::MulticastManager;

/// Receives every message parsed by any listener. Listeners call it from
/// their own tasks, possibly at the same time.
pub(crate) type MessageProcessor = Arc<dyn Fn(Message) + Send + Sync>;
