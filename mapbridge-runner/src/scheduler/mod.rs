//! Scheduler layer for the bridge
//!
//! This layer polls the mailbox for commands and hands new batches to the
//! worker pool. It owns the lifecycle of a batch from pickup to the outbox.

pub mod bridge;

pub use bridge::TaskQueueBridge;
