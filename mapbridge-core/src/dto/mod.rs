//! Data Transfer Objects
//!
//! Documents exchanged over the file mailbox and request/response bodies of
//! the remote execution service.

pub mod job;
pub mod mailbox;
