//! Repository layer
//!
//! Repositories are thin adapters over the remote service client. They expose
//! exactly the capabilities the bridge consumes (job lifecycle, file
//! storage and the inbox/outbox pair) without any business logic.
//!
//! All repositories are trait-based to enable testing and mocking.

mod files;
mod jobs;
mod mailbox;

#[cfg(test)]
pub mod fake;

// Re-export traits
pub use files::FileRepository;
pub use jobs::JobRepository;
pub use mailbox::Mailbox;

// Re-export implementations
pub use files::HttpFileRepository;
pub use jobs::HttpJobRepository;
pub use mailbox::FileMailbox;
