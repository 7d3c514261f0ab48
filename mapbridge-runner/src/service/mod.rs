//! Service layer
//!
//! Services contain the business logic of the bridge. They orchestrate
//! operations using repositories: converting values to their remote form,
//! running one task as a remote job, and fanning a batch out to workers.

pub mod dispatcher;
pub mod marshal;
pub mod session;

pub use dispatcher::WorkerPool;
pub use marshal::Marshaler;
pub use session::JobSession;
