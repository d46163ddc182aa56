//! Job scheduling.
//!
//! Turns a batch of jobs into a stream of results using a bounded worker
//! pool that honors batch-wide cancellation.

mod job;
mod pool;
mod result;

pub(crate) use job::FetchContext;
pub use job::{FetchJob, Job};
pub use pool::{pool_size, Pool};
pub use result::FetchResult;
