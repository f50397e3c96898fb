//! Composable wrappers around external calls.
//!
//! Resilience is layered explicitly at the call site:
//!
//! ```rust,ignore
//! let op = cached(retrying(operation("web_search", search), policy), cache);
//! let hits = op.call(&query).await?;
//! ```
//!
//! Caching outside retry means a miss is retried before anything is stored,
//! and only the final success is persisted.

mod cached;
mod operation;
mod retry;

pub use cached::{cached, CachedOperation};
pub use operation::{operation, FnOperation, Operation, SharedOperation};
pub use retry::{retrying, RetryOperation};
