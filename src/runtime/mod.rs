//! Cancellation for the crate's long-running operations (OAuth flows,
//! downloads). Every async entry point that can outlive its caller's
//! interest takes a [`CancellationToken`]; cancelling any clone cancels
//! them all.

pub use tokio_util::sync::CancellationToken;
