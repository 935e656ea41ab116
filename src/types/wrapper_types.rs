//! Common type aliases used across the codebase.

use std::future::Future;
use std::pin::Pin;

/// A boxed, pinned, send-safe future.
///
/// Returned by [`ChainGateway`](crate::gateway::ChainGateway) methods so the
/// trait stays object-safe without pulling in `async-trait`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
