mod coordinator;

use std::future::Future;

use crate::errors::HttpError;

pub use coordinator::RefreshCoordinator;

/// Performs exactly one refresh call against the server.
pub trait RefreshSource: Send + Sync + 'static {
    fn refresh(&self) -> impl Future<Output = Result<(), HttpError>> + Send;
}
