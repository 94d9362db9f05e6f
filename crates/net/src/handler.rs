//! Request handler abstraction for the server.

use async_trait::async_trait;
use std::fmt;

use crate::request::Request;
use crate::response::Response;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Turns one request into one response.
///
/// The server calls this once per message on a connection, after the request
/// body has been fully read. Returning an error makes the server answer with
/// a canned `500` and close the connection.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Response, BoxError>;
}

/// A [`Handler`] built from an async function.
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send,
{
    async fn handle(&self, request: Request) -> Result<Response, BoxError> {
        (self.f)(request).await
    }
}
