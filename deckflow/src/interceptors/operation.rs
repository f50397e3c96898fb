//! The operation abstraction that retry and cache wrappers compose over.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A named, fallible async call over serializable arguments.
///
/// The name and the serialized arguments identify a call for caching, so two
/// operations that compute different things must not share a name.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Argument type.
    type Args: Serialize + Send + Sync;
    /// Success type.
    type Output: Send + Sync;
    /// Failure type.
    type Error: fmt::Display + Send;

    /// Returns the operation name.
    fn name(&self) -> &str;

    /// Performs one call.
    async fn call(&self, args: &Self::Args) -> Result<Self::Output, Self::Error>;
}

/// A type-erased, shareable operation.
pub type SharedOperation<A, T, E> = Arc<dyn Operation<Args = A, Output = T, Error = E>>;

#[async_trait]
impl<O> Operation for Arc<O>
where
    O: Operation + ?Sized,
{
    type Args = O::Args;
    type Output = O::Output;
    type Error = O::Error;

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn call(&self, args: &Self::Args) -> Result<Self::Output, Self::Error> {
        (**self).call(args).await
    }
}

/// An operation backed by an async closure taking owned arguments.
pub struct FnOperation<A, T, E, F> {
    name: String,
    func: F,
    _marker: PhantomData<fn(A) -> Result<T, E>>,
}

impl<A, T, E, F> FnOperation<A, T, E, F> {
    /// Creates an operation named `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _marker: PhantomData,
        }
    }
}

impl<A, T, E, F> fmt::Debug for FnOperation<A, T, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<A, T, E, F, Fut> Operation for FnOperation<A, T, E, F>
where
    A: Serialize + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
    E: fmt::Display + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
{
    type Args = A;
    type Output = T;
    type Error = E;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, args: &A) -> Result<T, E> {
        (self.func)(args.clone()).await
    }
}

/// Builds an [`FnOperation`].
pub fn operation<A, T, E, F, Fut>(name: impl Into<String>, func: F) -> FnOperation<A, T, E, F>
where
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
{
    FnOperation::new(name, func)
}
