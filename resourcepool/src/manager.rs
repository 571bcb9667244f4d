use std::{fmt, future::Future, marker::PhantomData};

use crate::config::Target;

/// Creates and tears down the resources held by a [`Pool`](crate::Pool).
///
/// Neither method is called while the pool's state lock is held, so both may
/// be slow. The pool never retries a failed call.
pub trait Manager: 'static + Send + Sync {
    type Resource: Send + 'static;
    type Error: Send + std::error::Error + 'static;

    fn create(
        &self,
        target: &Target,
    ) -> impl Future<Output = Result<Self::Resource, Self::Error>> + Send;

    fn close(&self, resource: Self::Resource)
        -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Adapts a pair of plain functions into a [`Manager`].
pub struct FnManager<C, D, R, E> {
    create: C,
    close: D,
    _marker: PhantomData<fn() -> (R, E)>,
}

impl<C, D, R, E> FnManager<C, D, R, E>
where
    C: Fn(&str, u16) -> Result<R, E>,
    D: Fn(R) -> Result<(), E>,
{
    pub fn new(create: C, close: D) -> Self {
        Self {
            create,
            close,
            _marker: PhantomData,
        }
    }
}

impl<C, D, R, E> fmt::Debug for FnManager<C, D, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnManager")
    }
}

impl<C, D, R, E> Manager for FnManager<C, D, R, E>
where
    C: Fn(&str, u16) -> Result<R, E> + Send + Sync + 'static,
    D: Fn(R) -> Result<(), E> + Send + Sync + 'static,
    R: Send + 'static,
    E: Send + std::error::Error + 'static,
{
    type Resource = R;
    type Error = E;

    async fn create(&self, target: &Target) -> Result<R, E> {
        (self.create)(&target.host, target.port)
    }

    async fn close(&self, resource: R) -> Result<(), E> {
        (self.close)(resource)
    }
}
