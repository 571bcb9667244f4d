use std::{fmt, slice};

use thiserror::Error;
use tokio::sync::AcquireError;

use crate::{config::Target, lease::Lease, manager::Manager};

#[derive(Debug, Error)]
pub enum PoolError<E> {
    #[error("failed to create resource: {0}")]
    CreationFailed(#[source] E),

    #[error("timed out waiting for an idle resource")]
    TimedOut,

    #[error(transparent)]
    CloseFailed(#[from] CloseErrors<E>),

    #[error("the pool has been destroyed")]
    Closed,

    #[error("pool targets {current}, not {requested}")]
    TargetMismatch { current: Target, requested: Target },
}

impl<E> From<AcquireError> for PoolError<E> {
    fn from(_: AcquireError) -> Self {
        PoolError::Closed
    }
}

/// Error returned by [`Pool::release`](crate::Pool::release).
#[derive(Error)]
pub enum ReleaseError<M: Manager> {
    /// The lease was issued by another pool. It is handed back untouched so
    /// it can still be released where it came from.
    #[error("the resource isn't managed by this pool")]
    NotManaged(Lease<M>),

    /// The resource had to be closed, because the pool was destroyed or
    /// retargeted, and closing it failed.
    #[error(transparent)]
    CloseFailed(#[from] CloseErrors<M::Error>),
}

impl<M: Manager> ReleaseError<M> {
    /// The refused lease, if this is [`ReleaseError::NotManaged`].
    pub fn into_lease(self) -> Option<Lease<M>> {
        match self {
            ReleaseError::NotManaged(lease) => Some(lease),
            ReleaseError::CloseFailed(_) => None,
        }
    }
}

impl<M: Manager> fmt::Debug for ReleaseError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseError::NotManaged(lease) => {
                f.debug_tuple("NotManaged").field(&lease.id()).finish()
            }
            ReleaseError::CloseFailed(errors) => {
                f.debug_tuple("CloseFailed").field(errors).finish()
            }
        }
    }
}

/// Failures reported by [`Manager::close`](crate::Manager::close) while
/// tearing resources down. Each entry is a handle that may have leaked.
#[derive(Debug, Error)]
#[error("failed to close {} resource(s)", .errors.len())]
pub struct CloseErrors<E> {
    errors: Vec<E>,
}

impl<E> CloseErrors<E> {
    pub(crate) fn collect<I>(results: I) -> Result<(), Self>
    where
        I: IntoIterator<Item = Result<(), E>>,
    {
        let errors: Vec<E> = results.into_iter().filter_map(Result::err).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CloseErrors { errors })
        }
    }

    pub(crate) fn single(error: E) -> Self {
        CloseErrors {
            errors: vec![error],
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, E> {
        self.errors.iter()
    }

    pub fn into_inner(self) -> Vec<E> {
        self.errors
    }
}

impl<E> IntoIterator for CloseErrors<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_size must be greater than zero")]
    ZeroMaxSize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn collect_keeps_only_failures() {
        let ok: Result<(), CloseErrors<io::Error>> = CloseErrors::collect(vec![Ok(()), Ok(())]);
        assert!(ok.is_ok());

        let errors = CloseErrors::collect(vec![
            Ok(()),
            Err(io::Error::new(io::ErrorKind::Other, "a")),
            Err(io::Error::new(io::ErrorKind::Other, "b")),
        ])
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.to_string(), "failed to close 2 resource(s)");
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }

    #[test]
    fn creation_error_keeps_cause() {
        let err: PoolError<io::Error> =
            PoolError::CreationFailed(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(err.to_string(), "failed to create resource: refused");
        assert!(std::error::Error::source(&err).is_some());
    }
}
