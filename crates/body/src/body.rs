//! Single-consumption body slot.
//!
//! The middleware wraps the incoming body in [`SharedBody`] before deciding
//! whether to parse it. An ineligible request keeps its body untouched and
//! fully consumable downstream; a parsed request has had the slot emptied by
//! exactly one codec. A second consumption attempt is a defined failure, not
//! a crash.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::BodyError;

/// A cloneable slot holding a request body that can be taken once.
pub struct SharedBody<B> {
    inner: Arc<Mutex<Option<B>>>,
}

impl<B> SharedBody<B> {
    pub fn new(body: B) -> Self {
        Self { inner: Arc::new(Mutex::new(Some(body))) }
    }

    /// Whether the body is still available.
    pub async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.is_some()
    }

    /// Takes the body out of the slot and runs `f` on it.
    ///
    /// Fails with [`BodyError::BodyConsumed`] when the slot is already empty.
    pub async fn apply<T, F, Fut>(&self, f: F) -> Result<T, BodyError>
    where
        F: FnOnce(B) -> Fut,
        Fut: Future<Output = Result<T, BodyError>>,
    {
        let mut guard = self.inner.lock().await;
        let Some(body) = guard.take() else {
            return Err(BodyError::BodyConsumed);
        };
        drop(guard);

        f(body).await
    }

    /// Takes the body back out of the slot, if still present.
    pub async fn into_inner(self) -> Option<B> {
        let mut guard = self.inner.lock().await;
        guard.take()
    }
}

impl<B> Clone for SharedBody<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B> From<B> for SharedBody<B> {
    fn from(body: B) -> Self {
        Self::new(body)
    }
}

impl<B> fmt::Debug for SharedBody<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBody").finish_non_exhaustive()
    }
}
