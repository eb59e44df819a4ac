/*!
Serialized instance creation for providers that are not thread-safe.

Only `instantiate` runs under the lock. Key generation on the returned
instance proceeds concurrently.
*/

use std::sync::{Mutex, PoisonError};

use super::{KemAlgorithm, KemInstance, KemProvider};
use crate::error::Result;

/// Wraps a provider so that instance creation happens one call at a time
#[derive(Debug, Default)]
pub struct SerializedProvider<P> {
    inner: P,
    lock: Mutex<()>,
}

impl<P: KemProvider> SerializedProvider<P> {
    /// Wrap `inner`
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }

    /// The wrapped provider
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: KemProvider> KemProvider for SerializedProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn instantiate(&self, algorithm: KemAlgorithm) -> Result<Box<dyn KemInstance>> {
        // The guard protects no data, so a poisoned lock is still usable.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.instantiate(algorithm)
    }
}
