/*!
Generator configuration.

The algorithm is an explicit value handed to the generator rather than a
global, so the boundary entry points and Rust callers go through the
same path.
*/

use crate::error::{Error, Result};
use crate::kem::KemAlgorithm;

/// Configuration for a [`KeyPairGenerator`](crate::generator::KeyPairGenerator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct GeneratorConfig {
    /// KEM parameter set
    pub algorithm: KemAlgorithm,
    /// Lock secret key buffers into RAM where the platform allows it
    pub lock_secret_memory: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            algorithm: KemAlgorithm::default(),
            lock_secret_memory: true,
        }
    }
}

impl GeneratorConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific algorithm
    pub fn with_algorithm(mut self, algorithm: KemAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Enable or disable locking of secret buffers
    pub fn with_memory_locking(mut self, lock: bool) -> Self {
        self.lock_secret_memory = lock;
        self
    }

    /// FIPS 203 ML-KEM-768
    pub fn standardized() -> Self {
        Self::default().with_algorithm(KemAlgorithm::MlKem768)
    }

    /// FIPS 203 ML-KEM-1024, highest security category
    pub fn high_security() -> Self {
        Self::default().with_algorithm(KemAlgorithm::MlKem1024)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.algorithm.is_supported() {
            return Err(Error::InvalidConfig(format!(
                "{} is not available, enable the 'mlkem' feature",
                self.algorithm
            )));
        }
        Ok(())
    }
}
