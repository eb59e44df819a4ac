/*!
Error handling for the key bridge.

Every failure is reported where it happens, after the resources acquired
so far have been released. Boundary layers decide how much of this
detail reaches the caller.
*/

use crate::kem::KemAlgorithm;
use crate::memory::KeyRole;
use thiserror::Error;

/// Result type for the key bridge
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the key bridge
#[derive(Error, Debug)]
pub enum Error {
    /// The provider could not construct a KEM instance
    #[error("KEM initialization failed for {algorithm}: {reason}")]
    Initialization {
        algorithm: KemAlgorithm,
        reason: String,
    },

    /// A key buffer could not be allocated
    #[error("Failed to allocate {len} bytes for the {role} key buffer")]
    Allocation { role: KeyRole, len: usize },

    /// The key generation primitive reported failure (limited details for security)
    #[error("Key generation failed for {algorithm}: {reason}")]
    Generation {
        algorithm: KemAlgorithm,
        reason: String,
    },

    /// The public key could not be copied into the caller-owned container
    #[error("Failed to marshal public key: {0}")]
    Marshal(String),

    /// Unknown or disabled algorithm name
    #[error("Unsupported KEM algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key or ciphertext input has the wrong shape
    #[error("Invalid {what}: expected {expected} bytes, got {actual}")]
    InvalidKey {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Key encapsulation failed
    #[error("Key encapsulation failed")]
    Encapsulation,

    /// Key decapsulation failed
    #[error("Key decapsulation failed")]
    Decapsulation,

    /// Configuration rejected by `GeneratorConfig::validate`
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Short stable name of the failure kind, safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Initialization { .. } => "InitializationError",
            Error::Allocation { .. } => "AllocationError",
            Error::Generation { .. } => "GenerationError",
            Error::Marshal(_) => "MarshalError",
            Error::UnsupportedAlgorithm(_) => "UnsupportedAlgorithm",
            Error::InvalidKey { .. } => "InvalidKey",
            Error::Encapsulation => "EncapsulationError",
            Error::Decapsulation => "DecapsulationError",
            Error::InvalidConfig(_) => "InvalidConfig",
        }
    }
}

/// Convert a string to an Error::Marshal
pub fn marshal_err<T, S: Into<String>>(msg: S) -> Result<T> {
    Err(Error::Marshal(msg.into()))
}
