/*!
# PQC Key Bridge

Generates post-quantum KEM key pairs and hands the public key to a
calling runtime across a foreign-function boundary.

## Overview

- CRYSTALS-Kyber and FIPS 203 ML-KEM through the PQClean implementations
- One KEM instance and two key buffers per call, nothing shared between calls
- Secret keys are zeroized (and locked into RAM where possible) and never
  cross the boundary
- Every failure releases what was acquired and surfaces as a single
  "no result" signal at the boundary
- C ABI (`ffi` feature) and JNI (`jni` feature) entry points
- A standalone TLS probe binary (`probe` feature)

## Example

```no_run
use pqc_keybridge::{GeneratorConfig, KeyPairGenerator, KemAlgorithm};

let generator = KeyPairGenerator::new(GeneratorConfig::default())?;
let public_key = generator.generate_public_key()?;
assert_eq!(public_key.len(), KemAlgorithm::Kyber512.public_key_len());
# Ok::<(), pqc_keybridge::Error>(())
```
*/

pub mod config;
pub mod constants;
pub mod error;
pub mod generator;
pub mod kem;
pub mod logging;
pub mod memory;

// Foreign Function Interface for C/C++/C#
#[cfg(feature = "ffi")]
pub mod ffi;

// Managed-runtime bindings
pub mod bindings;

// TLS provider probe
#[cfg(feature = "probe")]
pub mod probe;

// Re-export commonly used types for convenience
pub use config::GeneratorConfig;
pub use constants::{sizes, DEFAULT_KEM_ALGORITHM};
pub use error::{Error, Result};
pub use generator::{BoundarySink, KeyPair, KeyPairGenerator, VecSink};
pub use kem::{
    fingerprint, validate_public_key, KemAlgorithm, KemInstance, KemProvider, PqcleanProvider,
    SerializedProvider, SharedSecret,
};
pub use memory::{BufferAllocator, KeyBuffer, KeyRole, SystemAllocator};

/// Generate a key pair with the compiled-in algorithm and return its public key.
///
/// Returns `None` on any failure; the failure kind is logged.
pub fn generate_public_key() -> Option<Vec<u8>> {
    KeyPairGenerator::default().generate_public_key().ok()
}
