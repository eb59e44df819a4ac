/*!
Constants for the key bridge.

Published parameter-set sizes and the compiled-in algorithm choice.
*/

use crate::kem::KemAlgorithm;

/// Algorithm used by the boundary entry points.
///
/// Fixed at build time. Rust callers can pick another one through
/// [`GeneratorConfig`](crate::config::GeneratorConfig).
pub const DEFAULT_KEM_ALGORITHM: KemAlgorithm = KemAlgorithm::Kyber512;

/// Log target for the key-pair generator
pub const GENERATOR_LOG_TARGET: &str = "KeyPairGenerator";

/// Log target for the TLS probe
pub const PROBE_LOG_TARGET: &str = "TlsProbe";

/// Size of the little-endian length prefix on C heap results
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Number of fingerprint bytes shown in log lines
pub const FINGERPRINT_LOG_BYTES: usize = 8;

/// Size constants for the supported parameter sets
pub mod sizes {
    /// Byte lengths of one KEM parameter set
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KemLengths {
        /// Public key length
        pub public_key: usize,
        /// Secret key length
        pub secret_key: usize,
        /// Ciphertext length
        pub ciphertext: usize,
        /// Shared secret length
        pub shared_secret: usize,
    }

    /// Security category 1 (Kyber512 / ML-KEM-512)
    pub const LEVEL1: KemLengths = KemLengths {
        public_key: 800,
        secret_key: 1632,
        ciphertext: 768,
        shared_secret: 32,
    };

    /// Security category 3 (Kyber768 / ML-KEM-768)
    pub const LEVEL3: KemLengths = KemLengths {
        public_key: 1184,
        secret_key: 2400,
        ciphertext: 1088,
        shared_secret: 32,
    };

    /// Security category 5 (Kyber1024 / ML-KEM-1024)
    pub const LEVEL5: KemLengths = KemLengths {
        public_key: 1568,
        secret_key: 3168,
        ciphertext: 1568,
        shared_secret: 32,
    };
}
