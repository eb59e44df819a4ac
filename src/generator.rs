/*!
Key-pair generation.

One call to [`KeyPairGenerator::generate_into`] owns exactly one KEM
instance and its two key buffers:

1. Instantiate the KEM for the configured algorithm
2. Allocate the public and secret buffers, sized from the instance
3. Generate the key pair into both buffers
4. Copy the public key into the caller's container through a [`BoundarySink`]

A panic inside the provider is reported as [`Error::Generation`].
Every resource is a scoped value, so whichever step fails, the secret
buffer, the public buffer and the instance are released (in that order)
before the error is returned. Only the copied public key leaves the call.
*/

use std::fmt::Write as _;
use std::panic::{self, AssertUnwindSafe};

use crate::config::GeneratorConfig;
use crate::constants::{FINGERPRINT_LOG_BYTES, GENERATOR_LOG_TARGET};
use crate::error::{Error, Result};
use crate::kem::{
    fingerprint, validate_public_key, KemAlgorithm, KemInstance, KemProvider, PqcleanProvider,
    SharedSecret,
};
use crate::memory::{BufferAllocator, KeyBuffer, KeyRole, SystemAllocator};

/// Destination of a generated public key.
///
/// Implementations copy the bytes into a container owned by the caller's
/// runtime and return it, or fail with [`Error::Marshal`]. They must never
/// return a partially filled container.
pub trait BoundarySink {
    /// Caller-owned result
    type Output;

    /// Copy `public_key` into the caller's container
    fn marshal(self, public_key: &[u8]) -> Result<Self::Output>;
}

/// Copies the public key into a fresh `Vec<u8>`
#[derive(Debug, Clone, Copy, Default)]
pub struct VecSink;

impl BoundarySink for VecSink {
    type Output = Vec<u8>;

    fn marshal(self, public_key: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.try_reserve_exact(public_key.len())
            .map_err(|_| Error::Marshal(format!("cannot allocate {} bytes", public_key.len())))?;
        out.extend_from_slice(public_key);
        Ok(out)
    }
}

/// A key pair kept in process.
///
/// Both halves stay in zeroizing key buffers and are released through the
/// generator's allocator when the pair is dropped.
#[derive(Debug)]
pub struct KeyPair<'a> {
    algorithm: KemAlgorithm,
    public_key: KeyBuffer<'a>,
    secret_key: KeyBuffer<'a>,
}

impl KeyPair<'_> {
    /// Parameter set the pair was generated for
    pub fn algorithm(&self) -> KemAlgorithm {
        self.algorithm
    }

    /// Public key bytes
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Secret key bytes
    pub fn expose_secret(&self) -> &[u8] {
        &self.secret_key
    }
}

/// Stateless post-quantum key-pair generator.
///
/// Holds only configuration and the provider/allocator it was built with;
/// no instance, buffer or key survives a call. Safe to share across
/// threads.
#[derive(Debug, Clone)]
pub struct KeyPairGenerator<P = PqcleanProvider, A = SystemAllocator> {
    config: GeneratorConfig,
    provider: P,
    allocator: A,
}

impl KeyPairGenerator {
    /// Create a generator over the PQClean provider and the system allocator
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_components(config, PqcleanProvider, SystemAllocator))
    }
}

impl Default for KeyPairGenerator {
    fn default() -> Self {
        Self::with_components(GeneratorConfig::default(), PqcleanProvider, SystemAllocator)
    }
}

impl<P: KemProvider, A: BufferAllocator> KeyPairGenerator<P, A> {
    /// Create a generator from explicit parts
    pub fn with_components(config: GeneratorConfig, provider: P, allocator: A) -> Self {
        Self {
            config,
            provider,
            allocator,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// KEM provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Buffer allocator
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Generate a key pair and return a copy of its public key
    pub fn generate_public_key(&self) -> Result<Vec<u8>> {
        self.generate_into(VecSink)
    }

    /// Generate a key pair and marshal its public key through `sink`
    pub fn generate_into<S: BoundarySink>(&self, sink: S) -> Result<S::Output> {
        let (instance, public_key, _secret_key) = self.generate_buffers()?;

        let output = sink
            .marshal(&public_key)
            .inspect_err(|e| log_failure("marshal public key", e))?;

        log::info!(
            target: GENERATOR_LOG_TARGET,
            "{} public key ({} bytes, fingerprint {}) passed across the boundary",
            instance.algorithm(),
            public_key.len(),
            short_fingerprint(&public_key)
        );

        // _secret_key, public_key and instance drop here, in that order
        Ok(output)
    }

    /// Generate a key pair that stays in process
    pub fn generate_keypair(&self) -> Result<KeyPair<'_>> {
        let (instance, public_key, secret_key) = self.generate_buffers()?;
        Ok(KeyPair {
            algorithm: instance.algorithm(),
            public_key,
            secret_key,
        })
    }

    /// Encapsulate a fresh shared secret to `public_key`
    pub fn encapsulate(&self, public_key: &[u8]) -> Result<(SharedSecret, Vec<u8>)> {
        let algorithm = self.config.algorithm;
        validate_public_key(algorithm, public_key)?;
        let instance = self.instantiate(algorithm)?;
        instance
            .encapsulate(public_key)
            .inspect_err(|e| log_failure("encapsulate", e))
    }

    /// Recover the shared secret for `ciphertext` with an in-process key pair
    pub fn decapsulate(&self, ciphertext: &[u8], keypair: &KeyPair<'_>) -> Result<SharedSecret> {
        let instance = self.instantiate(keypair.algorithm())?;
        instance
            .decapsulate(ciphertext, keypair.expose_secret())
            .inspect_err(|e| log_failure("decapsulate", e))
    }

    fn instantiate(&self, algorithm: KemAlgorithm) -> Result<Box<dyn KemInstance>> {
        let instance = self
            .provider
            .instantiate(algorithm)
            .inspect_err(|e| log_failure("initialize KEM", e))?;
        log::info!(
            target: GENERATOR_LOG_TARGET,
            "{} initialized by {} provider",
            algorithm,
            self.provider.name()
        );
        Ok(instance)
    }

    fn generate_buffers(&self) -> Result<(Box<dyn KemInstance>, KeyBuffer<'_>, KeyBuffer<'_>)> {
        let instance = self.instantiate(self.config.algorithm)?;
        let allocator: &dyn BufferAllocator = &self.allocator;

        let mut public_key =
            KeyBuffer::allocate(allocator, KeyRole::Public, instance.public_key_len(), false)
                .inspect_err(|e| log_failure("allocate public key", e))?;
        let mut secret_key = KeyBuffer::allocate(
            allocator,
            KeyRole::Secret,
            instance.secret_key_len(),
            self.config.lock_secret_memory,
        )
        .inspect_err(|e| log_failure("allocate secret key", e))?;
        log::info!(
            target: GENERATOR_LOG_TARGET,
            "Allocated {} byte public and {} byte secret key buffers",
            public_key.len(),
            secret_key.len()
        );

        panic::catch_unwind(AssertUnwindSafe(|| {
            instance.keypair(&mut public_key, &mut secret_key)
        }))
        .unwrap_or_else(|_| {
            Err(Error::Generation {
                algorithm: instance.algorithm(),
                reason: "provider panicked".into(),
            })
        })
        .inspect_err(|e| log_failure("generate keypair", e))?;
        log::info!(target: GENERATOR_LOG_TARGET, "Keypair generated successfully");

        Ok((instance, public_key, secret_key))
    }
}

fn log_failure(step: &str, err: &Error) {
    log::error!(
        target: GENERATOR_LOG_TARGET,
        "Failed to {}: {} ({})",
        step,
        err,
        err.kind()
    );
}

fn short_fingerprint(public_key: &[u8]) -> String {
    let digest = fingerprint(public_key);
    let mut out = String::with_capacity(FINGERPRINT_LOG_BYTES * 2);
    for byte in &digest[..FINGERPRINT_LOG_BYTES] {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
