/*!
Key encapsulation mechanisms.

A [`KemProvider`] builds short-lived [`KemInstance`]s for one
[`KemAlgorithm`]. Instances describe their buffer lengths and carry the
keypair/encapsulate/decapsulate entry points; they are owned by a single
call and dropped before it returns.
*/

mod pqclean;
mod serialized;

pub use pqclean::PqcleanProvider;
pub use serialized::SerializedProvider;

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::constants::sizes::{self, KemLengths};
use crate::error::{Error, Result};

/// Shared secret produced by encapsulation or decapsulation
pub type SharedSecret = Zeroizing<Vec<u8>>;

/// Supported KEM parameter sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum KemAlgorithm {
    /// CRYSTALS-Kyber round 3, category 1
    Kyber512,
    /// CRYSTALS-Kyber round 3, category 3
    Kyber768,
    /// CRYSTALS-Kyber round 3, category 5
    Kyber1024,
    /// FIPS 203 ML-KEM, category 1
    MlKem512,
    /// FIPS 203 ML-KEM, category 3
    MlKem768,
    /// FIPS 203 ML-KEM, category 5
    MlKem1024,
}

impl Default for KemAlgorithm {
    fn default() -> Self {
        crate::constants::DEFAULT_KEM_ALGORITHM
    }
}

impl KemAlgorithm {
    /// Every parameter set known to the crate, compiled in or not
    pub const ALL: [KemAlgorithm; 6] = [
        KemAlgorithm::Kyber512,
        KemAlgorithm::Kyber768,
        KemAlgorithm::Kyber1024,
        KemAlgorithm::MlKem512,
        KemAlgorithm::MlKem768,
        KemAlgorithm::MlKem1024,
    ];

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            KemAlgorithm::Kyber512 => "Kyber512",
            KemAlgorithm::Kyber768 => "Kyber768",
            KemAlgorithm::Kyber1024 => "Kyber1024",
            KemAlgorithm::MlKem512 => "ML-KEM-512",
            KemAlgorithm::MlKem768 => "ML-KEM-768",
            KemAlgorithm::MlKem1024 => "ML-KEM-1024",
        }
    }

    /// NIST security category
    pub fn security_level(&self) -> u8 {
        match self {
            KemAlgorithm::Kyber512 | KemAlgorithm::MlKem512 => 1,
            KemAlgorithm::Kyber768 | KemAlgorithm::MlKem768 => 3,
            KemAlgorithm::Kyber1024 | KemAlgorithm::MlKem1024 => 5,
        }
    }

    /// Published lengths for this parameter set
    pub fn lengths(&self) -> KemLengths {
        match self.security_level() {
            1 => sizes::LEVEL1,
            3 => sizes::LEVEL3,
            _ => sizes::LEVEL5,
        }
    }

    /// Published public key length
    pub fn public_key_len(&self) -> usize {
        self.lengths().public_key
    }

    /// Whether the linked provider was built with this parameter set
    pub fn is_supported(&self) -> bool {
        match self {
            KemAlgorithm::Kyber512 | KemAlgorithm::Kyber768 | KemAlgorithm::Kyber1024 => true,
            KemAlgorithm::MlKem512 | KemAlgorithm::MlKem768 | KemAlgorithm::MlKem1024 => {
                cfg!(feature = "mlkem")
            }
        }
    }

    /// Parameter sets available in this build
    pub fn supported() -> Vec<KemAlgorithm> {
        Self::ALL.into_iter().filter(KemAlgorithm::is_supported).collect()
    }
}

impl fmt::Display for KemAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KemAlgorithm {
    type Err = Error;

    /// Accepts `Kyber512`, `KYBER_512`, `ml-kem-768`, `MLKEM1024`, ...
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "kyber512" => Ok(KemAlgorithm::Kyber512),
            "kyber768" => Ok(KemAlgorithm::Kyber768),
            "kyber1024" => Ok(KemAlgorithm::Kyber1024),
            "mlkem512" => Ok(KemAlgorithm::MlKem512),
            "mlkem768" => Ok(KemAlgorithm::MlKem768),
            "mlkem1024" => Ok(KemAlgorithm::MlKem1024),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// One KEM instance, owned by exactly one call
pub trait KemInstance: Send {
    /// Parameter set of this instance
    fn algorithm(&self) -> KemAlgorithm;

    /// Buffer lengths declared by the provider
    fn lengths(&self) -> KemLengths;

    /// Generate a key pair into caller-allocated buffers.
    ///
    /// Both slices must match the declared lengths exactly.
    fn keypair(&self, public_key: &mut [u8], secret_key: &mut [u8]) -> Result<()>;

    /// Encapsulate a fresh shared secret to `public_key`, returning it with the ciphertext
    fn encapsulate(&self, public_key: &[u8]) -> Result<(SharedSecret, Vec<u8>)>;

    /// Recover the shared secret from `ciphertext`
    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<SharedSecret>;

    /// Declared public key length
    fn public_key_len(&self) -> usize {
        self.lengths().public_key
    }

    /// Declared secret key length
    fn secret_key_len(&self) -> usize {
        self.lengths().secret_key
    }
}

/// Factory for KEM instances
pub trait KemProvider: Send + Sync {
    /// Provider name for diagnostics
    fn name(&self) -> &'static str;

    /// Build a new instance for `algorithm`
    fn instantiate(&self, algorithm: KemAlgorithm) -> Result<Box<dyn KemInstance>>;
}

impl<P: KemProvider + ?Sized> KemProvider for &P {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn instantiate(&self, algorithm: KemAlgorithm) -> Result<Box<dyn KemInstance>> {
        (**self).instantiate(algorithm)
    }
}

/// Check that `public_key` has the exact published length for `algorithm`
pub fn validate_public_key(algorithm: KemAlgorithm, public_key: &[u8]) -> Result<()> {
    let expected = algorithm.public_key_len();
    if public_key.len() != expected {
        return Err(Error::InvalidKey {
            what: "public key",
            expected,
            actual: public_key.len(),
        });
    }
    Ok(())
}

/// SHA-256 fingerprint of a public key
pub fn fingerprint(public_key: &[u8]) -> [u8; 32] {
    Sha256::digest(public_key).into()
}

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::InvalidKey { what, expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!("Kyber512".parse::<KemAlgorithm>().unwrap(), KemAlgorithm::Kyber512);
        assert_eq!("KYBER_512".parse::<KemAlgorithm>().unwrap(), KemAlgorithm::Kyber512);
        assert_eq!("ML-KEM-768".parse::<KemAlgorithm>().unwrap(), KemAlgorithm::MlKem768);
        assert_eq!("mlkem1024".parse::<KemAlgorithm>().unwrap(), KemAlgorithm::MlKem1024);
        assert!(matches!(
            "RSA_2048".parse::<KemAlgorithm>(),
            Err(Error::UnsupportedAlgorithm(name)) if name == "RSA_2048"
        ));
    }

    #[test]
    fn test_display_parses_back() {
        for alg in KemAlgorithm::ALL {
            assert_eq!(alg.to_string().parse::<KemAlgorithm>().unwrap(), alg);
        }
    }

    #[test]
    fn test_supported_always_has_kyber() {
        let supported = KemAlgorithm::supported();
        assert!(supported.contains(&KemAlgorithm::Kyber512));
        assert!(supported.contains(&KemAlgorithm::Kyber768));
        assert!(supported.contains(&KemAlgorithm::Kyber1024));
        assert_eq!(supported.contains(&KemAlgorithm::MlKem768), cfg!(feature = "mlkem"));
    }

    #[test]
    fn test_validate_public_key_exact_length() {
        let alg = KemAlgorithm::Kyber512;
        assert!(validate_public_key(alg, &vec![0u8; 800]).is_ok());
        assert!(validate_public_key(alg, &vec![0u8; 799]).is_err());
        assert!(validate_public_key(alg, &vec![0u8; 801]).is_err());
        assert!(validate_public_key(alg, &[]).is_err());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint(b"public");
        let b = fingerprint(b"public");
        let c = fingerprint(b"Public");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
