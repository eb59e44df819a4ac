/*!
PQClean-backed KEM provider.

Instances call the PQClean reference implementations shipped with the
`pqcrypto-*` crates directly through their C entry points, so key
material is written straight into the caller's buffers and never passes
through an intermediate key object.
*/

use std::os::raw::c_int;

use pqcrypto_kyber::ffi as kyber_ffi;
use pqcrypto_kyber::{kyber1024, kyber512, kyber768};
#[cfg(feature = "mlkem")]
use pqcrypto_mlkem::ffi as mlkem_ffi;
#[cfg(feature = "mlkem")]
use pqcrypto_mlkem::{mlkem1024, mlkem512, mlkem768};
use zeroize::Zeroizing;

use super::{check_len, KemAlgorithm, KemInstance, KemProvider, SharedSecret};
use crate::constants::sizes::KemLengths;
use crate::error::{Error, Result};

type KeypairFn = unsafe extern "C" fn(pk: *mut u8, sk: *mut u8) -> c_int;
type EncapsulateFn = unsafe extern "C" fn(ct: *mut u8, ss: *mut u8, pk: *const u8) -> c_int;
type DecapsulateFn = unsafe extern "C" fn(ss: *mut u8, ct: *const u8, sk: *const u8) -> c_int;

/// Entry points and lengths of one PQClean parameter set
#[derive(Clone, Copy)]
struct KemTable {
    lengths: KemLengths,
    keypair: KeypairFn,
    encapsulate: EncapsulateFn,
    decapsulate: DecapsulateFn,
}

macro_rules! kem_table {
    ($module:ident, $keypair:path, $enc:path, $dec:path) => {
        KemTable {
            lengths: KemLengths {
                public_key: $module::public_key_bytes(),
                secret_key: $module::secret_key_bytes(),
                ciphertext: $module::ciphertext_bytes(),
                shared_secret: $module::shared_secret_bytes(),
            },
            keypair: $keypair,
            encapsulate: $enc,
            decapsulate: $dec,
        }
    };
}

fn lookup(algorithm: KemAlgorithm) -> Option<KemTable> {
    match algorithm {
        KemAlgorithm::Kyber512 => Some(kem_table!(
            kyber512,
            kyber_ffi::PQCLEAN_KYBER512_CLEAN_crypto_kem_keypair,
            kyber_ffi::PQCLEAN_KYBER512_CLEAN_crypto_kem_enc,
            kyber_ffi::PQCLEAN_KYBER512_CLEAN_crypto_kem_dec
        )),
        KemAlgorithm::Kyber768 => Some(kem_table!(
            kyber768,
            kyber_ffi::PQCLEAN_KYBER768_CLEAN_crypto_kem_keypair,
            kyber_ffi::PQCLEAN_KYBER768_CLEAN_crypto_kem_enc,
            kyber_ffi::PQCLEAN_KYBER768_CLEAN_crypto_kem_dec
        )),
        KemAlgorithm::Kyber1024 => Some(kem_table!(
            kyber1024,
            kyber_ffi::PQCLEAN_KYBER1024_CLEAN_crypto_kem_keypair,
            kyber_ffi::PQCLEAN_KYBER1024_CLEAN_crypto_kem_enc,
            kyber_ffi::PQCLEAN_KYBER1024_CLEAN_crypto_kem_dec
        )),
        #[cfg(feature = "mlkem")]
        KemAlgorithm::MlKem512 => Some(kem_table!(
            mlkem512,
            mlkem_ffi::PQCLEAN_MLKEM512_CLEAN_crypto_kem_keypair,
            mlkem_ffi::PQCLEAN_MLKEM512_CLEAN_crypto_kem_enc,
            mlkem_ffi::PQCLEAN_MLKEM512_CLEAN_crypto_kem_dec
        )),
        #[cfg(feature = "mlkem")]
        KemAlgorithm::MlKem768 => Some(kem_table!(
            mlkem768,
            mlkem_ffi::PQCLEAN_MLKEM768_CLEAN_crypto_kem_keypair,
            mlkem_ffi::PQCLEAN_MLKEM768_CLEAN_crypto_kem_enc,
            mlkem_ffi::PQCLEAN_MLKEM768_CLEAN_crypto_kem_dec
        )),
        #[cfg(feature = "mlkem")]
        KemAlgorithm::MlKem1024 => Some(kem_table!(
            mlkem1024,
            mlkem_ffi::PQCLEAN_MLKEM1024_CLEAN_crypto_kem_keypair,
            mlkem_ffi::PQCLEAN_MLKEM1024_CLEAN_crypto_kem_enc,
            mlkem_ffi::PQCLEAN_MLKEM1024_CLEAN_crypto_kem_dec
        )),
        #[cfg(not(feature = "mlkem"))]
        KemAlgorithm::MlKem512 | KemAlgorithm::MlKem768 | KemAlgorithm::MlKem1024 => None,
    }
}

/// Provider over the PQClean reference implementations
#[derive(Debug, Clone, Copy, Default)]
pub struct PqcleanProvider;

impl PqcleanProvider {
    /// Create a new provider
    pub fn new() -> Self {
        Self
    }
}

impl KemProvider for PqcleanProvider {
    fn name(&self) -> &'static str {
        "pqclean"
    }

    fn instantiate(&self, algorithm: KemAlgorithm) -> Result<Box<dyn KemInstance>> {
        let table = lookup(algorithm).ok_or_else(|| Error::Initialization {
            algorithm,
            reason: "algorithm not compiled into this build".into(),
        })?;

        // The buffers are sized from the instance, so a provider that
        // disagrees with the published parameter set is unusable.
        if table.lengths != algorithm.lengths() {
            return Err(Error::Initialization {
                algorithm,
                reason: format!(
                    "provider lengths {:?} differ from published {:?}",
                    table.lengths,
                    algorithm.lengths()
                ),
            });
        }

        Ok(Box::new(PqcleanKem { algorithm, table }))
    }
}

struct PqcleanKem {
    algorithm: KemAlgorithm,
    table: KemTable,
}

impl KemInstance for PqcleanKem {
    fn algorithm(&self) -> KemAlgorithm {
        self.algorithm
    }

    fn lengths(&self) -> KemLengths {
        self.table.lengths
    }

    fn keypair(&self, public_key: &mut [u8], secret_key: &mut [u8]) -> Result<()> {
        let lengths = self.table.lengths;
        if public_key.len() != lengths.public_key || secret_key.len() != lengths.secret_key {
            return Err(Error::Generation {
                algorithm: self.algorithm,
                reason: "key buffers do not match the declared lengths".into(),
            });
        }

        // SAFETY: both pointers are valid for writes of exactly the lengths
        // the implementation expects, checked above.
        let status =
            unsafe { (self.table.keypair)(public_key.as_mut_ptr(), secret_key.as_mut_ptr()) };
        if status != 0 {
            return Err(Error::Generation {
                algorithm: self.algorithm,
                reason: format!("keypair returned status {}", status),
            });
        }
        Ok(())
    }

    fn encapsulate(&self, public_key: &[u8]) -> Result<(SharedSecret, Vec<u8>)> {
        let lengths = self.table.lengths;
        check_len("public key", lengths.public_key, public_key.len())?;

        let mut ciphertext = vec![0u8; lengths.ciphertext];
        let mut shared_secret = Zeroizing::new(vec![0u8; lengths.shared_secret]);

        // SAFETY: output buffers are sized from the table, input length checked.
        let status = unsafe {
            (self.table.encapsulate)(
                ciphertext.as_mut_ptr(),
                shared_secret.as_mut_ptr(),
                public_key.as_ptr(),
            )
        };
        if status != 0 {
            return Err(Error::Encapsulation);
        }
        Ok((shared_secret, ciphertext))
    }

    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<SharedSecret> {
        let lengths = self.table.lengths;
        check_len("ciphertext", lengths.ciphertext, ciphertext.len())?;
        check_len("secret key", lengths.secret_key, secret_key.len())?;

        let mut shared_secret = Zeroizing::new(vec![0u8; lengths.shared_secret]);

        // SAFETY: output buffer sized from the table, input lengths checked.
        let status = unsafe {
            (self.table.decapsulate)(
                shared_secret.as_mut_ptr(),
                ciphertext.as_ptr(),
                secret_key.as_ptr(),
            )
        };
        if status != 0 {
            return Err(Error::Decapsulation);
        }
        Ok(shared_secret)
    }
}
