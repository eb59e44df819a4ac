/*!
C API for the key bridge.

Every entry point generates a fresh key pair with the compiled-in
algorithm and hands back only a copy of the public key. Panics are caught
here and never unwind into the caller.
*/

use std::ffi::{c_char, CStr};
use std::os::raw::{c_int, c_uint};
use std::panic::{self, AssertUnwindSafe};
use std::{ptr, slice};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::constants::{DEFAULT_KEM_ALGORITHM, LENGTH_PREFIX_BYTES};
use crate::error::{marshal_err, Error, Result};
use crate::generator::{BoundarySink, KeyPairGenerator};
use crate::kem::KemAlgorithm;
use crate::logging;

/// Error codes for the C API
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PqkbErrorCode {
    Success = 0,
    InvalidArgument = -1,
    InitializationError = -2,
    AllocationError = -3,
    GenerationError = -4,
    MarshalError = -5,
    InternalError = -6,
}

// Helper function to convert Result to C error code
fn to_error_code<T>(result: Result<T>) -> (PqkbErrorCode, Option<T>) {
    match result {
        Ok(value) => (PqkbErrorCode::Success, Some(value)),
        Err(err) => {
            let code = match err {
                Error::Initialization { .. } => PqkbErrorCode::InitializationError,
                Error::Allocation { .. } => PqkbErrorCode::AllocationError,
                Error::Generation { .. } => PqkbErrorCode::GenerationError,
                Error::Marshal(_) => PqkbErrorCode::MarshalError,
                Error::InvalidConfig(_) | Error::UnsupportedAlgorithm(_) => {
                    PqkbErrorCode::InitializationError
                }
                Error::InvalidKey { .. } => PqkbErrorCode::InvalidArgument,
                Error::Encapsulation | Error::Decapsulation => PqkbErrorCode::InternalError,
            };
            (code, None)
        }
    }
}

/// Run `f`, turning a panic into `None`
fn guarded<T>(f: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            log::error!(
                target: crate::constants::GENERATOR_LOG_TARGET,
                "Panic caught at the C boundary"
            );
            None
        }
    }
}

fn boundary_generator() -> KeyPairGenerator {
    logging::init();
    KeyPairGenerator::default()
}

fn c_name(algorithm: KemAlgorithm) -> &'static CStr {
    match algorithm {
        KemAlgorithm::Kyber512 => c"Kyber512",
        KemAlgorithm::Kyber768 => c"Kyber768",
        KemAlgorithm::Kyber1024 => c"Kyber1024",
        KemAlgorithm::MlKem512 => c"ML-KEM-512",
        KemAlgorithm::MlKem768 => c"ML-KEM-768",
        KemAlgorithm::MlKem1024 => c"ML-KEM-1024",
    }
}

/// Copies into a buffer the caller allocated
struct CallerBufferSink<'a> {
    out: &'a mut [u8],
}

impl BoundarySink for CallerBufferSink<'_> {
    type Output = usize;

    fn marshal(self, public_key: &[u8]) -> Result<usize> {
        if self.out.len() < public_key.len() {
            return marshal_err(format!(
                "caller buffer holds {} bytes, public key needs {}",
                self.out.len(),
                public_key.len()
            ));
        }
        self.out[..public_key.len()].copy_from_slice(public_key);
        Ok(public_key.len())
    }
}

/// Copies into a length-prefixed heap block owned by the caller
struct LengthPrefixedSink;

impl BoundarySink for LengthPrefixedSink {
    type Output = Box<[u8]>;

    fn marshal(self, public_key: &[u8]) -> Result<Box<[u8]>> {
        let prefix = u32::try_from(public_key.len())
            .map_err(|_| Error::Marshal("public key too long for a u32 prefix".into()))?;

        let total = LENGTH_PREFIX_BYTES + public_key.len();
        let mut block = Vec::new();
        block
            .try_reserve_exact(total)
            .map_err(|_| Error::Marshal(format!("cannot allocate {} bytes", total)))?;
        block
            .write_u32::<LittleEndian>(prefix)
            .map_err(|e| Error::Marshal(e.to_string()))?;
        block.extend_from_slice(public_key);
        Ok(block.into_boxed_slice())
    }
}

/// Public key length of the compiled-in algorithm
///
/// @return Length in bytes
#[unsafe(no_mangle)]
pub extern "C" fn pqkb_public_key_length() -> c_uint {
    DEFAULT_KEM_ALGORITHM.public_key_len() as c_uint
}

/// Name of the compiled-in algorithm
///
/// @return Static NUL-terminated string, never freed by the caller
#[unsafe(no_mangle)]
pub extern "C" fn pqkb_algorithm_name() -> *const c_char {
    c_name(DEFAULT_KEM_ALGORITHM).as_ptr()
}

/// Generate a key pair and copy its public key into a caller buffer
///
/// @param out_public_key Buffer to receive the public key
/// @param out_public_key_len Pointer to the buffer capacity (in) / bytes written (out)
/// @return 0 on success, negative error code on failure. On MarshalError the
///         required length is written to out_public_key_len and the buffer
///         is left untouched.
#[unsafe(no_mangle)]
pub extern "C" fn pqkb_generate_public_key(
    out_public_key: *mut u8,
    out_public_key_len: *mut c_uint,
) -> c_int {
    // Validate arguments
    if out_public_key.is_null() || out_public_key_len.is_null() {
        return PqkbErrorCode::InvalidArgument as c_int;
    }

    let outcome = guarded(|| {
        let capacity = unsafe { *out_public_key_len } as usize;
        let out = unsafe { slice::from_raw_parts_mut(out_public_key, capacity) };
        to_error_code(boundary_generator().generate_into(CallerBufferSink { out }))
    });

    match outcome {
        Some((PqkbErrorCode::Success, Some(written))) => {
            unsafe { *out_public_key_len = written as c_uint };
            PqkbErrorCode::Success as c_int
        }
        Some((PqkbErrorCode::MarshalError, _)) => {
            unsafe { *out_public_key_len = pqkb_public_key_length() };
            PqkbErrorCode::MarshalError as c_int
        }
        Some((code, _)) => code as c_int,
        None => PqkbErrorCode::InternalError as c_int,
    }
}

/// Generate a key pair and return its public key in a new heap block
///
/// The block starts with the key length as a little-endian u32, followed by
/// the key bytes. Release it with pqkb_free_public_key.
///
/// @return Pointer to the block, or NULL on any failure
#[unsafe(no_mangle)]
pub extern "C" fn pqkb_generate_public_key_alloc() -> *mut u8 {
    let outcome = guarded(|| boundary_generator().generate_into(LengthPrefixedSink));

    match outcome {
        Some(Ok(block)) => Box::into_raw(block) as *mut u8,
        _ => ptr::null_mut(),
    }
}

/// Free a block returned by pqkb_generate_public_key_alloc
///
/// @param block Pointer returned by pqkb_generate_public_key_alloc, or NULL
#[unsafe(no_mangle)]
pub extern "C" fn pqkb_free_public_key(block: *mut u8) {
    if block.is_null() {
        return;
    }

    unsafe {
        let len = LittleEndian::read_u32(slice::from_raw_parts(block, LENGTH_PREFIX_BYTES));
        let total = LENGTH_PREFIX_BYTES + len as usize;
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(block, total)));
    }
}
