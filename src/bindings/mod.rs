//! Managed-runtime bindings for the key bridge.
//!
//! The C ABI lives in [`crate::ffi`]; this module holds the bindings that
//! marshal straight into a managed runtime's own containers.

// JVM / Android bindings
#[cfg(feature = "jni")]
pub mod jni;
