/*!
Foreign Function Interface (FFI) module for the key bridge.

This module provides C-compatible bindings so the generator can be
called from C, C++, C#, and other languages that support C FFI.
*/

mod c_api;

pub use c_api::*;
