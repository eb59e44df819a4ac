/*!
JNI bindings for the key bridge.

Backs the native methods of `io.pqc.keybridge.NativeKeyBridge`:

```java
public final class NativeKeyBridge {
    public native byte[] generateKey();
    public native int publicKeyLength();
}
```

`generateKey` returns a `byte[]` of exactly the public-key length, or
`null` on any failure. It never leaves a Java exception pending.
*/

use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use jni::objects::{JByteArray, JObject};
use jni::sys::{jbyteArray, jint};
use jni::JNIEnv;

use crate::constants::{DEFAULT_KEM_ALGORITHM, GENERATOR_LOG_TARGET};
use crate::error::{Error, Result};
use crate::generator::{BoundarySink, KeyPairGenerator};
use crate::logging;

/// Copies the public key into a new Java `byte[]`
struct JByteArraySink<'a, 'local> {
    env: &'a JNIEnv<'local>,
}

impl<'local> BoundarySink for JByteArraySink<'_, 'local> {
    type Output = JByteArray<'local>;

    fn marshal(self, public_key: &[u8]) -> Result<JByteArray<'local>> {
        self.env.byte_array_from_slice(public_key).map_err(|e| {
            // NewByteArray leaves an OutOfMemoryError pending on failure.
            if self.env.exception_check().unwrap_or(false) {
                let _ = self.env.exception_clear();
            }
            Error::Marshal(e.to_string())
        })
    }
}

/// `byte[] NativeKeyBridge.generateKey()`
#[unsafe(no_mangle)]
pub extern "system" fn Java_io_pqc_keybridge_NativeKeyBridge_generateKey<'local>(
    env: JNIEnv<'local>,
    _this: JObject<'local>,
) -> jbyteArray {
    logging::init();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        KeyPairGenerator::default().generate_into(JByteArraySink { env: &env })
    }));

    match outcome {
        Ok(Ok(array)) => array.into_raw(),
        Ok(Err(_)) => ptr::null_mut(),
        Err(_) => {
            log::error!(target: GENERATOR_LOG_TARGET, "Panic caught at the JNI boundary");
            ptr::null_mut()
        }
    }
}

/// `int NativeKeyBridge.publicKeyLength()`
#[unsafe(no_mangle)]
pub extern "system" fn Java_io_pqc_keybridge_NativeKeyBridge_publicKeyLength<'local>(
    _env: JNIEnv<'local>,
    _this: JObject<'local>,
) -> jint {
    DEFAULT_KEM_ALGORITHM.public_key_len() as jint
}
