//! Logger installation.
//!
//! The crate only emits records through the `log` facade. Hosts that
//! already installed a logger keep it; `init` is a no-op after the first
//! successful call.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the platform logger: logcat on Android, `env_logger` elsewhere.
///
/// `RUST_LOG` controls the filter on host builds and defaults to `info`.
pub fn init() {
    INIT.call_once(install);
}

#[cfg(target_os = "android")]
fn install() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("pqc-keybridge"),
    );
}

#[cfg(not(target_os = "android"))]
fn install() {
    let env = env_logger::Env::default().default_filter_or("info");
    // Another logger may already be installed by the host; keep it.
    let _ = env_logger::Builder::from_env(env)
        .format_target(true)
        .try_init();
}
