//! Standalone TLS probe.
//!
//! Exits with 0 when a TLS client configuration can be built and 1
//! otherwise. Takes no arguments and reads no input.

use std::process::ExitCode;

use pqc_keybridge::logging;
use pqc_keybridge::probe::TlsProbe;

fn main() -> ExitCode {
    logging::init();
    let report = TlsProbe::new().run();
    ExitCode::from(report.outcome.exit_code())
}
