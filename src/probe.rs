/*!
TLS provider probe.

Checks that the linked TLS stack can be initialized and can produce a
client configuration. Shares nothing with the key generator; it exists
so packaging problems show up as a failing exit code.
*/

use std::error::Error as StdError;
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore};

use crate::constants::PROBE_LOG_TARGET;

/// Result of one probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A client configuration was obtained
    Success,
    /// The provider refused to build a client configuration
    Failure,
}

impl ProbeOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            ProbeOutcome::Success => 0,
            ProbeOutcome::Failure => 1,
        }
    }
}

/// Outcome plus every error line that was logged
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub outcome: ProbeOutcome,
    pub errors: Vec<String>,
}

/// Probe over one rustls crypto provider
#[derive(Debug, Clone)]
pub struct TlsProbe {
    provider: Arc<CryptoProvider>,
}

impl Default for TlsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsProbe {
    /// Probe the ring-backed provider
    pub fn new() -> Self {
        Self::with_provider(rustls::crypto::ring::default_provider())
    }

    /// Probe a specific provider
    pub fn with_provider(provider: CryptoProvider) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Build a client configuration with no trust anchors
    pub fn client_config(&self) -> Result<Arc<ClientConfig>, rustls::Error> {
        let config = ClientConfig::builder_with_provider(Arc::clone(&self.provider))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(RootCertStore::empty())
            .with_no_client_auth();
        Ok(Arc::new(config))
    }

    /// Run the probe, logging progress and every error in the chain
    pub fn run(&self) -> ProbeReport {
        log::info!(
            target: PROBE_LOG_TARGET,
            "TLS provider initialized ({} cipher suites, {} key exchange groups)",
            self.provider.cipher_suites.len(),
            self.provider.kx_groups.len()
        );

        match self.client_config() {
            Ok(_) => {
                log::info!(target: PROBE_LOG_TARGET, "TLS client configuration created successfully");
                ProbeReport {
                    outcome: ProbeOutcome::Success,
                    errors: Vec::new(),
                }
            }
            Err(err) => {
                let errors = error_chain(&err);
                for line in &errors {
                    log::error!(target: PROBE_LOG_TARGET, "{}", line);
                }
                ProbeReport {
                    outcome: ProbeOutcome::Failure,
                    errors,
                }
            }
        }
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = Some(err);
    while let Some(e) = current {
        lines.push(e.to_string());
        current = e.source();
    }
    lines
}
