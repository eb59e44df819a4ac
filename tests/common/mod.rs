// Instrumented doubles shared by the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use log::{Level, LevelFilter, Metadata, Record};
use pqc_keybridge::sizes::KemLengths;
use pqc_keybridge::{
    BoundarySink, BufferAllocator, Error, KemAlgorithm, KemInstance, KemProvider, KeyRole,
    PqcleanProvider, Result, SharedSecret, SystemAllocator,
};

/// Byte written into every secret key by marker instances
pub const SECRET_MARKER: u8 = 0xA5;
/// Byte written into every public key by marker instances
pub const PUBLIC_MARKER: u8 = 0x11;

/// Allocator that counts live buffers and can refuse one role
#[derive(Default)]
pub struct CountingAllocator {
    live: AtomicIsize,
    allocations: AtomicUsize,
    dirty_releases: AtomicUsize,
    released: Mutex<Vec<KeyRole>>,
    fail_on: Option<KeyRole>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(role: KeyRole) -> Self {
        Self {
            fail_on: Some(role),
            ..Self::default()
        }
    }

    pub fn live(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Buffers that still held non-zero bytes when released
    pub fn dirty_releases(&self) -> usize {
        self.dirty_releases.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> Vec<KeyRole> {
        self.released.lock().unwrap().clone()
    }
}

impl BufferAllocator for CountingAllocator {
    fn allocate(&self, role: KeyRole, len: usize) -> Result<Vec<u8>> {
        if self.fail_on == Some(role) {
            return Err(Error::Allocation { role, len });
        }
        let storage = SystemAllocator.allocate(role, len)?;
        self.live.fetch_add(1, Ordering::SeqCst);
        self.allocations.fetch_add(1, Ordering::SeqCst);
        Ok(storage)
    }

    fn release(&self, role: KeyRole, storage: &[u8]) {
        if storage.iter().any(|&b| b != 0) {
            self.dirty_releases.fetch_add(1, Ordering::SeqCst);
        }
        self.released.lock().unwrap().push(role);
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Where a `CountingProvider` injects its failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Instantiate,
    Keypair,
    /// `keypair` writes secret material and then panics
    Panic,
}

/// PQClean provider that counts live instances and can inject faults
pub struct CountingProvider {
    live: Arc<AtomicIsize>,
    created: AtomicUsize,
    fault: Fault,
    markers: bool,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self::with_fault(Fault::None)
    }

    pub fn with_fault(fault: Fault) -> Self {
        Self {
            live: Arc::new(AtomicIsize::new(0)),
            created: AtomicUsize::new(0),
            fault,
            markers: false,
        }
    }

    /// Instances fill keys with `PUBLIC_MARKER` / `SECRET_MARKER` instead of generating
    pub fn with_markers() -> Self {
        Self {
            markers: true,
            ..Self::new()
        }
    }

    pub fn live(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl KemProvider for CountingProvider {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn instantiate(&self, algorithm: KemAlgorithm) -> Result<Box<dyn KemInstance>> {
        if self.fault == Fault::Instantiate {
            return Err(Error::Initialization {
                algorithm,
                reason: "injected".into(),
            });
        }
        let inner = PqcleanProvider.instantiate(algorithm)?;
        self.live.fetch_add(1, Ordering::SeqCst);
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountedInstance {
            inner,
            live: Arc::clone(&self.live),
            fail_keypair: self.fault == Fault::Keypair,
            panic_keypair: self.fault == Fault::Panic,
            markers: self.markers,
        }))
    }
}

struct CountedInstance {
    inner: Box<dyn KemInstance>,
    live: Arc<AtomicIsize>,
    fail_keypair: bool,
    panic_keypair: bool,
    markers: bool,
}

impl KemInstance for CountedInstance {
    fn algorithm(&self) -> KemAlgorithm {
        self.inner.algorithm()
    }

    fn lengths(&self) -> KemLengths {
        self.inner.lengths()
    }

    fn keypair(&self, public_key: &mut [u8], secret_key: &mut [u8]) -> Result<()> {
        if self.fail_keypair {
            // Leave partial secret material behind, as a failed draw could
            let half = secret_key.len() / 2;
            secret_key[..half].fill(SECRET_MARKER);
            return Err(Error::Generation {
                algorithm: self.algorithm(),
                reason: "injected entropy failure".into(),
            });
        }
        if self.panic_keypair {
            secret_key.fill(SECRET_MARKER);
            panic!("injected provider panic");
        }
        if self.markers {
            public_key.fill(PUBLIC_MARKER);
            secret_key.fill(SECRET_MARKER);
            return Ok(());
        }
        self.inner.keypair(public_key, secret_key)
    }

    fn encapsulate(&self, public_key: &[u8]) -> Result<(SharedSecret, Vec<u8>)> {
        self.inner.encapsulate(public_key)
    }

    fn decapsulate(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<SharedSecret> {
        self.inner.decapsulate(ciphertext, secret_key)
    }
}

impl Drop for CountedInstance {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sink that always refuses to allocate the caller's container
pub struct RefusingSink;

impl BoundarySink for RefusingSink {
    type Output = Vec<u8>;

    fn marshal(self, public_key: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Marshal(format!(
            "injected: no room for {} bytes",
            public_key.len()
        )))
    }
}

/// One captured log record
#[derive(Debug, Clone)]
pub struct Captured {
    pub level: Level,
    pub target: String,
    pub message: String,
}

struct CaptureLogger;

static RECORDS: Mutex<Vec<Captured>> = Mutex::new(Vec::new());
static LOGGER: CaptureLogger = CaptureLogger;
static INSTALL: Once = Once::new();

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.lock().unwrap().push(Captured {
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        });
    }

    fn flush(&self) {}
}

/// Route every log record of this test binary into memory
pub fn capture_logs() {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).expect("a logger was installed before capture_logs");
        log::set_max_level(LevelFilter::Trace);
    });
}

pub fn captured() -> Vec<Captured> {
    RECORDS.lock().unwrap().clone()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
