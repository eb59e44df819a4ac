/*!
Fixed-length key buffers.

A [`KeyBuffer`]:
- Is allocated through a fallible [`BufferAllocator`], so running out of
  memory is an error value rather than an abort
- Is locked into RAM on Unix when it holds secret material and locking was
  requested
- Is zeroed, unlocked and handed back to its allocator when dropped, on
  every exit path
*/

use std::fmt;
use std::ops::{Deref, DerefMut};

use zeroize::Zeroize;

use crate::constants::GENERATOR_LOG_TARGET;
use crate::error::{Error, Result};

/// What a key buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Public key, copied across the boundary
    Public,
    /// Secret key, never leaves the generator
    Secret,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Public => f.write_str("public"),
            KeyRole::Secret => f.write_str("secret"),
        }
    }
}

/// Source of key buffer storage.
///
/// `allocate` must return zero-filled storage of exactly `len` bytes or
/// an error. `release` sees the storage after it has been zeroed, just
/// before it is freed.
pub trait BufferAllocator: Send + Sync {
    /// Allocate `len` bytes for a buffer of the given role
    fn allocate(&self, role: KeyRole, len: usize) -> Result<Vec<u8>>;

    /// Called once per allocated buffer when it is released
    fn release(&self, _role: KeyRole, _storage: &[u8]) {}
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for &A {
    fn allocate(&self, role: KeyRole, len: usize) -> Result<Vec<u8>> {
        (**self).allocate(role, len)
    }

    fn release(&self, role: KeyRole, storage: &[u8]) {
        (**self).release(role, storage)
    }
}

/// Heap allocator that reports failure instead of aborting
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl BufferAllocator for SystemAllocator {
    fn allocate(&self, role: KeyRole, len: usize) -> Result<Vec<u8>> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation { role, len })?;
        storage.resize(len, 0);
        Ok(storage)
    }
}

/// Zeroizing, fixed-length key storage tied to its allocator
pub struct KeyBuffer<'a> {
    storage: Vec<u8>,
    role: KeyRole,
    locked: bool,
    allocator: &'a dyn BufferAllocator,
}

impl<'a> KeyBuffer<'a> {
    /// Allocate a buffer of exactly `len` bytes.
    ///
    /// With `lock` set the storage is `mlock`ed on Unix; failure to lock is
    /// logged and otherwise ignored.
    pub fn allocate(
        allocator: &'a dyn BufferAllocator,
        role: KeyRole,
        len: usize,
        lock: bool,
    ) -> Result<Self> {
        let storage = allocator.allocate(role, len)?;
        let mut buffer = Self {
            storage,
            role,
            locked: false,
            allocator,
        };

        // Dropping `buffer` here still returns the storage to the allocator.
        if buffer.storage.len() != len {
            return Err(Error::Allocation { role, len });
        }

        if lock {
            buffer.locked = lock_memory(&buffer.storage);
        }
        Ok(buffer)
    }

    /// Role of this buffer
    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// Whether the storage is locked into RAM
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Buffer contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }
}

impl Deref for KeyBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}

impl DerefMut for KeyBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.storage
    }
}

impl Drop for KeyBuffer<'_> {
    fn drop(&mut self) {
        // Zero in place; zeroizing the Vec itself would also truncate it.
        self.storage.as_mut_slice().zeroize();

        if self.locked {
            unlock_memory(&self.storage);
        }

        self.allocator.release(self.role, &self.storage);
    }
}

impl fmt::Debug for KeyBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBuffer")
            .field("role", &self.role)
            .field("len", &self.storage.len())
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
fn lock_memory(storage: &[u8]) -> bool {
    if storage.is_empty() {
        return false;
    }
    match page_lock::lock(storage) {
        Ok(()) => true,
        Err(err) => {
            // Non-fatal: RLIMIT_MEMLOCK is often tiny for unprivileged processes
            log::debug!(
                target: GENERATOR_LOG_TARGET,
                "mlock of {} bytes failed ({}), continuing with unlocked memory",
                storage.len(),
                err
            );
            false
        }
    }
}

#[cfg(unix)]
fn unlock_memory(storage: &[u8]) {
    if !storage.is_empty() {
        page_lock::unlock(storage);
    }
}

/// Page-granular lock counting.
///
/// `mlock` works on whole pages and does not nest, so two small buffers on
/// one page would otherwise unlock each other. A page is locked when its
/// first user arrives and unlocked when its last user leaves.
#[cfg(unix)]
mod page_lock {
    use std::collections::BTreeMap;
    use std::io;
    use std::sync::{Mutex, OnceLock, PoisonError};

    static LOCKED_PAGES: Mutex<BTreeMap<usize, usize>> = Mutex::new(BTreeMap::new());

    fn page_size() -> usize {
        static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
        *PAGE_SIZE.get_or_init(|| {
            let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            if size > 0 { size as usize } else { 4096 }
        })
    }

    /// Start addresses of every page `storage` touches
    fn pages(storage: &[u8]) -> impl Iterator<Item = usize> {
        let page = page_size();
        let start = storage.as_ptr() as usize;
        let end = start + storage.len();
        (start & !(page - 1)..end).step_by(page)
    }

    fn release_page(locked: &mut BTreeMap<usize, usize>, page: usize) {
        match locked.get_mut(&page) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                locked.remove(&page);
                unsafe {
                    libc::munlock(page as *const libc::c_void, page_size());
                }
            }
            None => {}
        }
    }

    pub(super) fn lock(storage: &[u8]) -> io::Result<()> {
        let mut locked = LOCKED_PAGES.lock().unwrap_or_else(PoisonError::into_inner);
        let mut acquired = Vec::new();

        for page in pages(storage) {
            let count = locked.get(&page).copied().unwrap_or(0);
            if count == 0 {
                let result = unsafe { libc::mlock(page as *const libc::c_void, page_size()) };
                if result != 0 {
                    let err = io::Error::last_os_error();
                    for page in acquired {
                        release_page(&mut locked, page);
                    }
                    return Err(err);
                }
            }
            locked.insert(page, count + 1);
            acquired.push(page);
        }
        Ok(())
    }

    pub(super) fn unlock(storage: &[u8]) {
        let mut locked = LOCKED_PAGES.lock().unwrap_or_else(PoisonError::into_inner);
        for page in pages(storage) {
            release_page(&mut locked, page);
        }
    }

    /// Number of live locks held on the page containing `addr`
    #[cfg(test)]
    pub(super) fn users(addr: *const u8) -> usize {
        let page = addr as usize & !(page_size() - 1);
        let locked = LOCKED_PAGES.lock().unwrap_or_else(PoisonError::into_inner);
        locked.get(&page).copied().unwrap_or(0)
    }
}

#[cfg(not(unix))]
fn lock_memory(_storage: &[u8]) -> bool {
    false
}

#[cfg(not(unix))]
fn unlock_memory(_storage: &[u8]) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        released: Mutex<Vec<(KeyRole, Vec<u8>)>>,
    }

    impl BufferAllocator for Recording {
        fn allocate(&self, role: KeyRole, len: usize) -> Result<Vec<u8>> {
            SystemAllocator.allocate(role, len)
        }

        fn release(&self, role: KeyRole, storage: &[u8]) {
            self.released.lock().unwrap().push((role, storage.to_vec()));
        }
    }

    #[test]
    fn test_buffer_is_zeroed_before_release() {
        let allocator = Recording::default();
        {
            let mut buffer = KeyBuffer::allocate(&allocator, KeyRole::Secret, 64, false).unwrap();
            buffer.fill(0xA5);
            assert_eq!(buffer[0], 0xA5);
            assert_eq!(buffer.len(), 64);
        }

        let released = allocator.released.lock().unwrap();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].0, KeyRole::Secret);
        assert_eq!(released[0].1.len(), 64);
        assert!(released[0].1.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_locking_is_best_effort() {
        let buffer = KeyBuffer::allocate(&SystemAllocator, KeyRole::Secret, 32, true).unwrap();
        // Either outcome is valid; the buffer must be usable regardless.
        let _ = buffer.is_locked();
        assert_eq!(buffer.as_bytes(), &[0u8; 32]);
    }

    #[cfg(unix)]
    #[test]
    fn test_shared_page_stays_locked_until_last_user() {
        // Two ranges that overlap share at least one page
        let storage = vec![0u8; 256];
        let first = &storage[..128];
        let second = &storage[64..192];
        let shared = storage[100..].as_ptr();

        if !lock_memory(first) {
            return;
        }
        if !lock_memory(second) {
            unlock_memory(first);
            return;
        }
        assert!(page_lock::users(shared) >= 2);

        unlock_memory(first);
        assert!(page_lock::users(shared) >= 1);

        unlock_memory(second);
    }

    #[cfg(unix)]
    #[test]
    fn test_neighbour_drop_keeps_secret_locked() {
        let first = KeyBuffer::allocate(&SystemAllocator, KeyRole::Secret, 64, true).unwrap();
        let second = KeyBuffer::allocate(&SystemAllocator, KeyRole::Secret, 64, true).unwrap();
        let second_start = second.as_bytes().as_ptr();
        let second_end = second.as_bytes()[63..].as_ptr();

        drop(first);

        if second.is_locked() {
            assert!(page_lock::users(second_start) >= 1);
            assert!(page_lock::users(second_end) >= 1);
        }
    }

    #[test]
    fn test_short_storage_is_rejected_and_released() {
        struct Short(Recording);
        impl BufferAllocator for Short {
            fn allocate(&self, _role: KeyRole, len: usize) -> Result<Vec<u8>> {
                Ok(vec![0u8; len / 2])
            }
            fn release(&self, role: KeyRole, storage: &[u8]) {
                self.0.release(role, storage)
            }
        }

        let allocator = Short(Recording::default());
        let err = KeyBuffer::allocate(&allocator, KeyRole::Public, 800, false).unwrap_err();
        assert!(matches!(err, Error::Allocation { role: KeyRole::Public, len: 800 }));
        assert_eq!(allocator.0.released.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_system_allocator_reports_impossible_sizes() {
        let err = SystemAllocator.allocate(KeyRole::Public, usize::MAX).unwrap_err();
        assert!(matches!(err, Error::Allocation { role: KeyRole::Public, .. }));
    }

    #[test]
    fn test_debug_never_prints_contents() {
        let mut buffer = KeyBuffer::allocate(&SystemAllocator, KeyRole::Secret, 4, false).unwrap();
        buffer.copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let rendered = format!("{:?}", buffer);
        assert!(rendered.contains("Secret"));
        assert!(!rendered.contains("222"));
        assert!(!rendered.contains("173"));
        assert!(!rendered.contains('['));
    }
}
