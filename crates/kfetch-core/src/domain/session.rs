//! Session exclusivity and the shared info mask
//!
//! A [`SessionManager`] is created once per channel and lives as long as it.
//! It hands out at most one [`SessionHandle`] at a time and holds the mask
//! every future read will use. The mask is shared state: whichever session
//! wrote it last decides what every later reader sees.

use std::sync::{
    atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

use super::errors::KfetchError;
use super::info::InfoMask;

/// Size of a mask as written by a client
pub const MASK_WIRE_LEN: usize = std::mem::size_of::<i32>();

/// Exclusivity permit plus the process-wide mask.
///
/// ## Concurrency
///
/// - Exclusivity is a single-permit semaphore taken with `try_acquire`, so
///   `acquire` never waits: it either wins or fails with [`KfetchError::Busy`].
/// - The mask is only ever replaced wholesale. Stores use `Release` and loads
///   use `Acquire`, so a write that returns before a read starts is seen by
///   that read.
#[derive(Debug)]
pub struct SessionManager {
    /// Single permit guarding the channel
    permit: Arc<Semaphore>,
    /// Currently configured mask, stored raw
    mask: AtomicI32,
    /// Live sessions; the channel must not be torn down while non-zero
    active: AtomicUsize,
    /// Source of session ids for log correlation
    next_id: AtomicU64,
    /// Reject masks with unknown bits instead of ignoring them
    strict: bool,
}

impl SessionManager {
    /// Creates a manager with the channel free and `initial_mask` configured
    pub fn new(initial_mask: InfoMask, strict: bool) -> Arc<Self> {
        Arc::new(Self {
            permit: Arc::new(Semaphore::new(1)),
            mask: AtomicI32::new(initial_mask.raw()),
            active: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            strict,
        })
    }

    /// Takes exclusive hold of the channel.
    ///
    /// # Errors
    ///
    /// Returns [`KfetchError::Busy`] if another session is open. No state
    /// changes in that case.
    pub fn acquire(self: &Arc<Self>) -> Result<SessionHandle, KfetchError> {
        let permit = Arc::clone(&self.permit)
            .try_acquire_owned()
            .map_err(|_| KfetchError::Busy)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(session = id, active, "Session acquired");

        Ok(SessionHandle {
            id,
            manager: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Ends a session. Equivalent to dropping the handle.
    ///
    /// The handle always frees the manager that issued it, even when passed
    /// to a different one.
    pub fn release(&self, handle: SessionHandle) {
        drop(handle);
    }

    /// Replaces the mask with the 4-byte native-endian integer in `bytes`.
    ///
    /// # Errors
    ///
    /// - [`KfetchError::Fault`] if `bytes` is not exactly [`MASK_WIRE_LEN`]
    ///   bytes long
    /// - [`KfetchError::InvalidMask`] in strict mode, if unknown bits are set
    ///
    /// The stored mask is unchanged on error.
    pub fn configure(&self, bytes: &[u8]) -> Result<InfoMask, KfetchError> {
        let raw: [u8; MASK_WIRE_LEN] = bytes.try_into().map_err(|_| {
            KfetchError::Fault(format!(
                "mask must be {} bytes, got {}",
                MASK_WIRE_LEN,
                bytes.len()
            ))
        })?;
        self.set_mask(InfoMask::from_raw(i32::from_ne_bytes(raw)))
    }

    /// Replaces the mask with an already decoded value
    pub fn set_mask(&self, mask: InfoMask) -> Result<InfoMask, KfetchError> {
        if self.strict && mask.unknown_bits() != 0 {
            return Err(KfetchError::InvalidMask(mask.raw()));
        }
        self.mask.store(mask.raw(), Ordering::Release);
        info!(mask = %mask, fields = mask.len(), "Info mask configured");
        Ok(mask)
    }

    /// Snapshot of the current mask
    pub fn mask(&self) -> InfoMask {
        InfoMask::from_raw(self.mask.load(Ordering::Acquire))
    }

    /// Number of sessions currently open (0 or 1)
    pub fn ref_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns true while a session holds the channel
    pub fn is_held(&self) -> bool {
        self.permit.available_permits() == 0
    }

    /// Whether unknown mask bits are rejected
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// Proof of exclusive access to the channel.
///
/// Dropping the handle ends the session and frees the channel for the next
/// opener.
#[derive(Debug)]
pub struct SessionHandle {
    id: u64,
    manager: Arc<SessionManager>,
    _permit: OwnedSemaphorePermit,
}

impl SessionHandle {
    /// Id of this session, unique for the manager's lifetime
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns true if this handle was issued by `manager`
    pub fn belongs_to(&self, manager: &SessionManager) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.manager), manager)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        let active = self.manager.active.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(session = self.id, active, "Session released");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::domain::info::InfoFlag;

    #[test]
    fn test_second_acquire_is_busy() {
        let manager = SessionManager::new(InfoMask::FULL, false);
        let first = manager.acquire().unwrap();

        assert!(manager.is_held());
        assert_eq!(manager.acquire().unwrap_err(), KfetchError::Busy);
        assert_eq!(manager.ref_count(), 1);

        manager.release(first);
        assert!(!manager.is_held());
        assert_eq!(manager.ref_count(), 0);

        let again = manager.acquire().unwrap();
        assert_eq!(manager.ref_count(), 1);
        drop(again);
        assert_eq!(manager.ref_count(), 0);
    }

    #[test]
    fn test_session_ids_increase() {
        let manager = SessionManager::new(InfoMask::FULL, false);
        let a = manager.acquire().unwrap().id();
        let b = manager.acquire().unwrap().id();
        assert!(b > a);
    }

    #[test]
    fn test_concurrent_acquire_admits_exactly_one() {
        const THREADS: usize = 16;
        let manager = SessionManager::new(InfoMask::FULL, false);
        let barrier = Arc::new(Barrier::new(THREADS));
        let release = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let barrier = Arc::clone(&barrier);
                let release = Arc::clone(&release);
                thread::spawn(move || {
                    barrier.wait();
                    let result = manager.acquire();
                    // Hold any winning handle until every thread has tried.
                    release.wait();
                    result.is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(manager.ref_count(), 0);
    }

    #[test]
    fn test_configure_decodes_native_endian_i32() {
        let manager = SessionManager::new(InfoMask::FULL, false);
        let mask = manager.configure(&9i32.to_ne_bytes()).unwrap();
        assert_eq!(mask.raw(), 9);
        assert_eq!(manager.mask().raw(), 9);
        assert!(manager.mask().contains(InfoFlag::Release));
        assert!(manager.mask().contains(InfoFlag::Mem));
    }

    #[test]
    fn test_configure_rejects_wrong_length() {
        let manager = SessionManager::new(InfoMask::FULL, false);
        for bad in [&[][..], &[1, 0, 0][..], &[1, 0, 0, 0, 0][..]] {
            let err = manager.configure(bad).unwrap_err();
            assert!(matches!(err, KfetchError::Fault(_)));
        }
        assert_eq!(manager.mask(), InfoMask::FULL);
    }

    #[test]
    fn test_permissive_mode_accepts_any_integer() {
        let manager = SessionManager::new(InfoMask::FULL, false);
        manager.configure(&(-1i32).to_ne_bytes()).unwrap();
        assert_eq!(manager.mask().raw(), -1);
        manager.configure(&0x100i32.to_ne_bytes()).unwrap();
        assert!(manager.mask().is_empty());
    }

    #[test]
    fn test_strict_mode_rejects_unknown_bits() {
        let manager = SessionManager::new(InfoMask::FULL, true);
        let err = manager.configure(&0x41i32.to_ne_bytes()).unwrap_err();
        assert_eq!(err, KfetchError::InvalidMask(0x41));
        assert_eq!(manager.mask(), InfoMask::FULL);

        manager.configure(&1i32.to_ne_bytes()).unwrap();
        assert_eq!(manager.mask().raw(), 1);
    }

    #[test]
    fn test_handle_knows_its_manager() {
        let a = SessionManager::new(InfoMask::FULL, false);
        let b = SessionManager::new(InfoMask::FULL, false);
        let handle = a.acquire().unwrap();
        assert!(handle.belongs_to(&a));
        assert!(!handle.belongs_to(&b));

        b.release(handle);
        assert!(!a.is_held());
        assert_eq!(a.ref_count(), 0);
    }
}
