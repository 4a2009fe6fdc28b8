//! Instrumentation hook installation service.
//!
//! The analogue of kprobe registration: install a hook at an address so a
//! callback runs before the original code, and get back an opaque handle
//! for later removal. The backend sits behind [`HookOps`] so the registry
//! never touches code patching itself; [`HookTable`] is a bookkeeping
//! implementation for hosts and tests.

use alloc::collections::BTreeMap;
use core::num::NonZeroU64;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

/// Identifier of one live, installed hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(NonZeroU64);

impl HookHandle {
    /// Wrap a raw backend id; zero is reserved for "no hook".
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

/// Error types for hook installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookError {
    /// Install address is not a patchable location.
    BadAddress,
    /// Another hook already owns this address.
    AlreadyInstalled,
    /// Backend could not allocate the hook.
    OutOfMemory,
}

impl core::fmt::Display for HookError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BadAddress => write!(f, "address is not patchable"),
            Self::AlreadyInstalled => write!(f, "address already hooked"),
            Self::OutOfMemory => write!(f, "backend allocation failed"),
        }
    }
}

impl core::error::Error for HookError {}

/// Hook install/uninstall backend.
pub trait HookOps: Send + Sync {
    /// Install a hook at `addr` firing `callback` before the original code.
    fn install(&self, addr: u64, callback: u64) -> Result<HookHandle, HookError>;

    /// Remove a previously installed hook. Unknown handles are tolerated.
    fn uninstall(&self, handle: HookHandle);
}

/// A hook currently installed through a [`HookTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstalledHook {
    pub addr: u64,
    pub callback: u64,
}

/// Bookkeeping backend tracking live hooks by handle.
///
/// Rejects a second installation at an already-hooked address, the same
/// refusal a real probe layer gives.
#[derive(Debug)]
pub struct HookTable {
    next_id: AtomicU64,
    live: Mutex<BTreeMap<u64, InstalledHook>>,
}

impl HookTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            live: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of hooks currently installed.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Look up a live hook by handle.
    pub fn get(&self, handle: HookHandle) -> Option<InstalledHook> {
        self.live.lock().get(&handle.raw()).copied()
    }

    /// Look up a live hook by install address.
    pub fn installed_at(&self, addr: u64) -> Option<InstalledHook> {
        self.live.lock().values().find(|hook| hook.addr == addr).copied()
    }
}

impl Default for HookTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HookOps for HookTable {
    fn install(&self, addr: u64, callback: u64) -> Result<HookHandle, HookError> {
        if addr == 0 {
            return Err(HookError::BadAddress);
        }

        let mut live = self.live.lock();
        if live.values().any(|hook| hook.addr == addr) {
            return Err(HookError::AlreadyInstalled);
        }

        let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
        // Id space wrapped all the way around to zero.
        let Some(handle) = HookHandle::new(raw) else {
            return Err(HookError::OutOfMemory);
        };

        live.insert(raw, InstalledHook { addr, callback });
        log::debug!("hook: installed #{} at {:#x} -> {:#x}", raw, addr, callback);
        Ok(handle)
    }

    fn uninstall(&self, handle: HookHandle) {
        if self.live.lock().remove(&handle.raw()).is_some() {
            log::debug!("hook: uninstalled #{}", handle.raw());
        } else {
            log::warn!("hook: uninstall of unknown handle #{}", handle.raw());
        }
    }
}
