//! Control-file presentation layer.
//!
//! An in-memory stand-in for the pseudo-filesystem the tracer originally
//! lived in: a directory of named control files, each backed by a
//! [`FileOps`] table that opens per-session [`OpenFile`] state. Reads copy
//! into caller-owned memory through [`UserBuf`], whose writes can fault
//! like a user-space copy.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use axerrno::{LinuxError, LinuxResult};
use spin::Mutex;

/// A copy into the caller's buffer faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFault;

/// Destination buffer for a control-file read.
///
/// Bounded capacity, fallible writes; the receiving memory belongs to the
/// caller and may fault under the copy.
pub trait UserBuf {
    /// Total capacity in bytes.
    fn capacity(&self) -> usize;

    /// Copy `src` into the buffer starting at `offset`.
    fn copy_out(&mut self, offset: usize, src: &[u8]) -> Result<(), TransferFault>;
}

impl UserBuf for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_out(&mut self, offset: usize, src: &[u8]) -> Result<(), TransferFault> {
        let end = offset.checked_add(src.len()).ok_or(TransferFault)?;
        let dst = self.get_mut(offset..end).ok_or(TransferFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserBuf for &mut [u8] {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn copy_out(&mut self, offset: usize, src: &[u8]) -> Result<(), TransferFault> {
        (**self).copy_out(offset, src)
    }
}

/// Per-open session of a control file.
pub trait OpenFile: Send {
    /// Read into `buf`. `Ok(0)` signals end of data.
    fn read(&mut self, buf: &mut dyn UserBuf) -> LinuxResult<usize>;

    /// Accept a command or state update. Returns the bytes accepted.
    fn write(&mut self, data: &[u8]) -> LinuxResult<usize>;

    /// Session teardown; runs once when the descriptor closes.
    fn release(&mut self) {}
}

/// Per-file callback table, the `file_operations` analogue.
pub trait FileOps: Send + Sync {
    /// Start a new session on this file.
    fn open(&self) -> LinuxResult<Box<dyn OpenFile>>;
}

/// Open descriptor handed back by [`TraceDir::open`].
pub struct FileDesc {
    session: Box<dyn OpenFile>,
}

impl core::fmt::Debug for FileDesc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileDesc").finish_non_exhaustive()
    }
}

impl FileDesc {
    pub fn read(&mut self, buf: &mut [u8]) -> LinuxResult<usize> {
        let mut view: &mut [u8] = buf;
        self.session.read(&mut view)
    }

    pub fn write(&mut self, data: &[u8]) -> LinuxResult<usize> {
        self.session.write(data)
    }
}

impl Drop for FileDesc {
    fn drop(&mut self) {
        self.session.release();
    }
}

/// Directory of control files.
pub struct TraceDir {
    name: String,
    files: Mutex<BTreeMap<String, Arc<dyn FileOps>>>,
}

impl TraceDir {
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            files: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a control file under `name`.
    ///
    /// The name doubles as the removal handle for [`TraceDir::remove`].
    pub fn create_control_file(&self, name: &str, ops: Arc<dyn FileOps>) -> LinuxResult<()> {
        let mut files = self.files.lock();
        if files.contains_key(name) {
            return Err(LinuxError::EEXIST);
        }
        files.insert(String::from(name), ops);
        log::debug!("fs: created {}/{}", self.name, name);
        Ok(())
    }

    /// Drop a control file. Open descriptors stay usable until closed.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.files.lock().remove(name).is_some();
        if removed {
            log::debug!("fs: removed {}/{}", self.name, name);
        }
        removed
    }

    /// Open a session on the named control file.
    pub fn open(&self, name: &str) -> LinuxResult<FileDesc> {
        let ops = self
            .files
            .lock()
            .get(name)
            .cloned()
            .ok_or(LinuxError::ENOENT)?;
        Ok(FileDesc {
            session: ops.open()?,
        })
    }

    /// Names of the registered control files, in order.
    pub fn entries(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }
}
