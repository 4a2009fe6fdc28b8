//! Probe entry records.
//!
//! One entry describes one installed instrumentation point: the target
//! symbol, the byte offset applied to its base address, and the callback
//! that runs before the patched code. Entries are built only after symbol
//! resolution and hook installation have both succeeded, and are never
//! mutated once published to the registry.

use alloc::string::String;

use crate::hook::HookHandle;

/// Longest accepted symbol name, in bytes. Longer names are truncated.
pub const SYMBOL_NAME_MAXLEN: usize = 31;

/// Upper bound on one rendered report line.
pub const REPORT_LINE_MAXLEN: usize = 512;

/// One installed instrumentation point.
#[derive(Debug, Clone)]
pub struct ProbeEntry {
    target: String,
    offset: i64,
    callback: String,
    hook: Option<HookHandle>,
}

impl ProbeEntry {
    /// Build an entry. Symbol names are clamped to [`SYMBOL_NAME_MAXLEN`].
    pub fn new(target: &str, offset: i64, callback: &str, hook: Option<HookHandle>) -> Self {
        Self {
            target: bounded_name(target),
            offset,
            callback: bounded_name(callback),
            hook,
        }
    }

    /// Name of the instrumented function.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Byte offset from the target's base address.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Name of the pre-execution handler.
    pub fn callback(&self) -> &str {
        &self.callback
    }

    /// Handle of the live hook, present while the probe is installed.
    pub fn hook(&self) -> Option<HookHandle> {
        self.hook
    }
}

/// Clamp a symbol name to [`SYMBOL_NAME_MAXLEN`] bytes, on a char boundary.
pub(crate) fn bounded_name(name: &str) -> String {
    if name.len() <= SYMBOL_NAME_MAXLEN {
        return String::from(name);
    }
    let mut end = SYMBOL_NAME_MAXLEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    String::from(&name[..end])
}
