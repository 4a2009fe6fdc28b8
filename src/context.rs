//! Tracer context: ownership root for the registry and its collaborators.
//!
//! One `TraceContext` is built at startup with the host's symbol and hook
//! backends, passed by reference to every operation, and torn down at
//! shutdown; nothing lives in module globals.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use axerrno::LinuxResult;

use crate::control::{self, EnableFile, ListFile};
use crate::error::Error;
use crate::fs::TraceDir;
use crate::hook::HookOps;
use crate::registry::{ProbeRef, ProbeRegistry};
use crate::symbols::SymbolResolver;

/// Name of the control directory.
pub const DIR_NAME: &str = "lktrace";
/// Name of the probe list/registration file.
pub const LIST_FILE: &str = "list";
/// Name of the enable-flag file.
pub const ENABLE_FILE: &str = "enable";

/// Everything one tracer instance owns.
pub struct TraceContext {
    registry: ProbeRegistry,
    symbols: Arc<dyn SymbolResolver>,
    hooks: Arc<dyn HookOps>,
    enabled: AtomicBool,
}

impl TraceContext {
    /// Build a context around the host's resolution and hook backends.
    /// Tracing starts disabled.
    pub fn new(symbols: Arc<dyn SymbolResolver>, hooks: Arc<dyn HookOps>) -> Self {
        Self {
            registry: ProbeRegistry::new(),
            symbols,
            hooks,
            enabled: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    pub fn symbols(&self) -> &dyn SymbolResolver {
        &*self.symbols
    }

    pub fn hooks(&self) -> &dyn HookOps {
        &*self.hooks
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(
            "lktrace: tracing {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Parse and execute one registration command.
    pub fn register_probe(&self, line: &str) -> Result<ProbeRef, Error> {
        control::register_probe(self, line)
    }

    /// Unregister every probe and unlink the registry.
    ///
    /// Idempotent; also runs on drop. Entries referenced by live report
    /// sessions stay readable until those sessions close.
    pub fn teardown(&self) -> usize {
        self.registry.teardown(self.hooks())
    }
}

impl Drop for TraceContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Build the control directory: `lktrace/list` and `lktrace/enable`.
pub fn mount(ctx: &Arc<TraceContext>) -> LinuxResult<TraceDir> {
    let dir = TraceDir::new(DIR_NAME);
    dir.create_control_file(LIST_FILE, Arc::new(ListFile::new(Arc::clone(ctx))))?;
    dir.create_control_file(ENABLE_FILE, Arc::new(EnableFile::new(Arc::clone(ctx))))?;
    info!("lktrace: mounted control directory {}", dir.name());
    Ok(dir)
}
