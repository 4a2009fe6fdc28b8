//! Dynamic function-probe tracer.
//!
//! This crate reimplements a debugfs-style kprobe tracer as a library: a
//! concurrent registry of named instrumentation points driven through a
//! control-plane file. Writing `"<target> <hex-offset> <callback>"` to the
//! `list` file resolves both symbols, installs a hook at `base + offset`
//! and publishes the probe; reading the file back streams one
//! `"<target>+<offset> <callback>"` line per probe, newest first,
//! paginated across reads.
//!
//! Symbol resolution and code patching stay behind the [`SymbolResolver`]
//! and [`HookOps`] traits so the host decides how addresses are found and
//! hooks are installed.
//!
//! # Quick Start
//!
//! ```ignore
//! use alloc::sync::Arc;
//! use lktrace::{HookTable, SymbolTable, TraceContext, context};
//!
//! let symbols: SymbolTable = [
//!     ("do_sys_open", 0xffff_8000_0001_0000),
//!     ("my_callback", 0xffff_8000_0002_0000),
//! ]
//! .into_iter()
//! .collect();
//!
//! let ctx = Arc::new(TraceContext::new(
//!     Arc::new(symbols),
//!     Arc::new(HookTable::new()),
//! ));
//! let dir = context::mount(&ctx)?;
//!
//! let mut file = dir.open("list")?;
//! file.write(b"do_sys_open 0 my_callback")?;
//!
//! let mut buf = [0u8; 128];
//! let n = file.read(&mut buf[..])?;
//! assert_eq!(&buf[..n], b"do_sys_open+0 my_callback\n");
//! ```

#![no_std]

extern crate alloc;

#[macro_use]
extern crate log;

pub mod context;
pub mod control;
pub mod entry;
pub mod error;
pub mod fs;
pub mod hook;
pub mod registry;
pub mod report;
pub mod symbols;

// Re-export key types for convenience
pub use context::TraceContext;
pub use entry::{ProbeEntry, REPORT_LINE_MAXLEN, SYMBOL_NAME_MAXLEN};
pub use error::Error;
pub use hook::{HookError, HookHandle, HookOps, HookTable};
pub use registry::{ProbeRef, ProbeRegistry, Walk};
pub use report::ReportSession;
pub use symbols::{SymbolResolver, SymbolTable};
