//! Control-plane command handling and control files.
//!
//! The write side parses `"<target> <hex-offset> <callback>"`, resolves
//! both symbols, installs the hook at `base + offset` and only then
//! publishes the entry, so a failure anywhere leaves no trace. The read
//! side streams the registry back, one line per probe, newest first.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use axerrno::{LinuxError, LinuxResult};

use crate::context::TraceContext;
use crate::entry::{ProbeEntry, bounded_name};
use crate::error::Error;
use crate::fs::{FileOps, OpenFile, UserBuf};
use crate::registry::ProbeRef;
use crate::report::ReportSession;

/// A parsed registration command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub target: String,
    pub offset: i64,
    pub callback: String,
}

/// Parse a control-plane line.
///
/// Exactly three whitespace-separated tokens; the offset is hexadecimal
/// with an optional sign and `0x` prefix. Over-length symbol names are
/// truncated, not rejected.
pub fn parse_command(line: &str) -> Result<Command, Error> {
    let mut tokens = line.split_whitespace();
    let (Some(target), Some(offset), Some(callback), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(Error::MalformedCommand);
    };
    let offset = parse_hex_offset(offset).ok_or(Error::MalformedCommand)?;
    Ok(Command {
        target: bounded_name(target),
        offset,
        callback: bounded_name(callback),
    })
}

/// strtoul-flavoured signed hex: optional sign, optional `0x` prefix,
/// magnitude wrapping into the signed range.
fn parse_hex_offset(token: &str) -> Option<i64> {
    let (negative, rest) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    let digits = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .unwrap_or(rest);
    if digits.is_empty() {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, 16).ok()? as i64;
    Some(if negative { magnitude.wrapping_neg() } else { magnitude })
}

/// Execute a registration command against `ctx`.
///
/// Resolution and installation happen before anything is published;
/// every failure aborts with the registry untouched.
pub fn register_probe(ctx: &TraceContext, line: &str) -> Result<ProbeRef, Error> {
    let cmd = parse_command(line)?;

    let base = ctx.symbols().resolve(&cmd.target).ok_or_else(|| {
        error!("lktrace: cannot resolve target {}", cmd.target);
        Error::UnresolvedSymbol(cmd.target.clone())
    })?;
    let handler = ctx.symbols().resolve(&cmd.callback).ok_or_else(|| {
        error!("lktrace: cannot resolve callback {}", cmd.callback);
        Error::UnresolvedSymbol(cmd.callback.clone())
    })?;

    let addr = base.wrapping_add_signed(cmd.offset);
    let hook = ctx.hooks().install(addr, handler).map_err(|err| {
        error!("lktrace: cannot hook {:#x}: {}", addr, err);
        Error::from(err)
    })?;

    info!(
        "lktrace: probe {}+{} at {:#x} -> {}",
        cmd.target, cmd.offset, addr, cmd.callback
    );
    let entry = ProbeEntry::new(&cmd.target, cmd.offset, &cmd.callback, Some(hook));
    Ok(ctx.registry().insert(entry))
}

/// The `list` control file: writes register probes, reads dump them.
pub struct ListFile {
    ctx: Arc<TraceContext>,
}

impl ListFile {
    pub fn new(ctx: Arc<TraceContext>) -> Self {
        Self { ctx }
    }
}

impl FileOps for ListFile {
    fn open(&self) -> LinuxResult<Box<dyn OpenFile>> {
        Ok(Box::new(ListSession {
            report: ReportSession::open(self.ctx.registry()),
            ctx: Arc::clone(&self.ctx),
        }))
    }
}

struct ListSession {
    ctx: Arc<TraceContext>,
    report: ReportSession,
}

impl OpenFile for ListSession {
    fn read(&mut self, buf: &mut dyn UserBuf) -> LinuxResult<usize> {
        self.report.read(buf).map_err(LinuxError::from)
    }

    fn write(&mut self, data: &[u8]) -> LinuxResult<usize> {
        let line = core::str::from_utf8(data).map_err(|_| LinuxError::EINVAL)?;
        self.ctx
            .register_probe(line)
            .map_err(LinuxError::from)?;
        Ok(data.len())
    }
}

/// The `enable` control file: single-byte boolean view of the trace flag.
pub struct EnableFile {
    ctx: Arc<TraceContext>,
}

impl EnableFile {
    pub fn new(ctx: Arc<TraceContext>) -> Self {
        Self { ctx }
    }
}

impl FileOps for EnableFile {
    fn open(&self) -> LinuxResult<Box<dyn OpenFile>> {
        Ok(Box::new(EnableSession {
            ctx: Arc::clone(&self.ctx),
            consumed: false,
        }))
    }
}

struct EnableSession {
    ctx: Arc<TraceContext>,
    consumed: bool,
}

impl OpenFile for EnableSession {
    fn read(&mut self, buf: &mut dyn UserBuf) -> LinuxResult<usize> {
        if self.consumed {
            return Ok(0);
        }
        if buf.capacity() < 1 {
            return Err(LinuxError::ENOMEM);
        }
        let byte = [if self.ctx.is_enabled() { b'1' } else { b'0' }];
        buf.copy_out(0, &byte).map_err(|_| LinuxError::EIO)?;
        self.consumed = true;
        Ok(1)
    }

    fn write(&mut self, data: &[u8]) -> LinuxResult<usize> {
        match data.first() {
            Some(b'0') => self.ctx.set_enabled(false),
            Some(b'1') => self.ctx.set_enabled(true),
            _ => return Err(LinuxError::EINVAL),
        }
        Ok(data.len())
    }
}
