//! Integration tests for the control-file presentation layer.

use std::sync::Arc;

use axerrno::LinuxError;
use lktrace::context::{self, DIR_NAME, ENABLE_FILE, LIST_FILE};
use lktrace::fs::TraceDir;
use lktrace::{HookOps, HookTable, SymbolTable, TraceContext};

fn new_ctx() -> Arc<TraceContext> {
    let symbols: SymbolTable = [
        ("do_sys_open", 0x1000_u64),
        ("my_callback", 0x2000),
    ]
    .into_iter()
    .collect();
    Arc::new(TraceContext::new(
        Arc::new(symbols),
        Arc::new(HookTable::new()) as Arc<dyn HookOps>,
    ))
}

#[test]
fn mount_creates_the_control_files() {
    let ctx = new_ctx();
    let dir = context::mount(&ctx).unwrap();
    assert_eq!(dir.name(), DIR_NAME);
    assert_eq!(dir.entries(), [ENABLE_FILE, LIST_FILE]);
}

#[test]
fn opening_a_missing_file_is_enoent() {
    let ctx = new_ctx();
    let dir = context::mount(&ctx).unwrap();
    assert_eq!(dir.open("nope").unwrap_err(), LinuxError::ENOENT);
}

#[test]
fn duplicate_file_names_are_rejected() {
    let ctx = new_ctx();
    let dir = context::mount(&ctx).unwrap();
    let err = dir
        .create_control_file(LIST_FILE, Arc::new(lktrace::control::ListFile::new(ctx)))
        .unwrap_err();
    assert_eq!(err, LinuxError::EEXIST);
}

#[test]
fn removed_files_stop_opening_but_live_sessions_continue() {
    let ctx = new_ctx();
    let dir = context::mount(&ctx).unwrap();

    let mut open_before = dir.open(LIST_FILE).unwrap();
    assert!(dir.remove(LIST_FILE));
    assert!(!dir.remove(LIST_FILE));
    assert_eq!(dir.open(LIST_FILE).unwrap_err(), LinuxError::ENOENT);

    // The session opened before removal keeps working.
    let cmd = b"do_sys_open 0 my_callback";
    assert_eq!(open_before.write(cmd).unwrap(), cmd.len());
    assert_eq!(ctx.registry().len(), 1);
}

#[test]
fn sessions_on_the_same_file_are_independent() {
    let ctx = new_ctx();
    let dir = context::mount(&ctx).unwrap();

    let mut writer = dir.open(LIST_FILE).unwrap();
    writer.write(b"do_sys_open 0 my_callback").unwrap();

    let mut a = dir.open(LIST_FILE).unwrap();
    let mut b = dir.open(LIST_FILE).unwrap();

    let mut buf = [0u8; 64];
    let n = a.read(&mut buf[..]).unwrap();
    assert_eq!(&buf[..n], b"do_sys_open+0 my_callback\n");
    assert_eq!(a.read(&mut buf[..]).unwrap(), 0);

    // Session `b` has its own cursor.
    let n = b.read(&mut buf[..]).unwrap();
    assert_eq!(&buf[..n], b"do_sys_open+0 my_callback\n");
}

#[test]
fn plain_directories_hold_arbitrary_files() {
    let dir = TraceDir::new("scratch");
    assert!(dir.entries().is_empty());
    assert!(!dir.remove("anything"));
}
