//! Stand-ins for the kernel bindings when building outside a kernel tree.
//!
//! `_printk` does not reach any console here: every record is kept in a
//! per-thread buffer that tests drain with [`take_log`].

use std::{
    cell::RefCell,
    ffi::{c_char, c_int, CStr},
};

use crate::printk::Level;

pub const KERN_EMERG: &[u8; 3] = b"\x010\0";
pub const KERN_ALERT: &[u8; 3] = b"\x011\0";
pub const KERN_CRIT: &[u8; 3] = b"\x012\0";
pub const KERN_ERR: &[u8; 3] = b"\x013\0";
pub const KERN_WARNING: &[u8; 3] = b"\x014\0";
pub const KERN_NOTICE: &[u8; 3] = b"\x015\0";
pub const KERN_INFO: &[u8; 3] = b"\x016\0";
pub const KERN_DEBUG: &[u8; 3] = b"\x017\0";
pub const KERN_CONT: &[u8; 3] = b"\x01c\0";

pub const MAX_ERRNO: u32 = 4095;

pub const EPERM: u32 = 1;
pub const ENOENT: u32 = 2;
pub const ESRCH: u32 = 3;
pub const EINTR: u32 = 4;
pub const EIO: u32 = 5;
pub const ENXIO: u32 = 6;
pub const E2BIG: u32 = 7;
pub const ENOEXEC: u32 = 8;
pub const EBADF: u32 = 9;
pub const EAGAIN: u32 = 11;
pub const ENOMEM: u32 = 12;
pub const EACCES: u32 = 13;
pub const EFAULT: u32 = 14;
pub const EBUSY: u32 = 16;
pub const EEXIST: u32 = 17;
pub const ENODEV: u32 = 19;
pub const EINVAL: u32 = 22;
pub const ENOSPC: u32 = 28;
pub const ERANGE: u32 = 34;
pub const ENOSYS: u32 = 38;
pub const ERESTARTSYS: u32 = 512;
pub const ENOTSUPP: u32 = 524;

const ERRNAMES: &[(u32, &CStr)] = &[
    (EPERM, c"EPERM"),
    (ENOENT, c"ENOENT"),
    (ESRCH, c"ESRCH"),
    (EINTR, c"EINTR"),
    (EIO, c"EIO"),
    (ENXIO, c"ENXIO"),
    (E2BIG, c"E2BIG"),
    (ENOEXEC, c"ENOEXEC"),
    (EBADF, c"EBADF"),
    (EAGAIN, c"EAGAIN"),
    (ENOMEM, c"ENOMEM"),
    (EACCES, c"EACCES"),
    (EFAULT, c"EFAULT"),
    (EBUSY, c"EBUSY"),
    (EEXIST, c"EEXIST"),
    (ENODEV, c"ENODEV"),
    (EINVAL, c"EINVAL"),
    (ENOSPC, c"ENOSPC"),
    (ERANGE, c"ERANGE"),
    (ENOSYS, c"ENOSYS"),
    (ERESTARTSYS, c"ERESTARTSYS"),
    (ENOTSUPP, c"ENOTSUPP"),
];

/// Opaque `struct module`.
#[repr(C)]
pub struct module {
    _private: [u8; 0],
}

/// One call to `_printk`, as seen by the host backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub text: String,
}

thread_local! {
    static LOG: RefCell<Vec<LogRecord>> = const { RefCell::new(Vec::new()) };
}

/// Drains everything the current thread has printed so far.
pub fn take_log() -> Vec<LogRecord> {
    LOG.with(|log| log.take())
}

fn level_of(fmt: &[u8]) -> Level {
    match fmt {
        [0x01, b'0', ..] => Level::Emerg,
        [0x01, b'1', ..] => Level::Alert,
        [0x01, b'2', ..] => Level::Crit,
        [0x01, b'3', ..] => Level::Err,
        [0x01, b'4', ..] => Level::Warning,
        [0x01, b'5', ..] => Level::Notice,
        [0x01, b'6', ..] => Level::Info,
        [0x01, b'7', ..] => Level::Debug,
        [0x01, b'c', ..] => Level::Cont,
        // default_message_loglevel
        _ => Level::Warning,
    }
}

/// Records `len` bytes at `s` under the level encoded in `fmt`.
///
/// # Safety
///
/// `fmt` must be a NUL-terminated string and `s` must be valid for reads of
/// `len` bytes.
pub unsafe fn _printk(fmt: *const c_char, len: c_int, s: *const u8) -> c_int {
    // SAFETY: Guaranteed by the caller.
    let level = level_of(unsafe { CStr::from_ptr(fmt) }.to_bytes());
    // SAFETY: Guaranteed by the caller.
    let bytes = unsafe { core::slice::from_raw_parts(s, len.max(0) as usize) };
    let text = String::from_utf8_lossy(bytes).into_owned();
    LOG.with(|log| log.borrow_mut().push(LogRecord { level, text }));
    len
}

/// Returns the symbolic name of a positive errno, or null when unknown.
///
/// # Safety
///
/// Always safe to call; `unsafe` only to match the kernel helper.
pub unsafe fn errname(err: c_int) -> *const c_char {
    ERRNAMES
        .iter()
        .find(|(code, _)| *code as c_int == err)
        .map_or(core::ptr::null(), |(_, name)| name.as_ptr())
}
