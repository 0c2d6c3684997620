//! Printing to the kernel log.
//!
//! The `pr_*` macros mirror the C helpers of the same name: they do not add a
//! trailing newline, so callers write `pr_info!("loaded\n")` just like in C.

use core::{cmp, ffi::c_int, fmt};

use crate::bindings;

/// Severity of a kernel log record, in `KERN_*` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Emerg,
    Alert,
    Crit,
    Err,
    Warning,
    Notice,
    Info,
    Debug,
    /// Continues the previous record instead of starting a new one.
    Cont,
}

impl Level {
    /// The `KERN_*` prefix for this level, NUL included.
    pub fn prefix(self) -> &'static [u8; 3] {
        match self {
            Level::Emerg => bindings::KERN_EMERG,
            Level::Alert => bindings::KERN_ALERT,
            Level::Crit => bindings::KERN_CRIT,
            Level::Err => bindings::KERN_ERR,
            Level::Warning => bindings::KERN_WARNING,
            Level::Notice => bindings::KERN_NOTICE,
            Level::Info => bindings::KERN_INFO,
            Level::Debug => bindings::KERN_DEBUG,
            Level::Cont => bindings::KERN_CONT,
        }
    }
}

const FORMAT: &[u8] = b"%.*s\0";
const PREFIX_LEN: usize = 2;

#[doc(hidden)]
pub fn printk(level: Level, s: &[u8]) {
    let s = &s[..cmp::min(s.len(), LOG_LINE_MAX)];
    // Don't copy the trailing NUL from the level prefix.
    let mut fmt_str = [0u8; PREFIX_LEN + FORMAT.len()];
    fmt_str[..PREFIX_LEN].copy_from_slice(&level.prefix()[..PREFIX_LEN]);
    fmt_str[PREFIX_LEN..].copy_from_slice(FORMAT);

    // SAFETY: `fmt_str` is NUL-terminated and `s` is valid for `s.len()` bytes.
    // `s` was cut to `LOG_LINE_MAX` above, so the cast is lossless.
    unsafe { bindings::_printk(fmt_str.as_ptr() as _, s.len() as c_int, s.as_ptr()) };
}

#[doc(hidden)]
pub fn call_printk(level: Level, args: fmt::Arguments<'_>) {
    let mut writer = LogLineWriter::new();
    // `LogLineWriter` truncates instead of failing.
    let _ = fmt::write(&mut writer, args);
    printk(level, writer.as_bytes());
}

// From kernel/print/printk.c
const LOG_LINE_MAX: usize = 1024 - 32;

#[doc(hidden)]
pub struct LogLineWriter {
    data: [u8; LOG_LINE_MAX],
    pos: usize,
}

#[allow(clippy::new_without_default)]
impl LogLineWriter {
    pub fn new() -> LogLineWriter {
        LogLineWriter {
            data: [0u8; LOG_LINE_MAX],
            pos: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.pos]
    }
}

impl fmt::Write for LogLineWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let copy_len = cmp::min(LOG_LINE_MAX - self.pos, s.len());
        self.data[self.pos..self.pos + copy_len].copy_from_slice(&s.as_bytes()[..copy_len]);
        self.pos += copy_len;
        Ok(())
    }
}

/// Prints an emergency-level message (level 0).
#[macro_export]
macro_rules! pr_emerg {
    ($($arg:tt)*) => (
        $crate::printk::call_printk($crate::printk::Level::Emerg, ::core::format_args!($($arg)*))
    );
}

/// Prints an alert-level message (level 1).
#[macro_export]
macro_rules! pr_alert {
    ($($arg:tt)*) => (
        $crate::printk::call_printk($crate::printk::Level::Alert, ::core::format_args!($($arg)*))
    );
}

/// Prints a critical-level message (level 2).
#[macro_export]
macro_rules! pr_crit {
    ($($arg:tt)*) => (
        $crate::printk::call_printk($crate::printk::Level::Crit, ::core::format_args!($($arg)*))
    );
}

/// Prints an error-level message (level 3).
#[macro_export]
macro_rules! pr_err {
    ($($arg:tt)*) => (
        $crate::printk::call_printk($crate::printk::Level::Err, ::core::format_args!($($arg)*))
    );
}

/// Prints a warning-level message (level 4).
#[macro_export]
macro_rules! pr_warn {
    ($($arg:tt)*) => (
        $crate::printk::call_printk($crate::printk::Level::Warning, ::core::format_args!($($arg)*))
    );
}

/// Same as [`pr_warn!`].
#[macro_export]
macro_rules! pr_warning {
    ($($arg:tt)*) => ($crate::pr_warn!($($arg)*));
}

/// Prints a notice-level message (level 5).
#[macro_export]
macro_rules! pr_notice {
    ($($arg:tt)*) => (
        $crate::printk::call_printk($crate::printk::Level::Notice, ::core::format_args!($($arg)*))
    );
}

/// Prints an info-level message (level 6).
///
/// # Examples
///
/// ```
/// kernel::pr_info!("Hello, world!\n");
/// ```
#[macro_export]
macro_rules! pr_info {
    ($($arg:tt)*) => (
        $crate::printk::call_printk($crate::printk::Level::Info, ::core::format_args!($($arg)*))
    );
}

/// Prints a debug-level message (level 7).
#[macro_export]
macro_rules! pr_debug {
    ($($arg:tt)*) => (
        $crate::printk::call_printk($crate::printk::Level::Debug, ::core::format_args!($($arg)*))
    );
}

/// Continues the previous message.
#[macro_export]
macro_rules! pr_cont {
    ($($arg:tt)*) => (
        $crate::printk::call_printk($crate::printk::Level::Cont, ::core::format_args!($($arg)*))
    );
}

/// [`println!`] functions the same as it does in `std`, except instead of
/// printing to `stdout`, it writes to the kernel console at the `KERN_INFO`
/// level.
///
/// [`println!`]: https://doc.rust-lang.org/stable/std/macro.println.html
#[macro_export]
macro_rules! println {
    () => ($crate::pr_info!("\n"));
    ($($arg:tt)*) => ($crate::pr_info!("{}\n", ::core::format_args!($($arg)*)));
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::pr_info!($($arg)*));
}

#[cfg(test)]
mod tests {
    use core::fmt::Write;

    use super::*;
    use crate::bindings::{take_log, LogRecord};

    fn record(level: Level, text: &str) -> LogRecord {
        LogRecord {
            level,
            text: text.to_string(),
        }
    }

    #[test]
    fn levels_reach_the_sink_with_their_prefix() {
        take_log();
        crate::pr_emerg!("a\n");
        crate::pr_err!("b {}\n", 1);
        crate::pr_warning!("c\n");
        crate::pr_info!("d\n");
        crate::pr_debug!("e\n");
        crate::pr_cont!("f");
        assert_eq!(
            take_log(),
            vec![
                record(Level::Emerg, "a\n"),
                record(Level::Err, "b 1\n"),
                record(Level::Warning, "c\n"),
                record(Level::Info, "d\n"),
                record(Level::Debug, "e\n"),
                record(Level::Cont, "f"),
            ]
        );
    }

    #[test]
    fn println_appends_newline_at_info() {
        take_log();
        crate::println!("x = {}", 42);
        crate::println!();
        crate::print!("no newline");
        assert_eq!(
            take_log(),
            vec![
                record(Level::Info, "x = 42\n"),
                record(Level::Info, "\n"),
                record(Level::Info, "no newline"),
            ]
        );
    }

    #[test]
    fn prefixes_are_soh_and_level_digit() {
        assert_eq!(Level::Emerg.prefix(), b"\x010\0");
        assert_eq!(Level::Info.prefix(), b"\x016\0");
        assert_eq!(Level::Cont.prefix(), b"\x01c\0");
    }

    #[test]
    fn writer_truncates_at_line_max() {
        let mut writer = LogLineWriter::new();
        let chunk = "0123456789abcdef";
        for _ in 0..100 {
            writer.write_str(chunk).unwrap();
        }
        assert_eq!(writer.as_bytes().len(), LOG_LINE_MAX);
        assert_eq!(&writer.as_bytes()[..16], chunk.as_bytes());
    }

    #[test]
    fn raw_printk_cuts_oversized_slices() {
        take_log();
        printk(Level::Info, &[b'z'; 3 * LOG_LINE_MAX]);
        let log = take_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text.len(), LOG_LINE_MAX);
    }

    #[test]
    fn long_messages_are_cut_not_dropped() {
        take_log();
        let long = "y".repeat(2 * LOG_LINE_MAX);
        crate::pr_info!("{}", long);
        let log = take_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text.len(), LOG_LINE_MAX);
    }
}
