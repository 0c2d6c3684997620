//! [`log`] backend that writes through printk.

use core::{
    hint,
    sync::atomic::{AtomicU8, Ordering},
};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::{pr_debug, pr_err, pr_info, pr_warn};

struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let module_path = record.module_path().unwrap_or_default();
        match record.level() {
            Level::Error => {
                pr_err!("[ERROR] [{}] {}\n", module_path, record.args());
            }
            Level::Warn => {
                pr_warn!("[ WARN] [{}] {}\n", module_path, record.args());
            }
            Level::Info => {
                pr_info!("[ INFO] [{}] {}\n", module_path, record.args());
            }
            Level::Debug => {
                pr_debug!("[DEBUG] [{}] {}\n", module_path, record.args());
            }
            Level::Trace => {
                pr_debug!("[TRACE] [{}] {}\n", module_path, record.args());
            }
        };
    }
    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const INITIALIZED: u8 = 2;

static STATE: AtomicU8 = AtomicU8::new(UNINITIALIZED);

fn level_filter(level: Option<&str>) -> LevelFilter {
    match level {
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("INFO") => LevelFilter::Info,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Routes the [`log`] macros to the kernel log.
///
/// The level is fixed at build time by the `LOG` environment variable and
/// defaults to `INFO`. Calling this again is a no-op; a caller that loses the
/// race to install returns only once the level is in place.
pub fn init_logger() {
    match STATE.compare_exchange(
        UNINITIALIZED,
        INITIALIZING,
        Ordering::Acquire,
        Ordering::Acquire,
    ) {
        Ok(_) => {
            // Another `log` backend may already own the facade; keep the level anyway.
            let _ = log::set_logger(&LOGGER);
            log::set_max_level(level_filter(option_env!("LOG")));
            STATE.store(INITIALIZED, Ordering::Release);
        }
        Err(_) => {
            while STATE.load(Ordering::Acquire) != INITIALIZED {
                hint::spin_loop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bindings::{take_log, LogRecord},
        printk,
    };

    #[test]
    fn parses_log_env() {
        assert_eq!(level_filter(Some("ERROR")), LevelFilter::Error);
        assert_eq!(level_filter(Some("TRACE")), LevelFilter::Trace);
        assert_eq!(level_filter(Some("verbose")), LevelFilter::Info);
        assert_eq!(level_filter(None), LevelFilter::Info);
    }

    #[test]
    fn racing_installers_all_see_a_level() {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                std::thread::spawn(|| {
                    init_logger();
                    log::max_level()
                })
            })
            .collect();
        for handle in handles {
            assert_ne!(handle.join().unwrap(), LevelFilter::Off);
        }
    }

    #[test]
    fn records_carry_level_and_module_path() {
        init_logger();
        init_logger();
        take_log();
        log::error!("disk {} is gone", 3);
        log::warn!("low on {}", "space");
        assert_eq!(
            take_log(),
            vec![
                LogRecord {
                    level: printk::Level::Err,
                    text: "[ERROR] [kernel::logger::tests] disk 3 is gone\n".to_string(),
                },
                LogRecord {
                    level: printk::Level::Warning,
                    text: "[ WARN] [kernel::logger::tests] low on space\n".to_string(),
                },
            ]
        );
    }
}
