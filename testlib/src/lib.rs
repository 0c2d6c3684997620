//! Helpers for tests that insert a built `.ko` into the running kernel.
//!
//! Such tests need root and a module built for the running kernel, so they
//! only run when `KERNEL_MODULE` points at one; otherwise [`kernel_module`]
//! returns `None` and the test should return early.

use std::{
    env,
    fs::OpenOptions,
    io::{self, Read},
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
    process::Command,
};

/// Path of the module under test, if this process is allowed to load it.
pub fn kernel_module() -> Option<PathBuf> {
    let path = PathBuf::from(env::var_os("KERNEL_MODULE")?);
    // SAFETY: `geteuid` cannot fail and has no preconditions.
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("KERNEL_MODULE is set but loading modules needs root");
        return None;
    }
    Some(path)
}

/// A module inserted with `insmod`, removed again with `rmmod` on drop.
pub struct LoadedModule {
    name: String,
}

impl LoadedModule {
    pub fn insert(path: &Path) -> LoadedModule {
        let status = Command::new("insmod")
            .arg(path)
            .status()
            .expect("failed to run insmod");
        assert!(status.success(), "insmod {} failed", path.display());
        LoadedModule {
            name: module_name(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LoadedModule {
    fn drop(&mut self) {
        let status = Command::new("rmmod")
            .arg(&self.name)
            .status()
            .expect("failed to run rmmod");
        if !std::thread::panicking() {
            assert!(status.success(), "rmmod {} failed", self.name);
        }
    }
}

// Kbuild turns dashes in the object name into underscores.
fn module_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .expect("module path has no file name")
        .replace('-', "_")
}

/// One record read from `/dev/kmsg`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct KmsgRecord {
    seq: u64,
    message: String,
}

// "<prio>,<seq>,<usec>,<flags>[,...];<message>\n[ KEY=value\n...]"
fn parse_kmsg(record: &[u8]) -> Option<KmsgRecord> {
    let record = String::from_utf8_lossy(record);
    let (header, body) = record.split_once(';')?;
    let seq = header.split(',').nth(1)?.parse().ok()?;
    let message = body.lines().next().unwrap_or_default().to_owned();
    Some(KmsgRecord { seq, message })
}

fn kmsg() -> Vec<KmsgRecord> {
    let mut file = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open("/dev/kmsg")
        .expect("failed to open /dev/kmsg");
    // Each read returns exactly one record; the kernel caps them well below this.
    let mut buf = vec![0u8; 8192];
    let mut records = Vec::new();
    loop {
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => records.extend(parse_kmsg(&buf[..n])),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            // Overwritten before we got to it; the next read resumes at the oldest record.
            Err(e) if e.raw_os_error() == Some(libc::EPIPE) => continue,
            Err(e) => panic!("failed to read /dev/kmsg: {}", e),
        }
    }
    records
}

/// The kernel log from the moment [`KernelLog::mark`] was called.
///
/// Positions are kmsg sequence numbers, so a ring buffer that wraps in
/// between does not shift what counts as new.
pub struct KernelLog {
    next_seq: u64,
}

impl KernelLog {
    pub fn mark() -> KernelLog {
        KernelLog {
            next_seq: kmsg().last().map_or(0, |r| r.seq + 1),
        }
    }

    /// Messages logged since the mark.
    pub fn lines(&self) -> Vec<String> {
        since(kmsg(), self.next_seq)
    }

    /// How many messages since the mark are exactly `line`.
    pub fn count(&self, line: &str) -> usize {
        self.lines().iter().filter(|l| l.as_str() == line).count()
    }
}

fn since(records: Vec<KmsgRecord>, next_seq: u64) -> Vec<String> {
    records
        .into_iter()
        .filter(|r| r.seq >= next_seq)
        .map(|r| r.message)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_comes_from_file_stem() {
        assert_eq!(module_name(Path::new("/tmp/build/hello.ko")), "hello");
        assert_eq!(module_name(Path::new("hello-world.ko")), "hello_world");
    }

    #[test]
    fn kmsg_record_splits_header_from_message() {
        assert_eq!(
            parse_kmsg(b"6,1234,5678901,-;Hello, world!\n"),
            Some(KmsgRecord {
                seq: 1234,
                message: "Hello, world!".to_string(),
            })
        );
    }

    #[test]
    fn kmsg_caller_field_and_dict_stay_out_of_message() {
        let record = parse_kmsg(b"6,77,100,-,caller=T4242;Goodbye, world!\n SUBSYSTEM=module\n");
        assert_eq!(record.unwrap().message, "Goodbye, world!");
        assert_eq!(parse_kmsg(b"garbage"), None);
    }

    #[test]
    fn new_lines_are_picked_by_sequence_not_position() {
        // The buffer wrapped: fewer records than at mark time, but all new.
        let records = vec![
            KmsgRecord {
                seq: 10,
                message: "old".to_string(),
            },
            KmsgRecord {
                seq: 11,
                message: "Hello, world!".to_string(),
            },
        ];
        assert_eq!(since(records, 11), ["Hello, world!"]);
    }

    #[test]
    fn no_module_without_env() {
        if env::var_os("KERNEL_MODULE").is_none() {
            assert!(kernel_module().is_none());
        }
    }
}
