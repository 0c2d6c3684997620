/// Metadata declared with [`module!`](crate::module!).
///
/// The same values are also written to `.modinfo`, where `modinfo(8)` and the
/// module loader read them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub author: Option<&'static str>,
    pub description: Option<&'static str>,
    pub license: &'static str,
    pub version: Option<&'static str>,
}

/// Length of the `.modinfo` entry for `key` and `value`, NUL included.
pub const fn modinfo_len(key: &str, value: &str) -> usize {
    key.len() + 1 + value.len() + 1
}

/// Builds the `key=value\0` bytes of a `.modinfo` entry.
///
/// `N` must equal [`modinfo_len`]`(key, value)`; anything else fails at
/// compile time when used in a `static`.
pub const fn modinfo_entry<const N: usize>(key: &str, value: &str) -> [u8; N] {
    assert!(N == modinfo_len(key, value), "modinfo entry length mismatch");
    let mut buf = [0u8; N];
    let mut pos = 0;

    let key = key.as_bytes();
    let mut i = 0;
    while i < key.len() {
        buf[pos] = key[i];
        pos += 1;
        i += 1;
    }
    buf[pos] = b'=';
    pos += 1;

    let value = value.as_bytes();
    i = 0;
    while i < value.len() {
        buf[pos] = value[i];
        pos += 1;
        i += 1;
    }
    // buf[pos] stays 0
    buf
}
