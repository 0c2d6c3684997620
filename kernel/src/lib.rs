//! Support code for writing loadable Linux kernel modules in Rust.
//!
//! A module implements [`Module`] and declares itself with [`module!`]; the
//! macro provides the `init_module`/`cleanup_module` symbols and the
//! `.modinfo` strings the kernel expects from a `.ko`.
//!
//! Built with `--cfg MODULE` (see `hello-world/Kbuild`) the crate is `no_std`
//! and talks to the real kernel. Without it, [`bindings`] falls back to a host
//! backend that captures printk output so module lifecycles can be unit
//! tested with `cargo test`.
#![cfg_attr(MODULE, no_std)]

pub mod bindings;
pub mod error;
pub mod logger;
pub mod module;
pub mod printk;

pub use error::linux_err as code;
pub use module::{InPlaceModule, Module, ThisModule};

#[cfg(not(MODULE))]
pub use bindings::{take_log, LogRecord};

pub mod init {
    pub use pinned_init::*;
}

#[cfg(MODULE)]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    pr_emerg!("Kernel panic!\n");
    pr_emerg!("{}\n", info);
    // SAFETY: `BUG()` has no preconditions.
    unsafe { bindings::bug_helper() }
}
