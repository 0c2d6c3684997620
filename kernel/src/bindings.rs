//! Raw bindings to the host kernel.
//!
//! Kernel builds (`--cfg MODULE`) use the bindgen output for
//! `bindings_helper.h` plus the C helpers in `helpers.c`. Everything else
//! gets the stand-ins from [`host`], which keep the same names so the rest of
//! the crate compiles unchanged.

#[cfg(MODULE)]
#[allow(
    clippy::all,
    missing_docs,
    non_camel_case_types,
    non_upper_case_globals,
    non_snake_case,
    improper_ctypes,
    unreachable_pub,
    unsafe_op_in_unsafe_fn
)]
mod generated {
    include!(concat!(env!("OUT_DIR"), "/bindings_c.rs"));
}
#[cfg(MODULE)]
pub use generated::*;

#[cfg(MODULE)]
extern "C" {
    #[link_name = "rust_helper_errname"]
    pub fn errname(err: core::ffi::c_int) -> *const core::ffi::c_char;
    #[link_name = "rust_helper_BUG"]
    pub fn bug_helper() -> !;
}

#[cfg(not(MODULE))]
pub mod host;
#[cfg(not(MODULE))]
pub use host::*;
