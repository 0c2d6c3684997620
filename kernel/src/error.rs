use core::{ffi::CStr, fmt, fmt::Debug, num::TryFromIntError, str::Utf8Error};

use crate::bindings;

pub type KernelResult<T> = Result<T, Error>;

/// A negative kernel error code.
///
/// # Invariants
///
/// The value is always in `-MAX_ERRNO..0`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error(core::ffi::c_int);

impl Error {
    pub fn from_errno(errno: core::ffi::c_int) -> Error {
        if errno < -(bindings::MAX_ERRNO as i32) || errno >= 0 {
            crate::pr_warning!(
                "attempted to create `Error` with out of range `errno`: {}\n",
                errno
            );
            return linux_err::EINVAL;
        }
        // INVARIANT: The check above ensures the type invariant
        // will hold.
        Error(errno)
    }

    pub fn to_errno(&self) -> core::ffi::c_int {
        self.0
    }

    /// Returns a string representing the error, if one exists.
    pub fn name(&self) -> Option<&'static CStr> {
        // SAFETY: Just an FFI call, there are no extra safety requirements.
        let ptr = unsafe { bindings::errname(-self.0) };
        if ptr.is_null() {
            None
        } else {
            // SAFETY: The string returned by `errname` is static and `NUL`-terminated.
            Some(unsafe { CStr::from_ptr(ptr) })
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name().and_then(|name| name.to_str().ok()) {
            // Print out number if no name can be found.
            None => f.debug_tuple("Error").field(&-self.0).finish(),
            Some(name) => f.debug_tuple(name).finish(),
        }
    }
}

/// Contains the C-compatible error codes.
#[rustfmt::skip]
#[allow(unused)]
pub mod linux_err {
    macro_rules! declare_err {
        ($err:tt $(,)? $($doc:expr),+) => {
            $(
            #[doc = $doc]
            )*
            pub const $err: super::Error = super::Error(-(crate::bindings::$err as i32));
        };
    }

    declare_err!(EPERM, "Operation not permitted.");
    declare_err!(ENOENT, "No such file or directory.");
    declare_err!(ESRCH, "No such process.");
    declare_err!(EINTR, "Interrupted system call.");
    declare_err!(EIO, "I/O error.");
    declare_err!(ENXIO, "No such device or address.");
    declare_err!(E2BIG, "Argument list too long.");
    declare_err!(ENOEXEC, "Exec format error.");
    declare_err!(EBADF, "Bad file number.");
    declare_err!(EAGAIN, "Try again.");
    declare_err!(ENOMEM, "Out of memory.");
    declare_err!(EACCES, "Permission denied.");
    declare_err!(EFAULT, "Bad address.");
    declare_err!(EBUSY, "Device or resource busy.");
    declare_err!(EEXIST, "File exists.");
    declare_err!(ENODEV, "No such device.");
    declare_err!(EINVAL, "Invalid argument.");
    declare_err!(ENOSPC, "No space left on device.");
    declare_err!(ERANGE, "Math result not representable.");
    declare_err!(ENOSYS, "Invalid system call number.");
    declare_err!(ERESTARTSYS, "Restart the system call.");
    declare_err!(ENOTSUPP, "Operation is not supported.");
}

impl From<TryFromIntError> for Error {
    fn from(_: TryFromIntError) -> Error {
        linux_err::EINVAL
    }
}

impl From<Utf8Error> for Error {
    fn from(_: Utf8Error) -> Error {
        linux_err::EINVAL
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Error {
        linux_err::EINVAL
    }
}

impl From<core::convert::Infallible> for Error {
    fn from(e: core::convert::Infallible) -> Error {
        match e {}
    }
}
