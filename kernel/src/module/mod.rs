//! Module lifecycle: the [`Module`] trait, the [`Registration`] that holds a
//! loaded module, and the [`module!`](crate::module!) macro that wires both to
//! the kernel's `init_module`/`cleanup_module` entry points.

use core::{
    cell::UnsafeCell,
    ffi::c_int,
    mem::MaybeUninit,
    ptr,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{bindings, code, error, error::KernelResult as Result, init, init::PinInit};

mod info;

pub use info::{modinfo_entry, modinfo_len, ModuleInfo};

/// The top level entrypoint to implementing a kernel module.
///
/// For any teardown or cleanup operations, your type may implement [`Drop`].
pub trait Module: Sized + Sync {
    /// Called at module initialization time.
    ///
    /// Use this method to perform whatever setup or registration your module
    /// should do.
    ///
    /// Equivalent to the `module_init` macro in the C API.
    fn init(module: &'static ThisModule) -> Result<Self>;
}

/// A module that is pinned and initialised in-place.
pub trait InPlaceModule: Sync {
    /// Creates an initialiser for the module.
    ///
    /// It is called when the module is loaded.
    fn init(module: &'static ThisModule) -> impl PinInit<Self, error::Error>;
}

impl<T: Module> InPlaceModule for T {
    fn init(module: &'static ThisModule) -> impl PinInit<Self, error::Error> {
        let initer = move |slot: *mut Self| {
            let m = <Self as Module>::init(module)?;

            // SAFETY: `slot` is valid for write per the contract with `pin_init_from_closure`.
            unsafe { slot.write(m) };
            Ok(())
        };

        // SAFETY: On success, `initer` always fully initialises an instance of `Self`.
        unsafe { init::pin_init_from_closure(initer) }
    }
}

/// Equivalent to `THIS_MODULE` in the C API.
///
/// C header: `include/linux/export.h`
pub struct ThisModule(*mut bindings::module);

// SAFETY: `THIS_MODULE` may be used from all threads within a module.
unsafe impl Sync for ThisModule {}

impl ThisModule {
    /// Creates a [`ThisModule`] given the `THIS_MODULE` pointer.
    ///
    /// # Safety
    ///
    /// The pointer must be equal to the right `THIS_MODULE`, or null for code
    /// that is not linked into a module.
    pub const unsafe fn from_ptr(ptr: *mut bindings::module) -> ThisModule {
        ThisModule(ptr)
    }

    pub fn as_ptr(&self) -> *mut bindings::module {
        self.0
    }
}

/// Storage for a module between `init_module` and `cleanup_module`.
///
/// The kernel tracks whether a module is resident; this only mirrors that so
/// the teardown runs at most once and only after a successful init.
pub struct Registration<T: InPlaceModule> {
    name: &'static str,
    loaded: AtomicBool,
    slot: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: The slot is only touched by `load` and `unload`, whose callers
// promise not to run them concurrently.
unsafe impl<T: InPlaceModule> Sync for Registration<T> {}

impl<T: InPlaceModule> Registration<T> {
    pub const fn new(name: &'static str) -> Self {
        Registration {
            name,
            loaded: AtomicBool::new(false),
            slot: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Runs the module's initialiser and keeps the result.
    ///
    /// Returns `0` on success or the negative errno the initialiser failed
    /// with. A registration that is already loaded is left alone and `-EBUSY`
    /// is returned.
    ///
    /// # Safety
    ///
    /// Must not run concurrently with [`load`](Self::load) or
    /// [`unload`](Self::unload) on the same registration.
    pub unsafe fn load(&self, module: &'static ThisModule) -> c_int {
        crate::logger::init_logger();
        if self.is_loaded() {
            log::error!("{}: already loaded", self.name);
            return code::EBUSY.to_errno();
        }

        // SAFETY: Not loaded, so the slot holds no live value. On error the
        // initialiser leaves it uninitialised.
        match unsafe { T::init(module).__pinned_init(self.slot.get().cast::<T>()) } {
            Ok(()) => {
                self.loaded.store(true, Ordering::Release);
                0
            }
            Err(e) => {
                log::error!("{}: init failed: {:?}", self.name, e);
                e.to_errno()
            }
        }
    }

    /// Drops the loaded module. Does nothing if it is not loaded.
    ///
    /// # Safety
    ///
    /// Same as [`load`](Self::load).
    pub unsafe fn unload(&self) {
        if !self.loaded.swap(false, Ordering::AcqRel) {
            return;
        }
        // SAFETY: `loaded` was set, so `load` fully initialised the slot, and
        // clearing it above means nothing will drop it again.
        unsafe { ptr::drop_in_place(self.slot.get().cast::<T>()) };
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __module_opt {
    () => {
        ::core::option::Option::None
    };
    ($value:expr) => {
        ::core::option::Option::Some($value)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __modinfo {
    ($ident:ident, $key:literal, $value:expr) => {
        #[used]
        #[cfg_attr(MODULE, link_section = ".modinfo")]
        static $ident: [u8; $crate::module::modinfo_len($key, $value)] =
            $crate::module::modinfo_entry($key, $value);
    };
}

/// Declares a kernel module.
///
/// The `type` argument must implement [`Module`]. Its `init` runs when the
/// module is inserted and its [`Drop`] impl runs when it is removed. `name`
/// and `license` are required; `author`, `description` and `version` are
/// optional but must keep this order. Every field ends with a comma.
///
/// Besides the entry points, the macro emits one `.modinfo` string per field
/// and a `MODULE_INFO` static with the same values.
///
/// # Examples
///
/// ```ignore
/// use kernel::{error::KernelResult as Result, *};
///
/// module! {
///     type: MyModule,
///     name: "my_kernel_module",
///     author: "Rust for Linux Contributors",
///     description: "My very own kernel module!",
///     license: "GPL",
///     version: "0.1",
/// }
///
/// struct MyModule;
///
/// impl kernel::Module for MyModule {
///     fn init(_module: &'static ThisModule) -> Result<Self> {
///         pr_info!("initialised\n");
///         Ok(MyModule)
///     }
/// }
/// ```
#[macro_export]
macro_rules! module {
    (
        type: $type:ty,
        name: $name:literal,
        $(author: $author:literal,)?
        $(description: $description:literal,)?
        license: $license:literal,
        $(version: $version:literal,)?
    ) => {
        pub static MODULE_INFO: $crate::module::ModuleInfo = $crate::module::ModuleInfo {
            name: $name,
            author: $crate::__module_opt!($($author)?),
            description: $crate::__module_opt!($($description)?),
            license: $license,
            version: $crate::__module_opt!($($version)?),
        };

        $($crate::__modinfo!(__MODINFO_AUTHOR, "author", $author);)?
        $($crate::__modinfo!(__MODINFO_DESCRIPTION, "description", $description);)?
        $crate::__modinfo!(__MODINFO_LICENSE, "license", $license);
        $($crate::__modinfo!(__MODINFO_VERSION, "version", $version);)?

        static __MOD: $crate::module::Registration<$type> =
            $crate::module::Registration::new($name);

        #[cfg(MODULE)]
        static THIS_MODULE: $crate::ThisModule = {
            extern "C" {
                static __this_module: $crate::bindings::module;
            }
            // SAFETY: `__this_module` is emitted by modpost for this very module.
            unsafe {
                $crate::ThisModule::from_ptr(::core::ptr::addr_of!(__this_module).cast_mut())
            }
        };
        #[cfg(not(MODULE))]
        static THIS_MODULE: $crate::ThisModule =
            // SAFETY: Null stands for "not linked into a module".
            unsafe { $crate::ThisModule::from_ptr(::core::ptr::null_mut()) };

        #[doc(hidden)]
        #[no_mangle]
        #[cfg_attr(MODULE, link_section = ".init.text")]
        pub extern "C" fn init_module() -> ::core::ffi::c_int {
            // SAFETY: The module loader calls this once, before `cleanup_module`,
            // and never concurrently with it.
            unsafe { __MOD.load(&THIS_MODULE) }
        }

        #[doc(hidden)]
        #[no_mangle]
        #[cfg_attr(MODULE, link_section = ".exit.text")]
        pub extern "C" fn cleanup_module() {
            // SAFETY: The module loader calls this once, after a successful
            // `init_module`.
            unsafe { __MOD.unload() }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bindings::{take_log, LogRecord},
        printk::Level,
    };

    static THIS_MODULE: ThisModule = unsafe { ThisModule::from_ptr(ptr::null_mut()) };

    struct Greeter;

    impl Module for Greeter {
        fn init(_module: &'static ThisModule) -> Result<Self> {
            crate::pr_info!("up\n");
            Ok(Greeter)
        }
    }

    impl Drop for Greeter {
        fn drop(&mut self) {
            crate::pr_info!("down\n");
        }
    }

    struct Broken;

    impl Module for Broken {
        fn init(_module: &'static ThisModule) -> Result<Self> {
            Err(code::ENODEV)
        }
    }

    impl Drop for Broken {
        fn drop(&mut self) {
            crate::pr_info!("never\n");
        }
    }

    fn info(text: &str) -> LogRecord {
        LogRecord {
            level: Level::Info,
            text: text.to_string(),
        }
    }

    #[test]
    fn load_then_unload_runs_init_and_drop_once() {
        static REG: Registration<Greeter> = Registration::new("greeter");
        take_log();

        assert_eq!(unsafe { REG.load(&THIS_MODULE) }, 0);
        assert!(REG.is_loaded());
        assert_eq!(take_log(), vec![info("up\n")]);

        unsafe { REG.unload() };
        assert!(!REG.is_loaded());
        assert_eq!(take_log(), vec![info("down\n")]);

        unsafe { REG.unload() };
        assert!(take_log().is_empty());
    }

    #[test]
    fn module_can_be_loaded_again_after_unload() {
        static REG: Registration<Greeter> = Registration::new("greeter");
        take_log();

        for _ in 0..2 {
            assert_eq!(unsafe { REG.load(&THIS_MODULE) }, 0);
            unsafe { REG.unload() };
        }
        assert_eq!(
            take_log(),
            vec![info("up\n"), info("down\n"), info("up\n"), info("down\n")]
        );
    }

    #[test]
    fn failed_init_returns_errno_and_stays_unloaded() {
        static REG: Registration<Broken> = Registration::new("broken");
        take_log();

        assert_eq!(unsafe { REG.load(&THIS_MODULE) }, code::ENODEV.to_errno());
        assert!(!REG.is_loaded());
        let log = take_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].level, Level::Err);
        assert!(log[0].text.contains("broken: init failed: ENODEV"));

        unsafe { REG.unload() };
        assert!(take_log().is_empty());
    }

    #[test]
    fn second_load_is_refused_with_ebusy() {
        static REG: Registration<Greeter> = Registration::new("greeter");
        take_log();

        assert_eq!(unsafe { REG.load(&THIS_MODULE) }, 0);
        assert_eq!(unsafe { REG.load(&THIS_MODULE) }, code::EBUSY.to_errno());
        assert!(REG.is_loaded());
        let log = take_log();
        assert_eq!(log.iter().filter(|r| r.text == "up\n").count(), 1);

        unsafe { REG.unload() };
        assert_eq!(take_log(), vec![info("down\n")]);
    }

    #[test]
    fn lifecycle_adds_no_records_of_its_own_at_trace() {
        static REG: Registration<Greeter> = Registration::new("greeter");
        crate::logger::init_logger();
        log::set_max_level(log::LevelFilter::Trace);
        take_log();

        assert_eq!(unsafe { REG.load(&THIS_MODULE) }, 0);
        assert_eq!(take_log(), vec![info("up\n")]);
        unsafe { REG.unload() };
        assert_eq!(take_log(), vec![info("down\n")]);
    }

    #[test]
    fn unload_before_load_is_a_no_op() {
        static REG: Registration<Greeter> = Registration::new("greeter");
        take_log();

        unsafe { REG.unload() };
        assert!(!REG.is_loaded());
        assert!(take_log().is_empty());
        assert_eq!(REG.name(), "greeter");
    }
}
