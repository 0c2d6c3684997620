//! Prints a greeting when inserted and a farewell when removed.
#![cfg_attr(MODULE, no_std)]

use kernel::{error::KernelResult as Result, *};

module! {
    type: Hello,
    name: "hello",
    author: "Samar Lassoued",
    description: "A simple module",
    license: "GPL",
    version: "1.0",
}

struct Hello;

impl kernel::Module for Hello {
    fn init(_module: &'static ThisModule) -> Result<Self> {
        pr_info!("Hello, world!\n");
        Ok(Hello)
    }
}

impl Drop for Hello {
    fn drop(&mut self) {
        pr_info!("Goodbye, world!\n");
    }
}
