//! A low-level, unsafe Rust interface to the Linux system calls that the
//! churn fuzzer itself needs.
//!
//! The [`raw`] module provides functions wrapping platform-specific assembly
//! language stubs for making arbitrary system calls by providing a system
//! call number and up to six argument words. On x86_64 the module also
//! exposes `compat32_*` stubs that trap through `int 0x80` and therefore
//! reach the kernel's 32-bit syscall table from a 64-bit process; that is
//! the mechanism behind the fuzzer's biarch mode.
//!
//! The functions in the root of the crate wrap those stubs with thin
//! wrappers for the fixed set of calls the fuzzer's supervisor, watchdog,
//! and workers rely on for their own operation: process management, the
//! shared mapping, signal plumbing, and descriptor handling. Fuzzed calls
//! do not go through these wrappers; they go straight to [`raw`].
//!
//! # Be careful mixing with `std`
//!
//! The Rust `std` crate has lots of functionality that wraps the target's
//! libc functions. Making direct system calls may violate assumptions libc
//! is making, so callers should avoid touching the same resource through
//! both layers.
#![no_std]

mod funcs;
mod types;

pub use funcs::*;
pub use types::*;
pub mod result;
pub mod sigset;

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
#[path = "raw/x86_64.rs"]
pub mod raw;

#[cfg(all(target_os = "linux", target_arch = "x86"))]
#[path = "raw/x86.rs"]
pub mod raw;

#[cfg(test)]
mod tests;
