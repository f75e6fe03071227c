#![allow(non_camel_case_types)]

use core::ffi;

/// The primary signed integer type for the current platform.
pub type int = ffi::c_int;

/// The primary unsigned integer type for the current platform.
pub type uint = ffi::c_uint;

/// The signed long integer type for the current platform.
pub type long = ffi::c_long;

/// The unsigned long integer type for the current platform.
pub type ulong = ffi::c_ulong;

/// The signed size type (or "pointer difference" type) for the current platform.
pub type ssize_t = isize;

/// The unsigned size type for the current platform.
pub type size_t = usize;

/// The type used for characters on the current platform.
pub type char = ffi::c_char;

/// The type used for void pointers on the current platform.
pub type void = ffi::c_void;

/// The type used to represent file modes on the current platform.
pub type mode_t = uint;

/// The type used to represent file sizes and offsets into files.
pub type off_t = long;

/// The type used for process identifiers (PIDs) on the current platform.
pub type pid_t = int;

/// The type used to represent user ids.
pub type uid_t = uint;

/// The type used to represent group ids.
pub type gid_t = uint;

/// The record read from a signalfd descriptor for each queued signal.
///
/// Only the leading fields are interesting to callers here; the kernel
/// defines the full record as exactly 128 bytes and will refuse shorter
/// reads, so the layout is padded out to that size.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct signalfd_siginfo {
    pub ssi_signo: u32,
    pub ssi_errno: i32,
    pub ssi_code: i32,
    pub ssi_pid: u32,
    pub ssi_uid: u32,
    pub ssi_fd: i32,
    pub ssi_tid: u32,
    pub ssi_band: u32,
    pub ssi_overrun: u32,
    pub ssi_trapno: u32,
    pub ssi_status: i32,
    pub ssi_int: i32,
    pub ssi_ptr: u64,
    pub ssi_utime: u64,
    pub ssi_stime: u64,
    pub ssi_addr: u64,
    pub ssi_addr_lsb: u16,
    _pad2: u16,
    pub ssi_syscall: i32,
    pub ssi_call_addr: u64,
    pub ssi_arch: u32,
    _pad: [u8; 28],
}

static_assertions::assert_eq_size!(signalfd_siginfo, [u8; 128]);

impl signalfd_siginfo {
    pub const fn zeroed() -> Self {
        Self {
            ssi_signo: 0,
            ssi_errno: 0,
            ssi_code: 0,
            ssi_pid: 0,
            ssi_uid: 0,
            ssi_fd: 0,
            ssi_tid: 0,
            ssi_band: 0,
            ssi_overrun: 0,
            ssi_trapno: 0,
            ssi_status: 0,
            ssi_int: 0,
            ssi_ptr: 0,
            ssi_utime: 0,
            ssi_stime: 0,
            ssi_addr: 0,
            ssi_addr_lsb: 0,
            _pad2: 0,
            ssi_syscall: 0,
            ssi_call_addr: 0,
            ssi_arch: 0,
            _pad: [0; 28],
        }
    }
}

pub const O_RDONLY: int = 0o00000000;
pub const O_WRONLY: int = 0o00000001;
pub const O_RDWR: int = 0o00000002;
pub const O_NONBLOCK: int = 0o00004000;
pub const O_CLOEXEC: int = 0o02000000;

pub const PROT_READ: int = 0x1;
pub const PROT_WRITE: int = 0x2;

pub const MAP_SHARED: int = 0x01;
pub const MAP_PRIVATE: int = 0x02;
pub const MAP_ANONYMOUS: int = 0x20;

pub const SIGINT: int = 2;
pub const SIGBUS: int = 7;
pub const SIGKILL: int = 9;
pub const SIGSEGV: int = 11;
pub const SIGCHLD: int = 17;

pub const SIG_BLOCK: int = 0;
pub const SIG_UNBLOCK: int = 1;
pub const SIG_SETMASK: int = 2;

/// Flags for `signalfd4`. These alias the corresponding O_* flags.
pub const SFD_CLOEXEC: int = O_CLOEXEC;
pub const SFD_NONBLOCK: int = O_NONBLOCK;

/// `prctl` option selecting the calling process's comm name.
pub const PR_SET_NAME: int = 15;

/// `wait4` option: return immediately if no child has exited.
pub const WNOHANG: int = 1;
