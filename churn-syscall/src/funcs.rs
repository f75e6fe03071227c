use super::raw;
use super::result::{prepare_arg as arg, prepare_standard_result as mkresult, Result};
use super::sigset::sigset_t;
use super::types::*;

macro_rules! syscall {
    ($n:expr) => {
        mkresult(raw::syscall0($n))
    };
    ($n:expr, $a0:expr) => {
        mkresult(raw::syscall1($n, arg($a0)))
    };
    ($n:expr, $a0:expr, $a1:expr) => {
        mkresult(raw::syscall2($n, arg($a0), arg($a1)))
    };
    ($n:expr, $a0:expr, $a1:expr, $a2:expr) => {
        mkresult(raw::syscall3($n, arg($a0), arg($a1), arg($a2)))
    };
    ($n:expr, $a0:expr, $a1:expr, $a2:expr, $a3:expr) => {
        mkresult(raw::syscall4($n, arg($a0), arg($a1), arg($a2), arg($a3)))
    };
    ($n:expr, $a0:expr, $a1:expr, $a2:expr, $a3:expr, $a4:expr) => {
        mkresult(raw::syscall5(
            $n,
            arg($a0),
            arg($a1),
            arg($a2),
            arg($a3),
            arg($a4),
        ))
    };
    ($n:expr, $a0:expr, $a1:expr, $a2:expr, $a3:expr, $a4:expr, $a5:expr) => {
        mkresult(raw::syscall6(
            $n,
            arg($a0),
            arg($a1),
            arg($a2),
            arg($a3),
            arg($a4),
            arg($a5),
        ))
    };
}

/// Close a file descriptor.
#[inline(always)]
pub unsafe fn close(fd: int) -> Result<int> {
    syscall!(raw::CLOSE, fd)
}

/// Immediately terminate all threads in the current process, without giving
/// Rust or libc any opportunity to run destructors or other cleanup code.
#[inline(always)]
pub unsafe fn exit_group(status: int) -> ! {
    raw::syscall1(raw::EXIT_GROUP, arg(status));
    unreachable!()
}

/// Create a child process duplicating the caller.
///
/// Returns zero in the child and the child's pid in the parent. The child
/// must not touch any libc-managed state it did not own before the fork.
#[inline(always)]
pub unsafe fn fork() -> Result<pid_t> {
    syscall!(raw::FORK)
}

/// Get the group id (GID) of the current process.
#[inline(always)]
pub unsafe fn getgid() -> gid_t {
    raw::syscall0(raw::GETGID) as gid_t
}

/// Get the process id (PID) of the current process.
#[inline(always)]
pub unsafe fn getpid() -> pid_t {
    raw::syscall0(raw::GETPID) as pid_t
}

/// Get the process id (PID) of the parent process.
#[inline(always)]
pub unsafe fn getppid() -> pid_t {
    raw::syscall0(raw::GETPPID) as pid_t
}

/// Get the user id (UID) of the current process.
#[inline(always)]
pub unsafe fn getuid() -> uid_t {
    raw::syscall0(raw::GETUID) as uid_t
}

/// Send a signal to a process. A signal of zero only probes for existence.
#[inline(always)]
pub unsafe fn kill(pid: pid_t, sig: int) -> Result<int> {
    syscall!(raw::KILL, pid, sig)
}

/// Map pages of memory.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub unsafe fn mmap(
    addr: *mut void,
    length: size_t,
    prot: int,
    flags: int,
    fd: int,
    offset: off_t,
) -> Result<*mut void> {
    syscall!(raw::MMAP, addr, length, prot, flags, fd, offset)
}

/// Map pages of memory.
///
/// x86 has no byte-offset `mmap` in its modern table; `mmap2` takes the
/// offset in pages instead.
#[cfg(target_arch = "x86")]
#[inline(always)]
pub unsafe fn mmap(
    addr: *mut void,
    length: size_t,
    prot: int,
    flags: int,
    fd: int,
    offset: off_t,
) -> Result<*mut void> {
    syscall!(
        raw::MMAP2,
        addr,
        length,
        prot,
        flags,
        fd,
        (offset as ulong) >> 12
    )
}

/// Unmap pages of memory.
#[inline(always)]
pub unsafe fn munmap(addr: *mut void, length: size_t) -> Result<int> {
    syscall!(raw::MUNMAP, addr, length)
}

/// Open a file.
#[inline(always)]
pub unsafe fn open(pathname: *const char, flags: int, mode: mode_t) -> Result<int> {
    syscall!(raw::OPEN, pathname, flags, mode)
}

/// Operations on a process, such as setting its comm name.
#[inline(always)]
pub unsafe fn prctl(option: int, arg2: ulong) -> Result<int> {
    syscall!(raw::PRCTL, option, arg2)
}

/// Read from a file descriptor.
#[inline(always)]
pub unsafe fn read(fd: int, buf: *mut void, count: size_t) -> Result<ssize_t> {
    syscall!(raw::READ, fd, buf, count)
}

/// Examine and change blocked signals.
#[inline(always)]
pub unsafe fn rt_sigprocmask(
    how: int,
    set: *const sigset_t,
    oldset: *mut sigset_t,
) -> Result<int> {
    syscall!(raw::RT_SIGPROCMASK, how, set, oldset, sigset_t::SIZE)
}

/// Create a file descriptor that reports the signals in `mask` as data.
#[inline(always)]
pub unsafe fn signalfd4(fd: int, mask: *const sigset_t, flags: int) -> Result<int> {
    syscall!(raw::SIGNALFD4, fd, mask, sigset_t::SIZE, flags)
}

/// Create an endpoint for communication.
#[inline(always)]
pub unsafe fn socket(domain: int, typ: int, protocol: int) -> Result<int> {
    syscall!(raw::SOCKET, domain, typ, protocol)
}

/// Wait for a process to change state.
#[inline(always)]
pub unsafe fn wait4(
    pid: pid_t,
    wstatus: *mut int,
    options: int,
    rusage: *mut void,
) -> Result<pid_t> {
    syscall!(raw::WAIT4, pid, wstatus, options, rusage)
}

/// Write to a file descriptor.
#[inline(always)]
pub unsafe fn write(fd: int, buf: *const void, count: size_t) -> Result<ssize_t> {
    syscall!(raw::WRITE, fd, buf, count)
}
