//! The 32-bit syscall table, indexed by the i386 numbers. On x86_64 hosts
//! these go through the `int 0x80` compat stubs; on x86 they are simply
//! the native table.
//!
//! The i386 table kept its historic holes (the old break/stty/gtty slots
//! and friends); a few are listed as NI so the eligibility filter earns
//! its keep.

use super::entry;
use super::ArgType::{
    Address, Fd, Int, Iovec, IovecLen, Len, Mode, Pathname, Pid, Sockaddr, SockaddrLen,
};
use super::{SyscallDescriptor, SyscallFlags as F};

use crate::sanitise::ioctl::sanitise_ioctl;
use crate::sanitise::sanitise_setsockopt;
use crate::sanitise::sockaddr::{PF_INET6, PF_NETLINK};

const ACTIVE: F = F::ACTIVE;
const NEEDS_FD: F = F::ACTIVE.union(F::NEEDS_FD);
const AVOID: F = F::ACTIVE.union(F::AVOID);
const NI: F = F::NI;
const BORING: F = F::ACTIVE.union(F::BORING);

pub static TABLE: &[SyscallDescriptor] = &[
    entry!(1, "exit", [Int], AVOID),
    entry!(2, "fork", [], AVOID),
    entry!(3, "read", [Fd, Address, Len], NEEDS_FD),
    entry!(4, "write", [Fd, Address, Len], NEEDS_FD),
    entry!(5, "open", [Pathname, Int, Mode], ACTIVE),
    entry!(6, "close", [Fd], AVOID),
    entry!(7, "waitpid", [Pid, Address, Int], AVOID),
    entry!(8, "creat", [Pathname, Mode], ACTIVE),
    entry!(9, "link", [Pathname, Pathname], ACTIVE),
    entry!(10, "unlink", [Pathname], ACTIVE),
    entry!(11, "execve", [Pathname, Address, Address], AVOID),
    entry!(12, "chdir", [Pathname], ACTIVE),
    entry!(13, "time", [Address], BORING),
    entry!(14, "mknod", [Pathname, Mode, Int], ACTIVE),
    entry!(15, "chmod", [Pathname, Mode], ACTIVE),
    entry!(17, "ni_syscall (old break)", [], NI),
    entry!(19, "lseek", [Fd, Int, Int], NEEDS_FD),
    entry!(20, "getpid", [], BORING),
    entry!(21, "mount", [Pathname, Pathname, Address, Int, Address], ACTIVE),
    entry!(26, "ptrace", [Int, Pid, Address, Address], AVOID),
    entry!(27, "alarm", [Int], AVOID),
    entry!(29, "pause", [], AVOID),
    entry!(30, "utime", [Pathname, Address], ACTIVE),
    entry!(31, "ni_syscall (old stty)", [], NI),
    entry!(32, "ni_syscall (old gtty)", [], NI),
    entry!(33, "access", [Pathname, Mode], ACTIVE),
    entry!(34, "nice", [Int], ACTIVE),
    entry!(35, "ni_syscall (old ftime)", [], NI),
    entry!(36, "sync", [], BORING),
    entry!(37, "kill", [Pid, Int], AVOID),
    entry!(38, "rename", [Pathname, Pathname], ACTIVE),
    entry!(39, "mkdir", [Pathname, Mode], ACTIVE),
    entry!(40, "rmdir", [Pathname], ACTIVE),
    entry!(41, "dup", [Fd], NEEDS_FD),
    entry!(42, "pipe", [Address], ACTIVE),
    entry!(43, "times", [Address], ACTIVE),
    entry!(44, "ni_syscall (old prof)", [], NI),
    entry!(45, "brk", [Address], AVOID),
    entry!(51, "acct", [Pathname], ACTIVE),
    entry!(53, "ni_syscall (old lock)", [], NI),
    entry!(54, "ioctl", [Fd, Int, Address], NEEDS_FD, sanitise_ioctl),
    entry!(55, "fcntl", [Fd, Int, Int], NEEDS_FD),
    entry!(56, "ni_syscall (old mpx)", [], NI),
    entry!(57, "setpgid", [Pid, Pid], AVOID),
    entry!(58, "ni_syscall (old ulimit)", [], NI),
    entry!(60, "umask", [Mode], ACTIVE),
    entry!(61, "chroot", [Pathname], ACTIVE),
    entry!(62, "ustat", [Int, Address], ACTIVE),
    entry!(63, "dup2", [Fd, Fd], AVOID),
    entry!(64, "getppid", [], BORING),
    entry!(74, "sethostname", [Address, Len], ACTIVE),
    entry!(75, "setrlimit", [Int, Address], ACTIVE),
    entry!(77, "getrusage", [Int, Address], ACTIVE),
    entry!(78, "gettimeofday", [Address, Address], BORING),
    entry!(83, "symlink", [Pathname, Pathname], ACTIVE),
    entry!(85, "readlink", [Pathname, Address, Len], ACTIVE),
    entry!(87, "swapon", [Pathname, Int], ACTIVE),
    entry!(88, "reboot", [Int, Int, Int, Address], AVOID),
    entry!(91, "munmap", [Address, Len], AVOID),
    entry!(92, "truncate", [Pathname, Len], ACTIVE),
    entry!(93, "ftruncate", [Fd, Len], NEEDS_FD),
    entry!(94, "fchmod", [Fd, Mode], NEEDS_FD),
    entry!(96, "getpriority", [Int, Int], ACTIVE),
    entry!(97, "setpriority", [Int, Int, Int], ACTIVE),
    entry!(99, "statfs", [Pathname, Address], ACTIVE),
    entry!(100, "fstatfs", [Fd, Address], NEEDS_FD),
    entry!(103, "syslog", [Int, Address, Len], ACTIVE),
    entry!(104, "setitimer", [Int, Address, Address], AVOID),
    entry!(105, "getitimer", [Int, Address], ACTIVE),
    entry!(106, "stat", [Pathname, Address], ACTIVE),
    entry!(107, "lstat", [Pathname, Address], ACTIVE),
    entry!(108, "fstat", [Fd, Address], NEEDS_FD),
    entry!(111, "vhangup", [], AVOID),
    entry!(114, "wait4", [Pid, Address, Int, Address], AVOID),
    entry!(116, "sysinfo", [Address], ACTIVE),
    entry!(118, "fsync", [Fd], NEEDS_FD),
    entry!(120, "clone", [Int, Address, Address, Address, Int], AVOID),
    entry!(122, "uname", [Address], ACTIVE),
    entry!(125, "mprotect", [Address, Len, Int], ACTIVE),
    entry!(133, "fchdir", [Fd], NEEDS_FD),
    entry!(136, "personality", [Int], AVOID),
    entry!(140, "_llseek", [Fd, Int, Int, Address, Int], NEEDS_FD),
    entry!(141, "getdents", [Fd, Address, Len], NEEDS_FD),
    entry!(142, "select", [Len, Address, Address, Address, Address], ACTIVE),
    entry!(143, "flock", [Fd, Int], NEEDS_FD),
    entry!(144, "msync", [Address, Len, Int], ACTIVE),
    entry!(145, "readv", [Fd, Iovec, IovecLen], NEEDS_FD),
    entry!(146, "writev", [Fd, Iovec, IovecLen], NEEDS_FD),
    entry!(148, "fdatasync", [Fd], NEEDS_FD),
    entry!(162, "nanosleep", [Address, Address], AVOID),
    entry!(163, "mremap", [Address, Len, Len, Int, Address], AVOID),
    entry!(168, "poll", [Address, Len, Int], ACTIVE),
    entry!(172, "prctl", [Int, Int, Int, Int, Int], AVOID),
    entry!(174, "rt_sigaction", [Int, Address, Address, Len], AVOID),
    entry!(175, "rt_sigprocmask", [Int, Address, Address, Len], AVOID),
    entry!(180, "pread64", [Fd, Address, Len, Int], NEEDS_FD),
    entry!(181, "pwrite64", [Fd, Address, Len, Int], NEEDS_FD),
    entry!(183, "getcwd", [Address, Len], ACTIVE),
    entry!(187, "sendfile", [Fd, Fd, Address, Len], NEEDS_FD),
    entry!(192, "mmap2", [Address, Len, Int, Int, Fd, Int], ACTIVE),
    entry!(219, "madvise", [Address, Len, Int], ACTIVE),
    entry!(220, "getdents64", [Fd, Address, Len], NEEDS_FD),
    entry!(221, "fcntl64", [Fd, Int, Int], NEEDS_FD),
    entry!(226, "setxattr", [Pathname, Address, Address, Len, Int], ACTIVE),
    entry!(229, "getxattr", [Pathname, Address, Address, Len], ACTIVE),
    entry!(232, "listxattr", [Pathname, Address, Len], ACTIVE),
    entry!(235, "removexattr", [Pathname, Address], ACTIVE),
    entry!(238, "tkill", [Pid, Int], AVOID),
    entry!(240, "futex", [Address, Int, Int, Address, Address, Int], ACTIVE),
    entry!(241, "sched_setaffinity", [Pid, Len, Address], ACTIVE),
    entry!(242, "sched_getaffinity", [Pid, Len, Address], ACTIVE),
    entry!(252, "exit_group", [Int], AVOID),
    entry!(254, "epoll_create", [Int], ACTIVE),
    entry!(255, "epoll_ctl", [Fd, Int, Fd, Address], NEEDS_FD),
    entry!(256, "epoll_wait", [Fd, Address, Int, Int], NEEDS_FD),
    entry!(265, "clock_gettime", [Int, Address], ACTIVE),
    entry!(271, "utimes", [Pathname, Address], ACTIVE),
    entry!(295, "openat", [Fd, Pathname, Int, Mode], ACTIVE),
    entry!(296, "mkdirat", [Fd, Pathname, Mode], ACTIVE),
    entry!(301, "unlinkat", [Fd, Pathname, Int], ACTIVE),
    entry!(305, "readlinkat", [Fd, Pathname, Address, Len], ACTIVE),
    entry!(313, "splice", [Fd, Address, Fd, Address, Len, Int], NEEDS_FD),
    entry!(315, "tee", [Fd, Fd, Len, Int], NEEDS_FD),
    entry!(316, "vmsplice", [Fd, Iovec, IovecLen, Int], NEEDS_FD),
    entry!(320, "utimensat", [Fd, Pathname, Address, Int], ACTIVE),
    entry!(323, "eventfd", [Int], ACTIVE),
    entry!(324, "fallocate", [Fd, Int, Len, Len], NEEDS_FD),
    entry!(328, "eventfd2", [Int, Int], ACTIVE),
    entry!(329, "epoll_create1", [Int], ACTIVE),
    entry!(330, "dup3", [Fd, Fd, Int], AVOID),
    entry!(331, "pipe2", [Address, Int], ACTIVE),
    entry!(333, "preadv", [Fd, Iovec, IovecLen, Int], NEEDS_FD),
    entry!(334, "pwritev", [Fd, Iovec, IovecLen, Int], NEEDS_FD),
    entry!(340, "prlimit64", [Pid, Int, Address, Address], ACTIVE),
    entry!(344, "syncfs", [Fd], NEEDS_FD),
    entry!(355, "getrandom", [Address, Len, Int], ACTIVE),
    entry!(356, "memfd_create", [Pathname, Int], ACTIVE),
    entry!(359, "socket", [Int, Int, Int], ACTIVE),
    entry!(
        361,
        "bind",
        [Fd, Sockaddr(Some(PF_NETLINK)), SockaddrLen],
        NEEDS_FD
    ),
    entry!(362, "connect", [Fd, Sockaddr(None), SockaddrLen], NEEDS_FD),
    entry!(363, "listen", [Fd, Int], NEEDS_FD),
    entry!(364, "accept4", [Fd, Address, Address, Int], NEEDS_FD),
    entry!(365, "getsockopt", [Fd, Int, Int, Address, Address], NEEDS_FD),
    entry!(
        366,
        "setsockopt",
        [Fd, Int, Int, Address, Len],
        NEEDS_FD,
        sanitise_setsockopt
    ),
    entry!(367, "getsockname", [Fd, Address, Address], NEEDS_FD),
    entry!(368, "getpeername", [Fd, Address, Address], NEEDS_FD),
    entry!(
        369,
        "sendto",
        [Fd, Address, Len, Int, Sockaddr(Some(PF_INET6)), SockaddrLen],
        NEEDS_FD
    ),
    entry!(371, "recvfrom", [Fd, Address, Len, Int, Address, Address], NEEDS_FD),
    entry!(373, "shutdown", [Fd, Int], NEEDS_FD),
    entry!(383, "statx", [Fd, Pathname, Int, Int, Address], ACTIVE),
];
