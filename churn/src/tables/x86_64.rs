//! The 64-bit syscall table, indexed by the native x86_64 numbers.
//!
//! Flags follow the same policy as the 32-bit table: AVOID marks calls
//! that would disrupt the fuzzer's own process tree, descriptor pool, or
//! address space rather than the kernel under test.

use super::entry;
use super::ArgType;
use super::ArgType::{
    Address, Fd, Int, Iovec, IovecLen, Len, Mode, Pathname, Pid, Sockaddr, SockaddrLen,
};
use super::{SyscallDescriptor, SyscallFlags as F};

use crate::sanitise::ioctl::sanitise_ioctl;
use crate::sanitise::sanitise_setsockopt;
use crate::sanitise::sockaddr::{PF_INET, PF_UNIX};

const ACTIVE: F = F::ACTIVE;
const NEEDS_FD: F = F::ACTIVE.union(F::NEEDS_FD);
const AVOID: F = F::ACTIVE.union(F::AVOID);
const NI: F = F::NI;
const BORING: F = F::ACTIVE.union(F::BORING);

pub static TABLE: &[SyscallDescriptor] = &[
    entry!(0, "read", [Fd, Address, Len], NEEDS_FD),
    entry!(1, "write", [Fd, Address, Len], NEEDS_FD),
    entry!(2, "open", [Pathname, Int, Mode], ACTIVE),
    entry!(3, "close", [Fd], AVOID),
    entry!(4, "stat", [Pathname, Address], ACTIVE),
    entry!(5, "fstat", [Fd, Address], NEEDS_FD),
    entry!(6, "lstat", [Pathname, Address], ACTIVE),
    entry!(7, "poll", [Address, Len, Int], ACTIVE),
    entry!(8, "lseek", [Fd, Int, Int], NEEDS_FD),
    entry!(9, "mmap", [Address, Len, Int, Int, Fd, Int], ACTIVE),
    entry!(10, "mprotect", [Address, Len, Int], ACTIVE),
    entry!(11, "munmap", [Address, Len], AVOID),
    entry!(12, "brk", [Address], AVOID),
    entry!(13, "rt_sigaction", [Int, Address, Address, Len], AVOID),
    entry!(14, "rt_sigprocmask", [Int, Address, Address, Len], AVOID),
    entry!(16, "ioctl", [Fd, Int, Address], NEEDS_FD, sanitise_ioctl),
    entry!(17, "pread64", [Fd, Address, Len, Int], NEEDS_FD),
    entry!(18, "pwrite64", [Fd, Address, Len, Int], NEEDS_FD),
    entry!(19, "readv", [Fd, Iovec, IovecLen], NEEDS_FD),
    entry!(20, "writev", [Fd, Iovec, IovecLen], NEEDS_FD),
    entry!(21, "access", [Pathname, Mode], ACTIVE),
    entry!(22, "pipe", [Address], ACTIVE),
    entry!(23, "select", [Len, Address, Address, Address, Address], ACTIVE),
    entry!(24, "sched_yield", [], BORING),
    entry!(25, "mremap", [Address, Len, Len, Int, Address], AVOID),
    entry!(26, "msync", [Address, Len, Int], ACTIVE),
    entry!(27, "mincore", [Address, Len, Address], ACTIVE),
    entry!(28, "madvise", [Address, Len, Int], ACTIVE),
    entry!(29, "shmget", [Int, Len, Int], ACTIVE),
    entry!(30, "shmat", [Int, Address, Int], ACTIVE),
    entry!(31, "shmctl", [Int, Int, Address], ACTIVE),
    entry!(32, "dup", [Fd], NEEDS_FD),
    entry!(33, "dup2", [Fd, Fd], AVOID),
    entry!(34, "pause", [], AVOID),
    entry!(35, "nanosleep", [Address, Address], AVOID),
    entry!(36, "getitimer", [Int, Address], ACTIVE),
    entry!(37, "alarm", [Int], AVOID),
    entry!(38, "setitimer", [Int, Address, Address], AVOID),
    entry!(39, "getpid", [], BORING),
    entry!(40, "sendfile", [Fd, Fd, Address, Len], NEEDS_FD),
    entry!(41, "socket", [Int, Int, Int], ACTIVE),
    entry!(
        42,
        "connect",
        [Fd, Sockaddr(None), SockaddrLen],
        NEEDS_FD
    ),
    entry!(43, "accept", [Fd, Address, Address], NEEDS_FD),
    entry!(
        44,
        "sendto",
        [Fd, Address, Len, Int, Sockaddr(Some(PF_INET)), SockaddrLen],
        NEEDS_FD
    ),
    entry!(
        45,
        "recvfrom",
        [Fd, Address, Len, Int, Address, Address],
        NEEDS_FD
    ),
    entry!(46, "sendmsg", [Fd, Address, Int], NEEDS_FD),
    entry!(47, "recvmsg", [Fd, Address, Int], NEEDS_FD),
    entry!(48, "shutdown", [Fd, Int], NEEDS_FD),
    entry!(
        49,
        "bind",
        [Fd, Sockaddr(Some(PF_UNIX)), SockaddrLen],
        NEEDS_FD
    ),
    entry!(50, "listen", [Fd, Int], NEEDS_FD),
    entry!(51, "getsockname", [Fd, Address, Address], NEEDS_FD),
    entry!(52, "getpeername", [Fd, Address, Address], NEEDS_FD),
    entry!(53, "socketpair", [Int, Int, Int, Address], ACTIVE),
    entry!(
        54,
        "setsockopt",
        [Fd, Int, Int, Address, Len],
        NEEDS_FD,
        sanitise_setsockopt
    ),
    entry!(55, "getsockopt", [Fd, Int, Int, Address, Address], NEEDS_FD),
    entry!(56, "clone", [Int, Address, Address, Address, Int], AVOID),
    entry!(57, "fork", [], AVOID),
    entry!(58, "vfork", [], AVOID),
    entry!(59, "execve", [Pathname, Address, Address], AVOID),
    entry!(60, "exit", [Int], AVOID),
    entry!(61, "wait4", [Pid, Address, Int, Address], AVOID),
    entry!(62, "kill", [Pid, Int], AVOID),
    entry!(63, "uname", [Address], ACTIVE),
    entry!(72, "fcntl", [Fd, Int, Int], NEEDS_FD),
    entry!(73, "flock", [Fd, Int], NEEDS_FD),
    entry!(74, "fsync", [Fd], NEEDS_FD),
    entry!(75, "fdatasync", [Fd], NEEDS_FD),
    entry!(76, "truncate", [Pathname, Len], ACTIVE),
    entry!(77, "ftruncate", [Fd, Len], NEEDS_FD),
    entry!(78, "getdents", [Fd, Address, Len], NEEDS_FD),
    entry!(79, "getcwd", [Address, Len], ACTIVE),
    entry!(80, "chdir", [Pathname], ACTIVE),
    entry!(81, "fchdir", [Fd], NEEDS_FD),
    entry!(82, "rename", [Pathname, Pathname], ACTIVE),
    entry!(83, "mkdir", [Pathname, Mode], ACTIVE),
    entry!(84, "rmdir", [Pathname], ACTIVE),
    entry!(85, "creat", [Pathname, Mode], ACTIVE),
    entry!(86, "link", [Pathname, Pathname], ACTIVE),
    entry!(87, "unlink", [Pathname], ACTIVE),
    entry!(88, "symlink", [Pathname, Pathname], ACTIVE),
    entry!(89, "readlink", [Pathname, Address, Len], ACTIVE),
    entry!(90, "chmod", [Pathname, Mode], ACTIVE),
    entry!(91, "fchmod", [Fd, Mode], NEEDS_FD),
    entry!(92, "chown", [Pathname, Int, Int], ACTIVE),
    entry!(93, "fchown", [Fd, Int, Int], NEEDS_FD),
    entry!(94, "lchown", [Pathname, Int, Int], ACTIVE),
    entry!(95, "umask", [Mode], ACTIVE),
    entry!(96, "gettimeofday", [Address, Address], BORING),
    entry!(97, "getrlimit", [Int, Address], ACTIVE),
    entry!(98, "getrusage", [Int, Address], ACTIVE),
    entry!(99, "sysinfo", [Address], ACTIVE),
    entry!(100, "times", [Address], ACTIVE),
    entry!(101, "ptrace", [Int, Pid, Address, Address], AVOID),
    entry!(103, "syslog", [Int, Address, Len], ACTIVE),
    entry!(105, "setuid", [Int], ACTIVE),
    entry!(106, "setgid", [Int], ACTIVE),
    entry!(109, "setpgid", [Pid, Pid], AVOID),
    entry!(113, "setreuid", [Int, Int], ACTIVE),
    entry!(114, "setregid", [Int, Int], ACTIVE),
    entry!(115, "getgroups", [Int, Address], ACTIVE),
    entry!(116, "setgroups", [Len, Address], ACTIVE),
    entry!(121, "getpgid", [Pid], ACTIVE),
    entry!(124, "getsid", [Pid], ACTIVE),
    entry!(125, "capget", [Address, Address], ACTIVE),
    entry!(126, "capset", [Address, Address], ACTIVE),
    entry!(127, "rt_sigpending", [Address, Len], ACTIVE),
    entry!(130, "rt_sigsuspend", [Address, Len], AVOID),
    entry!(132, "utime", [Pathname, Address], ACTIVE),
    entry!(133, "mknod", [Pathname, Mode, Int], ACTIVE),
    entry!(134, "uselib", [], NI),
    entry!(137, "statfs", [Pathname, Address], ACTIVE),
    entry!(138, "fstatfs", [Fd, Address], NEEDS_FD),
    entry!(139, "sysfs", [Int, Int, Int], ACTIVE),
    entry!(140, "getpriority", [Int, Int], ACTIVE),
    entry!(141, "setpriority", [Int, Int, Int], ACTIVE),
    entry!(157, "prctl", [Int, Int, Int, Int, Int], AVOID),
    entry!(158, "arch_prctl", [Int, Address], AVOID),
    entry!(161, "chroot", [Pathname], ACTIVE),
    entry!(162, "sync", [], BORING),
    entry!(165, "mount", [Pathname, Pathname, Address, Int, Address], ACTIVE),
    entry!(166, "umount2", [Pathname, Int], ACTIVE),
    entry!(169, "reboot", [Int, Int, Int, Address], AVOID),
    entry!(174, "create_module", [], NI),
    entry!(175, "init_module", [Address, Len, Address], AVOID),
    entry!(176, "delete_module", [Address, Int], AVOID),
    entry!(177, "get_kernel_syms", [], NI),
    entry!(178, "query_module", [], NI),
    entry!(187, "readahead", [Fd, Int, Len], NEEDS_FD),
    entry!(188, "setxattr", [Pathname, Address, Address, Len, Int], ACTIVE),
    entry!(191, "getxattr", [Pathname, Address, Address, Len], ACTIVE),
    entry!(194, "listxattr", [Pathname, Address, Len], ACTIVE),
    entry!(197, "removexattr", [Pathname, Address], ACTIVE),
    entry!(200, "tkill", [Pid, Int], AVOID),
    entry!(201, "time", [Address], BORING),
    entry!(202, "futex", [Address, Int, Int, Address, Address, Int], ACTIVE),
    entry!(203, "sched_setaffinity", [Pid, Len, Address], ACTIVE),
    entry!(204, "sched_getaffinity", [Pid, Len, Address], ACTIVE),
    entry!(213, "epoll_create", [Int], ACTIVE),
    entry!(217, "getdents64", [Fd, Address, Len], NEEDS_FD),
    entry!(221, "fadvise64", [Fd, Int, Len, Int], NEEDS_FD),
    entry!(228, "clock_gettime", [Int, Address], ACTIVE),
    entry!(230, "clock_nanosleep", [Int, Int, Address, Address], AVOID),
    entry!(231, "exit_group", [Int], AVOID),
    entry!(232, "epoll_wait", [Fd, Address, Int, Int], NEEDS_FD),
    entry!(233, "epoll_ctl", [Fd, Int, Fd, Address], NEEDS_FD),
    entry!(234, "tgkill", [Pid, Pid, Int], AVOID),
    entry!(235, "utimes", [Pathname, Address], ACTIVE),
    entry!(257, "openat", [Fd, Pathname, Int, Mode], ACTIVE),
    entry!(258, "mkdirat", [Fd, Pathname, Mode], ACTIVE),
    entry!(259, "mknodat", [Fd, Pathname, Mode, Int], ACTIVE),
    entry!(260, "fchownat", [Fd, Pathname, Int, Int, Int], ACTIVE),
    entry!(262, "newfstatat", [Fd, Pathname, Address, Int], ACTIVE),
    entry!(263, "unlinkat", [Fd, Pathname, Int], ACTIVE),
    entry!(266, "symlinkat", [Pathname, Fd, Pathname], ACTIVE),
    entry!(267, "readlinkat", [Fd, Pathname, Address, Len], ACTIVE),
    entry!(275, "splice", [Fd, Address, Fd, Address, Len, Int], NEEDS_FD),
    entry!(276, "tee", [Fd, Fd, Len, Int], NEEDS_FD),
    entry!(278, "vmsplice", [Fd, Iovec, IovecLen, Int], NEEDS_FD),
    entry!(280, "utimensat", [Fd, Pathname, Address, Int], ACTIVE),
    entry!(284, "eventfd", [Int], ACTIVE),
    entry!(285, "fallocate", [Fd, Int, Len, Len], NEEDS_FD),
    entry!(288, "accept4", [Fd, Address, Address, Int], NEEDS_FD),
    entry!(290, "eventfd2", [Int, Int], ACTIVE),
    entry!(291, "epoll_create1", [Int], ACTIVE),
    entry!(292, "dup3", [Fd, Fd, Int], AVOID),
    entry!(293, "pipe2", [Address, Int], ACTIVE),
    entry!(295, "preadv", [Fd, Iovec, IovecLen, Int], NEEDS_FD),
    entry!(296, "pwritev", [Fd, Iovec, IovecLen, Int], NEEDS_FD),
    entry!(302, "prlimit64", [Pid, Int, Address, Address], ACTIVE),
    entry!(306, "syncfs", [Fd], NEEDS_FD),
    // getcpu's third argument is the long-dead tcache pointer.
    entry!(309, "getcpu", [Address, Address, ArgType::None], ACTIVE),
    entry!(318, "getrandom", [Address, Len, Int], ACTIVE),
    entry!(319, "memfd_create", [Pathname, Int], ACTIVE),
    entry!(332, "statx", [Fd, Pathname, Int, Int, Address], ACTIVE),
];
