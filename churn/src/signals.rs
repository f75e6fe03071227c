//! Signal plumbing for the supervisor. SIGINT and SIGCHLD are blocked
//! before any fork (so every descendant inherits the block and never gets
//! interrupted mid-call by a terminal ^C) and read back as data from a
//! non-blocking signalfd in the supervisor's main loop. No async handler,
//! no handler-visible global state.

use std::io;

use churn_syscall::sigset::sigset_t;
use churn_syscall::{
    signalfd_siginfo, SFD_CLOEXEC, SFD_NONBLOCK, SIGCHLD, SIGINT, SIG_BLOCK,
};

pub struct SignalFd {
    fd: i32,
}

impl SignalFd {
    /// Block SIGINT and SIGCHLD for this process (and all future
    /// children) and open a signalfd reporting them.
    pub fn new() -> io::Result<SignalFd> {
        let mut set = sigset_t::new_empty();
        set.sigaddset(SIGINT)
            .and_then(|_| set.sigaddset(SIGCHLD))
            .map_err(|e| io::Error::from_raw_os_error(e.raw()))?;
        unsafe {
            churn_syscall::rt_sigprocmask(SIG_BLOCK, set.as_ptr(), std::ptr::null_mut())
                .map_err(|e| io::Error::from_raw_os_error(e.raw()))?;
        }
        let fd = unsafe { churn_syscall::signalfd4(-1, set.as_ptr(), SFD_NONBLOCK | SFD_CLOEXEC) }
            .map_err(|e| io::Error::from_raw_os_error(e.raw()))?;
        Ok(SignalFd { fd })
    }

    /// Drain every queued signal, returning the signal numbers seen.
    pub fn drain(&self) -> Vec<u32> {
        let mut out = Vec::new();
        loop {
            let mut info = signalfd_siginfo::zeroed();
            let n = unsafe {
                churn_syscall::read(
                    self.fd,
                    &mut info as *mut signalfd_siginfo as *mut churn_syscall::void,
                    core::mem::size_of::<signalfd_siginfo>(),
                )
            };
            match n {
                Ok(n) if n as usize == core::mem::size_of::<signalfd_siginfo>() => {
                    out.push(info.ssi_signo);
                }
                _ => break,
            }
        }
        out
    }
}

impl Drop for SignalFd {
    fn drop(&mut self) {
        unsafe {
            let _ = churn_syscall::close(self.fd);
        }
    }
}
