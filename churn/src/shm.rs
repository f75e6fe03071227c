//! The shared control block: the one piece of state visible to the
//! supervisor, the watchdog, and every worker at once.
//!
//! The block lives in an anonymous `MAP_SHARED` mapping created before any
//! fork, so all descendants address the same bytes. Every field is an
//! atomic integer; no pointers cross the process boundary. The layout is
//! arranged so that the zero-filled fresh mapping is already a valid
//! initial state: `ExitReason::StillRunning` is zero and an empty pid slot
//! is zero.
//!
//! Write discipline: the supervisor owns slot `pid` fields (the watchdog
//! may clear them when reaping a vanished child); each worker owns its own
//! heartbeat, current-syscall, and argument log; `exit_reason` is a
//! one-way latch that any observer may try to set exactly once.

use std::ops::Deref;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use static_assertions::const_assert;

pub const MAX_CHILDREN: usize = 64;
pub const NR_FILE_FDS: usize = 250;
pub const NR_SOCKET_FDS: usize = 16;
pub const EMPTY_PIDSLOT: i32 = 0;

/// Largest pid the kernel will ever hand out (`pid_max` is capped at
/// 2^22 on 64-bit). Used by the watchdog's sanity check.
pub const PID_MAX_LIMIT: i32 = 4 * 1024 * 1024;

/// Why the run is over. `StillRunning` is the initial, non-terminal state;
/// every other value is terminal and latches.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum ExitReason {
    StillRunning = 0,
    SigInt = 1,
    ReachedCount = 2,
    NoSyscallsEnabled = 3,
    MainDisappeared = 4,
    PidOutOfRange = 5,
    ShmCorruption = 6,
    KernelTainted = 7,
}

impl ExitReason {
    fn from_u32(v: u32) -> ExitReason {
        match v {
            1 => ExitReason::SigInt,
            2 => ExitReason::ReachedCount,
            3 => ExitReason::NoSyscallsEnabled,
            4 => ExitReason::MainDisappeared,
            5 => ExitReason::PidOutOfRange,
            6 => ExitReason::ShmCorruption,
            7 => ExitReason::KernelTainted,
            _ => ExitReason::StillRunning,
        }
    }

    /// Reasons that indicate the fuzzer itself went wrong, not the run
    /// merely ending. These map to a non-zero process exit status.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ExitReason::MainDisappeared | ExitReason::PidOutOfRange | ExitReason::ShmCorruption
        )
    }
}

/// Per-child state, indexed by slot number.
#[repr(C)]
pub struct ChildSlot {
    pub pid: AtomicI32,
    /// Wall-clock seconds, written by the owning worker before each call.
    pub heartbeat: AtomicU64,
    /// The syscall number the worker is about to issue.
    pub syscall_nr: AtomicU32,
    /// Non-zero when the call went through the 32-bit table.
    pub do32bit: AtomicU32,
    /// The seed this slot's incarnations derive their stream from.
    pub seed: AtomicU32,
    /// The argument words of the call in flight, for the stuck report.
    pub args: [AtomicU64; 6],
}

impl ChildSlot {
    pub fn is_empty(&self) -> bool {
        self.pid.load(Ordering::Relaxed) == EMPTY_PIDSLOT
    }
}

#[repr(C)]
pub struct Shm {
    exit_reason: AtomicU32,
    pub running: AtomicU32,
    pub total_done: AtomicU64,
    pub previous_count: AtomicU64,
    pub successes: AtomicU64,
    pub failures: AtomicU64,
    pub need_reseed: AtomicU32,
    pub regenerating: AtomicU32,
    pub reseed_counter: AtomicU32,
    pub seed: AtomicU32,
    pub watchdog_pid: AtomicI32,
    pub parent_pid: AtomicI32,
    pub nr_file_fds: AtomicU32,
    pub current_fd: AtomicU32,
    pub fd_lifetime: AtomicU32,
    pub file_fds: [AtomicI32; NR_FILE_FDS],
    pub socket_fds: [AtomicI32; NR_SOCKET_FDS],
    pub children: [ChildSlot; MAX_CHILDREN],
}

const_assert!(std::mem::size_of::<Shm>() <= 4 * 4096);

impl Shm {
    pub fn exit_reason(&self) -> ExitReason {
        ExitReason::from_u32(self.exit_reason.load(Ordering::Acquire))
    }

    pub fn still_running(&self) -> bool {
        self.exit_reason() == ExitReason::StillRunning
    }

    /// Latch the exit reason. The first terminal writer wins; later calls
    /// are ignored. Returns whether this call did the latching.
    pub fn set_exit_reason(&self, reason: ExitReason) -> bool {
        if reason == ExitReason::StillRunning {
            return false;
        }
        self.exit_reason
            .compare_exchange(
                ExitReason::StillRunning as u32,
                reason as u32,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn child(&self, childno: usize) -> &ChildSlot {
        &self.children[childno]
    }

    pub fn is_regenerating(&self) -> bool {
        self.regenerating.load(Ordering::Relaxed) != 0
    }

    pub fn set_regenerating(&self, on: bool) {
        self.regenerating.store(on as u32, Ordering::Relaxed);
    }

    pub fn needs_reseed(&self) -> bool {
        self.need_reseed.load(Ordering::Relaxed) != 0
    }

    pub fn set_need_reseed(&self, on: bool) {
        self.need_reseed.store(on as u32, Ordering::Relaxed);
    }

    /// The slot index owning `pid`, if any.
    pub fn slot_of_pid(&self, pid: i32) -> Option<usize> {
        if pid == EMPTY_PIDSLOT {
            return None;
        }
        self.children
            .iter()
            .position(|s| s.pid.load(Ordering::Relaxed) == pid)
    }

    /// How many slots currently hold a pid. The `running` counter must
    /// agree with this at quiescent points.
    pub fn occupied_slots(&self) -> u32 {
        self.children.iter().filter(|s| !s.is_empty()).count() as u32
    }
}

/// Owner of the shared mapping. Created once by the supervisor before any
/// fork; dereferences to the block itself. The handle is passed explicitly
/// everywhere rather than living in a global.
pub struct SharedMap {
    ptr: *mut Shm,
}

impl SharedMap {
    pub fn new() -> std::io::Result<SharedMap> {
        let len = std::mem::size_of::<Shm>();
        let ptr = unsafe {
            churn_syscall::mmap(
                std::ptr::null_mut(),
                len,
                churn_syscall::PROT_READ | churn_syscall::PROT_WRITE,
                churn_syscall::MAP_SHARED | churn_syscall::MAP_ANONYMOUS,
                -1,
                0,
            )
        }
        .map_err(|e| std::io::Error::from_raw_os_error(e.raw()))?;
        // The mapping is zero-filled, which is exactly the initial state.
        Ok(SharedMap {
            ptr: ptr as *mut Shm,
        })
    }
}

impl Deref for SharedMap {
    type Target = Shm;

    fn deref(&self) -> &Shm {
        unsafe { &*self.ptr }
    }
}

impl Drop for SharedMap {
    fn drop(&mut self) {
        unsafe {
            let _ = churn_syscall::munmap(
                self.ptr as *mut churn_syscall::void,
                std::mem::size_of::<Shm>(),
            );
        }
    }
}

/// Wall-clock seconds, the unit of the heartbeat log.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A control block on the heap for tests that don't need a shared
/// mapping; zeroed memory matches the fresh-mmap initial state.
#[cfg(test)]
pub fn test_block() -> Box<Shm> {
    unsafe { Box::new(std::mem::zeroed()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Box<Shm> {
        test_block()
    }

    #[test]
    fn zero_state_is_still_running() {
        let shm = fresh();
        assert_eq!(shm.exit_reason(), ExitReason::StillRunning);
        assert!(shm.still_running());
        assert_eq!(shm.occupied_slots(), 0);
    }

    #[test]
    fn exit_reason_latches_one_way() {
        let shm = fresh();
        assert!(shm.set_exit_reason(ExitReason::ReachedCount));
        assert_eq!(shm.exit_reason(), ExitReason::ReachedCount);
        // A second terminal writer loses.
        assert!(!shm.set_exit_reason(ExitReason::SigInt));
        assert_eq!(shm.exit_reason(), ExitReason::ReachedCount);
        // And the latch can never be re-armed.
        assert!(!shm.set_exit_reason(ExitReason::StillRunning));
        assert_eq!(shm.exit_reason(), ExitReason::ReachedCount);
    }

    #[test]
    fn occupied_slots_tracks_pids() {
        let shm = fresh();
        shm.children[0].pid.store(100, Ordering::Relaxed);
        shm.children[5].pid.store(200, Ordering::Relaxed);
        assert_eq!(shm.occupied_slots(), 2);
        assert_eq!(shm.slot_of_pid(200), Some(5));
        assert_eq!(shm.slot_of_pid(300), None);
        assert_eq!(shm.slot_of_pid(EMPTY_PIDSLOT), None);
        shm.children[5].pid.store(EMPTY_PIDSLOT, Ordering::Relaxed);
        assert_eq!(shm.occupied_slots(), 1);
    }

    #[test]
    fn failure_reasons_map_to_nonzero_exit() {
        assert!(ExitReason::ShmCorruption.is_failure());
        assert!(ExitReason::PidOutOfRange.is_failure());
        assert!(ExitReason::MainDisappeared.is_failure());
        assert!(!ExitReason::SigInt.is_failure());
        assert!(!ExitReason::ReachedCount.is_failure());
        assert!(!ExitReason::KernelTainted.is_failure());
        assert!(!ExitReason::NoSyscallsEnabled.is_failure());
    }
}
