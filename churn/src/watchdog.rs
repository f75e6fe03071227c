//! The watchdog: an independent process that polls the shared block for
//! liveness and sanity, kills stuck workers, and declares terminal exit
//! reasons the supervisor then acts on.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use churn_syscall::result::ESRCH;
use churn_syscall::SIGKILL;

use crate::params::Params;
use crate::shm::{now_secs, ExitReason, Shm, EMPTY_PIDSLOT, PID_MAX_LIMIT};
use crate::tables::{Abi, ArgType, Table};
use crate::taint;

/// The comm name, for `ps` visibility. prctl caps names at 15 bytes.
const WATCHDOG_NAME: &[u8] = b"churn-watchdog\0";

/// Ticks between forced reseeds: about five minutes at one tick a second.
const RESEED_PERIOD_TICKS: u32 = 300;

/// Progress line cadence, in completed calls.
const PROGRESS_EVERY: u64 = 10_000;

/// What the stall monitor should do about one worker's heartbeat.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StuckAction {
    /// Healthy, brand new, or not yet interesting.
    Skip,
    /// Heartbeat is in the future: the clock wrapped or was reset.
    ResetWrap,
    /// Delta is so large we are comparing garbage.
    ResetNonsense,
    /// Thirty seconds without progress: kill the worker.
    Kill,
    /// Past the kill window and still around; log and stop counting.
    ResetGaveUp,
}

/// The stall rules, pure so they can be table-tested. Heartbeats are
/// whole seconds and the watchdog ticks once a second, so the
/// thirty-second equality fires exactly once per stall.
pub fn stuck_action(now: u64, heartbeat: u64) -> StuckAction {
    if heartbeat == 0 {
        return StuckAction::Skip;
    }
    if heartbeat > now + 3 {
        return StuckAction::ResetWrap;
    }
    let diff = now.saturating_sub(heartbeat);
    if diff > 1000 {
        return StuckAction::ResetNonsense;
    }
    if diff == 30 {
        return StuckAction::Kill;
    }
    if diff > 60 {
        return StuckAction::ResetGaveUp;
    }
    StuckAction::Skip
}

/// Invariant checks over the shared block. Returns true when the block
/// can no longer be trusted (and the exit reason has been latched).
fn check_shm_sanity(shm: &Shm, corruption_threshold: u64) -> bool {
    if shm.running.load(Ordering::Relaxed) == 0 {
        return false;
    }
    for slot in &shm.children {
        let pid = slot.pid.load(Ordering::Relaxed);
        if pid == EMPTY_PIDSLOT {
            continue;
        }
        if pid < 2 || pid > PID_MAX_LIMIT {
            warn!("[watchdog] pid slot holds nonsense pid {}", pid);
            shm.set_exit_reason(ExitReason::PidOutOfRange);
            return true;
        }
    }

    let total = shm.total_done.load(Ordering::Relaxed);
    let previous = shm.previous_count.load(Ordering::Relaxed);
    if total.saturating_sub(previous) > corruption_threshold {
        warn!(
            "[watchdog] exec count jumped implausibly (old:{} new:{})",
            previous, total
        );
        shm.set_exit_reason(ExitReason::ShmCorruption);
        return true;
    }
    shm.previous_count.store(total, Ordering::Relaxed);
    false
}

fn check_main(shm: &Shm) {
    let pid = shm.parent_pid.load(Ordering::Relaxed);
    if let Err(e) = unsafe { churn_syscall::kill(pid, 0) } {
        if e.raw() == ESRCH {
            warn!("[watchdog] main pid {} has disappeared", pid);
            shm.set_exit_reason(ExitReason::MainDisappeared);
        } else {
            warn!("[watchdog] problem checking on pid {} (errno {})", pid, e.raw());
        }
    }
}

/// Clear slots whose pid no longer exists (OOM-reaped workers never get
/// a SIGCHLD to us). Returns how many workers are still alive.
fn reap_dead_kids(shm: &Shm) -> u32 {
    let mut alive = 0;
    let mut reaped = 0;
    for slot in &shm.children {
        let pid = slot.pid.load(Ordering::Relaxed);
        if pid == EMPTY_PIDSLOT {
            continue;
        }
        match unsafe { churn_syscall::kill(pid, 0) } {
            Ok(_) => alive += 1,
            Err(e) if e.raw() == ESRCH => {
                info!("[watchdog] pid {} has disappeared (oom-killed maybe?), reaping", pid);
                if slot
                    .pid
                    .compare_exchange(pid, EMPTY_PIDSLOT, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    let _ = shm
                        .running
                        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
                    reaped += 1;
                }
            }
            Err(e) => {
                warn!("[watchdog] problem checking on pid {} (errno {})", pid, e.raw());
            }
        }
    }
    if reaped != 0 {
        info!("[watchdog] reaped {} dead children", reaped);
    }
    alive
}

fn check_children(shm: &Shm) {
    let now = now_secs();
    for (i, slot) in shm.children.iter().enumerate() {
        let pid = slot.pid.load(Ordering::Relaxed);
        if pid == EMPTY_PIDSLOT {
            continue;
        }
        let heartbeat = slot.heartbeat.load(Ordering::Relaxed);
        match stuck_action(now, heartbeat) {
            StuckAction::Skip => {}
            StuckAction::ResetWrap => {
                warn!(
                    "[watchdog] child {} heartbeat wrapped (hb:{} now:{}), resetting",
                    i, heartbeat, now
                );
                slot.heartbeat.store(now, Ordering::Relaxed);
            }
            StuckAction::ResetNonsense => {
                warn!(
                    "[watchdog] huge heartbeat delta for slot {} [{}] (hb:{} now:{}), resetting",
                    i, pid, heartbeat, now
                );
                slot.heartbeat.store(now, Ordering::Relaxed);
            }
            StuckAction::Kill => {
                let nr = slot.syscall_nr.load(Ordering::Relaxed);
                let abi = if slot.do32bit.load(Ordering::Relaxed) != 0 {
                    Abi::Bits32
                } else {
                    Abi::Bits64
                };
                let desc = Table::get(abi).lookup(nr);
                let name = desc.map(|d| d.name).unwrap_or("unknown");
                let fdstr = match desc {
                    Some(d) if d.args.first() == Some(&ArgType::Fd) => {
                        format!(" (fd = {})", slot.args[0].load(Ordering::Relaxed))
                    }
                    _ => String::new(),
                };
                warn!(
                    "[watchdog] pid {} hasn't made progress in 30 seconds! stuck in {}:{}{}{}. sending SIGKILL",
                    pid,
                    nr,
                    name,
                    if abi == Abi::Bits32 { " (32bit)" } else { "" },
                    fdstr
                );
                unsafe {
                    let _ = churn_syscall::kill(pid, SIGKILL);
                }
                break;
            }
            StuckAction::ResetGaveUp => {
                warn!(
                    "[watchdog] pid {} hasn't made progress in {} seconds, giving up on it",
                    pid,
                    now.saturating_sub(heartbeat)
                );
                slot.heartbeat.store(now, Ordering::Relaxed);
            }
        }
    }
}

/// Terminal cleanup: keep reaping and SIGKILLing until no worker remains.
/// Vanished pids clear their own slots via `reap_dead_kids`; zombies are
/// the supervisor's to collect, so this loop ends once every slot owner
/// is truly gone.
fn kill_all_kids(shm: &Shm) {
    while shm.running.load(Ordering::Relaxed) > 0 {
        if reap_dead_kids(shm) == 0 {
            return;
        }
        for slot in &shm.children {
            let pid = slot.pid.load(Ordering::Relaxed);
            if pid == EMPTY_PIDSLOT {
                continue;
            }
            unsafe {
                let _ = churn_syscall::kill(pid, SIGKILL);
            }
        }
        thread::sleep(Duration::from_secs(1));
    }
}

/// The watchdog process body. Never returns; exits the process directly.
pub fn watchdog(shm: &Shm, params: &Params) -> ! {
    let pid = unsafe { churn_syscall::getpid() };
    shm.watchdog_pid.store(pid, Ordering::Relaxed);
    unsafe {
        let _ = churn_syscall::prctl(
            churn_syscall::PR_SET_NAME,
            WATCHDOG_NAME.as_ptr() as churn_syscall::ulong,
        );
    }
    info!("[{}] watchdog is alive", pid);

    let mut last_count: u64 = 0;
    loop {
        if !shm.is_regenerating() {
            if check_shm_sanity(shm, params.corruption_threshold) {
                break;
            }

            reap_dead_kids(shm);
            check_main(shm);
            check_children(shm);

            if let Some(todo) = params.syscalls_todo {
                if shm.total_done.load(Ordering::Relaxed) >= todo {
                    info!("[watchdog] reached limit {}, telling children to exit", todo);
                    shm.set_exit_reason(ExitReason::ReachedCount);
                }
            }

            let total = shm.total_done.load(Ordering::Relaxed);
            if total.saturating_sub(last_count) > PROGRESS_EVERY {
                info!(
                    "[watchdog] {} iterations [F:{} S:{}]",
                    total,
                    shm.failures.load(Ordering::Relaxed),
                    shm.successes.load(Ordering::Relaxed)
                );
                last_count = total;
            }
        }

        if !params.ignore_tainted {
            let tainted = taint::read_taint();
            if tainted != 0 {
                warn!(
                    "[watchdog] kernel became tainted! ({:#x}) last seed was {}",
                    tainted,
                    shm.seed.load(Ordering::Relaxed)
                );
                shm.set_exit_reason(ExitReason::KernelTainted);
            }
        }

        if !shm.needs_reseed() {
            let ticks = shm.reseed_counter.fetch_add(1, Ordering::Relaxed) + 1;
            if ticks >= RESEED_PERIOD_TICKS {
                info!("[watchdog] triggering periodic reseed");
                shm.set_need_reseed(true);
                shm.reseed_counter.store(0, Ordering::Relaxed);
            }
        }

        if !shm.still_running() {
            // Give children a chance to notice and leave on their own.
            thread::sleep(Duration::from_secs(1));
            if shm.occupied_slots() == 0 {
                break;
            }
            info!(
                "[watchdog] exit_reason={:?}, but {} children still running",
                shm.exit_reason(),
                shm.running.load(Ordering::Relaxed)
            );
            kill_all_kids(shm);
        }

        thread::sleep(Duration::from_secs(1));
    }

    // Never leave while the supervisor is mid-regeneration; it would win
    // a respawn race against our kill pass.
    while shm.is_regenerating() {
        thread::sleep(Duration::from_secs(1));
    }
    kill_all_kids(shm);
    info!("[{}] watchdog exiting", pid);
    unsafe { churn_syscall::exit_group(0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::test_block;

    #[test]
    fn stall_rules() {
        let now = 1_000_000;
        assert_eq!(stuck_action(now, 0), StuckAction::Skip);
        assert_eq!(stuck_action(now, now), StuckAction::Skip);
        assert_eq!(stuck_action(now, now - 1), StuckAction::Skip);
        assert_eq!(stuck_action(now, now - 29), StuckAction::Skip);
        assert_eq!(stuck_action(now, now - 30), StuckAction::Kill);
        assert_eq!(stuck_action(now, now - 31), StuckAction::Skip);
        assert_eq!(stuck_action(now, now - 61), StuckAction::ResetGaveUp);
        assert_eq!(stuck_action(now, now - 1001), StuckAction::ResetNonsense);
        assert_eq!(stuck_action(now, now + 2), StuckAction::Skip);
        assert_eq!(stuck_action(now, now + 4), StuckAction::ResetWrap);
    }

    #[test]
    fn sanity_passes_on_an_idle_block() {
        let shm = test_block();
        assert!(!check_shm_sanity(&shm, 500_000));
        assert!(shm.still_running());
    }

    #[test]
    fn sanity_catches_nonsense_pids() {
        let shm = test_block();
        shm.running.store(1, Ordering::Relaxed);
        shm.children[0].pid.store(-7, Ordering::Relaxed);
        assert!(check_shm_sanity(&shm, 500_000));
        assert_eq!(shm.exit_reason(), ExitReason::PidOutOfRange);
    }

    #[test]
    fn sanity_catches_counter_jumps() {
        let shm = test_block();
        shm.running.store(1, Ordering::Relaxed);
        shm.children[0].pid.store(1234, Ordering::Relaxed);
        shm.total_done.store(600_000, Ordering::Relaxed);
        assert!(check_shm_sanity(&shm, 500_000));
        assert_eq!(shm.exit_reason(), ExitReason::ShmCorruption);
    }

    #[test]
    fn sanity_threshold_is_a_parameter() {
        let shm = test_block();
        shm.running.store(1, Ordering::Relaxed);
        shm.children[0].pid.store(1234, Ordering::Relaxed);
        shm.total_done.store(600_000, Ordering::Relaxed);
        assert!(!check_shm_sanity(&shm, 1_000_000));
        assert!(shm.still_running());
        // And the baseline advanced for the next tick.
        assert_eq!(shm.previous_count.load(Ordering::Relaxed), 600_000);
    }

    #[test]
    fn reaping_clears_vanished_pids() {
        let shm = test_block();
        // A pid that cannot exist: far beyond the kernel's pid cap but
        // well-formed, so kill() reports ESRCH.
        shm.children[2].pid.store(0x3ffff0, Ordering::Relaxed);
        shm.running.store(1, Ordering::Relaxed);
        let alive = reap_dead_kids(&shm);
        assert_eq!(alive, 0);
        assert!(shm.children[2].is_empty());
        assert_eq!(shm.running.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn reaping_keeps_live_pids() {
        let shm = test_block();
        let me = unsafe { churn_syscall::getpid() };
        shm.children[0].pid.store(me, Ordering::Relaxed);
        shm.running.store(1, Ordering::Relaxed);
        let alive = reap_dead_kids(&shm);
        assert_eq!(alive, 1);
        assert!(!shm.children[0].is_empty());
        assert_eq!(shm.running.load(Ordering::Relaxed), 1);
    }
}
