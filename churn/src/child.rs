//! The worker loop: the body of each fuzzing child.
//!
//! Fault recovery is by re-incarnation: workers install no signal
//! handlers, so a synthesis fault kills the child with default
//! disposition and the supervisor respawns the slot with its preserved
//! seed. The loop therefore only has to worry about cooperative exits.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::files::FileIndex;
use crate::params::Params;
use crate::rnd::Rnd;
use crate::sanitise::Synth;
use crate::shm::{ExitReason, Shm};
use crate::syscall::mkcall;
use crate::tables::{Abi, Pick, Table};

/// Choose the table this call goes through. A forced ABI is honoured even
/// if its table is dead (the caller then declares NO_SYSCALLS_ENABLED);
/// in biarch mode a dead table forces the other one.
pub fn select_table(params: &Params, rnd: &mut Rnd) -> Option<(Abi, Table)> {
    if let Some(abi) = params.force_abi {
        let t = Table::get(abi);
        return t.has_enabled().then_some((abi, t));
    }
    if !Abi::biarch() {
        let abi = Abi::native();
        let t = Table::get(abi);
        return t.has_enabled().then_some((abi, t));
    }
    let mut abi = if rnd.chance(params.chance_32bit) {
        Abi::Bits32
    } else {
        Abi::Bits64
    };
    let mut t = Table::get(abi);
    if !t.has_enabled() {
        abi = match abi {
            Abi::Bits32 => Abi::Bits64,
            Abi::Bits64 => Abi::Bits32,
        };
        t = Table::get(abi);
        if !t.has_enabled() {
            return None;
        }
    }
    Some((abi, t))
}

pub fn child_process(shm: &Shm, params: &Params, index: &FileIndex, childno: usize) {
    let pid = unsafe { churn_syscall::getpid() };
    let slot = shm.child(childno);
    let seed = slot.seed.load(Ordering::Relaxed);
    let mut synth = Synth::new(Rnd::new(seed.wrapping_add(childno as u32)), shm, index);
    debug!("[{}] child {} starting with seed {}", pid, childno, seed);

    while shm.still_running() {
        // A reparented worker has lost its supervisor; stop churning.
        if unsafe { churn_syscall::getppid() } != shm.parent_pid.load(Ordering::Relaxed) {
            info!("[{}] parent has gone away, exiting", pid);
            break;
        }

        if shm.is_regenerating() {
            thread::sleep(Duration::from_secs(1));
            continue;
        }

        let global_seed = shm.seed.load(Ordering::Relaxed);
        if global_seed != slot.seed.load(Ordering::Relaxed) {
            slot.seed.store(global_seed, Ordering::Relaxed);
            synth.reseed(global_seed.wrapping_add(childno as u32));
            debug!("[{}] reseeded to {}", pid, global_seed);
        }

        let Some((abi, table)) = select_table(params, &mut synth.rnd) else {
            info!("[{}] no more syscalls enabled, exiting", pid);
            shm.set_exit_reason(ExitReason::NoSyscallsEnabled);
            break;
        };

        if let Some(todo) = params.syscalls_todo {
            let done = shm.total_done.load(Ordering::Relaxed);
            if done >= todo {
                info!("[{}] reached requested count ({} >= {})", pid, done, todo);
                shm.set_exit_reason(ExitReason::ReachedCount);
                break;
            }
        }

        match table.pick(&mut synth.rnd) {
            Pick::Picked(i) => {
                mkcall(shm, childno, &table.entries[i], abi, &mut synth);
            }
            Pick::Exhausted => {
                // A table that still has enabled entries can exhaust the
                // retry budget on a bad streak; only a truly dead pair of
                // tables is terminal.
                if !table.has_enabled() {
                    info!("[{}] no more syscalls enabled, exiting", pid);
                    shm.set_exit_reason(ExitReason::NoSyscallsEnabled);
                    break;
                }
            }
        }
    }
    debug!("[{}] child {} exiting", pid, childno);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;

    #[test]
    fn forced_abi_is_honoured() {
        let mut rnd = Rnd::new(1);
        let mut params = Params::default();
        params.force_abi = Some(Abi::Bits32);
        let (abi, table) = select_table(&params, &mut rnd).unwrap();
        assert_eq!(abi, Abi::Bits32);
        assert_eq!(table.abi, Abi::Bits32);
    }

    #[test]
    fn zero_chance_never_picks_32bit() {
        let mut rnd = Rnd::new(2);
        let mut params = Params::default();
        params.chance_32bit = 0;
        for _ in 0..100 {
            let (abi, _) = select_table(&params, &mut rnd).unwrap();
            if Abi::biarch() {
                assert_eq!(abi, Abi::Bits64);
            } else {
                assert_eq!(abi, Abi::native());
            }
        }
    }

    #[test]
    fn full_chance_always_picks_32bit_on_biarch() {
        if !Abi::biarch() {
            return;
        }
        let mut rnd = Rnd::new(3);
        let mut params = Params::default();
        params.chance_32bit = 100;
        for _ in 0..100 {
            let (abi, _) = select_table(&params, &mut rnd).unwrap();
            assert_eq!(abi, Abi::Bits32);
        }
    }
}
