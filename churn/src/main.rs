//! churn: a Linux kernel system call fuzzer.
//!
//! The supervisor process owns the shared control block, the file index,
//! and the worker pool. It forks one watchdog plus N workers, then sits
//! in a reap/respawn loop until some observer latches a terminal exit
//! reason into the shared block.

mod child;
mod files;
mod logfile;
mod pages;
mod params;
mod rnd;
mod sanitise;
mod shm;
mod signals;
mod syscall;
mod tables;
mod taint;
mod watchdog;

use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use churn_syscall::{SIGINT, SIGKILL, WNOHANG};

use files::FileIndex;
use params::{usage, ParamError, Params};
use rnd::{new_seed, Rnd};
use shm::{ExitReason, SharedMap, Shm, EMPTY_PIDSLOT};
use signals::SignalFd;

const TICK: Duration = Duration::from_millis(100);

/// How long teardown waits for children to leave before SIGKILLing them.
const TEARDOWN_TICKS: u32 = 100;

fn main() -> ExitCode {
    let params = match Params::parse(std::env::args().skip(1)) {
        Ok(p) => p,
        Err(ParamError::Help) => {
            print!("{}", usage());
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("churn: {}", e);
            eprint!("{}", usage());
            return ExitCode::from(2);
        }
    };
    if let Err(e) = logfile::init(&params) {
        eprintln!("churn: cannot set up logging: {}", e);
        return ExitCode::from(2);
    }

    match run(&params) {
        Ok(reason) => {
            if reason.is_failure() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("fatal: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run(params: &Params) -> std::io::Result<ExitReason> {
    let map = SharedMap::new()?;
    let shm: &Shm = &map;

    let my_pid = unsafe { churn_syscall::getpid() };
    shm.parent_pid.store(my_pid, Ordering::Relaxed);

    let seed = params.seed.unwrap_or_else(new_seed);
    shm.seed.store(seed, Ordering::Relaxed);
    info!(
        "churn starting: {} children, seed {}, victim {}",
        params.children,
        seed,
        params.victim_path.as_deref().unwrap_or("/dev /proc /sys")
    );

    // Must happen before the first fork so every descendant inherits the
    // blocked mask and only this process consumes the signals.
    let sigfd = SignalFd::new()?;

    if !params.ignore_tainted {
        let tainted = taint::read_taint();
        if tainted != 0 {
            warn!(
                "kernel is already tainted ({:#x}); the watchdog will stop immediately. \
                 use --ignore-tainted to fuzz anyway",
                tainted
            );
        }
    }

    let (roots, follow) = match &params.victim_path {
        Some(v) => (vec![v.clone()], true),
        None => (
            vec!["/dev".to_string(), "/proc".to_string(), "/sys".to_string()],
            false,
        ),
    };
    let index = FileIndex::build(&roots, follow, &|| !shm.still_running());
    info!("file index holds {} entries", index.len());
    if index.is_empty() {
        warn!("file index is empty; fd and pathname arguments will be weak");
    }

    let mut rnd = Rnd::new(seed);
    files::open_files(shm, &index, &mut rnd);
    files::open_sockets(shm);

    // The watchdog must exist before the workers so nobody fuzzes
    // unobserved.
    match unsafe { churn_syscall::fork() } {
        Ok(0) => watchdog::watchdog(shm, params),
        Ok(pid) => debug!("forked watchdog, pid {}", pid),
        Err(e) => {
            return Err(std::io::Error::from_raw_os_error(e.raw()));
        }
    }
    for _ in 0..50 {
        if shm.watchdog_pid.load(Ordering::Relaxed) != 0 {
            break;
        }
        thread::sleep(TICK);
    }
    info!(
        "started watchdog process, pid {}",
        shm.watchdog_pid.load(Ordering::Relaxed)
    );

    for i in 0..params.children as usize {
        spawn_child(shm, params, &index, i);
    }

    let mut watchdog_alive = true;
    while shm.still_running() {
        for signo in sigfd.drain() {
            if signo == SIGINT as u32 {
                info!("ctrl-c, winding down");
                shm.set_exit_reason(ExitReason::SigInt);
            }
        }

        reap_children(shm, &mut watchdog_alive);

        if shm.still_running() {
            for i in 0..params.children as usize {
                if shm.child(i).is_empty() {
                    spawn_child(shm, params, &index, i);
                }
            }
            if shm.needs_reseed() {
                regenerate(shm, &index, &mut rnd);
            }
        }

        thread::sleep(TICK);
    }

    let reason = shm.exit_reason();
    info!("exit reason: {:?}", reason);

    // Give everyone a bounded window to leave, then stop being polite.
    for _ in 0..TEARDOWN_TICKS {
        sigfd.drain();
        reap_children(shm, &mut watchdog_alive);
        if shm.occupied_slots() == 0 && !watchdog_alive {
            break;
        }
        thread::sleep(TICK);
    }
    for slot in &shm.children {
        let pid = slot.pid.load(Ordering::Relaxed);
        if pid != EMPTY_PIDSLOT {
            warn!("child {} would not die, sending SIGKILL", pid);
            unsafe {
                let _ = churn_syscall::kill(pid, SIGKILL);
            }
        }
    }
    if watchdog_alive {
        let wd = shm.watchdog_pid.load(Ordering::Relaxed);
        if wd != 0 {
            unsafe {
                let _ = churn_syscall::kill(wd, SIGKILL);
            }
        }
    }
    for _ in 0..20 {
        reap_children(shm, &mut watchdog_alive);
        if shm.occupied_slots() == 0 && !watchdog_alive {
            break;
        }
        thread::sleep(TICK);
    }

    files::close_files(shm);
    files::close_sockets(shm);

    let total = shm.total_done.load(Ordering::Relaxed);
    info!(
        "done: {} syscalls, {} succeeded, {} failed",
        total,
        shm.successes.load(Ordering::Relaxed),
        shm.failures.load(Ordering::Relaxed)
    );
    Ok(reason)
}

/// Fill one worker slot. First spawns seed the slot from the global seed;
/// respawns keep the slot's seed so the next incarnation resumes a
/// similar search.
fn spawn_child(shm: &Shm, params: &Params, index: &FileIndex, childno: usize) {
    let slot = shm.child(childno);
    if slot.seed.load(Ordering::Relaxed) == 0 {
        slot.seed
            .store(shm.seed.load(Ordering::Relaxed), Ordering::Relaxed);
    }
    match unsafe { churn_syscall::fork() } {
        Ok(0) => {
            child::child_process(shm, params, index, childno);
            unsafe { churn_syscall::exit_group(0) }
        }
        Ok(pid) => {
            slot.pid.store(pid, Ordering::Relaxed);
            shm.running.fetch_add(1, Ordering::Relaxed);
            debug!("child {} is pid {}", childno, pid);
        }
        Err(e) => {
            warn!("fork failed for slot {} (errno {})", childno, e.raw());
        }
    }
}

/// Collect every exited child without blocking. Worker slots are cleared
/// with a compare-exchange so a concurrent watchdog reap of the same pid
/// cannot double-decrement `running`.
fn reap_children(shm: &Shm, watchdog_alive: &mut bool) {
    loop {
        let mut status: i32 = 0;
        let pid = unsafe {
            churn_syscall::wait4(
                -1,
                &mut status as *mut i32,
                WNOHANG,
                std::ptr::null_mut(),
            )
        };
        match pid {
            Ok(0) => break,
            Ok(pid) => {
                if pid == shm.watchdog_pid.load(Ordering::Relaxed) {
                    debug!("watchdog (pid {}) exited, status {:#x}", pid, status);
                    *watchdog_alive = false;
                    continue;
                }
                if let Some(i) = shm.slot_of_pid(pid) {
                    let slot = shm.child(i);
                    if slot
                        .pid
                        .compare_exchange(pid, EMPTY_PIDSLOT, Ordering::Relaxed, Ordering::Relaxed)
                        .is_ok()
                    {
                        let _ = shm.running.fetch_update(
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                            |v| v.checked_sub(1),
                        );
                    }
                    debug!("child {} (pid {}) exited, status {:#x}", i, pid, status);
                } else {
                    debug!("reaped unknown pid {}, status {:#x}", pid, status);
                }
            }
            Err(_) => break, // ECHILD: nothing left to reap
        }
    }
}

/// The reseed/regenerate cycle: park the workers, rebuild the shared
/// argument material, move the global seed, release the workers.
fn regenerate(shm: &Shm, index: &FileIndex, rnd: &mut Rnd) {
    info!("regenerating shared state");
    shm.set_regenerating(true);
    // Workers poll the flag once per loop; one second parks them all.
    thread::sleep(Duration::from_secs(1));

    files::close_files(shm);
    files::close_sockets(shm);
    files::open_files(shm, index, rnd);
    files::open_sockets(shm);

    let seed = new_seed();
    shm.seed.store(seed, Ordering::Relaxed);
    info!("reseed: new global seed {}", seed);

    shm.set_need_reseed(false);
    shm.set_regenerating(false);
}
