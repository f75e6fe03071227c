//! Per-call dispatch: record what is about to happen in the shared block,
//! invoke through the raw stubs, and tally the outcome. This is the only
//! path fuzzed calls take into the kernel.

use std::sync::atomic::Ordering;

use log::trace;

use crate::sanitise::Synth;
use crate::shm::{now_secs, Shm};
use crate::tables::{Abi, SyscallDescriptor};

/// Kernel error returns occupy the top 4095 values of the result space.
const ERR_LIMIT: i64 = -4095;

/// Issue one fuzzed call for worker `childno` and account for it.
/// Returns the raw (sign-extended) result.
pub fn mkcall(
    shm: &Shm,
    childno: usize,
    d: &SyscallDescriptor,
    abi: Abi,
    synth: &mut Synth<'_>,
) -> i64 {
    let slot = shm.child(childno);
    slot.syscall_nr.store(d.nr, Ordering::Relaxed);
    slot.do32bit
        .store((abi == Abi::Bits32) as u32, Ordering::Relaxed);
    slot.heartbeat.store(now_secs(), Ordering::Relaxed);

    synth.begin_call();
    let args = synth.gen_args(d);
    for (i, a) in args.iter().enumerate() {
        slot.args[i].store(*a, Ordering::Relaxed);
    }

    let ret = unsafe { invoke(abi, d.nr, &args) };

    shm.total_done.fetch_add(1, Ordering::Relaxed);
    if (ERR_LIMIT..0).contains(&ret) {
        shm.failures.fetch_add(1, Ordering::Relaxed);
        trace!("{}({:#x}, ...) = -1 (errno {})", d.name, args[0], -ret);
    } else {
        shm.successes.fetch_add(1, Ordering::Relaxed);
        trace!("{}({:#x}, ...) = {:#x}", d.name, args[0], ret);
    }
    ret
}

/// The narrow waist: number plus six words in, sign-extended result out.
/// Arguments beyond the call's declared arity ride along as zeros; the
/// kernel ignores registers it was not told about.
///
/// Safety: this hands arbitrary values to the kernel. That is the whole
/// point of the program, but nothing about the process's own memory or
/// descriptors is protected from what the call does.
#[cfg(target_arch = "x86_64")]
pub unsafe fn invoke(abi: Abi, nr: u32, args: &[u64; 6]) -> i64 {
    use churn_syscall::raw;
    match abi {
        Abi::Bits64 => raw::syscall6(
            nr as u64, args[0], args[1], args[2], args[3], args[4], args[5],
        ) as i64,
        // int 0x80 reaches the 32-bit table; arguments truncate to the
        // register width that ABI actually has.
        Abi::Bits32 => raw::compat32_6(
            nr,
            args[0] as u32,
            args[1] as u32,
            args[2] as u32,
            args[3] as u32,
            args[4] as u32,
            args[5] as u32,
        ) as i32 as i64,
    }
}

#[cfg(target_arch = "x86")]
pub unsafe fn invoke(_abi: Abi, nr: u32, args: &[u64; 6]) -> i64 {
    use churn_syscall::raw;
    raw::syscall6(
        nr,
        args[0] as u32,
        args[1] as u32,
        args[2] as u32,
        args[3] as u32,
        args[4] as u32,
        args[5] as u32,
    ) as i32 as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileIndex;
    use crate::rnd::Rnd;
    use crate::shm::test_block;
    use crate::tables::{ArgType, SyscallFlags};

    // Descriptors that are safe to really invoke from a test process.
    static GETPID: SyscallDescriptor = SyscallDescriptor {
        nr: churn_syscall::raw::GETPID as u32,
        name: "getpid",
        args: &[ArgType::Int],
        flags: SyscallFlags::ACTIVE,
        sanitise: None,
    };
    static NOSYS: SyscallDescriptor = SyscallDescriptor {
        nr: 0xffff,
        name: "nosys",
        args: &[ArgType::Int],
        flags: SyscallFlags::ACTIVE,
        sanitise: None,
    };

    #[test]
    fn tallies_agree_with_outcomes() {
        let shm = test_block();
        let files = FileIndex::from_paths(Vec::new());
        let mut synth = Synth::new(Rnd::new(9), &shm, &files);

        let native = Abi::native();
        for _ in 0..10 {
            let ret = mkcall(&shm, 0, &GETPID, native, &mut synth);
            assert!(ret > 0);
        }
        for _ in 0..5 {
            let ret = mkcall(&shm, 0, &NOSYS, native, &mut synth);
            assert_eq!(ret, -38, "expected ENOSYS"); // ENOSYS
        }

        use std::sync::atomic::Ordering;
        let total = shm.total_done.load(Ordering::Relaxed);
        let ok = shm.successes.load(Ordering::Relaxed);
        let bad = shm.failures.load(Ordering::Relaxed);
        assert_eq!(total, 15);
        assert_eq!(ok, 10);
        assert_eq!(bad, 5);
        assert_eq!(total, ok + bad);
    }

    #[test]
    fn slot_log_reflects_the_call() {
        let shm = test_block();
        let files = FileIndex::from_paths(Vec::new());
        let mut synth = Synth::new(Rnd::new(10), &shm, &files);

        let before = crate::shm::now_secs();
        mkcall(&shm, 3, &GETPID, Abi::native(), &mut synth);
        let slot = shm.child(3);

        use std::sync::atomic::Ordering;
        assert_eq!(slot.syscall_nr.load(Ordering::Relaxed), GETPID.nr);
        let hb = slot.heartbeat.load(Ordering::Relaxed);
        assert!(hb >= before && hb <= crate::shm::now_secs() + 1);
    }
}
