//! The syscall table registry: read-only descriptor tables for each ABI
//! the host can exercise, and the eligibility rules for drawing from them.

use bitflags::bitflags;

use crate::rnd::Rnd;
use crate::sanitise::Synth;

pub mod i386;
pub mod x86_64;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct SyscallFlags: u32 {
        /// Entry may be fuzzed at all.
        const ACTIVE = 1 << 0;
        /// Entry is real but too disruptive to the fuzzer itself.
        const AVOID = 1 << 1;
        /// Hole in the table; the kernel would return ENOSYS.
        const NI = 1 << 2;
        /// First argument is a file descriptor, which the stuck-child
        /// report wants to name.
        const NEEDS_FD = 1 << 3;
        /// Rarely returns anything interesting; kept for coverage.
        const BORING = 1 << 4;
    }
}

/// How to synthesise one argument word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArgType {
    None,
    /// An arbitrary integer; boundary values are favoured.
    Int,
    Fd,
    Len,
    Address,
    Pid,
    Mode,
    /// Pointer to an iovec array built in the call arena.
    Iovec,
    /// The element count of the preceding `Iovec` argument.
    IovecLen,
    /// Pointer to a generated socket address, optionally hinted to a
    /// specific protocol family.
    Sockaddr(Option<u16>),
    /// The byte length of the preceding `Sockaddr` argument.
    SockaddrLen,
    /// Pointer to a NUL-terminated pathname from the index (sometimes
    /// mangled).
    Pathname,
}

/// Post-processing hook applied after the generic per-type synthesis.
pub type SanitiseFn = fn(&mut Synth<'_>, &mut [u64; 6]);

pub struct SyscallDescriptor {
    pub nr: u32,
    pub name: &'static str,
    pub args: &'static [ArgType],
    pub flags: SyscallFlags,
    pub sanitise: Option<SanitiseFn>,
}

impl SyscallDescriptor {
    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    /// A call is eligible iff it is active, not avoided, implemented, and
    /// takes at least one argument.
    pub fn eligible(&self) -> bool {
        self.flags.contains(SyscallFlags::ACTIVE)
            && !self.flags.intersects(SyscallFlags::AVOID | SyscallFlags::NI)
            && self.num_args() > 0
    }
}

macro_rules! entry {
    ($nr:expr, $name:expr, [$($a:expr),*], $flags:expr) => {
        $crate::tables::SyscallDescriptor {
            nr: $nr,
            name: $name,
            args: &[$($a),*],
            flags: $flags,
            sanitise: ::core::option::Option::None,
        }
    };
    ($nr:expr, $name:expr, [$($a:expr),*], $flags:expr, $san:expr) => {
        $crate::tables::SyscallDescriptor {
            nr: $nr,
            name: $name,
            args: &[$($a),*],
            flags: $flags,
            sanitise: ::core::option::Option::Some($san),
        }
    };
}
pub(crate) use entry;

/// Which syscall table a call goes through.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Abi {
    Bits32,
    Bits64,
}

impl Abi {
    /// Whether this host can exercise both tables from one process.
    pub fn biarch() -> bool {
        cfg!(target_arch = "x86_64")
    }

    /// The ABI the binary itself was compiled for.
    pub fn native() -> Abi {
        if cfg!(target_arch = "x86") {
            Abi::Bits32
        } else {
            Abi::Bits64
        }
    }
}

#[derive(Clone, Copy)]
pub struct Table {
    pub abi: Abi,
    pub entries: &'static [SyscallDescriptor],
}

/// Outcome of drawing a syscall: either a usable table index, or the
/// bounded retry budget ran out.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pick {
    Picked(usize),
    Exhausted,
}

/// How many random draws to spend before declaring exhaustion. The
/// tables are small, so this overshoots the entry count by a wide margin.
const PICK_ATTEMPTS: u32 = 1024;

impl Table {
    pub fn get(abi: Abi) -> Table {
        match abi {
            Abi::Bits32 => Table {
                abi,
                entries: i386::TABLE,
            },
            Abi::Bits64 => Table {
                abi,
                entries: x86_64::TABLE,
            },
        }
    }

    pub fn has_enabled(&self) -> bool {
        self.entries.iter().any(|d| d.eligible())
    }

    /// Uniform random draw, retried until an eligible entry comes up or
    /// the attempt budget runs out.
    pub fn pick(&self, rnd: &mut Rnd) -> Pick {
        for _ in 0..PICK_ATTEMPTS {
            let i = rnd.range_usize(self.entries.len());
            if self.entries[i].eligible() {
                return Pick::Picked(i);
            }
        }
        Pick::Exhausted
    }

    /// Find the descriptor for a raw syscall number, for diagnostics.
    pub fn lookup(&self, nr: u32) -> Option<&'static SyscallDescriptor> {
        self.entries.iter().find(|d| d.nr == nr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_tables_have_enabled_entries() {
        assert!(Table::get(Abi::Bits64).has_enabled());
        assert!(Table::get(Abi::Bits32).has_enabled());
    }

    #[test]
    fn eligibility_rules() {
        for table in [Table::get(Abi::Bits64), Table::get(Abi::Bits32)] {
            for d in table.entries {
                if d.eligible() {
                    assert!(d.flags.contains(SyscallFlags::ACTIVE), "{}", d.name);
                    assert!(!d.flags.contains(SyscallFlags::AVOID), "{}", d.name);
                    assert!(!d.flags.contains(SyscallFlags::NI), "{}", d.name);
                    assert!(d.num_args() > 0, "{}", d.name);
                }
            }
        }
    }

    #[test]
    fn tables_have_no_duplicate_numbers() {
        for table in [Table::get(Abi::Bits64), Table::get(Abi::Bits32)] {
            let mut nrs: Vec<u32> = table.entries.iter().map(|d| d.nr).collect();
            nrs.sort_unstable();
            let before = nrs.len();
            nrs.dedup();
            assert_eq!(before, nrs.len());
        }
    }

    #[test]
    fn pick_returns_only_eligible_entries() {
        let table = Table::get(Abi::Bits64);
        let mut rnd = crate::rnd::Rnd::new(1234);
        for _ in 0..200 {
            match table.pick(&mut rnd) {
                Pick::Picked(i) => assert!(table.entries[i].eligible()),
                Pick::Exhausted => panic!("table with enabled entries exhausted"),
            }
        }
    }

    #[test]
    fn pick_exhausts_on_a_dead_table() {
        static DEAD: &[SyscallDescriptor] = &[SyscallDescriptor {
            nr: 0,
            name: "nothing",
            args: &[],
            flags: SyscallFlags::NI,
            sanitise: None,
        }];
        let table = Table {
            abi: Abi::Bits64,
            entries: DEAD,
        };
        assert!(!table.has_enabled());
        let mut rnd = crate::rnd::Rnd::new(5);
        assert_eq!(table.pick(&mut rnd), Pick::Exhausted);
    }

    #[test]
    fn needs_fd_entries_lead_with_an_fd() {
        for table in [Table::get(Abi::Bits64), Table::get(Abi::Bits32)] {
            for d in table.entries {
                if d.flags.contains(SyscallFlags::NEEDS_FD) {
                    assert_eq!(d.args.first(), Some(&ArgType::Fd), "{}", d.name);
                }
            }
        }
    }
}
