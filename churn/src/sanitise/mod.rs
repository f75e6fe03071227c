//! The argument synthesiser: turns a syscall descriptor's declared
//! argument types into concrete argument words.
//!
//! Pointer-typed arguments need backing memory that stays alive until the
//! call returns, so the synthesiser keeps a per-call arena of owned
//! buffers; `begin_call` resets it and the buffers drop at the start of
//! the next dispatch.

use std::sync::atomic::Ordering;

use crate::files::{self, FileIndex};
use crate::pages::{ScratchPage, PAGE_SIZE};
use crate::rnd::Rnd;
use crate::shm::{Shm, NR_SOCKET_FDS};
use crate::tables::{ArgType, SyscallDescriptor};

pub mod ioctl;
pub mod sockaddr;

/// An address no Linux arrangement maps for userspace.
#[cfg(target_arch = "x86_64")]
pub const KERNEL_ADDR: u64 = 0xffff_8800_0000_0000;
#[cfg(target_arch = "x86")]
pub const KERNEL_ADDR: u64 = 0xc000_0000;

pub struct Synth<'a> {
    pub rnd: Rnd,
    pub page: ScratchPage,
    shm: &'a Shm,
    files: &'a FileIndex,
    arena: Vec<Vec<u8>>,
    /// Count or byte length produced by the most recent Iovec/Sockaddr
    /// argument, consumed by its paired length argument.
    last_len: u64,
}

impl<'a> Synth<'a> {
    pub fn new(mut rnd: Rnd, shm: &'a Shm, files: &'a FileIndex) -> Synth<'a> {
        let page = ScratchPage::new(&mut rnd);
        Synth {
            rnd,
            page,
            shm,
            files,
            arena: Vec::new(),
            last_len: 0,
        }
    }

    /// Adopt a new seed mid-run: restart the stream and refresh the page.
    pub fn reseed(&mut self, seed: u32) {
        self.rnd.reseed(seed);
        self.page.regenerate(&mut self.rnd);
    }

    /// Drop the previous call's buffers and start a fresh arena.
    pub fn begin_call(&mut self) {
        self.arena.clear();
        self.last_len = 0;
    }

    /// Park an owned buffer for the duration of this call and return its
    /// address as an argument word.
    pub fn keep(&mut self, buf: Vec<u8>) -> u64 {
        let addr = buf.as_ptr() as u64;
        self.arena.push(buf);
        addr
    }

    /// Synthesise the full argument tuple for one call, applying the
    /// descriptor's sanitiser afterwards if it has one.
    pub fn gen_args(&mut self, d: &SyscallDescriptor) -> [u64; 6] {
        let mut args = [0u64; 6];
        for (i, at) in d.args.iter().enumerate().take(6) {
            args[i] = self.gen_one(*at);
        }
        if let Some(hook) = d.sanitise {
            hook(self, &mut args);
        }
        args
    }

    fn gen_one(&mut self, at: ArgType) -> u64 {
        match at {
            ArgType::None => 0,
            ArgType::Int => self.gen_int(),
            ArgType::Fd => self.get_fd(),
            ArgType::Len => self.get_len(),
            ArgType::Address => self.get_address(),
            ArgType::Pid => self.gen_pid(),
            ArgType::Mode => self.gen_mode(),
            ArgType::Iovec => self.gen_iovec(),
            ArgType::IovecLen => self.last_len,
            ArgType::Sockaddr(hint) => self.gen_sockaddr(hint),
            ArgType::SockaddrLen => self.last_len,
            ArgType::Pathname => self.gen_pathname(),
        }
    }

    fn gen_int(&mut self) -> u64 {
        match self.rnd.range(4) {
            0 => self.rnd.u32() as u64,
            1 => self.rnd.interesting_u32() as u64,
            2 => self.rnd.interesting_u64(),
            _ => (self.rnd.u32() & 0xffff) as u64,
        }
    }

    /// Mostly a live descriptor from one of the shared pools; now and
    /// then a descriptor that is wrong on purpose. File pool draws stick
    /// with one descriptor for a short lifetime so consecutive calls pile
    /// onto the same object, then the cursor moves on.
    pub fn get_fd(&mut self) -> u64 {
        let roll = self.rnd.range(100);
        if roll < 60 {
            let n = self.shm.nr_file_fds.load(Ordering::Relaxed) as usize;
            if n > 0 {
                if self.shm.fd_lifetime.load(Ordering::Relaxed) == 0 {
                    self.shm
                        .current_fd
                        .store(self.rnd.range(n as u32), Ordering::Relaxed);
                    self.shm
                        .fd_lifetime
                        .store(1 + self.rnd.range(64), Ordering::Relaxed);
                } else {
                    let _ = self.shm.fd_lifetime.fetch_update(
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                        |v| v.checked_sub(1),
                    );
                }
                let idx = (self.shm.current_fd.load(Ordering::Relaxed) as usize).min(n - 1);
                let fd = self.shm.file_fds[idx].load(Ordering::Relaxed);
                if fd > 0 {
                    return fd as u64;
                }
            }
        }
        if roll < 85 {
            let fd = self.shm.socket_fds[self.rnd.range_usize(NR_SOCKET_FDS)]
                .load(Ordering::Relaxed);
            if fd > 0 {
                return fd as u64;
            }
        }
        if roll < 95 {
            // stdio
            return self.rnd.range(3) as u64;
        }
        // Invalid: closed-by-now numbers or plain -1.
        if self.rnd.chance(50) {
            (-1i64) as u64
        } else {
            (512 + self.rnd.range(512)) as u64
        }
    }

    /// Weighted length menu: zero, one, small, page-scaled, huge.
    pub fn get_len(&mut self) -> u64 {
        match self.rnd.range(10) {
            0 => 0,
            1 => 1,
            2..=5 => self.rnd.range(256) as u64,
            6..=8 => (self.rnd.range(16) as u64 + 1) * PAGE_SIZE as u64,
            _ => self.rnd.interesting_u64(),
        }
    }

    /// Weighted address menu: NULL, an unmapped kernel-side address, a
    /// misaligned page pointer, or (mostly) the scratch page itself.
    pub fn get_address(&mut self) -> u64 {
        match self.rnd.range(10) {
            0 => 0,
            1 => KERNEL_ADDR,
            2 => self.page.addr() + 1 + self.rnd.range(7) as u64,
            _ => self.page.addr(),
        }
    }

    fn gen_pid(&mut self) -> u64 {
        match self.rnd.range(5) {
            0 => 0,
            1 => (unsafe { churn_syscall::getpid() }) as u64,
            2 => self.rnd.interesting_u32() as u64,
            _ => self.rnd.range(32768) as u64,
        }
    }

    /// OR together a few permission bits; occasionally every bit at once.
    fn gen_mode(&mut self) -> u64 {
        if self.rnd.chance(2) {
            return !0u64;
        }
        let mut mode = 0u64;
        for _ in 0..self.rnd.range(6) {
            mode |= 1 << self.rnd.range(12);
        }
        mode
    }

    /// A small iovec array in the arena, each element aimed at the
    /// scratch page. The element count lands in `last_len` for the
    /// paired IovecLen argument.
    fn gen_iovec(&mut self) -> u64 {
        let count = 1 + self.rnd.range_usize(4);
        let mut buf = Vec::with_capacity(count * 16);
        for _ in 0..count {
            let off = self.rnd.range_usize(PAGE_SIZE / 2);
            let base = self.page.addr() + off as u64;
            let len = self.rnd.range_usize(PAGE_SIZE - off) as u64;
            buf.extend_from_slice(&base.to_ne_bytes());
            buf.extend_from_slice(&len.to_ne_bytes());
        }
        self.last_len = count as u64;
        self.keep(buf)
    }

    fn gen_sockaddr(&mut self, hint: Option<u16>) -> u64 {
        match sockaddr::generate_sockaddr(&mut self.rnd, hint) {
            Some((buf, len)) => {
                self.last_len = len as u64;
                self.keep(buf)
            }
            None => {
                self.last_len = 16;
                self.get_address()
            }
        }
    }

    fn gen_pathname(&mut self) -> u64 {
        match files::generate_pathname(self.files, &mut self.rnd) {
            Some(buf) => self.keep(buf),
            None => self.get_address(),
        }
    }

    #[cfg(test)]
    pub fn arena_snapshot(&self) -> Vec<Vec<u8>> {
        self.arena.clone()
    }
}

/// Socket option levels the setsockopt sanitiser draws from; the tail of
/// the list is the row of SOL_* values the protocol modules register.
pub static SOL_LEVELS: &[u32] = &[
    0,   // SOL_IP
    1,   // SOL_SOCKET
    6,   // SOL_TCP
    17,  // SOL_UDP
    41,  // SOL_IPV6
    58,  // SOL_ICMPV6
    132, // SOL_SCTP
    136, // SOL_UDPLITE
    255, // SOL_RAW
    263, // SOL_PACKET
    266, // SOL_IRDA
    267, // SOL_NETBEUI
    268, // SOL_LLC
    269, // SOL_DCCP
    270, // SOL_NETLINK
    271, // SOL_TIPC
    272, // SOL_RXRPC
    273, // SOL_PPPOL2TP
    274, // SOL_BLUETOOTH
    276, // SOL_RDS
    279, // SOL_ALG
    280, // SOL_NFC
];

/// Aim setsockopt at a real option level with a plausible optval/optlen;
/// random levels never make it past the socket layer's bounds check.
pub fn sanitise_setsockopt(s: &mut Synth<'_>, args: &mut [u64; 6]) {
    args[1] = SOL_LEVELS[s.rnd.range_usize(SOL_LEVELS.len())] as u64;
    args[2] = s.rnd.range(128) as u64;
    args[3] = s.page.addr();
    args[4] = match s.rnd.range(4) {
        0 => 4,
        1 => 16,
        2 => s.rnd.range(256) as u64,
        _ => s.rnd.interesting_u32() as u64,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::test_block;
    use crate::tables::{Abi, Table};

    fn test_synth<'a>(seed: u32, shm: &'a Shm, files: &'a FileIndex) -> Synth<'a> {
        Synth::new(Rnd::new(seed), shm, files)
    }

    #[test]
    fn iovec_len_pairs_with_iovec() {
        let shm = test_block();
        let files = FileIndex::from_paths(vec!["/dev/null".into()]);
        let mut s = test_synth(21, &shm, &files);
        let table = Table::get(Abi::Bits64);
        let d = table.lookup(20).unwrap(); // writev
        for _ in 0..100 {
            s.begin_call();
            let args = s.gen_args(d);
            assert!(args[1] != 0, "iovec pointer must be arena-backed");
            assert!((1..=4).contains(&args[2]), "iovec count out of range");
        }
    }

    #[test]
    fn sockaddr_len_matches_generated_family() {
        let shm = test_block();
        let files = FileIndex::from_paths(vec!["/dev/null".into()]);
        let mut s = test_synth(22, &shm, &files);
        let table = Table::get(Abi::Bits64);
        let d = table.lookup(42).unwrap(); // connect
        for _ in 0..100 {
            s.begin_call();
            let args = s.gen_args(d);
            assert!(args[2] > 0, "addrlen must be populated");
            assert!(args[2] <= 128, "addrlen larger than any sockaddr");
        }
    }

    #[test]
    fn unused_trailing_args_stay_zero() {
        let shm = test_block();
        let files = FileIndex::from_paths(vec!["/dev/null".into()]);
        let mut s = test_synth(23, &shm, &files);
        let table = Table::get(Abi::Bits64);
        let d = table.lookup(32).unwrap(); // dup: one argument
        s.begin_call();
        let args = s.gen_args(d);
        assert_eq!(&args[1..], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn fd_pool_draws_prefer_the_shared_pools() {
        let shm = test_block();
        shm.nr_file_fds.store(2, Ordering::Relaxed);
        shm.file_fds[0].store(33, Ordering::Relaxed);
        shm.file_fds[1].store(44, Ordering::Relaxed);
        shm.socket_fds[0].store(55, Ordering::Relaxed);
        let files = FileIndex::from_paths(vec!["/dev/null".into()]);
        let mut s = test_synth(24, &shm, &files);
        let mut pool_hits = 0;
        for _ in 0..200 {
            let fd = s.get_fd();
            if fd == 33 || fd == 44 || fd == 55 {
                pool_hits += 1;
            }
        }
        assert!(pool_hits > 100, "only {}/200 draws hit the pools", pool_hits);
    }

    #[test]
    fn setsockopt_levels_come_from_the_list() {
        let shm = test_block();
        let files = FileIndex::from_paths(vec!["/dev/null".into()]);
        let mut s = test_synth(25, &shm, &files);
        for _ in 0..100 {
            let mut args = [0u64; 6];
            s.begin_call();
            sanitise_setsockopt(&mut s, &mut args);
            assert!(SOL_LEVELS.contains(&(args[1] as u32)));
            assert_eq!(args[3], s.page.addr());
        }
    }

    #[test]
    fn same_seed_same_argument_stream() {
        // Arena buffers land at whatever address the allocator hands out,
        // so pointer words into the arena are masked and the buffer
        // contents compared instead; everything else (including scratch
        // page pointers, which are stable within the process) must be
        // bit-identical between two runs from the same seed.
        let shm = test_block();
        let files = FileIndex::from_paths(vec!["/dev/null".into(), "/dev/zero".into()]);
        let mut s = test_synth(4242, &shm, &files);
        let table = Table::get(Abi::Bits64);

        type Step = (u32, [u64; 6], Vec<Vec<u8>>);
        let mut run = |s: &mut Synth<'_>| -> Vec<Step> {
            let mut out = Vec::new();
            for _ in 0..200 {
                let i = match table.pick(&mut s.rnd) {
                    crate::tables::Pick::Picked(i) => i,
                    crate::tables::Pick::Exhausted => unreachable!(),
                };
                let d = &table.entries[i];
                s.begin_call();
                let mut args = s.gen_args(d);
                for (j, at) in d.args.iter().enumerate() {
                    if matches!(
                        *at,
                        ArgType::Iovec | ArgType::Sockaddr(_) | ArgType::Pathname
                    ) {
                        args[j] = 0;
                    }
                }
                out.push((d.nr, args, s.arena_snapshot()));
            }
            out
        };

        let first = run(&mut s);
        s.reseed(4242);
        let second = run(&mut s);
        assert_eq!(first, second);
    }
}
