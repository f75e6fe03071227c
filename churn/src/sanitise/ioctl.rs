//! The ioctl sanitiser. `ioctl` command words are dense enough that pure
//! random draws almost always bounce off the driver's switch statement,
//! so the generic choice is replaced with a known-good command, lightly
//! mangled once in a while.

use super::Synth;
use crate::pages::PAGE_SIZE;

/// Command words the sanitiser starts from: terminal, block, file and
/// rtc requests that most kernels service.
pub static IOCTL_LIST: &[u64] = &[
    0x5401,      // TCGETS
    0x5402,      // TCSETS
    0x5409,      // TCSBRK
    0x540b,      // TCFLSH
    0x5411,      // TIOCOUTQ
    0x5413,      // TIOCGWINSZ
    0x5414,      // TIOCSWINSZ
    0x541b,      // FIONREAD
    0x5421,      // FIONBIO
    0x5450,      // FIONCLEX
    0x5451,      // FIOCLEX
    0x5452,      // FIOASYNC
    0x1260,      // BLKGETSIZE
    0x1261,      // BLKFLSBUF
    0x1268,      // BLKSSZGET
    0x0000_0002, // FIGETBSZ
    0x8008_6601, // FS_IOC_GETFLAGS
    0x4008_6602, // FS_IOC_SETFLAGS
    0x8024_7009, // RTC_RD_TIME
    0x8004_667f, // FIONREAD (alt encoding used by some drivers)
];

/// One mangle in fifty keeps most calls on the known-good path while
/// still probing the decode logic around it.
const MANGLE_ONE_IN: u32 = 50;

pub fn sanitise_ioctl(s: &mut Synth<'_>, args: &mut [u64; 6]) {
    let mut cmd = IOCTL_LIST[s.rnd.range_usize(IOCTL_LIST.len())];

    if s.rnd.range(MANGLE_ONE_IN) == 0 {
        for _ in 0..s.rnd.range(4) {
            cmd |= 1u64 << s.rnd.range(32);
        }
        for _ in 0..s.rnd.range(4) {
            cmd &= 1u64 << s.rnd.range(32);
        }
    }
    args[1] = cmd;

    // The argument could mean anything, because ioctl is like that.
    match s.rnd.range(10) {
        0 => args[2] = s.rnd.interesting_u32() as u64,
        1..=5 => args[2] = s.page.addr(),
        _ => {
            // Manufacture a struct of mixed boundary values and addresses
            // in place on the scratch page.
            args[2] = s.page.addr();
            let mut off = 0usize;
            let nr_elements = s.rnd.range(10);
            for _ in 0..nr_elements {
                if off >= PAGE_SIZE {
                    break;
                }
                if s.rnd.range(2) == 0 {
                    let v = s.rnd.interesting_u32();
                    s.page.poke_u32(off, v);
                    off += 4;
                } else {
                    let v = s.get_address();
                    s.page.poke_u64(off, v);
                    off += 8;
                }
            }
        }
    }
}
