//! The scratch page: a page-sized buffer of random bytes used as a
//! convenient target for pointer-typed syscall arguments.
//!
//! The page is private to each process and regenerated on demand. The
//! kernel writes into it through raw pointers during fuzzed calls, so the
//! backing storage lives behind an `UnsafeCell` and all access from this
//! side goes through raw pointers too.

use core::cell::UnsafeCell;

use crate::rnd::Rnd;

pub const PAGE_SIZE: usize = 4096;

pub struct ScratchPage {
    bytes: Box<UnsafeCell<[u8; PAGE_SIZE]>>,
}

impl ScratchPage {
    pub fn new(rnd: &mut Rnd) -> Self {
        let page = ScratchPage {
            bytes: Box::new(UnsafeCell::new([0; PAGE_SIZE])),
        };
        page.regenerate(rnd);
        page
    }

    /// Refill the page with fresh random bytes.
    pub fn regenerate(&self, rnd: &mut Rnd) {
        let mut fresh = [0u8; PAGE_SIZE];
        rnd.fill(&mut fresh);
        unsafe {
            core::ptr::write(self.bytes.get(), fresh);
        }
    }

    /// The page's base address, as an argument word.
    pub fn addr(&self) -> u64 {
        self.bytes.get() as u64
    }

    /// Overwrite four bytes at `off`, for manufacturing structs in place.
    /// Out-of-page offsets are ignored.
    pub fn poke_u32(&self, off: usize, v: u32) {
        if off + 4 <= PAGE_SIZE {
            unsafe {
                core::ptr::write_unaligned((self.bytes.get() as *mut u8).add(off) as *mut u32, v);
            }
        }
    }

    /// Overwrite eight bytes at `off`. Out-of-page offsets are ignored.
    pub fn poke_u64(&self, off: usize, v: u64) {
        if off + 8 <= PAGE_SIZE {
            unsafe {
                core::ptr::write_unaligned((self.bytes.get() as *mut u8).add(off) as *mut u64, v);
            }
        }
    }

    /// Copy the current contents out, for inspection in tests.
    #[cfg(test)]
    pub fn snapshot(&self) -> [u8; PAGE_SIZE] {
        unsafe { core::ptr::read(self.bytes.get()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regenerate_changes_contents() {
        let mut rnd = Rnd::new(5);
        let page = ScratchPage::new(&mut rnd);
        let before = page.snapshot();
        page.regenerate(&mut rnd);
        let after = page.snapshot();
        assert_ne!(before[..], after[..]);
    }

    #[test]
    fn pokes_land_and_out_of_range_is_ignored() {
        let mut rnd = Rnd::new(5);
        let page = ScratchPage::new(&mut rnd);
        page.poke_u32(0, 0xdead_beef);
        page.poke_u64(8, 0x0123_4567_89ab_cdef);
        let snap = page.snapshot();
        assert_eq!(u32::from_ne_bytes(snap[0..4].try_into().unwrap()), 0xdead_beef);
        assert_eq!(
            u64::from_ne_bytes(snap[8..16].try_into().unwrap()),
            0x0123_4567_89ab_cdef
        );
        page.poke_u32(PAGE_SIZE - 2, 1);
        page.poke_u64(PAGE_SIZE - 4, 1);
    }

    #[test]
    fn addr_is_stable() {
        let mut rnd = Rnd::new(5);
        let page = ScratchPage::new(&mut rnd);
        let a = page.addr();
        page.regenerate(&mut rnd);
        assert_eq!(a, page.addr());
    }
}
