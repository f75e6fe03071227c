extern crate std;

use crate::*;

#[test]
fn test_raw_syscall_getpid() {
    let want = std::process::id();
    let got = unsafe { raw::syscall0(raw::GETPID) } as u32;
    assert_eq!(
        got, want,
        "result {} does not match actual pid {}",
        got, want,
    );
}

#[test]
fn test_getpid() {
    let want = std::process::id() as pid_t;
    let got = unsafe { getpid() };
    assert_eq!(
        got, want,
        "result {} does not match actual pid {}",
        got, want,
    );
}

#[test]
fn test_kill_probe_self() {
    let pid = unsafe { getpid() };
    let got = unsafe { kill(pid, 0) };
    assert_eq!(got, Ok(0), "signal-zero probe of our own pid must succeed");
}

#[test]
fn test_kill_probe_esrch() {
    // The pid range stops well short of i32::MAX, so this cannot name a
    // live process.
    let got = unsafe { kill(0x7fff_fffe, 0) };
    assert_eq!(got, Err(result::Error::new(result::ESRCH)));
}

#[test]
fn test_open_enoent() {
    let path = b"/nonexistent-churn-test-path\0";
    let got = unsafe { open(path.as_ptr() as *const char, O_RDONLY, 0) };
    assert_eq!(got, Err(result::Error::new(result::ENOENT)));
}

#[test]
fn test_anonymous_shared_mapping_roundtrip() {
    let len = 4096;
    let ptr = unsafe {
        mmap(
            core::ptr::null_mut(),
            len,
            PROT_READ | PROT_WRITE,
            MAP_SHARED | MAP_ANONYMOUS,
            -1,
            0,
        )
    }
    .unwrap();
    unsafe {
        *(ptr as *mut u64) = 0xfeed_beef;
        assert_eq!(*(ptr as *const u64), 0xfeed_beef);
        munmap(ptr, len).unwrap();
    }
}

#[test]
fn test_sigset_membership() {
    let mut set = sigset::sigset_t::new_empty();
    assert_eq!(set.sigismember(SIGINT), Ok(false));
    set.sigaddset(SIGINT).unwrap();
    set.sigaddset(SIGCHLD).unwrap();
    assert_eq!(set.sigismember(SIGINT), Ok(true));
    assert_eq!(set.sigismember(SIGCHLD), Ok(true));
    assert_eq!(set.sigismember(SIGKILL), Ok(false));
    assert!(set.sigaddset(65).is_err());
}
