//! The file index and descriptor pools.
//!
//! At startup the supervisor walks the configured roots and records every
//! path the fuzzer could plausibly open, then opens a bounded pool of
//! descriptors into the shared block so every worker inherits them. The
//! index itself is immutable after the walk.

use std::ffi::CString;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use log::{debug, info, warn};

use churn_syscall::{O_NONBLOCK, O_RDONLY, O_RDWR, O_WRONLY};

use crate::pages::PAGE_SIZE;
use crate::rnd::Rnd;
use crate::sanitise::sockaddr::{PF_INET, PF_INET6, PF_NETLINK, PF_UNIX, SOCK_DGRAM, SOCK_RAW, SOCK_STREAM};
use crate::shm::{Shm, NR_FILE_FDS, NR_SOCKET_FDS};

/// Exact-path matches that must never enter the index: nodes that wedge
/// the machine, spam the console, or feed the fuzzer its own log stream.
const IGNORED_PATHS: &[&str] = &[
    ".",
    "..",
    "/proc/sysrq-trigger",
    "/proc/kmem",
    "/proc/kcore",
    "/dev/log",
    "/dev/mem",
    "/dev/kmem",
    "/dev/kmsg",
];

/// Basename suffixes that must never enter the index; these are the
/// per-process tunables whose mutation skews later runs.
const IGNORED_SUFFIXES: &[&str] = &["coredump_filter", "make-it-fail", "oom_adj", "oom_score_adj"];

/// Writing random bytes at terminals hangs up consoles.
const IGNORED_PREFIX: &str = "tty";

/// Matches the depth bound the walk needs to stay clear of symlink loops
/// when `--victim` turns following on.
const MAX_WALK_DEPTH: usize = 32;

/// Attempts before `open_file` gives up on the whole pool slot.
const OPEN_RETRIES: u32 = 10;

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The ignore filter. Pruning a directory prunes its whole subtree.
pub fn ignored(path: &str) -> bool {
    if IGNORED_PATHS.contains(&path) {
        return true;
    }
    let base = basename(path);
    if IGNORED_SUFFIXES.iter().any(|suf| base.ends_with(suf)) {
        return true;
    }
    base.starts_with(IGNORED_PREFIX)
}

/// Derive the open flag this entry supports from its permission bits and
/// the fuzzer's own ids. Directories are forced read-only; entries we can
/// neither read nor write are dropped.
pub fn open_mode(meta: &fs::Metadata, my_uid: u32, my_gid: u32) -> Option<i32> {
    let mode = meta.mode();
    let (r_bit, w_bit) = if meta.uid() == my_uid {
        (0o400, 0o200)
    } else if meta.gid() == my_gid {
        (0o040, 0o020)
    } else {
        (0o004, 0o002)
    };
    let can_read = mode & r_bit != 0;
    let can_write = mode & w_bit != 0;
    if !can_read && !can_write {
        return None;
    }
    if meta.is_dir() {
        return Some(O_RDONLY);
    }
    Some(match (can_read, can_write) {
        (true, true) => O_RDWR,
        (true, false) => O_RDONLY,
        (false, true) => O_WRONLY,
        (false, false) => unreachable!(),
    })
}

pub struct FileIndex {
    paths: Vec<String>,
}

impl FileIndex {
    /// Walk the given roots and collect every openable path. The walk is
    /// depth-first, does not cross device boundaries, and skips symlinks
    /// unless `follow_symlinks` (the single-victim case). `stop` is polled
    /// so a terminal exit reason aborts the walk early.
    pub fn build(roots: &[String], follow_symlinks: bool, stop: &dyn Fn() -> bool) -> FileIndex {
        let my_uid = unsafe { churn_syscall::getuid() };
        let my_gid = unsafe { churn_syscall::getgid() };
        let mut paths = Vec::new();
        for root in roots {
            let before = paths.len();
            // In victim mode the root itself may be a symlink; resolve it
            // so the device comparison matches what the walk will see.
            let meta = if follow_symlinks {
                fs::metadata(root)
            } else {
                fs::symlink_metadata(root)
            };
            let meta = match meta {
                Ok(m) => m,
                Err(e) => {
                    warn!("cannot stat walk root {}: {}", root, e);
                    continue;
                }
            };
            visit(
                Path::new(root),
                meta.dev(),
                0,
                follow_symlinks,
                my_uid,
                my_gid,
                stop,
                &mut paths,
            );
            info!("added {} filenames from {}", paths.len() - before, root);
        }
        FileIndex { paths }
    }

    pub fn from_paths(paths: Vec<String>) -> FileIndex {
        FileIndex { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths().is_empty()
    }

    /// A uniformly chosen path, or None when the index is empty.
    pub fn get_filename(&self, rnd: &mut Rnd) -> Option<&str> {
        if self.paths.is_empty() {
            return None;
        }
        Some(&self.paths[rnd.range_usize(self.paths.len())])
    }
}

#[allow(clippy::too_many_arguments)]
fn visit(
    path: &Path,
    root_dev: u64,
    depth: usize,
    follow_symlinks: bool,
    my_uid: u32,
    my_gid: u32,
    stop: &dyn Fn() -> bool,
    out: &mut Vec<String>,
) {
    if depth > MAX_WALK_DEPTH || stop() {
        return;
    }
    let Some(path_str) = path.to_str() else {
        return;
    };
    if ignored(path_str) {
        return;
    }
    let meta = if follow_symlinks {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    };
    let meta = match meta {
        Ok(m) => m,
        Err(_) => return,
    };
    if meta.file_type().is_symlink() {
        return;
    }
    if meta.dev() != root_dev {
        return;
    }
    if open_mode(&meta, my_uid, my_gid).is_none() {
        return;
    }
    out.push(path_str.to_string());
    if meta.is_dir() {
        let entries = match fs::read_dir(path) {
            Ok(e) => e,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            visit(
                &entry.path(),
                root_dev,
                depth + 1,
                follow_symlinks,
                my_uid,
                my_gid,
                stop,
                out,
            );
        }
    }
}

/// Open one pool descriptor, retrying a handful of different random draws
/// past entries that vanished or changed permissions since the walk.
fn open_file(index: &FileIndex, rnd: &mut Rnd, my_uid: u32, my_gid: u32) -> Option<i32> {
    for _ in 0..OPEN_RETRIES {
        let Some(name) = index.get_filename(rnd) else {
            return None;
        };
        let meta = match fs::symlink_metadata(name) {
            Ok(m) => m,
            Err(_) => continue,
        };
        let Some(flags) = open_mode(&meta, my_uid, my_gid) else {
            continue;
        };
        let cpath = match CString::new(name) {
            Ok(c) => c,
            Err(_) => continue,
        };
        match unsafe {
            churn_syscall::open(cpath.as_ptr() as *const churn_syscall::char, flags | O_NONBLOCK, 0)
        } {
            Ok(fd) => {
                let modestr = match flags {
                    O_RDONLY => "read-only",
                    O_WRONLY => "write-only",
                    O_RDWR => "read-write",
                    _ => "unknown",
                };
                debug!("fd[{}] = {} ({})", fd, name, modestr);
                return Some(fd);
            }
            Err(e) => {
                debug!("couldn't open {} (errno {})", name, e.raw());
            }
        }
    }
    None
}

/// Fill the shared descriptor pool. Called by the supervisor before the
/// first fork and again on every regeneration cycle.
pub fn open_files(shm: &Shm, index: &FileIndex, rnd: &mut Rnd) {
    use std::sync::atomic::Ordering;

    let my_uid = unsafe { churn_syscall::getuid() };
    let my_gid = unsafe { churn_syscall::getgid() };
    let nr_to_open = index.len().min(NR_FILE_FDS);
    let mut opened = 0;
    for _ in 0..nr_to_open {
        if let Some(fd) = open_file(index, rnd, my_uid, my_gid) {
            shm.file_fds[opened].store(fd, Ordering::Relaxed);
            opened += 1;
        }
    }
    shm.nr_file_fds.store(opened as u32, Ordering::Relaxed);
}

/// Close and forget every pool descriptor, resetting the fd cursor state.
pub fn close_files(shm: &Shm) {
    use std::sync::atomic::Ordering;

    shm.current_fd.store(0, Ordering::Relaxed);
    shm.fd_lifetime.store(0, Ordering::Relaxed);
    for slot in &shm.file_fds {
        let fd = slot.swap(0, Ordering::Relaxed);
        if fd > 0 {
            unsafe {
                let _ = churn_syscall::close(fd);
            }
        }
    }
    shm.nr_file_fds.store(0, Ordering::Relaxed);
}

/// Open a small pool of sockets across several families so fd-typed
/// arguments sometimes land on protocol code. Failures (unsupported
/// family, no permission) simply leave the slot empty.
pub fn open_sockets(shm: &Shm) {
    use std::sync::atomic::Ordering;

    const KINDS: &[(u16, i32)] = &[
        (PF_UNIX, SOCK_STREAM),
        (PF_UNIX, SOCK_DGRAM),
        (PF_INET, SOCK_DGRAM),
        (PF_INET, SOCK_STREAM),
        (PF_INET6, SOCK_DGRAM),
        (PF_NETLINK, SOCK_RAW),
    ];
    let mut opened = 0;
    for i in 0..NR_SOCKET_FDS {
        let (pf, kind) = KINDS[i % KINDS.len()];
        match unsafe { churn_syscall::socket(pf as i32, kind | O_NONBLOCK, 0) } {
            Ok(fd) => {
                shm.socket_fds[i].store(fd, Ordering::Relaxed);
                opened += 1;
            }
            Err(_) => continue,
        }
    }
    debug!("opened {} sockets into the shared pool", opened);
}

pub fn close_sockets(shm: &Shm) {
    use std::sync::atomic::Ordering;

    for slot in &shm.socket_fds {
        let fd = slot.swap(0, Ordering::Relaxed);
        if fd > 0 {
            unsafe {
                let _ = churn_syscall::close(fd);
            }
        }
    }
}

/// A pathname argument: usually a verbatim index entry, occasionally a
/// mangled buffer built from page-sized junk. Always returns an owned,
/// NUL-terminated byte string; the caller's arena keeps it alive for the
/// duration of the call and then drops it.
pub fn generate_pathname(index: &FileIndex, rnd: &mut Rnd) -> Option<Vec<u8>> {
    let pathname = index.get_filename(rnd)?.as_bytes().to_vec();

    if rnd.chance(90) {
        let mut out = pathname;
        out.push(0);
        return Some(out);
    }

    // Build a bogus filename out of random bytes.
    let len = pathname.len().min(PAGE_SIZE / 2);
    let total = len + 1 + rnd.range_usize(128);
    let mut newpath = vec![0u8; total];
    rnd.fill(&mut newpath);
    for b in newpath.iter_mut() {
        // Interior NULs would silently shorten the argument.
        if *b == 0 {
            *b = b'A';
        }
    }

    if !rnd.chance(50) {
        // Not pure junk: overlay the real path, either verbatim at the
        // start or behind a "./" so it looks relative.
        if rnd.chance(50) {
            newpath[..len].copy_from_slice(&pathname[..len]);
        } else {
            newpath[0] = b'.';
            newpath[1..len + 1].copy_from_slice(&pathname[..len]);
        }
        if rnd.chance(50) {
            for b in newpath[..len].iter_mut() {
                if *b == b'/' {
                    let mut r = (rnd.u32() & 0xff) as u8;
                    if r == 0 {
                        r = b'B';
                    }
                    *b = r;
                }
            }
        }
    }

    if rnd.chance(50) {
        newpath.truncate(len);
        newpath.push(b'/');
    }
    newpath.push(0);
    Some(newpath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::os::unix::fs::symlink;

    #[test]
    fn exact_matches_are_ignored() {
        assert!(ignored("/proc/sysrq-trigger"));
        assert!(ignored("/dev/mem"));
        assert!(ignored("/dev/kmsg"));
        assert!(ignored("."));
        assert!(!ignored("/dev/null"));
    }

    #[test]
    fn suffix_and_prefix_rules_apply_to_basenames() {
        assert!(ignored("/proc/123/coredump_filter"));
        assert!(ignored("/proc/456/oom_adj"));
        assert!(ignored("/proc/456/oom_score_adj"));
        assert!(ignored("/sys/kernel/debug/make-it-fail"));
        assert!(ignored("/dev/tty0"));
        assert!(ignored("/dev/ttyS4"));
        assert!(!ignored("/dev/betty"));
        assert!(!ignored("/proc/oom_adj_description"));
    }

    #[test]
    fn open_mode_honours_owner_bits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"x").unwrap();
        let my_uid = unsafe { churn_syscall::getuid() };
        let my_gid = unsafe { churn_syscall::getgid() };

        let set = |mode: u32| {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            fs::metadata(&path).unwrap()
        };
        assert_eq!(open_mode(&set(0o400), my_uid, my_gid), Some(O_RDONLY));
        assert_eq!(open_mode(&set(0o200), my_uid, my_gid), Some(O_WRONLY));
        assert_eq!(open_mode(&set(0o600), my_uid, my_gid), Some(O_RDWR));
        assert_eq!(open_mode(&set(0o000), my_uid, my_gid), None);
    }

    #[test]
    fn directories_are_forced_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let my_uid = unsafe { churn_syscall::getuid() };
        let my_gid = unsafe { churn_syscall::getgid() };
        let meta = fs::metadata(dir.path()).unwrap();
        assert_eq!(open_mode(&meta, my_uid, my_gid), Some(O_RDONLY));
    }

    #[test]
    fn walk_respects_the_ignore_filter() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/ordinary"), b"x").unwrap();
        fs::write(dir.path().join("sub/coredump_filter"), b"x").unwrap();
        fs::write(dir.path().join("tty7"), b"x").unwrap();

        let roots = vec![dir.path().to_str().unwrap().to_string()];
        let index = FileIndex::build(&roots, false, &|| false);
        assert!(index.paths().iter().any(|p| p.ends_with("/ordinary")));
        for p in index.paths() {
            assert!(!ignored(p), "indexed an ignored path: {}", p);
        }
        assert!(!index.paths().iter().any(|p| p.ends_with("coredump_filter")));
        assert!(!index.paths().iter().any(|p| p.ends_with("tty7")));
    }

    #[test]
    fn walk_skips_symlinks_unless_following() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real"), b"x").unwrap();
        symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let roots = vec![dir.path().to_str().unwrap().to_string()];
        let index = FileIndex::build(&roots, false, &|| false);
        assert!(!index.paths().iter().any(|p| p.ends_with("/alias")));

        let followed = FileIndex::build(&roots, true, &|| false);
        assert!(followed.paths().iter().any(|p| p.ends_with("/alias")));
    }

    #[test]
    fn walk_stops_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), b"x").unwrap();
        let roots = vec![dir.path().to_str().unwrap().to_string()];
        let index = FileIndex::build(&roots, false, &|| true);
        assert!(index.is_empty());
    }

    #[test]
    fn empty_index_yields_no_filename() {
        let index = FileIndex::from_paths(Vec::new());
        let mut rnd = Rnd::new(1);
        assert_eq!(index.get_filename(&mut rnd), None);
        assert!(generate_pathname(&index, &mut rnd).is_none());
    }

    #[test]
    fn generated_pathnames_are_well_formed() {
        let index = FileIndex::from_paths(vec!["/dev/null".into(), "/proc/uptime".into()]);
        let mut rnd = Rnd::new(0xc0ffee);
        for _ in 0..500 {
            let path = generate_pathname(&index, &mut rnd).unwrap();
            assert!(path.len() <= PAGE_SIZE);
            assert_eq!(path.last(), Some(&0));
            assert!(!path[..path.len() - 1].contains(&0));
        }
    }

    proptest! {
        #[test]
        fn ignore_filter_catches_all_suffix_variants(prefix in "[a-z/]{0,12}", suf in 0usize..4) {
            let path = format!("/{}{}", prefix, IGNORED_SUFFIXES[suf]);
            prop_assert!(ignored(&path));
        }
    }
}
