//! Kernel taint polling. A non-zero taint word means the kernel has seen
//! something (oops, warning, bad module) that makes further results
//! untrustworthy, which is exactly the signal a fuzzer is hunting for.

use std::fs;
use std::io;
use std::path::Path;

pub const TAINT_FILE: &str = "/proc/sys/kernel/tainted";

/// Parse the taint word from the given file. Split out from the /proc
/// path so tests can feed a fixture.
pub fn read_taint_from(path: &Path) -> io::Result<u64> {
    let raw = fs::read_to_string(path)?;
    raw.trim()
        .parse::<u64>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// The current taint word; unreadable or unparsable sources count as
/// untainted so the fuzzer still runs on locked-down /proc.
pub fn read_taint() -> u64 {
    read_taint_from(Path::new(TAINT_FILE)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_clean_and_tainted_words() {
        assert_eq!(read_taint_from(fixture("0\n").path()).unwrap(), 0);
        assert_eq!(read_taint_from(fixture("512\n").path()).unwrap(), 512);
        assert_eq!(read_taint_from(fixture("3\n").path()).unwrap(), 3);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(read_taint_from(fixture("not-a-number\n").path()).is_err());
        assert!(read_taint_from(Path::new("/nonexistent-taint-file")).is_err());
    }

    #[test]
    fn live_read_never_panics() {
        let _ = read_taint();
    }
}
