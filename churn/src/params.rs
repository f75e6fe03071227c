//! Command line parsing. The option surface is small enough that a match
//! loop over argv beats pulling in a parser; everything lands in an owned
//! `Params` that gets passed around explicitly.

use std::fmt;

use crate::shm::MAX_CHILDREN;
use crate::tables::Abi;

#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    pub children: u32,
    pub syscalls_todo: Option<u64>,
    pub victim_path: Option<String>,
    pub seed: Option<u32>,
    pub quiet_level: u8,
    pub logfile: Option<String>,
    pub ignore_tainted: bool,
    pub force_abi: Option<Abi>,
    /// Percent chance a biarch call goes through the 32-bit table.
    pub chance_32bit: u32,
    /// Calls-per-watchdog-tick beyond which the block is declared corrupt.
    pub corruption_threshold: u64,
}

impl Default for Params {
    fn default() -> Params {
        Params {
            children: default_children(),
            syscalls_todo: None,
            victim_path: None,
            seed: None,
            quiet_level: 1,
            logfile: None,
            ignore_tainted: false,
            force_abi: None,
            chance_32bit: 10,
            corruption_threshold: 500_000,
        }
    }
}

pub fn default_children() -> u32 {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1);
    cpus.min(MAX_CHILDREN as u32)
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ParamError {
    Help,
    Unknown(String),
    MissingValue(String),
    BadValue(String, String),
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::Help => write!(f, "help requested"),
            ParamError::Unknown(opt) => write!(f, "unknown option '{}'", opt),
            ParamError::MissingValue(opt) => write!(f, "option '{}' needs a value", opt),
            ParamError::BadValue(opt, v) => write!(f, "bad value '{}' for option '{}'", v, opt),
        }
    }
}

pub fn usage() -> &'static str {
    "usage: churn [options]\n\
     \n\
     -c, --children N          number of worker processes\n\
     -N, --syscalls COUNT      stop after COUNT completed calls\n\
     -V, --victim PATH         walk only PATH (and follow symlinks)\n\
     -s, --seed SEED           fix the initial seed\n\
     -q, --quiet LEVEL         0=everything .. 3=errors only (default 1)\n\
     -l, --logfile PATH        also append log lines to PATH\n\
         --ignore-tainted      keep fuzzing a tainted kernel\n\
         --32                  only exercise the 32-bit table\n\
         --64                  only exercise the 64-bit table\n\
         --chance-32bit PCT    percent of calls using the 32-bit table\n\
         --corruption-threshold N\n\
                               calls per watchdog tick considered corrupt\n\
     -h, --help                this text\n"
}

fn parse_num<T: std::str::FromStr>(opt: &str, v: Option<String>) -> Result<T, ParamError> {
    let v = v.ok_or_else(|| ParamError::MissingValue(opt.to_string()))?;
    v.parse()
        .map_err(|_| ParamError::BadValue(opt.to_string(), v))
}

impl Params {
    pub fn parse<I>(args: I) -> Result<Params, ParamError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut p = Params::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--children" => {
                    p.children = parse_num(&arg, args.next())?;
                    if p.children == 0 || p.children > MAX_CHILDREN as u32 {
                        return Err(ParamError::BadValue(arg, p.children.to_string()));
                    }
                }
                "-N" | "--syscalls" => {
                    p.syscalls_todo = Some(parse_num(&arg, args.next())?);
                }
                "-V" | "--victim" => {
                    p.victim_path =
                        Some(args.next().ok_or(ParamError::MissingValue(arg))?);
                }
                "-s" | "--seed" => {
                    p.seed = Some(parse_num(&arg, args.next())?);
                }
                "-q" | "--quiet" => {
                    p.quiet_level = parse_num(&arg, args.next())?;
                }
                "-l" | "--logfile" => {
                    p.logfile = Some(args.next().ok_or(ParamError::MissingValue(arg))?);
                }
                "--ignore-tainted" => p.ignore_tainted = true,
                "--32" => p.force_abi = Some(Abi::Bits32),
                "--64" => p.force_abi = Some(Abi::Bits64),
                "--chance-32bit" => {
                    p.chance_32bit = parse_num(&arg, args.next())?;
                    if p.chance_32bit > 100 {
                        return Err(ParamError::BadValue(arg, p.chance_32bit.to_string()));
                    }
                }
                "--corruption-threshold" => {
                    p.corruption_threshold = parse_num(&arg, args.next())?;
                }
                "-h" | "--help" => return Err(ParamError::Help),
                other => return Err(ParamError::Unknown(other.to_string())),
            }
        }
        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Params, ParamError> {
        Params::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_are_sane() {
        let p = parse(&[]).unwrap();
        assert!(p.children >= 1);
        assert_eq!(p.syscalls_todo, None);
        assert_eq!(p.chance_32bit, 10);
        assert_eq!(p.corruption_threshold, 500_000);
        assert!(!p.ignore_tainted);
        assert_eq!(p.force_abi, None);
    }

    #[test]
    fn full_command_line_round_trips() {
        let p = parse(&[
            "--children", "4",
            "--syscalls", "1000",
            "--seed", "42",
            "--victim", "/tmp/victim",
            "--quiet", "2",
            "--logfile", "churn.log",
            "--ignore-tainted",
            "--chance-32bit", "25",
            "--corruption-threshold", "12345",
        ])
        .unwrap();
        assert_eq!(p.children, 4);
        assert_eq!(p.syscalls_todo, Some(1000));
        assert_eq!(p.seed, Some(42));
        assert_eq!(p.victim_path.as_deref(), Some("/tmp/victim"));
        assert_eq!(p.quiet_level, 2);
        assert_eq!(p.logfile.as_deref(), Some("churn.log"));
        assert!(p.ignore_tainted);
        assert_eq!(p.chance_32bit, 25);
        assert_eq!(p.corruption_threshold, 12345);
    }

    #[test]
    fn short_options_alias_the_long_ones() {
        let p = parse(&["-c", "2", "-N", "10", "-s", "7", "-V", "/x", "-q", "0"]).unwrap();
        assert_eq!(p.children, 2);
        assert_eq!(p.syscalls_todo, Some(10));
        assert_eq!(p.seed, Some(7));
        assert_eq!(p.victim_path.as_deref(), Some("/x"));
        assert_eq!(p.quiet_level, 0);
    }

    #[test]
    fn abi_forcing() {
        assert_eq!(parse(&["--32"]).unwrap().force_abi, Some(Abi::Bits32));
        assert_eq!(parse(&["--64"]).unwrap().force_abi, Some(Abi::Bits64));
    }

    #[test]
    fn errors_are_reported() {
        assert_eq!(parse(&["--bogus"]), Err(ParamError::Unknown("--bogus".into())));
        assert!(matches!(parse(&["-c"]), Err(ParamError::MissingValue(_))));
        assert!(matches!(parse(&["-c", "zero"]), Err(ParamError::BadValue(_, _))));
        assert!(matches!(parse(&["-c", "0"]), Err(ParamError::BadValue(_, _))));
        assert!(matches!(
            parse(&["--chance-32bit", "101"]),
            Err(ParamError::BadValue(_, _))
        ));
        assert_eq!(parse(&["--help"]), Err(ParamError::Help));
    }
}
