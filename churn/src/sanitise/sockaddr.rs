//! Socket address generators, one per protocol family the fuzzer knows
//! how to shape. Each returns an owned byte buffer laid out as the
//! kernel-side struct plus the length to report, and the caller parks the
//! buffer in the per-call arena.

// The address structs mirror kernel layouts; their fields are consumed
// as raw bytes rather than read individually.
#![allow(non_camel_case_types, dead_code)]

use crate::rnd::Rnd;

pub const PF_UNSPEC: u16 = 0;
pub const PF_UNIX: u16 = 1;
pub const PF_INET: u16 = 2;
pub const PF_X25: u16 = 9;
pub const PF_INET6: u16 = 10;
pub const PF_NETLINK: u16 = 16;
pub const PF_PACKET: u16 = 17;
pub const PF_LLC: u16 = 26;

pub const SOCK_STREAM: i32 = 1;
pub const SOCK_DGRAM: i32 = 2;
pub const SOCK_RAW: i32 = 3;

/// Families the unhinted path draws from.
const GENERATABLE: &[u16] = &[
    PF_UNIX, PF_INET, PF_X25, PF_INET6, PF_NETLINK, PF_PACKET, PF_LLC,
];

#[repr(C)]
struct sockaddr_un {
    sun_family: u16,
    sun_path: [u8; 108],
}

#[repr(C)]
struct sockaddr_in {
    sin_family: u16,
    sin_port: u16,
    sin_addr: u32,
    sin_zero: [u8; 8],
}

#[repr(C)]
struct sockaddr_in6 {
    sin6_family: u16,
    sin6_port: u16,
    sin6_flowinfo: u32,
    sin6_addr: [u8; 16],
    sin6_scope_id: u32,
}

#[repr(C)]
struct sockaddr_nl {
    nl_family: u16,
    nl_pad: u16,
    nl_pid: u32,
    nl_groups: u32,
}

#[repr(C)]
struct sockaddr_x25 {
    sx25_family: u16,
    sx25_addr: [u8; 16],
}

#[repr(C)]
struct sockaddr_llc {
    sllc_family: u16,
    sllc_arphrd: u16,
    sllc_test: u8,
    sllc_xid: u8,
    sllc_ua: u8,
    sllc_sap: u8,
    sllc_mac: [u8; 6],
    // Padded out to sizeof(struct sockaddr), as the kernel declares it.
    sllc_pad: [u8; 2],
}

#[repr(C)]
struct sockaddr_ll {
    sll_family: u16,
    sll_protocol: u16,
    sll_ifindex: i32,
    sll_hatype: u16,
    sll_pkttype: u8,
    sll_halen: u8,
    sll_addr: [u8; 8],
}

fn bytes_of<T>(v: &T) -> Vec<u8> {
    let len = core::mem::size_of::<T>();
    let mut out = vec![0u8; len];
    unsafe {
        core::ptr::copy_nonoverlapping(v as *const T as *const u8, out.as_mut_ptr(), len);
    }
    out
}

fn gen_unixsock(rnd: &mut Rnd) -> Vec<u8> {
    let mut sa = sockaddr_un {
        sun_family: PF_UNIX,
        sun_path: [0; 108],
    };
    let len = 1 + rnd.range_usize(100);
    sa.sun_path[0] = b'/';
    for b in sa.sun_path[1..len].iter_mut() {
        // Printable junk so the kernel sees a plausible abstract-free path.
        *b = b'a' + (rnd.u32() % 26) as u8;
    }
    bytes_of(&sa)
}

fn gen_ipv4(rnd: &mut Rnd) -> Vec<u8> {
    let sa = sockaddr_in {
        sin_family: PF_INET,
        sin_port: rnd.u32() as u16,
        sin_addr: rnd.u32(),
        sin_zero: [0; 8],
    };
    bytes_of(&sa)
}

fn gen_ipv6(rnd: &mut Rnd) -> Vec<u8> {
    let mut addr = [0u8; 16];
    rnd.fill(&mut addr);
    let sa = sockaddr_in6 {
        sin6_family: PF_INET6,
        sin6_port: rnd.u32() as u16,
        sin6_flowinfo: rnd.u32(),
        sin6_addr: addr,
        sin6_scope_id: rnd.u32(),
    };
    bytes_of(&sa)
}

fn gen_netlink(rnd: &mut Rnd) -> Vec<u8> {
    let sa = sockaddr_nl {
        nl_family: PF_NETLINK,
        nl_pad: 0,
        nl_pid: rnd.u32(),
        nl_groups: rnd.u32(),
    };
    bytes_of(&sa)
}

fn gen_x25(rnd: &mut Rnd) -> Vec<u8> {
    let mut sa = sockaddr_x25 {
        sx25_family: PF_X25,
        sx25_addr: [0; 16],
    };
    let len = rnd.range_usize(15);
    for b in sa.sx25_addr[..len].iter_mut() {
        *b = b'0' + (rnd.u32() % 10) as u8;
    }
    bytes_of(&sa)
}

const ARPHRD_ETHER: u16 = 1;

fn gen_llc(rnd: &mut Rnd) -> Vec<u8> {
    let mut mac = [0u8; 6];
    rnd.fill(&mut mac);
    let sa = sockaddr_llc {
        sllc_family: PF_LLC,
        sllc_arphrd: ARPHRD_ETHER,
        sllc_test: rnd.u32() as u8,
        sllc_xid: rnd.u32() as u8,
        sllc_ua: rnd.u32() as u8,
        sllc_sap: rnd.u32() as u8,
        sllc_mac: mac,
        sllc_pad: [0; 2],
    };
    bytes_of(&sa)
}

fn gen_packet(rnd: &mut Rnd) -> Vec<u8> {
    let mut addr = [0u8; 8];
    rnd.fill(&mut addr);
    let sa = sockaddr_ll {
        sll_family: PF_PACKET,
        sll_protocol: rnd.u32() as u16,
        sll_ifindex: rnd.range(16) as i32,
        sll_hatype: ARPHRD_ETHER,
        sll_pkttype: rnd.u32() as u8,
        sll_halen: 6,
        sll_addr: addr,
    };
    bytes_of(&sa)
}

/// Generate a socket address for the hinted family, or for a random
/// family when unhinted. Returns the buffer and the length to pass as
/// `addrlen`; unshapeable families yield None and the caller falls back
/// to a generic pointer.
pub fn generate_sockaddr(rnd: &mut Rnd, pf: Option<u16>) -> Option<(Vec<u8>, u32)> {
    let pf = match pf {
        Some(pf) => pf,
        None => GENERATABLE[rnd.range_usize(GENERATABLE.len())],
    };
    let buf = match pf {
        PF_UNIX => gen_unixsock(rnd),
        PF_INET => gen_ipv4(rnd),
        PF_INET6 => gen_ipv6(rnd),
        PF_NETLINK => gen_netlink(rnd),
        PF_X25 => gen_x25(rnd),
        PF_LLC => gen_llc(rnd),
        PF_PACKET => gen_packet(rnd),
        _ => return None,
    };
    let len = buf.len() as u32;
    Some((buf, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family_of(buf: &[u8]) -> u16 {
        u16::from_ne_bytes([buf[0], buf[1]])
    }

    #[test]
    fn hinted_families_come_back_as_asked() {
        let mut rnd = Rnd::new(77);
        for &pf in GENERATABLE {
            let (buf, len) = generate_sockaddr(&mut rnd, Some(pf)).unwrap();
            assert_eq!(family_of(&buf), pf);
            assert_eq!(len as usize, buf.len());
        }
    }

    #[test]
    fn lengths_match_the_kernel_structs() {
        let mut rnd = Rnd::new(78);
        let (buf, _) = generate_sockaddr(&mut rnd, Some(PF_INET)).unwrap();
        assert_eq!(buf.len(), 16);
        let (buf, _) = generate_sockaddr(&mut rnd, Some(PF_INET6)).unwrap();
        assert_eq!(buf.len(), 28);
        let (buf, _) = generate_sockaddr(&mut rnd, Some(PF_NETLINK)).unwrap();
        assert_eq!(buf.len(), 12);
        let (buf, _) = generate_sockaddr(&mut rnd, Some(PF_UNIX)).unwrap();
        assert_eq!(buf.len(), 110);
    }

    #[test]
    fn unhinted_requests_pick_a_generatable_family() {
        let mut rnd = Rnd::new(79);
        for _ in 0..100 {
            let (buf, _) = generate_sockaddr(&mut rnd, None).unwrap();
            assert!(GENERATABLE.contains(&family_of(&buf)));
        }
    }

    #[test]
    fn unshapeable_family_yields_none() {
        let mut rnd = Rnd::new(80);
        assert!(generate_sockaddr(&mut rnd, Some(PF_UNSPEC)).is_none());
        assert!(generate_sockaddr(&mut rnd, Some(999)).is_none());
    }

    #[test]
    fn unix_paths_are_rooted_and_terminated() {
        let mut rnd = Rnd::new(81);
        for _ in 0..50 {
            let (buf, _) = generate_sockaddr(&mut rnd, Some(PF_UNIX)).unwrap();
            assert_eq!(buf[2], b'/');
            assert_eq!(buf[buf.len() - 1], 0);
        }
    }
}
