//! Address selection for multi-homed discovery records.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};

/// Chooses one usable address from an ordered candidate list.
///
/// A single-entry list is returned as-is, without validation.
/// Otherwise the first syntactically valid IPv4 literal wins
/// outright; failing that, the first valid IPv6 literal outside
/// `fe80::/10`. A multi-homed record with neither fails with
/// [`Error::NoUsableAddress`] rather than leaving the device
/// unreachable.
pub fn select_address(candidates: &[String]) -> Result<String> {
    if candidates.len() == 1 {
        return Ok(candidates[0].clone());
    }

    if let Some(v4) = candidates
        .iter()
        .find(|candidate| candidate.parse::<Ipv4Addr>().is_ok())
    {
        return Ok(v4.clone());
    }

    candidates
        .iter()
        .find(|candidate| {
            candidate
                .parse::<Ipv6Addr>()
                .is_ok_and(|addr| !is_link_local(&addr))
        })
        .cloned()
        .ok_or(Error::NoUsableAddress)
}

fn is_link_local(addr: &Ipv6Addr) -> bool {
    addr.segments()[0] & 0xffc0 == 0xfe80
}
