//! Matching candidate names against name constraints.
//!
//! These are the leaf predicates of name constraint enforcement: each takes
//! a constraint value and a candidate name of the same form and decides
//! whether the candidate falls under the constraint. A constraint that is
//! missing or syntactically unusable raises `INVALID_NAME_CONSTRAINTS` in
//! the caller-provided status; a missing candidate simply does not match.
//!
//! All string comparison is case-insensitive on ASCII and operates on
//! explicit lengths. Nothing here assumes NUL termination.

use crate::status::ErrorStatus;

/// Length of an IPv4 address.
const V4_ADDR_LEN: usize = 4;

/// Length of an IPv6 address.
const V6_ADDR_LEN: usize = 16;


//------------ Helpers -------------------------------------------------------

/// Returns whether `name` ends in `suffix`, ignoring ASCII case.
fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    let name = name.as_bytes();
    let suffix = suffix.as_bytes();
    name.len() >= suffix.len()
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}


//------------ dns_name_matches ----------------------------------------------

/// Matches a DNS name against a DNS constraint.
///
/// The constraint is a suffix: `example.com` covers `example.com` itself as
/// well as `mail.example.com`. A candidate shorter than the constraint
/// never matches.
pub fn dns_name_matches(
    constraint: Option<&str>,
    name: Option<&str>,
    status: &mut ErrorStatus,
) -> bool {
    let constraint = match constraint {
        Some(constraint) => constraint,
        None => {
            *status |= ErrorStatus::INVALID_NAME_CONSTRAINTS;
            return false
        }
    };
    let name = match name {
        Some(name) => name,
        None => return false
    };
    ends_with_ignore_case(name, constraint)
}


//------------ url_matches ---------------------------------------------------

/// Matches a URI against a URI constraint.
///
/// A constraint starting with a dot is a proper-suffix constraint: the
/// candidate has to be strictly longer than the constraint and end in it.
/// Any other constraint has to match the candidate in full.
pub fn url_matches(
    constraint: Option<&str>,
    name: Option<&str>,
    status: &mut ErrorStatus,
) -> bool {
    let constraint = match constraint {
        Some(constraint) => constraint,
        None => {
            *status |= ErrorStatus::INVALID_NAME_CONSTRAINTS;
            return false
        }
    };
    let name = match name {
        Some(name) => name,
        None => return false
    };
    if constraint.starts_with('.') {
        name.len() > constraint.len()
            && ends_with_ignore_case(name, constraint)
    }
    else {
        name.eq_ignore_ascii_case(constraint)
    }
}


//------------ rfc822_name_matches -------------------------------------------

/// Matches an RFC 822 mailbox against an RFC 822 constraint.
///
/// A constraint containing an `@` names a single mailbox and has to match
/// in full. Otherwise the constraint restricts the host part: a candidate
/// mailbox is matched by its host portion under the URI rules, a candidate
/// without an `@` has to match the constraint in full.
pub fn rfc822_name_matches(
    constraint: Option<&str>,
    name: Option<&str>,
    status: &mut ErrorStatus,
) -> bool {
    let constraint = match constraint {
        Some(constraint) => constraint,
        None => {
            *status |= ErrorStatus::INVALID_NAME_CONSTRAINTS;
            return false
        }
    };
    let name = match name {
        Some(name) => name,
        None => return false
    };
    if constraint.contains('@') {
        name.eq_ignore_ascii_case(constraint)
    }
    else if let Some(at) = name.find('@') {
        url_matches(Some(constraint), Some(&name[at + 1..]), status)
    }
    else {
        name.eq_ignore_ascii_case(constraint)
    }
}


//------------ ip_address_matches --------------------------------------------

/// Matches an IP address against an address-and-mask constraint.
///
/// The constraint concatenates a base address and a netmask of the same
/// length, so it is eight octets for IPv4 and 32 for IPv6. The candidate
/// is a bare address. The candidate matches if it equals the base address
/// under the mask. A constraint of any other size is invalid; a candidate
/// of the wrong size simply does not match.
pub fn ip_address_matches(
    constraint: Option<&[u8]>,
    name: Option<&[u8]>,
    status: &mut ErrorStatus,
) -> bool {
    let constraint = match constraint {
        Some(constraint) => constraint,
        None => {
            *status |= ErrorStatus::INVALID_NAME_CONSTRAINTS;
            return false
        }
    };
    if constraint.len() != 2 * V4_ADDR_LEN
        && constraint.len() != 2 * V6_ADDR_LEN
    {
        *status |= ErrorStatus::INVALID_NAME_CONSTRAINTS;
        return false
    }
    let name = match name {
        Some(name) => name,
        None => return false
    };
    if name.len() * 2 != constraint.len() {
        return false
    }
    let (subnet, mask) = constraint.split_at(name.len());
    subnet.iter().zip(mask).zip(name).all(|((subnet, mask), addr)| {
        subnet & mask == addr & mask
    })
}


//============ Tests =========================================================
