//! Validation policies over built chains.
//!
//! A policy reduces the many status bits of a chain context into a single
//! verdict: one error code, or none, plus the position of the certificate
//! responsible. Five built-in policies cover the common questions asked of
//! a chain; anything else can be installed into a [`PolicyRegistry`] under
//! a caller-chosen identifier.
//!
//! Policies are pure functions of the context and the parameters. They
//! never touch the chain.

use std::collections::HashMap;
use std::{error, fmt};
use log::debug;
use crate::cert::{Cert, ExtValue, Name, SubjectAltName};
use crate::chain::ChainContext;
use crate::oid;
use crate::status::ErrorStatus;


//------------ Well-known public keys ----------------------------------------

/// The public keys of the generally known test roots.
///
/// A chain ending in one of these is reported as ending in a test root
/// rather than a plainly untrusted one by the Authenticode policy.
static TEST_ROOT_KEYS: [&[u8]; 2] = [
    &[
        0x30, 0x47, 0x02, 0x40, 0x81, 0x55, 0x22, 0xb9, 0x8a, 0xa4, 0x6f,
        0xed, 0xd6, 0xe7, 0xd9, 0x66, 0x0f, 0x55, 0xbc, 0xd7, 0xcd, 0xd5,
        0xbc, 0x4e, 0x40, 0x02, 0x21, 0xa2, 0xb1, 0xf7, 0x87, 0x30, 0x85,
        0x5e, 0xd2, 0xf2, 0x44, 0xb9, 0xdc, 0x9b, 0x75, 0xb6, 0xfb, 0x46,
        0x5f, 0x42, 0xb6, 0x9d, 0x23, 0x36, 0x0b, 0xde, 0x54, 0x0f, 0xcd,
        0xbd, 0x1f, 0x99, 0x2a, 0x10, 0x58, 0x11, 0xcb, 0x40, 0xcb, 0xb5,
        0xa7, 0x41, 0x02, 0x03, 0x01, 0x00, 0x01,
    ],
    &[
        0x30, 0x47, 0x02, 0x40, 0x9c, 0x50, 0x05, 0x1d, 0xe2, 0x0e, 0x4c,
        0x53, 0xd8, 0xd9, 0xb5, 0xe5, 0xfd, 0xe9, 0xe3, 0xad, 0x83, 0x4b,
        0x80, 0x08, 0xd9, 0xdc, 0xe8, 0xe8, 0x35, 0xf8, 0x11, 0xf1, 0xe9,
        0x9b, 0x03, 0x7a, 0x65, 0x64, 0x76, 0x35, 0xce, 0x38, 0x2c, 0xf2,
        0xb6, 0x71, 0x9e, 0x06, 0xd9, 0xbf, 0xbb, 0x31, 0x69, 0xa3, 0xf6,
        0x30, 0xa0, 0x78, 0x7b, 0x18, 0xdd, 0x50, 0x4d, 0x79, 0x1e, 0xeb,
        0x61, 0xc1, 0x02, 0x03, 0x01, 0x00, 0x01,
    ],
];

/// The public keys of the Microsoft roots.
static MICROSOFT_ROOT_KEYS: [&[u8]; 3] = [
    &[
        0x30, 0x82, 0x01, 0x0a, 0x02, 0x82, 0x01, 0x01, 0x00, 0xdf, 0x08,
        0xba, 0xe3, 0x3f, 0x6e, 0x64, 0x9b, 0xf5, 0x89, 0xaf, 0x28, 0x96,
        0x4a, 0x07, 0x8f, 0x1b, 0x2e, 0x8b, 0x3e, 0x1d, 0xfc, 0xb8, 0x80,
        0x69, 0xa3, 0xa1, 0xce, 0xdb, 0xdf, 0xb0, 0x8e, 0x6c, 0x89, 0x76,
        0x29, 0x4f, 0xca, 0x60, 0x35, 0x39, 0xad, 0x72, 0x32, 0xe0, 0x0b,
        0xae, 0x29, 0x3d, 0x4c, 0x16, 0xd9, 0x4b, 0x3c, 0x9d, 0xda, 0xc5,
        0xd3, 0xd1, 0x09, 0xc9, 0x2c, 0x6f, 0xa6, 0xc2, 0x60, 0x53, 0x45,
        0xdd, 0x4b, 0xd1, 0x55, 0xcd, 0x03, 0x1c, 0xd2, 0x59, 0x56, 0x24,
        0xf3, 0xe5, 0x78, 0xd8, 0x07, 0xcc, 0xd8, 0xb3, 0x1f, 0x90, 0x3f,
        0xc0, 0x1a, 0x71, 0x50, 0x1d, 0x2d, 0xa7, 0x12, 0x08, 0x6d, 0x7c,
        0xb0, 0x86, 0x6c, 0xc7, 0xba, 0x85, 0x32, 0x07, 0xe1, 0x61, 0x6f,
        0xaf, 0x03, 0xc5, 0x6d, 0xe5, 0xd6, 0xa1, 0x8f, 0x36, 0xf6, 0xc1,
        0x0b, 0xd1, 0x3e, 0x69, 0x97, 0x48, 0x72, 0xc9, 0x7f, 0xa4, 0xc8,
        0xc2, 0x4a, 0x4c, 0x7e, 0xa1, 0xd1, 0x94, 0xa6, 0xd7, 0xdc, 0xeb,
        0x05, 0x46, 0x2e, 0xb8, 0x18, 0xb4, 0x57, 0x1d, 0x86, 0x49, 0xdb,
        0x69, 0x4a, 0x2c, 0x21, 0xf5, 0x5e, 0x0f, 0x54, 0x2d, 0x5a, 0x43,
        0xa9, 0x7a, 0x7e, 0x6a, 0x8e, 0x50, 0x4d, 0x25, 0x57, 0xa1, 0xbf,
        0x1b, 0x15, 0x05, 0x43, 0x7b, 0x2c, 0x05, 0x8d, 0xbd, 0x3d, 0x03,
        0x8c, 0x93, 0x22, 0x7d, 0x63, 0xea, 0x0a, 0x57, 0x05, 0x06, 0x0a,
        0xdb, 0x61, 0x98, 0x65, 0x2d, 0x47, 0x49, 0xa8, 0xe7, 0xe6, 0x56,
        0x75, 0x5c, 0xb8, 0x64, 0x08, 0x63, 0xa9, 0x30, 0x40, 0x66, 0xb2,
        0xf9, 0xb6, 0xe3, 0x34, 0xe8, 0x67, 0x30, 0xe1, 0x43, 0x0b, 0x87,
        0xff, 0xc9, 0xbe, 0x72, 0x10, 0x5e, 0x23, 0xf0, 0x9b, 0xa7, 0x48,
        0x65, 0xbf, 0x09, 0x88, 0x7b, 0xcd, 0x72, 0xbc, 0x2e, 0x79, 0x9b,
        0x7b, 0x02, 0x03, 0x01, 0x00, 0x01,
    ],
    &[
        0x30, 0x82, 0x01, 0x0a, 0x02, 0x82, 0x01, 0x01, 0x00, 0xa9, 0x02,
        0xbd, 0xc1, 0x70, 0xe6, 0x3b, 0xf2, 0x4e, 0x1b, 0x28, 0x9f, 0x97,
        0x78, 0x5e, 0x30, 0xea, 0xa2, 0xa9, 0x8d, 0x25, 0x5f, 0xf8, 0xfe,
        0x95, 0x4c, 0xa3, 0xb7, 0xfe, 0x9d, 0xa2, 0x20, 0x3e, 0x7c, 0x51,
        0xa2, 0x9b, 0xa2, 0x8f, 0x60, 0x32, 0x6b, 0xd1, 0x42, 0x64, 0x79,
        0xee, 0xac, 0x76, 0xc9, 0x54, 0xda, 0xf2, 0xeb, 0x9c, 0x86, 0x1c,
        0x8f, 0x9f, 0x84, 0x66, 0xb3, 0xc5, 0x6b, 0x7a, 0x62, 0x23, 0xd6,
        0x1d, 0x3c, 0xde, 0x0f, 0x01, 0x92, 0xe8, 0x96, 0xc4, 0xbf, 0x2d,
        0x66, 0x9a, 0x9a, 0x68, 0x26, 0x99, 0xd0, 0x3a, 0x2c, 0xbf, 0x0c,
        0xb5, 0x58, 0x26, 0xc1, 0x46, 0xe7, 0x0a, 0x3e, 0x38, 0x96, 0x2c,
        0xa9, 0x28, 0x39, 0xa8, 0xec, 0x49, 0x83, 0x42, 0xe3, 0x84, 0x0f,
        0xbb, 0x9a, 0x6c, 0x55, 0x61, 0xac, 0x82, 0x7c, 0xa1, 0x60, 0x2d,
        0x77, 0x4c, 0xe9, 0x99, 0xb4, 0x64, 0x3b, 0x9a, 0x50, 0x1c, 0x31,
        0x08, 0x24, 0x14, 0x9f, 0xa9, 0xe7, 0x91, 0x2b, 0x18, 0xe6, 0x3d,
        0x98, 0x63, 0x14, 0x60, 0x58, 0x05, 0x65, 0x9f, 0x1d, 0x37, 0x52,
        0x87, 0xf7, 0xa7, 0xef, 0x94, 0x02, 0xc6, 0x1b, 0xd3, 0xbf, 0x55,
        0x45, 0xb3, 0x89, 0x80, 0xbf, 0x3a, 0xec, 0x54, 0x94, 0x4e, 0xae,
        0xfd, 0xa7, 0x7a, 0x6d, 0x74, 0x4e, 0xaf, 0x18, 0xcc, 0x96, 0x09,
        0x28, 0x21, 0x00, 0x57, 0x90, 0x60, 0x69, 0x37, 0xbb, 0x4b, 0x12,
        0x07, 0x3c, 0x56, 0xff, 0x5b, 0xfb, 0xa4, 0x66, 0x0a, 0x08, 0xa6,
        0xd2, 0x81, 0x56, 0x57, 0xef, 0xb6, 0x3b, 0x5e, 0x16, 0x81, 0x77,
        0x04, 0xda, 0xf6, 0xbe, 0xae, 0x80, 0x95, 0xfe, 0xb0, 0xcd, 0x7f,
        0xd6, 0xa7, 0x1a, 0x72, 0x5c, 0x3c, 0xca, 0xbc, 0xf0, 0x08, 0xa3,
        0x22, 0x30, 0xb3, 0x06, 0x85, 0xc9, 0xb3, 0x20, 0x77, 0x13, 0x85,
        0xdf, 0x02, 0x03, 0x01, 0x00, 0x01,
    ],
    &[
        0x30, 0x82, 0x02, 0x0a, 0x02, 0x82, 0x02, 0x01, 0x00, 0xf3, 0x5d,
        0xfa, 0x80, 0x67, 0xd4, 0x5a, 0xa7, 0xa9, 0x0c, 0x2c, 0x90, 0x20,
        0xd0, 0x35, 0x08, 0x3c, 0x75, 0x84, 0xcd, 0xb7, 0x07, 0x89, 0x9c,
        0x89, 0xda, 0xde, 0xce, 0xc3, 0x60, 0xfa, 0x91, 0x68, 0x5a, 0x9e,
        0x94, 0x71, 0x29, 0x18, 0x76, 0x7c, 0xc2, 0xe0, 0xc8, 0x25, 0x76,
        0x94, 0x0e, 0x58, 0xfa, 0x04, 0x34, 0x36, 0xe6, 0xdf, 0xaf, 0xf7,
        0x80, 0xba, 0xe9, 0x58, 0x0b, 0x2b, 0x93, 0xe5, 0x9d, 0x05, 0xe3,
        0x77, 0x22, 0x91, 0xf7, 0x34, 0x64, 0x3c, 0x22, 0x91, 0x1d, 0x5e,
        0xe1, 0x09, 0x90, 0xbc, 0x14, 0xfe, 0xfc, 0x75, 0x58, 0x19, 0xe1,
        0x79, 0xb7, 0x07, 0x92, 0xa3, 0xae, 0x88, 0x59, 0x08, 0xd8, 0x9f,
        0x07, 0xca, 0x03, 0x58, 0xfc, 0x68, 0x29, 0x6d, 0x32, 0xd7, 0xd2,
        0xa8, 0xcb, 0x4b, 0xfc, 0xe1, 0x0b, 0x48, 0x32, 0x4f, 0xe6, 0xeb,
        0xb8, 0xad, 0x4f, 0xe4, 0x5c, 0x6f, 0x13, 0x94, 0x99, 0xdb, 0x95,
        0xd5, 0x75, 0xdb, 0xa8, 0x1a, 0xb7, 0x94, 0x91, 0xb4, 0x77, 0x5b,
        0xf5, 0x48, 0x0c, 0x8f, 0x6a, 0x79, 0x7d, 0x14, 0x70, 0x04, 0x7d,
        0x6d, 0xaf, 0x90, 0xf5, 0xda, 0x70, 0xd8, 0x47, 0xb7, 0xbf, 0x9b,
        0x2f, 0x6c, 0xe7, 0x05, 0xb7, 0xe1, 0x11, 0x60, 0xac, 0x79, 0x91,
        0x14, 0x7c, 0xc5, 0xd6, 0xa6, 0xe4, 0xe1, 0x7e, 0xd5, 0xc3, 0x7e,
        0xe5, 0x92, 0xd2, 0x3c, 0x00, 0xb5, 0x36, 0x82, 0xde, 0x79, 0xe1,
        0x6d, 0xf3, 0xb5, 0x6e, 0xf8, 0x9f, 0x33, 0xc9, 0xcb, 0x52, 0x7d,
        0x73, 0x98, 0x36, 0xdb, 0x8b, 0xa1, 0x6b, 0xa2, 0x95, 0x97, 0x9b,
        0xa3, 0xde, 0xc2, 0x4d, 0x26, 0xff, 0x06, 0x96, 0x67, 0x25, 0x06,
        0xc8, 0xe7, 0xac, 0xe4, 0xee, 0x12, 0x33, 0x95, 0x31, 0x99, 0xc8,
        0x35, 0x08, 0x4e, 0x34, 0xca, 0x79, 0x53, 0xd5, 0xb5, 0xbe, 0x63,
        0x32, 0x59, 0x40, 0x36, 0xc0, 0xa5, 0x4e, 0x04, 0x4d, 0x3d, 0xdb,
        0x5b, 0x07, 0x33, 0xe4, 0x58, 0xbf, 0xef, 0x3f, 0x53, 0x64, 0xd8,
        0x42, 0x59, 0x35, 0x57, 0xfd, 0x0f, 0x45, 0x7c, 0x24, 0x04, 0x4d,
        0x9e, 0xd6, 0x38, 0x74, 0x11, 0x97, 0x22, 0x90, 0xce, 0x68, 0x44,
        0x74, 0x92, 0x6f, 0xd5, 0x4b, 0x6f, 0xb0, 0x86, 0xe3, 0xc7, 0x36,
        0x42, 0xa0, 0xd0, 0xfc, 0xc1, 0xc0, 0x5a, 0xf9, 0xa3, 0x61, 0xb9,
        0x30, 0x47, 0x71, 0x96, 0x0a, 0x16, 0xb0, 0x91, 0xc0, 0x42, 0x95,
        0xef, 0x10, 0x7f, 0x28, 0x6a, 0xe3, 0x2a, 0x1f, 0xb1, 0xe4, 0xcd,
        0x03, 0x3f, 0x77, 0x71, 0x04, 0xc7, 0x20, 0xfc, 0x49, 0x0f, 0x1d,
        0x45, 0x88, 0xa4, 0xd7, 0xcb, 0x7e, 0x88, 0xad, 0x8e, 0x2d, 0xec,
        0x45, 0xdb, 0xc4, 0x51, 0x04, 0xc9, 0x2a, 0xfc, 0xec, 0x86, 0x9e,
        0x9a, 0x11, 0x97, 0x5b, 0xde, 0xce, 0x53, 0x88, 0xe6, 0xe2, 0xb7,
        0xfd, 0xac, 0x95, 0xc2, 0x28, 0x40, 0xdb, 0xef, 0x04, 0x90, 0xdf,
        0x81, 0x33, 0x39, 0xd9, 0xb2, 0x45, 0xa5, 0x23, 0x87, 0x06, 0xa5,
        0x55, 0x89, 0x31, 0xbb, 0x06, 0x2d, 0x60, 0x0e, 0x41, 0x18, 0x7d,
        0x1f, 0x2e, 0xb5, 0x97, 0xcb, 0x11, 0xeb, 0x15, 0xd5, 0x24, 0xa5,
        0x94, 0xef, 0x15, 0x14, 0x89, 0xfd, 0x4b, 0x73, 0xfa, 0x32, 0x5b,
        0xfc, 0xd1, 0x33, 0x00, 0xf9, 0x59, 0x62, 0x70, 0x07, 0x32, 0xea,
        0x2e, 0xab, 0x40, 0x2d, 0x7b, 0xca, 0xdd, 0x21, 0x67, 0x1b, 0x30,
        0x99, 0x8f, 0x16, 0xaa, 0x23, 0xa8, 0x41, 0xd1, 0xb0, 0x6e, 0x11,
        0x9b, 0x36, 0xc4, 0xde, 0x40, 0x74, 0x9c, 0xe1, 0x58, 0x65, 0xc1,
        0x60, 0x1e, 0x7a, 0x5b, 0x38, 0xc8, 0x8f, 0xbb, 0x04, 0x26, 0x7c,
        0xd4, 0x16, 0x40, 0xe5, 0xb6, 0x6b, 0x6c, 0xaa, 0x86, 0xfd, 0x00,
        0xbf, 0xce, 0xc1, 0x35, 0x02, 0x03, 0x01, 0x00, 0x01,
    ],
];

/// Returns whether a certificate's public key is in the given list.
fn key_in_list(cert: &Cert, keys: &[&[u8]]) -> bool {
    let key = cert.subject_public_key_info().public_key().as_ref();
    keys.iter().any(|known| *known == key)
}


//------------ PolicyId ------------------------------------------------------

/// The identifier of a validation policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicyId<'a> {
    /// The basic chain health checks.
    Base,

    /// Only the basic constraints outcome matters.
    BasicConstraints,

    /// Code signing verification.
    Authenticode,

    /// TLS server identity verification.
    Ssl,

    /// Whether the chain ends in a Microsoft root.
    MicrosoftRoot,

    /// A policy installed into the registry under this identifier.
    Custom(&'a str),
}


//------------ PolicyError ---------------------------------------------------

/// The single error code a policy reduces a chain to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicyError {
    /// A certificate signature in the chain does not verify.
    CertSignature,

    /// The chain ends in an untrusted root.
    UntrustedRoot,

    /// The chain ends in a well-known test root.
    UntrustedTestRoot,

    /// The chain does not properly chain up, e.g. it is cyclic.
    Chaining,

    /// A certificate in the chain is expired or not yet valid.
    Expired,

    /// The server name does not match the end entity.
    CnNoMatch,

    /// The basic constraints of the chain are violated.
    BasicConstraints,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            PolicyError::CertSignature => "certificate signature invalid",
            PolicyError::UntrustedRoot => "untrusted root",
            PolicyError::UntrustedTestRoot => "untrusted test root",
            PolicyError::Chaining => "invalid chaining",
            PolicyError::Expired => "certificate expired",
            PolicyError::CnNoMatch => "server name mismatch",
            PolicyError::BasicConstraints => "basic constraints violated",
        })
    }
}


//------------ PolicyStatus --------------------------------------------------

/// The verdict of a policy over a chain.
///
/// The indexes locate the certificate the verdict is about: the simple
/// chain within the context and the element within that chain. An index
/// of `-1` means the position is not meaningful for the verdict.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PolicyStatus {
    /// The error the chain was reduced to, if any.
    pub error: Option<PolicyError>,

    /// The chain the faulting certificate is in.
    pub chain_index: i32,

    /// The position of the faulting certificate in its chain.
    pub element_index: i32,
}

impl PolicyStatus {
    /// Creates a status with no error and no position.
    fn new() -> Self {
        PolicyStatus { error: None, chain_index: -1, element_index: -1 }
    }

    /// Returns whether the policy found nothing wrong.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Points the status at the first element carrying the given error.
    fn locate(&mut self, context: &ChainContext, error: ErrorStatus) {
        if let Some((chain, element)) =
            context.find_element_with_error(error)
        {
            self.chain_index = chain as i32;
            self.element_index = element as i32;
        }
    }
}


//------------ PolicyParams --------------------------------------------------

/// Parameters handed to a policy.
#[derive(Clone, Debug, Default)]
pub struct PolicyParams {
    /// The extra parameters of the SSL policy.
    pub ssl: Option<SslParams>,
}


//------------ SslParams -----------------------------------------------------

/// The extra parameters of the SSL policy.
#[derive(Clone, Debug)]
pub struct SslParams {
    /// Which side of the connection the certificate authenticates.
    pub auth_type: SslAuthType,

    /// The host name the server was contacted under.
    pub server_name: Option<String>,
}


//------------ SslAuthType ---------------------------------------------------

/// The role a certificate plays in a TLS connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SslAuthType {
    /// The certificate authenticates the server.
    Server,

    /// The certificate authenticates the client.
    Client,
}


//------------ PolicyCheck ---------------------------------------------------

/// A policy that can be installed into a registry.
pub trait PolicyCheck: Send + Sync {
    /// Applies the policy to a chain, filling in the status.
    fn check(
        &self,
        context: &ChainContext,
        params: &PolicyParams,
        status: &mut PolicyStatus,
    );
}

impl<F> PolicyCheck for F
where
    F: Fn(&ChainContext, &PolicyParams, &mut PolicyStatus) + Send + Sync
{
    fn check(
        &self,
        context: &ChainContext,
        params: &PolicyParams,
        status: &mut PolicyStatus,
    ) {
        self(context, params, status)
    }
}


//------------ PolicyRegistry ------------------------------------------------

/// A dispatch table from policy identifiers to policies.
///
/// The built-in policies are always available. Custom policies can be
/// registered under any string identifier and are consulted for
/// [`PolicyId::Custom`] lookups.
#[derive(Default)]
pub struct PolicyRegistry {
    custom: HashMap<String, Box<dyn PolicyCheck>>,
}

impl PolicyRegistry {
    /// Creates a registry with only the built-in policies.
    pub fn new() -> Self {
        PolicyRegistry::default()
    }

    /// Installs a policy under the given identifier.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        check: impl PolicyCheck + 'static,
    ) {
        self.custom.insert(id.into(), Box::new(check));
    }

    /// Applies the policy with the given identifier to a chain.
    pub fn verify(
        &self,
        policy: PolicyId,
        context: &ChainContext,
        params: &PolicyParams,
    ) -> Result<PolicyStatus, UnknownPolicy> {
        let mut status = PolicyStatus::new();
        match policy {
            PolicyId::Base => {
                check_base_policy(context, params, &mut status)
            }
            PolicyId::BasicConstraints => {
                check_basic_constraints_policy(context, params, &mut status)
            }
            PolicyId::Authenticode => {
                check_authenticode_policy(context, params, &mut status)
            }
            PolicyId::Ssl => {
                check_ssl_policy(context, params, &mut status)
            }
            PolicyId::MicrosoftRoot => {
                check_microsoft_root_policy(context, params, &mut status)
            }
            PolicyId::Custom(name) => {
                match self.custom.get(name) {
                    Some(check) => check.check(context, params, &mut status),
                    None => return Err(UnknownPolicy::new(name)),
                }
            }
        }
        debug!("policy {:?} verdict: {:?}", policy, status.error);
        Ok(status)
    }
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("custom", &self.custom.keys())
            .finish()
    }
}


//------------ verify_chain_policy -------------------------------------------

/// Applies a built-in policy to a chain.
///
/// This is the registry-less shortcut. Custom identifiers fail since
/// there is no registry they could have been installed into.
pub fn verify_chain_policy(
    policy: PolicyId,
    context: &ChainContext,
    params: &PolicyParams,
) -> Result<PolicyStatus, UnknownPolicy> {
    PolicyRegistry::new().verify(policy, context, params)
}


//------------ The built-in policies -----------------------------------------

/// The base policy: signatures, root trust, and proper chaining.
fn check_base_policy(
    context: &ChainContext,
    _params: &PolicyParams,
    status: &mut PolicyStatus,
) {
    let errors = context.status().errors;
    if errors.intersects(ErrorStatus::IS_NOT_SIGNATURE_VALID) {
        status.error = Some(PolicyError::CertSignature);
        status.locate(context, ErrorStatus::IS_NOT_SIGNATURE_VALID);
    }
    else if errors.intersects(ErrorStatus::IS_UNTRUSTED_ROOT) {
        status.error = Some(PolicyError::UntrustedRoot);
        status.locate(context, ErrorStatus::IS_UNTRUSTED_ROOT);
    }
    else if errors.intersects(ErrorStatus::IS_CYCLIC) {
        status.error = Some(PolicyError::Chaining);
        status.locate(context, ErrorStatus::IS_CYCLIC);
        // No single element of a cycle is the faulting one.
        status.element_index = -1;
    }
}

/// The basic constraints policy.
fn check_basic_constraints_policy(
    context: &ChainContext,
    _params: &PolicyParams,
    status: &mut PolicyStatus,
) {
    if context.status().errors.intersects(
        ErrorStatus::INVALID_BASIC_CONSTRAINTS
    ) {
        status.error = Some(PolicyError::BasicConstraints);
        status.locate(context, ErrorStatus::INVALID_BASIC_CONSTRAINTS);
    }
}

/// The Authenticode policy.
///
/// As the base policy, except that a chain ending in one of the known
/// test roots gets the more specific test root error.
fn check_authenticode_policy(
    context: &ChainContext,
    params: &PolicyParams,
    status: &mut PolicyStatus,
) {
    check_base_policy(context, params, status);
    if status.error != Some(PolicyError::UntrustedRoot) {
        return
    }
    let failing = context.chains()
        .get(status.chain_index as usize)
        .and_then(|chain| chain.element(status.element_index as usize));
    if let Some(element) = failing {
        if key_in_list(element.cert(), &TEST_ROOT_KEYS) {
            status.error = Some(PolicyError::UntrustedTestRoot);
        }
    }
}

/// The SSL policy: base checks, expiry, and server identity.
fn check_ssl_policy(
    context: &ChainContext,
    params: &PolicyParams,
    status: &mut PolicyStatus,
) {
    let errors = context.status().errors;
    if errors.intersects(ErrorStatus::IS_NOT_SIGNATURE_VALID) {
        status.error = Some(PolicyError::CertSignature);
        status.locate(context, ErrorStatus::IS_NOT_SIGNATURE_VALID);
    }
    else if errors.intersects(ErrorStatus::IS_UNTRUSTED_ROOT) {
        status.error = Some(PolicyError::UntrustedRoot);
        status.locate(context, ErrorStatus::IS_UNTRUSTED_ROOT);
    }
    else if errors.intersects(ErrorStatus::IS_CYCLIC) {
        // A cyclic chain cannot reach a trusted root.
        status.error = Some(PolicyError::UntrustedRoot);
        status.locate(context, ErrorStatus::IS_CYCLIC);
        status.element_index = -1;
    }
    else if errors.intersects(ErrorStatus::IS_NOT_TIME_VALID) {
        status.error = Some(PolicyError::Expired);
        status.locate(context, ErrorStatus::IS_NOT_TIME_VALID);
    }
    if status.error.is_some() {
        return
    }

    // The name in the end certificate only matters if the chain is
    // otherwise in order.
    let ssl = match params.ssl.as_ref() {
        Some(ssl) => ssl,
        None => return
    };
    if ssl.auth_type != SslAuthType::Server {
        return
    }
    let server_name = match ssl.server_name.as_deref() {
        Some(name) => name,
        None => return
    };
    if !ssl_server_name_matches(context, server_name) {
        status.error = Some(PolicyError::CnNoMatch);
        status.chain_index = 0;
        status.element_index = 0;
    }
}

/// The Microsoft root policy.
///
/// As the base policy; on a clean chain the root key is compared against
/// the known Microsoft root keys and, when it matches, the position is
/// set as an informational marker.
fn check_microsoft_root_policy(
    context: &ChainContext,
    params: &PolicyParams,
    status: &mut PolicyStatus,
) {
    check_base_policy(context, params, status);
    if status.error.is_some() {
        return
    }
    let root = context.chains().last()
        .and_then(|chain| chain.elements().last());
    if let Some(element) = root {
        if key_in_list(element.cert(), &MICROSOFT_ROOT_KEYS) {
            status.chain_index = 0;
            status.element_index = 0;
        }
    }
}


//------------ Server name matching ------------------------------------------

/// Matches the server name against the end certificate of a chain.
///
/// An alternative name extension binds the names of the certificate, so
/// if one is present only its DNS entries count. Without one the subject
/// name is consulted: domain components if there are any, the common name
/// otherwise.
fn ssl_server_name_matches(
    context: &ChainContext, server_name: &str
) -> bool {
    let cert = match
        context.chains().first()
            .and_then(|chain| chain.elements().first())
    {
        Some(element) => element.cert(),
        None => return false
    };
    match cert.subject_alt_name() {
        ExtValue::Present(alt_name) => {
            match_dns_to_subject_alt_name(alt_name, server_name)
        }
        ExtValue::Malformed => false,
        ExtValue::Absent => match_dns_to_subject_dn(cert, server_name),
    }
}

/// Returns whether any DNS entry of an alt name equals the server name.
fn match_dns_to_subject_alt_name(
    alt_name: &SubjectAltName, server_name: &str
) -> bool {
    alt_name.dns_names().any(|name| name.eq_ignore_ascii_case(server_name))
}

/// Matches the server name against a subject distinguished name.
fn match_dns_to_subject_dn(cert: &Cert, server_name: &str) -> bool {
    let subject = cert.subject();
    if subject.has_attr(&oid::AT_DOMAIN_COMPONENT) {
        // Every label of the server name has to appear among the domain
        // components. DNS labels top out at 254 octets.
        server_name.split('.').filter(|label| !label.is_empty())
            .all(|label| {
                if label.len() > 254 {
                    debug!("domain component {} too long", label);
                    return false
                }
                find_matching_domain_component(subject, label)
            })
    }
    else if let Some(common_name) = subject.find_attr(&oid::AT_COMMON_NAME) {
        common_name.eq_ignore_ascii_case(server_name)
    }
    else {
        false
    }
}

/// Returns whether any domain component of a name equals the label.
fn find_matching_domain_component(subject: &Name, label: &str) -> bool {
    subject.attr_values(&oid::AT_DOMAIN_COMPONENT)
        .any(|value| value.eq_ignore_ascii_case(label))
}


//------------ UnknownPolicy -------------------------------------------------

/// A policy identifier could not be resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownPolicy {
    id: String,
}

impl UnknownPolicy {
    fn new(id: &str) -> Self {
        UnknownPolicy { id: id.into() }
    }

    /// Returns the identifier that could not be resolved.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown chain policy '{}'", self.id)
    }
}

impl error::Error for UnknownPolicy { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use crate::cert::GeneralName;
    use crate::chain::SimpleChain;
    use crate::status::InfoStatus;
    use crate::store::Collection;
    use crate::test::CertBuilder;

    fn context_of(certs: Vec<Arc<Cert>>) -> ChainContext {
        let mut chain = SimpleChain::new();
        for (index, cert) in certs.into_iter().enumerate() {
            let info = if index == 0 {
                InfoStatus::empty()
            }
            else {
                InfoStatus::HAS_NAME_MATCH_ISSUER
            };
            chain.add_cert(cert, info, 7);
        }
        ChainContext::new(chain, Arc::new(Collection::new()))
    }

    fn taint(
        context: &mut ChainContext, index: usize, error: ErrorStatus
    ) {
        context.record_element_error(index, error);
    }

    fn three_certs() -> Vec<Arc<Cert>> {
        vec![
            CertBuilder::new("Leaf", "CA").build(),
            CertBuilder::new("CA", "Root").build(),
            CertBuilder::new("Root", "Root").build(),
        ]
    }

    #[test]
    fn base_policy_clean() {
        let context = context_of(three_certs());
        let status = verify_chain_policy(
            PolicyId::Base, &context, &PolicyParams::default()
        ).unwrap();
        assert!(status.is_ok());
        assert_eq!(status.chain_index, -1);
        assert_eq!(status.element_index, -1);
    }

    #[test]
    fn base_policy_error_order() {
        let mut context = context_of(three_certs());
        taint(&mut context, 2, ErrorStatus::IS_UNTRUSTED_ROOT);
        taint(&mut context, 0, ErrorStatus::IS_NOT_SIGNATURE_VALID);

        let status = verify_chain_policy(
            PolicyId::Base, &context, &PolicyParams::default()
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::CertSignature));
        assert_eq!((status.chain_index, status.element_index), (0, 0));
    }

    #[test]
    fn base_policy_untrusted_root_locator() {
        let mut context = context_of(three_certs());
        taint(&mut context, 2, ErrorStatus::IS_UNTRUSTED_ROOT);

        let status = verify_chain_policy(
            PolicyId::Base, &context, &PolicyParams::default()
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::UntrustedRoot));
        assert_eq!((status.chain_index, status.element_index), (0, 2));
    }

    #[test]
    fn base_policy_cycle_has_no_element() {
        let mut context = context_of(three_certs());
        taint(&mut context, 1, ErrorStatus::IS_CYCLIC);

        let status = verify_chain_policy(
            PolicyId::Base, &context, &PolicyParams::default()
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::Chaining));
        assert_eq!((status.chain_index, status.element_index), (0, -1));
    }

    #[test]
    fn basic_constraints_policy() {
        let mut context = context_of(three_certs());
        let status = verify_chain_policy(
            PolicyId::BasicConstraints, &context, &PolicyParams::default()
        ).unwrap();
        assert!(status.is_ok());

        taint(&mut context, 1, ErrorStatus::INVALID_BASIC_CONSTRAINTS);
        let status = verify_chain_policy(
            PolicyId::BasicConstraints, &context, &PolicyParams::default()
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::BasicConstraints));
        assert_eq!((status.chain_index, status.element_index), (0, 1));
    }

    #[test]
    fn authenticode_upgrades_test_root() {
        let mut certs = three_certs();
        certs[2] = CertBuilder::new("Root", "Root")
            .key_bytes(TEST_ROOT_KEYS[0])
            .build();
        let mut context = context_of(certs);
        taint(&mut context, 2, ErrorStatus::IS_UNTRUSTED_ROOT);

        let status = verify_chain_policy(
            PolicyId::Authenticode, &context, &PolicyParams::default()
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::UntrustedTestRoot));

        // An unknown key stays a plainly untrusted root.
        let mut context = context_of(three_certs());
        taint(&mut context, 2, ErrorStatus::IS_UNTRUSTED_ROOT);
        let status = verify_chain_policy(
            PolicyId::Authenticode, &context, &PolicyParams::default()
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::UntrustedRoot));
    }

    #[test]
    fn microsoft_root_policy_marks_known_root() {
        let mut certs = three_certs();
        certs[2] = CertBuilder::new("Root", "Root")
            .key_bytes(MICROSOFT_ROOT_KEYS[1])
            .build();
        let context = context_of(certs);

        let status = verify_chain_policy(
            PolicyId::MicrosoftRoot, &context, &PolicyParams::default()
        ).unwrap();
        assert!(status.is_ok());
        assert_eq!((status.chain_index, status.element_index), (0, 0));

        let status = verify_chain_policy(
            PolicyId::MicrosoftRoot, &context_of(three_certs()),
            &PolicyParams::default()
        ).unwrap();
        assert!(status.is_ok());
        assert_eq!((status.chain_index, status.element_index), (-1, -1));
    }

    fn ssl_params(server_name: &str) -> PolicyParams {
        PolicyParams {
            ssl: Some(SslParams {
                auth_type: SslAuthType::Server,
                server_name: Some(server_name.into()),
            }),
        }
    }

    #[test]
    fn ssl_policy_expired_chain() {
        let mut context = context_of(three_certs());
        taint(&mut context, 0, ErrorStatus::IS_NOT_TIME_VALID);

        let status = verify_chain_policy(
            PolicyId::Ssl, &context, &ssl_params("mail.example.com")
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::Expired));
        assert_eq!((status.chain_index, status.element_index), (0, 0));
    }

    #[test]
    fn ssl_policy_cycle_reports_untrusted_root() {
        let mut context = context_of(three_certs());
        taint(&mut context, 1, ErrorStatus::IS_CYCLIC);

        let status = verify_chain_policy(
            PolicyId::Ssl, &context, &ssl_params("mail.example.com")
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::UntrustedRoot));
        assert_eq!(status.element_index, -1);
    }

    #[test]
    fn ssl_policy_matches_alt_name() {
        let mut certs = three_certs();
        certs[0] = CertBuilder::new("Leaf", "CA")
            .subject_alt_name(vec![
                GeneralName::Dns(String::from("other.example.com")),
                GeneralName::Dns(String::from("mail.example.com")),
            ])
            .build();
        let context = context_of(certs);

        let status = verify_chain_policy(
            PolicyId::Ssl, &context, &ssl_params("MAIL.example.com")
        ).unwrap();
        assert!(status.is_ok());

        let status = verify_chain_policy(
            PolicyId::Ssl, &context, &ssl_params("wrong.example.com")
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::CnNoMatch));
        assert_eq!((status.chain_index, status.element_index), (0, 0));
    }

    #[test]
    fn ssl_policy_alt_name_shadows_subject() {
        // The common name would match, but the alt name is binding.
        let mut certs = three_certs();
        certs[0] = CertBuilder::new("mail.example.com", "CA")
            .subject_alt_name(vec![
                GeneralName::Dns(String::from("other.example.com")),
            ])
            .build();
        let context = context_of(certs);

        let status = verify_chain_policy(
            PolicyId::Ssl, &context, &ssl_params("mail.example.com")
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::CnNoMatch));
    }

    #[test]
    fn ssl_policy_common_name_fallback() {
        let mut certs = three_certs();
        certs[0] = CertBuilder::new("mail.example.com", "CA").build();
        let context = context_of(certs);

        let status = verify_chain_policy(
            PolicyId::Ssl, &context, &ssl_params("mail.example.com")
        ).unwrap();
        assert!(status.is_ok());
    }

    #[test]
    fn ssl_policy_domain_components() {
        let mut certs = three_certs();
        certs[0] = CertBuilder::new("Leaf", "CA")
            .domain_components(&["mail", "example", "com"])
            .build();
        let context = context_of(certs);

        let status = verify_chain_policy(
            PolicyId::Ssl, &context, &ssl_params("mail.example.com")
        ).unwrap();
        assert!(status.is_ok());

        let status = verify_chain_policy(
            PolicyId::Ssl, &context, &ssl_params("mail.example.org")
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::CnNoMatch));
    }

    #[test]
    fn registry_dispatch() {
        let context = context_of(three_certs());
        let mut registry = PolicyRegistry::new();
        registry.register(
            "always-expired",
            |_: &ChainContext, _: &PolicyParams, status: &mut PolicyStatus| {
                status.error = Some(PolicyError::Expired);
            },
        );

        let status = registry.verify(
            PolicyId::Custom("always-expired"), &context,
            &PolicyParams::default(),
        ).unwrap();
        assert_eq!(status.error, Some(PolicyError::Expired));

        let err = registry.verify(
            PolicyId::Custom("nonesuch"), &context, &PolicyParams::default()
        ).unwrap_err();
        assert_eq!(err.id(), "nonesuch");
    }
}
