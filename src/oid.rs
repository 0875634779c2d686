//! The object identifiers used by the chain engine.
//!
//! This module collects all the OIDs the engine needs to recognize in one
//! place. They are provided as constants of the type [`ConstOid`] which can
//! be compared to the `Oid`s found in decoded certificates.
//!
//! [`ConstOid`]: ../../bcder/oid/struct.ConstOid.html

use bcder::{ConstOid, Oid};


/// The authority key identifier extension in its original form.
///
/// This is the deprecated identifier from X.509v1, 2.5.29.1. Certificates
/// in the wild still carry it.
pub const AUTHORITY_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 1]);

/// The authority key identifier extension, 2.5.29.35.
pub const AUTHORITY_KEY_IDENTIFIER_2: ConstOid = Oid(&[85, 29, 35]);

/// The basic constraints extension in its original form, 2.5.29.10.
///
/// The value of this form is a bit string of subject type flags rather than
/// the structured sequence of the later form.
pub const BASIC_CONSTRAINTS: ConstOid = Oid(&[85, 29, 10]);

/// The basic constraints extension, 2.5.29.19.
pub const BASIC_CONSTRAINTS_2: ConstOid = Oid(&[85, 29, 19]);

/// The key usage extension, 2.5.29.15.
pub const KEY_USAGE: ConstOid = Oid(&[85, 29, 15]);

/// The extended key usage extension, 2.5.29.37.
pub const EXTENDED_KEY_USAGE: ConstOid = Oid(&[85, 29, 37]);

/// The name constraints extension, 2.5.29.30.
pub const NAME_CONSTRAINTS: ConstOid = Oid(&[85, 29, 30]);

/// The subject alternative name extension in its original form, 2.5.29.7.
pub const SUBJECT_ALT_NAME: ConstOid = Oid(&[85, 29, 7]);

/// The subject alternative name extension, 2.5.29.17.
pub const SUBJECT_ALT_NAME_2: ConstOid = Oid(&[85, 29, 17]);

/// The subject key identifier extension, 2.5.29.14.
pub const SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 14]);

/// The commonName attribute type, 2.5.4.3.
pub const AT_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]);

/// The domainComponent attribute type, 0.9.2342.19200300.100.1.25.
pub const AT_DOMAIN_COMPONENT: ConstOid = Oid(
    &[9, 146, 38, 137, 147, 242, 44, 100, 1, 25]
);

/// The code signing extended key purpose, 1.3.6.1.5.5.7.3.3.
pub const KP_CODE_SIGNING: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 3, 3]);

/// RSA PKCS#1 v1.5 signatures with SHA-256, 1.2.840.113549.1.1.11.
pub const SHA256_WITH_RSA_ENCRYPTION: ConstOid = Oid(
    &[42, 134, 72, 134, 247, 13, 1, 1, 11]
);

/// RSA PKCS#1 v1.5 signatures with SHA-384, 1.2.840.113549.1.1.12.
pub const SHA384_WITH_RSA_ENCRYPTION: ConstOid = Oid(
    &[42, 134, 72, 134, 247, 13, 1, 1, 12]
);

/// RSA PKCS#1 v1.5 signatures with SHA-512, 1.2.840.113549.1.1.13.
pub const SHA512_WITH_RSA_ENCRYPTION: ConstOid = Oid(
    &[42, 134, 72, 134, 247, 13, 1, 1, 13]
);

/// ECDSA signatures with SHA-256, 1.2.840.10045.4.3.2.
pub const ECDSA_WITH_SHA256: ConstOid = Oid(&[42, 134, 72, 206, 61, 4, 3, 2]);

/// ECDSA signatures with SHA-384, 1.2.840.10045.4.3.3.
pub const ECDSA_WITH_SHA384: ConstOid = Oid(&[42, 134, 72, 206, 61, 4, 3, 3]);
