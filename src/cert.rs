//! Certificates and their decoded content.
//!
//! The engine does not parse DER itself. A codec collaborator decodes
//! certificates into the [`Cert`] type defined here, with every extension
//! the engine cares about already turned into a typed value. Certificates
//! are handed around as `Arc<Cert>` and never modified after construction.
//!
//! The second half of this module is the extension inspector: a set of thin
//! accessors on [`Cert`] that look up a decoded extension by identifier and
//! report whether it was absent, present, or present but undecodable.

use std::fmt;
use bcder::Oid;
use bcder::oid::ConstOid;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use crate::oid;


//------------ Cert ----------------------------------------------------------

/// A decoded certificate.
///
/// The fields mirror the to-be-signed portion of an X.509 certificate plus
/// the outer signature. The raw DER encoding of the to-be-signed portion is
/// retained: it is the message covered by the issuer signature and the unit
/// of byte-equality used by cycle detection.
#[derive(Clone, Debug)]
pub struct Cert {
    /// The certificate version.
    version: Version,

    /// The serial number in its raw big-endian encoding.
    serial_number: Bytes,

    /// The algorithm identifier of the signature on this certificate.
    ///
    /// The codec leaves this at `None` if the certificate carried no
    /// recognizable algorithm identifier. Such a certificate cannot start
    /// a chain build.
    signature_algorithm: Option<Oid>,

    /// The distinguished name of the issuer.
    issuer: Name,

    /// The validity window.
    validity: Validity,

    /// The distinguished name of the subject.
    subject: Name,

    /// The subject public key with its algorithm.
    subject_public_key_info: SubjectPublicKeyInfo,

    /// The issuer unique identifier, only legal in v2 and v3.
    issuer_unique_id: Option<Bytes>,

    /// The subject unique identifier, only legal in v2 and v3.
    subject_unique_id: Option<Bytes>,

    /// The extension list in certificate order.
    extensions: Vec<Extension>,

    /// The raw DER encoding of the to-be-signed portion.
    raw_tbs: Bytes,

    /// The signature value.
    signature_value: Bytes,
}

impl Cert {
    /// Creates a certificate from its decoded parts.
    ///
    /// This is the constructor used by codec collaborators. The parts are
    /// given in the order in which they appear in the to-be-signed
    /// sequence.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: Version,
        serial_number: Bytes,
        signature_algorithm: Option<Oid>,
        issuer: Name,
        validity: Validity,
        subject: Name,
        subject_public_key_info: SubjectPublicKeyInfo,
        issuer_unique_id: Option<Bytes>,
        subject_unique_id: Option<Bytes>,
        extensions: Vec<Extension>,
        raw_tbs: Bytes,
        signature_value: Bytes,
    ) -> Self {
        Cert {
            version, serial_number, signature_algorithm, issuer, validity,
            subject, subject_public_key_info, issuer_unique_id,
            subject_unique_id, extensions, raw_tbs, signature_value,
        }
    }

    /// Returns the certificate version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the raw serial number.
    pub fn serial_number(&self) -> &Bytes {
        &self.serial_number
    }

    /// Returns the signature algorithm identifier if there is one.
    pub fn signature_algorithm(&self) -> Option<&Oid> {
        self.signature_algorithm.as_ref()
    }

    /// Returns the issuer name.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Returns the validity window.
    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    /// Returns the subject name.
    pub fn subject(&self) -> &Name {
        &self.subject
    }

    /// Returns the subject public key info.
    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfo {
        &self.subject_public_key_info
    }

    /// Returns the issuer unique identifier if present.
    pub fn issuer_unique_id(&self) -> Option<&Bytes> {
        self.issuer_unique_id.as_ref()
    }

    /// Returns the subject unique identifier if present.
    pub fn subject_unique_id(&self) -> Option<&Bytes> {
        self.subject_unique_id.as_ref()
    }

    /// Returns the extensions in certificate order.
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Returns the raw DER encoding of the to-be-signed portion.
    pub fn raw_tbs(&self) -> &Bytes {
        &self.raw_tbs
    }

    /// Returns the signature value.
    pub fn signature_value(&self) -> &Bytes {
        &self.signature_value
    }

    /// Returns whether the certificate issued itself.
    ///
    /// A certificate counts as self-signed if its subject name equals its
    /// issuer name under encoded-bytes equality. Whether the self-signature
    /// actually verifies is a separate question answered during validation.
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }

    /// Returns whether the to-be-signed portions of two certificates are
    /// byte-for-byte identical.
    pub fn tbs_matches(&self, other: &Cert) -> bool {
        self.raw_tbs == other.raw_tbs
    }

    /// Returns the first extension with the given identifier.
    pub fn find_extension(&self, id: &ConstOid) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.oid() == id)
    }

    fn typed_extension<'a, T, F>(
        &'a self, id: &ConstOid, select: F
    ) -> ExtValue<&'a T>
    where F: Fn(&'a ExtensionValue) -> Option<&'a T> {
        match self.find_extension(id) {
            Some(ext) => match select(ext.value()) {
                Some(value) => ExtValue::Present(value),
                None => ExtValue::Malformed,
            },
            None => ExtValue::Absent,
        }
    }

    /// Returns the decoded original-form basic constraints extension.
    pub fn basic_constraints(&self) -> ExtValue<&BasicConstraints> {
        self.typed_extension(&oid::BASIC_CONSTRAINTS, |value| {
            match value {
                ExtensionValue::BasicConstraints(inner) => Some(inner),
                _ => None
            }
        })
    }

    /// Returns the decoded structured basic constraints extension.
    pub fn basic_constraints_2(&self) -> ExtValue<&BasicConstraints2> {
        self.typed_extension(&oid::BASIC_CONSTRAINTS_2, |value| {
            match value {
                ExtensionValue::BasicConstraints2(inner) => Some(inner),
                _ => None
            }
        })
    }

    /// Returns the decoded key usage extension.
    pub fn key_usage(&self) -> ExtValue<&KeyUsage> {
        self.typed_extension(&oid::KEY_USAGE, |value| {
            match value {
                ExtensionValue::KeyUsage(inner) => Some(inner),
                _ => None
            }
        })
    }

    /// Returns the decoded extended key usage extension together with its
    /// criticality.
    pub fn extended_key_usage(&self) -> ExtValue<(&ExtendedKeyUsage, bool)> {
        match self.find_extension(&oid::EXTENDED_KEY_USAGE) {
            Some(ext) => match ext.value() {
                ExtensionValue::ExtendedKeyUsage(inner) => {
                    ExtValue::Present((inner, ext.critical()))
                }
                _ => ExtValue::Malformed,
            },
            None => ExtValue::Absent,
        }
    }

    /// Returns the decoded name constraints extension.
    pub fn name_constraints(&self) -> ExtValue<&NameConstraints> {
        self.typed_extension(&oid::NAME_CONSTRAINTS, |value| {
            match value {
                ExtensionValue::NameConstraints(inner) => Some(inner),
                _ => None
            }
        })
    }

    /// Returns the decoded original-form authority key identifier.
    pub fn authority_key_id(&self) -> ExtValue<&AuthorityKeyId> {
        self.typed_extension(&oid::AUTHORITY_KEY_IDENTIFIER, |value| {
            match value {
                ExtensionValue::AuthorityKeyId(inner) => Some(inner),
                _ => None
            }
        })
    }

    /// Returns the decoded current-form authority key identifier.
    pub fn authority_key_id_2(&self) -> ExtValue<&AuthorityKeyId2> {
        self.typed_extension(&oid::AUTHORITY_KEY_IDENTIFIER_2, |value| {
            match value {
                ExtensionValue::AuthorityKeyId2(inner) => Some(inner),
                _ => None
            }
        })
    }

    /// Returns the decoded subject key identifier extension.
    pub fn subject_key_identifier(&self) -> ExtValue<&Bytes> {
        self.typed_extension(&oid::SUBJECT_KEY_IDENTIFIER, |value| {
            match value {
                ExtensionValue::SubjectKeyId(inner) => Some(inner),
                _ => None
            }
        })
    }

    /// Returns the decoded subject alternative name extension.
    ///
    /// The current identifier is preferred; if it is absent, the original
    /// identifier is tried as well.
    pub fn subject_alt_name(&self) -> ExtValue<&SubjectAltName> {
        let res = self.typed_extension(&oid::SUBJECT_ALT_NAME_2, |value| {
            match value {
                ExtensionValue::SubjectAltName(inner) => Some(inner),
                _ => None
            }
        });
        if res.is_absent() {
            self.typed_extension(&oid::SUBJECT_ALT_NAME, |value| {
                match value {
                    ExtensionValue::SubjectAltName(inner) => Some(inner),
                    _ => None
                }
            })
        }
        else {
            res
        }
    }
}


//--- PartialEq and Eq

impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.raw_tbs == other.raw_tbs
            && self.signature_value == other.signature_value
    }
}

impl Eq for Cert { }


//------------ Version -------------------------------------------------------

/// The version of a certificate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Version {
    V1,
    V2,
    V3,
}

impl Version {
    /// Returns whether this is one of the pre-extension versions.
    pub fn is_pre_v3(self) -> bool {
        !matches!(self, Version::V3)
    }
}


//------------ Validity ------------------------------------------------------

/// The validity window of a certificate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Validity {
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl Validity {
    /// Creates a new validity window.
    pub fn new(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        Validity { not_before, not_after }
    }

    /// Returns the beginning of the window.
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// Returns the end of the window.
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Returns whether the given time falls inside the window.
    pub fn covers(&self, time: DateTime<Utc>) -> bool {
        self.not_before <= time && time <= self.not_after
    }
}


//------------ SubjectPublicKeyInfo ------------------------------------------

/// The public key of a certificate together with its algorithm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectPublicKeyInfo {
    /// The key algorithm identifier.
    algorithm: Oid,

    /// The raw bits of the public key.
    public_key: Bytes,
}

impl SubjectPublicKeyInfo {
    /// Creates a new subject public key info.
    pub fn new(algorithm: Oid, public_key: Bytes) -> Self {
        SubjectPublicKeyInfo { algorithm, public_key }
    }

    /// Returns the key algorithm identifier.
    pub fn algorithm(&self) -> &Oid {
        &self.algorithm
    }

    /// Returns the raw bits of the public key.
    pub fn public_key(&self) -> &Bytes {
        &self.public_key
    }
}


//------------ Name ----------------------------------------------------------

/// A distinguished name.
///
/// A name is primarily its DER encoding: two names are equal if and only
/// if their encodings are byte-for-byte identical. The decoded attribute
/// sequence rides along for the few places that need to look inside, such
/// as host name matching against the subject of a server certificate.
#[derive(Clone, Debug)]
pub struct Name {
    /// The DER encoding of the name.
    raw: Bytes,

    /// The decoded relative distinguished name sequence.
    rdns: Vec<Rdn>,
}

impl Name {
    /// Creates a name from its encoding and decoded attributes.
    pub fn new(raw: Bytes, rdns: Vec<Rdn>) -> Self {
        Name { raw, rdns }
    }

    /// Creates a name from its encoding alone.
    pub fn from_raw(raw: Bytes) -> Self {
        Name { raw, rdns: Vec::new() }
    }

    /// Returns the DER encoding of the name.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Returns the relative distinguished names in order.
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Returns the value of the first attribute of the given type.
    pub fn find_attr<'a>(&'a self, attr_type: &'a ConstOid) -> Option<&'a str> {
        self.attr_values(attr_type).next()
    }

    /// Returns the values of all attributes of the given type in order.
    pub fn attr_values<'a>(
        &'a self, attr_type: &'a ConstOid
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.rdns.iter().flat_map(move |rdn| {
            rdn.attrs().iter().filter_map(move |attr| {
                if attr.attr_type() == attr_type {
                    Some(attr.value())
                }
                else {
                    None
                }
            })
        })
    }

    /// Returns whether the name contains an attribute of the given type.
    pub fn has_attr(&self, attr_type: &ConstOid) -> bool {
        self.find_attr(attr_type).is_some()
    }
}


//--- PartialEq and Eq

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Name { }


//--- Display

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.rdns.is_empty() {
            return write!(f, "<name, {} octets>", self.raw.len())
        }
        let mut first = true;
        for rdn in &self.rdns {
            for attr in rdn.attrs() {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                if *attr.attr_type() == oid::AT_COMMON_NAME {
                    write!(f, "CN={}", attr.value())?;
                }
                else if *attr.attr_type() == oid::AT_DOMAIN_COMPONENT {
                    write!(f, "DC={}", attr.value())?;
                }
                else {
                    write!(f, "{}={}", attr.attr_type(), attr.value())?;
                }
            }
        }
        Ok(())
    }
}


//------------ Rdn -----------------------------------------------------------

/// One relative distinguished name: a set of attributes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rdn {
    attrs: Vec<RdnAttr>,
}

impl Rdn {
    /// Creates a relative distinguished name from its attributes.
    pub fn new(attrs: Vec<RdnAttr>) -> Self {
        Rdn { attrs }
    }

    /// Returns the attributes.
    pub fn attrs(&self) -> &[RdnAttr] {
        &self.attrs
    }
}


//------------ RdnAttr -------------------------------------------------------

/// A single attribute of a relative distinguished name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RdnAttr {
    attr_type: Oid,
    value: String,
}

impl RdnAttr {
    /// Creates an attribute from its type and string value.
    pub fn new(attr_type: Oid, value: impl Into<String>) -> Self {
        RdnAttr { attr_type, value: value.into() }
    }

    /// Returns the attribute type.
    pub fn attr_type(&self) -> &Oid {
        &self.attr_type
    }

    /// Returns the attribute value.
    pub fn value(&self) -> &str {
        &self.value
    }
}


//------------ GeneralName ---------------------------------------------------

/// A name of one of the forms defined for alternative names.
///
/// Only the forms the engine can match are fully decoded. Everything else
/// is kept as its tag number so constraint checking can report it as
/// unsupported rather than silently pass it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GeneralName {
    /// An RFC 822 mailbox or host constraint.
    Rfc822(String),

    /// A DNS host name.
    Dns(String),

    /// A directory name.
    Directory(Name),

    /// A uniform resource identifier.
    Uri(String),

    /// An IP address, or an address-and-mask pair when used as constraint.
    Ip(Bytes),

    /// Any other form, identified by its tag number.
    Unsupported(u8),
}

impl GeneralName {
    /// Returns the tag number of the name form.
    pub fn tag(&self) -> u8 {
        match self {
            GeneralName::Rfc822(_) => 1,
            GeneralName::Dns(_) => 2,
            GeneralName::Directory(_) => 4,
            GeneralName::Uri(_) => 6,
            GeneralName::Ip(_) => 7,
            GeneralName::Unsupported(tag) => *tag,
        }
    }

    /// Returns whether two names use the same form.
    pub fn same_form(&self, other: &GeneralName) -> bool {
        self.tag() == other.tag()
    }
}


//------------ Extension -----------------------------------------------------

/// A single certificate extension.
#[derive(Clone, Debug)]
pub struct Extension {
    /// The extension identifier.
    oid: Oid,

    /// Whether the extension is marked critical.
    critical: bool,

    /// The decoded value.
    value: ExtensionValue,
}

impl Extension {
    /// Creates an extension from its parts.
    pub fn new(oid: Oid, critical: bool, value: ExtensionValue) -> Self {
        Extension { oid, critical, value }
    }

    /// Returns the extension identifier.
    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    /// Returns whether the extension is marked critical.
    pub fn critical(&self) -> bool {
        self.critical
    }

    /// Returns the decoded value.
    pub fn value(&self) -> &ExtensionValue {
        &self.value
    }
}


//------------ ExtensionValue ------------------------------------------------

/// The decoded value of an extension.
///
/// The codec produces the typed variant matching the extension identifier,
/// `Unknown` for identifiers it does not recognize, and `Malformed` when a
/// recognized extension failed to decode. The engine turns `Malformed`
/// into the appropriate error bits during validation.
#[derive(Clone, Debug)]
pub enum ExtensionValue {
    /// Original-form basic constraints.
    BasicConstraints(BasicConstraints),

    /// Structured basic constraints.
    BasicConstraints2(BasicConstraints2),

    /// Key usage bits.
    KeyUsage(KeyUsage),

    /// Extended key usage purposes.
    ExtendedKeyUsage(ExtendedKeyUsage),

    /// Name constraints.
    NameConstraints(NameConstraints),

    /// Original-form authority key identifier.
    AuthorityKeyId(AuthorityKeyId),

    /// Current-form authority key identifier.
    AuthorityKeyId2(AuthorityKeyId2),

    /// Subject alternative names, either identifier.
    SubjectAltName(SubjectAltName),

    /// Subject key identifier.
    SubjectKeyId(Bytes),

    /// An extension the codec does not recognize, kept raw.
    Unknown(Bytes),

    /// A recognized extension that failed to decode.
    Malformed,
}


//------------ ExtValue ------------------------------------------------------

/// The result of looking up a typed extension on a certificate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExtValue<T> {
    /// The extension is not present.
    Absent,

    /// The extension is present and decoded.
    Present(T),

    /// The extension is present but could not be decoded.
    Malformed,
}

impl<T> ExtValue<T> {
    /// Returns whether the extension is absent.
    pub fn is_absent(&self) -> bool {
        matches!(self, ExtValue::Absent)
    }

    /// Returns the decoded value if there is one.
    pub fn present(self) -> Option<T> {
        match self {
            ExtValue::Present(value) => Some(value),
            _ => None
        }
    }
}


//------------ BasicConstraints ----------------------------------------------

/// The original form of the basic constraints extension.
///
/// This form carries a subject-type bit string of which only the CA bit
/// matters here. It knows no path length constraint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BasicConstraints {
    ca: bool,
}

impl BasicConstraints {
    /// Creates a value from the CA subject-type bit.
    pub fn new(ca: bool) -> Self {
        BasicConstraints { ca }
    }

    /// Returns whether the subject is a certification authority.
    pub fn is_ca(&self) -> bool {
        self.ca
    }
}


//------------ BasicConstraints2 ---------------------------------------------

/// The structured form of the basic constraints extension.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BasicConstraints2 {
    /// Whether the subject is a certification authority.
    ca: bool,

    /// The maximum number of intermediate CAs below the subject.
    ///
    /// `None` means no limit was expressed.
    path_len_constraint: Option<u32>,
}

impl BasicConstraints2 {
    /// Creates a value from the CA flag and optional path length.
    pub fn new(ca: bool, path_len_constraint: Option<u32>) -> Self {
        BasicConstraints2 { ca, path_len_constraint }
    }

    /// Returns whether the subject is a certification authority.
    pub fn is_ca(&self) -> bool {
        self.ca
    }

    /// Returns the path length constraint if one was expressed.
    pub fn path_len_constraint(&self) -> Option<u32> {
        self.path_len_constraint
    }
}


//------------ KeyUsage ------------------------------------------------------

/// The decoded key usage bit string.
///
/// The bits are kept in DER bit string order. Only nine bits are defined,
/// so a well-formed value is at most two octets long. Longer values are
/// kept as-is and rejected during validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyUsage {
    bits: Bytes,
}

impl KeyUsage {
    /// The keyCertSign bit within the first octet.
    const KEY_CERT_SIGN: u8 = 0x04;

    /// Creates a key usage value from the raw bit string octets.
    pub fn new(bits: Bytes) -> Self {
        KeyUsage { bits }
    }

    /// Returns the number of octets in the bit string.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns whether the bit string is empty.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns whether the keyCertSign bit is asserted.
    pub fn key_cert_sign(&self) -> bool {
        self.bits.first().map_or(false, |bits| {
            bits & Self::KEY_CERT_SIGN != 0
        })
    }
}


//------------ ExtendedKeyUsage ----------------------------------------------

/// The decoded extended key usage purpose list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtendedKeyUsage {
    purposes: Vec<Oid>,
}

impl ExtendedKeyUsage {
    /// Creates a value from the purpose identifiers.
    pub fn new(purposes: Vec<Oid>) -> Self {
        ExtendedKeyUsage { purposes }
    }

    /// Returns the purpose identifiers in order.
    pub fn purposes(&self) -> &[Oid] {
        &self.purposes
    }

    /// Returns whether the given purpose is among the listed ones.
    pub fn contains(&self, purpose: &ConstOid) -> bool {
        self.purposes.iter().any(|item| item == purpose)
    }
}


//------------ NameConstraints -----------------------------------------------

/// The decoded name constraints extension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NameConstraints {
    permitted: Vec<GeneralSubtree>,
    excluded: Vec<GeneralSubtree>,
}

impl NameConstraints {
    /// Creates a value from the permitted and excluded subtrees.
    pub fn new(
        permitted: Vec<GeneralSubtree>, excluded: Vec<GeneralSubtree>
    ) -> Self {
        NameConstraints { permitted, excluded }
    }

    /// Returns the permitted subtrees.
    pub fn permitted(&self) -> &[GeneralSubtree] {
        &self.permitted
    }

    /// Returns the excluded subtrees.
    pub fn excluded(&self) -> &[GeneralSubtree] {
        &self.excluded
    }

    /// Returns whether neither subtree list has any entries.
    pub fn is_empty(&self) -> bool {
        self.permitted.is_empty() && self.excluded.is_empty()
    }
}


//------------ GeneralSubtree ------------------------------------------------

/// One subtree of a name constraints extension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneralSubtree {
    /// The base name of the subtree.
    base: GeneralName,

    /// The minimum field. The profile requires this to be zero.
    minimum: u32,

    /// The maximum field. The profile requires this to be absent.
    maximum: Option<u32>,
}

impl GeneralSubtree {
    /// Creates a subtree covering the given base name.
    pub fn new(base: GeneralName) -> Self {
        GeneralSubtree { base, minimum: 0, maximum: None }
    }

    /// Creates a subtree with explicit minimum and maximum fields.
    pub fn with_bounds(
        base: GeneralName, minimum: u32, maximum: Option<u32>
    ) -> Self {
        GeneralSubtree { base, minimum, maximum }
    }

    /// Returns the base name.
    pub fn base(&self) -> &GeneralName {
        &self.base
    }

    /// Returns whether the minimum and maximum fields are at their
    /// profile-mandated defaults.
    pub fn has_default_bounds(&self) -> bool {
        self.minimum == 0 && self.maximum.is_none()
    }
}


//------------ AuthorityKeyId ------------------------------------------------

/// The original form of the authority key identifier extension.
///
/// The issuer of the authority certificate is carried directly as a
/// distinguished name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthorityKeyId {
    /// The subject key identifier of the authority certificate.
    key_id: Option<Bytes>,

    /// The issuer name of the authority certificate.
    cert_issuer: Option<Name>,

    /// The serial number of the authority certificate.
    cert_serial_number: Option<Bytes>,
}

impl AuthorityKeyId {
    /// Creates a value from its parts.
    pub fn new(
        key_id: Option<Bytes>,
        cert_issuer: Option<Name>,
        cert_serial_number: Option<Bytes>,
    ) -> Self {
        AuthorityKeyId { key_id, cert_issuer, cert_serial_number }
    }

    /// Returns the key identifier if present.
    pub fn key_id(&self) -> Option<&Bytes> {
        self.key_id.as_ref()
    }

    /// Returns the authority certificate issuer if present.
    pub fn cert_issuer(&self) -> Option<&Name> {
        self.cert_issuer.as_ref()
    }

    /// Returns the authority certificate serial number if present.
    pub fn cert_serial_number(&self) -> Option<&Bytes> {
        self.cert_serial_number.as_ref()
    }
}


//------------ AuthorityKeyId2 -----------------------------------------------

/// The current form of the authority key identifier extension.
///
/// Unlike the original form, the issuer of the authority certificate is a
/// sequence of general names of which only directory names are usable
/// for issuer lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthorityKeyId2 {
    /// The subject key identifier of the authority certificate.
    key_id: Option<Bytes>,

    /// The issuer of the authority certificate as general names.
    authority_cert_issuer: Vec<GeneralName>,

    /// The serial number of the authority certificate.
    authority_cert_serial_number: Option<Bytes>,
}

impl AuthorityKeyId2 {
    /// Creates a value from its parts.
    pub fn new(
        key_id: Option<Bytes>,
        authority_cert_issuer: Vec<GeneralName>,
        authority_cert_serial_number: Option<Bytes>,
    ) -> Self {
        AuthorityKeyId2 {
            key_id, authority_cert_issuer, authority_cert_serial_number
        }
    }

    /// Returns the key identifier if present.
    pub fn key_id(&self) -> Option<&Bytes> {
        self.key_id.as_ref()
    }

    /// Returns the authority certificate issuer names.
    pub fn authority_cert_issuer(&self) -> &[GeneralName] {
        &self.authority_cert_issuer
    }

    /// Returns the authority certificate serial number if present.
    pub fn authority_cert_serial_number(&self) -> Option<&Bytes> {
        self.authority_cert_serial_number.as_ref()
    }

    /// Returns the first directory name among the issuer names.
    pub fn directory_issuer(&self) -> Option<&Name> {
        self.authority_cert_issuer.iter().find_map(|name| {
            match name {
                GeneralName::Directory(name) => Some(name),
                _ => None
            }
        })
    }
}


//------------ SubjectAltName ------------------------------------------------

/// The decoded subject alternative name extension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectAltName {
    entries: Vec<GeneralName>,
}

impl SubjectAltName {
    /// Creates a value from the name entries.
    pub fn new(entries: Vec<GeneralName>) -> Self {
        SubjectAltName { entries }
    }

    /// Returns the name entries in order.
    pub fn entries(&self) -> &[GeneralName] {
        &self.entries
    }

    /// Returns all DNS name entries in order.
    pub fn dns_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| {
            match entry {
                GeneralName::Dns(name) => Some(name.as_str()),
                _ => None
            }
        })
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    fn name(value: &str) -> Name {
        Name::new(
            Bytes::copy_from_slice(value.as_bytes()),
            vec![Rdn::new(vec![RdnAttr::new(
                Oid(Bytes::from_static(&[85, 4, 3])), value
            )])],
        )
    }

    #[test]
    fn name_equality_is_encoded_bytes() {
        assert_eq!(name("CA"), name("CA"));
        assert_ne!(name("CA"), name("Other CA"));
        assert_eq!(
            Name::from_raw(Bytes::from_static(b"x")),
            Name::from_raw(Bytes::from_static(b"x"))
        );
    }

    #[test]
    fn name_attr_lookup() {
        let name = Name::new(
            Bytes::from_static(b"raw"),
            vec![
                Rdn::new(vec![RdnAttr::new(
                    Oid(Bytes::from_static(&[85, 4, 3])), "server"
                )]),
                Rdn::new(vec![RdnAttr::new(
                    Oid(Bytes::from_static(
                        &[9, 146, 38, 137, 147, 242, 44, 100, 1, 25]
                    )),
                    "example"
                )]),
            ],
        );
        assert_eq!(
            name.find_attr(&crate::oid::AT_COMMON_NAME), Some("server")
        );
        assert_eq!(
            name.attr_values(&crate::oid::AT_DOMAIN_COMPONENT)
                .collect::<Vec<_>>(),
            vec!["example"]
        );
        assert!(name.has_attr(&crate::oid::AT_COMMON_NAME));
    }

    #[test]
    fn key_usage_cert_sign_bit() {
        assert!(KeyUsage::new(Bytes::from_static(&[0x04])).key_cert_sign());
        assert!(
            KeyUsage::new(Bytes::from_static(&[0x86, 0x80])).key_cert_sign()
        );
        assert!(!KeyUsage::new(Bytes::from_static(&[0x80])).key_cert_sign());
        assert!(!KeyUsage::new(Bytes::new()).key_cert_sign());
    }

    #[test]
    fn subtree_default_bounds() {
        let good = GeneralSubtree::new(
            GeneralName::Dns(String::from(".example.com"))
        );
        assert!(good.has_default_bounds());
        let bad = GeneralSubtree::with_bounds(
            GeneralName::Dns(String::from(".example.com")), 1, None
        );
        assert!(!bad.has_default_bounds());
        let bad = GeneralSubtree::with_bounds(
            GeneralName::Dns(String::from(".example.com")), 0, Some(2)
        );
        assert!(!bad.has_default_bounds());
    }

    #[test]
    fn general_name_forms() {
        let dns = GeneralName::Dns(String::from("example.com"));
        let uri = GeneralName::Uri(String::from("https://example.com/"));
        assert!(dns.same_form(&GeneralName::Dns(String::from("other"))));
        assert!(!dns.same_form(&uri));
        assert_eq!(GeneralName::Unsupported(0).tag(), 0);
    }
}
