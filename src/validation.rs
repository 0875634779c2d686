//! Conformance checking of completed chains.
//!
//! Once a simple chain has been assembled, the checks in this module walk
//! it from the root down to the end entity and record every violation of
//! the certificate profile as status bits: version consistency, validity
//! period, issuer signatures, basic constraints with path lengths, key
//! usage, extended key usage on authorities, the critical extension
//! whitelist, and finally name constraints across the whole chain and the
//! trust decision about the root.
//!
//! Nothing in here ever fails. Whatever is wrong with a chain ends up in
//! the status of the element that is responsible and in the aggregate
//! status of the chain.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use crate::cert::{
    Cert, ExtValue, ExtensionValue, GeneralName, NameConstraints,
    SubjectAltName, Version,
};
use crate::chain::SimpleChain;
use crate::engine::Engine;
use crate::name_match::{
    dns_name_matches, ip_address_matches, rfc822_name_matches, url_matches,
};
use crate::oid;
use crate::status::{ErrorStatus, InfoStatus};
use crate::store::CertStore;


//------------ ChainConstraints ----------------------------------------------

/// The basic constraints in effect while walking down a chain.
#[derive(Clone, Copy, Debug)]
struct ChainConstraints {
    /// Whether the current element may act as a CA.
    ca: bool,

    /// The path length limit currently in effect, if any.
    path_len: Option<u32>,
}

impl ChainConstraints {
    fn new() -> Self {
        ChainConstraints { ca: false, path_len: None }
    }
}


//------------ check_simple_chain --------------------------------------------

/// Runs all conformance checks over a completed simple chain.
///
/// The chain is walked from the last element, which is supposed to be the
/// root, down to the end entity, carrying the basic constraints the upper
/// part of the chain has imposed. Every check records its outcome in the
/// element and aggregate status.
pub(crate) fn check_simple_chain(
    engine: &Engine,
    chain: &mut SimpleChain,
    time: DateTime<Utc>,
) {
    let mut path_length_violated = false;
    let mut constraints = ChainConstraints::new();
    let last = chain.len() - 1;

    debug!("checking chain of {} elements at {}", chain.len(), time);
    for i in (0..chain.len()).rev() {
        let cert = chain.element(i).expect("walked past chain").cert().clone();
        let is_root = i == last && cert.is_self_signed();
        dump_element(i, &cert);

        if !cert_version_valid(&cert) {
            // There is no specific bit for contents that belie the
            // claimed version.
            element_error(chain, i, ErrorStatus::INVALID_EXTENSION);
        }
        if !cert.validity().covers(time) {
            element_error(chain, i, ErrorStatus::IS_NOT_TIME_VALID);
        }
        if i != 0 {
            let subject = chain.element(i - 1)
                .expect("walked past chain").cert().clone();
            if !signature_valid(engine, &cert, &subject) {
                element_error(
                    chain, i - 1, ErrorStatus::IS_NOT_SIGNATURE_VALID
                );
            }
            // Once a path length constraint has been violated, every
            // remaining CA is in violation as well.
            if path_length_violated {
                element_error(
                    chain, i, ErrorStatus::INVALID_BASIC_CONSTRAINTS
                );
            }
            else if !check_basic_constraints_for_ca(
                engine, &cert, &mut constraints, (i - 1) as u32, is_root,
                &mut path_length_violated,
            ) {
                element_error(
                    chain, i, ErrorStatus::INVALID_BASIC_CONSTRAINTS
                );
            }
            else if let Some(limit) = constraints.path_len {
                if limit != 0 {
                    constraints.path_len = Some(limit - 1);
                }
            }
        }
        else {
            match decode_basic_constraints(&cert, false) {
                Ok(decoded) => constraints = decoded,
                Err(_) => {
                    element_error(
                        chain, i, ErrorStatus::INVALID_BASIC_CONSTRAINTS
                    );
                }
            }
        }
        if !key_usage_valid(engine, &cert, is_root, constraints.ca) {
            element_error(chain, i, ErrorStatus::IS_NOT_VALID_FOR_USAGE);
        }
        if i != 0 && !extended_key_usage_valid_for_ca(&cert) {
            element_error(chain, i, ErrorStatus::IS_NOT_VALID_FOR_USAGE);
        }
        if chain.is_cyclic() {
            // A cyclic chain is infinitely long, so its path length
            // constraints are violated no matter what they say.
            path_length_violated = true;
            chain.status_mut().errors |= ErrorStatus::IS_PARTIAL_CHAIN
                | ErrorStatus::INVALID_BASIC_CONSTRAINTS;
        }
        if !critical_extensions_supported(&cert) {
            element_error(chain, i, ErrorStatus::INVALID_EXTENSION);
        }
        chain.combine_element_status(i);
    }

    check_chain_name_constraints(chain);

    let root_cert = chain.element(last)
        .expect("walked past chain").cert().clone();
    if root_cert.is_self_signed() {
        if let Some(element) = chain.element_mut(last) {
            element.status_mut().info |= InfoStatus::IS_SELF_SIGNED
                | InfoStatus::HAS_NAME_MATCH_ISSUER;
        }
        check_root_cert(engine, chain, last, &root_cert);
    }
    chain.combine_element_status(last);
}

/// Sets an error bit on the element at the given position.
fn element_error(chain: &mut SimpleChain, index: usize, error: ErrorStatus) {
    if let Some(element) = chain.element_mut(index) {
        element.status_mut().errors |= error;
    }
}

/// Logs the certificate under inspection.
fn dump_element(index: usize, cert: &Cert) {
    debug!(
        "element {}: subject {}, issuer {}, valid {} to {}, \
         {} extensions",
        index, cert.subject(), cert.issuer(),
        cert.validity().not_before(), cert.validity().not_after(),
        cert.extensions().len(),
    );
}


//------------ Per-certificate checks ----------------------------------------

/// Checks that the contents of a certificate match its version.
///
/// Unique identifiers need at least v2, extensions need v3.
fn cert_version_valid(cert: &Cert) -> bool {
    match cert.version() {
        Version::V1 => {
            cert.issuer_unique_id().is_none()
                && cert.subject_unique_id().is_none()
                && cert.extensions().is_empty()
        }
        Version::V2 => cert.extensions().is_empty(),
        Version::V3 => true,
    }
}

/// Verifies the signature the issuer made over the subject certificate.
fn signature_valid(engine: &Engine, issuer: &Cert, subject: &Cert) -> bool {
    let algorithm = match subject.signature_algorithm() {
        Some(algorithm) => algorithm,
        None => return false
    };
    engine.verifier().verify(
        issuer.subject_public_key_info(),
        algorithm,
        subject.raw_tbs(),
        subject.signature_value(),
    ).is_ok()
}

/// Decodes the basic constraints of a certificate, whichever form it uses.
///
/// The original form wins if both are present. A certificate without
/// either form gets `default_ca` as its CA flag and no path length. A
/// present but undecodable extension is an error.
fn decode_basic_constraints(
    cert: &Cert, default_ca: bool
) -> Result<ChainConstraints, ()> {
    match cert.basic_constraints() {
        ExtValue::Present(constraints) => {
            Ok(ChainConstraints {
                ca: constraints.is_ca(),
                path_len: None,
            })
        }
        ExtValue::Malformed => Err(()),
        ExtValue::Absent => match cert.basic_constraints_2() {
            ExtValue::Present(constraints) => {
                Ok(ChainConstraints {
                    ca: constraints.is_ca(),
                    path_len: constraints.path_len_constraint(),
                })
            }
            ExtValue::Malformed => Err(()),
            ExtValue::Absent => {
                Ok(ChainConstraints { ca: default_ca, path_len: None })
            }
        },
    }
}

/// Checks whether a certificate may act as a CA at its chain position.
///
/// A certificate must assert the CA flag in its basic constraints to act
/// as a CA. Two kinds of certificates get the flag implicitly: the root,
/// and a v1 or v2 certificate that is installed in the engine's world
/// store. The latter mirrors the common treatment of legacy roots and
/// locally installed authorities that predate the extension.
///
/// `chain_constraints` carries the constraints imposed higher up. If this
/// certificate imposes a stricter path length, the carried constraints
/// are tightened. With `remaining_cas` authorities still to come below
/// this one, a path length overrun marks the violation flag and fails the
/// check.
fn check_basic_constraints_for_ca(
    engine: &Engine,
    cert: &Cert,
    chain_constraints: &mut ChainConstraints,
    remaining_cas: u32,
    is_root: bool,
    path_length_violated: &mut bool,
) -> bool {
    let implicit_ca = is_root
        || (cert.version().is_pre_v3()
            && engine.world_store().contains(cert));
    let mut valid = match decode_basic_constraints(cert, implicit_ca) {
        Ok(constraints) => {
            chain_constraints.ca = constraints.ca;
            if !constraints.ca {
                debug!(
                    "certificate {} cannot act as a CA", cert.subject()
                );
                false
            }
            else {
                if let Some(limit) = constraints.path_len {
                    // A path length applies to the entire remaining
                    // chain, so only ever tighten.
                    let tighter = chain_constraints.path_len
                        .map_or(true, |current| limit < current);
                    if tighter {
                        debug!("path length constraint now {}", limit);
                        chain_constraints.path_len = Some(limit);
                    }
                }
                true
            }
        }
        Err(_) => false,
    };
    if let Some(limit) = chain_constraints.path_len {
        if remaining_cas > limit {
            debug!(
                "{} remaining CAs exceed path length {}",
                remaining_cas, limit
            );
            valid = false;
            *path_length_violated = true;
        }
    }
    valid
}

/// Checks the key usage of a certificate against its chain position.
///
/// An authority has to assert keyCertSign. An authority without any key
/// usage extension passes only if it is the root or a locally installed
/// v1 or v2 certificate. An end entity that is no CA must not assert
/// keyCertSign.
fn key_usage_valid(
    engine: &Engine, cert: &Cert, is_root: bool, is_ca: bool
) -> bool {
    let usage = match cert.key_usage() {
        ExtValue::Present(usage) => {
            // Nine defined bits fit into two octets. Anything longer is
            // not a key usage value.
            if usage.len() > 2 {
                return false
            }
            Some(usage)
        }
        ExtValue::Malformed => return false,
        ExtValue::Absent => None,
    };
    if is_ca {
        match usage {
            None => {
                let trusted = is_root
                    || (cert.version().is_pre_v3()
                        && engine.world_store().contains(cert));
                if !trusted {
                    warn!(
                        "no key usage extension on CA certificate {}",
                        cert.subject()
                    );
                }
                trusted
            }
            Some(usage) => {
                if usage.key_cert_sign() {
                    true
                }
                else {
                    warn!(
                        "keyCertSign not asserted on CA certificate {}",
                        cert.subject()
                    );
                    false
                }
            }
        }
    }
    else {
        match usage {
            Some(usage) if usage.key_cert_sign() => {
                warn!(
                    "keyCertSign asserted on non-CA certificate {}",
                    cert.subject()
                );
                false
            }
            _ => true,
        }
    }
}

/// Checks the extended key usage of an authority certificate.
///
/// The extension is meant for end entities, so on an authority it is only
/// enforced when it is critical, in which case the code signing purpose
/// has to be listed explicitly. The any-purpose identifier does not
/// count.
fn extended_key_usage_valid_for_ca(cert: &Cert) -> bool {
    match cert.find_extension(&oid::EXTENDED_KEY_USAGE) {
        Some(ext) if ext.critical() => match ext.value() {
            ExtensionValue::ExtendedKeyUsage(usage) => {
                usage.contains(&oid::KP_CODE_SIGNING)
            }
            _ => false,
        },
        _ => true,
    }
}

/// Checks that every critical extension is one the engine understands.
fn critical_extensions_supported(cert: &Cert) -> bool {
    for ext in cert.extensions() {
        if !ext.critical() {
            continue
        }
        let id = ext.oid();
        let supported = *id == oid::BASIC_CONSTRAINTS
            || *id == oid::BASIC_CONSTRAINTS_2
            || *id == oid::NAME_CONSTRAINTS
            || *id == oid::KEY_USAGE
            || *id == oid::SUBJECT_ALT_NAME
            || *id == oid::SUBJECT_ALT_NAME_2
            || *id == oid::EXTENDED_KEY_USAGE;
        if !supported {
            warn!("unsupported critical extension {}", id);
            return false
        }
    }
    true
}

/// Runs the root-only checks: the self-signature and the trust lookup.
fn check_root_cert(
    engine: &Engine, chain: &mut SimpleChain, index: usize, root: &Cert
) {
    if !signature_valid(engine, root, root) {
        debug!("self-signature of root {} is invalid", root.subject());
        element_error(chain, index, ErrorStatus::IS_NOT_SIGNATURE_VALID);
    }
    if !engine.root_store().contains(root) {
        element_error(chain, index, ErrorStatus::IS_UNTRUSTED_ROOT);
    }
}


//------------ Name constraints ----------------------------------------------

/// Enforces the name constraints of every CA over the chain below it.
///
/// Every constraint violation is recorded on the certificate that imposed
/// the constraint, not on the certificate that violated it. Self-signed
/// certificates below a constraining CA are exempt unless they are the
/// end entity.
fn check_chain_name_constraints(chain: &mut SimpleChain) {
    for i in (1..chain.len()).rev() {
        let constraints = match
            chain.element(i).expect("walked past chain")
                .cert().name_constraints()
        {
            ExtValue::Present(constraints) => constraints.clone(),
            ExtValue::Malformed => {
                element_error(chain, i, ErrorStatus::INVALID_EXTENSION);
                chain.combine_element_status(i);
                continue
            }
            ExtValue::Absent => continue,
        };
        if !name_constraints_supported(&constraints) {
            element_error(
                chain, i, ErrorStatus::HAS_NOT_SUPPORTED_NAME_CONSTRAINT
            );
        }
        else {
            for j in (0..i).rev() {
                let cert = chain.element(j)
                    .expect("walked past chain").cert().clone();
                if j != 0 && cert.is_self_signed() {
                    continue
                }
                let mut errors = ErrorStatus::empty();
                check_name_constraints(&constraints, &cert, &mut errors);
                element_error(chain, i, errors);
            }
        }
        chain.combine_element_status(i);
    }
}

/// Returns whether the constraints stay within the supported profile.
///
/// The profile pins the minimum and maximum fields of every subtree to
/// their defaults. Anything else would need subtree arithmetic nobody
/// defines, so it is reported as unsupported.
fn name_constraints_supported(constraints: &NameConstraints) -> bool {
    constraints.permitted().iter()
        .chain(constraints.excluded().iter())
        .all(|subtree| subtree.has_default_bounds())
}

/// Checks one certificate against one set of name constraints.
fn check_name_constraints(
    constraints: &NameConstraints, cert: &Cert, errors: &mut ErrorStatus
) {
    if constraints.is_empty() {
        return
    }
    match cert.subject_alt_name() {
        ExtValue::Present(alt_name) => {
            for subtree in constraints.excluded() {
                find_matching_name_entry(
                    subtree.base(), alt_name, errors,
                    ErrorStatus::HAS_EXCLUDED_NAME_CONSTRAINT,
                    ErrorStatus::empty(),
                );
            }
            for subtree in constraints.permitted() {
                find_matching_name_entry(
                    subtree.base(), alt_name, errors,
                    ErrorStatus::empty(),
                    ErrorStatus::HAS_NOT_PERMITTED_NAME_CONSTRAINT,
                );
            }
        }
        ExtValue::Malformed => {
            *errors |= ErrorStatus::INVALID_EXTENSION
                | ErrorStatus::INVALID_NAME_CONSTRAINTS;
        }
        ExtValue::Absent => {
            // Without any alternative name there is nothing that could
            // fall into a permitted subtree.
            if !constraints.permitted().is_empty() {
                *errors |= ErrorStatus::HAS_NOT_PERMITTED_NAME_CONSTRAINT;
            }
            if !constraints.excluded().is_empty() {
                *errors |= ErrorStatus::HAS_EXCLUDED_NAME_CONSTRAINT;
            }
        }
    }
}

/// Matches a constraint against all same-form entries of an alt name.
///
/// Records `error_if_found` if any entry of the constraint's form matches
/// and `error_if_not_found` if none does. Constraint forms the engine
/// cannot match are flagged as unsupported.
fn find_matching_name_entry(
    constraint: &GeneralName,
    alt_name: &SubjectAltName,
    errors: &mut ErrorStatus,
    error_if_found: ErrorStatus,
    error_if_not_found: ErrorStatus,
) {
    let mut matched = false;
    for entry in alt_name.entries() {
        if !entry.same_form(constraint) {
            continue
        }
        match (constraint, entry) {
            (GeneralName::Rfc822(constraint), GeneralName::Rfc822(name)) => {
                if rfc822_name_matches(
                    Some(constraint), Some(name), errors
                ) {
                    matched = true;
                }
            }
            (GeneralName::Dns(constraint), GeneralName::Dns(name)) => {
                if dns_name_matches(Some(constraint), Some(name), errors) {
                    matched = true;
                }
            }
            (GeneralName::Uri(constraint), GeneralName::Uri(name)) => {
                if url_matches(Some(constraint), Some(name), errors) {
                    matched = true;
                }
            }
            (GeneralName::Ip(constraint), GeneralName::Ip(name)) => {
                if ip_address_matches(
                    Some(constraint.as_ref()), Some(name.as_ref()), errors
                ) {
                    matched = true;
                }
            }
            _ => {
                warn!(
                    "name constraint form {} is unsupported",
                    constraint.tag()
                );
                *errors |= ErrorStatus::HAS_NOT_SUPPORTED_NAME_CONSTRAINT;
            }
        }
    }
    *errors |= if matched { error_if_found } else { error_if_not_found };
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use crate::cert::GeneralSubtree;
    use crate::test::CertBuilder;

    fn constraints(
        permitted: Vec<GeneralName>, excluded: Vec<GeneralName>
    ) -> NameConstraints {
        NameConstraints::new(
            permitted.into_iter().map(GeneralSubtree::new).collect(),
            excluded.into_iter().map(GeneralSubtree::new).collect(),
        )
    }

    #[test]
    fn version_contents_consistency() {
        let v1_plain = CertBuilder::new("A", "B").v1().build();
        assert!(cert_version_valid(&v1_plain));

        let v1_ext = CertBuilder::new("A", "B").v1()
            .basic_constraints_2(true, None)
            .build();
        assert!(!cert_version_valid(&v1_ext));

        let v2_uid = CertBuilder::new("A", "B").v2()
            .subject_unique_id(&[1])
            .build();
        assert!(cert_version_valid(&v2_uid));

        let v1_uid = CertBuilder::new("A", "B").v1()
            .subject_unique_id(&[1])
            .build();
        assert!(!cert_version_valid(&v1_uid));

        let v3 = CertBuilder::new("A", "B")
            .basic_constraints_2(true, None)
            .build();
        assert!(cert_version_valid(&v3));
    }

    #[test]
    fn critical_extension_whitelist() {
        let fine = CertBuilder::new("A", "B")
            .critical_basic_constraints_2(true, None)
            .build();
        assert!(critical_extensions_supported(&fine));

        let odd = CertBuilder::new("A", "B")
            .critical_unknown_extension(&[1, 2, 3, 4])
            .build();
        assert!(!critical_extensions_supported(&odd));

        let harmless = CertBuilder::new("A", "B")
            .unknown_extension(&[1, 2, 3, 4])
            .build();
        assert!(critical_extensions_supported(&harmless));
    }

    #[test]
    fn extended_key_usage_only_critical_counts() {
        let absent = CertBuilder::new("A", "B").build();
        assert!(extended_key_usage_valid_for_ca(&absent));

        let lax = CertBuilder::new("A", "B")
            .extended_key_usage(false, &[&oid::KP_CODE_SIGNING])
            .build();
        assert!(extended_key_usage_valid_for_ca(&lax));

        let strict_good = CertBuilder::new("A", "B")
            .extended_key_usage(true, &[&oid::KP_CODE_SIGNING])
            .build();
        assert!(extended_key_usage_valid_for_ca(&strict_good));

        let strict_bad = CertBuilder::new("A", "B")
            .extended_key_usage(true, &[&oid::AT_COMMON_NAME])
            .build();
        assert!(!extended_key_usage_valid_for_ca(&strict_bad));
    }

    #[test]
    fn name_constraint_entry_matching() {
        let alt_name = SubjectAltName::new(vec![
            GeneralName::Dns(String::from("mail.example.com")),
            GeneralName::Uri(String::from("https://example.com/")),
        ]);

        let mut errors = ErrorStatus::empty();
        find_matching_name_entry(
            &GeneralName::Dns(String::from("example.com")),
            &alt_name, &mut errors,
            ErrorStatus::HAS_EXCLUDED_NAME_CONSTRAINT,
            ErrorStatus::empty(),
        );
        assert!(
            errors.intersects(ErrorStatus::HAS_EXCLUDED_NAME_CONSTRAINT)
        );

        let mut errors = ErrorStatus::empty();
        find_matching_name_entry(
            &GeneralName::Dns(String::from("example.org")),
            &alt_name, &mut errors,
            ErrorStatus::empty(),
            ErrorStatus::HAS_NOT_PERMITTED_NAME_CONSTRAINT,
        );
        assert!(
            errors.intersects(ErrorStatus::HAS_NOT_PERMITTED_NAME_CONSTRAINT)
        );
    }

    #[test]
    fn unsupported_constraint_form_is_flagged() {
        let alt_name = SubjectAltName::new(vec![
            GeneralName::Unsupported(0),
        ]);
        let mut errors = ErrorStatus::empty();
        find_matching_name_entry(
            &GeneralName::Unsupported(0), &alt_name, &mut errors,
            ErrorStatus::empty(), ErrorStatus::empty(),
        );
        assert!(
            errors.intersects(ErrorStatus::HAS_NOT_SUPPORTED_NAME_CONSTRAINT)
        );
    }

    #[test]
    fn missing_alt_name_fails_both_directions() {
        let cert = CertBuilder::new("Leaf", "CA").build();
        let both = constraints(
            vec![GeneralName::Dns(String::from("example.com"))],
            vec![GeneralName::Dns(String::from("example.org"))],
        );
        let mut errors = ErrorStatus::empty();
        check_name_constraints(&both, &cert, &mut errors);
        assert!(
            errors.intersects(ErrorStatus::HAS_NOT_PERMITTED_NAME_CONSTRAINT)
        );
        assert!(
            errors.intersects(ErrorStatus::HAS_EXCLUDED_NAME_CONSTRAINT)
        );
    }

    #[test]
    fn ip_constraint_against_alt_name() {
        let cert = CertBuilder::new("Leaf", "CA")
            .subject_alt_name(vec![GeneralName::Ip(
                Bytes::from_static(&[10, 0, 0, 17])
            )])
            .build();
        let excluded = constraints(
            Vec::new(),
            vec![GeneralName::Ip(Bytes::from_static(
                &[10, 0, 0, 0, 255, 0, 0, 0]
            ))],
        );
        let mut errors = ErrorStatus::empty();
        check_name_constraints(&excluded, &cert, &mut errors);
        assert!(
            errors.intersects(ErrorStatus::HAS_EXCLUDED_NAME_CONSTRAINT)
        );
    }

    #[test]
    fn nondefault_bounds_are_unsupported() {
        let fine = constraints(
            vec![GeneralName::Dns(String::from("example.com"))],
            Vec::new(),
        );
        assert!(name_constraints_supported(&fine));

        let odd = NameConstraints::new(
            vec![GeneralSubtree::with_bounds(
                GeneralName::Dns(String::from("example.com")), 2, None
            )],
            Vec::new(),
        );
        assert!(!name_constraints_supported(&odd));
    }
}
