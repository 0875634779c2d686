//! Finding candidate issuers for a certificate.
//!
//! Given a subject certificate, the [`IssuerFinder`] decides once how an
//! issuer should be looked up and then enumerates every matching
//! certificate of a store in store order. The lookup method also determines
//! the info status recorded on the subject element: an authority key
//! identifier naming issuer and serial gives the exact match, a bare key
//! identifier the key match, and a plain subject name search the name
//! match.
//!
//! The finder is a plain iterator, so a search can be continued after any
//! candidate. Alternate path exploration uses [`skip_past`] to restart an
//! enumeration behind the issuer a chain already uses.
//!
//! [`skip_past`]: IssuerFinder::skip_past

use std::sync::Arc;
use log::debug;
use crate::cert::{Cert, ExtValue};
use crate::status::InfoStatus;
use crate::store::{CertStore, FindCriteria};


//------------ IssuerFinder --------------------------------------------------

/// An enumeration of the candidate issuers of one certificate.
pub struct IssuerFinder<'a> {
    /// The store to search.
    store: &'a dyn CertStore,

    /// How to search, if the subject allows searching at all.
    ///
    /// This is `None` if the subject carries an authority key identifier
    /// that is malformed or names the issuer in a way we cannot use. Such
    /// a subject gets no issuer candidates.
    criteria: Option<FindCriteria>,

    /// The info status describing the lookup method.
    info: InfoStatus,

    /// The current enumeration position.
    pos: usize,
}

impl<'a> IssuerFinder<'a> {
    /// Creates a finder for the issuers of `subject` within `store`.
    pub fn new(store: &'a dyn CertStore, subject: &Cert) -> Self {
        let (criteria, info) = Self::plan(subject);
        IssuerFinder { store, criteria, info, pos: 0 }
    }

    /// Decides how to search for the issuer of `subject`.
    fn plan(subject: &Cert) -> (Option<FindCriteria>, InfoStatus) {
        match subject.authority_key_id() {
            ExtValue::Present(aki) => {
                if let (Some(issuer), Some(serial)) =
                    (aki.cert_issuer(), aki.cert_serial_number())
                {
                    return (
                        Some(FindCriteria::IssuerSerial {
                            issuer: issuer.clone(),
                            serial: serial.clone(),
                        }),
                        InfoStatus::HAS_EXACT_MATCH_ISSUER,
                    )
                }
                if let Some(key_id) = aki.key_id() {
                    return (
                        Some(FindCriteria::KeyId(key_id.clone())),
                        InfoStatus::HAS_KEY_MATCH_ISSUER,
                    )
                }
                (None, InfoStatus::empty())
            }
            ExtValue::Malformed => (None, InfoStatus::empty()),
            ExtValue::Absent => match subject.authority_key_id_2() {
                ExtValue::Present(aki) => {
                    if !aki.authority_cert_issuer().is_empty()
                        && aki.authority_cert_serial_number().is_some()
                    {
                        match aki.directory_issuer() {
                            Some(issuer) => {
                                return (
                                    Some(FindCriteria::IssuerSerial {
                                        issuer: issuer.clone(),
                                        serial: aki
                                            .authority_cert_serial_number()
                                            .unwrap().clone(),
                                    }),
                                    InfoStatus::HAS_EXACT_MATCH_ISSUER,
                                )
                            }
                            None => {
                                debug!(
                                    "no usable name form in authority key \
                                     identifier of {}",
                                    subject.subject()
                                );
                                return (None, InfoStatus::empty())
                            }
                        }
                    }
                    if let Some(key_id) = aki.key_id() {
                        return (
                            Some(FindCriteria::KeyId(key_id.clone())),
                            InfoStatus::HAS_KEY_MATCH_ISSUER,
                        )
                    }
                    (None, InfoStatus::empty())
                }
                ExtValue::Malformed => (None, InfoStatus::empty()),
                ExtValue::Absent => (
                    Some(FindCriteria::Subject(subject.issuer().clone())),
                    InfoStatus::HAS_NAME_MATCH_ISSUER,
                ),
            },
        }
    }

    /// Returns the info status describing how candidates are matched.
    pub fn info_status(&self) -> InfoStatus {
        self.info
    }

    /// Advances the enumeration to behind the given certificate.
    ///
    /// If the certificate does not appear among the remaining candidates,
    /// the enumeration is exhausted afterwards.
    pub fn skip_past(&mut self, issuer: &Cert) {
        for candidate in self {
            if *candidate == *issuer {
                break
            }
        }
    }
}

impl<'a> Iterator for IssuerFinder<'a> {
    type Item = Arc<Cert>;

    fn next(&mut self) -> Option<Self::Item> {
        let criteria = self.criteria.as_ref()?;
        let (cert, next) = self.store.find_from(criteria, self.pos)?;
        self.pos = next;
        Some(cert)
    }
}


//============ Tests =========================================================
