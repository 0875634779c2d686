//! Revocation checking.
//!
//! Actually determining revocation status means fetching CRLs or asking
//! OCSP responders, which is firmly outside the engine. The engine only
//! assembles the list of certificates whose status a build wants checked,
//! hands it to a [`RevocationChecker`], and translates the failure it may
//! report back into status bits on the faulting element.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use log::debug;
use crate::cert::Cert;
use crate::chain::ChainContext;
use crate::config::{BuildFlags, ChainParams};
use crate::status::ErrorStatus;


//------------ RevocationChecker ---------------------------------------------

/// A provider that can determine revocation status.
pub trait RevocationChecker: fmt::Debug + Send + Sync {
    /// Checks the revocation status of the given certificates.
    ///
    /// Returns an error describing the first certificate whose status
    /// could not be confirmed as good, identified by its index into
    /// `certs`.
    fn check(
        &self,
        certs: &[Arc<Cert>],
        options: &RevocationOptions,
    ) -> Result<(), RevocationFailure>;
}


//------------ NoRevocation --------------------------------------------------

/// A revocation checker without any way of checking.
///
/// Every queried certificate comes back with unknown status. This is the
/// default checker of an engine that was not given a real one.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRevocation;

impl RevocationChecker for NoRevocation {
    fn check(
        &self,
        certs: &[Arc<Cert>],
        _options: &RevocationOptions,
    ) -> Result<(), RevocationFailure> {
        if certs.is_empty() {
            Ok(())
        }
        else {
            Err(RevocationFailure {
                index: 0,
                error: RevocationError::NoRevocationCheck,
            })
        }
    }
}


//------------ RevocationOptions ---------------------------------------------

/// The options handed to a revocation checker.
#[derive(Clone, Debug)]
pub struct RevocationOptions {
    /// The time at which status should be evaluated.
    pub time: DateTime<Utc>,

    /// Only cached information may be used.
    pub cache_only: bool,

    /// The retrieval timeout is a budget shared by all certificates.
    pub accumulative_timeout: bool,

    /// How long a single remote retrieval may take.
    pub url_retrieval_timeout: Option<Duration>,

    /// Whether the age of revocation information has to be checked.
    pub check_freshness_time: bool,

    /// The largest acceptable age of revocation information.
    pub freshness_time: Option<Duration>,
}


//------------ RevocationFailure ---------------------------------------------

/// The failed outcome of a revocation check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RevocationFailure {
    /// The index of the faulting certificate in the checked slice.
    pub index: usize,

    /// What went wrong for it.
    pub error: RevocationError,
}


//------------ RevocationError -----------------------------------------------

/// The ways a revocation check can fail for a certificate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RevocationError {
    /// No means of checking was available for the certificate.
    NoRevocationCheck,

    /// No revocation provider is installed at all.
    NoRevocationProvider,

    /// The certificate is not listed in the revocation database.
    NotInDatabase,

    /// The responder could not be reached.
    Offline,

    /// The certificate has been revoked.
    Revoked,
}

impl RevocationError {
    /// Returns the status bit this failure maps to.
    fn to_error_status(self) -> ErrorStatus {
        match self {
            RevocationError::NoRevocationCheck
            | RevocationError::NoRevocationProvider
            | RevocationError::NotInDatabase => {
                ErrorStatus::REVOCATION_STATUS_UNKNOWN
            }
            RevocationError::Offline => ErrorStatus::IS_OFFLINE_REVOCATION,
            RevocationError::Revoked => ErrorStatus::IS_REVOKED,
        }
    }
}


//------------ verify_chain_revocation ---------------------------------------

/// Checks revocation for a freshly built chain as the flags request.
pub(crate) fn verify_chain_revocation(
    context: &mut ChainContext,
    time: DateTime<Utc>,
    params: &ChainParams,
    flags: BuildFlags,
    checker: &dyn RevocationChecker,
) {
    let count = if flags.intersects(BuildFlags::REVOCATION_CHECK_END_CERT) {
        1
    }
    else if flags.intersects(
        BuildFlags::REVOCATION_CHECK_CHAIN
        | BuildFlags::REVOCATION_CHECK_CHAIN_EXCLUDE_ROOT
    ) {
        let chains = context.chains();
        let mut count = 0;
        for (index, chain) in chains.iter().enumerate() {
            if index < chains.len() - 1
                || flags.intersects(BuildFlags::REVOCATION_CHECK_CHAIN)
            {
                count += chain.len();
            }
            else {
                count += chain.len() - 1;
            }
        }
        count
    }
    else {
        0
    };
    if count == 0 {
        return
    }

    let mut certs = Vec::with_capacity(count);
    'collect: for chain in context.chains() {
        for element in chain.elements() {
            if certs.len() == count {
                break 'collect
            }
            certs.push(element.cert().clone());
        }
    }

    let options = RevocationOptions {
        time,
        cache_only: flags.intersects(
            BuildFlags::REVOCATION_CHECK_CACHE_ONLY
        ),
        accumulative_timeout: flags.intersects(
            BuildFlags::REVOCATION_ACCUMULATIVE_TIMEOUT
        ),
        url_retrieval_timeout: params.url_retrieval_timeout,
        check_freshness_time: params.check_revocation_freshness_time,
        freshness_time: params.revocation_freshness_time,
    };
    if let Err(failure) = checker.check(&certs, &options) {
        debug!(
            "revocation check failed at index {}: {:?}",
            failure.index, failure.error
        );
        context.record_element_error(
            failure.index, failure.error.to_error_status()
        );
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;
    use crate::chain::SimpleChain;
    use crate::status::InfoStatus;
    use crate::store::Collection;
    use crate::test::CertBuilder;

    /// A checker that records what it was asked and fails as instructed.
    #[derive(Debug, Default)]
    struct RecordingChecker {
        asked: Mutex<Vec<usize>>,
        failure: Option<RevocationFailure>,
    }

    impl RevocationChecker for RecordingChecker {
        fn check(
            &self,
            certs: &[Arc<Cert>],
            _options: &RevocationOptions,
        ) -> Result<(), RevocationFailure> {
            self.asked.lock().unwrap().push(certs.len());
            match self.failure {
                Some(failure) => Err(failure),
                None => Ok(())
            }
        }
    }

    fn three_element_context() -> ChainContext {
        let leaf = CertBuilder::new("Leaf", "CA").build();
        let ca = CertBuilder::new("CA", "Root").build();
        let root = CertBuilder::new("Root", "Root").build();
        let mut chain = SimpleChain::new();
        chain.add_cert(leaf, InfoStatus::empty(), 7);
        chain.add_cert(ca, InfoStatus::HAS_NAME_MATCH_ISSUER, 7);
        chain.add_cert(root, InfoStatus::HAS_NAME_MATCH_ISSUER, 7);
        ChainContext::new(chain, Arc::new(Collection::new()))
    }

    fn run(
        context: &mut ChainContext,
        flags: BuildFlags,
        checker: &RecordingChecker,
    ) {
        verify_chain_revocation(
            context, Utc::now(), &ChainParams::default(), flags, checker
        );
    }

    #[test]
    fn end_cert_only() {
        let mut context = three_element_context();
        let checker = RecordingChecker::default();
        run(
            &mut context, BuildFlags::REVOCATION_CHECK_END_CERT, &checker
        );
        assert_eq!(*checker.asked.lock().unwrap(), vec![1]);
    }

    #[test]
    fn whole_chain_and_exclude_root() {
        let mut context = three_element_context();
        let checker = RecordingChecker::default();
        run(&mut context, BuildFlags::REVOCATION_CHECK_CHAIN, &checker);
        run(
            &mut context,
            BuildFlags::REVOCATION_CHECK_CHAIN_EXCLUDE_ROOT,
            &checker,
        );
        assert_eq!(*checker.asked.lock().unwrap(), vec![3, 2]);
    }

    #[test]
    fn no_flags_means_no_check() {
        let mut context = three_element_context();
        let checker = RecordingChecker::default();
        run(&mut context, BuildFlags::empty(), &checker);
        assert!(checker.asked.lock().unwrap().is_empty());
    }

    #[test]
    fn failure_lands_on_element_and_aggregates() {
        let mut context = three_element_context();
        let checker = RecordingChecker {
            asked: Mutex::default(),
            failure: Some(RevocationFailure {
                index: 1,
                error: RevocationError::Revoked,
            }),
        };
        run(&mut context, BuildFlags::REVOCATION_CHECK_CHAIN, &checker);

        let element = context.element_at(1).unwrap();
        assert!(
            element.status().errors.intersects(ErrorStatus::IS_REVOKED)
        );
        assert!(
            context.chains()[0].status().errors
                .intersects(ErrorStatus::IS_REVOKED)
        );
        assert!(
            context.status().errors.intersects(ErrorStatus::IS_REVOKED)
        );
    }

    #[test]
    fn unknown_status_mapping() {
        let mut context = three_element_context();
        let checker = RecordingChecker {
            asked: Mutex::default(),
            failure: Some(RevocationFailure {
                index: 0,
                error: RevocationError::Offline,
            }),
        };
        run(&mut context, BuildFlags::REVOCATION_CHECK_END_CERT, &checker);
        assert!(
            context.status().errors
                .intersects(ErrorStatus::IS_OFFLINE_REVOCATION)
        );

        assert_eq!(
            RevocationError::NoRevocationCheck.to_error_status(),
            ErrorStatus::REVOCATION_STATUS_UNKNOWN
        );
        assert_eq!(
            RevocationError::NotInDatabase.to_error_status(),
            ErrorStatus::REVOCATION_STATUS_UNKNOWN
        );
        assert_eq!(
            RevocationError::NoRevocationProvider.to_error_status(),
            ErrorStatus::REVOCATION_STATUS_UNKNOWN
        );
    }
}
