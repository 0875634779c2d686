//! Engine configuration and per-build parameters.

use std::ops;
use std::sync::Arc;
use std::time::Duration;
use bcder::Oid;
use crate::crypto::SignatureVerifier;
use crate::revocation::RevocationChecker;
use crate::store::CertStore;


//------------ EngineConfig --------------------------------------------------

/// The configuration of a chain engine.
///
/// Start from the default value and adjust the fields that matter. The
/// configuration is consumed when creating an engine; the engine is
/// immutable afterwards.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    /// Engine behavior flags.
    ///
    /// Kept verbatim for callers that want to look at them later; the
    /// engine itself currently interprets none of them.
    pub flags: u32,

    /// A replacement trust anchor store.
    ///
    /// If set, this store is used instead of the system root store for
    /// deciding root trust. Every certificate in it must also be present
    /// in the system root store; engine creation fails otherwise.
    pub restricted_root: Option<Arc<dyn CertStore>>,

    /// Additional stores to consult when looking for issuers.
    pub additional_stores: Vec<Arc<dyn CertStore>>,

    /// How long a single remote retrieval may take.
    ///
    /// Forwarded to the revocation checker. `None` leaves the choice to
    /// the checker.
    pub url_retrieval_timeout: Option<Duration>,

    /// The maximum number of certificates kept cached during builds.
    ///
    /// Zero means no limit.
    pub maximum_cached_certificates: usize,

    /// The number of chain extensions between cycle checks.
    ///
    /// Zero selects the built-in default.
    pub cycle_detection_modulus: usize,

    /// The signature verification provider.
    ///
    /// `None` selects the built-in *ring* based verifier.
    pub signature_verifier: Option<Arc<dyn SignatureVerifier>>,

    /// The revocation checking provider.
    ///
    /// `None` selects a provider that reports every status as unknown.
    pub revocation_checker: Option<Arc<dyn RevocationChecker>>,
}


//------------ ChainParams ---------------------------------------------------

/// The per-build parameters of a chain build.
#[derive(Clone, Debug, Default)]
pub struct ChainParams {
    /// The usage the chain is requested for.
    pub requested_usage: Option<UsageMatch>,

    /// The issuance policy the chain is requested for.
    pub requested_issuance_policy: Option<UsageMatch>,

    /// How long a single remote retrieval may take for this build.
    pub url_retrieval_timeout: Option<Duration>,

    /// Whether the revocation checker should enforce freshness.
    pub check_revocation_freshness_time: bool,

    /// The largest acceptable age of revocation information.
    pub revocation_freshness_time: Option<Duration>,
}


//------------ UsageMatch ----------------------------------------------------

/// A requested set of usage identifiers.
#[derive(Clone, Debug)]
pub struct UsageMatch {
    /// Whether all or any of the identifiers have to be present.
    pub match_type: UsageMatchType,

    /// The usage identifiers.
    pub identifiers: Vec<Oid>,
}


//------------ UsageMatchType ------------------------------------------------

/// How the identifiers of a usage match combine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UsageMatchType {
    /// All identifiers have to be present.
    And,

    /// At least one identifier has to be present.
    Or,
}

impl Default for UsageMatchType {
    fn default() -> Self {
        UsageMatchType::And
    }
}


//------------ BuildFlags ----------------------------------------------------

/// Flags steering a single chain build.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BuildFlags(u32);

impl BuildFlags {
    /// Check revocation of the end entity only.
    pub const REVOCATION_CHECK_END_CERT: Self = BuildFlags(0x1000_0000);

    /// Check revocation of every certificate in the chain.
    pub const REVOCATION_CHECK_CHAIN: Self = BuildFlags(0x2000_0000);

    /// Check revocation of everything but the root.
    pub const REVOCATION_CHECK_CHAIN_EXCLUDE_ROOT: Self =
        BuildFlags(0x4000_0000);

    /// Answer revocation checks from cached data only.
    pub const REVOCATION_CHECK_CACHE_ONLY: Self = BuildFlags(0x8000_0000);

    /// Treat the retrieval timeout as a budget over all checked certs.
    pub const REVOCATION_ACCUMULATIVE_TIMEOUT: Self = BuildFlags(0x0800_0000);

    /// Keep the lower quality alternate chains on the returned context.
    pub const RETURN_LOWER_QUALITY_CONTEXTS: Self = BuildFlags(0x0000_0080);

    /// Returns the empty flag set.
    pub fn empty() -> Self {
        BuildFlags(0)
    }

    /// Returns whether any of the bits of `other` are set in `self`.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns the raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl ops::BitOr for BuildFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        BuildFlags(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for BuildFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}
