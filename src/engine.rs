//! The chain engine.
//!
//! An [`Engine`] bundles everything chain building needs to know: the
//! trust anchor store, the world store used for issuer lookup, the tunable
//! knobs, and the signature and revocation collaborators. Engines are
//! created from an [`EngineConfig`], immutable afterwards, and shared via
//! `Arc`.
//!
//! The central entry point is [`build_chain`]: it assembles a simple chain
//! for an end entity by repeated issuer lookup, runs the conformance
//! checks over it, explores alternate chains through other issuers, keeps
//! the best one, and finally drives revocation checking.
//!
//! [`build_chain`]: Engine::build_chain

use std::mem;
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use log::debug;
use once_cell::sync::OnceCell;
use crate::cert::Cert;
use crate::chain::{ChainContext, SimpleChain};
use crate::config::{BuildFlags, ChainParams, EngineConfig};
use crate::crypto::{RingVerifier, SignatureVerifier};
use crate::error::{BuildError, EngineError};
use crate::issuer::IssuerFinder;
use crate::revocation::{self, NoRevocation, RevocationChecker};
use crate::status::{ErrorStatus, InfoStatus};
use crate::store::{CertStore, Collection, SystemStores};
use crate::validation;


//------------ Configuration -------------------------------------------------

/// The number of chain extensions between cycle checks if not configured.
const DEFAULT_CYCLE_MODULUS: usize = 7;

/// The process-wide default engine.
static DEFAULT_ENGINE: OnceCell<Arc<Engine>> = OnceCell::new();


//------------ Engine --------------------------------------------------------

/// The mechanism to build and validate certificate chains.
///
/// An engine is created via [`Engine::new`] from a configuration and the
/// system stores of the embedding application. Once created it can serve
/// any number of [`build_chain`][Self::build_chain] calls, also
/// concurrently: all its state is read-only.
#[derive(Debug)]
pub struct Engine {
    /// The trust anchor store.
    root: Arc<dyn CertStore>,

    /// The store view used to find issuers.
    world: Arc<Collection>,

    /// Engine behavior flags, kept for the caller.
    flags: u32,

    /// How long a single remote retrieval may take.
    url_retrieval_timeout: Option<Duration>,

    /// The maximum number of certificates cached during builds.
    maximum_cached_certificates: usize,

    /// The number of chain extensions between cycle checks.
    cycle_modulus: usize,

    /// The signature verification collaborator.
    verifier: Arc<dyn SignatureVerifier>,

    /// The revocation checking collaborator.
    revocation: Arc<dyn RevocationChecker>,
}

impl Engine {
    /// Creates an engine from a configuration and the system stores.
    ///
    /// If the configuration carries a restricted root store, every
    /// certificate in it has to be present in the system root store as
    /// well. A configuration violating that is refused.
    pub fn new(
        config: EngineConfig, system: &SystemStores
    ) -> Result<Arc<Self>, EngineError> {
        if let Some(restricted) = config.restricted_root.as_ref() {
            Self::check_restricted_root(restricted.as_ref(), &system.root)?;
        }
        let root = match config.restricted_root {
            Some(restricted) => restricted,
            None => system.root.clone(),
        };
        let mut world = Collection::new();
        world.push(root.clone());
        world.push(system.ca.clone());
        world.push(system.my.clone());
        world.push(system.trust.clone());
        for store in config.additional_stores {
            world.push(store);
        }
        Ok(Arc::new(Engine {
            root,
            world: Arc::new(world),
            flags: config.flags,
            url_retrieval_timeout: config.url_retrieval_timeout,
            maximum_cached_certificates: config.maximum_cached_certificates,
            cycle_modulus: match config.cycle_detection_modulus {
                0 => DEFAULT_CYCLE_MODULUS,
                modulus => modulus,
            },
            verifier: match config.signature_verifier {
                Some(verifier) => verifier,
                None => Arc::new(RingVerifier),
            },
            revocation: match config.revocation_checker {
                Some(checker) => checker,
                None => Arc::new(NoRevocation),
            },
        }))
    }

    /// Checks that a restricted root store only holds trusted roots.
    fn check_restricted_root(
        restricted: &dyn CertStore, system_root: &Arc<dyn CertStore>
    ) -> Result<(), EngineError> {
        let mut index = 0;
        while let Some(cert) = restricted.get(index) {
            if !system_root.contains(&cert) {
                return Err(EngineError::UntrustedRestrictedRoot)
            }
            index += 1;
        }
        Ok(())
    }

    /// Returns the process-wide default engine.
    ///
    /// The default engine is created on first use with the default
    /// configuration over empty system stores. Losing initializers drop
    /// their throwaway engine.
    pub fn default_engine() -> Arc<Engine> {
        DEFAULT_ENGINE.get_or_init(|| {
            Engine::new(
                EngineConfig::default(), &SystemStores::default()
            ).expect("default engine configuration is unrestricted")
        }).clone()
    }

    /// Returns the trust anchor store.
    pub fn root_store(&self) -> &Arc<dyn CertStore> {
        &self.root
    }

    /// Returns the world store view.
    pub fn world_store(&self) -> &Arc<Collection> {
        &self.world
    }

    /// Returns the engine behavior flags.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Returns the remote retrieval timeout.
    pub fn url_retrieval_timeout(&self) -> Option<Duration> {
        self.url_retrieval_timeout
    }

    /// Returns the build-time certificate cache limit.
    pub fn maximum_cached_certificates(&self) -> usize {
        self.maximum_cached_certificates
    }

    /// Returns the number of chain extensions between cycle checks.
    pub fn cycle_modulus(&self) -> usize {
        self.cycle_modulus
    }

    /// Returns the signature verification collaborator.
    pub(crate) fn verifier(&self) -> &dyn SignatureVerifier {
        self.verifier.as_ref()
    }

    /// Builds the chain for an end entity certificate.
    ///
    /// The chain is built at the given verification time, defaulting to
    /// now. An additional store is consulted for issuers on top of the
    /// engine's world view. The build succeeds as long as any chain can
    /// be produced; everything found wrong with it is reported through
    /// the status bits of the returned context.
    pub fn build_chain(
        &self,
        cert: Arc<Cert>,
        time: Option<DateTime<Utc>>,
        additional_store: Option<Arc<dyn CertStore>>,
        params: &ChainParams,
        flags: BuildFlags,
    ) -> Result<Arc<ChainContext>, BuildError> {
        if cert.signature_algorithm().is_none() {
            return Err(BuildError::MissingSignatureAlgorithm)
        }
        let time = time.unwrap_or_else(Utc::now);

        let mut world = Collection::new();
        world.push(self.world.clone());
        if let Some(store) = additional_store {
            world.push(store);
        }
        let world = Arc::new(world);

        let mut context = self.build_candidate_chain(
            cert, time, world
        );

        // Alternates are explored from the most recently added one so
        // every round starts where the previous round stopped.
        let mut alternates: Vec<ChainContext> = Vec::new();
        loop {
            let alternate = {
                let source = alternates.last().unwrap_or(&context);
                self.build_alternate_chain(source, time)
            };
            match alternate {
                Some(alternate) => alternates.push(alternate),
                None => break,
            }
        }

        // Let the best chain win. A better alternate takes over and the
        // former primary takes its slot among the alternates.
        for slot in alternates.iter_mut() {
            if slot.quality() > context.quality() {
                mem::swap(&mut context, slot);
            }
        }
        if flags.intersects(BuildFlags::RETURN_LOWER_QUALITY_CONTEXTS) {
            context.set_lower_quality(
                alternates.into_iter().map(Arc::new).collect()
            );
        }

        revocation::verify_chain_revocation(
            &mut context, time, params, flags, self.revocation.as_ref()
        );
        Ok(Arc::new(context))
    }

    /// Builds and validates the first candidate chain for a certificate.
    fn build_candidate_chain(
        &self,
        cert: Arc<Cert>,
        time: DateTime<Utc>,
        world: Arc<Collection>,
    ) -> ChainContext {
        let mut chain = SimpleChain::new();
        chain.add_cert(cert, InfoStatus::empty(), self.cycle_modulus);
        self.build_simple_chain(&mut chain, &world);
        validation::check_simple_chain(self, &mut chain, time);
        ChainContext::new(chain, world)
    }

    /// Extends a simple chain by issuer lookup until it terminates.
    ///
    /// Building stops at a self-signed certificate, at a detected cycle,
    /// or when no issuer can be found, in which case the chain is marked
    /// as partial.
    fn build_simple_chain(
        &self, chain: &mut SimpleChain, world: &Collection
    ) {
        loop {
            let last = match chain.elements().last() {
                Some(element) => element.cert().clone(),
                None => return
            };
            if chain.is_cyclic() || last.is_self_signed() {
                break
            }
            let mut finder = IssuerFinder::new(world, &last);
            match finder.next() {
                Some(issuer) => {
                    debug!(
                        "extending chain below {} with {}",
                        last.subject(), issuer.subject()
                    );
                    chain.add_cert(
                        issuer, finder.info_status(), self.cycle_modulus
                    );
                }
                None => {
                    debug!(
                        "no issuer for {}, chain stays partial",
                        last.subject()
                    );
                    chain.status_mut().errors |=
                        ErrorStatus::IS_PARTIAL_CHAIN;
                    break
                }
            }
        }
    }

    /// Builds one alternate chain branching off the given context.
    ///
    /// The chains of the context are scanned for the first position whose
    /// issuer search yields another candidate behind the issuer already
    /// in use. The context is copied up to that position, extended with
    /// the alternate issuer, completed, and validated. Returns `None` if
    /// no position has another issuer to offer.
    fn build_alternate_chain(
        &self, context: &ChainContext, time: DateTime<Utc>
    ) -> Option<ChainContext> {
        if context.chains().len() <= 1
            && context.chains()[0].len() <= 1
        {
            return None
        }
        let mut found = None;
        'scan: for (chain_index, chain) in
            context.chains().iter().enumerate()
        {
            for element_index in 0..chain.len().saturating_sub(1) {
                let subject = chain.element(element_index)?.cert();
                let current = chain.element(element_index + 1)?.cert();
                let mut finder = IssuerFinder::new(
                    context.world().as_ref(), subject
                );
                finder.skip_past(current);
                if let Some(issuer) = finder.next() {
                    found = Some((
                        chain_index, element_index, issuer,
                        finder.info_status(),
                    ));
                    break 'scan
                }
            }
        }
        let (chain_index, element_index, issuer, info) = found?;
        debug!(
            "building alternate chain through {} at element {}",
            issuer.subject(), element_index
        );

        let mut alternate = context.copy_to_element(
            chain_index, element_index
        );
        let world = alternate.world().clone();
        {
            let chain = alternate.chain_mut(chain_index)?;
            chain.add_cert(issuer, info, self.cycle_modulus);
            self.build_simple_chain(chain, &world);
            validation::check_simple_chain(self, chain, time);
        }
        let status = alternate.chains()[chain_index].status();
        alternate.status_mut().combine(status);
        Some(alternate)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test::{engine_with, CertBuilder, StubVerifier};

    #[test]
    fn cycle_modulus_default_applies() {
        let engine = Engine::new(
            EngineConfig::default(), &SystemStores::default()
        ).unwrap();
        assert_eq!(engine.cycle_modulus(), DEFAULT_CYCLE_MODULUS);

        let engine = Engine::new(
            EngineConfig {
                cycle_detection_modulus: 3,
                ..Default::default()
            },
            &SystemStores::default(),
        ).unwrap();
        assert_eq!(engine.cycle_modulus(), 3);
    }

    #[test]
    fn restricted_root_must_be_system_trusted() {
        let root = CertBuilder::new("Root", "Root").build();
        let stray = CertBuilder::new("Stray", "Stray").build();

        let system = SystemStores {
            root: Arc::new(MemoryStore::from_certs(vec![root.clone()])),
            ..Default::default()
        };

        let config = EngineConfig {
            restricted_root: Some(Arc::new(
                MemoryStore::from_certs(vec![root.clone()])
            )),
            signature_verifier: Some(Arc::new(StubVerifier)),
            ..Default::default()
        };
        assert!(Engine::new(config, &system).is_ok());

        let config = EngineConfig {
            restricted_root: Some(Arc::new(
                MemoryStore::from_certs(vec![root, stray])
            )),
            ..Default::default()
        };
        assert_eq!(
            Engine::new(config, &system).unwrap_err(),
            EngineError::UntrustedRestrictedRoot
        );
    }

    #[test]
    fn missing_signature_algorithm_fails_build() {
        let engine = engine_with(&[], &[]);
        let cert = CertBuilder::new("Leaf", "CA")
            .no_signature_algorithm()
            .build();
        assert_eq!(
            engine.build_chain(
                cert, None, None, &ChainParams::default(),
                BuildFlags::empty(),
            ).unwrap_err(),
            BuildError::MissingSignatureAlgorithm
        );
    }

    #[test]
    fn default_engine_is_shared() {
        let first = Engine::default_engine();
        let second = Engine::default_engine();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
