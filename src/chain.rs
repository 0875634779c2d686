//! Chains of certificates.
//!
//! This module provides the data model the engine builds: a
//! [`ChainElement`] is one certificate with its own trust status, a
//! [`SimpleChain`] is an ordered sequence of elements from the end entity
//! up to a root or wherever building stopped, and a [`ChainContext`] is
//! what a build returns to the caller. A context can hold several simple
//! chains; the current builder only ever produces one, but everything
//! walking a context iterates over all of them.
//!
//! A context also carries the alternate chains that were built but ranked
//! below the primary one. They are kept as shared contexts of their own so
//! a caller can inspect the roads not taken.

use std::sync::Arc;
use crate::cert::Cert;
use crate::status::{ErrorStatus, InfoStatus, TrustStatus};
use crate::store::Collection;


//------------ ChainElement --------------------------------------------------

/// One certificate within a simple chain.
#[derive(Clone, Debug)]
pub struct ChainElement {
    /// The certificate itself.
    cert: Arc<Cert>,

    /// The trust status of this certificate within this chain.
    status: TrustStatus,
}

impl ChainElement {
    /// Creates an element with a clean status.
    fn new(cert: Arc<Cert>) -> Self {
        ChainElement { cert, status: TrustStatus::empty() }
    }

    /// Returns the certificate.
    pub fn cert(&self) -> &Arc<Cert> {
        &self.cert
    }

    /// Returns the trust status.
    pub fn status(&self) -> TrustStatus {
        self.status
    }

    /// Returns a mutable reference to the trust status.
    pub(crate) fn status_mut(&mut self) -> &mut TrustStatus {
        &mut self.status
    }
}


//------------ SimpleChain ---------------------------------------------------

/// An ordered certificate chain.
///
/// Element zero is the end entity. Each following element was found as a
/// candidate issuer of its predecessor. In a complete chain the last
/// element is self-signed; otherwise the aggregate status says why the
/// chain ends early.
#[derive(Clone, Debug, Default)]
pub struct SimpleChain {
    /// The elements from end entity to root.
    elements: Vec<ChainElement>,

    /// The aggregate trust status over all elements.
    status: TrustStatus,
}

impl SimpleChain {
    /// Creates an empty chain.
    pub(crate) fn new() -> Self {
        SimpleChain::default()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns whether the chain has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the elements from end entity to root.
    pub fn elements(&self) -> &[ChainElement] {
        &self.elements
    }

    /// Returns the aggregate trust status.
    pub fn status(&self) -> TrustStatus {
        self.status
    }

    /// Returns the element at the given position.
    pub fn element(&self, index: usize) -> Option<&ChainElement> {
        self.elements.get(index)
    }

    /// Returns a mutable reference to the element at the given position.
    pub(crate) fn element_mut(
        &mut self, index: usize
    ) -> Option<&mut ChainElement> {
        self.elements.get_mut(index)
    }

    /// Returns a mutable reference to the aggregate status.
    pub(crate) fn status_mut(&mut self) -> &mut TrustStatus {
        &mut self.status
    }

    /// Merges the status of the element at `index` into the aggregate.
    pub(crate) fn combine_element_status(&mut self, index: usize) {
        if let Some(element) = self.elements.get(index) {
            let status = element.status;
            self.status.combine(status);
        }
    }

    /// Appends a certificate to the chain.
    ///
    /// The info status describing how the certificate was found replaces
    /// the info status of the previous last element, i.e., of the subject
    /// the certificate issued. Every `cycle_modulus` additions the chain is
    /// checked for cycles and truncated if one is found.
    pub(crate) fn add_cert(
        &mut self,
        cert: Arc<Cert>,
        subject_info: InfoStatus,
        cycle_modulus: usize,
    ) {
        self.elements.push(ChainElement::new(cert));
        let len = self.elements.len();
        if len > 1 {
            self.elements[len - 2].status.info = subject_info;
        }
        if cycle_modulus != 0 && len % cycle_modulus == 0 {
            self.check_for_cycles();
        }
        self.combine_element_status(self.elements.len() - 1);
    }

    /// Looks for duplicated certificates and truncates at the repeat.
    ///
    /// Certificates are compared by the bytes of their to-be-signed
    /// portion. The second occurrence is flagged as cyclic and everything
    /// behind it is dropped.
    pub(crate) fn check_for_cycles(&mut self) {
        let mut cyclic_index = 0;
        for i in 0..self.elements.len() {
            if cyclic_index != 0 {
                break
            }
            for j in i + 1..self.elements.len() {
                if self.elements[i].cert.tbs_matches(&self.elements[j].cert) {
                    cyclic_index = j;
                    break
                }
            }
        }
        if cyclic_index != 0 {
            self.elements[cyclic_index].status.errors |=
                ErrorStatus::IS_CYCLIC | ErrorStatus::INVALID_BASIC_CONSTRAINTS;
            self.elements.truncate(cyclic_index + 1);
            self.combine_element_status(cyclic_index);
        }
    }

    /// Returns whether the chain has been found to be cyclic.
    pub fn is_cyclic(&self) -> bool {
        self.elements.last().map_or(false, |element| {
            element.status.errors.intersects(ErrorStatus::IS_CYCLIC)
        })
    }

    /// Returns a copy of the chain up to and including the given element.
    ///
    /// The copied elements start over with a clean status since the copy
    /// will be rebuilt and revalidated.
    pub(crate) fn copy_to_element(&self, index: usize) -> SimpleChain {
        let mut copy = SimpleChain::new();
        for element in &self.elements[..=index] {
            copy.elements.push(ChainElement::new(element.cert.clone()));
        }
        copy
    }
}


//------------ ChainContext --------------------------------------------------

/// The result of building a chain for a certificate.
///
/// Contexts are shared via `Arc`: duplicating one is a reference count
/// increment. A context keeps the world store view it was built against
/// alive for its own lifetime.
#[derive(Clone, Debug)]
pub struct ChainContext {
    /// The simple chains, currently always exactly one.
    chains: Vec<SimpleChain>,

    /// The aggregate status over all chains.
    status: TrustStatus,

    /// Alternate chains that ranked below this one.
    lower_quality: Vec<Arc<ChainContext>>,

    /// The store view used while building.
    world: Arc<Collection>,
}

/// The quality mask bit awarded for valid signatures.
const QUALITY_SIGNATURE_VALID: u32 = 0x16;

/// The quality bit awarded for time validity.
const QUALITY_TIME_VALID: u32 = 8;

/// The quality bit awarded for a complete chain.
const QUALITY_COMPLETE_CHAIN: u32 = 4;

/// The quality bit awarded for valid basic constraints.
const QUALITY_BASIC_CONSTRAINTS: u32 = 2;

/// The quality bit awarded for a trusted root.
const QUALITY_TRUSTED_ROOT: u32 = 1;

/// The quality of a chain without any faults.
const QUALITY_HIGHEST: u32 =
    QUALITY_SIGNATURE_VALID | QUALITY_TIME_VALID | QUALITY_COMPLETE_CHAIN
    | QUALITY_BASIC_CONSTRAINTS | QUALITY_TRUSTED_ROOT;

impl ChainContext {
    /// Creates a context over a single simple chain.
    pub(crate) fn new(chain: SimpleChain, world: Arc<Collection>) -> Self {
        let status = chain.status();
        ChainContext {
            chains: vec![chain],
            status,
            lower_quality: Vec::new(),
            world,
        }
    }

    /// Returns the simple chains of the context.
    pub fn chains(&self) -> &[SimpleChain] {
        &self.chains
    }

    /// Returns the aggregate trust status over all chains.
    pub fn status(&self) -> TrustStatus {
        self.status
    }

    /// Returns the alternate chains that ranked below this one.
    pub fn lower_quality(&self) -> &[Arc<ChainContext>] {
        &self.lower_quality
    }

    /// Returns the store view the context was built against.
    pub(crate) fn world(&self) -> &Arc<Collection> {
        &self.world
    }

    /// Returns a mutable reference to the aggregate status.
    pub(crate) fn status_mut(&mut self) -> &mut TrustStatus {
        &mut self.status
    }

    /// Returns a mutable reference to the chain at the given position.
    pub(crate) fn chain_mut(
        &mut self, index: usize
    ) -> Option<&mut SimpleChain> {
        self.chains.get_mut(index)
    }

    /// Installs the lower quality alternates.
    pub(crate) fn set_lower_quality(
        &mut self, alternates: Vec<Arc<ChainContext>>
    ) {
        self.lower_quality = alternates;
    }

    /// Returns the total number of elements across all chains.
    pub fn total_elements(&self) -> usize {
        self.chains.iter().map(|chain| chain.len()).sum()
    }

    /// Returns the element at the given flat position.
    ///
    /// Elements are counted across all simple chains in order.
    pub fn element_at(&self, index: usize) -> Option<&ChainElement> {
        let mut index = index;
        for chain in &self.chains {
            if index < chain.len() {
                return chain.element(index)
            }
            index -= chain.len();
        }
        None
    }

    /// Records an error against the element at the given flat position.
    ///
    /// The error is set on the element, on the aggregate status of its
    /// chain, and on the aggregate status of the context. An out-of-range
    /// position still taints the context aggregate.
    pub(crate) fn record_element_error(
        &mut self, index: usize, error: ErrorStatus
    ) {
        let mut index = index;
        for chain in &mut self.chains {
            if index < chain.len() {
                if let Some(element) = chain.element_mut(index) {
                    element.status_mut().errors |= error;
                }
                chain.status_mut().errors |= error;
                break
            }
            index -= chain.len();
        }
        self.status.errors |= error;
    }

    /// Returns the position of the first element carrying the given error.
    ///
    /// The position is a pair of chain index and element index.
    pub fn find_element_with_error(
        &self, error: ErrorStatus
    ) -> Option<(usize, usize)> {
        for (chain_index, chain) in self.chains.iter().enumerate() {
            for (element_index, element) in
                chain.elements().iter().enumerate()
            {
                if element.status().errors.intersects(error) {
                    return Some((chain_index, element_index))
                }
            }
        }
        None
    }

    /// Returns the quality score of the context.
    ///
    /// The score starts from a full mask and loses a component for each
    /// class of error present in the aggregate status. Higher is better.
    pub fn quality(&self) -> u32 {
        let mut quality = QUALITY_HIGHEST;
        let errors = self.status.errors;
        if errors.intersects(ErrorStatus::IS_UNTRUSTED_ROOT) {
            quality &= !QUALITY_TRUSTED_ROOT;
        }
        if errors.intersects(ErrorStatus::INVALID_BASIC_CONSTRAINTS) {
            quality &= !QUALITY_BASIC_CONSTRAINTS;
        }
        if errors.intersects(ErrorStatus::IS_PARTIAL_CHAIN) {
            quality &= !QUALITY_COMPLETE_CHAIN;
        }
        if errors.intersects(
            ErrorStatus::IS_NOT_TIME_VALID | ErrorStatus::IS_NOT_TIME_NESTED
        ) {
            quality &= !QUALITY_TIME_VALID;
        }
        if errors.intersects(ErrorStatus::IS_NOT_SIGNATURE_VALID) {
            quality &= !QUALITY_SIGNATURE_VALID;
        }
        quality
    }

    /// Returns a copy of the context cut off after the given element.
    ///
    /// Chains before `chain_index` are copied whole, the chain at
    /// `chain_index` up to and including `element_index`, everything
    /// behind is left out. All copied statuses start over clean.
    pub(crate) fn copy_to_element(
        &self, chain_index: usize, element_index: usize
    ) -> ChainContext {
        let mut chains = Vec::with_capacity(chain_index + 1);
        for chain in &self.chains[..chain_index] {
            chains.push(chain.copy_to_element(chain.len() - 1));
        }
        chains.push(
            self.chains[chain_index].copy_to_element(element_index)
        );
        ChainContext {
            chains,
            status: TrustStatus::empty(),
            lower_quality: Vec::new(),
            world: self.world.clone(),
        }
    }
}


//============ Tests =========================================================
