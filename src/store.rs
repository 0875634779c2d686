//! Certificate stores.
//!
//! Opening and maintaining real certificate stores is the business of an
//! embedding application. The engine only needs a narrow view: a store is
//! an ordered collection of certificates that can be enumerated from an
//! arbitrary position and searched by a handful of criteria. That view is
//! the [`CertStore`] trait.
//!
//! Two implementations ship with the crate: [`MemoryStore`], a simple
//! ordered in-memory store, and [`Collection`], a union view over other
//! stores that enumerates them in sequence. The engine builds its world
//! store as a collection over the system stores described by
//! [`SystemStores`] plus whatever the caller supplies.

use std::fmt;
use std::sync::Arc;
use bytes::Bytes;
use crate::cert::{Cert, ExtValue, Name};


//------------ CertStore -----------------------------------------------------

/// An ordered collection of certificates.
///
/// Enumeration order is defined by the store and must be stable: the engine
/// relies on repeated enumerations yielding certificates in the same order
/// to keep chain building deterministic and to restart searches behind a
/// previously found certificate.
pub trait CertStore: fmt::Debug + Send + Sync {
    /// Returns the number of certificates in the store.
    fn len(&self) -> usize;

    /// Returns the certificate at the given position.
    fn get(&self, index: usize) -> Option<Arc<Cert>>;

    /// Returns whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the first certificate at or behind `start` that matches.
    ///
    /// On success also returns the position behind the match, suitable for
    /// continuing the search.
    fn find_from(
        &self, criteria: &FindCriteria, start: usize
    ) -> Option<(Arc<Cert>, usize)> {
        let mut index = start;
        while let Some(cert) = self.get(index) {
            index += 1;
            if criteria.matches(&cert) {
                return Some((cert, index))
            }
        }
        None
    }

    /// Returns whether the store contains this exact certificate.
    fn contains(&self, cert: &Cert) -> bool {
        let mut index = 0;
        while let Some(candidate) = self.get(index) {
            if *candidate == *cert {
                return true
            }
            index += 1;
        }
        false
    }
}


//------------ FindCriteria --------------------------------------------------

/// The ways a certificate can be looked up in a store.
#[derive(Clone, Debug)]
pub enum FindCriteria {
    /// Match a certificate whose subject equals the given name.
    Subject(Name),

    /// Match a certificate identified by its issuer and serial number.
    IssuerSerial {
        issuer: Name,
        serial: Bytes,
    },

    /// Match a certificate whose subject key identifier equals the bytes.
    KeyId(Bytes),
}

impl FindCriteria {
    /// Returns whether the given certificate satisfies the criteria.
    pub fn matches(&self, cert: &Cert) -> bool {
        match self {
            FindCriteria::Subject(name) => cert.subject() == name,
            FindCriteria::IssuerSerial { issuer, serial } => {
                cert.issuer() == issuer && cert.serial_number() == serial
            }
            FindCriteria::KeyId(key_id) => {
                match cert.subject_key_identifier() {
                    ExtValue::Present(value) => value == key_id,
                    _ => false,
                }
            }
        }
    }
}


//------------ MemoryStore ---------------------------------------------------

/// An in-memory certificate store.
///
/// Certificates are enumerated in insertion order. The store is filled
/// before use and immutable afterwards, so it can be shared freely.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    certs: Vec<Arc<Cert>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Appends a certificate to the store.
    pub fn insert(&mut self, cert: Arc<Cert>) {
        self.certs.push(cert)
    }

    /// Creates a store over the given certificates.
    pub fn from_certs(
        certs: impl IntoIterator<Item = Arc<Cert>>
    ) -> Self {
        MemoryStore { certs: certs.into_iter().collect() }
    }
}

impl CertStore for MemoryStore {
    fn len(&self) -> usize {
        self.certs.len()
    }

    fn get(&self, index: usize) -> Option<Arc<Cert>> {
        self.certs.get(index).cloned()
    }
}


//------------ Collection ----------------------------------------------------

/// A union view over a sequence of stores.
///
/// The collection enumerates its member stores in the order they were
/// added, each in its own order. Members are shared, not copied, so a
/// collection is a cheap view.
#[derive(Clone, Debug, Default)]
pub struct Collection {
    stores: Vec<Arc<dyn CertStore>>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Collection::default()
    }

    /// Appends a store to the collection.
    pub fn push(&mut self, store: Arc<dyn CertStore>) {
        self.stores.push(store)
    }
}

impl CertStore for Collection {
    fn len(&self) -> usize {
        self.stores.iter().map(|store| store.len()).sum()
    }

    fn get(&self, index: usize) -> Option<Arc<Cert>> {
        let mut index = index;
        for store in &self.stores {
            let len = store.len();
            if index < len {
                return store.get(index)
            }
            index -= len;
        }
        None
    }
}


//------------ SystemStores --------------------------------------------------

/// The system stores an engine draws its world view from.
///
/// The names follow the classic store layout: `root` holds the trust
/// anchors, `ca` the known intermediates, `my` the locally installed
/// certificates, and `trust` further trusted certificates. An embedding
/// application populates these from wherever its platform keeps them. The
/// default value consists of four empty stores.
#[derive(Clone, Debug)]
pub struct SystemStores {
    /// The trust anchor store.
    pub root: Arc<dyn CertStore>,

    /// The intermediate CA store.
    pub ca: Arc<dyn CertStore>,

    /// The store of locally installed certificates.
    pub my: Arc<dyn CertStore>,

    /// The store of additionally trusted certificates.
    pub trust: Arc<dyn CertStore>,
}

impl Default for SystemStores {
    fn default() -> Self {
        SystemStores {
            root: Arc::new(MemoryStore::new()),
            ca: Arc::new(MemoryStore::new()),
            my: Arc::new(MemoryStore::new()),
            trust: Arc::new(MemoryStore::new()),
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::CertBuilder;

    #[test]
    fn memory_store_order_and_lookup() {
        let ca = CertBuilder::new("Test CA", "Test Root").build();
        let other = CertBuilder::new("Other CA", "Test Root").build();
        let store = MemoryStore::from_certs(vec![ca.clone(), other.clone()]);

        assert_eq!(store.len(), 2);
        assert!(store.contains(&ca));
        assert_eq!(store.get(0).unwrap().subject(), ca.subject());
        assert_eq!(store.get(1).unwrap().subject(), other.subject());
        assert!(store.get(2).is_none());

        let criteria = FindCriteria::Subject(other.subject().clone());
        let (found, next) = store.find_from(&criteria, 0).unwrap();
        assert_eq!(found.subject(), other.subject());
        assert!(store.find_from(&criteria, next).is_none());
    }

    #[test]
    fn issuer_serial_lookup() {
        let cert = CertBuilder::new("Sub", "Test CA").serial(17).build();
        let store = MemoryStore::from_certs(vec![cert.clone()]);

        let criteria = FindCriteria::IssuerSerial {
            issuer: cert.issuer().clone(),
            serial: cert.serial_number().clone(),
        };
        assert!(store.find_from(&criteria, 0).is_some());

        let criteria = FindCriteria::IssuerSerial {
            issuer: cert.issuer().clone(),
            serial: bytes::Bytes::from_static(&[99]),
        };
        assert!(store.find_from(&criteria, 0).is_none());
    }

    #[test]
    fn key_id_lookup() {
        let cert = CertBuilder::new("Sub", "Test CA")
            .subject_key_id(&[1, 2, 3])
            .build();
        let plain = CertBuilder::new("Plain", "Test CA").build();
        let store = MemoryStore::from_certs(vec![plain, cert]);

        let criteria = FindCriteria::KeyId(
            bytes::Bytes::from_static(&[1, 2, 3])
        );
        let (found, _) = store.find_from(&criteria, 0).unwrap();
        assert_eq!(found.subject().to_string(), "CN=Sub");
    }

    #[test]
    fn collection_enumerates_members_in_sequence() {
        let first = CertBuilder::new("First", "Test Root").build();
        let second = CertBuilder::new("Second", "Test Root").build();
        let third = CertBuilder::new("Third", "Test Root").build();

        let mut collection = Collection::new();
        collection.push(Arc::new(
            MemoryStore::from_certs(vec![first.clone(), second.clone()])
        ));
        collection.push(Arc::new(
            MemoryStore::from_certs(vec![third.clone()])
        ));

        assert_eq!(collection.len(), 3);
        assert_eq!(collection.get(0).unwrap().subject(), first.subject());
        assert_eq!(collection.get(2).unwrap().subject(), third.subject());
        assert!(collection.get(3).is_none());
        assert!(collection.contains(&third));
    }
}
