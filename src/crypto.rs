//! Verifying certificate signatures.
//!
//! The engine treats signature verification as a collaborator behind the
//! [`SignatureVerifier`] trait so embedders can plug in whatever crypto
//! provider they must use. The crate ships [`RingVerifier`], a default
//! implementation on top of *ring* covering the common RSA PKCS#1 and
//! ECDSA signature algorithms.

use std::{error, fmt};
use bcder::Oid;
use ring::signature;
use crate::cert::SubjectPublicKeyInfo;
use crate::oid;


//------------ SignatureVerifier ---------------------------------------------

/// A provider that can verify certificate signatures.
pub trait SignatureVerifier: fmt::Debug + Send + Sync {
    /// Verifies a signature over a message.
    ///
    /// The key is the subject public key info of the issuer certificate,
    /// the algorithm is the signature algorithm identifier of the issued
    /// certificate, and the message is the raw to-be-signed portion of the
    /// issued certificate.
    fn verify(
        &self,
        issuer_key: &SubjectPublicKeyInfo,
        algorithm: &Oid,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError>;
}


//------------ RingVerifier --------------------------------------------------

/// The default signature verifier backed by *ring*.
///
/// Signature algorithms outside the supported set simply fail to verify;
/// the chain engine records that as an invalid signature rather than
/// failing the build.
#[derive(Clone, Copy, Debug, Default)]
pub struct RingVerifier;

impl RingVerifier {
    /// Returns the *ring* algorithm for a signature algorithm identifier.
    fn algorithm(
        id: &Oid
    ) -> Option<&'static dyn signature::VerificationAlgorithm> {
        if *id == oid::SHA256_WITH_RSA_ENCRYPTION {
            Some(&signature::RSA_PKCS1_2048_8192_SHA256)
        }
        else if *id == oid::SHA384_WITH_RSA_ENCRYPTION {
            Some(&signature::RSA_PKCS1_2048_8192_SHA384)
        }
        else if *id == oid::SHA512_WITH_RSA_ENCRYPTION {
            Some(&signature::RSA_PKCS1_2048_8192_SHA512)
        }
        else if *id == oid::ECDSA_WITH_SHA256 {
            Some(&signature::ECDSA_P256_SHA256_ASN1)
        }
        else if *id == oid::ECDSA_WITH_SHA384 {
            Some(&signature::ECDSA_P384_SHA384_ASN1)
        }
        else {
            None
        }
    }
}

impl SignatureVerifier for RingVerifier {
    fn verify(
        &self,
        issuer_key: &SubjectPublicKeyInfo,
        algorithm: &Oid,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError> {
        let algorithm = match Self::algorithm(algorithm) {
            Some(algorithm) => algorithm,
            None => return Err(SignatureError)
        };
        signature::UnparsedPublicKey::new(
            algorithm, issuer_key.public_key().as_ref()
        ).verify(message, signature).map_err(|_| SignatureError)
    }
}


//------------ SignatureError ------------------------------------------------

/// A signature failed to verify.
#[derive(Clone, Copy, Debug)]
pub struct SignatureError;

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("signature verification failed")
    }
}

impl error::Error for SignatureError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn unknown_algorithm_fails() {
        let key = SubjectPublicKeyInfo::new(
            Oid(Bytes::from_static(&[42, 134, 72, 134, 247, 13, 1, 1, 1])),
            Bytes::from_static(b"key"),
        );
        let unknown = Oid(Bytes::from_static(&[1, 2, 3]));
        assert!(
            RingVerifier.verify(&key, &unknown, b"message", b"sig").is_err()
        );
    }

    #[test]
    fn garbage_key_fails() {
        let key = SubjectPublicKeyInfo::new(
            Oid(Bytes::from_static(&[42, 134, 72, 134, 247, 13, 1, 1, 1])),
            Bytes::from_static(b"not a real key"),
        );
        let algorithm = Oid(
            Bytes::from_static(&[42, 134, 72, 134, 247, 13, 1, 1, 11])
        );
        assert!(
            RingVerifier.verify(&key, &algorithm, b"message", b"sig").is_err()
        );
    }
}
