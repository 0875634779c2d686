//! Error types used by multiple modules.
//!
//! The engine reports conformance problems through status bits, not
//! errors. The types here cover the few conditions that fail an operation
//! outright: a chain build that cannot even start and an engine
//! configuration that cannot be accepted.

use std::{error, fmt};


//------------ BuildError ----------------------------------------------------

/// A chain build failed without producing a chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildError {
    /// The parameters of the build made no sense.
    InvalidArgument,

    /// The end entity carries no signature algorithm identifier.
    MissingSignatureAlgorithm,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::InvalidArgument => {
                f.write_str("invalid argument")
            }
            BuildError::MissingSignatureAlgorithm => {
                f.write_str(
                    "certificate carries no signature algorithm identifier"
                )
            }
        }
    }
}

impl error::Error for BuildError { }


//------------ EngineError ---------------------------------------------------

/// An engine could not be created.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineError {
    /// The restricted root store holds a certificate that is not a
    /// system-trusted root.
    UntrustedRestrictedRoot,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::UntrustedRestrictedRoot => {
                f.write_str(
                    "invalid argument: restricted root store contains a \
                     certificate missing from the system root store"
                )
            }
        }
    }
}

impl error::Error for EngineError { }
