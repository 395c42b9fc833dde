use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for the CTR container toolkit: parsing, crypto, verification,
/// repackaging and installation all funnel their failures through this enum so
/// callers can match on the *kind* of failure rather than a string.
#[derive(Error, Debug)]
pub enum NintendoCtrError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    BinRw(#[from] binrw::Error),

    #[error("Could not find the title file in the specified path: {0}")]
    NoTitleFileFound(PathBuf),

    #[error("Could not find at least one TMD file in the specified path: {0}")]
    NoTmdFileFound(PathBuf),

    /// A container failed structural validation: bad magic, a size field that
    /// disagrees with the surrounding structure, an offset outside the file,
    /// or a monotonicity check on a table of offsets.
    #[error("invalid {kind} format: {reason}")]
    InvalidFormat { kind: &'static str, reason: String },

    /// A computed hash (content SHA-256, IVFC level hash, ExeFS hash) did not
    /// match the hash recorded in the container, or a decrypt produced data
    /// that doesn't parse as the container it claims to be.
    #[error("crypto/hash mismatch in {context}: expected {expected}, got {actual}")]
    CryptoMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// A resource the operation needs (a key slot, a seed, a ticket, a
    /// sibling content file) could not be located.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// Propagated low-level I/O failure with added context; kept distinct
    /// from `IoError` so call sites can attach what they were doing when it
    /// happened without losing the `#[from]` conversion for the common case.
    #[error("I/O failure during {context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The user (or the configured `InteractionStrategy`) declined to
    /// continue an operation that required confirmation.
    #[error("operation cancelled by user")]
    UserCancel,

    /// An operation was refused by policy rather than by the user directly
    /// (e.g. installing a non-legit title in "legit-only" mode, or writing
    /// to a reserved title-ID range).
    #[error("refused by policy: {0}")]
    PolicyRefusal(String),

    #[error("unsupported or unrecognized container kind for {0}")]
    UnknownContainerKind(PathBuf),
}

pub type NintendoCtrResult<T> = Result<T, NintendoCtrError>;

// Retained for source compatibility with the pre-existing CDN-to-CIA path.
pub type NintendoCTRError = NintendoCtrError;
pub type NintendoCTRResult<T> = NintendoCtrResult<T>;
