use thiserror::Error;

/// Error taxonomy emitted to callers at the public-API boundary (spec §6,
/// §7). Internal recursion never fails on a logical condition; every
/// variant here is raised only where a precondition on caller input is
/// violated, or where the manager could not service a node-table request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DdError {
    /// A precondition on the arguments was violated: a variable out of
    /// range, a negative cardinality bound, division by the empty ZDD, and
    /// so on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operands (or a handle and the manager it was asked to act in)
    /// belong to different managers.
    #[error("incompatible manager: {0}")]
    IncompatibleManager(String),

    /// The unique table could not service a node-creation request after
    /// running GC and attempting to resize.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Reserved for I/O collaborators; the core itself never returns this.
    #[error("I/O error: {0}")]
    Io(String),
}

pub type DdResult<T> = Result<T, DdError>;
