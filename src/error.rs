//! Error taxonomy for the path-decomposition core (spec §7).
//!
//! The core never masks errors from the messaging layer; these variants describe
//! failures in the core's own bookkeeping, not in the underlying MPI calls it wraps.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `register()` was called with a request handle already present in the
    /// in-flight table. Indicates a bug in the interception layer (reuse of a
    /// handle without an intervening wait).
    #[error("duplicate in-flight request handle {0:?}")]
    DuplicateRequest(crate::request_table::RequestHandle),

    /// `take()`/`observe()`/a wait completion referenced a handle the table has
    /// never seen, or has already removed.
    #[error("unknown in-flight request handle {0:?}")]
    UnknownRequest(crate::request_table::RequestHandle),

    /// A cost function returned a non-finite latency or bandwidth term. The core
    /// substitutes 0.0 for the offending term and taints the descriptor for the
    /// current iteration.
    #[error("cost model for routine {0} returned a non-finite value")]
    CostModelDomain(&'static str),

    /// The synchronising probe (barrier) reported an error from the underlying
    /// primitive. Propagated unchanged; the caller decides how to react.
    #[error("synchronising probe failed: {0}")]
    ProbeFailed(String),

    /// An output stream write failed on the root. `viz` is disabled for the
    /// remainder of the run after this is raised once.
    #[error("stream I/O failure writing {path}: {source}")]
    StreamIoFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
