//! Critical-path decomposition profiler for MPI programs.
//!
//! `critter` answers "what is actually on the critical path of this run", not just
//! "how much communication work did every rank do". It tracks an 8-component
//! critical-path vector — bytes, communication time, idle time, two cost-model
//! estimates, computation time, overlap time, and wall-clock runtime — that is kept
//! coherent across ranks by a distributed max-plus (MAXLOC) reduction threaded
//! through every intercepted collective and point-to-point call.
//!
//! The crate is a library, not an interception layer: it assumes something else
//! (a `PMPI` shim, an explicit wrapper, or direct calls from an instrumented
//! application) calls [`dispatch::initiate`]/[`dispatch::complete`] and friends
//! around each real `mpi` call. See [`dispatch`] for the façade and `demos/` for a
//! worked example against the real `mpi` crate.
//!
//! ```text
//! critter::dispatch::allocate(&world)?;
//! critter::start(&world);
//! // ... application code, calling dispatch::initiate/complete around MPI ops ...
//! critter::stop(&world);
//! ```

pub mod catalogue;
pub mod clock;
pub mod config;
pub mod core_state;
pub mod dispatch;
pub mod error;
pub mod path;
pub mod region;
pub mod request_table;
pub mod session;
pub mod volumetric;

pub use catalogue::{RoutineId, Totals};
pub use dispatch::Mechanism;
pub use error::{Error, Result};
pub use request_table::RequestHandle;

use mpi::traits::Communicator;

/// One-time setup (design notes §9). Must be called once, after the host program
/// has initialised MPI and before the first [`start`].
pub fn allocate<C: Communicator>(comm: &C) -> Result<()> {
    dispatch::allocate(comm)
}

/// Begins a measured iteration (spec §4.3/§6).
pub fn start<C: Communicator>(comm: &C) {
    dispatch::start(comm)
}

/// Closes the current iteration: one global max-plus reduction, per-iteration
/// output if `CRITTER_VIZ` is set, and a reset of per-iteration state (spec
/// §4.3/§6).
pub fn stop<C: Communicator>(comm_world: &C) {
    dispatch::stop(comm_world)
}

/// Opens a named region on the active-region stack (spec §4.6/§6).
pub fn open_symbol(name: &str, now: f64) {
    dispatch::open_symbol(name, now)
}

/// Closes the innermost open region, folding its inclusive/exclusive totals into
/// the per-symbol table (spec §4.6/§6).
pub fn close_symbol(name: &str, now: f64) {
    dispatch::close_symbol(name, now)
}

/// Sum-reduces every routine's local totals across `comm`, independent of the
/// critical path (spec §4.7/§6).
pub fn collect<C: Communicator>(comm: &C) -> Vec<Totals> {
    dispatch::collect(comm)
}
