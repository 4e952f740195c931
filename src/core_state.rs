//! Global, process-wide core state (design notes §9: "Global mutable state...
//! must be init-once, destroy-once"). A single `Core` bundles the catalogue,
//! request table, path tracker, region stack and session; it is guarded by one
//! `Mutex` because a `static` must be `Sync` even though the SPMD execution model
//! (spec §5) never actually contends it from more than one thread at a time.

use crate::catalogue::Catalogue;
use crate::clock::ComputationTimer;
use crate::error::Result;
use crate::path::PathTracker;
use crate::region::RegionStack;
use crate::request_table::RequestTable;
use crate::session::Session;
use once_cell::sync::OnceCell;
use std::sync::{Mutex, MutexGuard};

pub struct Core {
    pub catalogue: Catalogue,
    pub requests: RequestTable,
    pub path: PathTracker,
    pub regions: RegionStack,
    pub session: Session,
    pub computation_timer: ComputationTimer,
    pub rank: i32,
}

impl Core {
    fn new(rank: i32, is_world_root: bool) -> Result<Self> {
        let mut path = PathTracker::new();
        path.set_rank(rank);
        Ok(Core {
            catalogue: Catalogue::new(),
            requests: RequestTable::new(),
            path,
            regions: RegionStack::new(),
            session: Session::init(is_world_root)?,
            computation_timer: ComputationTimer::new(),
            rank,
        })
    }
}

static CORE: OnceCell<Mutex<Core>> = OnceCell::new();

/// Construct-on-first-use guard against re-entry between `MPI_Init` and
/// `MPI_Finalize` (design notes §9). Must be called exactly once, after the
/// application has initialised MPI and determined its world rank.
pub fn allocate(rank: i32, is_world_root: bool) -> Result<()> {
    if CORE.get().is_some() {
        return Ok(());
    }
    let core = Core::new(rank, is_world_root)?;
    // `set` races are impossible under the SPMD single-thread-per-rank model this
    // crate assumes (spec §5); a second caller simply observes `Err` and no-ops.
    let _ = CORE.set(Mutex::new(core));
    Ok(())
}

pub fn is_allocated() -> bool {
    CORE.get().is_some()
}

pub fn lock() -> MutexGuard<'static, Core> {
    CORE.get()
        .expect("critter core used before allocate(); call critter::dispatch::allocate first")
        .lock()
        .expect("critter core mutex poisoned")
}

#[cfg(test)]
pub(crate) fn reset_for_test() {
    // Tests construct their own `Core` directly rather than going through the
    // global singleton, since each test wants an independent instance.
}
