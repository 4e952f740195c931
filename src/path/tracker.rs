use crate::catalogue::{Totals, NUM_COMPONENTS};
use crate::path::PathVector;
use mpi::collective::UserOperation;
use mpi::traits::*;

/// Reserved tag for the path-vector exchange message, kept well away from the tag
/// space an application or the interception layer would plausibly use for its own
/// point-to-point traffic.
const PROPAGATE_TAG: i32 = 0x4372_7400;

/// Owns the single running critical-path vector for this rank and performs the
/// max-plus propagation that keeps it coherent with every other rank (spec §4.4,
/// §4.5).
#[derive(Debug, Clone, Copy)]
pub struct PathTracker {
    vector: PathVector,
    rank: i32,
}

impl PathTracker {
    pub fn new() -> Self {
        PathTracker { vector: PathVector::zero(), rank: 0 }
    }

    pub fn set_rank(&mut self, rank: i32) {
        self.rank = rank;
    }

    /// Zeros the path vector. Only called on the first iteration (spec §4.3); the
    /// vector is cumulative across subsequent iterations.
    pub fn reset(&mut self) {
        self.vector = PathVector::zero();
    }

    pub fn current(&self) -> PathVector {
        self.vector
    }

    /// Communicator-wide propagation: a vector allreduce with a MAXLOC-style
    /// operator over the 8 components (spec §4.5). Returns the totals delta this
    /// step absorbed into the path, for folding into a descriptor's `path_totals`.
    pub fn propagate_collective<C: Communicator>(&mut self, comm: &C, local_delta: Totals) -> Totals {
        let before = self.vector;
        let candidate = self.vector.extend_local(local_delta, self.rank);
        let flat_in = candidate.to_flat();
        let mut flat_out = [0.0f64; NUM_COMPONENTS * 2];

        comm.all_reduce_into(
            &flat_in,
            &mut flat_out,
            &UserOperation::commutative(|x, y| {
                let x: &[f64] = x.downcast().unwrap();
                let y: &mut [f64] = y.downcast_mut().unwrap();
                let mut lhs = [0.0f64; NUM_COMPONENTS * 2];
                lhs.copy_from_slice(x);
                let mut rhs = [0.0f64; NUM_COMPONENTS * 2];
                rhs.copy_from_slice(y);
                PathVector::merge_flat(&lhs, &mut rhs);
                y.copy_from_slice(&rhs);
            }),
        );

        self.vector = PathVector::from_flat(&flat_out);
        self.vector.delta_since(before)
    }

    /// Point-to-point propagation: a paired send/recv exchange with `partner`
    /// (spec §4.5). Deadlock-free ordering: the lower-ranked side sends first.
    pub fn propagate_point_to_point<C: Communicator>(
        &mut self,
        comm: &C,
        partner: i32,
        local_delta: Totals,
    ) -> Totals {
        let before = self.vector;
        let candidate = self.vector.extend_local(local_delta, self.rank);
        let mine = candidate.to_flat();
        let process = comm.process_at_rank(partner);

        let theirs: [f64; NUM_COMPONENTS * 2] = if self.rank < partner {
            process.send_with_tag(&mine, PROPAGATE_TAG);
            let (buf, _status) = process.receive_with_tag::<[f64; NUM_COMPONENTS * 2]>(PROPAGATE_TAG);
            buf
        } else {
            let (buf, _status) = process.receive_with_tag::<[f64; NUM_COMPONENTS * 2]>(PROPAGATE_TAG);
            process.send_with_tag(&mine, PROPAGATE_TAG);
            buf
        };

        self.vector = candidate.merge(PathVector::from_flat(&theirs));
        self.vector.delta_since(before)
    }

    /// `stop()`'s single global reduction that closes the iteration (spec §4.3/
    /// §4.5): identical to `propagate_collective` but always over `comm_world` and
    /// carrying no further local delta beyond `runtime` (the caller passes the
    /// already-computed runtime-only `Totals`).
    pub fn finalise<C: Communicator>(&mut self, comm_world: &C, runtime_delta: Totals) -> Totals {
        self.propagate_collective(comm_world, runtime_delta)
    }
}

impl Default for PathTracker {
    fn default() -> Self {
        Self::new()
    }
}
