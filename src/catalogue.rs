//! Routine catalogue (spec §4.1): one descriptor per intercepted routine, its cost
//! function, and its local/critical-path accumulators.

use std::fmt;

/// Number of routines the catalogue knows about.
pub const NUM_ROUTINES: usize = 19;

/// Identity of an intercepted routine. The discriminant is the stable `tag` spec §3
/// requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RoutineId {
    Barrier = 0,
    Broadcast = 1,
    Reduce = 2,
    AllReduce = 3,
    Gather = 4,
    Gatherv = 5,
    AllGather = 6,
    AllGatherv = 7,
    Scatter = 8,
    Scatterv = 9,
    ReduceScatter = 10,
    AllToAll = 11,
    AllToAllv = 12,
    Send = 13,
    Recv = 14,
    Isend = 15,
    Irecv = 16,
    SendRecv = 17,
    SendRecvReplace = 18,
}

impl RoutineId {
    pub const ALL: [RoutineId; NUM_ROUTINES] = [
        RoutineId::Barrier,
        RoutineId::Broadcast,
        RoutineId::Reduce,
        RoutineId::AllReduce,
        RoutineId::Gather,
        RoutineId::Gatherv,
        RoutineId::AllGather,
        RoutineId::AllGatherv,
        RoutineId::Scatter,
        RoutineId::Scatterv,
        RoutineId::ReduceScatter,
        RoutineId::AllToAll,
        RoutineId::AllToAllv,
        RoutineId::Send,
        RoutineId::Recv,
        RoutineId::Isend,
        RoutineId::Irecv,
        RoutineId::SendRecv,
        RoutineId::SendRecvReplace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RoutineId::Barrier => "barrier",
            RoutineId::Broadcast => "broadcast",
            RoutineId::Reduce => "reduce",
            RoutineId::AllReduce => "all_reduce",
            RoutineId::Gather => "gather",
            RoutineId::Gatherv => "gatherv",
            RoutineId::AllGather => "all_gather",
            RoutineId::AllGatherv => "all_gatherv",
            RoutineId::Scatter => "scatter",
            RoutineId::Scatterv => "scatterv",
            RoutineId::ReduceScatter => "reduce_scatter",
            RoutineId::AllToAll => "all_to_all",
            RoutineId::AllToAllv => "all_to_allv",
            RoutineId::Send => "send",
            RoutineId::Recv => "recv",
            RoutineId::Isend => "isend",
            RoutineId::Irecv => "irecv",
            RoutineId::SendRecv => "send_recv",
            RoutineId::SendRecvReplace => "send_recv_replace",
        }
    }

    pub fn tag(self) -> i32 {
        self as i32
    }

    fn index(self) -> usize {
        self as i32 as usize
    }

    /// Whether this routine is non-blocking (split initiate/complete across a wait).
    pub fn is_nonblocking(self) -> bool {
        matches!(self, RoutineId::Isend | RoutineId::Irecv)
    }

    /// Whether this routine is point-to-point (vs. communicator-wide).
    pub fn is_point_to_point(self) -> bool {
        matches!(
            self,
            RoutineId::Send
                | RoutineId::Recv
                | RoutineId::Isend
                | RoutineId::Irecv
                | RoutineId::SendRecv
                | RoutineId::SendRecvReplace
        )
    }

    /// Whether this routine exchanges with two distinct partners in one call
    /// (`send_recv`/`send_recv_replace`: a destination and a source that may
    /// differ), vs. the single `partner1` every other point-to-point routine uses.
    pub fn is_dual_partner(self) -> bool {
        matches!(self, RoutineId::SendRecv | RoutineId::SendRecvReplace)
    }

    fn cost_fn(self) -> CostFn {
        match self {
            RoutineId::Broadcast | RoutineId::Reduce | RoutineId::AllReduce => tree_cost,
            RoutineId::AllGather | RoutineId::AllGatherv | RoutineId::ReduceScatter => {
                ring_cost
            }
            RoutineId::AllToAll | RoutineId::AllToAllv => all_to_all_cost,
            _ => default_cost,
        }
    }
}

impl fmt::Display for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `(bytes, communicator_size) -> (latency_term, bandwidth_term)`. Pure, total: must
/// return a finite pair for every representable input, or the core substitutes 0.0
/// and taints the iteration (spec §7, `CostModelDomain`).
pub type CostFn = fn(bytes: i64, p: i32) -> (f64, f64);

/// `latency = 1, bandwidth = bytes` — the catalogue's default, used by every routine
/// without a specialised closed form.
pub fn default_cost(bytes: i64, _p: i32) -> (f64, f64) {
    (1.0, bytes as f64)
}

/// `alpha * log2(p) + beta * n` tree/recursive-doubling shape, used for
/// broadcast-like and reduction collectives (spec §4.1).
fn tree_cost(bytes: i64, p: i32) -> (f64, f64) {
    let logp = (p.max(1) as f64).log2().max(0.0);
    (logp, bytes as f64 * logp)
}

/// Ring-algorithm shape for gather-to-all style collectives: `p - 1` messages, each
/// carrying the full payload.
fn ring_cost(bytes: i64, p: i32) -> (f64, f64) {
    let steps = (p.max(1) - 1).max(0) as f64;
    (steps, bytes as f64 * steps)
}

/// All-to-all shape: `p - 1` messages of `bytes / p` each.
fn all_to_all_cost(bytes: i64, p: i32) -> (f64, f64) {
    let p = p.max(1);
    let steps = (p - 1).max(0) as f64;
    (steps, bytes as f64 / p as f64 * steps)
}

/// The eight scalars tracked for both `local_totals` and `path_totals` (spec §3),
/// in the fixed component order used by `PathVector` and the per-iteration output
/// line: bytes, comm_time, idle_time, est_latency, est_bandwidth, computation_time,
/// overlap_time, runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Totals {
    pub bytes: f64,
    pub comm_time: f64,
    pub idle_time: f64,
    pub est_latency: f64,
    pub est_bandwidth: f64,
    pub computation_time: f64,
    pub overlap_time: f64,
    pub runtime: f64,
}

pub const NUM_COMPONENTS: usize = 8;

impl Totals {
    pub fn as_array(&self) -> [f64; NUM_COMPONENTS] {
        [
            self.bytes,
            self.comm_time,
            self.idle_time,
            self.est_latency,
            self.est_bandwidth,
            self.computation_time,
            self.overlap_time,
            self.runtime,
        ]
    }

    pub fn from_array(a: [f64; NUM_COMPONENTS]) -> Self {
        Totals {
            bytes: a[0],
            comm_time: a[1],
            idle_time: a[2],
            est_latency: a[3],
            est_bandwidth: a[4],
            computation_time: a[5],
            overlap_time: a[6],
            runtime: a[7],
        }
    }

    pub fn is_non_negative(&self) -> bool {
        self.as_array().iter().all(|&x| x >= 0.0)
    }
}

impl std::ops::AddAssign for Totals {
    fn add_assign(&mut self, rhs: Self) {
        self.bytes += rhs.bytes;
        self.comm_time += rhs.comm_time;
        self.idle_time += rhs.idle_time;
        self.est_latency += rhs.est_latency;
        self.est_bandwidth += rhs.est_bandwidth;
        self.computation_time += rhs.computation_time;
        self.overlap_time += rhs.overlap_time;
        self.runtime += rhs.runtime;
    }
}

impl std::ops::Add for Totals {
    type Output = Totals;
    fn add(mut self, rhs: Self) -> Totals {
        self += rhs;
        self
    }
}

/// State stashed by `initiate` and consumed by the matching `complete` (spec §3,
/// `pending`). Sentinel `-1` in the original becomes `Option::None` here.
#[derive(Clone, Copy, Debug)]
pub struct PendingCall {
    pub t_barrier: f64,
    pub bytes: i64,
    pub p: i32,
    pub partner1: i32,
    pub partner2: i32,
    pub save_comp_time: f64,
    pub idle_time: f64,
}

/// Per-routine bookkeeping record (spec §3, `RoutineDescriptor`).
#[derive(Debug)]
pub struct RoutineDescriptor {
    pub id: RoutineId,
    pub cost_fn: CostFn,
    pub local_totals: Totals,
    pub path_totals: Totals,
    pub pending: Option<PendingCall>,
    pub tainted: bool,
}

impl RoutineDescriptor {
    fn new(id: RoutineId) -> Self {
        RoutineDescriptor {
            id,
            cost_fn: id.cost_fn(),
            local_totals: Totals::default(),
            path_totals: Totals::default(),
            pending: None,
            tainted: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// Resets `local_totals` and `pending` for a fresh iteration. `path_totals`
    /// persists across iterations (it is cumulative along the critical path).
    pub fn reset_for_iteration(&mut self) {
        self.local_totals = Totals::default();
        self.pending = None;
        self.tainted = false;
    }

    /// Evaluates `cost_fn`, substituting 0.0 and tainting the descriptor if either
    /// term is non-finite (spec §7, `CostModelDomain`). The substitution is logged
    /// with the structured `CostModelDomain` error so the taint is diagnosable,
    /// even though the descriptor itself (not a `Result`) carries the consequence
    /// forward to the caller.
    pub fn evaluate_cost(&mut self, bytes: i64, p: i32) -> (f64, f64) {
        let (alpha, beta) = (self.cost_fn)(bytes, p);
        if alpha.is_finite() && beta.is_finite() {
            (alpha, beta)
        } else {
            self.tainted = true;
            let err = crate::error::Error::CostModelDomain(self.name());
            tracing::warn!(error = %err, bytes, p, "critter: cost model returned a non-finite value");
            (if alpha.is_finite() { alpha } else { 0.0 }, if beta.is_finite() { beta } else { 0.0 })
        }
    }
}

/// The fixed table of all routines the core knows, one descriptor per `RoutineId`.
#[derive(Debug)]
pub struct Catalogue {
    descriptors: Vec<RoutineDescriptor>,
}

impl Catalogue {
    pub fn new() -> Self {
        Catalogue {
            descriptors: RoutineId::ALL.iter().map(|&id| RoutineDescriptor::new(id)).collect(),
        }
    }

    pub fn get(&self, id: RoutineId) -> &RoutineDescriptor {
        &self.descriptors[id.index()]
    }

    pub fn get_mut(&mut self, id: RoutineId) -> &mut RoutineDescriptor {
        &mut self.descriptors[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutineDescriptor> {
        self.descriptors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RoutineDescriptor> {
        self.descriptors.iter_mut()
    }

    /// `start()`'s per-descriptor reset (spec §4.3): zero `pending`/`local_totals`
    /// on every descriptor. Called only on the first iteration for the zeroing of
    /// `path_totals`/`local_totals`; every iteration resets `local_totals`/`pending`.
    pub fn reset_all_for_iteration(&mut self) {
        for d in self.descriptors.iter_mut() {
            d.reset_for_iteration();
        }
    }

    pub fn zero_path_totals(&mut self) {
        for d in self.descriptors.iter_mut() {
            d.path_totals = Totals::default();
        }
    }

    /// Debug-mode check for non-empty pending state at `stop()`.
    pub fn any_pending(&self) -> bool {
        self.descriptors.iter().any(|d| d.pending.is_some())
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_nineteen_routines() {
        let cat = Catalogue::new();
        assert_eq!(cat.iter().count(), NUM_ROUTINES);
    }

    #[test]
    fn tags_are_stable_and_unique() {
        let tags: Vec<i32> = RoutineId::ALL.iter().map(|id| id.tag()).collect();
        let mut sorted = tags.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(tags.len(), sorted.len());
    }

    #[test]
    fn default_cost_is_latency_one_bandwidth_bytes() {
        assert_eq!(default_cost(64, 4), (1.0, 64.0));
    }

    #[test]
    fn broadcast_cost_is_log2_p_shaped() {
        let (alpha, beta) = RoutineId::Broadcast.cost_fn()(64, 2);
        assert_eq!(alpha, 1.0);
        assert_eq!(beta, 64.0);
    }

    #[test]
    fn cost_model_domain_taints_descriptor() {
        fn bad_cost(_bytes: i64, _p: i32) -> (f64, f64) {
            (f64::NAN, 1.0)
        }
        let mut d = RoutineDescriptor::new(RoutineId::Barrier);
        d.cost_fn = bad_cost;
        let (alpha, beta) = d.evaluate_cost(0, 1);
        assert_eq!(alpha, 0.0);
        assert_eq!(beta, 1.0);
        assert!(d.tainted);
    }
}
