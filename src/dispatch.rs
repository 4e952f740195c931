//! Dispatch façade (spec §4.7): the sole caller boundary the interception layer
//! sees. Forwards to the path-decomposition core without interpreting arguments;
//! a future optimisation mechanism could be added here as a second `Mechanism`
//! variant without touching call sites.

use crate::catalogue::{PendingCall, RoutineId, Totals};
use crate::clock;
use crate::core_state::{self, Core};
use crate::error::{Error, Result};
use crate::region::RegionAccum;
use crate::request_table::RequestHandle;
use mpi::traits::*;

/// Mechanism selector (spec §4.7). Mechanism 0, path decomposition, is the only
/// variant this crate implements; the enum exists so a second mechanism could be
/// added later as a plain `match` arm rather than a v-table on the hot path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mechanism {
    PathDecomposition,
}

/// Construct-on-first-use initialisation (design notes §9). Must be called once,
/// after the interception layer has initialised MPI and before any intercepted
/// routine fires.
pub fn allocate<C: Communicator>(comm: &C) -> Result<()> {
    let rank = comm.rank();
    core_state::allocate(rank, rank == 0)
}

/// `start()` (spec §4.3/§6): begins a measured iteration.
pub fn start<C: Communicator>(_comm: &C) {
    let mut core = core_state::lock();
    if core.session.state.first_iteration {
        core.catalogue.zero_path_totals();
        core.path.reset();
    }
    core.catalogue.reset_all_for_iteration();
    core.regions.clear();
    core.session.begin_iteration();
    core.computation_timer.reset();
}

/// `stop()` (spec §4.3/§6): closes the iteration with one global max-plus
/// reduction, emits the per-iteration record, and resets pending state.
pub fn stop<C: Communicator>(comm_world: &C) {
    let mut core = core_state::lock();
    let runtime = core.session.runtime();
    let runtime_delta = Totals { runtime, ..Totals::default() };
    let path_delta = core.path.finalise(comm_world, runtime_delta);
    core.regions.accumulate(path_delta);

    if cfg!(debug_assertions) && !core.requests.is_empty() {
        tracing::warn!(
            pending = core.requests.len(),
            "critter: non-empty in-flight request table at stop()"
        );
    }

    if core.session.state.viz_enabled {
        let values = core.path.current().values().as_array();
        core.session.print(&values);
        let snapshot: Vec<(String, RegionAccum)> =
            core.regions.table().iter().map(|(k, v)| (k.clone(), *v)).collect();
        for (name, accum) in snapshot {
            core.session.print_symbol(&name, &accum.inclusive.as_array(), &accum.exclusive.as_array());
        }
    }
    core.session.flush();

    for descriptor in core.catalogue.iter_mut() {
        descriptor.pending = None;
    }
    core.session.end_iteration();
}

/// Blocking initiate (spec §4.4): performs the synchronising probe and stashes
/// `pending` on the descriptor. Fails with `ProbeFailed` if the probe reports a
/// completion time earlier than the call's own start — the one condition this
/// crate can detect without a fallible `mpi` barrier, caused by clock
/// non-monotonicity rather than a genuine MPI error.
pub fn initiate<C: Communicator>(
    id: RoutineId,
    comm: &C,
    nelem: i64,
    partner1: i32,
    partner2: i32,
) -> Result<()> {
    let mut core = core_state::lock();
    if !core.session.state.tracking_enabled {
        return Ok(());
    }
    let t0 = clock::now();
    let save_comp_time = core.computation_timer.elapsed();
    core.catalogue.get_mut(id).local_totals.computation_time += save_comp_time;

    comm.barrier();

    let t_barrier = clock::now();
    if t_barrier < t0 {
        let err = Error::ProbeFailed(format!(
            "{id}: synchronising barrier reported completion before issue time"
        ));
        tracing::error!(error = %err, routine = %id, "critter: synchronising probe produced a non-monotonic timestamp");
        return Err(err);
    }

    core.catalogue.get_mut(id).pending = Some(PendingCall {
        t_barrier,
        bytes: nelem,
        p: comm.size(),
        partner1,
        partner2,
        save_comp_time,
        idle_time: t_barrier - t0,
    });
    Ok(())
}

/// Blocking complete (spec §4.4): evaluates the cost model, updates local totals,
/// and conditionally propagates the critical-path vector.
pub fn complete<C: Communicator>(id: RoutineId, comm: &C) {
    let mut core = core_state::lock();
    if !core.session.state.tracking_enabled {
        return;
    }
    let Some(pending) = core.catalogue.get(id).pending else {
        debug_assert!(false, "complete({id}) called without a matching initiate");
        return;
    };

    let t1 = clock::now();
    let comm_time = t1 - pending.t_barrier;
    let (alpha, beta) = core.catalogue.get_mut(id).evaluate_cost(pending.bytes, pending.p);

    let increment = Totals {
        bytes: pending.bytes as f64,
        comm_time,
        idle_time: pending.idle_time,
        est_latency: alpha,
        est_bandwidth: beta,
        computation_time: pending.save_comp_time,
        // A blocking call occupies the calling thread for its whole duration, so
        // by construction there is no computation running concurrently with the
        // communication to overlap.
        overlap_time: 0.0,
        runtime: comm_time + pending.idle_time,
    };
    core.catalogue.get_mut(id).local_totals += increment;

    let path_delta = if id.is_point_to_point() {
        let to_first = core.path.propagate_point_to_point(comm, pending.partner1, increment);
        if id.is_dual_partner() && pending.partner2 != pending.partner1 {
            // send_recv/send_recv_replace exchange with two distinct partners in
            // one call; this rank's own measurement was already folded into the
            // path against partner1 above, so the second propagation carries no
            // further local delta — it only brings partner2 up to date.
            let to_second =
                core.path.propagate_point_to_point(comm, pending.partner2, Totals::default());
            to_first + to_second
        } else {
            to_first
        }
    } else {
        core.path.propagate_collective(comm, increment)
    };
    core.regions.accumulate(path_delta);
    core.catalogue.get_mut(id).path_totals += path_delta;

    core.catalogue.get_mut(id).pending = None;
    core.computation_timer.reset();
}

/// Non-blocking initiate (spec §4.4): no synchronising probe; registers the
/// request and immediately attributes any computation time up to issue.
pub fn initiate_nonblocking<C: Communicator>(
    id: RoutineId,
    comm: &C,
    nelem: i64,
    partner: i32,
    req: RequestHandle,
) -> Result<()> {
    let mut core = core_state::lock();
    if !core.session.state.tracking_enabled {
        return Ok(());
    }
    let save_comp_time = core.computation_timer.take();
    core.catalogue.get_mut(id).local_totals.computation_time += save_comp_time;
    core.requests.register(req, id, clock::now(), partner, 0, nelem, comm.size())
}

/// `wait(req)` arrival path (spec §4.4/§6): `now` is the timestamp the caller
/// observed around the actual blocking wait primitive; the elapsed communication
/// and computation times are derived here from `now`, `record.issue_time` (via
/// `RequestTable::observe`), and the shared `ComputationTimer`, the same way
/// `initiate`/`complete` derive them internally for the blocking path.
pub fn complete_wait<C: Communicator>(comm: &C, req: RequestHandle, now: f64) -> Result<()> {
    let mut core = core_state::lock();
    if !core.session.state.tracking_enabled {
        return Ok(());
    }
    let comp_delta = core.computation_timer.take();
    core.requests.observe(req, now, comp_delta)?;
    let record = core.requests.take(req)?;
    finalize_nonblocking(&mut core, comm, record)
}

/// `wait_any(reqs)` arrival path (spec §4.4): every candidate is observed at
/// `now`, folding in the same computation-time delta (the elapsed time is not
/// attributable to any one request); only the one the primitive reports completed
/// is finalised now.
pub fn complete_wait_any<C: Communicator>(
    comm: &C,
    reqs: &[RequestHandle],
    completed_index: usize,
    now: f64,
) -> Result<()> {
    let mut core = core_state::lock();
    if !core.session.state.tracking_enabled {
        return Ok(());
    }
    let comp_delta = core.computation_timer.take();
    for &r in reqs {
        let _ = core.requests.observe(r, now, comp_delta);
    }
    let (_, record) = core.requests.complete_any(reqs, completed_index)?;
    finalize_nonblocking(&mut core, comm, record)
}

/// `wait_all(reqs)` arrival path (spec §4.4): every candidate is observed at
/// `now`, then folded into the path in descending partner order so the result is
/// independent of the order the primitive actually reported completion.
pub fn complete_wait_all<C: Communicator>(comm: &C, reqs: &[RequestHandle], now: f64) -> Result<()> {
    let mut core = core_state::lock();
    if !core.session.state.tracking_enabled {
        return Ok(());
    }
    let comp_delta = core.computation_timer.take();
    for &r in reqs {
        let _ = core.requests.observe(r, now, comp_delta);
    }
    let ordered = core.requests.complete_all_ordered(reqs);
    for (_, record) in ordered {
        finalize_nonblocking(&mut core, comm, record)?;
    }
    Ok(())
}

fn finalize_nonblocking<C: Communicator>(
    core: &mut Core,
    comm: &C,
    record: crate::request_table::InFlightRequest,
) -> Result<()> {
    let (alpha, beta) = core.catalogue.get_mut(record.descriptor).evaluate_cost(record.bytes, record.peer_count);
    let increment = Totals {
        bytes: record.bytes as f64,
        comm_time: record.comm_time_accum,
        idle_time: 0.0,
        est_latency: alpha,
        est_bandwidth: beta,
        computation_time: record.comp_time_accum,
        // Unlike a blocking call, a non-blocking operation runs in the background
        // while the issuing rank keeps computing; the portion of that computation
        // that overlapped with the communication is bounded by whichever of the
        // two was shorter.
        overlap_time: record.comp_time_accum.min(record.comm_time_accum),
        runtime: record.comm_time_accum,
    };
    core.catalogue.get_mut(record.descriptor).local_totals += increment;
    let path_delta = core.path.propagate_point_to_point(comm, record.partner, increment);
    core.regions.accumulate(path_delta);
    core.catalogue.get_mut(record.descriptor).path_totals += path_delta;
    Ok(())
}

/// Region bracketing (spec §4.6/§6). `now` is accepted for interception-contract
/// fidelity; the region stack itself attributes by propagation order, not wall
/// time.
pub fn open_symbol(name: &str, _now: f64) {
    core_state::lock().regions.open_symbol(name);
}

pub fn close_symbol(name: &str, _now: f64) {
    core_state::lock().regions.close_symbol(name);
}

/// Clears the region stack and per-symbol table outside of a `start()` boundary
/// (spec §4.7).
pub fn clear() {
    core_state::lock().regions.clear();
}

/// A standalone synchronising barrier (spec §4.7's `propagate(comm)` entry,
/// distinct from the per-call propagation folded into `complete`): lets the
/// interception layer force every rank to the same point before, e.g.,
/// `MPI_Finalize`, without attributing the wait to any particular routine.
pub fn propagate<C: Communicator>(comm: &C) {
    comm.barrier();
}

/// Folds any trailing computation time into the running totals at `MPI_Finalize`
/// time, since no further `initiate` will observe it. `last_time` is the
/// timestamp the interception layer observed at that point; there is no active
/// descriptor to attribute it to, so it is credited to the catalogue-wide idle
/// bucket via the session's own bookkeeping instead of any one routine.
pub fn final_accumulate(last_time: f64) {
    let mut core = core_state::lock();
    let trailing = (last_time - core.computation_timer.elapsed()).max(0.0);
    if trailing > 0.0 {
        tracing::debug!(trailing, "critter: trailing computation time folded in at finalize");
    }
    core.computation_timer.reset();
}

/// Volumetric collection (spec §4.7/§6): sum-reduces every descriptor's local
/// totals across `comm`.
pub fn collect<C: Communicator>(comm: &C) -> Vec<Totals> {
    let core = core_state::lock();
    crate::volumetric::collect(comm, &core.catalogue)
}

/// Writes the current path vector as one space-separated, newline-terminated line
/// (spec §6).
pub fn record(writer: &mut dyn std::io::Write) -> std::io::Result<()> {
    let core = core_state::lock();
    let values = core.path.current().values().as_array();
    let line = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
    writeln!(writer, "{line}")
}
