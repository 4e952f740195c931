//! In-flight request table (spec §4.2): bookkeeping for outstanding non-blocking
//! operations between `initiate` and the wait variant that finalises them.

use crate::catalogue::RoutineId;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Opaque handle for an outstanding non-blocking operation. The interception layer
/// owns the real `MPI_Request`/`mpi::request::Request`; it hands the core a stable
/// integer (e.g. derived from the request's address or a monotonically increasing
/// counter it maintains) so the table does not need to know the messaging layer's
/// request representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestHandle(pub u64);

/// One row per outstanding non-blocking op (spec §3, `InFlightRequest`).
#[derive(Clone, Copy, Debug)]
pub struct InFlightRequest {
    pub descriptor: RoutineId,
    pub comm_time_accum: f64,
    pub comp_time_accum: f64,
    pub partner: i32,
    pub tag: i32,
    pub bytes: i64,
    pub peer_count: i32,
    pub issue_time: f64,
    /// Timestamp of the last `observe()` call (or `issue_time`, if none yet), so
    /// repeated observations (e.g. a request surviving several `wait_any` calls
    /// before it is the one that completes) each add only the time elapsed since
    /// the previous observation, not the time since issue.
    last_observed: f64,
}

/// Mapping from request handle to in-flight record (spec §3/§4.2).
#[derive(Debug, Default)]
pub struct RequestTable {
    inner: HashMap<RequestHandle, InFlightRequest>,
}

impl RequestTable {
    pub fn new() -> Self {
        RequestTable { inner: HashMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Inserts a freshly issued non-blocking operation. Fails with
    /// `DuplicateRequest` if `req` is already present — a host-program bug (reuse
    /// of a handle without an intervening wait) rather than something the core can
    /// recover from.
    pub fn register(
        &mut self,
        req: RequestHandle,
        descriptor: RoutineId,
        issue_time: f64,
        partner: i32,
        tag: i32,
        bytes: i64,
        peer_count: i32,
    ) -> Result<()> {
        if self.inner.contains_key(&req) {
            debug_assert!(false, "duplicate in-flight request handle {req:?}");
            return Err(Error::DuplicateRequest(req));
        }
        self.inner.insert(
            req,
            InFlightRequest {
                descriptor,
                comm_time_accum: 0.0,
                comp_time_accum: 0.0,
                partner,
                tag,
                bytes,
                peer_count,
                issue_time,
                last_observed: issue_time,
            },
        );
        Ok(())
    }

    /// Folds the time elapsed since the last observation of `req` (or since issue,
    /// if this is the first) into its accumulators. `now` is the caller's own
    /// timestamp; `comp_delta` is the computation time to credit, read from the
    /// shared `ComputationTimer` by the caller so every request observed in the
    /// same wait call receives the same value (none of them can claim sole credit
    /// for computation that happened while all of them were outstanding).
    pub fn observe(&mut self, req: RequestHandle, now: f64, comp_delta: f64) -> Result<()> {
        match self.inner.get_mut(&req) {
            Some(record) => {
                record.comm_time_accum += (now - record.last_observed).max(0.0);
                record.comp_time_accum += comp_delta;
                record.last_observed = now;
                Ok(())
            }
            None => {
                debug_assert!(false, "unknown in-flight request handle {req:?}");
                Err(Error::UnknownRequest(req))
            }
        }
    }

    /// Removes and returns the record for `req`.
    pub fn take(&mut self, req: RequestHandle) -> Result<InFlightRequest> {
        self.inner.remove(&req).ok_or_else(|| {
            debug_assert!(false, "unknown in-flight request handle {req:?}");
            Error::UnknownRequest(req)
        })
    }

    /// `wait_any` analogue: the underlying primitive has already determined which
    /// member of `reqs` completed (`completed_index`); this removes and returns
    /// that one, leaving the rest registered.
    pub fn complete_any(
        &mut self,
        reqs: &[RequestHandle],
        completed_index: usize,
    ) -> Result<(RequestHandle, InFlightRequest)> {
        let req = *reqs
            .get(completed_index)
            .ok_or_else(|| Error::UnknownRequest(RequestHandle(u64::MAX)))?;
        let record = self.take(req)?;
        Ok((req, record))
    }

    /// `wait_all` analogue: removes every record in `reqs`, in descending partner
    /// order, so finalisation matches the deterministic tie-break used during
    /// propagation (spec §4.4/§4.5). Requests not present are skipped rather than
    /// erroring, since `wait_all` may be composed of a loop of `wait_any` calls
    /// that already finalised some of them via `complete_any`.
    pub fn complete_all_ordered(
        &mut self,
        reqs: &[RequestHandle],
    ) -> Vec<(RequestHandle, InFlightRequest)> {
        let mut records: Vec<(RequestHandle, InFlightRequest)> = reqs
            .iter()
            .filter_map(|&req| self.inner.remove(&req).map(|record| (req, record)))
            .collect();
        records.sort_by(|a, b| b.1.partner.cmp(&a.1.partner));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_take_round_trips() {
        let mut table = RequestTable::new();
        let req = RequestHandle(1);
        table.register(req, RoutineId::Isend, 0.0, 5, 0, 64, 4).unwrap();
        assert_eq!(table.len(), 1);
        let record = table.take(req).unwrap();
        assert_eq!(record.partner, 5);
        assert!(table.is_empty());
    }

    #[test]
    fn duplicate_register_fails() {
        let mut table = RequestTable::new();
        let req = RequestHandle(1);
        table.register(req, RoutineId::Isend, 0.0, 5, 0, 64, 4).unwrap();
        let err = table.register(req, RoutineId::Isend, 0.0, 5, 0, 64, 4);
        assert!(matches!(err, Err(Error::DuplicateRequest(_))));
    }

    #[test]
    fn take_unknown_fails() {
        let mut table = RequestTable::new();
        let err = table.take(RequestHandle(42));
        assert!(matches!(err, Err(Error::UnknownRequest(_))));
    }

    #[test]
    fn observe_accumulates_since_last_observation_not_since_issue() {
        let mut table = RequestTable::new();
        let req = RequestHandle(1);
        table.register(req, RoutineId::Isend, 10.0, 5, 0, 64, 4).unwrap();
        table.observe(req, 12.0, 0.5).unwrap();
        table.observe(req, 15.0, 0.25).unwrap();
        let record = table.take(req).unwrap();
        assert_eq!(record.comm_time_accum, 5.0); // (12-10) + (15-12)
        assert_eq!(record.comp_time_accum, 0.75);
    }

    #[test]
    fn observe_unknown_fails() {
        let mut table = RequestTable::new();
        let err = table.observe(RequestHandle(7), 1.0, 0.0);
        assert!(matches!(err, Err(Error::UnknownRequest(_))));
    }

    #[test]
    fn complete_all_ordered_is_descending_by_partner() {
        let mut table = RequestTable::new();
        let reqs = [RequestHandle(1), RequestHandle(2), RequestHandle(3)];
        table.register(reqs[0], RoutineId::Irecv, 0.0, 5, 0, 8, 8).unwrap();
        table.register(reqs[1], RoutineId::Irecv, 0.0, 2, 0, 8, 8).unwrap();
        table.register(reqs[2], RoutineId::Irecv, 0.0, 8, 0, 8, 8).unwrap();
        let ordered = table.complete_all_ordered(&reqs);
        let partners: Vec<i32> = ordered.iter().map(|(_, r)| r.partner).collect();
        assert_eq!(partners, vec![8, 5, 2]);
        assert!(table.is_empty());
    }
}
