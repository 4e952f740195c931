//! Symbol/region attribution (spec §4.6): a stack of active named regions, and the
//! inclusive/exclusive cost buckets each completed operation's contribution feeds
//! into.

use crate::catalogue::Totals;
use smallvec::SmallVec;
use std::collections::HashMap;

/// One entry on the active-region stack. `own` accumulates contributions made while
/// this frame is top-of-stack (the region's direct, exclusive work); `children`
/// accumulates the inclusive totals of every nested region popped while this frame
/// was beneath it, so `own + children` is this region's inclusive total once it
/// pops (spec §4.6: "tracked by subtracting children's contributions at pop time").
#[derive(Clone, Copy, Debug, Default)]
struct Frame {
    own: Totals,
    children: Totals,
}

/// Accumulated inclusive/exclusive costs for one named region, persisted across
/// possibly many `open_symbol`/`close_symbol` brackets within one iteration.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegionAccum {
    pub inclusive: Totals,
    pub exclusive: Totals,
}

/// The stack of currently active regions plus the per-name accumulator table (spec
/// §3, `RegionStack`).
#[derive(Debug, Default)]
pub struct RegionStack {
    stack: SmallVec<[(String, Frame); 8]>,
    table: HashMap<String, RegionAccum>,
}

impl RegionStack {
    pub fn new() -> Self {
        RegionStack { stack: SmallVec::new(), table: HashMap::new() }
    }

    /// Pushes a new active region. No-op on the accumulator table until the
    /// matching `close_symbol`.
    pub fn open_symbol(&mut self, name: &str) {
        self.stack.push((name.to_string(), Frame::default()));
    }

    /// Pops the active region, folding its inclusive/exclusive totals into the
    /// per-name table and crediting its inclusive total to its parent (if any), so
    /// nesting is resolved independent of depth.
    pub fn close_symbol(&mut self, name: &str) {
        let Some((top_name, frame)) = self.stack.pop() else {
            debug_assert!(false, "close_symbol({name}) with no open region");
            return;
        };
        debug_assert_eq!(top_name, name, "close_symbol name does not match top of stack");

        let inclusive = frame.own + frame.children;
        let exclusive = frame.own;

        let entry = self.table.entry(top_name).or_default();
        entry.inclusive += inclusive;
        entry.exclusive += exclusive;

        if let Some((_, parent)) = self.stack.last_mut() {
            parent.children += inclusive;
        }
    }

    /// Feeds a completed operation's contribution into the top-of-stack region's
    /// exclusive accumulator (spec §4.6). No-op if no region is open.
    pub fn accumulate(&mut self, increment: Totals) {
        if let Some((_, top)) = self.stack.last_mut() {
            top.own += increment;
        }
    }

    /// Clears both the active stack and the per-name table (spec §4.3: "clear the
    /// region stack" at `start()`).
    pub fn clear(&mut self) {
        self.stack.clear();
        self.table.clear();
    }

    pub fn is_empty_stack(&self) -> bool {
        self.stack.is_empty()
    }

    /// The finalised per-region table, for the symbol output stream (spec §6).
    pub fn table(&self) -> &HashMap<String, RegionAccum> {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(bytes: f64) -> Totals {
        Totals { bytes, ..Totals::default() }
    }

    #[test]
    fn bracket_with_no_operation_leaves_accumulators_unchanged() {
        let mut regions = RegionStack::new();
        regions.open_symbol("s");
        regions.close_symbol("s");
        let accum = regions.table()["s"];
        assert_eq!(accum.inclusive, Totals::default());
        assert_eq!(accum.exclusive, Totals::default());
    }

    #[test]
    fn nested_regions_split_inclusive_and_exclusive() {
        let mut regions = RegionStack::new();
        regions.open_symbol("outer");
        regions.accumulate(t(10.0)); // broadcast
        regions.open_symbol("inner");
        regions.accumulate(t(5.0)); // all_reduce
        regions.close_symbol("inner");
        regions.close_symbol("outer");

        let outer = regions.table()["outer"];
        let inner = regions.table()["inner"];
        assert_eq!(outer.inclusive.bytes, 15.0);
        assert_eq!(outer.exclusive.bytes, 10.0);
        assert_eq!(inner.inclusive.bytes, 5.0);
        assert_eq!(inner.exclusive.bytes, 5.0);
    }

    #[test]
    fn clear_resets_stack_and_table() {
        let mut regions = RegionStack::new();
        regions.open_symbol("s");
        regions.accumulate(t(1.0));
        regions.clear();
        assert!(regions.is_empty_stack());
        assert!(regions.table().is_empty());
    }
}
