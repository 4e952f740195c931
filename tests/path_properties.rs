//! Property tests for the path vector's algebra (spec §8): non-negativity,
//! path-dominates-local, monotonicity, and MAXLOC determinism. These exercise
//! `PathVector`/`Component` directly rather than through a real communicator,
//! since the merge/tie-break logic they check is communicator-independent.

use critter::catalogue::Totals;
use critter::path::{Component, PathVector};
use proptest::prelude::*;

fn totals_strategy() -> impl Strategy<Value = Totals> {
    (0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6)
        .prop_map(|(bytes, comm_time, idle_time, est_latency, est_bandwidth, computation_time, overlap_time, runtime)| {
            Totals { bytes, comm_time, idle_time, est_latency, est_bandwidth, computation_time, overlap_time, runtime }
        })
}

proptest! {
    /// Extending a vector by a non-negative delta never decreases any component.
    #[test]
    fn extend_local_is_non_negative_delta(delta in totals_strategy(), rank in 0i32..64) {
        let before = PathVector::zero();
        let after = before.extend_local(delta, rank);
        let d = after.delta_since(before);
        prop_assert!(d.is_non_negative());
    }

    /// The merged vector's value for every component is at least as large as
    /// either input's value for that component (the path dominates any single
    /// contributor's local measurement).
    #[test]
    fn merge_dominates_both_inputs(
        a_delta in totals_strategy(), a_rank in 0i32..64,
        b_delta in totals_strategy(), b_rank in 0i32..64,
    ) {
        let zero = PathVector::zero();
        let a = zero.extend_local(a_delta, a_rank);
        let b = zero.extend_local(b_delta, b_rank);
        let merged = a.merge(b);

        for i in 0..8 {
            prop_assert!(merged.components[i].value >= a.components[i].value);
            prop_assert!(merged.components[i].value >= b.components[i].value);
        }
    }

    /// Merge is commutative: which side is "self" and which is "other" does not
    /// change the result, including the winning rank on a tie.
    #[test]
    fn merge_is_commutative(
        a_value in 0.0f64..1e6, a_rank in 0i32..64,
        b_value in 0.0f64..1e6, b_rank in 0i32..64,
    ) {
        let a = Component { value: a_value, rank: a_rank };
        let b = Component { value: b_value, rank: b_rank };
        prop_assert_eq!(a.merge(b), b.merge(a));
    }

    /// A sequence of extend+merge steps produces a path vector whose components
    /// never decrease step over step.
    #[test]
    fn path_is_monotone_across_steps(
        deltas in prop::collection::vec((totals_strategy(), 0i32..8), 1..12),
    ) {
        let mut vector = PathVector::zero();
        let mut previous = vector;
        for (delta, rank) in deltas {
            let candidate = vector.extend_local(delta, rank);
            vector = vector.merge(candidate);
            let d = vector.delta_since(previous);
            prop_assert!(d.is_non_negative());
            previous = vector;
        }
    }

    /// Flattening and reconstructing a vector round-trips exactly, including the
    /// contributing rank of every component.
    #[test]
    fn flat_round_trip(delta in totals_strategy(), rank in 0i32..64) {
        let v = PathVector::zero().extend_local(delta, rank);
        let flat = v.to_flat();
        let back = PathVector::from_flat(&flat);
        prop_assert_eq!(v, back);
    }
}

#[test]
fn tie_is_broken_deterministically_regardless_of_argument_order() {
    let a = Component { value: 100.0, rank: 3 };
    let b = Component { value: 100.0, rank: 9 };
    assert_eq!(a.merge(b).rank, 9);
    assert_eq!(b.merge(a).rank, 9);
}
