//! Infinite-sites mutation dropper: Poisson-distributed mutations placed
//! uniformly along each coalescence record's branches.

use crate::newtypes::NodeId;
use crate::rng::RandomSource;
use crate::treeseq::TreeSequence;

/// Drop mutations onto `ts` at rate `mu` per unit of branch length times
/// genomic interval length, one Poisson draw per (record, child) branch.
pub fn drop_mutations(ts: &TreeSequence, mu: f64, rng: &mut dyn RandomSource) -> Vec<(NodeId, f64)> {
    let mut mutations = Vec::new();
    if mu <= 0.0 {
        return mutations;
    }
    let left = ts.left_col();
    let right = ts.right_col();
    let time = ts.time_col();
    let children = ts.children_col();
    let node_time = node_birth_times(ts);

    for i in 0..ts.get_num_records() {
        let span = (right[i] - left[i]) as f64;
        for &child in &children[i] {
            let child_time = node_time.get(&child).copied().unwrap_or(0.0);
            let branch_length = time[i].get() - child_time;
            let lambda = mu * branch_length * span;
            let count = rng.next_poisson(lambda);
            for _ in 0..count {
                let offset = rng.next_uniform() * span;
                let position = left[i].get() as f64 + offset;
                mutations.push((child, position));
            }
        }
    }
    mutations
}

/// Every node's own coalescence time (`0` for samples, who never appear as
/// `node` in any record).
fn node_birth_times(ts: &TreeSequence) -> std::collections::HashMap<NodeId, f64> {
    let node = ts.node_col();
    let time = ts.time_col();
    node.iter().zip(time.iter()).map(|(&n, &t)| (n, t.get())).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::newtypes::{Locus, Time};
    use crate::record::CoalescenceRecord;
    use crate::rng::mock::MockRng;

    fn sample_ts() -> TreeSequence {
        let rec = CoalescenceRecord::new(
            Locus::new(1),
            Locus::new(11),
            NodeId::from(3),
            [NodeId::from(1), NodeId::from(2)],
            Time::new(2.0),
        );
        TreeSequence::from_records(2, 10, vec![rec])
    }

    #[test]
    fn zero_rate_drops_nothing() {
        let ts = sample_ts();
        let mut rng = MockRng::new(vec![0.5]);
        let muts = drop_mutations(&ts, 0.0, &mut rng);
        assert!(muts.is_empty());
    }

    #[test]
    fn positive_rate_places_mutations_within_interval() {
        let ts = sample_ts();
        let mut rng = MockRng::new(vec![0.3]);
        let muts = drop_mutations(&ts, 10.0, &mut rng);
        assert!(!muts.is_empty());
        for (node, position) in &muts {
            assert!(*position >= 1.0 && *position < 11.0);
            assert!(node.get() == 1 || node.get() == 2);
        }
    }
}
