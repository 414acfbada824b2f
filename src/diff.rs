//! Tree diff iterator: sweeps the genome left to right, yielding at each
//! breakpoint the set of records leaving and entering the marginal tree.

use crate::newtypes::Locus;
use crate::record::CoalescenceRecord;
use crate::treeseq::TreeSequence;

/// A record leaving the active tree at the current boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Removal(pub CoalescenceRecord);

/// A record entering the active tree at the current boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insertion(pub CoalescenceRecord);

/// The set of edges that changed to produce the tree covering the current
/// interval.
#[derive(Debug, Clone, Default)]
pub struct TreeDifference {
    pub left: Locus,
    pub right: Locus,
    pub out: Vec<Removal>,
    pub in_: Vec<Insertion>,
}

/// Walks `insertion_order`/`removal_order` in lockstep to produce the
/// sequence of [`TreeDifference`]s covering `[1, num_loci + 1)`.
pub struct EdgeDifferencesIterator<'a> {
    ts: &'a TreeSequence,
    insertion_index: usize,
    removal_index: usize,
    tree_left: Locus,
    done: bool,
}

impl<'a> EdgeDifferencesIterator<'a> {
    pub fn new(ts: &'a TreeSequence) -> Self {
        Self {
            ts,
            insertion_index: 0,
            removal_index: 0,
            tree_left: Locus::new(1),
            done: ts.get_num_records() == 0,
        }
    }

    fn record(&self, idx: u32) -> CoalescenceRecord {
        let i = idx as usize;
        CoalescenceRecord {
            left: self.ts.left_col()[i],
            right: self.ts.right_col()[i],
            node: self.ts.node_col()[i],
            children: self.ts.children_col()[i],
            time: self.ts.time_col()[i],
        }
    }
}

impl<'a> Iterator for EdgeDifferencesIterator<'a> {
    type Item = TreeDifference;

    fn next(&mut self) -> Option<TreeDifference> {
        if self.done {
            return None;
        }
        let removal_order = self.ts.removal_order();
        let insertion_order = self.ts.insertion_order();
        let r = self.ts.get_num_records();

        let mut out = Vec::new();
        while self.removal_index < r {
            let idx = removal_order[self.removal_index];
            if self.ts.right_col()[idx as usize] != self.tree_left {
                break;
            }
            out.push(Removal(self.record(idx)));
            self.removal_index += 1;
        }

        let mut in_ = Vec::new();
        while self.insertion_index < r {
            let idx = insertion_order[self.insertion_index];
            if self.ts.left_col()[idx as usize] != self.tree_left {
                break;
            }
            in_.push(Insertion(self.record(idx)));
            self.insertion_index += 1;
        }

        let left = self.tree_left;
        // The next boundary is whichever pending change comes first: the
        // next insertion's `left`, or the next removal's `right` — not the
        // insertion side alone, which would miss a removal that falls
        // before the next tree's leading edge.
        let next_insertion_left =
            (self.insertion_index < r).then(|| self.ts.left_col()[insertion_order[self.insertion_index] as usize]);
        let next_removal_right =
            (self.removal_index < r).then(|| self.ts.right_col()[removal_order[self.removal_index] as usize]);
        let right = match (next_insertion_left, next_removal_right) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => Locus::new(self.ts.get_num_loci() + 1),
        };
        self.tree_left = right;
        if self.insertion_index >= r {
            self.done = true;
        }
        Some(TreeDifference { left, right, out, in_ })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::newtypes::{NodeId, Time};

    fn rec(left: u32, right: u32, node: u32, c0: u32, c1: u32, time: f64) -> CoalescenceRecord {
        CoalescenceRecord::new(
            Locus::new(left),
            Locus::new(right),
            NodeId::from(node),
            [NodeId::from(c0), NodeId::from(c1)],
            Time::new(time),
        )
    }

    #[test]
    fn single_tree_spans_whole_genome() {
        let ts = TreeSequence::from_records(2, 10, vec![rec(1, 11, 3, 1, 2, 1.0)]);
        let mut it = EdgeDifferencesIterator::new(&ts);
        let d = it.next().unwrap();
        assert_eq!(d.left, Locus::new(1));
        assert_eq!(d.right, Locus::new(11));
        assert_eq!(d.in_.len(), 1);
        assert_eq!(d.out.len(), 0);
        assert!(it.next().is_none());
    }

    #[test]
    fn recombination_breakpoint_splits_into_two_intervals() {
        let records = vec![rec(1, 6, 3, 1, 2, 1.0), rec(6, 11, 4, 1, 2, 1.5)];
        let ts = TreeSequence::from_records(2, 10, records);
        let d1 = EdgeDifferencesIterator::new(&ts).next().unwrap();
        assert_eq!(d1.left, Locus::new(1));
        assert_eq!(d1.right, Locus::new(6));

        let diffs: Vec<_> = EdgeDifferencesIterator::new(&ts).collect();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[1].left, Locus::new(6));
        assert_eq!(diffs[1].right, Locus::new(11));
        assert_eq!(diffs[1].out.len(), 1);
        assert_eq!(diffs[1].in_.len(), 1);
    }

    #[test]
    fn boundary_driven_by_a_removal_with_no_coincident_insertion() {
        // Two disjoint records over [1,6) and [8,11): nothing starts at 6,
        // so the boundary after the first tree must come from the pending
        // removal's `right`, not from the (later) next insertion's `left` —
        // otherwise the gap interval [6,8), where no edge is live, is
        // silently merged into the first tree's span.
        let records = vec![rec(1, 6, 3, 1, 2, 1.0), rec(8, 11, 4, 1, 2, 1.5)];
        let ts = TreeSequence::from_records(2, 10, records);
        let diffs: Vec<_> = EdgeDifferencesIterator::new(&ts).collect();
        assert_eq!(diffs.len(), 3);
        assert_eq!(diffs[0].left, Locus::new(1));
        assert_eq!(diffs[0].right, Locus::new(6));
        assert_eq!(diffs[1].left, Locus::new(6));
        assert_eq!(diffs[1].right, Locus::new(8));
        assert!(diffs[1].in_.is_empty());
        assert_eq!(diffs[2].left, Locus::new(8));
        assert_eq!(diffs[2].right, Locus::new(11));
    }
}
