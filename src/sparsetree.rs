//! Sparse tree iterator: walks the marginal trees left to right, reusing one
//! set of dense arrays rather than allocating a fresh tree per interval.

use streaming_iterator::StreamingIterator;

use crate::diff::EdgeDifferencesIterator;
use crate::error::{Result, SimError};
use crate::newtypes::{Locus, NodeId, Time};
use crate::treeseq::TreeSequence;

bitflags::bitflags! {
    /// Which auxiliary bookkeeping the sparse tree maintains as it sweeps.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TreeFlags: u32 {
        /// Maintain `num_leaves`/`num_tracked_leaves` incrementally.
        const TRACK_LEAVES = 1 << 0;
    }
}

/// The current marginal tree: dense arrays indexed by node id, `0` meaning
/// "no such node" (parent) or "none" (child slot).
pub struct SparseTree<'a> {
    diffs: EdgeDifferencesIterator<'a>,
    flags: TreeFlags,
    parent: Vec<u32>,
    time: Vec<f64>,
    children: Vec<[u32; 2]>,
    num_leaves: Vec<u32>,
    num_tracked_leaves: Vec<u32>,
    root: u32,
    left: Locus,
    right: Locus,
    started: bool,
}

impl<'a> SparseTree<'a> {
    pub fn new(ts: &'a TreeSequence, flags: TreeFlags) -> Self {
        let num_nodes = ts.get_num_nodes() as usize;
        Self {
            diffs: EdgeDifferencesIterator::new(ts),
            flags,
            parent: vec![0; num_nodes + 1],
            time: vec![0.0; num_nodes + 1],
            children: vec![[0, 0]; num_nodes + 1],
            num_leaves: vec![0; num_nodes + 1],
            num_tracked_leaves: vec![0; num_nodes + 1],
            root: 0,
            left: Locus::new(0),
            right: Locus::new(0),
            started: false,
        }
    }

    /// Mark sample `u` (`1..=n`) as tracked, for `num_tracked_leaves` queries.
    pub fn track_sample(&mut self, u: NodeId) {
        if self.flags.contains(TreeFlags::TRACK_LEAVES) {
            self.num_tracked_leaves[u.as_usize()] = 1;
        }
    }

    pub fn left(&self) -> Locus {
        self.left
    }

    pub fn right(&self) -> Locus {
        self.right
    }

    pub fn root(&self) -> NodeId {
        NodeId::from(self.root)
    }

    pub fn parent(&self, u: NodeId) -> NodeId {
        let p = self.parent[u.as_usize()];
        if p == 0 { NodeId::NULL } else { NodeId::from(p) }
    }

    pub fn time(&self, u: NodeId) -> Time {
        Time::new(self.time[u.as_usize()])
    }

    pub fn children(&self, u: NodeId) -> [NodeId; 2] {
        let c = self.children[u.as_usize()];
        let wrap = |x: u32| if x == 0 { NodeId::NULL } else { NodeId::from(x) };
        [wrap(c[0]), wrap(c[1])]
    }

    pub fn num_leaves(&self, u: NodeId) -> Result<u32> {
        if !self.flags.contains(TreeFlags::TRACK_LEAVES) {
            return Err(SimError::UnsupportedOperation("TreeFlags::TRACK_LEAVES not set".into()));
        }
        Ok(self.num_leaves[u.as_usize()])
    }

    pub fn num_tracked_leaves(&self, u: NodeId) -> Result<u32> {
        if !self.flags.contains(TreeFlags::TRACK_LEAVES) {
            return Err(SimError::UnsupportedOperation("TreeFlags::TRACK_LEAVES not set".into()));
        }
        Ok(self.num_tracked_leaves[u.as_usize()])
    }

    fn propagate_counts_to_root(&mut self, mut u: u32, leaves_delta: i64, tracked_delta: i64) {
        while u != 0 {
            self.num_leaves[u as usize] = (self.num_leaves[u as usize] as i64 + leaves_delta) as u32;
            self.num_tracked_leaves[u as usize] =
                (self.num_tracked_leaves[u as usize] as i64 + tracked_delta) as u32;
            u = self.parent[u as usize];
        }
    }

    /// The most recent common ancestor of `u` and `v` in the current tree.
    pub fn mrca(&self, u: NodeId, v: NodeId) -> NodeId {
        let mut stack_u = Vec::new();
        let mut cur = u.get();
        while cur != 0 {
            stack_u.push(cur);
            cur = self.parent[cur as usize];
        }
        let mut stack_v = Vec::new();
        cur = v.get();
        while cur != 0 {
            stack_v.push(cur);
            cur = self.parent[cur as usize];
        }
        stack_u.reverse();
        stack_v.reverse();
        let mut last = 0;
        for (a, b) in stack_u.iter().zip(stack_v.iter()) {
            if a != b {
                break;
            }
            last = *a;
        }
        if last == 0 { NodeId::NULL } else { NodeId::from(last) }
    }

    fn advance_impl(&mut self) -> bool {
        let diff = match self.diffs.next() {
            Some(d) => d,
            None => return false,
        };
        self.left = diff.left;
        self.right = diff.right;

        let track = self.flags.contains(TreeFlags::TRACK_LEAVES);

        for removal in &diff.out {
            let r = removal.0;
            let node = r.node.get();
            let [c0, c1] = r.children;
            if track {
                let leaves = self.num_leaves[node as usize] as i64;
                let tracked = self.num_tracked_leaves[node as usize] as i64;
                let p = self.parent[node as usize];
                self.propagate_counts_to_root(p, -leaves, -tracked);
            }
            self.parent[node as usize] = 0;
            self.time[node as usize] = 0.0;
            self.children[node as usize] = [0, 0];
            self.num_leaves[node as usize] = 0;
            self.num_tracked_leaves[node as usize] = 0;
            self.parent[c0.as_usize()] = 0;
            self.parent[c1.as_usize()] = 0;
            if node == self.root {
                self.root = c0.get().max(c1.get());
            }
        }

        for insertion in &diff.in_ {
            let r = insertion.0;
            let node = r.node.get();
            let [c0, c1] = r.children;
            self.parent[c0.as_usize()] = node;
            self.parent[c1.as_usize()] = node;
            self.children[node as usize] = [c0.get(), c1.get()];
            self.time[node as usize] = r.time.get();
            if track {
                let leaves = self.num_leaves[c0.as_usize()] + self.num_leaves[c1.as_usize()];
                let tracked = self.num_tracked_leaves[c0.as_usize()] + self.num_tracked_leaves[c1.as_usize()];
                self.num_leaves[node as usize] = leaves;
                self.num_tracked_leaves[node as usize] = tracked;
            }
            if node > self.root {
                self.root = node;
            }
        }

        while self.parent[self.root as usize] != 0 {
            self.root = self.parent[self.root as usize];
        }
        true
    }
}

impl<'a> StreamingIterator for SparseTree<'a> {
    type Item = SparseTree<'a>;

    fn advance(&mut self) {
        self.started = self.advance_impl();
    }

    fn get(&self) -> Option<&Self::Item> {
        if self.started {
            Some(self)
        } else {
            None
        }
    }
}

impl TreeSequence {
    pub fn trees(&self, flags: TreeFlags) -> SparseTree<'_> {
        let mut tree = SparseTree::new(self, flags);
        for s in 1..=self.get_num_samples() {
            tree.num_leaves[s as usize] = 1;
        }
        tree
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::newtypes::Time as T;
    use crate::record::CoalescenceRecord;

    fn rec(left: u32, right: u32, node: u32, c0: u32, c1: u32, time: f64) -> CoalescenceRecord {
        CoalescenceRecord::new(Locus::new(left), Locus::new(right), NodeId::from(node), [NodeId::from(c0), NodeId::from(c1)], T::new(time))
    }

    #[test]
    fn single_tree_has_correct_root_and_parents() {
        let ts = TreeSequence::from_records(2, 10, vec![rec(1, 11, 3, 1, 2, 1.0)]);
        let mut trees = ts.trees(TreeFlags::empty());
        trees.advance();
        let tree = trees.get().unwrap();
        assert_eq!(tree.root(), NodeId::from(3));
        assert_eq!(tree.parent(NodeId::from(1)), NodeId::from(3));
        assert_eq!(tree.parent(NodeId::from(2)), NodeId::from(3));
        assert!(trees.get().is_some());
        trees.advance();
        assert!(trees.get().is_none());
    }

    #[test]
    fn mrca_of_siblings_is_their_parent() {
        let ts = TreeSequence::from_records(2, 10, vec![rec(1, 11, 3, 1, 2, 1.0)]);
        let mut trees = ts.trees(TreeFlags::empty());
        trees.advance();
        let tree = trees.get().unwrap();
        assert_eq!(tree.mrca(NodeId::from(1), NodeId::from(2)), NodeId::from(3));
    }

    #[test]
    fn num_leaves_without_flag_is_unsupported() {
        let ts = TreeSequence::from_records(2, 10, vec![rec(1, 11, 3, 1, 2, 1.0)]);
        let mut trees = ts.trees(TreeFlags::empty());
        trees.advance();
        let tree = trees.get().unwrap();
        assert!(tree.num_leaves(NodeId::from(3)).is_err());
    }

    #[test]
    fn num_leaves_with_flag_counts_descendant_samples() {
        let records = vec![
            rec(1, 11, 4, 1, 2, 1.0),
            rec(1, 11, 5, 3, 4, 2.0),
        ];
        let ts = TreeSequence::from_records(3, 10, records);
        let mut trees = ts.trees(TreeFlags::TRACK_LEAVES);
        trees.advance();
        let tree = trees.get().unwrap();
        assert_eq!(tree.num_leaves(NodeId::from(5)).unwrap(), 3);
        assert_eq!(tree.num_leaves(NodeId::from(4)).unwrap(), 2);
    }

    #[test]
    fn recombination_produces_two_distinct_trees() {
        let records = vec![rec(1, 6, 3, 1, 2, 1.0), rec(6, 11, 4, 1, 2, 1.5)];
        let ts = TreeSequence::from_records(2, 10, records);
        let mut trees = ts.trees(TreeFlags::empty());
        trees.advance();
        assert_eq!(trees.get().unwrap().root(), NodeId::from(3));
        trees.advance();
        assert_eq!(trees.get().unwrap().root(), NodeId::from(4));
        trees.advance();
        assert!(trees.get().is_none());
    }
}
