//! Haplotype matrix generator: for each sample, the set of derived mutation
//! states it carries, as an `n x S` bit matrix.

use fixedbitset::FixedBitSet;
use streaming_iterator::StreamingIterator;

use crate::newtypes::NodeId;
use crate::sparsetree::TreeFlags;
use crate::treeseq::TreeSequence;

/// One `FixedBitSet` row per sample, one column per mutation (site), in
/// position order.
pub struct HaplotypeMatrix {
    rows: Vec<FixedBitSet>,
    num_sites: usize,
}

impl HaplotypeMatrix {
    pub fn num_samples(&self) -> usize {
        self.rows.len()
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    /// Whether sample `sample_id` (`1..=n`) carries the derived allele at
    /// site `site_index`.
    pub fn get(&self, sample_id: u32, site_index: usize) -> bool {
        self.rows[(sample_id - 1) as usize][site_index]
    }

    pub fn row_as_string(&self, sample_id: u32) -> String {
        let row = &self.rows[(sample_id - 1) as usize];
        (0..self.num_sites).map(|i| if row[i] { '1' } else { '0' }).collect()
    }
}

/// Build the haplotype matrix for `ts`, walking every marginal tree once and
/// placing each mutation's derived state on the leaves below its node.
pub fn build_haplotypes(ts: &TreeSequence) -> HaplotypeMatrix {
    let n = ts.get_num_samples();
    let sites: Vec<(NodeId, f64)> = {
        let mut m: Vec<_> = ts.mutations().collect();
        m.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        m
    };
    let num_sites = sites.len();
    let mut rows: Vec<FixedBitSet> = (0..n).map(|_| FixedBitSet::with_capacity(num_sites)).collect();

    let mut site_cursor = 0;
    let mut trees = ts.trees(TreeFlags::empty());
    while let Some(tree) = trees.next() {
        while site_cursor < num_sites && (sites[site_cursor].1 as u32) < tree.right().get() {
            let (node, _) = sites[site_cursor];
            mark_descendant_samples(tree, node, n, site_cursor, &mut rows);
            site_cursor += 1;
        }
    }

    HaplotypeMatrix { rows, num_sites }
}

fn mark_descendant_samples(
    tree: &crate::sparsetree::SparseTree<'_>,
    node: NodeId,
    n: u32,
    site_index: usize,
    rows: &mut [FixedBitSet],
) {
    let mut stack = vec![node];
    while let Some(u) = stack.pop() {
        if u.is_sample(n) {
            rows[(u.get() - 1) as usize].set(site_index, true);
            continue;
        }
        let [c0, c1] = tree.children(u);
        if !c0.is_null() {
            stack.push(c0);
        }
        if !c1.is_null() {
            stack.push(c1);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::newtypes::{Locus, Time};
    use crate::record::CoalescenceRecord;

    #[test]
    fn mutation_on_leaf_marks_only_that_sample() {
        let rec = CoalescenceRecord::new(
            Locus::new(1),
            Locus::new(11),
            NodeId::from(3),
            [NodeId::from(1), NodeId::from(2)],
            Time::new(1.0),
        );
        let mut ts = TreeSequence::from_records(2, 10, vec![rec]);
        ts.set_mutations(vec![(NodeId::from(1), 5.0)]).unwrap();
        let hap = build_haplotypes(&ts);
        assert_eq!(hap.num_sites(), 1);
        assert!(hap.get(1, 0));
        assert!(!hap.get(2, 0));
    }

    #[test]
    fn mutation_on_root_marks_every_sample() {
        let rec = CoalescenceRecord::new(
            Locus::new(1),
            Locus::new(11),
            NodeId::from(3),
            [NodeId::from(1), NodeId::from(2)],
            Time::new(1.0),
        );
        let mut ts = TreeSequence::from_records(2, 10, vec![rec]);
        ts.set_mutations(vec![(NodeId::from(3), 5.0)]).unwrap();
        let hap = build_haplotypes(&ts);
        assert!(hap.get(1, 0));
        assert!(hap.get(2, 0));
    }
}
