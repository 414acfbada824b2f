//! The tree sequence: a columnar store of coalescence records plus the two
//! permutations (`insertion_order`, `removal_order`) that let the tree diff
//! iterator sweep the genome without re-sorting.

use crate::error::{Result, SimError};
use crate::newtypes::{Locus, NodeId, Time};
use crate::record::CoalescenceRecord;

/// Which column ordering to read a record back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrder {
    /// Emission order (ascending time; this is the storage order).
    Time,
    /// `insertion_order`: by `left` ascending, ties by `time` ascending.
    Left,
    /// `removal_order`: by `right` ascending, ties by `time` descending.
    Right,
}

/// A columnar collection of [`CoalescenceRecord`]s with left/right sorted
/// indexes and optional mutations, as produced by [`crate::simulator::Simulator`]
/// or loaded from storage.
#[derive(Debug, Clone)]
pub struct TreeSequence {
    num_samples: u32,
    num_loci: u32,
    left: Vec<Locus>,
    right: Vec<Locus>,
    node: Vec<NodeId>,
    children: Vec<[NodeId; 2]>,
    time: Vec<Time>,
    insertion_order: Vec<u32>,
    removal_order: Vec<u32>,
    mutation_node: Vec<NodeId>,
    mutation_position: Vec<f64>,
}

impl TreeSequence {
    /// Build a tree sequence from the simulator's finalized records, already
    /// in ascending-time emission order.
    pub fn from_records(num_samples: u32, num_loci: u32, records: Vec<CoalescenceRecord>) -> Self {
        let r = records.len();
        let mut left = Vec::with_capacity(r);
        let mut right = Vec::with_capacity(r);
        let mut node = Vec::with_capacity(r);
        let mut children = Vec::with_capacity(r);
        let mut time = Vec::with_capacity(r);
        for rec in &records {
            left.push(rec.left);
            right.push(rec.right);
            node.push(rec.node);
            children.push(rec.children);
            time.push(rec.time);
        }

        let mut insertion_order: Vec<u32> = (0..r as u32).collect();
        insertion_order.sort_by(|&a, &b| {
            left[a as usize]
                .cmp(&left[b as usize])
                .then(time[a as usize].get().partial_cmp(&time[b as usize].get()).unwrap())
        });
        let mut removal_order: Vec<u32> = (0..r as u32).collect();
        removal_order.sort_by(|&a, &b| {
            right[a as usize]
                .cmp(&right[b as usize])
                .then(time[b as usize].get().partial_cmp(&time[a as usize].get()).unwrap())
        });

        Self {
            num_samples,
            num_loci,
            left,
            right,
            node,
            children,
            time,
            insertion_order,
            removal_order,
            mutation_node: Vec::new(),
            mutation_position: Vec::new(),
        }
    }

    pub fn get_num_loci(&self) -> u32 {
        self.num_loci
    }

    pub fn get_num_samples(&self) -> u32 {
        self.num_samples
    }

    pub fn get_num_nodes(&self) -> u32 {
        self.node.last().map_or(self.num_samples, |n| n.get())
    }

    pub fn get_num_records(&self) -> usize {
        self.left.len()
    }

    pub fn get_num_mutations(&self) -> usize {
        self.mutation_node.len()
    }

    pub(crate) fn left_col(&self) -> &[Locus] {
        &self.left
    }

    pub(crate) fn right_col(&self) -> &[Locus] {
        &self.right
    }

    pub(crate) fn node_col(&self) -> &[NodeId] {
        &self.node
    }

    pub(crate) fn children_col(&self) -> &[[NodeId; 2]] {
        &self.children
    }

    pub(crate) fn time_col(&self) -> &[Time] {
        &self.time
    }

    pub(crate) fn insertion_order(&self) -> &[u32] {
        &self.insertion_order
    }

    pub(crate) fn removal_order(&self) -> &[u32] {
        &self.removal_order
    }

    pub fn mutations(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.mutation_node.iter().copied().zip(self.mutation_position.iter().copied())
    }

    /// The `i`-th record under `order`, as a fresh [`CoalescenceRecord`] value.
    pub fn get_record(&self, i: usize, order: RecordOrder) -> Option<CoalescenceRecord> {
        let idx = match order {
            RecordOrder::Time => i,
            RecordOrder::Left => *self.insertion_order.get(i)? as usize,
            RecordOrder::Right => *self.removal_order.get(i)? as usize,
        };
        if idx >= self.left.len() {
            return None;
        }
        Some(CoalescenceRecord {
            left: self.left[idx],
            right: self.right[idx],
            node: self.node[idx],
            children: self.children[idx],
            time: self.time[idx],
        })
    }

    /// Replace the mutation columns with `mutations`, validated and sorted
    /// by `position`.
    pub fn set_mutations(&mut self, mut mutations: Vec<(NodeId, f64)>) -> Result<()> {
        let num_nodes = self.get_num_nodes();
        for (node, position) in &mutations {
            if !(0.0..=self.num_loci as f64 + 1.0).contains(position) {
                return Err(SimError::BadMutation(format!(
                    "position {position} out of range [0, {}]",
                    self.num_loci
                )));
            }
            if node.get() < 1 || node.get() > num_nodes {
                return Err(SimError::BadMutation(format!(
                    "node {node} out of range [1, {num_nodes}]"
                )));
            }
        }
        mutations.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        self.mutation_node = mutations.iter().map(|(n, _)| *n).collect();
        self.mutation_position = mutations.iter().map(|(_, p)| *p).collect();
        Ok(())
    }

    /// Drop Poisson-distributed infinite-sites mutations at rate `mu` per
    /// unit branch length, replacing any existing mutations.
    pub fn generate_mutations(&mut self, mu: f64, rng: &mut dyn crate::rng::RandomSource) -> Result<()> {
        let mutations = crate::mutations::drop_mutations(self, mu, rng);
        self.set_mutations(mutations)
    }

    /// Write this tree sequence to the pure-Rust archive format.
    pub fn dump(
        &self,
        path: impl AsRef<std::path::Path>,
        environment: &str,
        parameters: &str,
        flags: crate::archive::ArchiveFlags,
    ) -> Result<()> {
        crate::archive::dump(self, path, environment, parameters, flags)
    }

    /// Load a tree sequence previously written by [`TreeSequence::dump`].
    pub fn load(path: impl AsRef<std::path::Path>, flags: crate::archive::ArchiveFlags) -> Result<Self> {
        crate::archive::load(path, flags)
    }

    /// Write this tree sequence to the deprecated legacy flat file format.
    pub fn dump_legacy(
        &self,
        path: impl AsRef<std::path::Path>,
        flags: crate::legacy::LegacyFlags,
        environment: &str,
        parameters: &str,
    ) -> Result<()> {
        crate::legacy::dump_legacy(self, path, flags, environment, parameters)
    }

    /// Load a tree sequence from the deprecated legacy flat file format.
    pub fn load_legacy(path: impl AsRef<std::path::Path>) -> Result<Self> {
        crate::legacy::load_legacy(path)
    }
}
