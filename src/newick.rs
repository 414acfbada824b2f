//! Newick formatter: a one-way, depth-first writer from a marginal tree to a
//! standard Newick string. No parser — output only.

use std::fmt::Write as _;

use crate::error::{Result, SimError};
use crate::newtypes::NodeId;
use crate::sparsetree::SparseTree;

/// Render the current marginal tree of `tree` as a Newick string, failing if
/// the output would exceed `max_len` bytes.
pub fn to_newick(tree: &SparseTree<'_>, max_len: usize) -> Result<String> {
    let mut out = String::new();
    write_subtree(tree, tree.root(), &mut out)?;
    out.push(';');
    if out.len() > max_len {
        return Err(SimError::NewickOverflow);
    }
    Ok(out)
}

fn write_subtree(tree: &SparseTree<'_>, node: NodeId, out: &mut String) -> Result<()> {
    let [c0, c1] = tree.children(node);
    if !c0.is_null() || !c1.is_null() {
        out.push('(');
        if !c0.is_null() {
            write_subtree(tree, c0, out)?;
            write_branch_length(tree, node, c0, out)?;
        }
        if !c1.is_null() {
            out.push(',');
            write_subtree(tree, c1, out)?;
            write_branch_length(tree, node, c1, out)?;
        }
        out.push(')');
    }
    write!(out, "{node}").map_err(|e| SimError::FileFormat(e.to_string()))?;
    Ok(())
}

fn write_branch_length(tree: &SparseTree<'_>, parent: NodeId, child: NodeId, out: &mut String) -> Result<()> {
    let length = tree.time(parent).get() - tree.time(child).get();
    write!(out, ":{length}").map_err(|e| SimError::FileFormat(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::newtypes::{Locus, Time};
    use crate::record::CoalescenceRecord;
    use crate::sparsetree::TreeFlags;
    use crate::treeseq::TreeSequence;
    use streaming_iterator::StreamingIterator;

    #[test]
    fn two_samples_format_as_a_cherry() {
        let rec = CoalescenceRecord::new(
            Locus::new(1),
            Locus::new(11),
            NodeId::from(3),
            [NodeId::from(1), NodeId::from(2)],
            Time::new(2.5),
        );
        let ts = TreeSequence::from_records(2, 10, vec![rec]);
        let mut trees = ts.trees(TreeFlags::empty());
        trees.advance();
        let tree = trees.get().unwrap();
        let s = to_newick(tree, 1024).unwrap();
        assert_eq!(s, "(1:2.5,2:2.5)3;");
    }

    #[test]
    fn overflow_cap_is_enforced() {
        let rec = CoalescenceRecord::new(
            Locus::new(1),
            Locus::new(11),
            NodeId::from(3),
            [NodeId::from(1), NodeId::from(2)],
            Time::new(2.5),
        );
        let ts = TreeSequence::from_records(2, 10, vec![rec]);
        let mut trees = ts.trees(TreeFlags::empty());
        trees.advance();
        let tree = trees.get().unwrap();
        assert!(to_newick(tree, 3).is_err());
    }
}
