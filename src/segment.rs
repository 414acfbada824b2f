//! Ancestral-material bookkeeping.
//!
//! A [`Segment`] is a half-open locus interval `[left, right)` of genome
//! currently ancestral to some node, plus an intrusive link to the next
//! segment of the same ancestor. Segments of one ancestor are sorted by
//! `left` and disjoint; the ancestor itself is identified by the `left` of
//! its head segment. Segments are owned by a [`Pool`] and addressed by
//! [`Handle`] — never by raw pointer — per the arena-and-index discipline
//! used throughout this crate.

use crate::error::Result;
use crate::newtypes::{Locus, NodeId};
use crate::pool::{Handle, Pool};

#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub left: Locus,
    pub right: Locus,
    pub node: NodeId,
    pub next: Option<Handle>,
}

impl Segment {
    /// Recombination links strictly inside this segment, i.e. excluding the
    /// boundary at `right` itself (see `SPEC_FULL.md` §9 on the GLOSSARY's
    /// "minus 1 per segment" reading, which this crate follows literally: a
    /// multi-segment ancestor's links are the sum of each segment's own
    /// internal links, with no link counted between segments).
    pub fn num_links(&self) -> u32 {
        (self.right - self.left) - 1
    }
}

/// Owns every live [`Segment`] in the simulation.
pub struct SegmentArena {
    pool: Pool<Segment>,
}

impl SegmentArena {
    pub fn new(block_size: usize, max_memory: usize) -> Self {
        Self {
            pool: Pool::new(block_size, max_memory),
        }
    }

    pub fn alloc(&mut self, segment: Segment) -> Result<Handle> {
        self.pool.alloc(segment)
    }

    pub fn free(&mut self, handle: Handle) {
        self.pool.free(handle)
    }

    pub fn get(&self, handle: Handle) -> &Segment {
        self.pool.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut Segment {
        self.pool.get_mut(handle)
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    pub fn peak_count(&self) -> usize {
        self.pool.peak_count()
    }

    /// Sum of `num_links()` over every segment in the ancestor headed at
    /// `head` — the ancestor's total recombinable link count.
    pub fn ancestor_link_count(&self, head: Handle) -> u32 {
        let mut total = 0u32;
        let mut cur = Some(head);
        while let Some(h) = cur {
            let s = self.get(h);
            total += s.num_links();
            cur = s.next;
        }
        total
    }

    /// Walk the ancestor's segment list to find where internal link number
    /// `b` (1-based, counted from the head across each segment's own
    /// `num_links()` in turn) falls.
    ///
    /// `b` landing on the last link of a non-final segment is the link
    /// *between* that segment and the next one, not a link inside it: no
    /// truncation is needed there, the next segment simply detaches whole.
    /// Only when the covering segment has no `next` does its last link get
    /// the ordinary in-segment split treatment.
    pub fn locate_link(&self, head: Handle, mut b: u32) -> SplitOutcome {
        let mut cur = head;
        loop {
            let links = self.get(cur).num_links();
            if b == links && self.get(cur).next.is_some() {
                return SplitOutcome::Between { handle: cur };
            }
            if b <= links {
                return SplitOutcome::Inside {
                    handle: cur,
                    local_offset: b,
                };
            }
            b -= links;
            cur = self.get(cur).next.expect("b must fall within the ancestor's own link count");
        }
    }
}

/// Where a drawn recombination link falls within an ancestor's segment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome {
    /// The split falls strictly inside `handle`'s segment, `local_offset`
    /// links in; truncate `handle` and allocate a new trailing segment.
    Inside { handle: Handle, local_offset: u32 },
    /// The split falls on the link between `handle` and its successor;
    /// detach `handle.next` wholesale as the new ancestor's head.
    Between { handle: Handle },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn num_links_excludes_right_boundary() {
        let s = Segment {
            left: Locus::new(1),
            right: Locus::new(11),
            node: NodeId::from(1),
            next: None,
        };
        assert_eq!(s.num_links(), 9);
    }

    #[test]
    fn locate_link_walks_to_covering_segment() {
        let mut arena = SegmentArena::new(4, 0);
        let tail = arena
            .alloc(Segment {
                left: Locus::new(5),
                right: Locus::new(10),
                node: NodeId::from(1),
                next: None,
            })
            .unwrap();
        let head = arena
            .alloc(Segment {
                left: Locus::new(1),
                right: Locus::new(5),
                node: NodeId::from(1),
                next: Some(tail),
            })
            .unwrap();
        // head has num_links() == 3 (links 1,2,3); tail has num_links() == 4.
        assert_eq!(
            arena.locate_link(head, 2),
            SplitOutcome::Inside {
                handle: head,
                local_offset: 2
            }
        );
        assert_eq!(
            arena.locate_link(head, 5),
            SplitOutcome::Inside {
                handle: tail,
                local_offset: 2
            }
        );
    }

    #[test]
    fn locate_link_on_boundary_between_segments_detaches_next() {
        let mut arena = SegmentArena::new(4, 0);
        let tail = arena
            .alloc(Segment {
                left: Locus::new(5),
                right: Locus::new(10),
                node: NodeId::from(1),
                next: None,
            })
            .unwrap();
        let head = arena
            .alloc(Segment {
                left: Locus::new(1),
                right: Locus::new(5),
                node: NodeId::from(1),
                next: Some(tail),
            })
            .unwrap();
        // head's last link (3) sits right before `tail`, which exists: the
        // split falls between the two segments, not inside `head`.
        assert_eq!(arena.locate_link(head, 3), SplitOutcome::Between { handle: head });
    }

    #[test]
    fn ancestor_link_count_sums_segments() {
        let mut arena = SegmentArena::new(4, 0);
        let tail = arena
            .alloc(Segment {
                left: Locus::new(5),
                right: Locus::new(10),
                node: NodeId::from(1),
                next: None,
            })
            .unwrap();
        let head = arena
            .alloc(Segment {
                left: Locus::new(1),
                right: Locus::new(5),
                node: NodeId::from(1),
                next: Some(tail),
            })
            .unwrap();
        assert_eq!(arena.ancestor_link_count(head), 3 + 4);
    }
}
