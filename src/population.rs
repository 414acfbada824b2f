//! The population: the set of currently-live ancestors, indexed by the
//! `left` coordinate of each ancestor's head segment so the simulator can
//! look up, sample without replacement, and remove ancestors in `O(log n)`.
//!
//! The population AVL is keyed *uniquely* by `left`, yet the initial `n`
//! ancestors all start out with `left == 1`. Rather than forcing a re-key —
//! which the distilled specification leaves ambiguous (see `SPEC_FULL.md`
//! §9, resolved Open Question 1) — each key maps to a small bucket of
//! ancestor head handles that currently share that `left`. Buckets have
//! expected size close to one after the first few recombination events
//! fragment the initial ties apart.

use crate::avl::AvlMap;
use crate::error::Result;
use crate::pool::Handle;
use crate::rng::RandomSource;

pub struct Population {
    avl: AvlMap<u32, Vec<Handle>>,
    count: usize,
}

impl Population {
    pub fn new(block_size: usize) -> Self {
        Self {
            avl: AvlMap::new(block_size),
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Insert a new live ancestor, headed at `left`.
    pub fn insert(&mut self, left: u32, handle: Handle) -> Result<()> {
        if let Some(bucket) = self.avl.get_mut(left) {
            bucket.push(handle);
        } else {
            self.avl.insert(left, vec![handle])?;
        }
        self.count += 1;
        Ok(())
    }

    /// Remove a specific ancestor known to be headed at `left`.
    pub fn remove(&mut self, left: u32, handle: Handle) {
        let bucket = self
            .avl
            .get_mut(left)
            .expect("left key must be present in the population");
        let idx = bucket
            .iter()
            .position(|h| *h == handle)
            .expect("handle must be present in its bucket");
        bucket.swap_remove(idx);
        if bucket.is_empty() {
            self.avl.remove(left);
        }
        self.count -= 1;
    }

    /// The live ancestor handles currently sharing head `left`, if any.
    pub fn bucket(&self, left: u32) -> Option<&[Handle]> {
        self.avl.get(left).map(Vec::as_slice)
    }

    /// The `rank`-th live ancestor (0-based) in ascending-`left` order,
    /// ties among same-`left` ancestors broken by bucket insertion order.
    pub fn select(&self, rank: usize) -> (u32, Handle) {
        let mut remaining = rank;
        for (key, bucket) in self.avl.iter_ascending() {
            if remaining < bucket.len() {
                return (key, bucket[remaining]);
            }
            remaining -= bucket.len();
        }
        panic!("rank {rank} out of range for population of size {}", self.count);
    }

    /// Sample two distinct live ancestors uniformly without replacement.
    pub fn sample_two_distinct(&self, rng: &mut dyn RandomSource) -> ((u32, Handle), (u32, Handle)) {
        debug_assert!(self.count >= 2);
        let i = rng.next_uniform_index(self.count as u64) as usize - 1;
        let mut j = rng.next_uniform_index(self.count as u64 - 1) as usize - 1;
        if j >= i {
            j += 1;
        }
        (self.select(i), self.select(j))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pool::Pool;

    fn fake_handles(n: usize) -> (Pool<u8>, Vec<Handle>) {
        let mut pool = Pool::new(8, 0);
        let handles = (0..n).map(|i| pool.alloc(i as u8).unwrap()).collect();
        (pool, handles)
    }

    #[test]
    fn insert_select_remove_round_trip() {
        let (_pool, handles) = fake_handles(3);
        let mut pop = Population::new(4);
        pop.insert(10, handles[0]).unwrap();
        pop.insert(5, handles[1]).unwrap();
        pop.insert(10, handles[2]).unwrap();
        assert_eq!(pop.len(), 3);
        assert_eq!(pop.select(0).0, 5);
        assert_eq!(pop.select(1).0, 10);
        assert_eq!(pop.select(2).0, 10);
        pop.remove(10, handles[0]);
        assert_eq!(pop.len(), 2);
    }

    #[test]
    fn shared_left_bucket_supports_multiple_ancestors() {
        let (_pool, handles) = fake_handles(4);
        let mut pop = Population::new(4);
        for h in &handles {
            pop.insert(1, *h).unwrap();
        }
        assert_eq!(pop.len(), 4);
        for rank in 0..4 {
            assert_eq!(pop.select(rank).0, 1);
        }
    }

    #[test]
    fn sample_two_distinct_are_different() {
        use crate::rng::mock::MockRng;
        let (_pool, handles) = fake_handles(3);
        let mut pop = Population::new(4);
        for (i, h) in handles.iter().enumerate() {
            pop.insert(i as u32, *h).unwrap();
        }
        let mut rng = MockRng::new(vec![0.99, 0.99]);
        let (a, b) = pop.sample_two_distinct(&mut rng);
        assert_ne!(a.0, b.0);
    }
}
