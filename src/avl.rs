//! An ordered, order-statistic map `K -> V` backed by a height-balanced
//! (AVL) binary search tree whose nodes live in a [`Pool`], addressed by
//! [`Handle`] rather than by pointer — the arena-and-index discipline this
//! crate uses throughout to keep the ancestral recombination graph free of
//! real pointer cycles.
//!
//! Besides the standard `insert`/`remove`/`get`/`iter_ascending`, every
//! subtree tracks its size so that `select(rank)` — "the `rank`-th smallest
//! key" — runs in `O(log k)`. The coalescent simulator uses this to sample
//! live ancestors without replacement.

use crate::pool::{Handle, Pool};

struct Node<K, V> {
    key: K,
    value: V,
    left: Option<Handle>,
    right: Option<Handle>,
    height: i32,
    size: u32,
}

/// An ordered map supporting `O(log k)` insert, remove, lookup, minimum, and
/// select-by-rank.
pub struct AvlMap<K, V> {
    pool: Pool<Node<K, V>>,
    root: Option<Handle>,
}

impl<K: Ord + Copy, V> AvlMap<K, V> {
    pub fn new(block_size: usize) -> Self {
        Self {
            pool: Pool::new(block_size, 0),
            root: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.size_of(self.root)
    }

    fn size_of(&self, h: Option<Handle>) -> usize {
        h.map_or(0, |h| self.pool.get(h).size as usize)
    }

    fn height_of(&self, h: Option<Handle>) -> i32 {
        h.map_or(0, |h| self.pool.get(h).height)
    }

    fn update(&mut self, h: Handle) {
        let (l, r) = {
            let n = self.pool.get(h);
            (n.left, n.right)
        };
        let height = 1 + self.height_of(l).max(self.height_of(r));
        let size = 1 + self.size_of(l) + self.size_of(r);
        let n = self.pool.get_mut(h);
        n.height = height;
        n.size = size as u32;
    }

    fn balance_factor(&self, h: Handle) -> i32 {
        let n = self.pool.get(h);
        self.height_of(n.left) - self.height_of(n.right)
    }

    fn rotate_left(&mut self, h: Handle) -> Handle {
        let r = self.pool.get(h).right.expect("rotate_left needs a right child");
        let rl = self.pool.get(r).left;
        self.pool.get_mut(h).right = rl;
        self.pool.get_mut(r).left = Some(h);
        self.update(h);
        self.update(r);
        r
    }

    fn rotate_right(&mut self, h: Handle) -> Handle {
        let l = self.pool.get(h).left.expect("rotate_right needs a left child");
        let lr = self.pool.get(l).right;
        self.pool.get_mut(h).left = lr;
        self.pool.get_mut(l).right = Some(h);
        self.update(h);
        self.update(l);
        l
    }

    fn rebalance(&mut self, h: Handle) -> Handle {
        self.update(h);
        let bf = self.balance_factor(h);
        if bf > 1 {
            let l = self.pool.get(h).left.unwrap();
            if self.balance_factor(l) < 0 {
                let new_l = self.rotate_left(l);
                self.pool.get_mut(h).left = Some(new_l);
            }
            return self.rotate_right(h);
        }
        if bf < -1 {
            let r = self.pool.get(h).right.unwrap();
            if self.balance_factor(r) > 0 {
                let new_r = self.rotate_right(r);
                self.pool.get_mut(h).right = Some(new_r);
            }
            return self.rotate_left(h);
        }
        h
    }

    /// Insert `key -> value`, overwriting any existing value for `key` and
    /// returning it.
    pub fn insert(&mut self, key: K, value: V) -> crate::error::Result<Option<V>> {
        let mut replaced = None;
        self.root = self.insert_at(self.root, key, value, &mut replaced)?;
        Ok(replaced)
    }

    fn insert_at(
        &mut self,
        h: Option<Handle>,
        key: K,
        value: V,
        replaced: &mut Option<V>,
    ) -> crate::error::Result<Option<Handle>> {
        let h = match h {
            None => {
                return Ok(Some(self.pool.alloc(Node {
                    key,
                    value,
                    left: None,
                    right: None,
                    height: 1,
                    size: 1,
                })?))
            }
            Some(h) => h,
        };
        let node_key = self.pool.get(h).key;
        if key < node_key {
            let l = self.pool.get(h).left;
            let new_l = self.insert_at(l, key, value, replaced)?;
            self.pool.get_mut(h).left = new_l;
        } else if key > node_key {
            let r = self.pool.get(h).right;
            let new_r = self.insert_at(r, key, value, replaced)?;
            self.pool.get_mut(h).right = new_r;
        } else {
            let old = std::mem::replace(&mut self.pool.get_mut(h).value, value);
            *replaced = Some(old);
            return Ok(Some(h));
        }
        Ok(Some(self.rebalance(h)))
    }

    pub fn get(&self, key: K) -> Option<&V> {
        let mut cur = self.root;
        while let Some(h) = cur {
            let n = self.pool.get(h);
            cur = match key.cmp(&n.key) {
                std::cmp::Ordering::Less => n.left,
                std::cmp::Ordering::Greater => n.right,
                std::cmp::Ordering::Equal => return Some(&n.value),
            };
        }
        None
    }

    pub fn contains_key(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        let mut cur = self.root;
        while let Some(h) = cur {
            let node_key = self.pool.get(h).key;
            cur = match key.cmp(&node_key) {
                std::cmp::Ordering::Less => self.pool.get(h).left,
                std::cmp::Ordering::Greater => self.pool.get(h).right,
                std::cmp::Ordering::Equal => return Some(&mut self.pool.get_mut(h).value),
            };
        }
        None
    }

    /// Remove `key`, returning its value if present.
    pub fn remove(&mut self, key: K) -> Option<V> {
        let mut removed = None;
        self.root = self.remove_at(self.root, key, &mut removed);
        removed
    }

    fn remove_at(&mut self, h: Option<Handle>, key: K, removed: &mut Option<V>) -> Option<Handle> {
        let h = h?;
        let node_key = self.pool.get(h).key;
        match key.cmp(&node_key) {
            std::cmp::Ordering::Less => {
                let l = self.pool.get(h).left;
                let new_l = self.remove_at(l, key, removed);
                self.pool.get_mut(h).left = new_l;
            }
            std::cmp::Ordering::Greater => {
                let r = self.pool.get(h).right;
                let new_r = self.remove_at(r, key, removed);
                self.pool.get_mut(h).right = new_r;
            }
            std::cmp::Ordering::Equal => {
                let (l, r) = {
                    let n = self.pool.get(h);
                    (n.left, n.right)
                };
                return match (l, r) {
                    (None, None) => {
                        let n = self.pool.take(h);
                        *removed = Some(n.value);
                        None
                    }
                    (Some(only), None) | (None, Some(only)) => {
                        let n = self.pool.take(h);
                        *removed = Some(n.value);
                        Some(only)
                    }
                    (Some(_), Some(r)) => {
                        let (succ_key, succ_value, new_r) = self.remove_min(r);
                        let n = self.pool.get_mut(h);
                        let old_value = std::mem::replace(&mut n.value, succ_value);
                        n.key = succ_key;
                        *removed = Some(old_value);
                        self.pool.get_mut(h).right = new_r;
                        Some(self.rebalance(h))
                    }
                };
            }
        }
        Some(self.rebalance(h))
    }

    /// Remove and return the smallest entry in the subtree rooted at `h`,
    /// along with the subtree's new root.
    fn remove_min(&mut self, h: Handle) -> (K, V, Option<Handle>) {
        let left = self.pool.get(h).left;
        match left {
            None => {
                let right = self.pool.get(h).right;
                let node = self.pool.take(h);
                (node.key, node.value, right)
            }
            Some(l) => {
                let (k, v, new_l) = self.remove_min(l);
                self.pool.get_mut(h).left = new_l;
                (k, v, Some(self.rebalance(h)))
            }
        }
    }

    /// The smallest key in the map, if non-empty.
    pub fn min_key(&self) -> Option<K> {
        let mut cur = self.root?;
        loop {
            match self.pool.get(cur).left {
                Some(l) => cur = l,
                None => return Some(self.pool.get(cur).key),
            }
        }
    }

    /// The `rank`-th smallest key (0-based), for `rank < self.len()`.
    pub fn select(&self, rank: usize) -> Option<(K, &V)> {
        if rank >= self.len() {
            return None;
        }
        let mut cur = self.root?;
        let mut rank = rank;
        loop {
            let n = self.pool.get(cur);
            let left_size = self.size_of(n.left);
            match rank.cmp(&left_size) {
                std::cmp::Ordering::Less => cur = n.left.unwrap(),
                std::cmp::Ordering::Equal => return Some((n.key, &n.value)),
                std::cmp::Ordering::Greater => {
                    rank -= left_size + 1;
                    cur = n.right.unwrap();
                }
            }
        }
    }

    /// Iterate entries in ascending key order.
    pub fn iter_ascending(&self) -> impl Iterator<Item = (K, &V)> {
        let mut stack = Vec::new();
        let mut cur = self.root;
        AscendingIter {
            map: self,
            stack: {
                while let Some(h) = cur {
                    stack.push(h);
                    cur = self.pool.get(h).left;
                }
                stack
            },
        }
    }
}

struct AscendingIter<'a, K, V> {
    map: &'a AvlMap<K, V>,
    stack: Vec<Handle>,
}

impl<'a, K: Ord + Copy, V> Iterator for AscendingIter<'a, K, V> {
    type Item = (K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        let h = self.stack.pop()?;
        let n = self.map.pool.get(h);
        let mut cur = n.right;
        while let Some(c) = cur {
            self.stack.push(c);
            cur = self.map.pool.get(c).left;
        }
        Some((n.key, &n.value))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut m: AvlMap<u32, u32> = AvlMap::new(8);
        for k in [5u32, 3, 8, 1, 4, 7, 9, 2, 6] {
            m.insert(k, k * 10).unwrap();
        }
        assert_eq!(m.len(), 9);
        assert_eq!(m.get(4), Some(&40));
        assert_eq!(m.remove(5), Some(50));
        assert_eq!(m.get(5), None);
        assert_eq!(m.len(), 8);
    }

    #[test]
    fn iter_ascending_is_sorted() {
        let mut m: AvlMap<u32, ()> = AvlMap::new(4);
        for k in [9u32, 1, 5, 3, 7, 2, 8, 4, 6] {
            m.insert(k, ()).unwrap();
        }
        let keys: Vec<u32> = m.iter_ascending().map(|(k, _)| k).collect();
        assert_eq!(keys, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn select_matches_sorted_order() {
        let mut m: AvlMap<u32, u32> = AvlMap::new(4);
        let keys = [40u32, 10, 30, 20, 50];
        for k in keys {
            m.insert(k, k).unwrap();
        }
        let mut sorted = keys;
        sorted.sort();
        for (rank, expected) in sorted.iter().enumerate() {
            assert_eq!(m.select(rank).unwrap().0, *expected);
        }
    }

    #[test]
    fn min_key_tracks_smallest() {
        let mut m: AvlMap<u32, ()> = AvlMap::new(4);
        m.insert(5, ()).unwrap();
        m.insert(2, ()).unwrap();
        m.insert(8, ()).unwrap();
        assert_eq!(m.min_key(), Some(2));
        m.remove(2);
        assert_eq!(m.min_key(), Some(5));
    }
}
