use std::collections::{btree_map, BTreeMap};
use std::fmt::Debug;

use log::debug;

/// Values keyed by an ordered id.
///
/// Iteration always follows key order, so anything built on top of
/// the store observes its contents deterministically.
#[derive(Debug, Clone)]
pub struct Store<Id: Ord, V> {
    data: BTreeMap<Id, V>,
}

impl<Id: Ord + Copy + Debug, V> Default for Store<Id, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Ord + Copy + Debug, V> Store<Id, V> {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    pub fn get_opt(&self, id: Id) -> Option<&V> {
        self.data.get(&id)
    }

    pub fn get_opt_mut(&mut self, id: Id) -> Option<&mut V> {
        self.data.get_mut(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.data.contains_key(&id)
    }

    /// Inserts or replaces the value, returning the replaced one.
    pub fn save(&mut self, id: Id, value: V) -> Option<V> {
        debug!("Store: save {:?}", id);
        self.data.insert(id, value)
    }

    pub fn delete(&mut self, id: Id) -> Option<V> {
        debug!("Store: delete {:?}", id);
        self.data.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn ids(&self) -> IdIter<Id, V> {
        IdIter::new(&self.data)
    }

    pub fn values(&self) -> btree_map::Values<Id, V> {
        self.data.values()
    }

    pub fn values_mut(&mut self) -> btree_map::ValuesMut<Id, V> {
        self.data.values_mut()
    }

    /// Borrows two distinct values mutably at the same time.
    pub fn pair_mut(&mut self, a: Id, b: Id) -> Option<(&mut V, &mut V)> {
        if a == b {
            return None;
        }
        let mut first = None;
        let mut second = None;
        for (&id, value) in self.data.iter_mut() {
            if id == a {
                first = Some(value);
            } else if id == b {
                second = Some(value);
            }
        }
        first.zip(second)
    }
}

#[derive(Clone, Debug)]
pub struct IdIter<'a, Id: 'a, V: 'a> {
    iter: btree_map::Keys<'a, Id, V>,
}

impl<'a, Id: 'a, V: 'a> IdIter<'a, Id, V> {
    pub fn new(map: &'a BTreeMap<Id, V>) -> Self {
        Self { iter: map.keys() }
    }
}

impl<'a, Id: Copy + 'a, V> Iterator for IdIter<'a, Id, V> {
    type Item = Id;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().copied()
    }
}
