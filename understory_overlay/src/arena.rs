// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational slot storage shared by elements and overlays.

use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::types::{ElementId, OverlayId};

/// A handle made of a slot index and the generation that slot had when the handle was issued.
pub(crate) trait SlotKey: Copy {
    fn from_parts(idx: u32, generation: u32) -> Self;
    fn idx(self) -> usize;
    fn generation(self) -> u32;
}

impl SlotKey for ElementId {
    fn from_parts(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    fn idx(self) -> usize {
        self.0 as usize
    }

    fn generation(self) -> u32 {
        self.1
    }
}

impl SlotKey for OverlayId {
    fn from_parts(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    fn idx(self) -> usize {
        self.0 as usize
    }

    fn generation(self) -> u32 {
        self.1
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Arena<K, T> {
    /// slots
    slots: Vec<Option<T>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    _key: PhantomData<fn() -> K>,
}

impl<K, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            _key: PhantomData,
        }
    }
}

impl<K: SlotKey, T> Arena<K, T> {
    pub(crate) fn insert(&mut self, value: T) -> K {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(value);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Handles store 32-bit slot indices."
            )]
            K::from_parts(idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.slots.push(Some(value));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Handles store 32-bit slot indices."
            )]
            K::from_parts((self.slots.len() - 1) as u32, generation)
        }
    }

    pub(crate) fn remove(&mut self, key: K) -> Option<T> {
        if !self.contains(key) {
            return None;
        }
        self.free_list.push(key.idx());
        self.slots[key.idx()].take()
    }

    pub(crate) fn contains(&self, key: K) -> bool {
        self.slots
            .get(key.idx())
            .is_some_and(|slot| slot.is_some() && self.generations[key.idx()] == key.generation())
    }

    pub(crate) fn get(&self, key: K) -> Option<&T> {
        if !self.contains(key) {
            return None;
        }
        self.slots[key.idx()].as_ref()
    }

    pub(crate) fn get_mut(&mut self, key: K) -> Option<&mut T> {
        if !self.contains(key) {
            return None;
        }
        self.slots[key.idx()].as_mut()
    }

    /// Live entries in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            let value = slot.as_ref()?;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Handles store 32-bit slot indices."
            )]
            Some((K::from_parts(idx as u32, self.generations[idx]), value))
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuse_bumps_generation() {
        let mut arena: Arena<ElementId, &str> = Arena::default();
        let a = arena.insert("a");
        assert_eq!(arena.remove(a), Some("a"));
        assert!(!arena.contains(a));
        let b = arena.insert("b");
        assert_eq!(a.idx(), b.idx(), "freed slot should be reused");
        assert!(b.generation() > a.generation(), "generation must increase on reuse");
        assert_eq!(arena.get(a), None, "stale key must not see the new value");
        assert_eq!(arena.get(b), Some(&"b"));
    }

    #[test]
    fn len_and_iter_skip_free_slots() {
        let mut arena: Arena<OverlayId, u8> = Arena::default();
        let a = arena.insert(1);
        let _b = arena.insert(2);
        arena.remove(a);
        assert_eq!(arena.len(), 1);
        let values: Vec<u8> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, [2]);
        assert_eq!(arena.remove(a), None, "double remove is a no-op");
        assert_eq!(arena.len(), 1);
    }
}
