//! Generational slot arena for timeline entries.
//!
//! Every entry on every track lives in one [`EntryArena`] and is addressed by
//! an [`EntryId`]. Track sequences only hold ids. When an entry is removed its
//! slot generation is bumped past every generation the slot ever issued, so a
//! stale id can never resolve to a later occupant of the same slot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generation-checked handle to an entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId {
    slot: u32,
    generation: u32,
}

impl EntryId {
    pub fn slot(self) -> u32 {
        self.slot
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.slot, self.generation)
    }
}

#[derive(Clone, Debug)]
struct Slot<T> {
    /// Generation of the current occupant, or the generation the next
    /// occupant will receive when the slot is vacant.
    generation: u32,
    /// Highest generation ever issued for this slot.
    high_water: u32,
    value: Option<T>,
}

/// Slot storage with generation-checked handles.
#[derive(Clone, Debug)]
pub struct EntryArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for EntryArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntryArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a value and return its new handle.
    pub fn insert(&mut self, value: T) -> EntryId {
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.value = Some(value);
            entry.high_water = entry.high_water.max(entry.generation);
            return EntryId {
                slot,
                generation: entry.generation,
            };
        }
        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            high_water: 0,
            value: Some(value),
        });
        EntryId {
            slot,
            generation: 0,
        }
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: EntryId) -> Option<&T> {
        self.slots
            .get(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut T> {
        self.slots
            .get_mut(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_mut())
    }

    /// Remove the entry behind `id`. Returns `None` for stale handles.
    pub fn remove(&mut self, id: EntryId) -> Option<T> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation || slot.value.is_none() {
            return None;
        }
        let value = slot.value.take();
        slot.high_water = slot.high_water.max(slot.generation).wrapping_add(1);
        slot.generation = slot.high_water;
        self.free.push(id.slot);
        self.len -= 1;
        value
    }

    /// Put `value` back under a previously issued `id`.
    ///
    /// A live `id` has its value replaced. A vacant slot is claimed with the
    /// old generation. If the slot is held by a different live entry, a fresh
    /// handle is allocated instead and returned.
    pub fn reinstate(&mut self, id: EntryId, value: T) -> EntryId {
        let index = id.slot as usize;
        while self.slots.len() <= index {
            let slot = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                high_water: 0,
                value: None,
            });
            self.free.push(slot);
        }

        let occupied = self.slots[index].value.is_some();
        if occupied && self.slots[index].generation == id.generation {
            self.slots[index].value = Some(value);
            return id;
        }
        if occupied {
            tracing::warn!(
                id = %id,
                "Slot taken by another entry, reinstating under a new id"
            );
            return self.insert(value);
        }

        let slot = &mut self.slots[index];
        slot.generation = id.generation;
        slot.high_water = slot.high_water.max(id.generation);
        slot.value = Some(value);
        self.free.retain(|s| *s != id.slot);
        self.len += 1;
        id
    }

    /// Iterate over live entries.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.value.as_ref().map(|v| {
                (
                    EntryId {
                        slot: i as u32,
                        generation: s.generation,
                    },
                    v,
                )
            })
        })
    }
}
