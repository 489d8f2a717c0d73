//! Per-worker connection pool (spec.md §9 "Per-worker pools with index
//! handles").
//!
//! Every external reference to a connection is a `(worker_index,
//! slot_index)` pair rather than a pointer, so late callbacks arriving
//! after a connection has been freed and its slot reused can be detected
//! instead of dereferencing stale state. An arena plus a generation
//! counter per slot does this: `SlotId` carries the generation it was
//! issued with, and a lookup against a slot whose generation has since
//! moved on reports invalid rather than returning the wrong connection.

/// Opaque handle into a [`Pool`]. Cheap to copy, safe to hold across
/// callback boundaries — validity is checked on every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    worker_index: u32,
    slot_index: u32,
    generation: u32,
}

impl SlotId {
    pub fn worker_index(&self) -> u32 {
        self.worker_index
    }

    pub fn slot_index(&self) -> u32 {
        self.slot_index
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
}

/// Single-writer arena owned by one worker thread (spec.md §5 "Shared
/// resources": "Per-worker connection pools are single-writer").
pub struct Pool<T> {
    worker_index: u32,
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
}

impl<T> Pool<T> {
    pub fn new(worker_index: u32) -> Self {
        Pool {
            worker_index,
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> SlotId {
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            let generation = match slot {
                Slot::Vacant { generation } => *generation,
                Slot::Occupied { .. } => unreachable!("free list pointed at an occupied slot"),
            };
            *slot = Slot::Occupied { generation, value };
            return SlotId {
                worker_index: self.worker_index,
                slot_index: idx,
                generation,
            };
        }

        let slot_index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied {
            generation: 0,
            value,
        });
        SlotId {
            worker_index: self.worker_index,
            slot_index,
            generation: 0,
        }
    }

    pub fn is_valid(&self, id: SlotId) -> bool {
        id.worker_index == self.worker_index
            && matches!(
                self.slots.get(id.slot_index as usize),
                Some(Slot::Occupied { generation, .. }) if *generation == id.generation
            )
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        if id.worker_index != self.worker_index {
            return None;
        }
        match self.slots.get(id.slot_index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if id.worker_index != self.worker_index {
            return None;
        }
        match self.slots.get_mut(id.slot_index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == id.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Free the slot, bumping its generation so any held `SlotId` referring
    /// to the old occupant is now reported invalid instead of silently
    /// resolving to whatever gets allocated into the reused slot next.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        if id.worker_index != self.worker_index {
            return None;
        }
        let slot = self.slots.get_mut(id.slot_index as usize)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == id.generation => {
                let next_generation = generation.wrapping_add(1);
                let Slot::Occupied { value, .. } =
                    core::mem::replace(slot, Slot::Vacant { generation: next_generation })
                else {
                    unreachable!()
                };
                self.free_list.push(id.slot_index);
                Some(value)
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut pool: Pool<&str> = Pool::new(3);
        let id = pool.insert("conn-a");
        assert_eq!(pool.get(id), Some(&"conn-a"));
        assert_eq!(id.worker_index(), 3);
        assert_eq!(pool.remove(id), Some("conn-a"));
        assert_eq!(pool.get(id), None);
    }

    #[test]
    fn stale_handle_invalid_after_slot_reuse() {
        let mut pool: Pool<u32> = Pool::new(0);
        let first = pool.insert(1);
        pool.remove(first).unwrap();
        let second = pool.insert(2);
        assert_eq!(second.slot_index(), first.slot_index());
        assert!(!pool.is_valid(first));
        assert!(pool.is_valid(second));
        assert_eq!(pool.get(first), None);
        assert_eq!(pool.get(second), Some(&2));
    }

    #[test]
    fn cross_worker_handle_rejected() {
        let mut pool: Pool<u32> = Pool::new(1);
        let id = pool.insert(7);
        let wrong_worker = SlotId {
            worker_index: 2,
            ..id
        };
        assert!(!pool.is_valid(wrong_worker));
    }

    #[test]
    fn len_tracks_occupancy() {
        let mut pool: Pool<u32> = Pool::new(0);
        let a = pool.insert(1);
        let _b = pool.insert(2);
        assert_eq!(pool.len(), 2);
        pool.remove(a);
        assert_eq!(pool.len(), 1);
    }
}
