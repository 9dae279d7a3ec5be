use std::sync::Arc;

use parking_lot::Mutex;

use super::class::HostClass;

pub(crate) type ObjectId = u32;

#[derive(Debug)]
pub(crate) enum ObjectData {
    Instance { message: Option<String> },
    Mirror(Arc<HostClass>),
    IntArray(Mutex<Vec<i32>>),
    RefArray(Mutex<Vec<Option<ObjectId>>>),
}

#[derive(Debug)]
pub(crate) struct HostObject {
    pub(crate) class: Arc<HostClass>,
    pub(crate) data: ObjectData,
}

/// Objects are never collected, ids stay valid for the heap's lifetime.
pub(crate) struct Heap {
    heap: Vec<Arc<HostObject>>,
}

impl Heap {
    const MAX_OBJECT_ID: u32 = 0b10000000_00000000_00000000_00000000;

    pub(crate) const fn new() -> Heap {
        Heap { heap: vec![] }
    }

    pub(crate) fn allocate(&mut self, class: Arc<HostClass>, data: ObjectData) -> ObjectId {
        assert!(
            (self.heap.len() as u32) < Self::MAX_OBJECT_ID - 1,
            "heap oom"
        );
        self.heap.push(Arc::new(HostObject { class, data }));
        self.heap.len() as ObjectId
    }

    pub(crate) fn get(&self, id: ObjectId) -> Option<Arc<HostObject>> {
        let index = (id as usize).checked_sub(1)?;
        self.heap.get(index).map(Arc::clone)
    }
}

/// Slots of one reference kind. Ids are 1-based, freed slots are reused.
pub(crate) struct RefTable {
    slots: Vec<Option<ObjectId>>,
    next_id: u32,
    live: usize,
}

impl RefTable {
    pub(crate) const fn new() -> RefTable {
        RefTable {
            slots: vec![],
            next_id: 0,
            live: 0,
        }
    }

    pub(crate) fn add(&mut self, object: ObjectId) -> u32 {
        let id = self.next_id;
        if self.slots.len() <= id as usize {
            self.slots.resize_with(id as usize + 1, || None);
        }
        self.slots[id as usize] = Some(object);
        while (self.next_id as usize) < self.slots.len() && self.slots[self.next_id as usize].is_some()
        {
            self.next_id += 1;
        }
        self.live += 1;
        id + 1
    }

    pub(crate) fn get(&self, id: u32) -> Option<ObjectId> {
        let index = (id as usize).checked_sub(1)?;
        self.slots.get(index).copied().flatten()
    }

    pub(crate) fn remove(&mut self, id: u32) -> bool {
        let Some(index) = (id as usize).checked_sub(1) else {
            return false;
        };
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.take().is_none() {
            return false;
        }
        self.live -= 1;
        self.next_id = self.next_id.min(index as u32);
        true
    }

    pub(crate) fn live(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_table_reuses_slots() {
        let mut table = RefTable::new();
        let a = table.add(10);
        let b = table.add(11);
        let c = table.add(12);
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(table.live(), 3);

        assert!(table.remove(b));
        assert!(!table.remove(b));
        assert_eq!(table.get(b), None);
        assert_eq!(table.live(), 2);

        let d = table.add(13);
        assert_eq!(d, b);
        assert_eq!(table.get(d), Some(13));
        assert_eq!(table.add(14), 4);
    }

    #[test]
    fn test_ref_table_rejects_unknown_ids() {
        let mut table = RefTable::new();
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(5), None);
        assert!(!table.remove(0));
        assert!(!table.remove(5));
    }
}
