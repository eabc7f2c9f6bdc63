//! Fixed-capacity identifier arrays stored inside student and course records.
//!
//! - [`SlotArray`] is sparse: entries are cleared in place and the freed slot can be reused.
//! - [`DenseList`] is dense: occupied entries are always `[0, len)` and a removal shifts the
//!   following entries left.
//!
//! Both keep their capacity as part of the contract; neither grows.

/// A sparse array of optional identifiers with a fixed number of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotArray {
    slots: Vec<Option<String>>,
}

impl SlotArray {
    /// an array of `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        SlotArray {
            slots: vec![None; capacity],
        }
    }

    /// number of slots, occupied or not
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// index of the first empty slot
    pub fn find_empty(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// index of the slot holding `value`
    pub fn find_value(&self, value: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_deref() == Some(value))
    }

    /// whether any slot holds `value`
    pub fn contains(&self, value: &str) -> bool {
        self.find_value(value).is_some()
    }

    /// the value stored at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|slot| slot.as_deref())
    }

    /// stores `value` at `index`. Indices past the capacity are ignored.
    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(value.into());
        }
    }

    /// empties the slot at `index`
    pub fn clear(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    /// empties every slot holding `value`, returning whether anything changed
    pub fn clear_value(&mut self, value: &str) -> bool {
        let mut changed = false;
        for slot in self.slots.iter_mut() {
            if slot.as_deref() == Some(value) {
                *slot = None;
                changed = true;
            }
        }
        changed
    }

    /// the occupied values in slot order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|slot| slot.as_deref())
    }

    /// every slot, empty ones as `None`
    pub fn slots(&self) -> &[Option<String>] {
        &self.slots
    }
}

/// A dense, ordered list of identifiers with a fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseList {
    items: Vec<String>,
    capacity: usize,
}

impl DenseList {
    /// an empty list that holds at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        DenseList {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// the largest number of entries the list can hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// number of occupied entries
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// whether the list has no entries
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// index of `value`
    pub fn find_value(&self, value: &str) -> Option<usize> {
        self.items.iter().position(|item| item == value)
    }

    /// whether the list holds `value`
    pub fn contains(&self, value: &str) -> bool {
        self.find_value(value).is_some()
    }

    /// appends `value`, handing it back if the list is at capacity
    pub fn push(&mut self, value: impl Into<String>) -> Result<(), String> {
        let value = value.into();
        if self.items.len() >= self.capacity {
            return Err(value);
        }
        self.items.push(value);
        Ok(())
    }

    /// removes `value` by shifting later entries one position left
    pub fn compact_remove(&mut self, value: &str) -> bool {
        match self.find_value(value) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// keeps the first `len` entries and returns the dropped tail
    pub fn truncate(&mut self, len: usize) -> Vec<String> {
        if len >= self.items.len() {
            return Vec::new();
        }
        self.items.split_off(len)
    }

    /// the entries in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// the entries as a slice
    pub fn as_slice(&self) -> &[String] {
        &self.items
    }
}
