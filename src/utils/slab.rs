/// Slot storage with a free list and per-slot generations.
///
/// Keys carry the generation of the slot they were issued for, so a key kept
/// around after its entry was removed never resolves to a newer occupant.
pub(crate) struct Slab<T> {
    items: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

impl<T> Slab<T> {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            items: Vec::with_capacity(size),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn insert(&mut self, item: T) -> Key {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.items.push(Slot {
                    generation: 0,
                    value: None,
                });
                self.items.len() - 1
            }
        };

        let slot = &mut self.items[index];
        slot.value = Some(item);
        self.len += 1;

        Key {
            index,
            generation: slot.generation,
        }
    }

    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let slot = self.items.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }

        let item = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;

        Some(item)
    }

    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        self.items
            .get(key.index)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        self.items
            .get_mut(key.index)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Key, &T)> {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Key {
                        index,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}
