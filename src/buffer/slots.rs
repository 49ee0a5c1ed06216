/// Fixed circular slot array. Not synchronized; callers hold the lock.
#[derive(Debug)]
pub struct SlotRing<T> {
    slots: Vec<Option<T>>,
    put_index: usize,
    take_index: usize,
    count: usize,
}

impl<T> SlotRing<T> {
    pub fn with_capacity(cap: usize) -> Self {
        debug_assert!(cap > 0);
        let mut slots = Vec::with_capacity(cap);
        slots.resize_with(cap, || None);
        Self {
            slots,
            put_index: 0,
            take_index: 0,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
    pub fn put_index(&self) -> usize {
        self.put_index
    }
    pub fn take_index(&self) -> usize {
        self.take_index
    }

    /// Store at the put cursor. A full ring hands the item back untouched.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        debug_assert!(self.slots[self.put_index].is_none());
        self.slots[self.put_index] = Some(item);
        self.put_index = (self.put_index + 1) % self.slots.len();
        self.count += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let item = self.slots[self.take_index].take();
        debug_assert!(item.is_some());
        self.take_index = (self.take_index + 1) % self.slots.len();
        self.count -= 1;
        item
    }

    pub fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.count);
        while let Some(item) = self.pop() {
            out.push(item);
        }
        out
    }
}
