use crate::error::Error;
use crate::integer_math::{ring_increment, RingIndex};

/// Fixed-capacity circular buffer with overwrite-oldest semantics.
///
/// `S` is the index type used for the capacity and both cursors, `E` the
/// element type. A buffer created with capacity `0` is disabled: it never
/// stores anything and every operation reports zero.
///
/// The buffer does no locking of its own; share it behind a mutex or keep
/// a single owner.
pub struct CircularBuffer<S: RingIndex, E: Copy> {
    buffer: Box<[E]>,
    read_pos: S,
    write_pos: S,
    len: S,
    capacity: S,
}

impl<S: RingIndex, E: Copy + Default> CircularBuffer<S, E> {
    /// Creates a buffer holding up to `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` cannot be addressed on this platform.
    pub fn new(capacity: S) -> Self {
        match Self::try_with_capacity(capacity.to_u64()) {
            Ok(buffer) => buffer,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a buffer from a capacity of any width.
    ///
    /// Fails with `Error::CapacityOutOfRange` if `capacity` does not fit
    /// into `S` or into `usize`.
    pub fn try_with_capacity(capacity: u64) -> Result<Self, Error> {
        let out_of_range = || Error::CapacityOutOfRange {
            capacity,
            width: S::NAME,
        };
        let size = S::from_u64(capacity).ok_or_else(out_of_range)?;
        let slots = usize::try_from(capacity).map_err(|_| out_of_range())?;
        Ok(Self {
            buffer: vec![E::default(); slots].into_boxed_slice(),
            read_pos: S::ZERO,
            write_pos: S::ZERO,
            len: S::ZERO,
            capacity: size,
        })
    }
}

impl<S: RingIndex, E: Copy> CircularBuffer<S, E> {
    /// Capacity fixed at construction, `0` for a disabled buffer.
    pub fn size(&self) -> S {
        self.capacity
    }

    /// Number of unread elements.
    pub fn count(&self) -> S {
        self.len
    }

    /// Elements that can be written without overwriting; `0` when disabled.
    pub fn free_space(&self) -> S {
        self.capacity - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == S::ZERO
    }

    /// Whether the next write overwrites unread data. Never true when disabled.
    pub fn is_full(&self) -> bool {
        self.is_enabled() && self.len == self.capacity
    }

    /// `false` only for buffers created with capacity `0`.
    pub fn is_enabled(&self) -> bool {
        self.capacity > S::ZERO
    }

    pub fn is_disabled(&self) -> bool {
        !self.is_enabled()
    }

    /// Drops all unread elements. Capacity and storage are kept.
    pub fn reset(&mut self) {
        self.read_pos = S::ZERO;
        self.write_pos = S::ZERO;
        self.len = S::ZERO;
    }

    /// Appends `data`, overwriting the oldest unread elements if it does not fit.
    ///
    /// If `data` is at least as long as the buffer only its last
    /// `capacity` elements are kept. Writes to a disabled buffer are discarded.
    pub fn write(&mut self, data: &[E]) {
        if self.is_disabled() || data.is_empty() {
            return;
        }
        let capacity = self.capacity.as_usize();

        if data.len() >= capacity {
            self.buffer.copy_from_slice(&data[data.len() - capacity..]);
            self.read_pos = S::ZERO;
            self.write_pos = S::ZERO;
            self.len = self.capacity;
            return;
        }

        let to_add = data.len();
        let write_pos = self.write_pos.as_usize();

        // Handle wrap-around case
        if write_pos + to_add <= capacity {
            self.buffer[write_pos..write_pos + to_add].copy_from_slice(data);
        } else {
            let first_chunk = capacity - write_pos;
            let second_chunk = to_add - first_chunk;

            self.buffer[write_pos..].copy_from_slice(&data[..first_chunk]);
            self.buffer[..second_chunk].copy_from_slice(&data[first_chunk..]);
        }

        let added = S::from_usize(to_add);
        ring_increment(&mut self.write_pos, added, self.capacity);

        let free = self.free_space();
        if added > free {
            // The oldest unread elements were overwritten, skip them.
            ring_increment(&mut self.read_pos, added - free, self.capacity);
            self.len = self.capacity;
        } else {
            self.len = self.len + added;
        }
    }

    /// Moves up to `out.len()` of the oldest elements into `out`.
    ///
    /// Returns the number of elements copied; `out` beyond that is untouched.
    pub fn read(&mut self, out: &mut [E]) -> usize {
        let to_take = out.len().min(self.len.as_usize());
        self.copy_out(&mut out[..to_take]);
        to_take
    }

    /// Reads up to and including the first `sentinel`, at most `out.len()` elements.
    ///
    /// If no sentinel is found within the first `min(out.len(), count)`
    /// elements, that many are read and the rest stays buffered, so a
    /// following call continues the same record.
    pub fn read_to_end(&mut self, out: &mut [E], sentinel: E) -> usize
    where
        E: PartialEq,
    {
        let limit = out.len().min(self.len.as_usize());
        let (first, second) = self.as_slices();
        let to_take = first
            .iter()
            .chain(second)
            .take(limit)
            .position(|e| *e == sentinel)
            .map_or(limit, |pos| pos + 1);
        self.copy_out(&mut out[..to_take]);
        to_take
    }

    /// Takes up to `count` elements from the buffer
    pub fn take(&mut self, count: usize) -> Vec<E> {
        let to_take = count.min(self.len.as_usize());
        let (first, second) = self.as_slices();
        let mut result = Vec::with_capacity(to_take);
        result.extend(first.iter().chain(second).take(to_take).copied());
        self.consume(to_take);
        result
    }

    /// Unread elements in order, split at the end of the storage.
    fn as_slices(&self) -> (&[E], &[E]) {
        if self.is_empty() {
            return (&[], &[]);
        }
        let read_pos = self.read_pos.as_usize();
        let len = self.len.as_usize();
        let capacity = self.capacity.as_usize();
        if read_pos + len <= capacity {
            (&self.buffer[read_pos..read_pos + len], &[])
        } else {
            let second_chunk = len - (capacity - read_pos);
            (&self.buffer[read_pos..], &self.buffer[..second_chunk])
        }
    }

    /// Copies the oldest `out.len()` elements into `out` and removes them.
    fn copy_out(&mut self, out: &mut [E]) {
        let to_take = out.len();
        if to_take == 0 {
            return;
        }
        let (first, second) = self.as_slices();
        if to_take <= first.len() {
            out.copy_from_slice(&first[..to_take]);
        } else {
            let first_chunk = first.len();
            out[..first_chunk].copy_from_slice(first);
            out[first_chunk..].copy_from_slice(&second[..to_take - first_chunk]);
        }
        self.consume(to_take);
    }

    fn consume(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let taken = S::from_usize(count);
        ring_increment(&mut self.read_pos, taken, self.capacity);
        self.len = self.len - taken;
    }
}
