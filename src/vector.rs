//! A growable, typed-element sequence used as both the program store and the value stack.
//!
//! A contiguous buffer that doubles its capacity on growth (preserving every existing
//! element's position, so outstanding absolute indices stay valid) and accepts
//! tail-relative negative indices at its boundary.
use crate::definitions::storage::{GROWTH_FACTOR, GROWTH_FLOOR};
use crate::error::StackError;

/// A self-extending, element-type-parametric sequence.
///
/// Indexing accepts both absolute (`>= 0`) and tail-relative (`< 0`, meaning
/// `length + index`) positions, mirroring the original `array_set`/`array_get` contract.
#[derive(Debug, Clone)]
pub struct DynVec<T> {
    heap: Vec<T>,
}

impl<T: Copy + Default> DynVec<T> {
    /// Allocates a vector with `length == initial_length` default-valued cells and capacity
    /// equal to length. Passing `0` is the intended way to use a `DynVec` purely as a stack.
    pub fn new(initial_length: usize) -> Self {
        Self {
            heap: vec![T::default(); initial_length],
        }
    }
}

impl<T: Copy> DynVec<T> {
    /// The number of live cells.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// The number of cells the backing buffer can hold before the next push reallocates.
    pub fn capacity(&self) -> usize {
        self.heap.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Resolves a signed, possibly tail-relative index to an absolute one.
    fn resolve(&self, index: i64) -> Result<usize, StackError> {
        let real = if index < 0 {
            self.heap.len() as i64 + index
        } else {
            index
        };
        if real < 0 || real as usize >= self.heap.len() {
            return Err(StackError::OutOfBounds {
                index,
                len: self.heap.len(),
            });
        }
        Ok(real as usize)
    }

    /// Writes `element` at `index`. Negative indices count from the tail
    /// (`length + index`).
    pub fn set(&mut self, index: i64, element: T) -> Result<(), StackError> {
        let real = self.resolve(index)?;
        self.heap[real] = element;
        Ok(())
    }

    /// Reads the element at `index`, with the same negative-index rule as [`Self::set`].
    pub fn get(&self, index: i64) -> Result<T, StackError> {
        let real = self.resolve(index)?;
        Ok(self.heap[real])
    }

    /// Appends `element`, growing capacity (doubling from a floor of
    /// [`GROWTH_FLOOR`](crate::definitions::storage::GROWTH_FLOOR)) if the buffer is full.
    /// Returns the new element's absolute index.
    pub fn push(&mut self, element: T) -> usize {
        if self.heap.len() == self.heap.capacity() {
            let new_capacity = if self.heap.capacity() == 0 {
                GROWTH_FLOOR
            } else {
                self.heap.capacity() * GROWTH_FACTOR
            };
            log::trace!(
                "growing DynVec from capacity {} to {}",
                self.heap.capacity(),
                new_capacity
            );
            self.heap.reserve_exact(new_capacity - self.heap.capacity());
        }
        self.heap.push(element);
        self.heap.len() - 1
    }

    /// Returns the tail element without removing it. `Err` when empty.
    pub fn peek(&self) -> Result<T, StackError> {
        self.heap.last().copied().ok_or(StackError::Underflow)
    }

    /// Removes and returns the tail element. `Err` when empty.
    pub fn pop(&mut self) -> Result<T, StackError> {
        self.heap.pop().ok_or(StackError::Underflow)
    }

    /// Truncates length to zero without freeing capacity.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Byte-wise (via `PartialEq`) membership test.
    pub fn contains(&self, element: &T) -> bool
    where
        T: PartialEq,
    {
        self.heap.contains(element)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.heap.iter()
    }
}
