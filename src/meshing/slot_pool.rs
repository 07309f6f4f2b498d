//! Fixed pool of pre-sized mesh buffers.
//!
//! The pool owns exactly `capacity` mesh slots for its whole lifetime. Slots
//! are handed out by index from a free list and filled in place, so steady
//! state extraction allocates nothing.
//!
//! # Invariants
//! - `free_count() + in_use_count() == capacity()` at all times
//! - A slot index is either on the free list or marked in use, never both
//!
//! Acquire and release each take the free-list lock once for a short critical
//! section. Slot contents have their own per-slot lock, so filling one slot
//! never blocks bookkeeping for the others.

use std::collections::VecDeque;

use bitvec::prelude::BitVec;
use log::{debug, error};
use parking_lot::{Mutex, MutexGuard};

use super::mesh::{Mesh, MeshLimits};
use crate::error::{TerrainError, TerrainResult};

struct FreeList {
    free: VecDeque<usize>,
    in_use: BitVec,
}

impl FreeList {
    fn all_free(capacity: usize) -> Self {
        FreeList {
            free: (0..capacity).collect(),
            in_use: BitVec::repeat(false, capacity),
        }
    }

    fn is_in_use(&self, slot: usize) -> bool {
        self.in_use.get(slot).map(|bit| *bit).unwrap_or(false)
    }
}

/// A fixed-capacity pool of mesh buffers addressed by slot index.
pub struct MeshSlotPool {
    free_list: Mutex<FreeList>,
    slots: Box<[Mutex<Mesh>]>,
    limits: MeshLimits,
}

impl MeshSlotPool {
    /// Creates `capacity` slots, each reserved for `limits`.
    pub fn new(capacity: usize, limits: MeshLimits) -> Self {
        let slots = (0..capacity)
            .map(|_| Mutex::new(Mesh::with_capacity(limits)))
            .collect();
        debug!(
            "Created mesh slot pool with {} slots of {} vertices / {} indices",
            capacity, limits.max_vertices, limits.max_indices
        );
        MeshSlotPool {
            free_list: Mutex::new(FreeList::all_free(capacity)),
            slots,
            limits,
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Capacity of every slot.
    pub fn limits(&self) -> MeshLimits {
        self.limits
    }

    /// Number of slots available to [`MeshSlotPool::acquire`].
    pub fn free_count(&self) -> usize {
        self.free_list.lock().free.len()
    }

    /// Number of slots currently handed out.
    pub fn in_use_count(&self) -> usize {
        self.free_list.lock().in_use.count_ones()
    }

    /// Returns `true` if `slot` is currently handed out.
    pub fn is_in_use(&self, slot: usize) -> bool {
        self.free_list.lock().is_in_use(slot)
    }

    /// Takes a free slot. Its mesh is empty.
    ///
    /// # Errors
    /// Returns [`TerrainError::Exhausted`] if every slot is in use.
    pub fn acquire(&self) -> TerrainResult<usize> {
        let slot = {
            let mut free_list = self.free_list.lock();
            let slot = free_list.free.pop_front().ok_or(TerrainError::Exhausted {
                capacity: self.capacity(),
            })?;
            free_list.in_use.set(slot, true);
            slot
        };
        self.slots[slot].lock().clear();
        Ok(slot)
    }

    /// Returns a slot to the free list.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidState`] if `slot` is out of range or
    /// already free.
    pub fn release(&self, slot: usize) -> TerrainResult<()> {
        let mut free_list = self.free_list.lock();
        if slot >= self.slots.len() {
            error!("Release of mesh slot {} out of range 0..{}", slot, self.slots.len());
            return Err(TerrainError::InvalidState(format!(
                "slot {} out of range 0..{}",
                slot,
                self.slots.len()
            )));
        }
        if !free_list.is_in_use(slot) {
            error!("Double release of mesh slot {}", slot);
            return Err(TerrainError::InvalidState(format!("slot {slot} is already free")));
        }
        free_list.in_use.set(slot, false);
        free_list.free.push_back(slot);
        Ok(())
    }

    /// Marks every slot free again. Meant for initialisation and teardown;
    /// any outstanding slot index becomes invalid.
    pub fn reset_all(&self) {
        *self.free_list.lock() = FreeList::all_free(self.capacity());
        for slot in self.slots.iter() {
            slot.lock().clear();
        }
    }

    /// Locks an in-use slot's mesh.
    ///
    /// The in-use check happens with the mesh lock held, so a slot released
    /// while this call waited for the lock is reported as free.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidState`] if `slot` is out of range or free.
    pub fn slot(&self, slot: usize) -> TerrainResult<MutexGuard<'_, Mesh>> {
        let mesh = self
            .slots
            .get(slot)
            .ok_or_else(|| {
                TerrainError::InvalidState(format!(
                    "slot {} out of range 0..{}",
                    slot,
                    self.slots.len()
                ))
            })?
            .lock();
        if !self.is_in_use(slot) {
            return Err(TerrainError::InvalidState(format!(
                "slot {slot} is not in use"
            )));
        }
        Ok(mesh)
    }

    /// Runs `fill` against an in-use slot's mesh, typically an extraction.
    ///
    /// # Errors
    /// Returns [`TerrainError::InvalidState`] for a free or out-of-range slot,
    /// otherwise whatever `fill` returns.
    pub fn fill<T, F>(&self, slot: usize, fill: F) -> TerrainResult<T>
    where
        F: FnOnce(&mut Mesh) -> TerrainResult<T>,
    {
        let mut mesh = self.slot(slot)?;
        fill(&mut mesh)
    }
}
