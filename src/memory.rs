// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Owned memory buffers and the components that plug them onto the [`Bus`].
//!
//! [`Bus`]: crate::bus::Bus

#[cfg(feature = "alloc")]
use alloc::rc::Rc;
#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;
#[cfg(all(feature = "std", not(feature = "alloc")))]
use std::rc::Rc;
#[cfg(all(feature = "std", not(feature = "alloc")))]
use std::vec;
#[cfg(all(feature = "std", not(feature = "alloc")))]
use std::vec::Vec;

use core::cell::RefCell;

use crate::GameboyError;

/// A fixed-size, zero-initialized byte buffer.
///
/// The size is immutable once created; individual bytes are freely mutable.
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Allocates a zeroed buffer of `size` bytes. `size` must be at least 1.
    pub fn new(size: usize) -> Result<Memory, GameboyError> {
        if size == 0 {
            return Err(GameboyError::BadParameter("memory size must be >= 1"));
        }
        Ok(Memory {
            bytes: vec![0u8; size],
        })
    }

    /// The buffer's fixed size.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty. A [`Memory`] created via [`Memory::new`]
    /// is never empty; this is kept for API completeness.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reads the byte at `offset`.
    pub fn get(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    /// Writes `value` at `offset`.
    pub fn set(&mut self, offset: usize, value: u8) {
        self.bytes[offset] = value;
    }

    /// Copies `data` starting at `offset`. Panics if it doesn't fit, since
    /// this is only used at cartridge/boot-ROM load time with data sized by
    /// the caller.
    pub fn load(&mut self, offset: usize, data: &[u8]) {
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }
}

/// A [`Memory`] buffer shared between components, e.g. echo-RAM and work-RAM.
///
/// `Rc<RefCell<_>>` stands in for the "(component-id, offset) pair into an
/// arena" the design notes call for: both approaches resolve a bus cell
/// through an indirection instead of a raw pointer, so aliasing between
/// echo-RAM and work-RAM can never produce a dangling or mismatched access.
/// This crate picks `Rc<RefCell<_>>` because it needs no backing arena
/// threaded through every call site that creates a [`Component`].
pub type SharedMemory = Rc<RefCell<Memory>>;

/// A memory region plugged (or pluggable) onto the bus at `[start, end]`.
///
/// `start == end == 0` means "not currently plugged". Multiple components
/// may reference the same [`SharedMemory`] (see [`Component::share`]),
/// modeling real aliasing such as the Game Boy's echo-RAM region.
pub struct Component {
    /// The backing memory, or `None` if this component was created with
    /// size 0 (a component that can never hold data).
    pub memory: Option<SharedMemory>,
    /// Start address (inclusive) of the current plug, or 0 if unplugged.
    pub start: u16,
    /// End address (inclusive) of the current plug, or 0 if unplugged.
    pub end: u16,
}

impl Component {
    /// Creates a component owning a freshly allocated `size`-byte buffer.
    /// A `size` of 0 creates an unbacked component (`memory = None`).
    pub fn create(size: usize) -> Result<Component, GameboyError> {
        let memory = if size == 0 {
            None
        } else {
            Some(Rc::new(RefCell::new(Memory::new(size)?)))
        };

        Ok(Component {
            memory,
            start: 0,
            end: 0,
        })
    }

    /// Creates a new, unplugged component that shares `donor`'s memory.
    /// Writes through either component are visible through the other.
    pub fn share(donor: &Component) -> Component {
        Component {
            memory: donor.memory.clone(),
            start: 0,
            end: 0,
        }
    }

    /// Whether this component currently occupies a non-empty bus range.
    pub fn is_plugged(&self) -> bool {
        self.start != 0 || self.end != 0
    }

    /// The size in bytes of the backing memory, or 0 if unbacked.
    pub fn size(&self) -> usize {
        match &self.memory {
            Some(mem) => mem.borrow().len(),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_rw() {
        let mut mem = Memory::new(4).unwrap();
        mem.set(2, 0xAB);
        assert_eq!(mem.get(2), 0xAB);
        assert_eq!(mem.get(0), 0);
    }

    #[test]
    fn test_zero_size_memory_rejected() {
        assert!(Memory::new(0).is_err());
    }

    #[test]
    fn test_share_aliases_same_bytes() {
        let donor = Component::create(8).unwrap();
        let alias = Component::share(&donor);

        donor.memory.as_ref().unwrap().borrow_mut().set(3, 0x42);
        assert_eq!(alias.memory.as_ref().unwrap().borrow().get(3), 0x42);
    }

    #[test]
    fn test_zero_size_component_is_unbacked() {
        let c = Component::create(0).unwrap();
        assert!(c.memory.is_none());
        assert_eq!(c.size(), 0);
    }
}
