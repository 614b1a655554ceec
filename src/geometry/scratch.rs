//! Watermark scratch arena
//!
//! A small fixed buffer used as a stack by the subdivider: take a watermark,
//! allocate forward, restore the watermark when the level returns. Slices are
//! handed out as typed offsets so the arena can be borrowed again between
//! allocations.

use std::marker::PhantomData;
use std::mem::{align_of, size_of};

use bytemuck::Pod;

/// Saved arena top
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark(usize);

/// `len` values of `T` at a word offset in the arena
#[derive(Debug)]
pub struct ScratchSlice<T> {
    offset: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for ScratchSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ScratchSlice<T> {}

impl<T> ScratchSlice<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub struct ScratchArena {
    words: Vec<u32>,
    top: usize,
    high_water: usize,
}

impl ScratchArena {
    pub fn new(bytes: usize) -> Self {
        Self {
            words: vec![0; bytes / 4],
            top: 0,
            high_water: 0,
        }
    }

    pub fn capacity_bytes(&self) -> usize {
        self.words.len() * 4
    }

    pub fn used_bytes(&self) -> usize {
        self.top * 4
    }

    /// Deepest use since creation
    pub fn high_water_bytes(&self) -> usize {
        self.high_water * 4
    }

    pub fn watermark(&self) -> Watermark {
        Watermark(self.top)
    }

    /// Drop everything allocated after `mark`
    pub fn restore(&mut self, mark: Watermark) {
        debug_assert!(mark.0 <= self.top, "restoring a watermark above the top");
        self.top = mark.0;
    }

    /// `None` when the arena cannot hold `len` more values
    pub fn alloc<T: Pod>(&mut self, len: usize) -> Option<ScratchSlice<T>> {
        let size = size_of::<T>();
        debug_assert!(align_of::<T>() <= 4 && size > 0 && (size % 4 == 0 || 4 % size == 0));
        let words = (len * size).div_ceil(4);
        if self.top + words > self.words.len() {
            return None;
        }
        let offset = self.top;
        self.top += words;
        self.high_water = self.high_water.max(self.top);
        Some(ScratchSlice {
            offset,
            len,
            _marker: PhantomData,
        })
    }

    fn span<T>(slice: &ScratchSlice<T>) -> std::ops::Range<usize> {
        let words = (slice.len * size_of::<T>()).div_ceil(4);
        slice.offset..slice.offset + words
    }

    pub fn get<T: Pod>(&self, slice: ScratchSlice<T>) -> &[T] {
        let words = &self.words[Self::span(&slice)];
        &bytemuck::cast_slice::<u32, T>(words)[..slice.len]
    }

    pub fn get_mut<T: Pod>(&mut self, slice: ScratchSlice<T>) -> &mut [T] {
        let words = &mut self.words[Self::span(&slice)];
        &mut bytemuck::cast_slice_mut::<u32, T>(words)[..slice.len]
    }
}
